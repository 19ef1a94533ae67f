//! Interfaces to the embedding game server, plus in-memory implementations
//! used by tests and tools.

use crate::block_entry::BlockEntry;
use crate::block_position::{BlockPos, DimensionId};
use crate::block_state::{qualify_name, BlockState};
use crate::bounding_box::BoundingBox;
use crate::config::Color;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Whether a block write notifies neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    #[default]
    NoUpdate,
    Neighbors,
}

/// Block storage keyed by dimension and position.
pub trait BlockWorld {
    fn get_block(&self, dim: DimensionId, pos: BlockPos) -> BlockEntry;

    /// Returns false when the host refused the write.
    fn set_block(
        &mut self,
        dim: DimensionId,
        pos: BlockPos,
        entry: &BlockEntry,
        mode: UpdateMode,
    ) -> bool;
}

/// Byte store for persisted sessions, keyed by player identity.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: &[u8]) -> bool;
    fn del(&self, key: &str) -> bool;
}

/// Resolves legacy numeric ids and runtime palette indices.
pub trait BlockRegistry: Send + Sync {
    fn block_by_legacy_id(&self, id: i32, data: u16) -> Option<BlockState>;
    fn block_by_runtime_id(&self, id: u32) -> Option<BlockState>;
}

pub type GeoId = u64;

/// Debug overlay renderer. Write-only from the editor's side.
pub trait GeometrySink: Send + Sync {
    fn draw_box(&self, dim: DimensionId, bbox: BoundingBox, color: Color) -> GeoId;
    fn draw_sphere(
        &self,
        dim: DimensionId,
        center: (f64, f64, f64),
        radius: f64,
        color: Color,
    ) -> GeoId;
    fn draw_line(
        &self,
        dim: DimensionId,
        from: (f64, f64, f64),
        to: (f64, f64, f64),
        color: Color,
    ) -> GeoId;
    fn remove(&self, id: GeoId);
}

/// Owned overlay shape, removed from its sink when dropped.
pub struct GeoHandle {
    sink: Arc<dyn GeometrySink>,
    id: GeoId,
}

impl GeoHandle {
    pub fn new(sink: Arc<dyn GeometrySink>, id: GeoId) -> Self {
        GeoHandle { sink, id }
    }

    pub fn id(&self) -> GeoId {
        self.id
    }
}

impl Drop for GeoHandle {
    fn drop(&mut self) {
        self.sink.remove(self.id);
    }
}

impl fmt::Debug for GeoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoHandle").field("id", &self.id).finish()
    }
}

/// Sparse world backed by a hash map. Unset positions read as air.
#[derive(Debug, Default, Clone)]
pub struct MemoryWorld {
    blocks: FxHashMap<(DimensionId, BlockPos), BlockEntry>,
    writes: u64,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accepted `set_block` calls.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Non-air positions stored.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockWorld for MemoryWorld {
    fn get_block(&self, dim: DimensionId, pos: BlockPos) -> BlockEntry {
        self.blocks
            .get(&(dim, pos))
            .cloned()
            .unwrap_or_else(BlockEntry::air)
    }

    fn set_block(
        &mut self,
        dim: DimensionId,
        pos: BlockPos,
        entry: &BlockEntry,
        _mode: UpdateMode,
    ) -> bool {
        self.writes += 1;
        if entry.is_air() {
            self.blocks.remove(&(dim, pos));
        } else {
            self.blocks.insert((dim, pos), entry.clone());
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Vec<u8>>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8]) -> bool {
        self.lock().insert(key.to_string(), value.to_vec());
        true
    }

    fn del(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }
}

/// Kind of shape recorded by `RecordingGeometry`.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoShape {
    Box(BoundingBox),
    Sphere { center: (f64, f64, f64), radius: f64 },
    Line {
        from: (f64, f64, f64),
        to: (f64, f64, f64),
    },
}

/// Geometry sink that only remembers which shapes are alive.
#[derive(Debug, Default)]
pub struct RecordingGeometry {
    next_id: AtomicU64,
    live: Mutex<FxHashMap<GeoId, (DimensionId, GeoShape, Color)>>,
}

impl RecordingGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, dim: DimensionId, shape: GeoShape, color: Color) -> GeoId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, (dim, shape, color));
        id
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn live_shapes(&self) -> Vec<(DimensionId, GeoShape, Color)> {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

impl GeometrySink for RecordingGeometry {
    fn draw_box(&self, dim: DimensionId, bbox: BoundingBox, color: Color) -> GeoId {
        self.insert(dim, GeoShape::Box(bbox), color)
    }

    fn draw_sphere(
        &self,
        dim: DimensionId,
        center: (f64, f64, f64),
        radius: f64,
        color: Color,
    ) -> GeoId {
        self.insert(dim, GeoShape::Sphere { center, radius }, color)
    }

    fn draw_line(
        &self,
        dim: DimensionId,
        from: (f64, f64, f64),
        to: (f64, f64, f64),
        color: Color,
    ) -> GeoId {
        self.insert(dim, GeoShape::Line { from, to }, color)
    }

    fn remove(&self, id: GeoId) {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

/// Legacy id table plus a runtime palette built in insertion order.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    legacy: FxHashMap<i32, BlockState>,
    palette: Vec<BlockState>,
}

impl Default for StaticRegistry {
    fn default() -> Self {
        let names = [
            (0, "air"),
            (1, "stone"),
            (2, "grass_block"),
            (3, "dirt"),
            (4, "cobblestone"),
            (5, "planks"),
            (7, "bedrock"),
            (8, "flowing_water"),
            (9, "water"),
            (12, "sand"),
            (13, "gravel"),
            (17, "log"),
            (20, "glass"),
            (35, "wool"),
        ];
        let mut registry = StaticRegistry {
            legacy: FxHashMap::default(),
            palette: Vec::new(),
        };
        for (id, name) in names {
            registry.register(id, BlockState::new(qualify_name(name)));
        }
        registry
    }
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `block` under a legacy id and appends it to the runtime palette.
    pub fn register(&mut self, legacy_id: i32, block: BlockState) -> u32 {
        self.legacy.insert(legacy_id, block.clone());
        self.palette.push(block);
        (self.palette.len() - 1) as u32
    }
}

impl BlockRegistry for StaticRegistry {
    fn block_by_legacy_id(&self, id: i32, data: u16) -> Option<BlockState> {
        self.legacy.get(&id).map(|b| b.clone().with_data(data))
    }

    fn block_by_runtime_id(&self, id: u32) -> Option<BlockState> {
        self.palette.get(id as usize).cloned()
    }
}
