//! Dense, transformable block buffer used by copy, cut and paste.
//!
//! Cells are addressed by local position `0..size` per axis and hold a palette
//! index, or nothing when the copied region did not cover that position.
//! Rotations and flips remap the cells and the recorded player offset with the
//! same coordinate map, so pasting relative to the player stays consistent.

mod snapshot;

pub use snapshot::{from_snapshot, to_snapshot, ClipboardError};

use crate::block_entry::BlockEntry;
use crate::block_position::BlockPos;
use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use crate::host::BlockWorld;
use crate::region::Region;
use crate::transforms::{
    flip_local, rotate_local_90, rotate_size_90, transform_block_state_flip,
    transform_block_state_rotate, Axis,
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

type PaletteKey = (BlockState, Option<BlockState>);

#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    size: BlockPos,
    palette: Vec<BlockEntry>,
    cells: Vec<Option<u32>>,
    /// Palette lookup for entries without a block entity.
    palette_index: FxHashMap<PaletteKey, u32>,
    player_pos: BlockPos,
    player_rel_pos: BlockPos,
    used: bool,
}

impl Default for Clipboard {
    fn default() -> Self {
        Clipboard::new(BlockPos::splat(1))
    }
}

impl Clipboard {
    /// Empty buffer of `size` cells per axis. Non-positive extents become 1.
    pub fn new(size: BlockPos) -> Self {
        let size = BlockPos::new(size.x.max(1), size.y.max(1), size.z.max(1));
        let volume = size.x as usize * size.y as usize * size.z as usize;
        Clipboard {
            size,
            palette: Vec::new(),
            cells: vec![None; volume],
            palette_index: FxHashMap::default(),
            player_pos: BlockPos::ZERO,
            player_rel_pos: BlockPos::ZERO,
            used: false,
        }
    }

    /// Copies every position of `region` from `world`. `player_pos` is kept
    /// both absolute and relative to the region's min corner.
    pub fn capture<W: BlockWorld + ?Sized>(region: &Region, world: &W, player_pos: BlockPos) -> Self {
        let bbox = region.bounding_box();
        let mut clipboard = Clipboard::new(bbox.get_dimensions());
        clipboard.player_pos = player_pos;
        clipboard.player_rel_pos = player_pos - bbox.min;
        region.for_each_block(|pos| {
            let entry = world.get_block(region.dim(), pos);
            clipboard.store(pos - bbox.min, entry);
        });
        clipboard.used = true;
        tracing::debug!(
            size = %clipboard.size,
            cells = clipboard.count(),
            palette = clipboard.palette.len(),
            "captured clipboard"
        );
        clipboard
    }

    fn local_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_size(BlockPos::ZERO, self.size)
    }

    pub fn size(&self) -> BlockPos {
        self.size
    }

    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Empties the buffer and marks it unused.
    pub fn clear(&mut self) {
        *self = Clipboard::new(self.size);
    }

    /// Player position at capture time.
    pub fn player_pos(&self) -> BlockPos {
        self.player_pos
    }

    /// Player position relative to the buffer's local origin.
    pub fn player_rel_pos(&self) -> BlockPos {
        self.player_rel_pos
    }

    /// World position the buffer's local origin was copied from.
    pub fn origin(&self) -> BlockPos {
        self.player_pos - self.player_rel_pos
    }

    /// Number of filled cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn palette(&self) -> &[BlockEntry] {
        &self.palette
    }

    fn palette_id(&mut self, entry: BlockEntry) -> u32 {
        if entry.block_entity.is_some() {
            self.palette.push(entry);
            return (self.palette.len() - 1) as u32;
        }
        let key = (entry.block.clone(), entry.extra.clone());
        if let Some(id) = self.palette_index.get(&key) {
            return *id;
        }
        let id = self.palette.len() as u32;
        self.palette.push(entry);
        self.palette_index.insert(key, id);
        id
    }

    pub(crate) fn rebuild_palette_index(&mut self) {
        self.palette_index = self
            .palette
            .iter()
            .enumerate()
            .filter(|(_, e)| e.block_entity.is_none())
            .map(|(i, e)| ((e.block.clone(), e.extra.clone()), i as u32))
            .collect();
    }

    /// Stores `entry` at a local position. Returns false outside the buffer.
    pub fn store(&mut self, local: BlockPos, entry: BlockEntry) -> bool {
        if !self.local_box().contains(local) {
            return false;
        }
        let index = self.local_box().coords_to_index(local);
        let id = self.palette_id(entry);
        self.cells[index] = Some(id);
        self.used = true;
        true
    }

    pub fn get(&self, local: BlockPos) -> Option<&BlockEntry> {
        let bbox = self.local_box();
        if !bbox.contains(local) {
            return None;
        }
        self.cells[bbox.coords_to_index(local)].map(|id| &self.palette[id as usize])
    }

    /// Cell at `local` wrapped into the buffer, tiling it over all space.
    pub fn get_loop(&self, local: BlockPos) -> Option<&BlockEntry> {
        let wrapped = BlockPos::new(
            local.x.rem_euclid(self.size.x),
            local.y.rem_euclid(self.size.y),
            local.z.rem_euclid(self.size.z),
        );
        self.get(wrapped)
    }

    /// Filled cells in index order with their local positions.
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, &BlockEntry)> + '_ {
        let bbox = self.local_box();
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.map(|id| (bbox.index_to_coords(i), &self.palette[id as usize]))
        })
    }

    /// World anchor for the local origin: at the player, keeping the offset
    /// recorded at capture, or back where the content was copied from.
    pub fn paste_anchor(&self, player_pos: BlockPos, at_origin: bool) -> BlockPos {
        if at_origin {
            self.origin()
        } else {
            player_pos - self.player_rel_pos
        }
    }

    /// Box covered by a paste whose local origin lands on `anchor`.
    pub fn footprint(&self, anchor: BlockPos) -> BoundingBox {
        BoundingBox::from_position_and_size(anchor, self.size)
    }

    /// Rotates by the given degrees around X, then Y, then Z. Each angle must
    /// be a multiple of 90; otherwise nothing changes and false is returned.
    pub fn rotate(&mut self, angles: [i32; 3]) -> bool {
        if angles.iter().any(|a| a % 90 != 0) {
            return false;
        }
        for (axis, degrees) in [Axis::X, Axis::Y, Axis::Z].into_iter().zip(angles) {
            let turns = degrees.rem_euclid(360) / 90;
            for _ in 0..turns {
                self.rotate_90(axis);
            }
        }
        true
    }

    fn rotate_90(&mut self, axis: Axis) {
        let old_size = self.size;
        let new_size = rotate_size_90(old_size, axis);
        let old_box = self.local_box();
        let new_box = BoundingBox::from_position_and_size(BlockPos::ZERO, new_size);
        // Inverse of a quarter turn is three quarter turns in the new frame.
        let cells = &self.cells;
        let new_cells: Vec<Option<u32>> = (0..cells.len())
            .into_par_iter()
            .map(|i| {
                let mut src = new_box.index_to_coords(i);
                let mut frame = new_size;
                for _ in 0..3 {
                    src = rotate_local_90(src, frame, axis);
                    frame = rotate_size_90(frame, axis);
                }
                cells[old_box.coords_to_index(src)]
            })
            .collect();
        self.cells = new_cells;
        self.size = new_size;
        self.player_rel_pos = rotate_local_90(self.player_rel_pos, old_size, axis);
        self.map_palette(|b| transform_block_state_rotate(b, axis, 90));
    }

    /// Mirrors the buffer along `axis`.
    pub fn flip(&mut self, axis: Axis) {
        let size = self.size;
        let bbox = self.local_box();
        let cells = &self.cells;
        let new_cells: Vec<Option<u32>> = (0..cells.len())
            .into_par_iter()
            .map(|i| cells[bbox.coords_to_index(flip_local(bbox.index_to_coords(i), size, axis))])
            .collect();
        self.cells = new_cells;
        self.player_rel_pos = flip_local(self.player_rel_pos, size, axis);
        self.map_palette(|b| transform_block_state_flip(b, axis));
    }

    fn map_palette(&mut self, f: impl Fn(&BlockState) -> BlockState) {
        for entry in &mut self.palette {
            entry.block = f(&entry.block);
            if let Some(extra) = &entry.extra {
                entry.extra = Some(f(extra));
            }
        }
        self.rebuild_palette_index();
    }

    pub(crate) fn from_parts(
        size: BlockPos,
        palette: Vec<BlockEntry>,
        cells: Vec<Option<u32>>,
        player_pos: BlockPos,
        player_rel_pos: BlockPos,
    ) -> Self {
        let mut clipboard = Clipboard {
            size,
            palette,
            cells,
            palette_index: FxHashMap::default(),
            player_pos,
            player_rel_pos,
            used: true,
        };
        clipboard.rebuild_palette_index();
        clipboard
    }

    pub(crate) fn cells(&self) -> &[Option<u32>] {
        &self.cells
    }
}
