//! Per-player editing state and the registry that owns it.
//!
//! A [`PlayerState`] pairs the player's identity and click timestamps with a
//! mutex-guarded [`Session`]: selection markers, the current region, the
//! clipboard, undo history and per-player settings.

mod click;
mod manager;
mod persist;

pub use click::{ClickEvent, ClickKind, ClickState};
pub use manager::PlayerStateManager;
pub use persist::{decode_session, encode_session, StateError};

use crate::block_position::{BlockPos, WithDim};
use crate::bounding_box::BoundingBox;
use crate::clipboard::Clipboard;
use crate::config::{Colors, PlayerConfig};
use crate::history::History;
use crate::host::{GeoHandle, GeometrySink, UpdateMode};
use crate::region::{Region, RegionType};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Tick value meaning "never clicked".
pub const NEVER_CLICKED: u64 = u64::MAX;

/// Debug overlay a session draws its selection into.
#[derive(Clone)]
pub struct Overlay {
    pub sink: Arc<dyn GeometrySink>,
    pub colors: Colors,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay").field("colors", &self.colors).finish()
    }
}

/// A selection point plus the overlay shape that shows it.
#[derive(Debug)]
struct Marker {
    pos: WithDim<BlockPos>,
    geo: Option<GeoHandle>,
}

#[derive(Debug)]
pub struct Session {
    config: PlayerConfig,
    main_pos: Option<Marker>,
    vice_pos: Option<Marker>,
    region_type: Option<RegionType>,
    region: Option<Region>,
    region_geo: Vec<GeoHandle>,
    dirty: bool,
    clipboard: Clipboard,
    history: History,
    gmask: Option<String>,
    update_mode: UpdateMode,
    overlay: Option<Overlay>,
}

impl Session {
    pub fn new(config: PlayerConfig) -> Self {
        let history = History::new(config.history_length);
        Session {
            config,
            main_pos: None,
            vice_pos: None,
            region_type: None,
            region: None,
            region_geo: Vec::new(),
            dirty: false,
            clipboard: Clipboard::default(),
            history,
            gmask: None,
            update_mode: UpdateMode::default(),
            overlay: None,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PlayerConfig) {
        self.history.set_limit(config.history_length);
        self.config = config;
        self.dirty = true;
    }

    /// Attaches (or detaches) the overlay and redraws every marker.
    pub fn set_overlay(&mut self, overlay: Option<Overlay>) {
        self.overlay = overlay;
        self.redraw_markers();
        self.redraw_region();
    }

    fn draw_marker(&self, pos: WithDim<BlockPos>, main: bool) -> Option<GeoHandle> {
        let overlay = self.overlay.as_ref()?;
        let color = if main {
            overlay.colors.main_hand_color
        } else {
            overlay.colors.off_hand_color
        };
        let id = overlay
            .sink
            .draw_box(pos.dim, BoundingBox::from_point(pos.value), color);
        Some(GeoHandle::new(overlay.sink.clone(), id))
    }

    fn redraw_markers(&mut self) {
        // Old handles must be dropped before new shapes are drawn.
        if let Some(mut marker) = self.main_pos.take() {
            marker.geo = None;
            marker.geo = self.draw_marker(marker.pos, true);
            self.main_pos = Some(marker);
        }
        if let Some(mut marker) = self.vice_pos.take() {
            marker.geo = None;
            marker.geo = self.draw_marker(marker.pos, false);
            self.vice_pos = Some(marker);
        }
    }

    fn redraw_region(&mut self) {
        self.region_geo.clear();
        if let (Some(region), Some(overlay)) = (&self.region, &self.overlay) {
            self.region_geo = region.render(&overlay.sink, &overlay.colors);
        }
    }

    fn set_marker(&mut self, pos: WithDim<BlockPos>, main: bool) {
        if main {
            self.main_pos = None;
            let geo = self.draw_marker(pos, true);
            self.main_pos = Some(Marker { pos, geo });
        } else {
            self.vice_pos = None;
            let geo = self.draw_marker(pos, false);
            self.vice_pos = Some(Marker { pos, geo });
        }
    }

    /// Type used for the next region: the remembered hint, else the default.
    pub fn region_type(&self) -> RegionType {
        self.region_type.unwrap_or(self.config.default_region_type)
    }

    /// Switches the region type. An existing region is rebuilt from its box.
    pub fn set_region_type(&mut self, region_type: RegionType) {
        self.region_type = Some(region_type);
        if let Some(region) = &self.region {
            if region.region_type() != region_type {
                let rebuilt = Region::from_box(region_type, region.dim(), region.bounding_box());
                self.region = Some(rebuilt);
                self.main_pos = None;
                self.vice_pos = None;
                self.redraw_region();
            }
        }
        self.dirty = true;
    }

    /// Current region, replaced by a fresh one when missing or in another
    /// dimension than `at`.
    pub fn get_or_create_region(&mut self, at: WithDim<BlockPos>) -> &mut Region {
        match self.region.take() {
            Some(region) if region.dim() == at.dim => self.region.insert(region),
            previous => {
                if previous.is_some() {
                    tracing::debug!(dim = at.dim, "dimension changed, replacing region");
                    self.main_pos = None;
                    self.vice_pos = None;
                }
                let region = Region::create(self.region_type(), at.dim, at.value);
                self.region_type = Some(region.region_type());
                self.region_geo.clear();
                self.dirty = true;
                self.region.insert(region)
            }
        }
    }

    pub fn set_main_pos(&mut self, at: WithDim<BlockPos>) -> bool {
        let region = self.get_or_create_region(at);
        if !region.set_main_pos(at.value) {
            return false;
        }
        let reset_vice = region.need_reset_vice();
        self.set_marker(at, true);
        if reset_vice {
            self.vice_pos = None;
        }
        self.dirty = true;
        self.redraw_region();
        true
    }

    pub fn set_vice_pos(&mut self, at: WithDim<BlockPos>) -> bool {
        if !self.get_or_create_region(at).set_vice_pos(at.value) {
            return false;
        }
        self.set_marker(at, false);
        self.dirty = true;
        self.redraw_region();
        true
    }

    pub fn main_pos(&self) -> Option<WithDim<BlockPos>> {
        self.main_pos.as_ref().map(|m| m.pos)
    }

    pub fn vice_pos(&self) -> Option<WithDim<BlockPos>> {
        self.vice_pos.as_ref().map(|m| m.pos)
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Applies a geometric change to the region. Returns false when there is
    /// no region or the change was rejected.
    pub fn modify_region(&mut self, f: impl FnOnce(&mut Region) -> bool) -> bool {
        let Some(region) = self.region.as_mut() else {
            return false;
        };
        if !f(region) {
            return false;
        }
        self.dirty = true;
        self.redraw_region();
        true
    }

    /// Replaces the region. Markers no longer describe it and are cleared.
    pub fn set_region(&mut self, region: Region) {
        self.region_type = Some(region.region_type());
        self.region = Some(region);
        self.main_pos = None;
        self.vice_pos = None;
        self.dirty = true;
        self.redraw_region();
    }

    pub fn clear_region(&mut self) {
        self.region = None;
        self.region_geo.clear();
        self.main_pos = None;
        self.vice_pos = None;
        self.dirty = true;
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    pub fn set_clipboard(&mut self, clipboard: Clipboard) {
        self.clipboard = clipboard;
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Global mask expression; positions where it is 0 are left untouched.
    pub fn gmask(&self) -> Option<&str> {
        self.gmask.as_deref()
    }

    pub fn set_gmask(&mut self, gmask: Option<String>) {
        self.gmask = gmask.filter(|m| !m.trim().is_empty());
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Durable per-player record held by [`PlayerStateManager`].
#[derive(Debug)]
pub struct PlayerState {
    uuid: Uuid,
    temp: bool,
    last_left_click: AtomicU64,
    last_right_click: AtomicU64,
    session: Mutex<Session>,
}

impl PlayerState {
    pub fn new(uuid: Uuid, temp: bool, session: Session) -> Self {
        PlayerState {
            uuid,
            temp,
            last_left_click: AtomicU64::new(NEVER_CLICKED),
            last_right_click: AtomicU64::new(NEVER_CLICKED),
            session: Mutex::new(session),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Temporary players are never persisted.
    pub fn is_temp(&self) -> bool {
        self.temp
    }

    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().is_dirty()
    }

    pub fn last_click(&self, kind: ClickKind) -> Option<u64> {
        let tick = self.click_slot(kind).load(Ordering::Acquire);
        (tick != NEVER_CLICKED).then_some(tick)
    }

    pub(crate) fn click_slot(&self, kind: ClickKind) -> &AtomicU64 {
        match kind {
            ClickKind::Left => &self.last_left_click,
            ClickKind::Right => &self.last_right_click,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingGeometry;

    fn at(dim: i32, x: i32, y: i32, z: i32) -> WithDim<BlockPos> {
        WithDim::new(dim, BlockPos::new(x, y, z))
    }

    #[test]
    fn test_dimension_change_replaces_region() {
        let mut session = Session::new(PlayerConfig::default());
        assert!(session.set_main_pos(at(0, 0, 0, 0)));
        assert!(session.set_vice_pos(at(0, 4, 4, 4)));
        assert_eq!(session.region().unwrap().size(), 125);

        assert!(session.set_main_pos(at(1, 0, 0, 0)));
        let region = session.region().unwrap();
        assert_eq!(region.dim(), 1);
        assert_eq!(region.size(), 1);
        assert_eq!(session.vice_pos(), None);
        assert_eq!(session.main_pos(), Some(at(1, 0, 0, 0)));
    }

    #[test]
    fn test_get_or_create_region_reuses_same_dimension() {
        let mut config = PlayerConfig::default();
        config.default_region_type = RegionType::Polygon;
        let mut session = Session::new(config);
        assert!(session.region().is_none());
        let created = session.get_or_create_region(at(0, 1, 2, 3)).clone();
        assert_eq!(created.region_type(), RegionType::Polygon);
        assert!(session.is_dirty());

        session.get_or_create_region(at(0, 9, 9, 9));
        assert_eq!(session.region(), Some(&created));

        let moved = session.get_or_create_region(at(-1, 9, 9, 9));
        assert_eq!(moved.dim(), -1);
        assert_eq!(moved.region_type(), RegionType::Polygon);
    }

    #[test]
    fn test_sphere_main_resets_vice() {
        let mut config = PlayerConfig::default();
        config.default_region_type = RegionType::Sphere;
        let mut session = Session::new(config);
        assert!(session.set_main_pos(at(0, 0, 0, 0)));
        assert!(session.set_vice_pos(at(0, 3, 0, 0)));
        assert!(!session.set_vice_pos(at(0, 1, 0, 0)));
        assert!(session.set_main_pos(at(0, 10, 0, 0)));
        assert_eq!(session.vice_pos(), None);
    }

    #[test]
    fn test_overlay_follows_markers() {
        let geo = Arc::new(RecordingGeometry::new());
        let mut session = Session::new(PlayerConfig::default());
        session.set_overlay(Some(Overlay {
            sink: geo.clone(),
            colors: Colors::default(),
        }));
        session.set_main_pos(at(0, 0, 0, 0));
        session.set_vice_pos(at(0, 2, 2, 2));
        // Two markers plus the cuboid outline.
        assert_eq!(geo.live_count(), 3);
        session.clear_region();
        assert_eq!(geo.live_count(), 0);
        session.set_main_pos(at(0, 5, 5, 5));
        drop(session);
        assert_eq!(geo.live_count(), 0);
    }

    #[test]
    fn test_set_region_type_rebuilds() {
        let mut session = Session::new(PlayerConfig::default());
        session.set_main_pos(at(0, 0, 0, 0));
        session.set_vice_pos(at(0, 2, 2, 2));
        session.set_region_type(RegionType::Expand);
        let region = session.region().unwrap();
        assert_eq!(region.region_type(), RegionType::Expand);
        assert_eq!(region.size(), 27);
        assert_eq!(session.region_type(), RegionType::Expand);
    }

    #[test]
    fn test_modify_region() {
        let mut session = Session::new(PlayerConfig::default());
        assert!(!session.modify_region(|r| r.shift(BlockPos::new(1, 0, 0))));
        session.set_main_pos(at(0, 0, 0, 0));
        assert!(session.modify_region(|r| r.shift(BlockPos::new(1, 0, 0))));
        assert!(session.region().unwrap().contains(BlockPos::new(1, 0, 0)));
    }
}
