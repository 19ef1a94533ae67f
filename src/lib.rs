//! In-world editing engine for voxel game servers.
//!
//! Players select a [`Region`] with wand clicks, then fill, replace, copy and
//! paste through an [`EditSession`]. Per-player state lives in a
//! [`PlayerStateManager`] and persists through a host key-value store. The
//! host world, block registry and debug overlay are reached only through the
//! traits in [`host`].

pub mod block_entry;
pub mod block_position;
pub mod block_state;
pub mod bounding_box;
pub mod clipboard;
pub mod config;
pub mod edit;
pub mod expr;
pub mod geometry;
pub mod history;
pub mod host;
pub mod pattern;
pub mod region;
pub mod session;
pub mod stats;
pub mod transforms;

pub use block_entry::BlockEntry;
pub use block_position::{BlockPos, DimensionId, Facing, WithDim};
pub use block_state::BlockState;
pub use bounding_box::BoundingBox;
pub use clipboard::Clipboard;
pub use config::{Color, Colors, Config, PlayerConfig};
pub use edit::{EditContext, EditError, EditSession, PasteOptions};
pub use expr::{EvalError, EvalFunctions, Evaluator, ExpressionEvaluator, Variables};
pub use history::{History, Snapshot};
pub use host::{BlockRegistry, BlockWorld, GeometrySink, KeyValueStore, UpdateMode};
pub use pattern::{Pattern, PatternContext, PatternError};
pub use region::{Region, RegionError, RegionType};
pub use session::{
    ClickEvent, ClickKind, ClickState, PlayerState, PlayerStateManager, Session, StateError,
};
