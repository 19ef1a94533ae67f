use super::{PlayerState, NEVER_CLICKED};
use crate::block_position::{BlockPos, WithDim};
use smol_str::SmolStr;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickKind {
    /// Sets the main position.
    Left,
    /// Sets the vice position.
    Right,
}

/// Whether the host should let the interaction through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickState {
    Pass,
    /// Consumed as a selection click; suppress the default behavior.
    Hold,
}

/// One raw interaction delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub kind: ClickKind,
    /// Held-button swings and ray-traced uses. These never select.
    pub is_long: bool,
    pub item: SmolStr,
    pub target: WithDim<BlockPos>,
    /// Host world tick when the event fired.
    pub tick: u64,
}

impl ClickEvent {
    pub fn short(kind: ClickKind, item: &str, target: WithDim<BlockPos>, tick: u64) -> Self {
        ClickEvent {
            kind,
            is_long: false,
            item: SmolStr::new(item),
            target,
            tick,
        }
    }
}

impl PlayerState {
    /// Runs one interaction through the selection state machine.
    ///
    /// Clicks with anything but the wand pass through untouched. Wand clicks
    /// are held; a short one records its tick and, unless it came sooner than
    /// `minimum_response_tick` after the previous accepted click of the same
    /// kind, moves the matching selection point.
    pub fn handle_click(&self, event: &ClickEvent) -> ClickState {
        let mut session = self.lock();
        if session.config().wand != event.item {
            return ClickState::Pass;
        }
        if event.is_long {
            return ClickState::Pass;
        }
        let slot = self.click_slot(event.kind);
        let last = slot.swap(event.tick, Ordering::AcqRel);
        let threshold = session.config().minimum_response_tick;
        let debounced = last != NEVER_CLICKED && event.tick.saturating_sub(last) < threshold;
        if debounced {
            tracing::trace!(uuid = %self.uuid(), ?event.kind, "click debounced");
            return ClickState::Hold;
        }
        let moved = match event.kind {
            ClickKind::Left => session.set_main_pos(event.target),
            ClickKind::Right => session.set_vice_pos(event.target),
        };
        tracing::debug!(
            uuid = %self.uuid(),
            kind = ?event.kind,
            pos = %event.target.value,
            dim = event.target.dim,
            moved,
            "selection click"
        );
        ClickState::Hold
    }
}
