//! Undo/redo of bulk edits.
//!
//! Each record holds what a set of positions contained before an edit, so it
//! can restore exactly what was overwritten regardless of what was written.

use crate::block_entry::BlockEntry;
use crate::block_position::{BlockPos, DimensionId};
use crate::host::{BlockWorld, UpdateMode};
use std::collections::VecDeque;

/// Previous contents of a set of positions in one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    dim: DimensionId,
    blocks: Vec<(BlockPos, BlockEntry)>,
}

impl Snapshot {
    pub fn new(dim: DimensionId) -> Self {
        Snapshot {
            dim,
            blocks: Vec::new(),
        }
    }

    /// Reads the current content of `positions`.
    pub fn capture<W, I>(world: &W, dim: DimensionId, positions: I) -> Self
    where
        W: BlockWorld + ?Sized,
        I: IntoIterator<Item = BlockPos>,
    {
        Snapshot {
            dim,
            blocks: positions
                .into_iter()
                .map(|p| (p, world.get_block(dim, p)))
                .collect(),
        }
    }

    pub fn push(&mut self, pos: BlockPos, entry: BlockEntry) {
        self.blocks.push((pos, entry));
    }

    pub fn dim(&self) -> DimensionId {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.blocks.iter().map(|(p, _)| *p)
    }

    /// Writes the recorded blocks back and returns a snapshot of what they
    /// replaced, which restores the state before this call.
    pub fn restore<W: BlockWorld + ?Sized>(&self, world: &mut W, mode: UpdateMode) -> Snapshot {
        let inverse = Snapshot::capture(&*world, self.dim, self.positions());
        // Reverse order so a position recorded twice ends with its oldest content.
        for (pos, entry) in self.blocks.iter().rev() {
            world.set_block(self.dim, *pos, entry, mode);
        }
        inverse
    }
}

/// Bounded undo stack with a redo stack that new edits clear.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Records a new edit. Empty snapshots are dropped.
    pub fn record(&mut self, snapshot: Snapshot) {
        if snapshot.is_empty() || self.limit == 0 {
            return;
        }
        self.redo.clear();
        self.undo.push_back(snapshot);
        self.trim();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Reverts the latest edit. Returns the number of restored positions.
    pub fn undo<W: BlockWorld + ?Sized>(&mut self, world: &mut W, mode: UpdateMode) -> Option<usize> {
        let snapshot = self.undo.pop_back()?;
        let restored = snapshot.len();
        self.redo.push(snapshot.restore(world, mode));
        Some(restored)
    }

    /// Re-applies the latest undone edit.
    pub fn redo<W: BlockWorld + ?Sized>(&mut self, world: &mut W, mode: UpdateMode) -> Option<usize> {
        let snapshot = self.redo.pop()?;
        let restored = snapshot.len();
        self.undo.push_back(snapshot.restore(world, mode));
        self.trim();
        Some(restored)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
