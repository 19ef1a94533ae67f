//! Bulk edits against the host world on behalf of one session.
//!
//! Every operation plans its writes first, snapshots what those positions
//! held, then writes, so a single `undo` puts back exactly what was replaced.

use crate::block_entry::BlockEntry;
use crate::block_position::{BlockPos, DimensionId, WithDim};
use crate::bounding_box::BoundingBox;
use crate::clipboard::Clipboard;
use crate::expr::{EvalError, EvalFunctions, ExpressionEvaluator, Variables};
use crate::history::Snapshot;
use crate::host::{BlockRegistry, BlockWorld};
use crate::pattern::{Pattern, PatternContext, PatternError};
use crate::region::Region;
use crate::session::Session;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("No region selected")]
    NoRegion,
    #[error("Clipboard is empty")]
    EmptyClipboard,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("Expression error: {0}")]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, EditError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasteOptions {
    /// Leave world blocks alone where the clipboard holds air.
    pub skip_air: bool,
    /// Paste back where the content was copied from instead of at the player.
    pub at_origin: bool,
    /// Replace the selection with the pasted footprint.
    pub select: bool,
    /// Select the footprint without writing anything.
    pub dry_run: bool,
}

/// Host services an edit needs besides the world itself.
#[derive(Clone, Copy)]
pub struct EditContext<'a> {
    pub evaluator: &'a dyn ExpressionEvaluator,
    pub funcs: &'a EvalFunctions,
    pub registry: &'a dyn BlockRegistry,
}

/// The session's global mask, if any, checked per position.
struct Mask<'m> {
    expr: Option<&'m str>,
}

impl<'m> Mask<'m> {
    fn new(expr: Option<&'m str>, evaluator: &dyn ExpressionEvaluator) -> Result<Self> {
        if let Some(expr) = expr {
            evaluator.validate(expr)?;
        }
        Ok(Mask { expr })
    }

    fn allows(&self, ctx: &EditContext<'_>, vars: &Variables) -> Result<bool> {
        match self.expr {
            Some(expr) => Ok(ctx.evaluator.eval(expr, vars, ctx.funcs)? != 0.0),
            None => Ok(true),
        }
    }
}

pub struct EditSession<'a, W: BlockWorld + ?Sized> {
    session: &'a mut Session,
    world: &'a mut W,
    ctx: EditContext<'a>,
    rng: StdRng,
}

impl<'a, W: BlockWorld + ?Sized> EditSession<'a, W> {
    pub fn new(session: &'a mut Session, world: &'a mut W, ctx: EditContext<'a>) -> Self {
        EditSession {
            session,
            world,
            ctx,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixes the random stream used by weighted patterns.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Parses `src` with this session's evaluator.
    pub fn pattern(&self, src: &str) -> Result<Pattern> {
        Ok(Pattern::parse_with(src, self.ctx.evaluator)?)
    }

    fn region(&self) -> Result<Region> {
        self.session.region().cloned().ok_or(EditError::NoRegion)
    }

    /// Snapshots the targets, writes them and records one history entry.
    /// Returns how many writes the host accepted.
    fn commit(&mut self, dim: DimensionId, writes: Vec<(BlockPos, BlockEntry)>) -> usize {
        let snapshot = Snapshot::capture(&*self.world, dim, writes.iter().map(|(p, _)| *p));
        let mode = self.session.update_mode();
        let mut changed = 0;
        for (pos, entry) in &writes {
            if self.world.set_block(dim, *pos, entry, mode) {
                changed += 1;
            }
        }
        self.session.history_mut().record(snapshot);
        changed
    }

    /// Fills the selection with `pattern`. Positions the global mask rejects,
    /// or where the pattern draws nothing, keep their block.
    pub fn fill(&mut self, pattern: &Pattern) -> Result<usize> {
        let region = self.region()?;
        let bbox = region.bounding_box();
        let mask = Mask::new(self.session.gmask(), self.ctx.evaluator)?;
        let pattern_ctx = PatternContext {
            evaluator: self.ctx.evaluator,
            funcs: self.ctx.funcs,
            registry: self.ctx.registry,
            clipboard: Some(self.session.clipboard()),
            region: Some(&region),
        };
        let mut vars = Variables::new();
        let mut writes = Vec::new();
        for pos in region.positions() {
            vars.update_position(pos, &bbox);
            if !mask.allows(&self.ctx, &vars)? {
                continue;
            }
            if let Some(entry) = pattern.get_block(&pattern_ctx, pos, &vars, &mut self.rng)? {
                writes.push((pos, entry));
            }
        }
        let changed = self.commit(region.dim(), writes);
        tracing::info!(pattern = %pattern, changed, "fill");
        Ok(changed)
    }

    /// Replaces blocks matching `from` with samples of `to`.
    pub fn replace(&mut self, from: &Pattern, to: &Pattern) -> Result<usize> {
        let region = self.region()?;
        let bbox = region.bounding_box();
        let dim = region.dim();
        let mask = Mask::new(self.session.gmask(), self.ctx.evaluator)?;
        let pattern_ctx = PatternContext {
            evaluator: self.ctx.evaluator,
            funcs: self.ctx.funcs,
            registry: self.ctx.registry,
            clipboard: Some(self.session.clipboard()),
            region: Some(&region),
        };
        let mut vars = Variables::new();
        let mut writes = Vec::new();
        for pos in region.positions() {
            let current = self.world.get_block(dim, pos);
            if !from.matches(&current.block, self.ctx.registry) {
                continue;
            }
            vars.update_position(pos, &bbox);
            if !mask.allows(&self.ctx, &vars)? {
                continue;
            }
            if let Some(entry) = to.get_block(&pattern_ctx, pos, &vars, &mut self.rng)? {
                writes.push((pos, entry));
            }
        }
        let changed = self.commit(dim, writes);
        tracing::info!(from = %from, to = %to, changed, "replace");
        Ok(changed)
    }

    /// Copies the selection into the clipboard, remembering where the player
    /// stood relative to it. Returns the number of captured positions.
    pub fn copy(&mut self, player_pos: BlockPos) -> Result<usize> {
        let region = self.region()?;
        let clipboard = Clipboard::capture(&region, &*self.world, player_pos);
        let count = clipboard.count();
        self.session.set_clipboard(clipboard);
        tracing::info!(count, "copy");
        Ok(count)
    }

    /// Copies the selection, then clears it to air. The global mask does not
    /// apply, so the cleared set always matches what was copied.
    pub fn cut(&mut self, player_pos: BlockPos) -> Result<usize> {
        let count = self.copy(player_pos)?;
        let region = self.region()?;
        let writes = region.positions().map(|p| (p, BlockEntry::air())).collect();
        let changed = self.commit(region.dim(), writes);
        tracing::info!(count, changed, "cut");
        Ok(count)
    }

    /// Writes the clipboard into the world at `at`'s dimension.
    pub fn paste(&mut self, at: WithDim<BlockPos>, options: PasteOptions) -> Result<usize> {
        let clipboard = self.session.clipboard();
        if !clipboard.is_used() {
            return Err(EditError::EmptyClipboard);
        }
        let anchor = clipboard.paste_anchor(at.value, options.at_origin);
        let footprint: BoundingBox = clipboard.footprint(anchor);
        if options.dry_run {
            self.select_footprint(at.dim, footprint);
            return Ok(0);
        }
        let mask = Mask::new(self.session.gmask(), self.ctx.evaluator)?;
        let mut vars = Variables::new();
        let mut writes = Vec::new();
        for (local, entry) in clipboard.iter() {
            if options.skip_air && entry.is_air() {
                continue;
            }
            let pos = anchor + local;
            vars.update_position(pos, &footprint);
            if !mask.allows(&self.ctx, &vars)? {
                continue;
            }
            writes.push((pos, entry.clone()));
        }
        let changed = self.commit(at.dim, writes);
        if options.select {
            self.select_footprint(at.dim, footprint);
        }
        tracing::info!(anchor = %anchor, changed, "paste");
        Ok(changed)
    }

    fn select_footprint(&mut self, dim: DimensionId, footprint: BoundingBox) {
        let region_type = self.session.region_type();
        self.session
            .set_region(Region::from_box(region_type, dim, footprint));
    }

    /// Reverts the latest edit. Returns the number of restored positions.
    pub fn undo(&mut self) -> Result<usize> {
        let mode = self.session.update_mode();
        let restored = self
            .session
            .history_mut()
            .undo(&mut *self.world, mode)
            .ok_or(EditError::NothingToUndo)?;
        tracing::info!(restored, "undo");
        Ok(restored)
    }

    pub fn redo(&mut self) -> Result<usize> {
        let mode = self.session.update_mode();
        let restored = self
            .session
            .history_mut()
            .redo(&mut *self.world, mode)
            .ok_or(EditError::NothingToRedo)?;
        tracing::info!(restored, "redo");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_state::BlockState;
    use crate::config::PlayerConfig;
    use crate::expr::Evaluator;
    use crate::host::{MemoryWorld, StaticRegistry, UpdateMode};

    struct Env {
        evaluator: Evaluator,
        funcs: EvalFunctions,
        registry: StaticRegistry,
    }

    impl Env {
        fn new() -> Self {
            Env {
                evaluator: Evaluator::new(),
                funcs: EvalFunctions::default(),
                registry: StaticRegistry::new(),
            }
        }

        fn ctx(&self) -> EditContext<'_> {
            EditContext {
                evaluator: &self.evaluator,
                funcs: &self.funcs,
                registry: &self.registry,
            }
        }
    }

    fn selected(a: BlockPos, b: BlockPos) -> Session {
        let mut session = Session::new(PlayerConfig::default());
        session.set_main_pos(WithDim::new(0, a));
        session.set_vice_pos(WithDim::new(0, b));
        session
    }

    fn name_at(world: &MemoryWorld, pos: BlockPos) -> String {
        world.get_block(0, pos).block.name.to_string()
    }

    #[test]
    fn test_fill_and_undo() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let mut session = selected(BlockPos::ZERO, BlockPos::splat(2));
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx()).with_seed(1);
        let stone = edit.pattern("stone").unwrap();
        assert_eq!(edit.fill(&stone).unwrap(), 27);
        assert_eq!(edit.undo().unwrap(), 27);
        assert!(matches!(edit.undo(), Err(EditError::NothingToUndo)));
        assert_eq!(edit.redo().unwrap(), 27);
        drop(edit);
        assert_eq!(world.len(), 27);
        assert_eq!(name_at(&world, BlockPos::splat(1)), "minecraft:stone");
    }

    #[test]
    fn test_fill_without_region() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let mut session = Session::new(PlayerConfig::default());
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
        let stone = edit.pattern("stone").unwrap();
        assert!(matches!(edit.fill(&stone), Err(EditError::NoRegion)));
    }

    #[test]
    fn test_gmask_limits_fill() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let mut session = selected(BlockPos::ZERO, BlockPos::new(3, 0, 0));
        session.set_gmask(Some("x < 2".to_string()));
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
        let stone = edit.pattern("stone").unwrap();
        assert_eq!(edit.fill(&stone).unwrap(), 2);
        drop(edit);
        assert_eq!(name_at(&world, BlockPos::new(1, 0, 0)), "minecraft:stone");
        assert!(world.get_block(0, BlockPos::new(2, 0, 0)).is_air());
    }

    #[test]
    fn test_replace_only_matching() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let dirt = BlockEntry::new(BlockState::new("minecraft:dirt"));
        world.set_block(0, BlockPos::new(1, 0, 0), &dirt, UpdateMode::NoUpdate);
        let mut session = selected(BlockPos::ZERO, BlockPos::new(2, 0, 0));
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
        let from = edit.pattern("dirt").unwrap();
        let to = edit.pattern("glass").unwrap();
        assert_eq!(edit.replace(&from, &to).unwrap(), 1);
        drop(edit);
        assert_eq!(name_at(&world, BlockPos::new(1, 0, 0)), "minecraft:glass");
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_cut_then_paste_elsewhere() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let sand = BlockEntry::new(BlockState::new("minecraft:sand"));
        world.set_block(0, BlockPos::new(0, 0, 0), &sand, UpdateMode::NoUpdate);
        let mut session = selected(BlockPos::ZERO, BlockPos::new(1, 0, 0));
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
        assert_eq!(edit.cut(BlockPos::new(0, 1, 0)).unwrap(), 2);
        let options = PasteOptions {
            skip_air: true,
            select: true,
            ..PasteOptions::default()
        };
        // Player moved 10 blocks east; the content follows.
        assert_eq!(edit.paste(WithDim::new(0, BlockPos::new(10, 1, 0)), options).unwrap(), 1);
        drop(edit);
        assert!(world.get_block(0, BlockPos::ZERO).is_air());
        assert_eq!(name_at(&world, BlockPos::new(10, 0, 0)), "minecraft:sand");
        assert_eq!(
            session.region().unwrap().bounding_box(),
            BoundingBox::new(BlockPos::new(10, 0, 0), BlockPos::new(11, 0, 0))
        );
    }

    #[test]
    fn test_dry_run_only_selects() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let mut session = selected(BlockPos::ZERO, BlockPos::new(1, 1, 1));
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
        edit.copy(BlockPos::ZERO).unwrap();
        let options = PasteOptions {
            dry_run: true,
            ..PasteOptions::default()
        };
        assert_eq!(edit.paste(WithDim::new(1, BlockPos::splat(5)), options).unwrap(), 0);
        drop(edit);
        assert_eq!(world.write_count(), 0);
        assert_eq!(session.history().undo_len(), 0);
        let region = session.region().unwrap();
        assert_eq!(region.dim(), 1);
        assert_eq!(
            region.bounding_box(),
            BoundingBox::new(BlockPos::splat(5), BlockPos::splat(6))
        );
    }

    #[test]
    fn test_paste_requires_clipboard() {
        let env = Env::new();
        let mut world = MemoryWorld::new();
        let mut session = Session::new(PlayerConfig::default());
        let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
        let err = edit.paste(WithDim::new(0, BlockPos::ZERO), PasteOptions::default());
        assert!(matches!(err, Err(EditError::EmptyClipboard)));
    }
}
