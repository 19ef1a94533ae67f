use tracing_subscriber::EnvFilter;
use worldedit::host::{MemoryWorld, StaticRegistry};
use worldedit::stats;
use worldedit::{
    BlockPos, BlockWorld, BoundingBox, EditContext, EditError, EditSession, EvalFunctions,
    Evaluator, PasteOptions, PlayerConfig, Session, WithDim,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Env {
    evaluator: Evaluator,
    funcs: EvalFunctions,
    registry: StaticRegistry,
}

impl Env {
    fn new() -> Self {
        init_logging();
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

fn select(session: &mut Session, a: BlockPos, b: BlockPos) {
    session.set_main_pos(WithDim::new(0, a));
    session.set_vice_pos(WithDim::new(0, b));
}

#[test]
fn weighted_fill_matches_distribution() {
    let env = Env::new();
    let mut world = MemoryWorld::new();
    let mut session = Session::new(PlayerConfig::default());
    select(&mut session, BlockPos::ZERO, BlockPos::new(19, 9, 19));
    let mut edit = EditSession::new(&mut session, &mut world, env.ctx()).with_seed(42);
    let pattern = edit.pattern("80%stone,20%air").unwrap();
    assert_eq!(edit.fill(&pattern).unwrap(), 4000);
    drop(edit);

    let region = session.region().unwrap();
    let stone = stats::count(region, &world, "stone", None) as f64;
    let air = 4000.0 - stone;
    assert!((3.3..4.8).contains(&(stone / air)), "stone:air = {}:{}", stone, air);
    assert_eq!(stats::size(region, &world, false), stone as u64);

    let distr = stats::distribution(region, &world, false);
    assert_eq!(distr.total, 4000);
    assert_eq!(distr.entries[0].0, "stone");
}

#[test]
fn paste_is_undone_exactly() {
    let env = Env::new();
    let mut world = MemoryWorld::new();
    let mut session = Session::new(PlayerConfig::default());
    select(&mut session, BlockPos::ZERO, BlockPos::new(2, 0, 0));
    let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
    let wool = edit.pattern("wool:14").unwrap();
    edit.fill(&wool).unwrap();
    edit.copy(BlockPos::ZERO).unwrap();

    let target = BlockPos::new(1, 0, 0);
    let glass = edit.pattern("glass").unwrap();
    edit.fill(&glass).unwrap();
    edit.paste(WithDim::new(0, target), PasteOptions::default()).unwrap();
    drop(edit);
    assert_eq!(world.get_block(0, BlockPos::new(3, 0, 0)).block.data, 14);
    assert_eq!(world.get_block(0, BlockPos::ZERO).block.name, "minecraft:glass");

    let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
    assert_eq!(edit.undo().unwrap(), 3);
    drop(edit);
    for x in 0..3 {
        assert_eq!(world.get_block(0, BlockPos::new(x, 0, 0)).block.name, "minecraft:glass");
    }
    assert!(world.get_block(0, BlockPos::new(3, 0, 0)).is_air());
}

#[test]
fn history_depth_follows_config() {
    let env = Env::new();
    let mut world = MemoryWorld::new();
    let mut config = PlayerConfig::default();
    config.history_length = 2;
    let mut session = Session::new(config);
    select(&mut session, BlockPos::ZERO, BlockPos::ZERO);
    let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
    for name in ["stone", "dirt", "sand"] {
        let pattern = edit.pattern(name).unwrap();
        edit.fill(&pattern).unwrap();
    }
    assert!(edit.undo().is_ok());
    assert!(edit.undo().is_ok());
    assert!(matches!(edit.undo(), Err(EditError::NothingToUndo)));
    drop(edit);
    assert_eq!(world.get_block(0, BlockPos::ZERO).block.name, "minecraft:stone");
}

#[test]
fn masked_replace_respects_gmask() {
    let env = Env::new();
    let mut world = MemoryWorld::new();
    let mut session = Session::new(PlayerConfig::default());
    select(&mut session, BlockPos::ZERO, BlockPos::new(0, 9, 0));
    session.set_gmask(Some("y % 2 == 0".to_string()));
    let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
    let air = edit.pattern("air").unwrap();
    let stone = edit.pattern("stone").unwrap();
    assert_eq!(edit.replace(&air, &stone).unwrap(), 5);
    drop(edit);

    let column = BoundingBox::new(BlockPos::ZERO, BlockPos::new(0, 9, 0));
    for pos in column.iter() {
        let placed = !world.get_block(0, pos).is_air();
        assert_eq!(placed, pos.y % 2 == 0, "at {}", pos);
    }
}

#[test]
fn invalid_gmask_is_reported() {
    let env = Env::new();
    let mut world = MemoryWorld::new();
    let mut session = Session::new(PlayerConfig::default());
    select(&mut session, BlockPos::ZERO, BlockPos::ZERO);
    session.set_gmask(Some("y +".to_string()));
    let mut edit = EditSession::new(&mut session, &mut world, env.ctx());
    let stone = edit.pattern("stone").unwrap();
    assert!(matches!(edit.fill(&stone), Err(EditError::Eval(_))));
    drop(edit);
    assert!(world.is_empty());
}
