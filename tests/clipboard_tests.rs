use proptest::prelude::*;
use worldedit::clipboard::{from_snapshot, to_snapshot, ClipboardError};
use worldedit::host::MemoryWorld;
use worldedit::transforms::Axis;
use worldedit::{BlockEntry, BlockPos, BlockState, BlockWorld, Clipboard, Region, RegionType, UpdateMode};

/// Clipboard of `size` whose cells hold distinct, orientation-free blocks.
fn filled(size: BlockPos, cells: &[(BlockPos, u8)]) -> Clipboard {
    let mut clipboard = Clipboard::new(size);
    for (pos, id) in cells {
        let local = BlockPos::new(
            pos.x.rem_euclid(size.x),
            pos.y.rem_euclid(size.y),
            pos.z.rem_euclid(size.z),
        );
        clipboard.store(local, BlockEntry::new(BlockState::new(format!("minecraft:block_{}", id))));
    }
    clipboard
}

fn size() -> impl Strategy<Value = BlockPos> {
    (1i32..6, 1i32..6, 1i32..6).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

fn cells() -> impl Strategy<Value = Vec<(BlockPos, u8)>> {
    prop::collection::vec(
        ((0i32..6, 0i32..6, 0i32..6).prop_map(|(x, y, z)| BlockPos::new(x, y, z)), 0u8..8),
        0..40,
    )
}

fn axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
}

proptest! {
    #[test]
    fn four_quarter_turns_are_identity(size in size(), cells in cells()) {
        let original = filled(size, &cells);
        let mut clipboard = original.clone();
        for _ in 0..4 {
            prop_assert!(clipboard.rotate([0, 90, 0]));
            prop_assert_eq!(clipboard.count(), original.count());
        }
        prop_assert_eq!(clipboard.size(), original.size());
        let before: Vec<_> = original.iter().collect();
        let after: Vec<_> = clipboard.iter().collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn rotation_preserves_occupancy(size in size(), cells in cells(), turns in 1i32..4) {
        let original = filled(size, &cells);
        let mut clipboard = original.clone();
        prop_assert!(clipboard.rotate([90 * turns, 0, 0]));
        prop_assert_eq!(clipboard.count(), original.count());
        prop_assert_eq!(clipboard.volume(), original.volume());
    }

    #[test]
    fn flip_is_an_involution(size in size(), cells in cells(), axis in axis()) {
        let original = filled(size, &cells);
        let mut clipboard = original.clone();
        clipboard.flip(axis);
        prop_assert_eq!(clipboard.count(), original.count());
        clipboard.flip(axis);
        let before: Vec<_> = original.iter().collect();
        let after: Vec<_> = clipboard.iter().collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(clipboard.player_rel_pos(), original.player_rel_pos());
    }
}

#[test]
fn capture_snapshot_restores_everything() {
    let mut world = MemoryWorld::new();
    let log = BlockEntry::new(BlockState::new("minecraft:oak_log").with_property("axis", "x"));
    world.set_block(0, BlockPos::new(5, 60, 5), &log, UpdateMode::NoUpdate);
    world.set_block(0, BlockPos::new(6, 61, 5), &log, UpdateMode::NoUpdate);
    let mut region = Region::create(RegionType::Cuboid, 0, BlockPos::new(5, 60, 5));
    region.set_vice_pos(BlockPos::new(7, 62, 6));

    let clipboard = Clipboard::capture(&region, &world, BlockPos::new(4, 60, 4));
    let bytes = to_snapshot(&clipboard).unwrap();
    assert_eq!(&bytes[..4], b"WECB");
    let restored = from_snapshot(&bytes).unwrap();
    assert_eq!(restored.size(), BlockPos::new(3, 3, 2));
    assert_eq!(restored.player_rel_pos(), BlockPos::new(-1, 0, -1));
    assert_eq!(restored.iter().collect::<Vec<_>>(), clipboard.iter().collect::<Vec<_>>());
}

#[test]
fn truncated_snapshots_are_rejected() {
    let clipboard = Clipboard::new(BlockPos::splat(2));
    let bytes = to_snapshot(&clipboard).unwrap();
    assert!(matches!(from_snapshot(&bytes[..3]), Err(ClipboardError::TooShort)));
    assert!(from_snapshot(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn paste_anchor_follows_player_or_origin() {
    let mut world = MemoryWorld::new();
    world.set_block(
        0,
        BlockPos::new(10, 0, 10),
        &BlockEntry::new(BlockState::new("minecraft:stone")),
        UpdateMode::NoUpdate,
    );
    let mut region = Region::create(RegionType::Cuboid, 0, BlockPos::new(10, 0, 10));
    region.set_vice_pos(BlockPos::new(12, 2, 12));
    let clipboard = Clipboard::capture(&region, &world, BlockPos::new(11, 5, 11));

    assert_eq!(clipboard.paste_anchor(BlockPos::new(0, 5, 0), false), BlockPos::new(-1, 0, -1));
    assert_eq!(clipboard.paste_anchor(BlockPos::new(0, 5, 0), true), BlockPos::new(10, 0, 10));
    let footprint = clipboard.footprint(BlockPos::new(-1, 0, -1));
    assert_eq!(footprint.max, BlockPos::new(1, 2, 1));
}
