use proptest::prelude::*;
use worldedit::region::{Region, RegionShape, RegionType};
use worldedit::BlockPos;

fn pos() -> impl Strategy<Value = BlockPos> {
    (-64i32..64, -64i32..64, -64i32..64).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

proptest! {
    #[test]
    fn cuboid_box_is_ordered(a in pos(), b in pos()) {
        let mut region = Region::create(RegionType::Cuboid, 0, a);
        prop_assert!(region.set_vice_pos(b));
        let bbox = region.bounding_box();
        prop_assert!(bbox.min.x <= bbox.max.x);
        prop_assert!(bbox.min.y <= bbox.max.y);
        prop_assert!(bbox.min.z <= bbox.max.z);
        prop_assert!(region.contains(a));
        prop_assert!(region.contains(b));
    }

    #[test]
    fn sphere_vice_grows_only_outward(center in pos(), p in pos()) {
        let mut region = Region::create(RegionType::Sphere, 0, center);
        let before = region.clone();
        let distance = p.distance_to(&center);
        let accepted = region.set_vice_pos(p);
        prop_assert_eq!(accepted, distance > 0.5);
        match region.shape() {
            RegionShape::Sphere(s) if accepted => prop_assert_eq!(s.radius(), distance + 0.5),
            _ => prop_assert_eq!(&region, &before),
        }
    }

    #[test]
    fn region_iteration_matches_size(a in pos(), b in pos()) {
        let mut region = Region::create(RegionType::Cuboid, 0, a);
        region.set_vice_pos(BlockPos::new(
            a.x + (b.x - a.x) / 8,
            a.y + (b.y - a.y) / 8,
            a.z + (b.z - a.z) / 8,
        ));
        prop_assert_eq!(region.positions().count() as u64, region.size());
    }
}

#[test]
fn sphere_rejects_non_uniform_expand() {
    let mut region = Region::create(RegionType::Sphere, 0, BlockPos::ZERO);
    assert!(region.set_vice_pos(BlockPos::new(3, 0, 0)));
    let before = region.clone();
    assert!(!region.expand(&[BlockPos::new(1, 0, 0)]));
    assert!(!region.contract(&[BlockPos::new(1, 1, 0)]));
    assert_eq!(region, before);
    assert!(region.expand(&[BlockPos::new(1, 1, 1), BlockPos::new(-1, -1, -1)]));
    match region.shape() {
        RegionShape::Sphere(s) => assert_eq!(s.radius(), 4.5),
        other => panic!("unexpected shape {:?}", other),
    }
}

#[test]
fn sphere_vice_never_shrinks() {
    let mut region = Region::create(RegionType::Sphere, 0, BlockPos::ZERO);
    assert!(region.set_vice_pos(BlockPos::new(5, 0, 0)));
    assert!(!region.set_vice_pos(BlockPos::new(2, 0, 0)));
    assert!(region.contract(&[BlockPos::new(2, 2, 2)]));
    match region.shape() {
        RegionShape::Sphere(s) => assert_eq!(s.radius(), 4.5),
        other => panic!("unexpected shape {:?}", other),
    }
}
