use super::{get_double, get_pos, RegionError, Result, Shape};
use crate::block_position::BlockPos;
use crate::bounding_box::BoundingBox;
use quartz_nbt::{NbtCompound, NbtTag};

const MIN_RADIUS: f64 = 0.5;

/// Ball around a center block. The vice position only ever grows the radius.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereRegion {
    center: BlockPos,
    radius: f64,
    bounding_box: BoundingBox,
}

impl SphereRegion {
    pub fn new(center: BlockPos) -> Self {
        Self::with_radius(center, MIN_RADIUS)
    }

    pub fn with_radius(center: BlockPos, radius: f64) -> Self {
        let mut s = SphereRegion {
            center,
            radius: radius.max(MIN_RADIUS),
            bounding_box: BoundingBox::from_point(center),
        };
        s.update_bounding_box();
        s
    }

    /// Sphere centered in `bbox` with the mean half-extent as radius.
    pub fn from_box(bbox: BoundingBox) -> Self {
        let center = (bbox.min + bbox.max) / 2;
        let radius = bbox.get_dimensions().component_sum() as f64 / 6.0;
        Self::with_radius(center, radius)
    }

    pub fn center_pos(&self) -> BlockPos {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Whether every point of the bounding box is addressable.
    fn fits(center: BlockPos, radius: f64) -> bool {
        let r = radius.ceil();
        if !(r <= i32::MAX as f64) {
            return false;
        }
        let r = r as i32;
        [center.x, center.y, center.z]
            .iter()
            .all(|c| c.checked_add(r).is_some() && c.checked_sub(r).is_some())
    }

    fn update_bounding_box(&mut self) {
        let r = self.radius.ceil() as i32;
        self.bounding_box = BoundingBox::new(
            self.center - BlockPos::splat(r),
            self.center + BlockPos::splat(r),
        );
    }

    /// Half the summed per-axis magnitude, when all three axes agree.
    fn uniform_change(changes: &[BlockPos]) -> Option<i32> {
        let (mut x, mut y, mut z) = (0i64, 0i64, 0i64);
        for c in changes {
            x += c.x.unsigned_abs() as i64;
            y += c.y.unsigned_abs() as i64;
            z += c.z.unsigned_abs() as i64;
        }
        (x == y && y == z).then_some((x / 2) as i32)
    }

    pub(crate) fn read_nbt(tag: &NbtCompound) -> Result<Self> {
        let center = get_pos(tag, "center")?;
        let radius = get_double(tag, "radius")?;
        if !radius.is_finite() || radius < MIN_RADIUS {
            return Err(RegionError::InvalidField {
                field: "radius",
                reason: format!("{} is not a valid radius", radius),
            });
        }
        if !Self::fits(center, radius) {
            return Err(RegionError::InvalidField {
                field: "radius",
                reason: format!("{} around {} leaves the world", radius, center),
            });
        }
        Ok(Self::with_radius(center, radius))
    }
}

impl Shape for SphereRegion {
    fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        self.center = pos;
        self.radius = MIN_RADIUS;
        self.update_bounding_box();
        true
    }

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        let distance = pos.distance_to(&self.center);
        if distance > self.radius && Self::fits(self.center, distance + 0.5) {
            self.radius = distance + 0.5;
            self.update_bounding_box();
            true
        } else {
            false
        }
    }

    fn expand(&mut self, changes: &[BlockPos]) -> bool {
        let Some(delta) = Self::uniform_change(changes) else {
            return false;
        };
        let radius = self.radius + delta as f64;
        if !Self::fits(self.center, radius) {
            return false;
        }
        self.radius = radius;
        self.update_bounding_box();
        true
    }

    fn contract(&mut self, changes: &[BlockPos]) -> bool {
        let Some(delta) = Self::uniform_change(changes) else {
            return false;
        };
        self.radius = (self.radius - delta as f64).max(MIN_RADIUS);
        self.update_bounding_box();
        true
    }

    fn shift(&mut self, delta: BlockPos) -> bool {
        self.center += delta;
        self.update_bounding_box();
        true
    }

    fn contains(&self, pos: BlockPos) -> bool {
        pos.distance_squared(&self.center) as f64 <= self.radius * self.radius
    }

    fn center(&self) -> (f64, f64, f64) {
        self.center.center()
    }

    fn write_nbt(&self, tag: &mut NbtCompound) {
        tag.insert("center", self.center.to_nbt());
        tag.insert("radius", NbtTag::Double(self.radius));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vice_only_grows() {
        let mut s = SphereRegion::new(BlockPos::ZERO);
        assert!(s.set_vice_pos(BlockPos::new(3, 0, 0)));
        assert_eq!(s.radius(), 3.5);
        assert!(!s.set_vice_pos(BlockPos::new(2, 0, 0)));
        assert!(!s.set_vice_pos(BlockPos::new(0, 3, 0)));
        assert_eq!(s.radius(), 3.5);
        assert!(s.set_vice_pos(BlockPos::new(0, 4, 0)));
        assert_eq!(s.radius(), 4.5);
    }

    #[test]
    fn test_main_resets_radius() {
        let mut s = SphereRegion::new(BlockPos::ZERO);
        s.set_vice_pos(BlockPos::new(5, 0, 0));
        s.set_main_pos(BlockPos::new(1, 1, 1));
        assert_eq!(s.radius(), 0.5);
        assert_eq!(s.size(), 1);
        assert!(s.need_reset_vice());
    }

    #[test]
    fn test_expand_requires_uniform_deltas() {
        let mut s = SphereRegion::with_radius(BlockPos::ZERO, 2.5);
        let before = s.clone();
        assert!(!s.expand(&[BlockPos::new(2, 0, 0)]));
        assert!(!s.contract(&[BlockPos::new(2, 2, 0)]));
        assert_eq!(s, before);
        assert!(s.expand(&[BlockPos::new(2, 2, 2), BlockPos::new(-2, -2, -2)]));
        assert_eq!(s.radius(), 4.5);
        assert!(s.contract(&[BlockPos::new(20, 20, 20)]));
        assert_eq!(s.radius(), 0.5);
    }

    #[test]
    fn test_bounding_box_covers_ball() {
        let s = SphereRegion::with_radius(BlockPos::new(10, 64, -10), 3.5);
        let bbox = s.bounding_box();
        assert_eq!(bbox.min, BlockPos::new(6, 60, -14));
        for p in bbox.iter() {
            if s.contains(p) {
                assert!(p.distance_to(&s.center_pos()) <= 3.5);
            }
        }
    }

    #[test]
    fn test_radius_must_stay_in_range() {
        let mut tag = NbtCompound::new();
        tag.insert("center", BlockPos::new(0, 64, 0).to_nbt());
        tag.insert("radius", NbtTag::Double(1e12));
        assert!(matches!(
            SphereRegion::read_nbt(&tag),
            Err(RegionError::InvalidField { field: "radius", .. })
        ));

        tag.insert("center", BlockPos::new(i32::MAX - 2, 0, 0).to_nbt());
        tag.insert("radius", NbtTag::Double(3.5));
        assert!(SphereRegion::read_nbt(&tag).is_err());
        tag.insert("radius", NbtTag::Double(1.5));
        assert!(SphereRegion::read_nbt(&tag).is_ok());

        let mut s = SphereRegion::with_radius(BlockPos::new(i32::MAX - 4, 0, 0), 2.0);
        let before = s.clone();
        assert!(!s.expand(&[BlockPos::splat(8)]));
        assert!(!s.set_vice_pos(BlockPos::new(i32::MAX - 4, 10, 0)));
        assert_eq!(s, before);
    }

    #[test]
    fn test_from_box() {
        let s = SphereRegion::from_box(BoundingBox::new(BlockPos::ZERO, BlockPos::new(5, 5, 5)));
        assert_eq!(s.center_pos(), BlockPos::new(2, 2, 2));
        assert_eq!(s.radius(), 3.0);
    }
}
