use super::{RegionError, Result, Shape};
use crate::block_position::BlockPos;
use crate::bounding_box::BoundingBox;
use quartz_nbt::{NbtCompound, NbtTag};

/// Box that starts at the main position and grows to include every vice
/// position picked afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandRegion {
    bounding_box: BoundingBox,
}

impl ExpandRegion {
    pub fn new(pos: BlockPos) -> Self {
        Self::from_box(BoundingBox::from_point(pos))
    }

    pub fn from_box(bbox: BoundingBox) -> Self {
        ExpandRegion { bounding_box: bbox }
    }

    fn apply(&mut self, changes: &[BlockPos], grow: bool) {
        let (mut min, mut max) = (self.bounding_box.min, self.bounding_box.max);
        for c in changes {
            for (delta, lo, hi) in [
                (c.x, &mut min.x, &mut max.x),
                (c.y, &mut min.y, &mut max.y),
                (c.z, &mut min.z, &mut max.z),
            ] {
                if (delta > 0) == grow {
                    *hi += delta;
                } else {
                    *lo += delta;
                }
            }
        }
        self.bounding_box = BoundingBox::new(min, max);
    }

    pub(crate) fn read_nbt(tag: &NbtCompound) -> Result<Self> {
        let bbox_tag = tag
            .get::<_, &NbtTag>("box")
            .map_err(|_| RegionError::MissingField("box"))?;
        let bbox = BoundingBox::from_nbt(bbox_tag)
            .map_err(|reason| RegionError::InvalidField { field: "box", reason })?;
        Ok(Self::from_box(bbox))
    }
}

impl Shape for ExpandRegion {
    fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        self.bounding_box = BoundingBox::from_point(pos);
        true
    }

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        self.bounding_box.include(pos);
        true
    }

    fn expand(&mut self, changes: &[BlockPos]) -> bool {
        self.apply(changes, true);
        true
    }

    fn contract(&mut self, changes: &[BlockPos]) -> bool {
        self.apply(changes, false);
        true
    }

    fn shift(&mut self, delta: BlockPos) -> bool {
        self.bounding_box = self.bounding_box.offset(delta);
        true
    }

    fn contains(&self, pos: BlockPos) -> bool {
        self.bounding_box.contains(pos)
    }

    fn size(&self) -> u64 {
        self.bounding_box.volume() as u64
    }

    // The persisted "box" field is the whole state.
    fn write_nbt(&self, _tag: &mut NbtCompound) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vice_positions_accumulate() {
        let mut e = ExpandRegion::new(BlockPos::ZERO);
        e.set_vice_pos(BlockPos::new(3, 0, 0));
        e.set_vice_pos(BlockPos::new(0, -2, 1));
        assert_eq!(
            e.bounding_box(),
            BoundingBox::new(BlockPos::new(0, -2, 0), BlockPos::new(3, 0, 1))
        );
        e.set_main_pos(BlockPos::new(9, 9, 9));
        assert_eq!(e.size(), 1);
        assert!(e.need_reset_vice());
    }

    #[test]
    fn test_expand_and_contract() {
        let mut e = ExpandRegion::from_box(BoundingBox::new(BlockPos::ZERO, BlockPos::splat(4)));
        e.expand(&[BlockPos::new(2, -1, 0)]);
        assert_eq!(e.bounding_box().min, BlockPos::new(0, -1, 0));
        assert_eq!(e.bounding_box().max, BlockPos::new(6, 4, 4));
        e.contract(&[BlockPos::new(-2, 1, 0)]);
        assert_eq!(e.bounding_box(), BoundingBox::new(BlockPos::ZERO, BlockPos::splat(4)));
    }
}
