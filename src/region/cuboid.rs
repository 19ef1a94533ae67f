use super::{get_pos, Result, Shape};
use crate::block_position::BlockPos;
use crate::bounding_box::BoundingBox;
use quartz_nbt::NbtCompound;

/// Box spanned by two opposite corners.
#[derive(Debug, Clone, PartialEq)]
pub struct CuboidRegion {
    main_pos: BlockPos,
    vice_pos: BlockPos,
    bounding_box: BoundingBox,
}

/// Moves whichever of `main`/`vice` sits on the chosen side of one axis.
/// `toward_max` selects the corner with the larger coordinate.
fn move_side(main: &mut i32, vice: &mut i32, toward_max: bool, delta: i32) {
    let main_is_side = if toward_max {
        *main >= *vice
    } else {
        *main <= *vice
    };
    if main_is_side {
        *main += delta;
    } else {
        *vice += delta;
    }
}

impl CuboidRegion {
    pub fn new(pos: BlockPos) -> Self {
        Self::from_corners(pos, pos)
    }

    pub fn from_corners(main_pos: BlockPos, vice_pos: BlockPos) -> Self {
        CuboidRegion {
            main_pos,
            vice_pos,
            bounding_box: BoundingBox::new(main_pos, vice_pos),
        }
    }

    pub fn from_box(bbox: BoundingBox) -> Self {
        Self::from_corners(bbox.min, bbox.max)
    }

    pub fn main_pos(&self) -> BlockPos {
        self.main_pos
    }

    pub fn vice_pos(&self) -> BlockPos {
        self.vice_pos
    }

    fn update_bounding_box(&mut self) {
        self.bounding_box = BoundingBox::new(self.main_pos, self.vice_pos);
    }

    /// Applies `changes` axis by axis; `grow` picks the outward corner for a
    /// positive delta, otherwise the inward one.
    fn apply(&mut self, changes: &[BlockPos], grow: bool) {
        for change in changes {
            let (m, v) = (&mut self.main_pos, &mut self.vice_pos);
            move_side(&mut m.x, &mut v.x, (change.x > 0) == grow, change.x);
            move_side(&mut m.y, &mut v.y, (change.y > 0) == grow, change.y);
            move_side(&mut m.z, &mut v.z, (change.z > 0) == grow, change.z);
        }
        self.update_bounding_box();
    }

    pub(crate) fn read_nbt(tag: &NbtCompound) -> Result<Self> {
        Ok(Self::from_corners(
            get_pos(tag, "mainPos")?,
            get_pos(tag, "vicePos")?,
        ))
    }
}

impl Shape for CuboidRegion {
    fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        self.main_pos = pos;
        self.update_bounding_box();
        true
    }

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        self.vice_pos = pos;
        self.update_bounding_box();
        true
    }

    fn need_reset_vice(&self) -> bool {
        false
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
        self.main_pos += delta;
        self.vice_pos += delta;
        self.update_bounding_box();
        true
    }

    fn contains(&self, pos: BlockPos) -> bool {
        self.bounding_box.contains(pos)
    }

    fn size(&self) -> u64 {
        self.bounding_box.volume() as u64
    }

    fn write_nbt(&self, tag: &mut NbtCompound) {
        tag.insert("mainPos", self.main_pos.to_nbt());
        tag.insert("vicePos", self.vice_pos.to_nbt());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_and_vice_in_any_order() {
        let mut c = CuboidRegion::new(BlockPos::new(4, 4, 4));
        c.set_vice_pos(BlockPos::new(0, 0, 0));
        assert_eq!(c.bounding_box().min, BlockPos::ZERO);
        assert_eq!(c.bounding_box().max, BlockPos::new(4, 4, 4));
        assert_eq!(c.size(), 125);
        assert!(!c.need_reset_vice());
    }

    #[test]
    fn test_expand_moves_outer_corner() {
        let mut c = CuboidRegion::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(2, 2, 2));
        assert!(c.expand(&[BlockPos::new(3, 0, 0), BlockPos::new(0, -1, 0)]));
        assert_eq!(c.bounding_box().min, BlockPos::new(0, -1, 0));
        assert_eq!(c.bounding_box().max, BlockPos::new(5, 2, 2));
        assert_eq!(c.vice_pos(), BlockPos::new(5, 2, 2));
        assert_eq!(c.main_pos(), BlockPos::new(0, -1, 0));
    }

    #[test]
    fn test_contract_moves_inner_side() {
        let mut c = CuboidRegion::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(9, 9, 9));
        // negative shrinks the top, positive raises the bottom
        assert!(c.contract(&[BlockPos::new(-2, 3, 0)]));
        assert_eq!(c.bounding_box().min, BlockPos::new(0, 3, 0));
        assert_eq!(c.bounding_box().max, BlockPos::new(7, 9, 9));
    }

    #[test]
    fn test_shift_is_rigid() {
        let mut c = CuboidRegion::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(1, 2, 3));
        let before = c.bounding_box();
        c.shift(BlockPos::new(10, -5, 1));
        assert_eq!(c.bounding_box(), before.offset(BlockPos::new(10, -5, 1)));
    }
}
