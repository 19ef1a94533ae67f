use crate::block_position::BlockPos;
use quartz_nbt::NbtTag;
use serde::{Deserialize, Serialize};

/// Inclusive axis-aligned box. `min <= max` holds component-wise for every
/// box built through `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BoundingBox {
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        BoundingBox {
            min: a.component_min(&b),
            max: a.component_max(&b),
        }
    }

    pub fn from_point(p: BlockPos) -> Self {
        BoundingBox { min: p, max: p }
    }

    /// Box starting at `position` spanning `size` blocks per axis.
    pub fn from_position_and_size(position: BlockPos, size: BlockPos) -> Self {
        BoundingBox::new(position, position + size - BlockPos::splat(1))
    }

    /// Per-axis block count.
    pub fn get_dimensions(&self) -> BlockPos {
        self.max - self.min + BlockPos::splat(1)
    }

    pub fn volume(&self) -> i64 {
        let d = self.get_dimensions();
        d.x as i64 * d.y as i64 * d.z as i64
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        p.contained_within(&self.min, &self.max)
    }

    /// Geometric center in world space (block edges, not block centers).
    pub fn center(&self) -> (f64, f64, f64) {
        (
            (self.min.x as f64 + self.max.x as f64 + 1.0) / 2.0,
            (self.min.y as f64 + self.max.y as f64 + 1.0) / 2.0,
            (self.min.z as f64 + self.max.z as f64 + 1.0) / 2.0,
        )
    }

    /// Block containing the geometric center.
    pub fn center_block(&self) -> BlockPos {
        let c = self.center();
        BlockPos::new(c.0.floor() as i32, c.1.floor() as i32, c.2.floor() as i32)
    }

    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.component_min(&other.min),
            max: self.max.component_max(&other.max),
        }
    }

    pub fn include(&mut self, p: BlockPos) {
        self.min = self.min.component_min(&p);
        self.max = self.max.component_max(&p);
    }

    pub fn offset(&self, delta: BlockPos) -> BoundingBox {
        BoundingBox {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Dense index of `p` with X fastest, then Z, then Y.
    #[inline(always)]
    pub fn coords_to_index(&self, p: BlockPos) -> usize {
        let d = self.get_dimensions();
        let rel = p - self.min;
        (rel.x as usize)
            + (rel.z as usize) * d.x as usize
            + (rel.y as usize) * (d.x as usize * d.z as usize)
    }

    #[inline(always)]
    pub fn index_to_coords(&self, index: usize) -> BlockPos {
        let d = self.get_dimensions();
        let w = d.x as usize;
        let wl = w * d.z as usize;
        let dx = (index % w) as i32;
        let dy = (index / wl) as i32;
        let dz = ((index / w) % d.z as usize) as i32;
        self.min + BlockPos::new(dx, dy, dz)
    }

    /// Every position in the box, Y outermost, then Z, then X.
    pub fn iter(&self) -> BoxIter {
        BoxIter {
            bbox: *self,
            next: Some(self.min),
        }
    }

    pub fn to_nbt(&self) -> NbtTag {
        NbtTag::IntArray(vec![
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ])
    }

    pub fn from_nbt(tag: &NbtTag) -> Result<Self, String> {
        match tag {
            NbtTag::IntArray(arr) if arr.len() == 6 => Ok(BoundingBox::new(
                BlockPos::new(arr[0], arr[1], arr[2]),
                BlockPos::new(arr[3], arr[4], arr[5]),
            )),
            _ => Err("Invalid bounding box tag".to_string()),
        }
    }
}

impl IntoIterator for BoundingBox {
    type Item = BlockPos;
    type IntoIter = BoxIter;

    fn into_iter(self) -> BoxIter {
        self.iter()
    }
}

/// Lazy position iterator over a `BoundingBox`.
#[derive(Debug, Clone)]
pub struct BoxIter {
    bbox: BoundingBox,
    next: Option<BlockPos>,
}

impl Iterator for BoxIter {
    type Item = BlockPos;

    fn next(&mut self) -> Option<BlockPos> {
        let current = self.next?;
        let mut n = current;
        n.x += 1;
        if n.x > self.bbox.max.x {
            n.x = self.bbox.min.x;
            n.z += 1;
            if n.z > self.bbox.max.z {
                n.z = self.bbox.min.z;
                n.y += 1;
            }
        }
        self.next = if n.y > self.bbox.max.y { None } else { Some(n) };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            None => (0, Some(0)),
            Some(p) => {
                let remaining = self.bbox.volume() as usize - self.bbox.coords_to_index(p);
                (remaining, Some(remaining))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_orders_corners() {
        let b = BoundingBox::new(BlockPos::new(5, -1, 3), BlockPos::new(-2, 4, 3));
        assert_eq!(b.min, BlockPos::new(-2, -1, 3));
        assert_eq!(b.max, BlockPos::new(5, 4, 3));
        assert_eq!(b.get_dimensions(), BlockPos::new(8, 6, 1));
        assert_eq!(b.volume(), 48);
    }

    #[test]
    fn test_iter_covers_volume_once() {
        let b = BoundingBox::new(BlockPos::new(-1, 0, 2), BlockPos::new(1, 2, 3));
        let points: Vec<_> = b.iter().collect();
        assert_eq!(points.len() as i64, b.volume());
        for (i, p) in points.iter().enumerate() {
            assert!(b.contains(*p));
            assert_eq!(b.coords_to_index(*p), i);
            assert_eq!(b.index_to_coords(i), *p);
        }
    }

    #[test]
    fn test_iter_is_restartable() {
        let b = BoundingBox::new(BlockPos::ZERO, BlockPos::new(2, 2, 2));
        assert_eq!(b.iter().count(), 27);
        assert_eq!(b.iter().count(), 27);
        assert_eq!(b.iter().size_hint(), (27, Some(27)));
    }

    #[test]
    fn test_center() {
        let b = BoundingBox::new(BlockPos::ZERO, BlockPos::new(3, 3, 3));
        assert_eq!(b.center(), (2.0, 2.0, 2.0));
        assert_eq!(b.center_block(), BlockPos::new(2, 2, 2));
    }
}
