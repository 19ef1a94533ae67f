use super::{get_int, get_int_array, RegionError, Result, Shape};
use crate::block_position::BlockPos;
use crate::bounding_box::BoundingBox;
use quartz_nbt::{NbtCompound, NbtTag};

/// Vertical prism over a polygon in the XZ plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRegion {
    points: Vec<(i32, i32)>,
    min_y: i32,
    max_y: i32,
    bounding_box: BoundingBox,
}

/// `p` lies on the segment `a`-`b`, endpoints included.
fn on_segment(p: (i64, i64), a: (i64, i64), b: (i64, i64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    cross == 0
        && p.0 >= a.0.min(b.0)
        && p.0 <= a.0.max(b.0)
        && p.1 >= a.1.min(b.1)
        && p.1 <= a.1.max(b.1)
}

impl PolygonRegion {
    pub fn new(pos: BlockPos) -> Self {
        let mut p = PolygonRegion {
            points: vec![(pos.x, pos.z)],
            min_y: pos.y,
            max_y: pos.y,
            bounding_box: BoundingBox::from_point(pos),
        };
        p.update_bounding_box();
        p
    }

    pub fn from_box(bbox: BoundingBox) -> Self {
        let (a, b) = (bbox.min, bbox.max);
        let mut p = PolygonRegion {
            points: vec![(a.x, a.z), (b.x, a.z), (b.x, b.z), (a.x, b.z)],
            min_y: a.y,
            max_y: b.y,
            bounding_box: bbox,
        };
        p.points.dedup();
        if p.points.len() > 1 && p.points.first() == p.points.last() {
            p.points.pop();
        }
        p.update_bounding_box();
        p
    }

    /// Polygon corners at the bottom of the prism.
    pub fn vertices(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.points
            .iter()
            .map(move |&(x, z)| BlockPos::new(x, self.min_y, z))
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    fn update_bounding_box(&mut self) {
        let (mut min_x, mut min_z) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_z) = (i32::MIN, i32::MIN);
        for &(x, z) in &self.points {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_z = min_z.min(z);
            max_z = max_z.max(z);
        }
        self.bounding_box = BoundingBox::new(
            BlockPos::new(min_x, self.min_y, min_z),
            BlockPos::new(max_x, self.max_y, max_z),
        );
    }

    fn contains_xz(&self, x: i32, z: i32) -> bool {
        let p = (x as i64, z as i64);
        let n = self.points.len();
        let mut inside = false;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + n - 1) % n];
            let (a, b) = ((a.0 as i64, a.1 as i64), (b.0 as i64, b.1 as i64));
            if on_segment(p, a, b) {
                return true;
            }
            if (a.1 > p.1) != (b.1 > p.1) {
                // x of the edge at row p.1, compared without division
                let lhs = (p.0 - a.0) * (b.1 - a.1);
                let rhs = (b.0 - a.0) * (p.1 - a.1);
                let crosses = if b.1 > a.1 { lhs < rhs } else { lhs > rhs };
                if crosses {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// New vertical span, or `None` for horizontal deltas or an inverted prism.
    fn vertical(changes: &[BlockPos], grow: bool, mut min_y: i32, mut max_y: i32) -> Option<(i32, i32)> {
        for c in changes {
            if c.x != 0 || c.z != 0 {
                return None;
            }
            if (c.y > 0) == grow {
                max_y += c.y;
            } else {
                min_y += c.y;
            }
        }
        (min_y <= max_y).then_some((min_y, max_y))
    }

    pub(crate) fn read_nbt(tag: &NbtCompound) -> Result<Self> {
        let raw = get_int_array(tag, "points")?;
        if raw.is_empty() || raw.len() % 2 != 0 {
            return Err(RegionError::InvalidField {
                field: "points",
                reason: format!("length {} is not a positive even number", raw.len()),
            });
        }
        let min_y = get_int(tag, "minY")?;
        let max_y = get_int(tag, "maxY")?;
        if min_y > max_y {
            return Err(RegionError::InvalidField {
                field: "minY",
                reason: format!("{} is above maxY {}", min_y, max_y),
            });
        }
        let mut p = PolygonRegion {
            points: raw.chunks_exact(2).map(|c| (c[0], c[1])).collect(),
            min_y,
            max_y,
            bounding_box: BoundingBox::default(),
        };
        p.update_bounding_box();
        Ok(p)
    }
}

impl Shape for PolygonRegion {
    fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        *self = PolygonRegion::new(pos);
        true
    }

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        if self.points.contains(&(pos.x, pos.z)) {
            return false;
        }
        self.points.push((pos.x, pos.z));
        self.min_y = self.min_y.min(pos.y);
        self.max_y = self.max_y.max(pos.y);
        self.update_bounding_box();
        true
    }

    fn expand(&mut self, changes: &[BlockPos]) -> bool {
        match Self::vertical(changes, true, self.min_y, self.max_y) {
            Some((min_y, max_y)) => {
                self.min_y = min_y;
                self.max_y = max_y;
                self.update_bounding_box();
                true
            }
            None => false,
        }
    }

    fn contract(&mut self, changes: &[BlockPos]) -> bool {
        match Self::vertical(changes, false, self.min_y, self.max_y) {
            Some((min_y, max_y)) => {
                self.min_y = min_y;
                self.max_y = max_y;
                self.update_bounding_box();
                true
            }
            None => false,
        }
    }

    fn shift(&mut self, delta: BlockPos) -> bool {
        for p in &mut self.points {
            p.0 += delta.x;
            p.1 += delta.z;
        }
        self.min_y += delta.y;
        self.max_y += delta.y;
        self.update_bounding_box();
        true
    }

    fn contains(&self, pos: BlockPos) -> bool {
        pos.y >= self.min_y && pos.y <= self.max_y && self.contains_xz(pos.x, pos.z)
    }

    fn for_each_line(&self, f: &mut dyn FnMut(BlockPos, BlockPos)) {
        let n = self.points.len();
        let at = |i: usize, y: i32| {
            let (x, z) = self.points[i];
            BlockPos::new(x, y, z)
        };
        let edges = match n {
            0 | 1 => 0,
            2 => 1,
            _ => n,
        };
        for i in 0..edges {
            let j = (i + 1) % n;
            f(at(i, self.min_y), at(j, self.min_y));
            if self.max_y != self.min_y {
                f(at(i, self.max_y), at(j, self.max_y));
            }
        }
        if self.max_y != self.min_y {
            for i in 0..n {
                f(at(i, self.min_y), at(i, self.max_y));
            }
        }
    }

    fn write_nbt(&self, tag: &mut NbtCompound) {
        tag.insert(
            "points",
            NbtTag::IntArray(self.points.iter().flat_map(|&(x, z)| [x, z]).collect()),
        );
        tag.insert("minY", NbtTag::Int(self.min_y));
        tag.insert("maxY", NbtTag::Int(self.max_y));
    }
}
