use super::{get_pos_list, pos_list_tag, RegionError, Result, Shape};
use crate::block_position::BlockPos;
use crate::bounding_box::BoundingBox;
use crate::geometry::{cross, dot, sub, vec_of};
use quartz_nbt::NbtCompound;

type Vec3 = [i128; 3];

/// Picked points a hull may hold; rebuilding is cubic in this.
pub const MAX_POINTS: usize = 64;

/// Constraint `normal · p <= offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HalfSpace {
    normal: Vec3,
    offset: i128,
}

impl HalfSpace {
    fn new(normal: Vec3, offset: i128) -> Self {
        let g = gcd(gcd(gcd(normal[0], normal[1]), normal[2]), offset);
        if g > 1 {
            HalfSpace {
                normal: [normal[0] / g, normal[1] / g, normal[2] / g],
                offset: offset / g,
            }
        } else {
            HalfSpace { normal, offset }
        }
    }

    fn flipped(&self) -> Self {
        HalfSpace {
            normal: [-self.normal[0], -self.normal[1], -self.normal[2]],
            offset: -self.offset,
        }
    }

    fn holds(&self, p: Vec3) -> bool {
        dot(self.normal, p) <= self.offset
    }

    fn tight(&self, p: Vec3) -> bool {
        dot(self.normal, p) == self.offset
    }
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn is_zero(v: Vec3) -> bool {
    v == [0, 0, 0]
}

/// Adds the side of `plane` holding every point, if one side does.
fn push_supporting(planes: &mut Vec<HalfSpace>, points: &[Vec3], plane: HalfSpace) {
    let mut above = false;
    let mut below = false;
    for p in points {
        let s = dot(plane.normal, *p) - plane.offset;
        above |= s > 0;
        below |= s < 0;
        if above && below {
            return;
        }
    }
    let h = if above { plane.flipped() } else { plane };
    if !planes.contains(&h) {
        planes.push(h);
    }
}

/// Exact half-space description of the convex hull of integer points.
/// Flat and degenerate hulls are closed with equality constraints.
fn hull_of(points: &[BlockPos]) -> Vec<HalfSpace> {
    let pts: Vec<Vec3> = points.iter().map(|p| vec_of(*p)).collect();
    let mut planes = Vec::new();
    let Some(&origin) = pts.first() else {
        return planes;
    };

    let far = pts.iter().copied().find(|p| *p != origin);
    let Some(far) = far else {
        for axis in 0..3 {
            let mut n = [0; 3];
            n[axis] = 1;
            let h = HalfSpace::new(n, origin[axis]);
            planes.push(h);
            planes.push(h.flipped());
        }
        return planes;
    };
    let dir = sub(far, origin);
    let normal = pts
        .iter()
        .map(|p| cross(dir, sub(*p, origin)))
        .find(|n| !is_zero(*n));

    let Some(normal) = normal else {
        // Collinear: two planes through the line plus the end caps.
        let helper = if dir[0] != 0 || dir[1] != 0 { [0, 0, 1] } else { [1, 0, 0] };
        let n1 = cross(dir, helper);
        let n2 = cross(dir, n1);
        for n in [n1, n2] {
            let h = HalfSpace::new(n, dot(n, origin));
            planes.push(h);
            planes.push(h.flipped());
        }
        let along = pts.iter().map(|p| dot(dir, *p));
        let (lo, hi) = along.fold((i128::MAX, i128::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
        push_supporting(&mut planes, &pts, HalfSpace::new(dir, hi));
        push_supporting(&mut planes, &pts, HalfSpace::new(dir, lo));
        return planes;
    };

    let flat = pts.iter().all(|p| dot(normal, sub(*p, origin)) == 0);
    if flat {
        let h = HalfSpace::new(normal, dot(normal, origin));
        planes.push(h);
        planes.push(h.flipped());
        for (i, a) in pts.iter().enumerate() {
            for b in &pts[i + 1..] {
                let edge = sub(*b, *a);
                if is_zero(edge) {
                    continue;
                }
                let m = cross(edge, normal);
                push_supporting(&mut planes, &pts, HalfSpace::new(m, dot(m, *a)));
            }
        }
        return planes;
    }

    for (i, a) in pts.iter().enumerate() {
        for (j, b) in pts.iter().enumerate().skip(i + 1) {
            for c in &pts[j + 1..] {
                let n = cross(sub(*b, *a), sub(*c, *a));
                if is_zero(n) {
                    continue;
                }
                push_supporting(&mut planes, &pts, HalfSpace::new(n, dot(n, *a)));
            }
        }
    }
    planes
}

/// Convex hull of every picked point.
#[derive(Debug, Clone)]
pub struct ConvexRegion {
    points: Vec<BlockPos>,
    planes: Vec<HalfSpace>,
    bounding_box: BoundingBox,
}

impl PartialEq for ConvexRegion {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

impl ConvexRegion {
    pub fn new(pos: BlockPos) -> Self {
        Self::from_points(vec![pos])
    }

    pub fn from_box(bbox: BoundingBox) -> Self {
        let mut corners = Vec::with_capacity(8);
        for y in [bbox.min.y, bbox.max.y] {
            for z in [bbox.min.z, bbox.max.z] {
                for x in [bbox.min.x, bbox.max.x] {
                    let p = BlockPos::new(x, y, z);
                    if !corners.contains(&p) {
                        corners.push(p);
                    }
                }
            }
        }
        Self::from_points(corners)
    }

    fn from_points(points: Vec<BlockPos>) -> Self {
        let mut c = ConvexRegion {
            points,
            planes: Vec::new(),
            bounding_box: BoundingBox::default(),
        };
        c.update();
        c
    }

    pub fn points(&self) -> &[BlockPos] {
        &self.points
    }

    fn update(&mut self) {
        self.planes = hull_of(&self.points);
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            let mut bbox = BoundingBox::from_point(*first);
            for p in iter {
                bbox.include(*p);
            }
            self.bounding_box = bbox;
        }
    }

    pub(crate) fn read_nbt(tag: &NbtCompound) -> Result<Self> {
        let points = get_pos_list(tag, "points")?;
        if points.is_empty() || points.len() > MAX_POINTS {
            return Err(RegionError::InvalidField {
                field: "points",
                reason: format!("expected 1 to {} points, found {}", MAX_POINTS, points.len()),
            });
        }
        Ok(Self::from_points(points))
    }
}

impl Shape for ConvexRegion {
    fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        *self = ConvexRegion::new(pos);
        true
    }

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        if self.points.len() >= MAX_POINTS || self.points.contains(&pos) {
            return false;
        }
        self.points.push(pos);
        self.update();
        true
    }

    fn shift(&mut self, delta: BlockPos) -> bool {
        for p in &mut self.points {
            *p += delta;
        }
        self.update();
        true
    }

    fn contains(&self, pos: BlockPos) -> bool {
        if !self.bounding_box.contains(pos) {
            return false;
        }
        let p = vec_of(pos);
        self.planes.iter().all(|h| h.holds(p))
    }

    /// Segments between picked points that lie on a hull edge line.
    fn for_each_line(&self, f: &mut dyn FnMut(BlockPos, BlockPos)) {
        for (i, a) in self.points.iter().enumerate() {
            for b in &self.points[i + 1..] {
                let (va, vb) = (vec_of(*a), vec_of(*b));
                let shared: Vec<Vec3> = self
                    .planes
                    .iter()
                    .filter(|h| h.tight(va) && h.tight(vb))
                    .map(|h| h.normal)
                    .collect();
                let on_edge = shared.iter().enumerate().any(|(k, n)| {
                    shared[k + 1..].iter().any(|m| !is_zero(cross(*n, *m)))
                });
                if on_edge {
                    f(*a, *b);
                }
            }
        }
    }

    fn write_nbt(&self, tag: &mut NbtCompound) {
        tag.insert("points", pos_list_tag(&self.points));
    }
}
