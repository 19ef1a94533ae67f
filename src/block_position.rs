use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Identifier of a parallel world/level a position belongs to.
pub type DimensionId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ZERO: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPos { x, y, z }
    }

    pub fn splat(v: i32) -> Self {
        BlockPos { x: v, y: v, z: v }
    }

    pub fn distance_squared(&self, other: &BlockPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance_to(&self, other: &BlockPos) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    pub fn component_min(&self, other: &BlockPos) -> BlockPos {
        BlockPos::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn component_max(&self, other: &BlockPos) -> BlockPos {
        BlockPos::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Inclusive test against an ordered min/max pair.
    pub fn contained_within(&self, min: &BlockPos, max: &BlockPos) -> bool {
        self.x >= min.x
            && self.x <= max.x
            && self.y >= min.y
            && self.y <= max.y
            && self.z >= min.z
            && self.z <= max.z
    }

    pub fn offset(&self, facing: Facing) -> BlockPos {
        *self + facing.direction()
    }

    /// The six face-adjacent positions, in `Facing::ALL` order.
    pub fn neighbors(&self) -> [BlockPos; 6] {
        Facing::ALL.map(|f| self.offset(f))
    }

    /// Sum of the three components.
    pub fn component_sum(&self) -> i64 {
        self.x as i64 + self.y as i64 + self.z as i64
    }

    /// Center of the block in world space.
    pub fn center(&self) -> (f64, f64, f64) {
        (
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }

    pub fn to_nbt(&self) -> NbtTag {
        NbtTag::IntArray(vec![self.x, self.y, self.z])
    }

    pub fn from_nbt(tag: &NbtTag) -> Result<Self, String> {
        match tag {
            NbtTag::IntArray(arr) if arr.len() == 3 => Ok(BlockPos::new(arr[0], arr[1], arr[2])),
            NbtTag::Compound(c) => {
                let get = |key: &str| match c.get::<_, &NbtTag>(key) {
                    Ok(NbtTag::Int(v)) => Ok(*v),
                    _ => Err(format!("Invalid block position component {}", key)),
                };
                Ok(BlockPos::new(get("x")?, get("y")?, get("z")?))
            }
            _ => Err("Invalid block position tag".to_string()),
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from(t: (i32, i32, i32)) -> Self {
        BlockPos::new(t.0, t.1, t.2)
    }
}

impl From<BlockPos> for (i32, i32, i32) {
    fn from(p: BlockPos) -> Self {
        (p.x, p.y, p.z)
    }
}

impl Add for BlockPos {
    type Output = BlockPos;
    fn add(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;
    fn sub(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<i32> for BlockPos {
    type Output = BlockPos;
    fn mul(self, rhs: i32) -> BlockPos {
        BlockPos::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<i32> for BlockPos {
    type Output = BlockPos;
    fn div(self, rhs: i32) -> BlockPos {
        BlockPos::new(
            self.x.div_euclid(rhs),
            self.y.div_euclid(rhs),
            self.z.div_euclid(rhs),
        )
    }
}

impl Neg for BlockPos {
    type Output = BlockPos;
    fn neg(self) -> BlockPos {
        BlockPos::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for BlockPos {
    fn add_assign(&mut self, rhs: BlockPos) {
        *self = *self + rhs;
    }
}

impl SubAssign for BlockPos {
    fn sub_assign(&mut self, rhs: BlockPos) {
        *self = *self - rhs;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Facing {
    pub const ALL: [Facing; 6] = [
        Facing::Down,
        Facing::Up,
        Facing::North,
        Facing::South,
        Facing::West,
        Facing::East,
    ];

    pub fn direction(&self) -> BlockPos {
        match self {
            Facing::Down => BlockPos::new(0, -1, 0),
            Facing::Up => BlockPos::new(0, 1, 0),
            Facing::North => BlockPos::new(0, 0, -1),
            Facing::South => BlockPos::new(0, 0, 1),
            Facing::West => BlockPos::new(-1, 0, 0),
            Facing::East => BlockPos::new(1, 0, 0),
        }
    }

    pub fn opposite(&self) -> Facing {
        match self {
            Facing::Down => Facing::Up,
            Facing::Up => Facing::Down,
            Facing::North => Facing::South,
            Facing::South => Facing::North,
            Facing::West => Facing::East,
            Facing::East => Facing::West,
        }
    }
}

/// A value tagged with the dimension it lives in. Two values are equal only
/// when both the dimension and the value match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithDim<T> {
    pub dim: DimensionId,
    pub value: T,
}

impl<T> WithDim<T> {
    pub fn new(dim: DimensionId, value: T) -> Self {
        WithDim { dim, value }
    }
}

impl WithDim<BlockPos> {
    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("dim", NbtTag::Int(self.dim));
        compound.insert("pos", self.value.to_nbt());
        NbtTag::Compound(compound)
    }

    pub fn from_nbt(tag: &NbtTag) -> Result<Self, String> {
        let NbtTag::Compound(compound) = tag else {
            return Err("Expected compound for dimension-tagged position".to_string());
        };
        let dim = match compound.get::<_, &NbtTag>("dim") {
            Ok(NbtTag::Int(d)) => *d,
            _ => return Err("Invalid dim tag".to_string()),
        };
        let pos = compound
            .get::<_, &NbtTag>("pos")
            .map_err(|e| format!("Failed to get pos: {}", e))?;
        Ok(WithDim::new(dim, BlockPos::from_nbt(pos)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = BlockPos::new(1, 2, 3);
        let b = BlockPos::new(-4, 5, 0);
        assert_eq!(a + b, BlockPos::new(-3, 7, 3));
        assert_eq!(a - b, BlockPos::new(5, -3, 3));
        assert_eq!(a * 2, BlockPos::new(2, 4, 6));
        assert_eq!(-a, BlockPos::new(-1, -2, -3));
        assert_eq!(BlockPos::new(-3, 3, 1) / 2, BlockPos::new(-2, 1, 0));
    }

    #[test]
    fn test_neighbors_are_distinct_and_adjacent() {
        let p = BlockPos::new(10, 64, -3);
        let n = p.neighbors();
        for (i, a) in n.iter().enumerate() {
            assert_eq!(a.distance_squared(&p), 1);
            for b in &n[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_with_dim_equality() {
        let p = BlockPos::new(1, 1, 1);
        assert_eq!(WithDim::new(0, p), WithDim::new(0, p));
        assert_ne!(WithDim::new(0, p), WithDim::new(1, p));
    }

    #[test]
    fn test_with_dim_nbt_roundtrip() {
        let v = WithDim::new(2, BlockPos::new(-7, 300, 12));
        assert_eq!(WithDim::from_nbt(&v.to_nbt()).unwrap(), v);
    }
}
