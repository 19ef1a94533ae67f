//! Player selections.
//!
//! A [`Region`] is one of a fixed set of shapes living in a single dimension.
//! Each shape owns the points the player picked and derives its bounding box
//! from them. Mutating calls return `false` when the change is geometrically
//! invalid for the shape and leave it untouched.

mod convex;
mod cuboid;
mod expand;
mod polygon;
mod sphere;

pub use convex::ConvexRegion;
pub use cuboid::CuboidRegion;
pub use expand::ExpandRegion;
pub use polygon::PolygonRegion;
pub use sphere::SphereRegion;

use crate::block_position::{BlockPos, DimensionId};
use crate::bounding_box::{BoundingBox, BoxIter};
use crate::config::Colors;
use crate::host::{GeoHandle, GeometrySink};
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegionError {
    #[error("Missing region field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid region field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Unknown region type {0}")]
    UnknownType(i32),
}

pub type Result<T> = std::result::Result<T, RegionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    #[default]
    Cuboid,
    Expand,
    Sphere,
    #[serde(alias = "poly")]
    Polygon,
    Convex,
}

impl RegionType {
    pub const ALL: [RegionType; 5] = [
        RegionType::Cuboid,
        RegionType::Expand,
        RegionType::Sphere,
        RegionType::Polygon,
        RegionType::Convex,
    ];

    /// Stable tag used in persisted payloads.
    pub fn id(&self) -> i32 {
        match self {
            RegionType::Cuboid => 0,
            RegionType::Expand => 1,
            RegionType::Sphere => 2,
            RegionType::Polygon => 3,
            RegionType::Convex => 4,
        }
    }

    pub fn from_id(id: i32) -> Option<RegionType> {
        RegionType::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegionType::Cuboid => "cuboid",
            RegionType::Expand => "expand",
            RegionType::Sphere => "sphere",
            RegionType::Polygon => "poly",
            RegionType::Convex => "convex",
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cuboid" => Ok(RegionType::Cuboid),
            "expand" => Ok(RegionType::Expand),
            "sphere" => Ok(RegionType::Sphere),
            "poly" | "polygon" => Ok(RegionType::Polygon),
            "convex" => Ok(RegionType::Convex),
            other => Err(format!("Unknown region type '{}'", other)),
        }
    }
}

/// Geometry shared by every selection shape.
pub trait Shape {
    fn bounding_box(&self) -> BoundingBox;

    fn set_main_pos(&mut self, pos: BlockPos) -> bool;

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool;

    /// Whether a new main position invalidates the vice position.
    fn need_reset_vice(&self) -> bool {
        true
    }

    /// Grow by a list of signed per-axis deltas.
    fn expand(&mut self, _changes: &[BlockPos]) -> bool {
        false
    }

    /// Shrink by a list of signed per-axis deltas.
    fn contract(&mut self, _changes: &[BlockPos]) -> bool {
        false
    }

    fn shift(&mut self, delta: BlockPos) -> bool;

    fn contains(&self, pos: BlockPos) -> bool;

    /// Outline segments, in block coordinates.
    fn for_each_line(&self, f: &mut dyn FnMut(BlockPos, BlockPos)) {
        box_edges(&self.bounding_box(), f);
    }

    fn center(&self) -> (f64, f64, f64) {
        self.bounding_box().center()
    }

    /// Number of enclosed positions.
    fn size(&self) -> u64 {
        let bbox = self.bounding_box();
        bbox.iter().filter(|p| self.contains(*p)).count() as u64
    }

    fn write_nbt(&self, tag: &mut NbtCompound);
}

macro_rules! delegate_region {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            RegionShape::Cuboid(s) => s.$method($($arg),*),
            RegionShape::Expand(s) => s.$method($($arg),*),
            RegionShape::Sphere(s) => s.$method($($arg),*),
            RegionShape::Polygon(s) => s.$method($($arg),*),
            RegionShape::Convex(s) => s.$method($($arg),*),
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionShape {
    Cuboid(CuboidRegion),
    Expand(ExpandRegion),
    Sphere(SphereRegion),
    Polygon(PolygonRegion),
    Convex(ConvexRegion),
}

impl RegionShape {
    pub fn region_type(&self) -> RegionType {
        match self {
            RegionShape::Cuboid(_) => RegionType::Cuboid,
            RegionShape::Expand(_) => RegionType::Expand,
            RegionShape::Sphere(_) => RegionType::Sphere,
            RegionShape::Polygon(_) => RegionType::Polygon,
            RegionShape::Convex(_) => RegionType::Convex,
        }
    }
}

impl Shape for RegionShape {
    fn bounding_box(&self) -> BoundingBox {
        delegate_region!(self, bounding_box)
    }

    fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        delegate_region!(self, set_main_pos, pos)
    }

    fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        delegate_region!(self, set_vice_pos, pos)
    }

    fn need_reset_vice(&self) -> bool {
        delegate_region!(self, need_reset_vice)
    }

    fn expand(&mut self, changes: &[BlockPos]) -> bool {
        delegate_region!(self, expand, changes)
    }

    fn contract(&mut self, changes: &[BlockPos]) -> bool {
        delegate_region!(self, contract, changes)
    }

    fn shift(&mut self, delta: BlockPos) -> bool {
        delegate_region!(self, shift, delta)
    }

    fn contains(&self, pos: BlockPos) -> bool {
        delegate_region!(self, contains, pos)
    }

    fn for_each_line(&self, f: &mut dyn FnMut(BlockPos, BlockPos)) {
        delegate_region!(self, for_each_line, f)
    }

    fn center(&self) -> (f64, f64, f64) {
        delegate_region!(self, center)
    }

    fn size(&self) -> u64 {
        delegate_region!(self, size)
    }

    fn write_nbt(&self, tag: &mut NbtCompound) {
        delegate_region!(self, write_nbt, tag)
    }
}

/// A selection shape bound to the dimension it was made in.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    dim: DimensionId,
    shape: RegionShape,
}

impl Region {
    /// New region of `region_type` seeded with a single point.
    pub fn create(region_type: RegionType, dim: DimensionId, pos: BlockPos) -> Region {
        let shape = match region_type {
            RegionType::Cuboid => RegionShape::Cuboid(CuboidRegion::new(pos)),
            RegionType::Expand => RegionShape::Expand(ExpandRegion::new(pos)),
            RegionType::Sphere => RegionShape::Sphere(SphereRegion::new(pos)),
            RegionType::Polygon => RegionShape::Polygon(PolygonRegion::new(pos)),
            RegionType::Convex => RegionShape::Convex(ConvexRegion::new(pos)),
        };
        Region { dim, shape }
    }

    /// New region of `region_type` approximating `bbox`.
    pub fn from_box(region_type: RegionType, dim: DimensionId, bbox: BoundingBox) -> Region {
        let shape = match region_type {
            RegionType::Cuboid => RegionShape::Cuboid(CuboidRegion::from_box(bbox)),
            RegionType::Expand => RegionShape::Expand(ExpandRegion::from_box(bbox)),
            RegionType::Sphere => RegionShape::Sphere(SphereRegion::from_box(bbox)),
            RegionType::Polygon => RegionShape::Polygon(PolygonRegion::from_box(bbox)),
            RegionType::Convex => RegionShape::Convex(ConvexRegion::from_box(bbox)),
        };
        Region { dim, shape }
    }

    pub fn dim(&self) -> DimensionId {
        self.dim
    }

    pub fn region_type(&self) -> RegionType {
        self.shape.region_type()
    }

    pub fn shape(&self) -> &RegionShape {
        &self.shape
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.shape.bounding_box()
    }

    pub fn set_main_pos(&mut self, pos: BlockPos) -> bool {
        self.shape.set_main_pos(pos)
    }

    pub fn set_vice_pos(&mut self, pos: BlockPos) -> bool {
        self.shape.set_vice_pos(pos)
    }

    pub fn need_reset_vice(&self) -> bool {
        self.shape.need_reset_vice()
    }

    pub fn expand(&mut self, changes: &[BlockPos]) -> bool {
        self.shape.expand(changes)
    }

    pub fn contract(&mut self, changes: &[BlockPos]) -> bool {
        self.shape.contract(changes)
    }

    pub fn shift(&mut self, delta: BlockPos) -> bool {
        self.shape.shift(delta)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.shape.contains(pos)
    }

    pub fn center(&self) -> (f64, f64, f64) {
        self.shape.center()
    }

    /// Block containing the geometric center.
    pub fn center_block(&self) -> BlockPos {
        let c = self.center();
        BlockPos::new(c.0.floor() as i32, c.1.floor() as i32, c.2.floor() as i32)
    }

    pub fn size(&self) -> u64 {
        self.shape.size()
    }

    pub fn for_each_line(&self, mut f: impl FnMut(BlockPos, BlockPos)) {
        self.shape.for_each_line(&mut f)
    }

    /// Every enclosed position, Y outermost, then Z, then X.
    pub fn positions(&self) -> RegionIter<'_> {
        RegionIter {
            region: self,
            inner: self.bounding_box().iter(),
        }
    }

    pub fn for_each_block(&self, mut f: impl FnMut(BlockPos)) {
        for pos in self.positions() {
            f(pos);
        }
    }

    /// Draws the selection outline. Shapes disappear when the handles drop.
    pub fn render(&self, sink: &Arc<dyn GeometrySink>, colors: &Colors) -> Vec<GeoHandle> {
        let mut handles = Vec::new();
        let mut push = |id| handles.push(GeoHandle::new(sink.clone(), id));
        match &self.shape {
            RegionShape::Cuboid(_) | RegionShape::Expand(_) => {
                push(sink.draw_box(self.dim, self.bounding_box(), colors.region_line_color));
            }
            RegionShape::Sphere(s) => {
                push(sink.draw_sphere(
                    self.dim,
                    s.center_pos().center(),
                    s.radius(),
                    colors.region_line_color,
                ));
                push(sink.draw_box(
                    self.dim,
                    BoundingBox::from_point(s.center_pos()),
                    colors.region_point_color,
                ));
            }
            RegionShape::Polygon(_) | RegionShape::Convex(_) => {
                self.shape.for_each_line(&mut |a, b| {
                    push(sink.draw_line(self.dim, a.center(), b.center(), colors.region_line_color));
                });
                let points: Vec<BlockPos> = match &self.shape {
                    RegionShape::Polygon(p) => p.vertices().collect(),
                    RegionShape::Convex(c) => c.points().to_vec(),
                    _ => Vec::new(),
                };
                for p in points {
                    push(sink.draw_box(
                        self.dim,
                        BoundingBox::from_point(p),
                        colors.region_point_color,
                    ));
                }
            }
        }
        handles
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("type", NbtTag::Int(self.region_type().id()));
        tag.insert("dim", NbtTag::Int(self.dim));
        tag.insert("box", self.bounding_box().to_nbt());
        self.shape.write_nbt(&mut tag);
        tag
    }

    /// Rebuilds a region from its persisted payload. The stored box is
    /// informational; it is always recomputed from the shape fields.
    pub fn from_nbt(tag: &NbtCompound) -> Result<Region> {
        let type_id = get_int(tag, "type")?;
        let region_type = RegionType::from_id(type_id).ok_or(RegionError::UnknownType(type_id))?;
        let dim = get_int(tag, "dim")?;
        let shape = match region_type {
            RegionType::Cuboid => RegionShape::Cuboid(CuboidRegion::read_nbt(tag)?),
            RegionType::Expand => RegionShape::Expand(ExpandRegion::read_nbt(tag)?),
            RegionType::Sphere => RegionShape::Sphere(SphereRegion::read_nbt(tag)?),
            RegionType::Polygon => RegionShape::Polygon(PolygonRegion::read_nbt(tag)?),
            RegionType::Convex => RegionShape::Convex(ConvexRegion::read_nbt(tag)?),
        };
        Ok(Region { dim, shape })
    }
}

/// Lazy, restartable walk over a region's enclosed positions.
#[derive(Debug, Clone)]
pub struct RegionIter<'a> {
    region: &'a Region,
    inner: BoxIter,
}

impl Iterator for RegionIter<'_> {
    type Item = BlockPos;

    fn next(&mut self) -> Option<BlockPos> {
        let region = self.region;
        self.inner.by_ref().find(|p| region.contains(*p))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

/// The twelve edges of a box, as corner pairs.
pub(crate) fn box_edges(bbox: &BoundingBox, f: &mut dyn FnMut(BlockPos, BlockPos)) {
    let (a, b) = (bbox.min, bbox.max);
    let corner = |x: bool, y: bool, z: bool| {
        BlockPos::new(
            if x { b.x } else { a.x },
            if y { b.y } else { a.y },
            if z { b.z } else { a.z },
        )
    };
    for i in [false, true] {
        for j in [false, true] {
            f(corner(false, i, j), corner(true, i, j));
            f(corner(i, false, j), corner(i, true, j));
            f(corner(i, j, false), corner(i, j, true));
        }
    }
}

pub(crate) fn get_int(tag: &NbtCompound, key: &'static str) -> Result<i32> {
    match tag.get::<_, &NbtTag>(key) {
        Ok(NbtTag::Int(v)) => Ok(*v),
        Ok(other) => Err(RegionError::InvalidField {
            field: key,
            reason: format!("expected int, found {:?}", other),
        }),
        Err(_) => Err(RegionError::MissingField(key)),
    }
}

pub(crate) fn get_double(tag: &NbtCompound, key: &'static str) -> Result<f64> {
    match tag.get::<_, &NbtTag>(key) {
        Ok(NbtTag::Double(v)) => Ok(*v),
        Ok(NbtTag::Float(v)) => Ok(*v as f64),
        Ok(other) => Err(RegionError::InvalidField {
            field: key,
            reason: format!("expected double, found {:?}", other),
        }),
        Err(_) => Err(RegionError::MissingField(key)),
    }
}

pub(crate) fn get_int_array<'a>(tag: &'a NbtCompound, key: &'static str) -> Result<&'a [i32]> {
    match tag.get::<_, &NbtTag>(key) {
        Ok(NbtTag::IntArray(v)) => Ok(v.as_slice()),
        Ok(other) => Err(RegionError::InvalidField {
            field: key,
            reason: format!("expected int array, found {:?}", other),
        }),
        Err(_) => Err(RegionError::MissingField(key)),
    }
}

pub(crate) fn get_pos(tag: &NbtCompound, key: &'static str) -> Result<BlockPos> {
    let tag = tag
        .get::<_, &NbtTag>(key)
        .map_err(|_| RegionError::MissingField(key))?;
    BlockPos::from_nbt(tag).map_err(|reason| RegionError::InvalidField { field: key, reason })
}

/// Flat `[x0, y0, z0, x1, ...]` list of positions.
pub(crate) fn get_pos_list(tag: &NbtCompound, key: &'static str) -> Result<Vec<BlockPos>> {
    let raw = get_int_array(tag, key)?;
    if raw.is_empty() || raw.len() % 3 != 0 {
        return Err(RegionError::InvalidField {
            field: key,
            reason: format!("length {} is not a positive multiple of 3", raw.len()),
        });
    }
    Ok(raw
        .chunks_exact(3)
        .map(|c| BlockPos::new(c[0], c[1], c[2]))
        .collect())
}

pub(crate) fn pos_list_tag(points: &[BlockPos]) -> NbtTag {
    NbtTag::IntArray(points.iter().flat_map(|p| [p.x, p.y, p.z]).collect())
}
