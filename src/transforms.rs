use crate::block_position::{BlockPos, Facing};
use crate::block_state::BlockState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    fn from_name(s: &str) -> Option<Axis> {
        match s {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    /// The two axes spanning the rotation plane, ordered so a quarter turn
    /// maps `a` onto `b`'s slot.
    fn plane(&self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

pub(crate) fn get_axis(p: BlockPos, axis: Axis) -> i32 {
    match axis {
        Axis::X => p.x,
        Axis::Y => p.y,
        Axis::Z => p.z,
    }
}

pub(crate) fn set_axis(p: &mut BlockPos, axis: Axis, v: i32) {
    match axis {
        Axis::X => p.x = v,
        Axis::Y => p.y = v,
        Axis::Z => p.z = v,
    }
}

/// Quarter turn of a local coordinate inside a buffer of `size`:
/// `a' = b`, `b' = size_a - 1 - a`. Works for points outside the buffer too.
pub fn rotate_local_90(p: BlockPos, size: BlockPos, axis: Axis) -> BlockPos {
    let (a, b) = axis.plane();
    let mut out = p;
    set_axis(&mut out, a, get_axis(p, b));
    set_axis(&mut out, b, get_axis(size, a) - 1 - get_axis(p, a));
    out
}

/// Buffer extents after a quarter turn: the two plane axes swap.
pub fn rotate_size_90(size: BlockPos, axis: Axis) -> BlockPos {
    let (a, b) = axis.plane();
    let mut out = size;
    set_axis(&mut out, a, get_axis(size, b));
    set_axis(&mut out, b, get_axis(size, a));
    out
}

/// Mirror of a local coordinate along `axis` inside a buffer of `size`.
pub fn flip_local(p: BlockPos, size: BlockPos, axis: Axis) -> BlockPos {
    let mut out = p;
    set_axis(&mut out, axis, get_axis(size, axis) - 1 - get_axis(p, axis));
    out
}

fn rotate_vector_90(v: BlockPos, axis: Axis) -> BlockPos {
    let (a, b) = axis.plane();
    let mut out = v;
    set_axis(&mut out, a, get_axis(v, b));
    set_axis(&mut out, b, -get_axis(v, a));
    out
}

fn facing_from_name(s: &str) -> Option<Facing> {
    match s {
        "down" => Some(Facing::Down),
        "up" => Some(Facing::Up),
        "north" => Some(Facing::North),
        "south" => Some(Facing::South),
        "west" => Some(Facing::West),
        "east" => Some(Facing::East),
        _ => None,
    }
}

fn facing_name(f: Facing) -> &'static str {
    match f {
        Facing::Down => "down",
        Facing::Up => "up",
        Facing::North => "north",
        Facing::South => "south",
        Facing::West => "west",
        Facing::East => "east",
    }
}

fn facing_from_vector(v: BlockPos) -> Option<Facing> {
    Facing::ALL.into_iter().find(|f| f.direction() == v)
}

/// Rotate orientation properties (`facing`, `axis`, `rotation`) of a block
/// by a multiple of 90 degrees around `axis`, matching `rotate_local_90`.
pub fn transform_block_state_rotate(block: &BlockState, axis: Axis, degrees: i32) -> BlockState {
    let turns = ((degrees / 90) % 4 + 4) % 4;
    let mut out = block.clone();
    for _ in 0..turns {
        out = rotate_once(&out, axis);
    }
    out
}

fn rotate_once(block: &BlockState, axis: Axis) -> BlockState {
    let mut out = block.clone();
    if let Some(facing) = block.get_property("facing").and_then(|f| facing_from_name(f)) {
        if let Some(rotated) = facing_from_vector(rotate_vector_90(facing.direction(), axis)) {
            out.set_property("facing", facing_name(rotated));
        }
    }
    if let Some(block_axis) = block.get_property("axis").and_then(|a| Axis::from_name(a)) {
        let (a, b) = axis.plane();
        let swapped = if block_axis == a {
            b
        } else if block_axis == b {
            a
        } else {
            block_axis
        };
        out.set_property("axis", swapped.name());
    }
    if axis == Axis::Y {
        if let Some(r) = block.get_property("rotation").and_then(|r| r.parse::<i32>().ok()) {
            out.set_property("rotation", ((r + 12) % 16).to_string());
        }
    }
    out
}

/// Mirror orientation properties of a block along `axis`.
pub fn transform_block_state_flip(block: &BlockState, axis: Axis) -> BlockState {
    let mut out = block.clone();
    if let Some(facing) = block.get_property("facing").and_then(|f| facing_from_name(f)) {
        let mut v = facing.direction();
        let negated = -get_axis(v, axis);
        set_axis(&mut v, axis, negated);
        if let Some(flipped) = facing_from_vector(v) {
            out.set_property("facing", facing_name(flipped));
        }
    }
    match axis {
        Axis::Y => {
            for key in ["half", "type"] {
                let swapped = match block.get_property(key).map(|v| v.as_str()) {
                    Some("top") => "bottom",
                    Some("bottom") => "top",
                    _ => continue,
                };
                out.set_property(key, swapped);
            }
        }
        Axis::X | Axis::Z => {
            if let Some(r) = block.get_property("rotation").and_then(|r| r.parse::<i32>().ok()) {
                let mirrored = if axis == Axis::X {
                    (16 - r) % 16
                } else {
                    (24 - r) % 16
                };
                out.set_property("rotation", mirrored.to_string());
            }
        }
    }
    out
}
