//! Numeric expressions evaluated per position.
//!
//! Patterns and masks carry formulas such as `(y < 60) * 80 + perlin(x/16, z/16)`
//! over position variables (`x`, `y`, `z`, `u`, ...) and registered functions.
//! [`Evaluator`] is the bundled implementation; hosts may provide their own
//! through [`ExpressionEvaluator`].

mod eval;
mod functions;

pub use eval::{Evaluator, Expr};
pub use functions::{EvalFunctions, NoiseKind};

use crate::block_position::BlockPos;
use crate::bounding_box::BoundingBox;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Function '{name}' expects {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// Evaluates a formula against variables and a function table.
pub trait ExpressionEvaluator: Send + Sync {
    fn eval(&self, expr: &str, vars: &Variables, funcs: &EvalFunctions) -> Result<f64>;

    /// Checks syntax without evaluating.
    fn validate(&self, expr: &str) -> Result<()>;
}

/// Named values visible to expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: FxHashMap<SmolStr, f64>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(SmolStr::new(name), value);
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Absolute coordinates, coordinates relative to `bbox.min`, coordinates
    /// normalized to -1..1 across the box, and the box size.
    pub fn for_position(pos: BlockPos, bbox: &BoundingBox) -> Self {
        let mut vars = Variables::new();
        vars.update_position(pos, bbox);
        vars
    }

    /// Overwrites the position variables in place.
    pub fn update_position(&mut self, pos: BlockPos, bbox: &BoundingBox) {
        let size = bbox.get_dimensions();
        let normalized = |p: i32, lo: i32, hi: i32| {
            let half = (hi - lo) as f64 / 2.0;
            if half > 0.0 {
                (p as f64 - (lo as f64 + half)) / half
            } else {
                0.0
            }
        };
        self.set("x", pos.x as f64);
        self.set("y", pos.y as f64);
        self.set("z", pos.z as f64);
        self.set("rx", (pos.x - bbox.min.x) as f64);
        self.set("ry", (pos.y - bbox.min.y) as f64);
        self.set("rz", (pos.z - bbox.min.z) as f64);
        self.set("u", normalized(pos.x, bbox.min.x, bbox.max.x));
        self.set("v", normalized(pos.y, bbox.min.y, bbox.max.y));
        self.set("w", normalized(pos.z, bbox.min.z, bbox.max.z));
        self.set("sx", size.x as f64);
        self.set("sy", size.y as f64);
        self.set("sz", size.z as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_variables() {
        let bbox = BoundingBox::new(BlockPos::new(0, 10, -4), BlockPos::new(4, 10, 4));
        let vars = Variables::for_position(BlockPos::new(4, 10, 0), &bbox);
        assert_eq!(vars.get("x"), Some(4.0));
        assert_eq!(vars.get("rz"), Some(4.0));
        assert_eq!(vars.get("u"), Some(1.0));
        assert_eq!(vars.get("v"), Some(0.0));
        assert_eq!(vars.get("w"), Some(0.0));
        assert_eq!(vars.get("sx"), Some(5.0));
        assert_eq!(vars.get("sy"), Some(1.0));
        assert_eq!(vars.get("missing"), None);
    }
}
