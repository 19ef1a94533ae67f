use super::PatternError;
use crate::block_entry::BlockEntry;
use crate::block_state::{qualify_name, BlockState};
use crate::expr::{EvalError, EvalFunctions, ExpressionEvaluator, Variables};
use crate::host::BlockRegistry;
use smol_str::SmolStr;

/// Entry weight: a literal or an expression evaluated per position.
#[derive(Debug, Clone, PartialEq)]
pub enum Weight {
    Constant(f64),
    Expr(String),
}

impl Weight {
    /// Evaluated weight, clamped to be non-negative.
    pub fn value(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        vars: &Variables,
        funcs: &EvalFunctions,
    ) -> Result<f64, EvalError> {
        let v = match self {
            Weight::Constant(v) => *v,
            Weight::Expr(src) => evaluator.eval(src, vars, funcs)?,
        };
        Ok(if v.is_nan() { 0.0 } else { v.max(0.0) })
    }
}

/// Data value of a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSpec {
    /// Not given: 0 when placing, anything when matching.
    Any,
    Value(u16),
    Expr(String),
}

/// One candidate block of a pattern, resolved to a concrete entry at sample
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBlock {
    Named {
        block: BlockState,
        data: DataSpec,
    },
    Legacy {
        id: i32,
        data: DataSpec,
    },
    LegacyExpr {
        id: String,
        data: DataSpec,
    },
    Runtime(u32),
    RuntimeExpr(String),
    /// Primary block, extra layer and block entity from SNBT.
    Snbt(BlockEntry),
}

fn rounded(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        -1
    }
}

impl RawBlock {
    /// Only literal descriptors can be resolved without a position.
    pub fn is_constant(&self) -> bool {
        match self {
            RawBlock::Named { data, .. } | RawBlock::Legacy { data, .. } => {
                !matches!(data, DataSpec::Expr(_))
            }
            RawBlock::Runtime(_) | RawBlock::Snbt(_) => true,
            RawBlock::LegacyExpr { .. } | RawBlock::RuntimeExpr(_) => false,
        }
    }

    fn data_value(
        data: &DataSpec,
        evaluator: &dyn ExpressionEvaluator,
        vars: &Variables,
        funcs: &EvalFunctions,
    ) -> Result<u16, EvalError> {
        Ok(match data {
            DataSpec::Any => 0,
            DataSpec::Value(v) => *v,
            DataSpec::Expr(src) => rounded(evaluator.eval(src, vars, funcs)?).clamp(0, u16::MAX as i64) as u16,
        })
    }

    /// `Ok(None)` when an id does not resolve to a known block.
    pub fn resolve(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        registry: &dyn BlockRegistry,
        vars: &Variables,
        funcs: &EvalFunctions,
    ) -> Result<Option<BlockEntry>, EvalError> {
        let block = match self {
            RawBlock::Named { block, data } => {
                let data = Self::data_value(data, evaluator, vars, funcs)?;
                Some(block.clone().with_data(data))
            }
            RawBlock::Legacy { id, data } => {
                let data = Self::data_value(data, evaluator, vars, funcs)?;
                registry.block_by_legacy_id(*id, data)
            }
            RawBlock::LegacyExpr { id, data } => {
                let id = rounded(evaluator.eval(id, vars, funcs)?);
                let data = Self::data_value(data, evaluator, vars, funcs)?;
                i32::try_from(id)
                    .ok()
                    .and_then(|id| registry.block_by_legacy_id(id, data))
            }
            RawBlock::Runtime(id) => registry.block_by_runtime_id(*id),
            RawBlock::RuntimeExpr(src) => {
                let id = rounded(evaluator.eval(src, vars, funcs)?);
                u32::try_from(id)
                    .ok()
                    .and_then(|id| registry.block_by_runtime_id(id))
            }
            RawBlock::Snbt(entry) => return Ok(Some(entry.clone())),
        };
        Ok(block.map(BlockEntry::new))
    }

    /// Membership test for masks. Expression descriptors never match.
    pub fn matches(&self, block: &BlockState, registry: &dyn BlockRegistry) -> bool {
        let data_ok = |data: &DataSpec| match data {
            DataSpec::Any => true,
            DataSpec::Value(v) => *v == block.data,
            DataSpec::Expr(_) => false,
        };
        match self {
            RawBlock::Named { block: want, data } => {
                want.name == block.name
                    && data_ok(data)
                    && want
                        .properties
                        .iter()
                        .all(|(k, v)| block.get_property(k) == Some(v))
            }
            RawBlock::Legacy { id, data } => {
                registry
                    .block_by_legacy_id(*id, 0)
                    .is_some_and(|b| b.name == block.name)
                    && data_ok(data)
            }
            RawBlock::Runtime(id) => registry.block_by_runtime_id(*id).as_ref() == Some(block),
            RawBlock::Snbt(entry) => entry.block == *block,
            RawBlock::LegacyExpr { .. } | RawBlock::RuntimeExpr(_) => false,
        }
    }

    /// Builds a named descriptor; `rt<n>` names select a runtime index.
    pub(crate) fn from_ident(
        name: &SmolStr,
        states: &[(SmolStr, SmolStr)],
        data: DataSpec,
    ) -> RawBlock {
        if let Some(id) = name
            .strip_prefix("rt")
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|rest| rest.parse::<u32>().ok())
        {
            return RawBlock::Runtime(id);
        }
        let mut properties = states.to_vec();
        properties.sort();
        RawBlock::Named {
            block: BlockState::new(qualify_name(name)).with_properties(properties),
            data,
        }
    }

    /// `{block}` or `{{block}{extra}{block entity}}`.
    pub(crate) fn from_snbt(text: &str, pos: usize) -> Result<RawBlock, PatternError> {
        let invalid = |message: String| PatternError::InvalidSnbt { pos, message };
        let parts = if text.starts_with("{{") {
            split_compounds(&text[1..text.len() - 1])
        } else {
            vec![text]
        };
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid(format!("expected 1 to 3 compounds, found {}", parts.len())));
        }
        let mut compounds = Vec::with_capacity(parts.len());
        for part in parts {
            compounds.push(quartz_nbt::snbt::parse(part).map_err(|e| invalid(e.to_string()))?);
        }
        let block = BlockState::from_nbt(&compounds[0]).map_err(invalid)?;
        let mut entry = BlockEntry::new(block);
        if let Some(extra) = compounds.get(1) {
            entry = entry.with_extra(BlockState::from_nbt(extra).map_err(invalid)?);
        }
        if let Some(be) = compounds.get(2) {
            entry = entry.with_block_entity(be.clone());
        }
        Ok(RawBlock::Snbt(entry))
    }
}

/// Top-level `{...}` runs of `body`, in order.
fn split_compounds(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match in_string {
            Some(q) => {
                if c == b'\\' {
                    i += 1;
                } else if c == q {
                    in_string = None;
                }
            }
            None => match c {
                b'"' | b'\'' => in_string = Some(c),
                b'{' => {
                    if depth == 0 {
                        start = i;
                    }
                    depth += 1;
                }
                b'}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        parts.push(&body[start..=i]);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts
}
