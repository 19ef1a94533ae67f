//! Weighted block patterns.
//!
//! A pattern is a comma-separated list of `[weight%]descriptor[:data]` terms,
//! for example `80%stone,20%'y/10'%wool:'x%16'`, or the single directive
//! `#clipboard [@c] [x,y,z]` which tiles the player's clipboard over the
//! target. Parsing is done once; descriptors that depend on expressions are
//! resolved per position when sampling.

mod raw_block;
mod token;

pub use raw_block::{DataSpec, RawBlock, Weight};
pub use token::{tokenize, Spanned, Token};

use crate::block_entry::BlockEntry;
use crate::block_position::BlockPos;
use crate::block_state::BlockState;
use crate::clipboard::Clipboard;
use crate::expr::{EvalError, EvalFunctions, Evaluator, ExpressionEvaluator, Variables};
use crate::host::BlockRegistry;
use crate::region::Region;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Below this total weight nothing is drawn.
pub const MIN_TOTAL_WEIGHT: f64 = 1e-32;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PatternError {
    #[error("Empty pattern")]
    Empty,
    #[error("Unterminated quote starting at {pos}")]
    UnterminatedQuote { pos: usize },
    #[error("Unterminated brace starting at {pos}")]
    UnterminatedBrace { pos: usize },
    #[error("Unterminated block state list starting at {pos}")]
    UnterminatedStates { pos: usize },
    #[error("Invalid block state '{text}' at {pos}")]
    InvalidState { pos: usize, text: String },
    #[error("Unexpected character '{ch}' at {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("Invalid number '{text}' at {pos}")]
    InvalidNumber { pos: usize, text: String },
    #[error("Expected {what} at {pos}")]
    Expected { pos: usize, what: &'static str },
    #[error("Invalid SNBT at {pos}: {message}")]
    InvalidSnbt { pos: usize, message: String },
    #[error("Negative weight at {pos}")]
    NegativeWeight { pos: usize },
    #[error("Invalid expression at {pos}: {source}")]
    Expression { pos: usize, source: EvalError },
    #[error("Unknown directive '#{name}' at {pos}")]
    UnknownDirective { pos: usize, name: String },
    #[error("#clipboard cannot be combined with other terms (at {pos})")]
    MixedClipboard { pos: usize },
}

pub type Result<T> = std::result::Result<T, PatternError>;

#[derive(Debug, Clone, PartialEq)]
pub struct PatternEntry {
    pub weight: Weight,
    pub block: RawBlock,
}

/// `#clipboard` binding: sample the clipboard tiled from the acting region's
/// center (`@c`) or min corner, shifted back by `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipboardRef {
    pub centered: bool,
    pub offset: BlockPos,
}

impl ClipboardRef {
    pub fn bias(&self, region: Option<&Region>) -> BlockPos {
        let anchor = match region {
            Some(region) if self.centered => region.center_block(),
            Some(region) => region.bounding_box().min,
            None => BlockPos::ZERO,
        };
        anchor - self.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Blocks(Vec<PatternEntry>),
    Clipboard(ClipboardRef),
}

/// Everything a pattern needs from the outside when it is sampled.
#[derive(Clone, Copy)]
pub struct PatternContext<'a> {
    pub evaluator: &'a dyn ExpressionEvaluator,
    pub funcs: &'a EvalFunctions,
    pub registry: &'a dyn BlockRegistry,
    pub clipboard: Option<&'a Clipboard>,
    pub region: Option<&'a Region>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    text: String,
    source: Source,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        Pattern::parse(s)
    }
}

/// Index of the first entry whose cumulative weight reaches the draw
/// `unit * total` (`unit` uniform in 0..1). Zero-weight entries are never
/// selected; a draw left past the final sum by rounding lands on the last
/// entry.
pub fn weighted_index(weights: &[f64], unit: f64) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if !(total >= MIN_TOTAL_WEIGHT) {
        return None;
    }
    let draw = unit * total;
    let mut sum = 0.0;
    for (i, w) in weights.iter().enumerate() {
        sum += w;
        if *w > 0.0 && draw <= sum {
            return Some(i);
        }
    }
    weights.iter().rposition(|w| *w > 0.0)
}

impl Pattern {
    /// Parses with the bundled [`Evaluator`] checking quoted expressions.
    pub fn parse(src: &str) -> Result<Pattern> {
        Self::parse_with(src, &Evaluator::new())
    }

    /// Parses `src`, validating every quoted expression with `evaluator`.
    /// Either the whole pattern is built or an error is returned.
    pub fn parse_with(src: &str, evaluator: &dyn ExpressionEvaluator) -> Result<Pattern> {
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err(PatternError::Empty);
        }
        let mut parser = Parser {
            tokens,
            i: 0,
            end: src.len(),
            evaluator,
        };
        let source = parser.pattern()?;
        Ok(Pattern {
            text: src.to_string(),
            source,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn entries(&self) -> &[PatternEntry] {
        match &self.source {
            Source::Blocks(entries) => entries,
            Source::Clipboard(_) => &[],
        }
    }

    pub fn clipboard_ref(&self) -> Option<&ClipboardRef> {
        match &self.source {
            Source::Clipboard(cb) => Some(cb),
            Source::Blocks(_) => None,
        }
    }

    pub fn is_clipboard(&self) -> bool {
        self.clipboard_ref().is_some()
    }

    /// Weighted draw over the entries. `Ok(None)` when every weight is zero.
    pub fn pick_entry<R: Rng + ?Sized>(
        &self,
        ctx: &PatternContext<'_>,
        vars: &Variables,
        rng: &mut R,
    ) -> std::result::Result<Option<&PatternEntry>, EvalError> {
        let entries = self.entries();
        if let [only] = entries {
            if let Weight::Constant(w) = only.weight {
                return Ok((w >= MIN_TOTAL_WEIGHT).then_some(only));
            }
        }
        let mut weights = Vec::with_capacity(entries.len());
        for entry in entries {
            weights.push(entry.weight.value(ctx.evaluator, vars, ctx.funcs)?);
        }
        Ok(weighted_index(&weights, rng.gen::<f64>()).map(|i| &entries[i]))
    }

    /// Block to place at `pos`. `Ok(None)` means skip the position: all
    /// weights were zero, an id did not resolve, or the clipboard is empty.
    pub fn get_block<R: Rng + ?Sized>(
        &self,
        ctx: &PatternContext<'_>,
        pos: BlockPos,
        vars: &Variables,
        rng: &mut R,
    ) -> std::result::Result<Option<BlockEntry>, EvalError> {
        match &self.source {
            Source::Clipboard(cb) => {
                let Some(clipboard) = ctx.clipboard.filter(|c| c.is_used()) else {
                    return Ok(None);
                };
                let local = pos - cb.bias(ctx.region);
                Ok(clipboard.get_loop(local).cloned())
            }
            Source::Blocks(_) => match self.pick_entry(ctx, vars, rng)? {
                Some(entry) => entry.block.resolve(ctx.evaluator, ctx.registry, vars, ctx.funcs),
                None => Ok(None),
            },
        }
    }

    /// True when any literal entry describes `block`.
    pub fn matches(&self, block: &BlockState, registry: &dyn BlockRegistry) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.block.matches(block, registry))
    }
}

struct Parser<'e> {
    tokens: Vec<Spanned>,
    i: usize,
    end: usize,
    evaluator: &'e dyn ExpressionEvaluator,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.i).map(|s| &s.token)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.i + 1).map(|s| &s.token)
    }

    fn pos(&self) -> usize {
        self.tokens.get(self.i).map_or(self.end, |s| s.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.i).cloned();
        self.i += 1;
        token
    }

    fn expression(&self, text: String, pos: usize) -> Result<String> {
        self.evaluator
            .validate(&text)
            .map_err(|source| PatternError::Expression { pos, source })?;
        Ok(text)
    }

    fn pattern(&mut self) -> Result<Source> {
        if let Some(Token::Directive(_)) = self.peek() {
            return self.clipboard();
        }
        let mut entries = Vec::new();
        loop {
            entries.push(self.term()?);
            match self.next() {
                None => break,
                Some(Spanned { token: Token::Comma, .. }) => {}
                Some(Spanned { pos, .. }) => {
                    return Err(PatternError::Expected { pos, what: "','" })
                }
            }
        }
        Ok(Source::Blocks(entries))
    }

    fn clipboard(&mut self) -> Result<Source> {
        let pos = self.pos();
        let Some(Spanned { token: Token::Directive(name), .. }) = self.next() else {
            return Err(PatternError::Expected { pos, what: "directive" });
        };
        if name != "clipboard" {
            return Err(PatternError::UnknownDirective {
                pos,
                name: name.to_string(),
            });
        }
        let mut cb = ClipboardRef::default();
        if let Some(Token::Flag(flag)) = self.peek() {
            if flag != "c" {
                return Err(PatternError::Expected { pos: self.pos(), what: "'@c'" });
            }
            cb.centered = true;
            self.i += 1;
        }
        let mut offset = [0i32; 3];
        for (axis, slot) in offset.iter_mut().enumerate() {
            if axis > 0 {
                if self.peek() != Some(&Token::Comma) {
                    break;
                }
                self.i += 1;
            } else if !matches!(self.peek(), Some(Token::Number(_))) {
                break;
            }
            let pos = self.pos();
            match self.next() {
                Some(Spanned { token: Token::Number(text), .. }) => {
                    *slot = text.parse().map_err(|_| PatternError::InvalidNumber {
                        pos,
                        text: text.to_string(),
                    })?;
                }
                _ => return Err(PatternError::Expected { pos, what: "integer offset" }),
            }
        }
        cb.offset = BlockPos::new(offset[0], offset[1], offset[2]);
        if self.i < self.tokens.len() {
            return Err(PatternError::MixedClipboard { pos: self.pos() });
        }
        Ok(Source::Clipboard(cb))
    }

    fn weight(&mut self) -> Result<Weight> {
        if self.peek2() != Some(&Token::Percent) {
            return Ok(Weight::Constant(1.0));
        }
        let pos = self.pos();
        let weight = match self.next().map(|s| s.token) {
            Some(Token::Number(text)) => {
                let v: f64 = text.parse().map_err(|_| PatternError::InvalidNumber {
                    pos,
                    text: text.to_string(),
                })?;
                if v < 0.0 {
                    return Err(PatternError::NegativeWeight { pos });
                }
                Weight::Constant(v)
            }
            Some(Token::Quoted(text)) => Weight::Expr(self.expression(text, pos)?),
            _ => return Err(PatternError::Expected { pos, what: "weight" }),
        };
        self.i += 1;
        Ok(weight)
    }

    fn data(&mut self) -> Result<DataSpec> {
        if self.peek() != Some(&Token::Colon) {
            return Ok(DataSpec::Any);
        }
        self.i += 1;
        let pos = self.pos();
        match self.next().map(|s| s.token) {
            Some(Token::Number(text)) => text
                .parse::<u16>()
                .map(DataSpec::Value)
                .map_err(|_| PatternError::InvalidNumber {
                    pos,
                    text: text.to_string(),
                }),
            Some(Token::Quoted(text)) => Ok(DataSpec::Expr(self.expression(text, pos)?)),
            _ => Err(PatternError::Expected { pos, what: "data value" }),
        }
    }

    fn term(&mut self) -> Result<PatternEntry> {
        let weight = self.weight()?;
        let pos = self.pos();
        let Some(spanned) = self.next() else {
            return Err(PatternError::Expected { pos, what: "block" });
        };
        let block = match spanned.token {
            Token::Ident { name, states } => {
                let data = self.data()?;
                RawBlock::from_ident(&name, &states, data)
            }
            Token::Number(text) => {
                let id = text.parse::<i32>().map_err(|_| PatternError::InvalidNumber {
                    pos,
                    text: text.to_string(),
                })?;
                RawBlock::Legacy {
                    id,
                    data: self.data()?,
                }
            }
            Token::Quoted(text) => RawBlock::LegacyExpr {
                id: self.expression(text, pos)?,
                data: self.data()?,
            },
            Token::RtQuoted(text) => RawBlock::RuntimeExpr(self.expression(text, pos)?),
            Token::Snbt(text) => RawBlock::from_snbt(&text, pos)?,
            Token::Directive(name) if name == "clipboard" => {
                return Err(PatternError::MixedClipboard { pos })
            }
            Token::Directive(name) => {
                return Err(PatternError::UnknownDirective {
                    pos,
                    name: name.to_string(),
                })
            }
            _ => return Err(PatternError::Expected { pos, what: "block" }),
        };
        Ok(PatternEntry { weight, block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn named(name: &str) -> RawBlock {
        RawBlock::Named {
            block: BlockState::new(name),
            data: DataSpec::Any,
        }
    }

    #[test]
    fn test_parse_weighted_terms() {
        let pattern = Pattern::parse("80%stone, 20%minecraft:air").unwrap();
        assert_eq!(
            pattern.entries(),
            &[
                PatternEntry { weight: Weight::Constant(80.0), block: named("minecraft:stone") },
                PatternEntry { weight: Weight::Constant(20.0), block: named("minecraft:air") },
            ]
        );
        assert_eq!(pattern.to_string(), "80%stone, 20%minecraft:air");
    }

    #[test]
    fn test_parse_descriptor_kinds() {
        let pattern =
            Pattern::parse("wool:14,35,'x%4':'y',rt'x',rt7,'y>0'%oak_log[axis=y]").unwrap();
        let blocks: Vec<_> = pattern.entries().iter().map(|e| e.block.clone()).collect();
        assert_eq!(
            blocks[0],
            RawBlock::Named {
                block: BlockState::new("minecraft:wool"),
                data: DataSpec::Value(14)
            }
        );
        assert_eq!(blocks[1], RawBlock::Legacy { id: 35, data: DataSpec::Any });
        assert_eq!(
            blocks[2],
            RawBlock::LegacyExpr {
                id: "x%4".to_string(),
                data: DataSpec::Expr("y".to_string())
            }
        );
        assert_eq!(blocks[3], RawBlock::RuntimeExpr("x".to_string()));
        assert_eq!(blocks[4], RawBlock::Runtime(7));
        assert_eq!(pattern.entries()[5].weight, Weight::Expr("y>0".to_string()));
        assert_eq!(
            blocks[5],
            RawBlock::Named {
                block: BlockState::new("minecraft:oak_log").with_property("axis", "y"),
                data: DataSpec::Any
            }
        );
    }

    #[test]
    fn test_parse_failures_are_structured() {
        assert_eq!(Pattern::parse(""), Err(PatternError::Empty));
        assert_eq!(Pattern::parse("  "), Err(PatternError::Empty));
        assert_eq!(
            Pattern::parse("50%'x+1"),
            Err(PatternError::UnterminatedQuote { pos: 3 })
        );
        assert!(matches!(
            Pattern::parse("stone,"),
            Err(PatternError::Expected { pos: 6, .. })
        ));
        assert!(matches!(Pattern::parse("-5%stone"), Err(PatternError::NegativeWeight { pos: 0 })));
        assert!(matches!(Pattern::parse("1.2.3%stone"), Err(PatternError::InvalidNumber { .. })));
        assert!(matches!(Pattern::parse("stone dirt"), Err(PatternError::Expected { .. })));
        assert!(matches!(Pattern::parse("'x+'%stone"), Err(PatternError::Expression { .. })));
        assert!(matches!(Pattern::parse("{Name:}"), Err(PatternError::InvalidSnbt { .. })));
        assert!(matches!(
            Pattern::parse("stone,#clipboard"),
            Err(PatternError::MixedClipboard { .. })
        ));
        assert!(matches!(
            Pattern::parse("#clipboard,stone"),
            Err(PatternError::MixedClipboard { .. })
        ));
        assert!(matches!(Pattern::parse("#hand"), Err(PatternError::UnknownDirective { .. })));
    }

    #[test]
    fn test_parse_clipboard_directive() {
        let pattern = Pattern::parse("#clipboard @c 1,-2,3").unwrap();
        assert_eq!(
            pattern.clipboard_ref(),
            Some(&ClipboardRef { centered: true, offset: BlockPos::new(1, -2, 3) })
        );
        let plain = Pattern::parse("#clipboard").unwrap();
        assert_eq!(plain.clipboard_ref(), Some(&ClipboardRef::default()));
        assert!(plain.entries().is_empty());
    }

    #[test]
    fn test_weighted_index_boundaries() {
        assert_eq!(weighted_index(&[0.0, 0.0], 0.5), None);
        assert_eq!(weighted_index(&[], 0.5), None);
        assert_eq!(weighted_index(&[0.0, 1.0, 0.0], 0.0), Some(1));
        assert_eq!(weighted_index(&[1.0, 1.0], 0.49), Some(0));
        assert_eq!(weighted_index(&[1.0, 1.0], 0.5), Some(0));
        assert_eq!(weighted_index(&[1.0, 1.0], 0.51), Some(1));
        assert_eq!(weighted_index(&[1.0, 3.0], 0.25), Some(0));
        assert_eq!(weighted_index(&[1.0, 2.0, 0.0], 1.0), Some(1));
        assert_eq!(weighted_index(&[1.0, 1.0], 1.5), Some(1));
        assert_eq!(weighted_index(&[f64::NAN], 0.5), None);
    }

    #[test]
    fn test_expression_weights_and_skip() {
        let registry = StaticRegistry::new();
        let evaluator = Evaluator::new();
        let funcs = EvalFunctions::default();
        let ctx = PatternContext {
            evaluator: &evaluator,
            funcs: &funcs,
            registry: &registry,
            clipboard: None,
            region: None,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let pattern = Pattern::parse("'y>60'%stone,'y<=60'%dirt").unwrap();
        let high = Variables::new().with("y", 70.0);
        let low = Variables::new().with("y", 10.0);
        for _ in 0..20 {
            let block = pattern.get_block(&ctx, BlockPos::ZERO, &high, &mut rng).unwrap();
            assert_eq!(block.unwrap().block.name, "minecraft:stone");
            let block = pattern.get_block(&ctx, BlockPos::ZERO, &low, &mut rng).unwrap();
            assert_eq!(block.unwrap().block.name, "minecraft:dirt");
        }
        let none = Pattern::parse("0%stone,'-3'%dirt").unwrap();
        assert_eq!(none.get_block(&ctx, BlockPos::ZERO, &high, &mut rng).unwrap(), None);

        let missing = Pattern::parse("'q'%stone").unwrap();
        assert!(missing.get_block(&ctx, BlockPos::ZERO, &high, &mut rng).is_err());
    }

    #[test]
    fn test_matches() {
        let registry = StaticRegistry::new();
        let pattern = Pattern::parse("stone,wool:3").unwrap();
        assert!(pattern.matches(&BlockState::new("minecraft:stone").with_data(2), &registry));
        assert!(pattern.matches(&BlockState::new("minecraft:wool").with_data(3), &registry));
        assert!(!pattern.matches(&BlockState::new("minecraft:wool"), &registry));
        assert!(!pattern.matches(&BlockState::air(), &registry));
    }
}
