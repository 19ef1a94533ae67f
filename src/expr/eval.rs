use super::{EvalError, EvalFunctions, ExpressionEvaluator, Result, Variables};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::sync::{Arc, RwLock};

/// Deepest tree the parser builds; nesting and operator chains both count.
const MAX_DEPTH: usize = 256;
/// Compiled trees kept before the cache starts over.
const CACHE_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    fn apply(&self, a: f64, b: f64) -> f64 {
        let truth = |v: bool| if v { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Lt => truth(a < b),
            BinaryOp::Le => truth(a <= b),
            BinaryOp::Gt => truth(a > b),
            BinaryOp::Ge => truth(a >= b),
            BinaryOp::Eq => truth(a == b),
            BinaryOp::Ne => truth(a != b),
            BinaryOp::And => truth(a != 0.0 && b != 0.0),
            BinaryOp::Or => truth(a != 0.0 || b != 0.0),
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(SmolStr),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(SmolStr, Vec<Expr>),
}

impl Expr {
    pub fn parse(src: &str) -> Result<Expr> {
        let mut parser = Parser {
            src: src.as_bytes(),
            pos: 0,
            depth: 0,
        };
        let expr = parser.parse_or()?;
        parser.skip_ws();
        if parser.pos < parser.src.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Literal value, when the expression does not depend on anything.
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Expr::Number(v) => Some(*v),
            Expr::Neg(e) => e.as_constant().map(|v| -v),
            _ => None,
        }
    }

    pub fn eval(&self, vars: &Variables, funcs: &EvalFunctions) -> Result<f64> {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Variable(name) => vars
                .get(name)
                .or_else(|| constant(name))
                .ok_or_else(|| EvalError::UnknownVariable(name.to_string())),
            Expr::Neg(e) => Ok(-e.eval(vars, funcs)?),
            Expr::Not(e) => Ok(if e.eval(vars, funcs)? == 0.0 { 1.0 } else { 0.0 }),
            Expr::Binary(op, a, b) => Ok(op.apply(a.eval(vars, funcs)?, b.eval(vars, funcs)?)),
            Expr::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(vars, funcs))
                    .collect::<Result<Vec<f64>>>()?;
                funcs.call(name, &values)
            }
        }
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> EvalError {
        EvalError::Syntax {
            pos: self.pos,
            message: message.to_string(),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    /// Consumes `token` if it comes next.
    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        let mut links = 0;
        while self.eat("||") {
            self.enter()?;
            links += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_cmp()?;
        let mut links = 0;
        while self.eat("&&") {
            self.enter()?;
            links += 1;
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let lhs = self.parse_add()?;
        // Two-character operators first.
        let ops = [
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("==", BinaryOp::Eq),
            ("!=", BinaryOp::Ne),
            ("<", BinaryOp::Lt),
            (">", BinaryOp::Gt),
        ];
        for (token, op) in ops {
            if self.eat(token) {
                let rhs = self.parse_add()?;
                return Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)));
            }
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Some(b'+') => BinaryOp::Add,
                Some(b'-') => BinaryOp::Sub,
                _ => {
                    self.depth -= links;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.enter()?;
            links += 1;
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Some(b'*') => BinaryOp::Mul,
                Some(b'/') => BinaryOp::Div,
                Some(b'%') => BinaryOp::Rem,
                _ => {
                    self.depth -= links;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.enter()?;
            links += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_prefix();
        self.depth -= 1;
        expr
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(b'+') => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(b'!') if self.src.get(self.pos + 1) != Some(&b'=') => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_pow(),
        }
    }

    fn parse_pow(&mut self) -> Result<Expr> {
        let base = self.parse_atom()?;
        if self.eat("^") {
            // right associative, binds tighter than unary minus on the left
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                if !self.eat(")") {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while self.pos < self.src.len()
                    && (self.src[self.pos].is_ascii_alphanumeric() || self.src[self.pos] == b'_')
                {
                    self.pos += 1;
                }
                let name = SmolStr::new(String::from_utf8_lossy(&self.src[start..self.pos]));
                if self.eat("(") {
                    let mut args = Vec::new();
                    if !self.eat(")") {
                        loop {
                            args.push(self.parse_or()?);
                            if self.eat(")") {
                                break;
                            }
                            if !self.eat(",") {
                                return Err(self.error("expected ',' or ')'"));
                            }
                        }
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_number(&mut self) -> Result<Expr> {
        let start = self.pos;
        let digits = |p: &mut Self| {
            while p.pos < p.src.len() && (p.src[p.pos].is_ascii_digit() || p.src[p.pos] == b'.') {
                p.pos += 1;
            }
        };
        digits(self);
        if matches!(self.src.get(self.pos), Some(b'e') | Some(b'E'))
            && matches!(self.src.get(self.pos + 1), Some(c) if c.is_ascii_digit() || *c == b'-' || *c == b'+')
        {
            self.pos += 2;
            digits(self);
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
        text.parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| EvalError::Syntax {
                pos: start,
                message: format!("invalid number '{}'", text),
            })
    }
}

/// Default evaluator. Parsed trees are cached by source text.
#[derive(Debug, Default)]
pub struct Evaluator {
    cache: RwLock<FxHashMap<String, Arc<Expr>>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, src: &str) -> Result<Arc<Expr>> {
        if let Some(expr) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(src)
        {
            return Ok(expr.clone());
        }
        let expr = Arc::new(Expr::parse(src)?);
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if cache.len() >= CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(src.to_string(), expr.clone());
        Ok(expr)
    }
}

impl ExpressionEvaluator for Evaluator {
    fn eval(&self, expr: &str, vars: &Variables, funcs: &EvalFunctions) -> Result<f64> {
        self.compile(expr)?.eval(vars, funcs)
    }

    fn validate(&self, expr: &str) -> Result<()> {
        self.compile(expr).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> f64 {
        let vars = Variables::new().with("x", 3.0).with("y", -2.0);
        Evaluator::new()
            .eval(src, &vars, &EvalFunctions::default())
            .unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("-2 ^ 2"), -4.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("7 % 4 - 1"), 2.0);
        assert_eq!(eval("1.5e2"), 150.0);
    }

    #[test]
    fn test_variables_and_functions() {
        assert_eq!(eval("x * y"), -6.0);
        assert_eq!(eval("max(x, y, 10)"), 10.0);
        assert_eq!(eval("abs(y) + floor(2.7)"), 4.0);
        assert!((eval("cos(pi)") + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval("x > 2 && y < 0"), 1.0);
        assert_eq!(eval("x > 5 || y > 0"), 0.0);
        assert_eq!(eval("!(x == 3)"), 0.0);
        assert_eq!(eval("x != 3"), 0.0);
        assert_eq!(eval("(x >= 3) * 80 + 20"), 100.0);
    }

    #[test]
    fn test_errors() {
        let ev = Evaluator::new();
        let funcs = EvalFunctions::default();
        let vars = Variables::new();
        assert!(matches!(ev.validate("1 +"), Err(EvalError::Syntax { .. })));
        assert!(matches!(ev.validate("(1"), Err(EvalError::Syntax { .. })));
        assert!(matches!(ev.validate("1 2"), Err(EvalError::Syntax { .. })));
        assert!(matches!(ev.validate("f(1,"), Err(EvalError::Syntax { .. })));
        assert!(matches!(
            ev.eval("q + 1", &vars, &funcs),
            Err(EvalError::UnknownVariable(_))
        ));
        assert!(matches!(
            ev.eval("nothing(1)", &vars, &funcs),
            Err(EvalError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(Expr::parse(&nested), Err(EvalError::Syntax { .. })));
        let negated = format!("{}1", "-".repeat(10_000));
        assert!(matches!(Expr::parse(&negated), Err(EvalError::Syntax { .. })));
        let chain = vec!["1"; 10_000].join("+");
        assert!(matches!(Expr::parse(&chain), Err(EvalError::Syntax { .. })));

        let shallow = format!("{}x{}", "(".repeat(40), ")".repeat(40));
        assert!(Expr::parse(&shallow).is_ok());
        assert!(Expr::parse(&vec!["x"; 50].join(" * ")).is_ok());
        assert_eq!(eval(&format!("{}3", "--".repeat(20))), 3.0);
    }

    #[test]
    fn test_cache_is_bounded() {
        let ev = Evaluator::new();
        for i in 0..CACHE_LIMIT + 10 {
            ev.validate(&format!("x + {}", i)).unwrap();
        }
        let cached = ev.cache.read().unwrap().len();
        assert!(cached <= CACHE_LIMIT);
        assert!(cached > 0);
    }

    #[test]
    fn test_constant_folding_hint() {
        assert_eq!(Expr::parse("-4.5").unwrap().as_constant(), Some(-4.5));
        assert_eq!(Expr::parse("x").unwrap().as_constant(), None);
    }
}
