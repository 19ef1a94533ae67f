use super::PatternError;
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `-?[0-9.]+`, kept as text until its role is known.
    Number(SmolStr),
    /// `'...'` expression.
    Quoted(String),
    /// `rt'...'` runtime-palette expression.
    RtQuoted(String),
    /// Block identifier with an optional `[key=value,...]` suffix.
    Ident {
        name: SmolStr,
        states: Vec<(SmolStr, SmolStr)>,
    },
    /// Balanced `{...}` run.
    Snbt(String),
    /// `#name` directive.
    Directive(SmolStr),
    /// `@name` flag.
    Flag(SmolStr),
    Percent,
    Colon,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Deepest `{`/`[` nesting accepted inside an SNBT run.
const MAX_SNBT_DEPTH: usize = 64;

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn take_while(&mut self, f: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len() && f(self.bytes[self.pos]) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Body of a `'...'` run starting at the opening quote.
    fn quoted(&mut self) -> Result<String, PatternError> {
        let open = self.pos;
        self.pos += 1;
        let body_start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\'' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(PatternError::UnterminatedQuote { pos: open });
        }
        let body = self.src[body_start..self.pos].to_string();
        self.pos += 1;
        Ok(body)
    }

    /// Balanced brace run, skipping braces inside SNBT strings.
    fn braced(&mut self) -> Result<String, PatternError> {
        let open = self.pos;
        let mut depth = 0usize;
        let mut lists = 0usize;
        let mut in_string: Option<u8> = None;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            self.pos += 1;
            match in_string {
                Some(q) => {
                    if c == b'\\' {
                        self.pos += 1;
                    } else if c == q {
                        in_string = None;
                    }
                }
                None => match c {
                    b'"' | b'\'' => in_string = Some(c),
                    b'{' | b'[' => {
                        if c == b'{' {
                            depth += 1;
                        } else {
                            lists += 1;
                        }
                        if depth + lists > MAX_SNBT_DEPTH {
                            return Err(PatternError::InvalidSnbt {
                                pos: open,
                                message: "nested too deeply".to_string(),
                            });
                        }
                    }
                    b']' => lists = lists.saturating_sub(1),
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(self.src[open..self.pos].to_string());
                        }
                    }
                    _ => {}
                },
            }
        }
        Err(PatternError::UnterminatedBrace { pos: open })
    }

    fn ident(&mut self) -> Result<Token, PatternError> {
        let start = self.pos;
        while let Some(c) = self.peek_at(0) {
            let namespace_sep =
                c == b':' && self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic());
            if c.is_ascii_alphanumeric() || c == b'_' || namespace_sep {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name = SmolStr::new(&self.src[start..self.pos]);
        let mut states = Vec::new();
        if self.peek_at(0) == Some(b'[') {
            let open = self.pos;
            let close = self.src[open..]
                .find(']')
                .map(|i| open + i)
                .ok_or(PatternError::UnterminatedStates { pos: open })?;
            let body = &self.src[open + 1..close];
            for pair in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (k, v) = pair
                    .split_once('=')
                    .ok_or_else(|| PatternError::InvalidState {
                        pos: open,
                        text: pair.to_string(),
                    })?;
                states.push((SmolStr::new(k.trim()), SmolStr::new(v.trim())));
            }
            self.pos = close + 1;
        }
        Ok(Token::Ident { name, states })
    }
}

/// Splits a pattern string into typed tokens. Whitespace is ignored.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, PatternError> {
    let mut lx = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(c) = lx.peek_at(0) {
        let pos = lx.pos;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                lx.pos += 1;
                continue;
            }
            b'%' => {
                lx.pos += 1;
                Token::Percent
            }
            b':' => {
                lx.pos += 1;
                Token::Colon
            }
            b',' => {
                lx.pos += 1;
                Token::Comma
            }
            b'\'' => Token::Quoted(lx.quoted()?),
            b'{' => Token::Snbt(lx.braced()?),
            b'#' | b'@' => {
                lx.pos += 1;
                let name = SmolStr::new(lx.take_while(|b| b.is_ascii_alphanumeric() || b == b'_'));
                if name.is_empty() {
                    return Err(PatternError::UnexpectedChar { pos, ch: c as char });
                }
                if c == b'#' {
                    Token::Directive(name)
                } else {
                    Token::Flag(name)
                }
            }
            b'-' | b'0'..=b'9' => {
                lx.pos += 1;
                lx.take_while(|b| b.is_ascii_digit() || b == b'.');
                let text = &src[pos..lx.pos];
                if text == "-" {
                    return Err(PatternError::InvalidNumber {
                        pos,
                        text: text.to_string(),
                    });
                }
                Token::Number(SmolStr::new(text))
            }
            b'r' if lx.peek_at(1) == Some(b't') && lx.peek_at(2) == Some(b'\'') => {
                lx.pos += 2;
                Token::RtQuoted(lx.quoted()?)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => lx.ident()?,
            _ => {
                let ch = src[pos..].chars().next().unwrap_or('?');
                return Err(PatternError::UnexpectedChar { pos, ch });
            }
        };
        tokens.push(Spanned { token, pos });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_weighted_list() {
        assert_eq!(
            kinds("80%stone, 20.5%minecraft:air"),
            vec![
                Token::Number("80".into()),
                Token::Percent,
                Token::Ident { name: "stone".into(), states: vec![] },
                Token::Comma,
                Token::Number("20.5".into()),
                Token::Percent,
                Token::Ident { name: "minecraft:air".into(), states: vec![] },
            ]
        );
    }

    #[test]
    fn test_data_suffix_and_states() {
        assert_eq!(
            kinds("wool:14,oak_log[axis=x, foo=bar]"),
            vec![
                Token::Ident { name: "wool".into(), states: vec![] },
                Token::Colon,
                Token::Number("14".into()),
                Token::Comma,
                Token::Ident {
                    name: "oak_log".into(),
                    states: vec![("axis".into(), "x".into()), ("foo".into(), "bar".into())],
                },
            ]
        );
    }

    #[test]
    fn test_quoted_and_runtime() {
        assert_eq!(
            kinds("'y>3'%rt'x%5':'1+1'"),
            vec![
                Token::Quoted("y>3".into()),
                Token::Percent,
                Token::RtQuoted("x%5".into()),
                Token::Colon,
                Token::Quoted("1+1".into()),
            ]
        );
        assert_eq!(kinds("rt12"), vec![Token::Ident { name: "rt12".into(), states: vec![] }]);
    }

    #[test]
    fn test_snbt_is_balanced() {
        let src = r#"{{name:"a}b"}{name:"c"}}"#;
        assert_eq!(kinds(src), vec![Token::Snbt(src.to_string())]);
    }

    #[test]
    fn test_snbt_nesting_is_capped() {
        let deep = format!("{{a:{}1{}}}", "[".repeat(5_000), "]".repeat(5_000));
        assert!(matches!(tokenize(&deep), Err(PatternError::InvalidSnbt { pos: 0, .. })));
        let braces = format!("{}{}", "{".repeat(5_000), "}".repeat(5_000));
        assert!(matches!(tokenize(&braces), Err(PatternError::InvalidSnbt { .. })));
        let ok = r#"{name:"chest",tag:{Items:[{id:"stone"}]}}"#;
        assert_eq!(kinds(ok), vec![Token::Snbt(ok.to_string())]);
    }

    #[test]
    fn test_clipboard_directive() {
        assert_eq!(
            kinds("#clipboard@c -1,2,3"),
            vec![
                Token::Directive("clipboard".into()),
                Token::Flag("c".into()),
                Token::Number("-1".into()),
                Token::Comma,
                Token::Number("2".into()),
                Token::Comma,
                Token::Number("3".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_runs_fail() {
        assert_eq!(
            tokenize("50%'x+1"),
            Err(PatternError::UnterminatedQuote { pos: 3 })
        );
        assert_eq!(
            tokenize("{name:\"stone\""),
            Err(PatternError::UnterminatedBrace { pos: 0 })
        );
        assert_eq!(
            tokenize("stone[axis=x"),
            Err(PatternError::UnterminatedStates { pos: 5 })
        );
        assert!(matches!(
            tokenize("stone;dirt"),
            Err(PatternError::UnexpectedChar { ch: ';', .. })
        ));
    }
}
