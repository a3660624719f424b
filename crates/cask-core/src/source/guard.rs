//! Guard expression parser shared by the DSL and TOML front-ends.
//!
//! ```text
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | primary
//! primary := '(' or ')'
//!          | 'MacOS.release' op (:symbol | "10.9" | 10.9)
//!          | 'Hardware::CPU.<capability>?'
//! ```

use cask_schema::{Capability, MacRelease};

use super::SourceError;
use super::lexer::{Tok, Token, tokenize};
use crate::predicate::{Predicate, ReleaseOp};

/// Parse a standalone guard string (as written in a TOML `when`).
///
/// # Errors
///
/// Returns a [`SourceError`] when the string does not form exactly one guard
/// expression.
pub fn parse_guard(src: &str, line: usize) -> Result<Predicate, SourceError> {
    let tokens: Vec<Token> = tokenize(src)?
        .into_iter()
        .filter(|t| t.tok != Tok::Newline)
        .map(|t| Token { line, ..t })
        .collect();
    let mut parser = GuardParser::new(&tokens, line);
    let predicate = parser.parse()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error(extra.line, format!("unexpected {} after guard", extra.tok)));
    }
    Ok(predicate)
}

/// Recursive-descent parser over a token slice.
pub(crate) struct GuardParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    line: usize,
}

impl<'t> GuardParser<'t> {
    /// Parse from the start of `tokens`; `line` is used for errors at end of input.
    pub(crate) fn new(tokens: &'t [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    /// Tokens consumed so far.
    pub(crate) fn consumed(&self) -> usize {
        self.pos
    }

    pub(crate) fn parse(&mut self) -> Result<Predicate, SourceError> {
        self.parse_or()
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'t Token, SourceError> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| self.error(self.line, "guard ends unexpectedly".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token { tok: Tok::Op(o), .. }) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, line: usize, message: String) -> SourceError {
        SourceError::Parse { line, message }
    }

    fn parse_or(&mut self) -> Result<Predicate, SourceError> {
        let mut items = vec![self.parse_and()?];
        while self.eat_op("||") {
            items.push(self.parse_and()?);
        }
        Ok(flatten(items, Predicate::Any))
    }

    fn parse_and(&mut self) -> Result<Predicate, SourceError> {
        let mut items = vec![self.parse_unary()?];
        while self.eat_op("&&") {
            items.push(self.parse_unary()?);
        }
        Ok(flatten(items, Predicate::All))
    }

    fn parse_unary(&mut self) -> Result<Predicate, SourceError> {
        if self.eat_op("!") {
            return Ok(Predicate::not(self.parse_unary()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate, SourceError> {
        let token = self.next()?;
        match &token.tok {
            Tok::LParen => {
                let inner = self.parse_or()?;
                match self.next()? {
                    Token {
                        tok: Tok::RParen, ..
                    } => Ok(inner),
                    other => Err(self.error(other.line, format!("expected ')', found {}", other.tok))),
                }
            }
            Tok::Ident(path) if path == "MacOS.release" || path == "MacOS.version" => {
                self.parse_release(token.line)
            }
            Tok::Ident(path) => {
                let method = path.strip_prefix("Hardware::CPU.").ok_or_else(|| {
                    self.error(token.line, format!("unsupported guard term '{path}'"))
                })?;
                Capability::from_method(method)
                    .map(Predicate::Capability)
                    .ok_or_else(|| {
                        self.error(token.line, format!("unknown CPU capability '{method}'"))
                    })
            }
            other => Err(self.error(token.line, format!("unexpected {other} in guard"))),
        }
    }

    fn parse_release(&mut self, line: usize) -> Result<Predicate, SourceError> {
        let op = match self.next()? {
            Token {
                tok: Tok::Op(symbol),
                ..
            } => ReleaseOp::from_symbol(symbol),
            _ => None,
        }
        .ok_or_else(|| self.error(line, "expected a comparison after MacOS.release".to_string()))?;

        let token = match &self.next()?.tok {
            Tok::Sym(name) => name.clone(),
            // Numeric releases normalise to their symbol when known; unknown
            // ones are kept so evaluation reports them.
            Tok::Str(value) | Tok::Num(value) => MacRelease::from_version(value)
                .map_or_else(|_| value.clone(), |r| r.as_str().to_string()),
            other => {
                return Err(self.error(line, format!("expected a release after {}, found {other}", op.symbol())));
            }
        };
        Ok(Predicate::release(op, &token))
    }
}

fn flatten(mut items: Vec<Predicate>, combine: fn(Vec<Predicate>) -> Predicate) -> Predicate {
    if items.len() == 1 {
        items.remove(0)
    } else {
        combine(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_or_release() {
        let p = parse_guard("Hardware::CPU.is_32_bit? || MacOS.release <= :leopard", 1).unwrap();
        assert_eq!(
            p,
            Predicate::Any(vec![
                Predicate::Capability(Capability::Is32Bit),
                Predicate::release(ReleaseOp::Le, "leopard"),
            ])
        );
    }

    #[test]
    fn precedence_and_parentheses() {
        let p = parse_guard("!Hardware::CPU.ppc? && (MacOS.release == :lion || MacOS.release >= :sierra)", 1)
            .unwrap();
        assert_eq!(
            p.to_string(),
            "!Hardware::CPU.ppc? && (MacOS.release == :lion || MacOS.release >= :sierra)"
        );
    }

    #[test]
    fn numeric_release() {
        assert_eq!(
            parse_guard("MacOS.release >= '10.9'", 1).unwrap(),
            Predicate::release(ReleaseOp::Ge, "mavericks")
        );
        assert_eq!(
            parse_guard("MacOS.release < 10.7", 1).unwrap(),
            Predicate::release(ReleaseOp::Lt, "lion")
        );
    }

    #[test]
    fn unknown_release_parses() {
        let p = parse_guard("MacOS.release <= :rhapsody", 1).unwrap();
        assert_eq!(p, Predicate::release(ReleaseOp::Le, "rhapsody"));
    }

    #[test]
    fn errors_carry_line() {
        for bad in [
            "MacOS.release",
            "MacOS.release <=",
            "Hardware::CPU.sparc?",
            "(MacOS.release == :lion",
            "MacOS.release == :lion :tiger",
            "Foo.bar?",
        ] {
            assert!(
                matches!(parse_guard(bad, 7), Err(SourceError::Parse { line: 7, .. })),
                "{bad}"
            );
        }
    }
}
