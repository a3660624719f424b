//! Tokenizer for cask definitions and guard expressions.

use super::SourceError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    /// Identifier or dotted path (`version`, `MacOS.release`, `Hardware::CPU.intel?`).
    Ident(String),
    /// Quoted string, quotes removed. Interpolations are kept verbatim.
    Str(String),
    /// `:symbol`, colon removed.
    Sym(String),
    /// Keyword argument name (`checkpoint:`), colon removed.
    Key(String),
    /// Bare number (`10.9`).
    Num(String),
    /// Comparison or boolean operator.
    Op(&'static str),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// Punctuation the cask grammar does not model (`[`, `=>`, ...).
    Punct(char),
    /// End of a line.
    Newline,
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(s) | Self::Num(s) => write!(f, "{s}"),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Sym(s) => write!(f, ":{s}"),
            Self::Key(s) => write!(f, "{s}:"),
            Self::Op(op) => write!(f, "{op}"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Punct(c) => write!(f, "{c}"),
            Self::Newline => write!(f, "end of line"),
        }
    }
}

/// A token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token.
    pub tok: Tok,
    /// Source line.
    pub line: usize,
}

const OPERATORS: [&str; 9] = ["==", "!=", "<=", ">=", "&&", "||", "<", ">", "!"];
const PUNCTUATION: &str = "[]{}=|.;+-*/%~&@";

/// Split `src` into tokens. Comments are dropped; newlines are kept so the
/// parser can find statement boundaries.
///
/// # Errors
///
/// Returns [`SourceError::Lex`] for unterminated strings and characters that
/// cannot start a token (`$`, backticks, ...).
pub fn tokenize(src: &str) -> Result<Vec<Token>, SourceError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    let lex_err = |line, message: String| SourceError::Lex { line, message };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                tokens.push(Token {
                    tok: Tok::Newline,
                    line,
                });
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '\'' | '"' => {
                let start_line = line;
                let (value, next) = read_string(&chars, i + 1, c)
                    .ok_or_else(|| lex_err(start_line, "unterminated string".to_string()))?;
                line += value.matches('\n').count();
                tokens.push(Token {
                    tok: Tok::Str(value),
                    line: start_line,
                });
                i = next;
            }
            ':' if chars.get(i + 1).is_some_and(|n| is_ident_start(*n)) => {
                let (name, next) = read_while(&chars, i + 1, is_ident_char);
                tokens.push(Token {
                    tok: Tok::Sym(name),
                    line,
                });
                i = next;
            }
            '(' | ')' | ',' => {
                let tok = match c {
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    _ => Tok::Comma,
                };
                tokens.push(Token { tok, line });
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let (num, next) = read_while(&chars, i, |ch| ch.is_ascii_digit() || ch == '.');
                tokens.push(Token {
                    tok: Tok::Num(num),
                    line,
                });
                i = next;
            }
            c if is_ident_start(c) => {
                let (path, next) = read_path(&chars, i);
                // `key:` but not `Mod::Const`
                if chars.get(next) == Some(&':') && chars.get(next + 1) != Some(&':') {
                    tokens.push(Token {
                        tok: Tok::Key(path),
                        line,
                    });
                    i = next + 1;
                } else {
                    tokens.push(Token {
                        tok: Tok::Ident(path),
                        line,
                    });
                    i = next;
                }
            }
            _ => {
                let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
                let tok = match OPERATORS.iter().find(|op| rest.starts_with(*op)) {
                    Some(op) => Tok::Op(*op),
                    None if PUNCTUATION.contains(c) => Tok::Punct(c),
                    None => return Err(lex_err(line, format!("unexpected character '{c}'"))),
                };
                i += match &tok {
                    Tok::Op(op) => op.len(),
                    _ => 1,
                };
                tokens.push(Token { tok, line });
            }
        }
    }

    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn read_while(chars: &[char], mut i: usize, pred: impl Fn(char) -> bool) -> (String, usize) {
    let start = i;
    while i < chars.len() && pred(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

/// Identifier segments joined by `.` or `::`, with an optional trailing `?`.
fn read_path(chars: &[char], i: usize) -> (String, usize) {
    let (mut path, mut i) = read_while(chars, i, is_ident_char);
    loop {
        let sep = if chars.get(i) == Some(&'.') {
            1
        } else if chars.get(i) == Some(&':') && chars.get(i + 1) == Some(&':') {
            2
        } else {
            break;
        };
        if !chars.get(i + sep).is_some_and(|c| is_ident_start(*c)) {
            break;
        }
        path.extend(&chars[i..i + sep]);
        let (segment, next) = read_while(chars, i + sep, is_ident_char);
        path.push_str(&segment);
        i = next;
    }
    if chars.get(i) == Some(&'?') {
        path.push('?');
        i += 1;
    }
    (path, i)
}

/// Read a quoted string starting after the opening quote. Returns the value
/// and the index after the closing quote.
fn read_string(chars: &[char], mut i: usize, quote: char) -> Option<(String, usize)> {
    let mut out = String::new();
    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Some((out, i + 1)),
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    None
}
