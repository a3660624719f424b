//! Cask DSL front-end.
//!
//! Reads the declarative subset of the Ruby cask DSL:
//!
//! ```text
//! cask 'token' do
//!   version '1.1.0'
//!   sha256 '...'                      # or :no_check
//!   url "https://example.com/app_#{version}.dmg"
//!   appcast "https://example.com/appcast.xml",
//!           checkpoint: '...'
//!   name 'Example'
//!   homepage 'https://example.com/'
//!   license :commercial
//!   auto_updates true
//!   app 'Example.app'
//! end
//! ```
//!
//! plus one top-level `if` / `elsif` / `else` / `end` chain whose branches hold
//! stanzas. Stanzas outside the model (`depends_on`, `zap`, ...) are skipped,
//! including their `do ... end` blocks.

use cask_schema::{CaskVersion, Checksum, LicenseTag, Sha256Digest};
use tracing::debug;

use super::SourceError;
use super::guard::GuardParser;
use super::lexer::{Tok, Token, tokenize};
use crate::manifest::{AppcastDecl, Clause, ClauseBody, Manifest};
use crate::predicate::Predicate;
use crate::template::Template;

/// Parse a cask definition.
///
/// # Errors
///
/// Returns a [`SourceError`] with the offending line for lexical and
/// syntactic problems, invalid values and manifest validation failures.
pub fn parse(src: &str) -> Result<Manifest, SourceError> {
    let tokens = tokenize(src)?;
    Parser {
        tokens: &tokens,
        pos: 0,
    }
    .parse_cask()
}

fn parse_err(line: usize, message: impl Into<String>) -> SourceError {
    SourceError::Parse {
        line,
        message: message.into(),
    }
}

fn is_word(token: &Token, word: &str) -> bool {
    matches!(&token.tok, Tok::Ident(w) if w == word)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

/// One stanza: its name, the line it starts on and its argument tokens.
struct Stanza<'t> {
    name: &'t str,
    line: usize,
    args: Vec<&'t Token>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn skip_newlines(&mut self) {
        while self.peek().is_some_and(|t| t.tok == Tok::Newline) {
            self.pos += 1;
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<usize, SourceError> {
        match self.peek() {
            Some(token) if is_word(token, word) => {
                self.pos += 1;
                Ok(token.line)
            }
            Some(token) => Err(parse_err(
                token.line,
                format!("expected '{word}', found {}", token.tok),
            )),
            None => Err(parse_err(self.last_line(), format!("expected '{word}'"))),
        }
    }

    fn expect_line_end(&mut self, line: usize) -> Result<(), SourceError> {
        match self.peek() {
            None => Ok(()),
            Some(token) if token.tok == Tok::Newline => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(parse_err(
                line,
                format!("unexpected {} at end of line", token.tok),
            )),
        }
    }

    /// Tokens up to the end of the statement. A trailing comma or an open
    /// bracket continues the statement onto the next line.
    fn statement_tail(&mut self) -> Vec<&'t Token> {
        let tokens = self.tokens;
        let mut out: Vec<&'t Token> = Vec::new();
        let mut depth = 0i32;
        while let Some(token) = tokens.get(self.pos) {
            self.pos += 1;
            match token.tok {
                Tok::Newline => {
                    let continued =
                        depth > 0 || out.last().is_some_and(|t| t.tok == Tok::Comma);
                    if !continued {
                        break;
                    }
                }
                Tok::LParen | Tok::Punct('[' | '{') => {
                    depth += 1;
                    out.push(token);
                }
                Tok::RParen | Tok::Punct(']' | '}') => {
                    depth -= 1;
                    out.push(token);
                }
                _ => out.push(token),
            }
        }
        out
    }

    fn parse_cask(&mut self) -> Result<Manifest, SourceError> {
        self.skip_newlines();
        let line = self.expect_word("cask")?;
        let token = match self.peek().map(|t| &t.tok) {
            Some(Tok::Str(name) | Tok::Sym(name)) => name.clone(),
            _ => return Err(parse_err(line, "expected a cask token after 'cask'")),
        };
        self.pos += 1;
        self.expect_word("do")?;
        self.expect_line_end(line)?;

        let mut outer = ClauseBody::default();
        let mut chain: Option<Vec<Clause>> = None;
        let tokens = self.tokens;

        loop {
            self.skip_newlines();
            let Some(next) = tokens.get(self.pos) else {
                return Err(parse_err(self.last_line(), "missing 'end' for cask block"));
            };
            match &next.tok {
                Tok::Ident(w) if w == "end" => {
                    self.pos += 1;
                    break;
                }
                Tok::Ident(w) if w == "if" => {
                    if chain.is_some() {
                        return Err(parse_err(
                            next.line,
                            "only one top-level conditional is supported",
                        ));
                    }
                    self.pos += 1;
                    chain = Some(self.parse_chain(next.line)?);
                }
                Tok::Ident(w) if w == "unless" => {
                    return Err(parse_err(next.line, "'unless' blocks are not supported"));
                }
                Tok::Ident(_) => {
                    if let Some(stanza) = self.stanza()? {
                        apply(&mut outer, &stanza)?;
                    }
                }
                other => return Err(parse_err(next.line, format!("unexpected {other}"))),
            }
        }

        self.skip_newlines();
        if let Some(extra) = self.peek() {
            return Err(parse_err(
                extra.line,
                format!("unexpected {} after cask block", extra.tok),
            ));
        }

        let clauses = match chain {
            Some(clauses) => clauses,
            None => vec![Clause::Otherwise(take_release_fields(&mut outer))],
        };
        debug!(cask = %token, clauses = clauses.len(), "Parsed cask definition");
        Ok(Manifest::new(token.as_str(), outer, clauses)?)
    }

    fn parse_chain(&mut self, line: usize) -> Result<Vec<Clause>, SourceError> {
        let tokens = self.tokens;
        let mut clauses = Vec::new();
        let mut guard = Some(self.guard(line)?);
        let mut in_else = false;

        loop {
            let mut body = ClauseBody::default();
            let (terminator, at) = loop {
                self.skip_newlines();
                let next = tokens
                    .get(self.pos)
                    .ok_or_else(|| parse_err(line, "missing 'end' for 'if'"))?;
                match &next.tok {
                    Tok::Ident(w) if matches!(w.as_str(), "elsif" | "else" | "end") => {
                        self.pos += 1;
                        break (w.as_str(), next.line);
                    }
                    Tok::Ident(w) if w == "if" || w == "unless" => {
                        return Err(parse_err(
                            next.line,
                            "nested conditionals are not supported",
                        ));
                    }
                    Tok::Ident(_) => {
                        if let Some(stanza) = self.stanza()? {
                            apply(&mut body, &stanza)?;
                        }
                    }
                    other => return Err(parse_err(next.line, format!("unexpected {other}"))),
                }
            };

            clauses.push(match guard.take() {
                Some(guard) => Clause::When { guard, body },
                None => Clause::Otherwise(body),
            });

            match terminator {
                "end" => {
                    self.expect_line_end(at)?;
                    return Ok(clauses);
                }
                _ if in_else => {
                    return Err(parse_err(at, format!("'{terminator}' after 'else'")));
                }
                "elsif" => guard = Some(self.guard(at)?),
                _ => {
                    in_else = true;
                    self.expect_line_end(at)?;
                }
            }
        }
    }

    fn guard(&mut self, line: usize) -> Result<Predicate, SourceError> {
        let tokens: Vec<Token> = self.statement_tail().into_iter().cloned().collect();
        if tokens.is_empty() {
            return Err(parse_err(line, "missing guard expression"));
        }
        let mut parser = GuardParser::new(&tokens, line);
        let predicate = parser.parse()?;
        if let Some(extra) = tokens.get(parser.consumed()) {
            return Err(parse_err(
                extra.line,
                format!("unexpected {} after guard", extra.tok),
            ));
        }
        Ok(predicate)
    }

    /// Read one stanza. Returns `None` for stanzas outside the model, whose
    /// `do ... end` blocks are skipped.
    fn stanza(&mut self) -> Result<Option<Stanza<'t>>, SourceError> {
        let tokens = self.tokens;
        let Some(head) = tokens.get(self.pos) else {
            return Ok(None);
        };
        let Tok::Ident(name) = &head.tok else {
            return Err(parse_err(head.line, format!("unexpected {}", head.tok)));
        };
        self.pos += 1;
        let args = self.statement_tail();

        if !KNOWN_STANZAS.contains(&name.as_str()) {
            debug!(stanza = %name, line = head.line, "Skipping unsupported stanza");
            if args.iter().any(|t| is_word(t, "do")) {
                self.skip_block(head.line)?;
            }
            return Ok(None);
        }

        Ok(Some(Stanza {
            name,
            line: head.line,
            args,
        }))
    }

    fn skip_block(&mut self, line: usize) -> Result<(), SourceError> {
        let tokens = self.tokens;
        let mut depth = 1;
        while depth > 0 {
            self.skip_newlines();
            let first = tokens
                .get(self.pos)
                .ok_or_else(|| parse_err(line, "unterminated 'do' block"))?;
            let tail = self.statement_tail();
            if is_word(first, "end") {
                depth -= 1;
                continue;
            }
            if BLOCK_OPENERS.iter().any(|w| is_word(first, w)) {
                depth += 1;
            }
            if tail.iter().any(|t| is_word(t, "do")) {
                depth += 1;
            }
        }
        Ok(())
    }
}

const KNOWN_STANZAS: [&str; 9] = [
    "version",
    "sha256",
    "url",
    "appcast",
    "name",
    "homepage",
    "license",
    "auto_updates",
    "app",
];

const BLOCK_OPENERS: [&str; 6] = ["if", "unless", "case", "begin", "while", "until"];

impl Stanza<'_> {
    fn err(&self, message: impl Into<String>) -> SourceError {
        parse_err(self.line, message)
    }

    /// First positional argument as text.
    fn text(&self) -> Result<String, SourceError> {
        match self.args.first().map(|t| &t.tok) {
            Some(Tok::Str(s) | Tok::Sym(s) | Tok::Num(s)) => Ok(s.clone()),
            Some(other) => Err(self.err(format!("'{}' expects a value, found {other}", self.name))),
            None => Err(self.err(format!("'{}' expects a value", self.name))),
        }
    }

    /// Value of a `key: value` argument.
    fn keyword(&self, key: &str) -> Option<&Tok> {
        self.args
            .windows(2)
            .find(|pair| matches!(&pair[0].tok, Tok::Key(k) if k == key))
            .map(|pair| &pair[1].tok)
    }

    fn template(&self, raw: &str) -> Result<Template, SourceError> {
        Template::parse(raw).map_err(|source| SourceError::Template {
            line: self.line,
            source,
        })
    }
}

fn set<T>(slot: &mut Option<T>, value: T, stanza: &Stanza<'_>) -> Result<(), SourceError> {
    if slot.is_some() {
        return Err(stanza.err(format!("duplicate '{}' stanza", stanza.name)));
    }
    *slot = Some(value);
    Ok(())
}

fn apply(body: &mut ClauseBody, stanza: &Stanza<'_>) -> Result<(), SourceError> {
    let line = stanza.line;
    match stanza.name {
        "version" => {
            let version = CaskVersion::new(&stanza.text()?)
                .map_err(|source| SourceError::Version { line, source })?;
            set(&mut body.version, version, stanza)
        }
        "sha256" => {
            let checksum = Checksum::parse(&stanza.text()?)
                .map_err(|source| SourceError::Digest { line, source })?;
            set(&mut body.checksum, checksum, stanza)
        }
        "url" => {
            let url = stanza.template(&stanza.text()?)?;
            set(&mut body.url, url, stanza)
        }
        "appcast" => {
            let url = stanza.template(&stanza.text()?)?;
            let checkpoint = match stanza.keyword("checkpoint") {
                Some(Tok::Str(digest)) => Sha256Digest::new(digest.as_str())
                    .map_err(|source| SourceError::Digest { line, source })?,
                Some(other) => return Err(stanza.err(format!("invalid checkpoint {other}"))),
                None => return Err(stanza.err("appcast requires a checkpoint")),
            };
            set(&mut body.appcast, AppcastDecl { url, checkpoint }, stanza)
        }
        // A cask may carry several names; the first is the display name.
        "name" => {
            let name = stanza.text()?;
            body.display_name.get_or_insert(name);
            Ok(())
        }
        "homepage" => set(&mut body.homepage, stanza.text()?, stanza),
        "license" => set(&mut body.license, LicenseTag::new(&stanza.text()?), stanza),
        "auto_updates" => {
            let value = match stanza.args.first().map(|t| &t.tok) {
                Some(Tok::Ident(b)) if b == "true" => true,
                Some(Tok::Ident(b)) if b == "false" => false,
                _ => return Err(stanza.err("'auto_updates' expects true or false")),
            };
            set(&mut body.auto_updates, value, stanza)
        }
        "app" => set(&mut body.app, stanza.text()?, stanza),
        _ => Ok(()),
    }
}

/// Move the version-critical fields out of the outer scope.
fn take_release_fields(outer: &mut ClauseBody) -> ClauseBody {
    ClauseBody {
        version: outer.version.take(),
        checksum: outer.checksum.take(),
        url: outer.url.take(),
        appcast: outer.appcast.take(),
        auto_updates: outer.auto_updates.take(),
        ..ClauseBody::default()
    }
}
