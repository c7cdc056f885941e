//! Fixture directive parsing and RUN-line substitution.
//!
//! Directives live in comment lines (`//` or `#`) of the form `KEYWORD: value`:
//!
//! ```text
//! // RUN: not %target-swift-frontend %s -parse
//! // EXPECTED-DIAGNOSTIC: expected type
//! ```
//!
//! Lines whose keyword is not one of the known directives are ordinary comments.

use crate::error::{FixtureError, Result};
use crate::outcome::Outcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RUN: &str = "RUN";
const EXPECT: &str = "EXPECT";
const EXPECTED_DIAGNOSTIC: &str = "EXPECTED-DIAGNOSTIC";
const FLAKY: &str = "FLAKY";
const TIMEOUT: &str = "TIMEOUT";

const KEYWORDS: [&str; 5] = [RUN, EXPECT, EXPECTED_DIAGNOSTIC, FLAKY, TIMEOUT];

/// The fixture's RUN directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunLine {
    /// 1-based line of the RUN directive.
    pub line: usize,

    /// Outcome implied by the `not` / `not --crash` prefix.
    pub implied: Outcome,

    /// Command tokens, substitutions not yet expanded.
    pub command: Vec<String>,
}

impl RunLine {
    fn parse(line: usize, text: &str) -> Result<Self> {
        let mut tokens = tokenize(text).ok_or(FixtureError::UnterminatedQuote { line })?;

        let implied = if tokens.first().map(String::as_str) == Some("not") {
            tokens.remove(0);
            if tokens.first().map(String::as_str) == Some("--crash") {
                tokens.remove(0);
                Outcome::Crash
            } else {
                Outcome::CleanDiagnosedError
            }
        } else {
            Outcome::CleanSuccess
        };

        if tokens.is_empty() {
            return Err(FixtureError::EmptyCommand { line });
        }

        Ok(Self {
            line,
            implied,
            command: tokens,
        })
    }

    /// Names of the front-end substitutions the command references, in order.
    pub fn frontend_refs(&self) -> Vec<&str> {
        self.command
            .iter()
            .filter_map(|token| whole_token_name(token))
            .collect()
    }
}

/// All directives declared by a fixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Directives {
    pub run: RunLine,

    /// Explicit `EXPECT:` override of the RUN prefix.
    pub expect: Option<Outcome>,

    /// Substring the captured diagnostics must contain.
    pub expected_diagnostic: Option<String>,

    /// Reason given by a `FLAKY:` directive.
    pub flaky: Option<String>,

    /// Per-fixture time budget override.
    pub timeout_secs: Option<u64>,
}

impl Directives {
    /// The outcome this fixture must produce.
    pub fn expected_outcome(&self) -> Outcome {
        self.expect.unwrap_or(self.run.implied)
    }
}

/// Parse every directive in a fixture's source text.
pub fn parse_directives(source: &str) -> Result<Directives> {
    // (line of first RUN, accumulated text)
    let mut run: Option<(usize, String)> = None;
    let mut continuing = false;
    let mut expect = None;
    let mut expected_diagnostic = None;
    let mut flaky = None;
    let mut timeout_secs = None;

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let Some((keyword, value)) = split_directive(raw) else {
            continue;
        };

        if continuing && keyword != RUN {
            return Err(FixtureError::DanglingContinuation);
        }

        match keyword {
            RUN => {
                let (text, rest) = match value.strip_suffix('\\') {
                    Some(head) => (head.trim_end(), true),
                    None => (value, false),
                };
                match run.as_mut() {
                    Some((_, acc)) if continuing => {
                        acc.push(' ');
                        acc.push_str(text);
                    }
                    Some((first, _)) => {
                        return Err(FixtureError::DuplicateRunLine {
                            line,
                            first: *first,
                        })
                    }
                    None => run = Some((line, text.to_string())),
                }
                continuing = rest;
            }
            EXPECT => {
                let outcome = value
                    .parse::<Outcome>()
                    .map_err(|value| FixtureError::UnknownOutcome { line, value })?;
                set_once(&mut expect, outcome, line, keyword)?;
            }
            EXPECTED_DIAGNOSTIC => {
                set_once(&mut expected_diagnostic, value.to_string(), line, keyword)?;
            }
            FLAKY => {
                set_once(&mut flaky, value.to_string(), line, keyword)?;
            }
            TIMEOUT => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| FixtureError::InvalidTimeout {
                        line,
                        value: value.to_string(),
                    })?;
                set_once(&mut timeout_secs, secs, line, keyword)?;
            }
            _ => {}
        }
    }

    if continuing {
        return Err(FixtureError::DanglingContinuation);
    }

    let (line, text) = run.ok_or(FixtureError::MissingRunLine)?;
    Ok(Directives {
        run: RunLine::parse(line, &text)?,
        expect,
        expected_diagnostic,
        flaky,
        timeout_secs,
    })
}

fn set_once<T>(slot: &mut Option<T>, value: T, line: usize, keyword: &str) -> Result<()> {
    if slot.is_some() {
        return Err(FixtureError::DuplicateDirective {
            line,
            keyword: keyword.to_string(),
        });
    }
    *slot = Some(value);
    Ok(())
}

/// Split a comment line into a known directive keyword and its trimmed value.
fn split_directive(raw: &str) -> Option<(&str, &str)> {
    let trimmed = raw.trim_start();
    let body = trimmed
        .strip_prefix("//")
        .or_else(|| trimmed.strip_prefix('#'))?;
    let (keyword, value) = body.trim_start().split_once(':')?;
    let keyword = keyword.trim_end();
    KEYWORDS
        .contains(&keyword)
        .then_some((keyword, value.trim()))
}

/// Split a command line into arguments.
///
/// Single quotes are literal, double quotes honour `\"` and `\\`, and a
/// backslash outside quotes escapes the next character. Returns `None` on an
/// unterminated quote.
pub fn tokenize(text: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => current.push(c),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            c @ ('"' | '\\') => current.push(c),
                            c => {
                                current.push('\\');
                                current.push(c);
                            }
                        },
                        c => current.push(c),
                    }
                }
            }
            '\\' => {
                in_token = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Some(tokens)
}

/// Values available to RUN-line substitution.
#[derive(Debug, Clone, Copy)]
pub struct Substitutions<'a> {
    /// Replaces `%s`.
    pub source_path: &'a str,

    /// Replaces `%t`.
    pub temp_dir: &'a str,

    /// Replaces a whole `%name` argument with the configured command.
    pub frontends: &'a BTreeMap<String, Vec<String>>,
}

/// Expand substitutions in RUN-line tokens into a final argv.
pub fn expand(tokens: &[String], subs: &Substitutions<'_>) -> Result<Vec<String>> {
    let mut argv = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Some(name) = whole_token_name(token) {
            if let Some(command) = subs.frontends.get(name) {
                if command.is_empty() {
                    return Err(FixtureError::EmptyFrontend {
                        name: name.to_string(),
                    });
                }
                argv.extend(command.iter().cloned());
                continue;
            }
        }
        argv.push(expand_token(token, subs)?);
    }
    Ok(argv)
}

fn expand_token(token: &str, subs: &Substitutions<'_>) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('%') {
            out.push('%');
            rest = tail;
            continue;
        }

        let name_len = after
            .find(|c: char| !is_name_char(c))
            .unwrap_or(after.len());
        let name = &after[..name_len];
        match name {
            "s" => out.push_str(subs.source_path),
            "t" => out.push_str(subs.temp_dir),
            _ if subs.frontends.contains_key(name) => {
                return Err(FixtureError::EmbeddedFrontendSubstitution {
                    name: name.to_string(),
                    token: token.to_string(),
                })
            }
            _ => {
                return Err(FixtureError::UnknownSubstitution {
                    name: name.to_string(),
                })
            }
        }
        rest = &after[name_len..];
    }

    out.push_str(rest);
    Ok(out)
}

/// `%name` spanning a whole argument, excluding the builtin `%s` and `%t`.
fn whole_token_name(token: &str) -> Option<&str> {
    let name = token.strip_prefix('%')?;
    let is_ref = !name.is_empty() && name != "s" && name != "t" && name.chars().all(is_name_char);
    is_ref.then_some(name)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
