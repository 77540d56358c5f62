//! Quote-context scanner.
//!
//! Determines whether a placeholder inside an argument template sits in an
//! unquoted, single-quoted or double-quoted region of the shell line the
//! template renders into.
//!
//! The scan is a three-state machine `{None, InSingle, InDouble}`:
//!
//! - In `None`, an unescaped `'` enters `InSingle` and an unescaped `"`
//!   enters `InDouble`.
//! - `\` escapes the next character in `None` and `InDouble` only. Inside
//!   single quotes a backslash is a literal, exactly as in POSIX shells.
//! - Other `{{name}}` placeholders in the prefix are skipped as opaque spans:
//!   their content never changes the quote state, and they do not count as
//!   word content because the substituted value may be empty.
//!
//! Alongside the quote state the scanner tracks unquoted command separators
//! (`;`, `|`, `&`, `(`, `)`, backtick, newline) so it can tell whether the
//! placeholder's word is the command name of its simple command. Leading
//! `NAME=value` assignments and reserved words do not count as a command name.
//!
//! The result only depends on the template prefix up to the placeholder
//! offset. Unterminated quotes are reported as whatever state the scanner is
//! actually in.

use serde::{Deserialize, Serialize};

/// Quoting context of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteContext {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

impl std::fmt::Display for QuoteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuoteContext::Unquoted => "unquoted",
            QuoteContext::SingleQuoted => "single-quoted",
            QuoteContext::DoubleQuoted => "double-quoted",
        };
        f.write_str(s)
    }
}

/// Everything the scanner learns about the position of a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteScan {
    pub context: QuoteContext,
    /// Byte offset of the quote character that opened the current quoted
    /// region, if any.
    pub opened_at: Option<usize>,
    /// True when nothing but quote characters (or other placeholders) lies
    /// between the previous unquoted word boundary and the placeholder.
    pub at_word_start: bool,
    /// True when the placeholder's word would be run as a command by a
    /// shell: no command name precedes it in its simple command.
    pub at_command_word: bool,
    /// Command name of the placeholder's simple command with quotes removed,
    /// when one precedes the placeholder.
    pub command_name: Option<String>,
}

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "do", "while", "until", "!", "{", "time",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    None,
    InSingle,
    InDouble,
}

/// Return the quoting context of the placeholder starting at byte `offset`.
pub fn locate_context(template: &str, offset: usize) -> QuoteContext {
    scan_to(template, offset).context
}

/// Scan `template` up to byte `offset` and report the quoting state there.
///
/// Offsets past the end of the template are clamped to its length.
pub fn scan_to(template: &str, offset: usize) -> QuoteScan {
    let bytes = template.as_bytes();
    let end = offset.min(bytes.len());

    let mut state = State::None;
    let mut opened_at = None;
    let mut word_has_content = false;
    let mut word_start: Option<usize> = None;
    let mut command_name: Option<String> = None;
    let mut i = 0;

    while i < end {
        let b = bytes[i];

        if b == b'{' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(close) = find_placeholder_end(bytes, i + 2)
                && close <= end
            {
                i = close;
                continue;
            }
        }

        if state == State::None && word_start.is_none() && !is_separator(b) {
            word_start = Some(i);
        }

        match state {
            State::None => match b {
                b'\\' => {
                    word_has_content = true;
                    i += 2;
                    continue;
                }
                b'\'' => {
                    state = State::InSingle;
                    opened_at = Some(i);
                }
                b'"' => {
                    state = State::InDouble;
                    opened_at = Some(i);
                }
                b' ' | b'\t' => {
                    if let Some(start) = word_start.take()
                        && command_name.is_none()
                        && names_command(&template[start..i])
                    {
                        command_name = Some(template[start..i].replace(['\'', '"'], ""));
                    }
                    word_has_content = false;
                }
                b';' | b'|' | b'&' | b'(' | b')' | b'`' | b'\n' => {
                    word_start = None;
                    command_name = None;
                    word_has_content = false;
                }
                _ => word_has_content = true,
            },
            State::InSingle => match b {
                b'\'' => {
                    state = State::None;
                    opened_at = None;
                }
                _ => word_has_content = true,
            },
            State::InDouble => match b {
                b'\\' => {
                    word_has_content = true;
                    i += 2;
                    continue;
                }
                b'"' => {
                    state = State::None;
                    opened_at = None;
                }
                _ => word_has_content = true,
            },
        }
        i += 1;
    }

    let context = match state {
        State::None => QuoteContext::Unquoted,
        State::InSingle => QuoteContext::SingleQuoted,
        State::InDouble => QuoteContext::DoubleQuoted,
    };

    QuoteScan {
        context,
        opened_at,
        at_word_start: !word_has_content,
        at_command_word: command_name.is_none()
            && word_start.is_none_or(|start| !is_assignment(&template[start..end])),
        command_name,
    }
}

fn is_separator(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b';' | b'|' | b'&' | b'(' | b')' | b'`')
}

/// A finished word names the command unless it is an assignment, a reserved
/// word or made only of placeholders that may render empty.
fn names_command(word: &str) -> bool {
    let rest = strip_placeholders(word);
    !rest.is_empty() && !is_assignment(word) && !RESERVED_WORDS.contains(&word)
}

fn is_assignment(word: &str) -> bool {
    word.split_once('=').is_some_and(|(name, _)| {
        name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

fn strip_placeholders(word: &str) -> String {
    let bytes = word.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{'
            && bytes.get(i + 1) == Some(&b'{')
            && let Some(close) = find_placeholder_end(bytes, i + 2)
        {
            i = close;
            continue;
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Byte index just past the `}}` closing a placeholder whose name starts at
/// `from`.
pub(crate) fn find_placeholder_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut j = from;
    while j + 1 < bytes.len() {
        if bytes[j] == b'}' && bytes[j + 1] == b'}' {
            return Some(j + 2);
        }
        j += 1;
    }
    None
}
