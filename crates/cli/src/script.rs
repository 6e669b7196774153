//! Key scripts.
//!
//! A script is plain text typed into the editor one character at a time,
//! with named keys in braces: `{enter}`, `{tab}`, `{bs}`, `{esc}`, `{up}`,
//! `{down}`. `{{` and `}}` type a literal brace.
//!
//! ```text
//! @rev{tab}-200{enter}
//! ```

use std::fmt;

use tagcalc_engine::EditInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
}

impl Key {
    fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "bs" | "backspace" => Some(Key::Backspace),
            "esc" | "escape" => Some(Key::Escape),
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            _ => None,
        }
    }

    pub fn to_input(self) -> EditInput {
        match self {
            Key::Char(c) => EditInput::Char(c),
            Key::Enter => EditInput::Confirm,
            Key::Tab => EditInput::Advance,
            Key::Backspace => EditInput::Backspace,
            Key::Escape => EditInput::Cancel,
            Key::Up => EditInput::Previous,
            Key::Down => EditInput::Next,
        }
    }

    /// Keys whose effect depends on the candidate list. A human sees the
    /// list before pressing them, so the replay waits for lookups first.
    pub fn reads_candidates(self) -> bool {
        matches!(self, Key::Enter | Key::Tab | Key::Up | Key::Down)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    UnknownKey { name: String, offset: usize },
    Unterminated { offset: usize },
    StrayBrace { offset: usize },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey { name, offset } => write!(f, "unknown key {{{name}}} at offset {offset}"),
            Self::Unterminated { offset } => write!(f, "unterminated '{{' at offset {offset}"),
            Self::StrayBrace { offset } => write!(f, "stray '}}' at offset {offset} (use '}}}}')"),
        }
    }
}

impl std::error::Error for ScriptError {}

pub fn parse(script: &str) -> Result<Vec<Key>, ScriptError> {
    let chars: Vec<(usize, char)> = script.char_indices().collect();
    let mut keys = Vec::with_capacity(chars.len());
    let mut pos = 0;

    while pos < chars.len() {
        let (offset, c) = chars[pos];
        match c {
            '{' if matches!(chars.get(pos + 1), Some((_, '{'))) => {
                keys.push(Key::Char('{'));
                pos += 2;
            }
            '{' => {
                let close = chars[pos + 1..]
                    .iter()
                    .position(|(_, c)| *c == '}')
                    .ok_or(ScriptError::Unterminated { offset })?;
                let name: String = chars[pos + 1..pos + 1 + close].iter().map(|(_, c)| c).collect();
                let key = Key::named(name.trim())
                    .ok_or_else(|| ScriptError::UnknownKey { name: name.clone(), offset })?;
                keys.push(key);
                pos += close + 2;
            }
            '}' if matches!(chars.get(pos + 1), Some((_, '}'))) => {
                keys.push(Key::Char('}'));
                pos += 2;
            }
            '}' => return Err(ScriptError::StrayBrace { offset }),
            _ => {
                keys.push(Key::Char(c));
                pos += 1;
            }
        }
    }

    Ok(keys)
}
