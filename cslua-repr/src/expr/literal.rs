//! Literal nodes.
//!
//! Numeric and string literals carry the raw source token text unchanged;
//! the input and output languages agree on enough of the lexical grammar
//! that re-tokenizing would only lose information (hex spellings, float
//! precision, escape forms).

use serde::{Deserialize, Serialize};

/// Lua literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaLiteral {
    /// Numeric literal, raw token text: `42`, `0x1F`, `1.5e3`
    Number(String),
    /// String literal, raw token text including quotes.
    Str(String),
    /// Character literal, preserved as the raw character.
    Char(char),
    /// `true` / `false`
    Bool(bool),
    /// `nil`
    Nil,
}

impl LuaLiteral {
    /// Raw token view used by const inlining tests and emitters.
    pub fn token_text(&self) -> String {
        match self {
            Self::Number(raw) => raw.clone(),
            Self::Str(raw) => raw.clone(),
            Self::Char(c) => format!("{}", *c as u32),
            Self::Bool(b) => b.to_string(),
            Self::Nil => "nil".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tokens_survive() {
        assert_eq!(LuaLiteral::Number("0x1F".into()).token_text(), "0x1F");
        assert_eq!(LuaLiteral::Nil.token_text(), "nil");
        assert_eq!(LuaLiteral::Bool(false).token_text(), "false");
    }

    #[test]
    fn char_is_numeric_code() {
        assert_eq!(LuaLiteral::Char('A').token_text(), "65");
    }
}
