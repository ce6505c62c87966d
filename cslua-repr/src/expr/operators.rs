//! Operator token mapping.
//!
//! The output language spells a handful of operators differently; everything
//! else passes through with its source token. The binary and unary lowering
//! visitors consult this one table.
//!
//! | input | output |
//! |-------|--------|
//! | `!=`  | `~=`   |
//! | `!`   | `not`  |
//! | `&&`  | `and`  |
//! | `\|\|`| `or`   |
//! | `??`  | `or`   |

/// Map a source operator token to its output spelling.
pub fn map_operator_token(token: &str) -> &str {
    match token {
        "!=" => "~=",
        "!" => "not",
        "&&" => "and",
        "||" => "or",
        "??" => "or",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remapped_tokens() {
        assert_eq!(map_operator_token("!="), "~=");
        assert_eq!(map_operator_token("!"), "not");
        assert_eq!(map_operator_token("&&"), "and");
        assert_eq!(map_operator_token("||"), "or");
        assert_eq!(map_operator_token("??"), "or");
    }

    #[test]
    fn everything_else_passes_through() {
        for op in ["+", "-", "*", "/", "%", "==", "<", "<=", ">", ">=", "<<", ">>", "&", "|", "^"] {
            assert_eq!(map_operator_token(op), op);
        }
    }
}
