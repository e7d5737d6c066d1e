//! Identifier validation and parameter allocation.
//!
//! Centralizing both here is what keeps statement text free of
//! user-supplied scalars and placeholder names unique within a statement.

use crate::error::{FrameError, Result};
use crate::value::{Params, Value};

/// Cypher keywords that must be backtick-quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "and", "as", "asc", "assert", "by", "call", "case", "constraint",
    "contains", "create", "delete", "desc", "detach", "distinct", "drop",
    "else", "end", "ends", "exists", "explain", "false", "for", "in", "index", "is",
    "key", "limit", "match", "merge", "node", "not", "null", "on",
    "optional", "or", "order", "profile", "remove", "require", "return",
    "set", "skip", "starts", "then", "true", "union", "unwind", "when",
    "where", "with", "xor", "yield",
];

fn is_plain(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_reserved(id: &str) -> bool {
    let lowered = id.to_ascii_lowercase();
    RESERVED.contains(&lowered.as_str())
}

fn quoted(id: &str) -> String {
    format!("`{}`", id.replace('`', "``"))
}

/// Validates an identifier and returns its emitted form.
///
/// A plain identifier (`[A-Za-z_][A-Za-z0-9_]*`, not reserved) is returned
/// unchanged. Reserved words are backtick-quoted. Anything else is quoted
/// when `strict` is false and rejected with `InvalidIdentifier` when
/// `strict` is true. Empty identifiers are always rejected.
pub fn validate_identifier(id: &str, strict: bool) -> Result<String> {
    if id.is_empty() {
        return Err(FrameError::InvalidIdentifier { ident: id.into() });
    }
    if is_plain(id) {
        if is_reserved(id) {
            return Ok(quoted(id));
        }
        return Ok(id.to_owned());
    }
    if strict {
        return Err(FrameError::InvalidIdentifier { ident: id.into() });
    }
    Ok(quoted(id))
}

/// Allocates placeholder names and accumulates the bound-value map for one
/// compiled statement. Created fresh per compilation and discarded after.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    params: Params,
    counter: usize,
}

impl ParamRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under a fresh `param_<k>` name and returns the name
    /// (without the leading `$`).
    pub fn bind(&mut self, value: Value) -> String {
        let name = format!("param_{}", self.counter);
        self.counter += 1;
        self.params.insert(name.clone(), value);
        name
    }

    /// Records `value` under a caller-chosen name. Used for the `batch`
    /// parameter of upsert statements.
    pub fn bind_named(&mut self, name: &str, value: Value) {
        self.params.insert(name.to_owned(), value);
    }

    /// Finishes the registry, yielding the accumulated parameter map.
    pub fn into_params(self) -> Params {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifier_passes_through() {
        assert_eq!(validate_identifier("Person", true).unwrap(), "Person");
        assert_eq!(validate_identifier("_tag9", true).unwrap(), "_tag9");
    }

    #[test]
    fn reserved_word_is_quoted_even_when_strict() {
        assert_eq!(validate_identifier("match", true).unwrap(), "`match`");
        assert_eq!(validate_identifier("RETURN", true).unwrap(), "`RETURN`");
    }

    #[test]
    fn strict_rejects_non_identifier() {
        let err = validate_identifier("bad name", true).unwrap_err();
        assert_eq!(err.code(), "InvalidIdentifier");
        assert!(validate_identifier("", false).is_err());
        assert!(validate_identifier("9lives", true).is_err());
    }

    #[test]
    fn lenient_quotes_and_doubles_backticks() {
        assert_eq!(validate_identifier("bad name", false).unwrap(), "`bad name`");
        assert_eq!(validate_identifier("we`ird", false).unwrap(), "`we``ird`");
    }

    #[test]
    fn registry_counts_monotonically() {
        let mut reg = ParamRegistry::new();
        assert_eq!(reg.bind(Value::Int(1)), "param_0");
        assert_eq!(reg.bind(Value::Int(2)), "param_1");
        let params = reg.into_params();
        assert_eq!(params.len(), 2);
        assert_eq!(params["param_1"], Value::Int(2));
    }
}
