#![forbid(unsafe_code)]

//! Statement compilation.
//!
//! Compilation is a pure function from an immutable read or write
//! description to a `(text, parameters)` pair. Every user-supplied value
//! reaches the backend through the parameter map; identifiers are either
//! validated plain or backtick-quoted before they touch the statement text.

/// Identifier validation and the parameter registry.
pub mod ident;

/// Predicate parsing and WHERE-fragment rendering.
pub mod filter;

/// Read descriptions and the read-statement compiler.
pub mod frame;

use crate::value::Params;

/// A backend statement together with its bound parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledStatement {
    /// Statement text. Contains placeholder references only, never values.
    pub text: String,
    /// Placeholder name to bound value.
    pub params: Params,
}

impl CompiledStatement {
    /// Parameter names in deterministic order, for diagnostics.
    pub fn param_names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }
}
