#![forbid(unsafe_code)]

//! Fluent query construction and idempotent write planning over a
//! Cypher-speaking property-graph backend.
//!
//! Application code chains builder calls into an immutable description of
//! a read or write; the compiler turns that description into a single
//! statement plus a map of bound parameters. No user-supplied value is
//! ever interpolated into statement text.
//!
//! ```
//! use cypherframe::{Graph, GraphConfig, Executor, Params, Result, Rows};
//!
//! struct NoopExecutor;
//!
//! impl Executor for NoopExecutor {
//!     fn execute(&self, _text: &str, _params: &Params) -> Result<Rows> {
//!         Ok(Rows::new())
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let graph = Graph::connect(GraphConfig::default(), NoopExecutor);
//! let compiled = graph
//!     .nodes("Person")
//!     .filter("age__gte", 21)
//!     .select(["name", "email"])
//!     .limit(10)
//!     .compile()?;
//! assert!(compiled.text.starts_with("MATCH (n:Person) WHERE n.age >= $param_0"));
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod error;
pub mod frames;
pub mod graph;
pub mod value;
pub mod write;

pub use compile::filter::{AliasTriple, FilterOp, Predicate};
pub use compile::frame::{Direction, ReadSpec, SortDir};
pub use compile::CompiledStatement;
pub use error::{FrameError, Result};
pub use frames::{NodeFrame, PathFrame, RelFrame};
pub use graph::{Executor, Graph, GraphConfig, RelUniqueness, Rows};
pub use value::{Params, Record, Value};
pub use write::{
    Endpoint, KeyFields, NullPolicy, PlanState, SchemaOps, WritePlan, WriteStats,
};
