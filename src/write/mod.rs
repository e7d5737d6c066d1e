#![forbid(unsafe_code)]

//! Write planning.
//!
//! Write descriptions compile into MERGE/SET/REMOVE statements that are
//! safe to re-run. Large upsert payloads split into batches; every batch
//! compiles to its own statement and batches execute sequentially in
//! insertion order.

/// Node and relationship upsert compilation.
pub mod upsert;

/// Patch, delete, and the advanced null-safe mutations.
pub mod mutate;

/// Index and constraint statements.
pub mod schema;

/// The write-plan lifecycle around compiled statements.
pub mod plan;

pub use mutate::{Delete, Mutation, MutationKind, MutationTarget, Patch};
pub use plan::{PlanState, WritePlan, WriteStats};
pub use schema::{SchemaOp, SchemaOps};
pub use upsert::{Endpoint, KeyFields, NodeUpsert, NullPolicy, RelUpsert, DEFAULT_BATCH_SIZE};
