//! Relationship-read builder and its write entry points.

use crate::compile::frame::{compile_read, ReadShape, ReadSpec};
use crate::compile::CompiledStatement;
use crate::error::Result;
use crate::frames::parse_order_key;
use crate::graph::{Graph, Rows};
use crate::value::{Record, Value};
use crate::write::mutate::{Delete, Mutation, MutationKind, MutationTarget, Patch};
use crate::write::plan::{WriteOp, WritePlan};
use crate::write::upsert::{Endpoint, NullPolicy, RelUpsert, DEFAULT_BATCH_SIZE};

/// Builder for reads over relationships of one type. Pure relationship
/// reads are undirected and keep both endpoints anonymous.
#[derive(Clone, Debug)]
pub struct RelFrame {
    graph: Graph,
    rel_type: String,
    shape: ReadShape,
}

impl RelFrame {
    pub(crate) fn new(graph: Graph, rel_type: String) -> Self {
        Self { graph, rel_type, shape: ReadShape::default() }
    }

    /// The relationship type this frame reads.
    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    /// Adds one `key = value` filter against relationship properties.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.shape.filters.push((key.into(), value.into()));
        self
    }

    /// Replaces the projection with the given property names.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shape.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends ordering entries.
    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            self.shape.order.push(parse_order_key(&field.into()));
        }
        self
    }

    /// Caps the number of returned rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.shape.limit = Some(limit);
        self
    }

    /// Skips leading rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.shape.offset = Some(offset);
        self
    }

    /// Compiles the read to a statement plus parameters.
    pub fn compile(&self) -> Result<CompiledStatement> {
        compile_read(&ReadSpec::Rel {
            rel_type: self.rel_type.clone(),
            shape: self.shape.clone(),
        })
    }

    /// Compiles and executes the read.
    pub fn to_records(&self) -> Result<Rows> {
        let statement = self.compile()?;
        self.graph.run(&statement)
    }

    /// Plans an idempotent relationship upsert. Endpoints are merged on
    /// their declared key fields; use [`WritePlan::rel_key`] to key the
    /// relationship itself.
    pub fn upsert(
        self,
        rows: Vec<Record>,
        src: impl Into<Endpoint>,
        dst: impl Into<Endpoint>,
    ) -> WritePlan {
        let uniqueness = self.graph.config().rel_uniqueness;
        WritePlan::new(
            self.graph,
            WriteOp::RelUpsert(RelUpsert {
                rel_type: self.rel_type,
                rows,
                src: src.into(),
                dst: dst.into(),
                rel_key_fields: Vec::new(),
                patch: false,
                null_policy: NullPolicy::default(),
                batch_size: DEFAULT_BATCH_SIZE,
                uniqueness,
            }),
        )
    }

    /// Plans a parameterized update of the filtered relationships.
    pub fn patch<I, K, V>(self, updates: I) -> WritePlan
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        WritePlan::new(
            self.graph,
            WriteOp::Patch(Patch {
                target: MutationTarget::Rel { rel_type: self.rel_type },
                filters: self.shape.filters,
                updates: updates.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            }),
        )
    }

    /// Plans deletion of the filtered relationships. Relationship deletes
    /// never detach.
    pub fn delete(self) -> WritePlan {
        WritePlan::new(
            self.graph,
            WriteOp::Delete(Delete {
                target: MutationTarget::Rel { rel_type: self.rel_type },
                filters: self.shape.filters,
                detach: false,
            }),
        )
    }

    fn mutation(self, kind: MutationKind, field: String, argument: Value) -> WritePlan {
        WritePlan::new(
            self.graph,
            WriteOp::Mutation(Mutation {
                target: MutationTarget::Rel { rel_type: self.rel_type },
                filters: self.shape.filters,
                kind,
                field,
                argument,
            }),
        )
    }

    /// Plans a null-safe numeric increment on relationship properties.
    pub fn inc(self, field: impl Into<String>, by: impl Into<Value>) -> WritePlan {
        self.mutation(MutationKind::Inc, field.into(), by.into())
    }

    /// Plans removal of a relationship property.
    pub fn unset(self, field: impl Into<String>) -> WritePlan {
        self.mutation(MutationKind::Unset, field.into(), Value::Null)
    }

    /// Plans a null-safe list append.
    pub fn list_append(self, field: impl Into<String>, value: impl Into<Value>) -> WritePlan {
        self.mutation(MutationKind::ListAppend, field.into(), value.into())
    }

    /// Plans a null-safe list element removal.
    pub fn list_remove(self, field: impl Into<String>, value: impl Into<Value>) -> WritePlan {
        self.mutation(MutationKind::ListRemove, field.into(), value.into())
    }

    /// Plans a map merge into a relationship property.
    pub fn map_merge(self, field: impl Into<String>, map: impl Into<Value>) -> WritePlan {
        self.mutation(MutationKind::MapMerge, field.into(), map.into())
    }
}
