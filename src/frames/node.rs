//! Node-read builder and its write entry points.

use crate::compile::frame::{compile_read, Direction, PathSpec, ReadShape, ReadSpec};
use crate::compile::CompiledStatement;
use crate::error::Result;
use crate::frames::{parse_order_key, PathFrame};
use crate::graph::{Graph, Rows};
use crate::value::{Record, Value};
use crate::write::mutate::{Delete, Mutation, MutationKind, MutationTarget, Patch};
use crate::write::plan::{WriteOp, WritePlan};
use crate::write::upsert::{KeyFields, NodeUpsert, NullPolicy, DEFAULT_BATCH_SIZE};

/// Builder for reads over nodes with one label, and the entry point for
/// node writes scoped by the accumulated filters.
#[derive(Clone, Debug)]
pub struct NodeFrame {
    graph: Graph,
    label: String,
    shape: ReadShape,
    /// Present when this frame is the origin projection of a traversal.
    back_path: Option<PathSpec>,
}

impl NodeFrame {
    pub(crate) fn new(graph: Graph, label: String) -> Self {
        Self { graph, label, shape: ReadShape::default(), back_path: None }
    }

    pub(crate) fn back_from(
        graph: Graph,
        label: String,
        path: PathSpec,
        shape: ReadShape,
    ) -> Self {
        Self { graph, label, shape, back_path: Some(path) }
    }

    /// The label this frame reads.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Adds one `key = value` filter. Keys follow the
    /// `field[__operator]` convention; parsing happens at compile time.
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

    /// Appends ordering entries; `field__desc` / `field__asc` suffixes
    /// select the direction.
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

    /// Caps the number of returned rows. Zero is valid.
    pub fn limit(mut self, limit: u64) -> Self {
        self.shape.limit = Some(limit);
        self
    }

    /// Skips leading rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.shape.offset = Some(offset);
        self
    }

    fn spec(&self) -> ReadSpec {
        match &self.back_path {
            Some(path) => ReadSpec::Back { path: path.clone(), shape: self.shape.clone() },
            None => ReadSpec::Node { label: self.label.clone(), shape: self.shape.clone() },
        }
    }

    /// Compiles the read to a statement plus parameters.
    pub fn compile(&self) -> Result<CompiledStatement> {
        compile_read(&self.spec())
    }

    /// Compiles and executes the read.
    pub fn to_records(&self) -> Result<Rows> {
        let statement = self.compile()?;
        self.graph.run(&statement)
    }

    /// Starts a traversal from these nodes. Filters accumulated on this
    /// frame carry over and bind to the traversal origin.
    pub fn traverse(
        self,
        rel_type: impl Into<String>,
        to: impl Into<String>,
        direction: Direction,
    ) -> PathFrame {
        PathFrame::new(
            self.graph,
            self.label,
            rel_type.into(),
            to.into(),
            direction,
            self.shape.filters,
        )
    }

    /// Plans an idempotent upsert of `rows` keyed on `key`.
    pub fn upsert(self, rows: Vec<Record>, key: impl Into<KeyFields>) -> WritePlan {
        WritePlan::new(
            self.graph,
            WriteOp::NodeUpsert(NodeUpsert {
                label: self.label,
                rows,
                key_fields: key.into().0,
                patch: false,
                null_policy: NullPolicy::default(),
                batch_size: DEFAULT_BATCH_SIZE,
            }),
        )
    }

    /// Plans a parameterized update of the filtered nodes.
    pub fn patch<I, K, V>(self, updates: I) -> WritePlan
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        WritePlan::new(
            self.graph,
            WriteOp::Patch(Patch {
                target: MutationTarget::Node { label: self.label },
                filters: self.shape.filters,
                updates: updates.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            }),
        )
    }

    /// Plans deletion of the filtered nodes.
    pub fn delete(self, detach: bool) -> WritePlan {
        WritePlan::new(
            self.graph,
            WriteOp::Delete(Delete {
                target: MutationTarget::Node { label: self.label },
                filters: self.shape.filters,
                detach,
            }),
        )
    }

    fn mutation(self, kind: MutationKind, field: String, argument: Value) -> WritePlan {
        WritePlan::new(
            self.graph,
            WriteOp::Mutation(Mutation {
                target: MutationTarget::Node { label: self.label },
                filters: self.shape.filters,
                kind,
                field,
                argument,
            }),
        )
    }

    /// Plans a null-safe numeric increment.
    pub fn inc(self, field: impl Into<String>, by: impl Into<Value>) -> WritePlan {
        self.mutation(MutationKind::Inc, field.into(), by.into())
    }

    /// Plans removal of a property.
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

    /// Plans a map merge into a property.
    pub fn map_merge(self, field: impl Into<String>, map: impl Into<Value>) -> WritePlan {
        self.mutation(MutationKind::MapMerge, field.into(), map.into())
    }
}
