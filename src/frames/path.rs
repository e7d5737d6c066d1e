//! Traversal builder over a `(from)-[rel]-(to)` pattern.

use crate::compile::filter::AliasTriple;
use crate::compile::frame::{compile_read, Direction, PathSpec, ReadShape, ReadSpec};
use crate::compile::CompiledStatement;
use crate::error::Result;
use crate::frames::{parse_order_key, NodeFrame};
use crate::graph::{Graph, Rows};
use crate::value::Value;

/// Builder for traversal reads. Created by [`NodeFrame::traverse`];
/// filter keys may address the pattern elements with `from__`, `rel__`,
/// and `to__` prefixes, or with the custom aliases set via
/// [`PathFrame::aliased`].
#[derive(Clone, Debug)]
pub struct PathFrame {
    graph: Graph,
    path: PathSpec,
    shape: ReadShape,
}

impl PathFrame {
    pub(crate) fn new(
        graph: Graph,
        from_label: String,
        rel_type: String,
        to_label: String,
        direction: Direction,
        carried_filters: Vec<(String, Value)>,
    ) -> Self {
        Self {
            graph,
            path: PathSpec {
                from_label,
                rel_type,
                to_label,
                direction,
                aliases: AliasTriple::default(),
            },
            shape: ReadShape { filters: carried_filters, ..ReadShape::default() },
        }
    }

    /// Replaces the default `from`/`rel`/`to` aliases with caller-supplied
    /// names. The names must be valid identifiers and pairwise distinct;
    /// once customized they take precedence over the built-in namespaces.
    pub fn aliased(
        mut self,
        from: impl Into<String>,
        rel: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self> {
        self.path.aliases = AliasTriple::custom(from, rel, to)?;
        Ok(self)
    }

    /// Adds one `key = value` filter. A leading segment matching an
    /// active alias selects the pattern element; unprefixed fields bind
    /// to the origin.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.shape.filters.push((key.into(), value.into()));
        self
    }

    /// Replaces the projection. Fields resolve namespaces the same way
    /// predicates do; the default projection is the full alias triple.
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

    /// Returns to the originating nodes: the traversal becomes a filter
    /// and the read projects the origin only. Accumulated filters,
    /// projection, ordering, and bounds carry over.
    pub fn back(self) -> NodeFrame {
        let label = self.path.from_label.clone();
        NodeFrame::back_from(self.graph, label, self.path, self.shape)
    }

    /// Compiles the traversal read to a statement plus parameters.
    pub fn compile(&self) -> Result<CompiledStatement> {
        compile_read(&ReadSpec::Traversal {
            path: self.path.clone(),
            shape: self.shape.clone(),
        })
    }

    /// Compiles and executes the read.
    pub fn to_records(&self) -> Result<Rows> {
        let statement = self.compile()?;
        self.graph.run(&statement)
    }
}
