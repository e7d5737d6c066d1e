//! Patch, delete, and advanced mutation compilation.
//!
//! All of these share the shape `MATCH … [WHERE …] <effect>`. WHERE
//! predicates bind parameters before the effect does, so placeholder
//! indices read left to right in the emitted statement.

use tracing::debug;

use crate::compile::filter::{parse_predicate, render_where, Predicate};
use crate::compile::ident::{validate_identifier, ParamRegistry};
use crate::compile::CompiledStatement;
use crate::error::{FrameError, Result};
use crate::value::Value;

/// What a mutation statement matches against.
#[derive(Clone, Debug)]
pub enum MutationTarget {
    /// Nodes with the given label, alias `n`.
    Node {
        label: String,
    },
    /// Relationships of the given type, alias `r`, endpoints anonymous.
    Rel {
        rel_type: String,
    },
}

impl MutationTarget {
    pub(crate) fn alias(&self) -> &'static str {
        match self {
            MutationTarget::Node { .. } => "n",
            MutationTarget::Rel { .. } => "r",
        }
    }

    fn match_clause(&self) -> Result<String> {
        match self {
            MutationTarget::Node { label } => {
                Ok(format!("MATCH (n:{})", validate_identifier(label, false)?))
            }
            MutationTarget::Rel { rel_type } => Ok(format!(
                "MATCH ()-[r:{}]-()",
                validate_identifier(rel_type, false)?
            )),
        }
    }
}

fn parse_filters(filters: &[(String, Value)]) -> Result<Vec<Predicate>> {
    filters
        .iter()
        .map(|(key, value)| parse_predicate(key, value.clone(), None))
        .collect()
}

/// Parameterized property updates against matched entities.
#[derive(Clone, Debug)]
pub struct Patch {
    pub target: MutationTarget,
    /// Raw filter pairs, parsed at compile time.
    pub filters: Vec<(String, Value)>,
    /// Property assignments in insertion order.
    pub updates: Vec<(String, Value)>,
}

impl Patch {
    pub fn compile(&self) -> Result<CompiledStatement> {
        if self.updates.is_empty() {
            return Err(FrameError::EmptyInput { what: "updates" });
        }
        let alias = self.target.alias();
        let mut registry = ParamRegistry::new();
        let mut clauses = vec![self.target.match_clause()?];
        if let Some(clause) =
            render_where(&parse_filters(&self.filters)?, alias, None, &mut registry)?
        {
            clauses.push(clause);
        }
        let assignments: Vec<String> = self
            .updates
            .iter()
            .map(|(field, value)| {
                let emitted = validate_identifier(field, false)?;
                Ok(format!("{alias}.{emitted} = ${}", registry.bind(value.clone())))
            })
            .collect::<Result<_>>()?;
        clauses.push(format!("SET {}", assignments.join(", ")));
        Ok(CompiledStatement { text: clauses.join(" "), params: registry.into_params() })
    }
}

/// Delete of matched nodes or relationships.
#[derive(Clone, Debug)]
pub struct Delete {
    pub target: MutationTarget,
    pub filters: Vec<(String, Value)>,
    /// Detach first; only meaningful for node targets.
    pub detach: bool,
}

impl Delete {
    pub fn compile(&self) -> Result<CompiledStatement> {
        let alias = self.target.alias();
        let mut registry = ParamRegistry::new();
        let mut clauses = vec![self.target.match_clause()?];
        if let Some(clause) =
            render_where(&parse_filters(&self.filters)?, alias, None, &mut registry)?
        {
            clauses.push(clause);
        }
        let effect = match &self.target {
            MutationTarget::Node { .. } if self.detach => format!("DETACH DELETE {alias}"),
            _ => format!("DELETE {alias}"),
        };
        clauses.push(effect);
        Ok(CompiledStatement { text: clauses.join(" "), params: registry.into_params() })
    }
}

/// The advanced null-safe mutation kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MutationKind {
    /// `SET x.f = coalesce(x.f, 0) + $p`
    Inc,
    /// `REMOVE x.f`
    Unset,
    /// `SET x.f = coalesce(x.f, []) + $p`
    ListAppend,
    /// `SET x.f = [v IN coalesce(x.f, []) WHERE v <> $p]`
    ListRemove,
    /// `SET x.f += $p`
    MapMerge,
}

/// A single advanced mutation against matched entities.
#[derive(Clone, Debug)]
pub struct Mutation {
    pub target: MutationTarget,
    pub filters: Vec<(String, Value)>,
    pub kind: MutationKind,
    pub field: String,
    /// Bound argument; ignored by `Unset`.
    pub argument: Value,
}

impl Mutation {
    fn check_argument(&self) -> Result<()> {
        let mismatch = |op: &'static str, expected: &'static str| FrameError::TypeMismatch {
            field: self.field.clone(),
            op,
            expected,
        };
        match self.kind {
            MutationKind::Inc => match self.argument {
                Value::Int(_) | Value::Float(_) => Ok(()),
                _ => Err(mismatch("inc", "a numeric value")),
            },
            MutationKind::MapMerge => match self.argument {
                Value::Map(_) => Ok(()),
                _ => Err(mismatch("map_merge", "a map value")),
            },
            _ => Ok(()),
        }
    }

    pub fn compile(&self) -> Result<CompiledStatement> {
        self.check_argument()?;
        let alias = self.target.alias();
        let mut registry = ParamRegistry::new();
        let mut clauses = vec![self.target.match_clause()?];
        if let Some(clause) =
            render_where(&parse_filters(&self.filters)?, alias, None, &mut registry)?
        {
            clauses.push(clause);
        }
        let field = validate_identifier(&self.field, false)?;
        let target = format!("{alias}.{field}");
        let effect = match self.kind {
            MutationKind::Inc => format!(
                "SET {target} = coalesce({target}, 0) + ${}",
                registry.bind(self.argument.clone())
            ),
            MutationKind::Unset => format!("REMOVE {target}"),
            MutationKind::ListAppend => format!(
                "SET {target} = coalesce({target}, []) + ${}",
                registry.bind(self.argument.clone())
            ),
            MutationKind::ListRemove => format!(
                "SET {target} = [x IN coalesce({target}, []) WHERE x <> ${}]",
                registry.bind(self.argument.clone())
            ),
            MutationKind::MapMerge => {
                format!("SET {target} += ${}", registry.bind(self.argument.clone()))
            }
        };
        clauses.push(effect);
        let statement =
            CompiledStatement { text: clauses.join(" "), params: registry.into_params() };
        debug!(field = %self.field, "compiled advanced mutation");
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> MutationTarget {
        MutationTarget::Node { label: "Product".into() }
    }

    #[test]
    fn patch_binds_where_before_set() {
        let patch = Patch {
            target: MutationTarget::Node { label: "Person".into() },
            filters: vec![("name".into(), Value::from("John"))],
            updates: vec![
                ("active".into(), Value::Bool(true)),
                ("score".into(), Value::Int(10)),
            ],
        };
        let compiled = patch.compile().unwrap();
        assert_eq!(
            compiled.text,
            "MATCH (n:Person) WHERE n.name = $param_0 \
             SET n.active = $param_1, n.score = $param_2"
        );
        assert_eq!(compiled.params["param_0"], Value::from("John"));
        assert_eq!(compiled.params["param_2"], Value::Int(10));
    }

    #[test]
    fn empty_updates_are_rejected() {
        let patch = Patch { target: node(), filters: vec![], updates: vec![] };
        assert_eq!(patch.compile().unwrap_err().code(), "EmptyInput");
    }

    #[test]
    fn node_delete_honors_detach() {
        let delete = Delete {
            target: MutationTarget::Node { label: "Person".into() },
            filters: vec![("status".into(), Value::from("inactive"))],
            detach: true,
        };
        let compiled = delete.compile().unwrap();
        assert_eq!(
            compiled.text,
            "MATCH (n:Person) WHERE n.status = $param_0 DETACH DELETE n"
        );
    }

    #[test]
    fn rel_delete_never_detaches() {
        let delete = Delete {
            target: MutationTarget::Rel { rel_type: "WORKS_AT".into() },
            filters: vec![],
            detach: true,
        };
        assert_eq!(delete.compile().unwrap().text, "MATCH ()-[r:WORKS_AT]-() DELETE r");
    }

    #[test]
    fn inc_is_null_safe() {
        let mutation = Mutation {
            target: node(),
            filters: vec![("category".into(), Value::from("Electronics"))],
            kind: MutationKind::Inc,
            field: "views".into(),
            argument: Value::Int(1),
        };
        let compiled = mutation.compile().unwrap();
        assert_eq!(
            compiled.text,
            "MATCH (n:Product) WHERE n.category = $param_0 \
             SET n.views = coalesce(n.views, 0) + $param_1"
        );
    }

    #[test]
    fn unset_binds_nothing() {
        let mutation = Mutation {
            target: node(),
            filters: vec![],
            kind: MutationKind::Unset,
            field: "legacy".into(),
            argument: Value::Null,
        };
        let compiled = mutation.compile().unwrap();
        assert_eq!(compiled.text, "MATCH (n:Product) REMOVE n.legacy");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn list_and_map_forms() {
        let append = Mutation {
            target: node(),
            filters: vec![],
            kind: MutationKind::ListAppend,
            field: "tags".into(),
            argument: Value::from("sale"),
        };
        assert!(append
            .compile()
            .unwrap()
            .text
            .contains("SET n.tags = coalesce(n.tags, []) + $param_0"));

        let remove = Mutation { kind: MutationKind::ListRemove, ..append.clone() };
        assert!(remove
            .compile()
            .unwrap()
            .text
            .contains("SET n.tags = [x IN coalesce(n.tags, []) WHERE x <> $param_0]"));

        let merge = Mutation {
            kind: MutationKind::MapMerge,
            argument: Value::Map(Default::default()),
            ..append
        };
        assert!(merge.compile().unwrap().text.contains("SET n.tags += $param_0"));
    }

    #[test]
    fn argument_kinds_are_checked() {
        let mutation = Mutation {
            target: node(),
            filters: vec![],
            kind: MutationKind::Inc,
            field: "views".into(),
            argument: Value::from("one"),
        };
        assert_eq!(mutation.compile().unwrap_err().code(), "TypeMismatch");
    }
}
