//! Read descriptions and their compilation into complete MATCH statements.
//!
//! The three frame kinds share one read-shaping capability set, so they are
//! modeled as a tagged description consumed by a single compiler rather
//! than as separate compilers per frame.

use tracing::debug;

use crate::compile::filter::{
    parse_field, parse_predicate, render_where, AliasTriple, Predicate, Slot,
};
use crate::compile::ident::{validate_identifier, ParamRegistry};
use crate::compile::CompiledStatement;
use crate::error::{FrameError, Result};
use crate::value::Value;

/// Traversal direction between the origin and target patterns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    /// `(a)-[r]->(b)`
    #[default]
    Out,
    /// `(a)<-[r]-(b)`
    In,
    /// `(a)-[r]-(b)`
    Both,
}

/// Sort direction for an ORDER BY entry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    fn keyword(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Read-shaping state shared by all frames: raw filter pairs, projection,
/// ordering, limit, and offset. Filter keys are parsed at compile time so
/// alias customization cannot change meaning after the fact.
#[derive(Clone, Debug, Default)]
pub struct ReadShape {
    /// Raw `key = value` filter pairs in insertion order.
    pub filters: Vec<(String, Value)>,
    /// Projection fields; empty means the frame's whole-entity default.
    pub projection: Vec<String>,
    /// Ordering entries in insertion order.
    pub order: Vec<(String, SortDir)>,
    /// Row cap; `Some(0)` is valid and emitted.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
}

impl ReadShape {
    fn predicates(&self, aliases: Option<&AliasTriple>) -> Result<Vec<Predicate>> {
        self.filters
            .iter()
            .map(|(key, value)| parse_predicate(key, value.clone(), aliases))
            .collect()
    }
}

/// The pattern half of a traversal or back-to-origin read.
#[derive(Clone, Debug)]
pub struct PathSpec {
    /// Origin label; empty means the origin is anonymous.
    pub from_label: String,
    /// Relationship type.
    pub rel_type: String,
    /// Target label. Required.
    pub to_label: String,
    /// Traversal direction.
    pub direction: Direction,
    /// Active aliases for the three pattern elements.
    pub aliases: AliasTriple,
}

impl PathSpec {
    fn pattern(&self) -> Result<String> {
        if self.to_label.is_empty() {
            return Err(FrameError::EmptyInput { what: "to label" });
        }
        let rel = format!(
            "{}:{}",
            self.aliases.alias(Slot::Rel),
            validate_identifier(&self.rel_type, false)?
        );
        let arrow = match self.direction {
            Direction::Out => format!("-[{rel}]->"),
            Direction::In => format!("<-[{rel}]-"),
            Direction::Both => format!("-[{rel}]-"),
        };
        let from = if self.from_label.is_empty() {
            format!("({})", self.aliases.alias(Slot::From))
        } else {
            format!(
                "({}:{})",
                self.aliases.alias(Slot::From),
                validate_identifier(&self.from_label, false)?
            )
        };
        let to = format!(
            "({}:{})",
            self.aliases.alias(Slot::To),
            validate_identifier(&self.to_label, false)?
        );
        Ok(format!("{from}{arrow}{to}"))
    }
}

/// A complete read description, ready for compilation.
#[derive(Clone, Debug)]
pub enum ReadSpec {
    /// Single-label node read.
    Node {
        label: String,
        shape: ReadShape,
    },
    /// Undirected relationship read with anonymous endpoints.
    Rel {
        rel_type: String,
        shape: ReadShape,
    },
    /// Traversal read over a `(from)-[rel]-(to)` pattern.
    Traversal {
        path: PathSpec,
        shape: ReadShape,
    },
    /// Traversal filtered read projected back onto the origin.
    Back {
        path: PathSpec,
        shape: ReadShape,
    },
}

fn projected_field(
    field: &str,
    default_alias: &str,
    aliases: Option<&AliasTriple>,
) -> Result<String> {
    let (slot, name) = parse_field(field, aliases);
    let alias = match (slot, aliases) {
        (Some(slot), Some(triple)) => triple.alias(slot),
        _ => default_alias,
    };
    Ok(format!("{alias}.{}", validate_identifier(&name, false)?))
}

fn render_projection(
    fields: &[String],
    default_alias: &str,
    aliases: Option<&AliasTriple>,
) -> Result<String> {
    let parts: Vec<String> = fields
        .iter()
        .map(|field| projected_field(field, default_alias, aliases))
        .collect::<Result<_>>()?;
    Ok(parts.join(", "))
}

fn render_order(
    order: &[(String, SortDir)],
    default_alias: &str,
    aliases: Option<&AliasTriple>,
) -> Result<Option<String>> {
    if order.is_empty() {
        return Ok(None);
    }
    let parts: Vec<String> = order
        .iter()
        .map(|(field, dir)| {
            Ok(format!(
                "{} {}",
                projected_field(field, default_alias, aliases)?,
                dir.keyword()
            ))
        })
        .collect::<Result<_>>()?;
    Ok(Some(format!("ORDER BY {}", parts.join(", "))))
}

/// Compiles a read description to a statement plus its bound parameters.
pub fn compile_read(spec: &ReadSpec) -> Result<CompiledStatement> {
    let mut registry = ParamRegistry::new();
    let mut clauses: Vec<String> = Vec::new();

    match spec {
        ReadSpec::Node { label, shape } => {
            let alias = "n";
            clauses.push(format!("MATCH ({alias}:{})", validate_identifier(label, false)?));
            if let Some(clause) =
                render_where(&shape.predicates(None)?, alias, None, &mut registry)?
            {
                clauses.push(clause);
            }
            let projection = if shape.projection.is_empty() {
                alias.to_owned()
            } else {
                render_projection(&shape.projection, alias, None)?
            };
            clauses.push(format!("RETURN {projection}"));
            if let Some(clause) = render_order(&shape.order, alias, None)? {
                clauses.push(clause);
            }
            if let Some(offset) = shape.offset {
                clauses.push(format!("SKIP {offset}"));
            }
            if let Some(limit) = shape.limit {
                clauses.push(format!("LIMIT {limit}"));
            }
        }
        ReadSpec::Rel { rel_type, shape } => {
            let alias = "r";
            clauses.push(format!(
                "MATCH ()-[{alias}:{}]-()",
                validate_identifier(rel_type, false)?
            ));
            if let Some(clause) =
                render_where(&shape.predicates(None)?, alias, None, &mut registry)?
            {
                clauses.push(clause);
            }
            let projection = if shape.projection.is_empty() {
                alias.to_owned()
            } else {
                render_projection(&shape.projection, alias, None)?
            };
            clauses.push(format!("RETURN {projection}"));
            if let Some(clause) = render_order(&shape.order, alias, None)? {
                clauses.push(clause);
            }
            // Relationship reads emit LIMIT ahead of SKIP; part of the
            // compiled contract.
            if let Some(limit) = shape.limit {
                clauses.push(format!("LIMIT {limit}"));
            }
            if let Some(offset) = shape.offset {
                clauses.push(format!("SKIP {offset}"));
            }
        }
        ReadSpec::Traversal { path, shape } => {
            let aliases = Some(&path.aliases);
            let origin = path.aliases.alias(Slot::From).to_owned();
            clauses.push(format!("MATCH {}", path.pattern()?));
            if let Some(clause) =
                render_where(&shape.predicates(aliases)?, &origin, aliases, &mut registry)?
            {
                clauses.push(clause);
            }
            let projection = if shape.projection.is_empty() {
                format!(
                    "{}, {}, {}",
                    path.aliases.alias(Slot::From),
                    path.aliases.alias(Slot::Rel),
                    path.aliases.alias(Slot::To)
                )
            } else {
                render_projection(&shape.projection, &origin, aliases)?
            };
            clauses.push(format!("RETURN {projection}"));
            if let Some(clause) = render_order(&shape.order, &origin, aliases)? {
                clauses.push(clause);
            }
            if let Some(offset) = shape.offset {
                clauses.push(format!("SKIP {offset}"));
            }
            if let Some(limit) = shape.limit {
                clauses.push(format!("LIMIT {limit}"));
            }
        }
        ReadSpec::Back { path, shape } => {
            let aliases = Some(&path.aliases);
            let origin = path.aliases.alias(Slot::From).to_owned();
            clauses.push(format!("MATCH p = {}", path.pattern()?));
            if let Some(clause) =
                render_where(&shape.predicates(aliases)?, &origin, aliases, &mut registry)?
            {
                clauses.push(clause);
            }
            clauses.push(format!("WITH {origin}"));
            let projection = if shape.projection.is_empty() {
                origin.clone()
            } else {
                render_projection(&shape.projection, &origin, aliases)?
            };
            clauses.push(format!("RETURN {projection}"));
            if let Some(clause) = render_order(&shape.order, &origin, aliases)? {
                clauses.push(clause);
            }
            if let Some(offset) = shape.offset {
                clauses.push(format!("SKIP {offset}"));
            }
            if let Some(limit) = shape.limit {
                clauses.push(format!("LIMIT {limit}"));
            }
        }
    }

    let statement = CompiledStatement {
        text: clauses.join(" "),
        params: registry.into_params(),
    };
    debug!(
        clauses = clauses.len(),
        params = statement.params.len(),
        "compiled read statement"
    );
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> ReadShape {
        ReadShape::default()
    }

    #[test]
    fn bare_node_read() {
        let spec = ReadSpec::Node { label: "Person".into(), shape: shape() };
        let compiled = compile_read(&spec).unwrap();
        assert_eq!(compiled.text, "MATCH (n:Person) RETURN n");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn node_read_clause_order() {
        let spec = ReadSpec::Node {
            label: "Person".into(),
            shape: ReadShape {
                filters: vec![("age__gte".into(), Value::Int(21))],
                projection: vec!["name".into()],
                order: vec![("name".into(), SortDir::Desc)],
                limit: Some(10),
                offset: Some(20),
            },
        };
        let compiled = compile_read(&spec).unwrap();
        assert_eq!(
            compiled.text,
            "MATCH (n:Person) WHERE n.age >= $param_0 RETURN n.name \
             ORDER BY n.name DESC SKIP 20 LIMIT 10"
        );
    }

    #[test]
    fn rel_read_limit_precedes_skip() {
        let spec = ReadSpec::Rel {
            rel_type: "WORKS_AT".into(),
            shape: ReadShape { limit: Some(5), offset: Some(2), ..shape() },
        };
        let compiled = compile_read(&spec).unwrap();
        assert_eq!(compiled.text, "MATCH ()-[r:WORKS_AT]-() RETURN r LIMIT 5 SKIP 2");
    }

    #[test]
    fn traversal_patterns_by_direction() {
        for (direction, pattern) in [
            (Direction::Out, "(from:Person)-[rel:WORKS_AT]->(to:Company)"),
            (Direction::In, "(from:Person)<-[rel:WORKS_AT]-(to:Company)"),
            (Direction::Both, "(from:Person)-[rel:WORKS_AT]-(to:Company)"),
        ] {
            let spec = ReadSpec::Traversal {
                path: PathSpec {
                    from_label: "Person".into(),
                    rel_type: "WORKS_AT".into(),
                    to_label: "Company".into(),
                    direction,
                    aliases: AliasTriple::default(),
                },
                shape: shape(),
            };
            let compiled = compile_read(&spec).unwrap();
            assert_eq!(compiled.text, format!("MATCH {pattern} RETURN from, rel, to"));
        }
    }

    #[test]
    fn anonymous_origin_and_required_target() {
        let mut path = PathSpec {
            from_label: String::new(),
            rel_type: "KNOWS".into(),
            to_label: "Person".into(),
            direction: Direction::Out,
            aliases: AliasTriple::default(),
        };
        let spec = ReadSpec::Traversal { path: path.clone(), shape: shape() };
        let compiled = compile_read(&spec).unwrap();
        assert!(compiled.text.starts_with("MATCH (from)-[rel:KNOWS]->(to:Person)"));

        path.to_label = String::new();
        let spec = ReadSpec::Traversal { path, shape: shape() };
        assert_eq!(compile_read(&spec).unwrap_err().code(), "EmptyInput");
    }

    #[test]
    fn back_read_projects_origin() {
        let spec = ReadSpec::Back {
            path: PathSpec {
                from_label: "Person".into(),
                rel_type: "WORKS_AT".into(),
                to_label: "Company".into(),
                direction: Direction::Out,
                aliases: AliasTriple::default(),
            },
            shape: ReadShape {
                filters: vec![("to__city".into(), Value::from("SF"))],
                limit: Some(10),
                ..shape()
            },
        };
        let compiled = compile_read(&spec).unwrap();
        assert_eq!(
            compiled.text,
            "MATCH p = (from:Person)-[rel:WORKS_AT]->(to:Company) \
             WHERE to.city = $param_0 WITH from RETURN from LIMIT 10"
        );
    }

    #[test]
    fn limit_zero_is_emitted() {
        let spec = ReadSpec::Node {
            label: "Person".into(),
            shape: ReadShape { limit: Some(0), ..shape() },
        };
        assert!(compile_read(&spec).unwrap().text.ends_with("LIMIT 0"));
    }
}
