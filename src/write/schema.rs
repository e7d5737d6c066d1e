//! Index and constraint statement compilation.
//!
//! Names are derived from the label and properties so re-running the same
//! operation targets the same schema object, which together with the
//! `IF NOT EXISTS` / `IF EXISTS` guards keeps every operation idempotent.

use crate::compile::ident::validate_identifier;
use crate::compile::CompiledStatement;
use crate::error::{FrameError, Result};
use crate::graph::Graph;
use crate::write::plan::{WriteOp, WritePlan};

/// A single schema operation description.
#[derive(Clone, Debug)]
pub enum SchemaOp {
    EnsureIndex { label: String, property: String },
    EnsureUnique { label: String, property: String },
    EnsureNodeKey { label: String, properties: Vec<String> },
    DropIndex { label: String, property: String },
    DropUnique { label: String, property: String },
}

fn index_name(label: &str, property: &str) -> String {
    format!("index_{label}_{property}")
}

fn constraint_name(label: &str, properties: &[String]) -> String {
    format!("constraint_{label}_{}", properties.join("_"))
}

impl SchemaOp {
    /// Compiles to a single parameter-free statement.
    pub fn compile(&self) -> Result<CompiledStatement> {
        let text = match self {
            SchemaOp::EnsureIndex { label, property } => format!(
                "CREATE INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{})",
                validate_identifier(&index_name(label, property), false)?,
                validate_identifier(label, false)?,
                validate_identifier(property, false)?
            ),
            SchemaOp::EnsureUnique { label, property } => format!(
                "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
                validate_identifier(&constraint_name(label, std::slice::from_ref(property)), false)?,
                validate_identifier(label, false)?,
                validate_identifier(property, false)?
            ),
            SchemaOp::EnsureNodeKey { label, properties } => {
                if properties.is_empty() {
                    return Err(FrameError::EmptyInput { what: "properties" });
                }
                let parts: Vec<String> = properties
                    .iter()
                    .map(|property| Ok(format!("n.{}", validate_identifier(property, false)?)))
                    .collect::<Result<_>>()?;
                format!(
                    "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE ({}) IS NODE KEY",
                    validate_identifier(&constraint_name(label, properties), false)?,
                    validate_identifier(label, false)?,
                    parts.join(", ")
                )
            }
            SchemaOp::DropIndex { label, property } => format!(
                "DROP INDEX {} IF EXISTS",
                validate_identifier(&index_name(label, property), false)?
            ),
            SchemaOp::DropUnique { label, property } => format!(
                "DROP CONSTRAINT {} IF EXISTS",
                validate_identifier(&constraint_name(label, std::slice::from_ref(property)), false)?
            ),
        };
        Ok(CompiledStatement { text, params: Default::default() })
    }
}

/// Schema-operation builder handed out by [`Graph::schema`].
pub struct SchemaOps {
    graph: Graph,
}

impl SchemaOps {
    pub(crate) fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Plans `CREATE INDEX … IF NOT EXISTS` on one property.
    pub fn ensure_index(&self, label: impl Into<String>, property: impl Into<String>) -> WritePlan {
        self.plan(SchemaOp::EnsureIndex { label: label.into(), property: property.into() })
    }

    /// Plans a uniqueness constraint on one property.
    pub fn ensure_unique(&self, label: impl Into<String>, property: impl Into<String>) -> WritePlan {
        self.plan(SchemaOp::EnsureUnique { label: label.into(), property: property.into() })
    }

    /// Plans a composite node-key constraint.
    pub fn ensure_node_key(
        &self,
        label: impl Into<String>,
        properties: Vec<String>,
    ) -> WritePlan {
        self.plan(SchemaOp::EnsureNodeKey { label: label.into(), properties })
    }

    /// Plans `DROP INDEX … IF EXISTS`.
    pub fn drop_index(&self, label: impl Into<String>, property: impl Into<String>) -> WritePlan {
        self.plan(SchemaOp::DropIndex { label: label.into(), property: property.into() })
    }

    /// Plans `DROP CONSTRAINT … IF EXISTS`.
    pub fn drop_unique(&self, label: impl Into<String>, property: impl Into<String>) -> WritePlan {
        self.plan(SchemaOp::DropUnique { label: label.into(), property: property.into() })
    }

    fn plan(&self, op: SchemaOp) -> WritePlan {
        WritePlan::new(self.graph.clone(), WriteOp::Schema(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_forms() {
        let compiled = SchemaOp::EnsureIndex {
            label: "Person".into(),
            property: "email".into(),
        }
        .compile()
        .unwrap();
        assert_eq!(
            compiled.text,
            "CREATE INDEX index_Person_email IF NOT EXISTS FOR (n:Person) ON (n.email)"
        );
        assert!(compiled.params.is_empty());

        let compiled = SchemaOp::EnsureUnique {
            label: "Person".into(),
            property: "email".into(),
        }
        .compile()
        .unwrap();
        assert_eq!(
            compiled.text,
            "CREATE CONSTRAINT constraint_Person_email IF NOT EXISTS \
             FOR (n:Person) REQUIRE n.email IS UNIQUE"
        );

        let compiled = SchemaOp::EnsureNodeKey {
            label: "Person".into(),
            properties: vec!["email".into(), "tenant".into()],
        }
        .compile()
        .unwrap();
        assert_eq!(
            compiled.text,
            "CREATE CONSTRAINT constraint_Person_email_tenant IF NOT EXISTS \
             FOR (n:Person) REQUIRE (n.email, n.tenant) IS NODE KEY"
        );
    }

    #[test]
    fn drop_forms() {
        let compiled = SchemaOp::DropIndex { label: "Person".into(), property: "email".into() }
            .compile()
            .unwrap();
        assert_eq!(compiled.text, "DROP INDEX index_Person_email IF EXISTS");

        let compiled = SchemaOp::DropUnique { label: "Person".into(), property: "email".into() }
            .compile()
            .unwrap();
        assert_eq!(compiled.text, "DROP CONSTRAINT constraint_Person_email IF EXISTS");
    }

    #[test]
    fn node_key_requires_properties() {
        let op = SchemaOp::EnsureNodeKey { label: "Person".into(), properties: vec![] };
        assert_eq!(op.compile().unwrap_err().code(), "EmptyInput");
    }
}
