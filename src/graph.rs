//! The graph handle: configuration, the execution seam, and frame entry
//! points.
//!
//! The core never talks to a driver. It hands compiled `(text, parameters)`
//! pairs to the [`Executor`] collaborator, which owns sessions,
//! transactions, retries, and timeouts.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::compile::CompiledStatement;
use crate::error::{FrameError, Result};
use crate::frames::{NodeFrame, RelFrame};
use crate::value::{Params, Record};
use crate::write::schema::SchemaOps;

/// Result rows returned by the execution collaborator.
pub type Rows = Vec<Record>;

/// The single operation the core consumes from a driver.
pub trait Executor: Send + Sync {
    /// Runs one statement with its bound parameters and returns the rows.
    fn execute(&self, text: &str, params: &Params) -> Result<Rows>;
}

impl<T: Executor + ?Sized> Executor for Arc<T> {
    fn execute(&self, text: &str, params: &Params) -> Result<Rows> {
        (**self).execute(text, params)
    }
}

/// Uniqueness policy applied to relationship upserts that declare no
/// relationship key fields.
///
/// `Single` merges the bare endpoint pattern, maintaining at most one
/// relationship per endpoint pair; pre-existing parallel relationships are
/// left alone and MERGE matches an arbitrary one. `Keyed` refuses such
/// writes at compile time instead of guessing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RelUniqueness {
    #[default]
    Single,
    Keyed,
}

/// Connection settings plus the one compiler-visible policy flag.
#[derive(Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub rel_uniqueness: RelUniqueness,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_owned(),
            user: "neo4j".to_owned(),
            password: String::new(),
            database: "neo4j".to_owned(),
            rel_uniqueness: RelUniqueness::Single,
        }
    }
}

impl GraphConfig {
    /// Convenience constructor for the common URI/user/password case.
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Selects the target database.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Selects the relationship-uniqueness policy.
    pub fn rel_uniqueness(mut self, policy: RelUniqueness) -> Self {
        self.rel_uniqueness = policy;
        self
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("rel_uniqueness", &self.rel_uniqueness)
            .finish()
    }
}

struct GraphInner {
    config: GraphConfig,
    executor: Box<dyn Executor>,
}

/// Cheap-clone handle over the configuration and the executor. All
/// compilation state lives in frames and plans; the handle itself holds
/// nothing mutable.
#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl Graph {
    /// Builds a graph handle around an execution collaborator.
    pub fn connect(config: GraphConfig, executor: impl Executor + 'static) -> Self {
        debug!(uri = %config.uri, database = %config.database, "graph handle created");
        Self { inner: Arc::new(GraphInner { config, executor: Box::new(executor) }) }
    }

    /// The configuration this handle was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    /// Node-read builder for one label.
    pub fn nodes(&self, label: impl Into<String>) -> NodeFrame {
        NodeFrame::new(self.clone(), label.into())
    }

    /// Relationship-read builder for one type.
    pub fn rels(&self, rel_type: impl Into<String>) -> RelFrame {
        RelFrame::new(self.clone(), rel_type.into())
    }

    /// Schema-operation builder.
    pub fn schema(&self) -> SchemaOps {
        SchemaOps::new(self.clone())
    }

    /// Raw escape hatch: runs caller-written statement text.
    pub fn cypher(&self, text: impl Into<String>, params: Params) -> Result<Rows> {
        self.run(&CompiledStatement { text: text.into(), params })
    }

    /// Runs one compiled statement, attaching the statement text and
    /// parameter names to any collaborator failure.
    pub(crate) fn run(&self, statement: &CompiledStatement) -> Result<Rows> {
        self.inner
            .executor
            .execute(&statement.text, &statement.params)
            .map_err(|err| match err {
                FrameError::Execution { message, .. } => FrameError::Execution {
                    message,
                    text: statement.text.clone(),
                    param_names: statement.param_names(),
                },
                other => FrameError::Execution {
                    message: other.to_string(),
                    text: statement.text.clone(),
                    param_names: statement.param_names(),
                },
            })
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("config", &self.inner.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingExecutor;

    impl Executor for FailingExecutor {
        fn execute(&self, _text: &str, _params: &Params) -> Result<Rows> {
            Err(FrameError::Execution {
                message: "service unavailable".into(),
                text: String::new(),
                param_names: vec![],
            })
        }
    }

    #[test]
    fn execution_errors_carry_text_and_names() {
        let graph = Graph::connect(GraphConfig::default(), FailingExecutor);
        let mut params = Params::new();
        params.insert("param_0".into(), crate::value::Value::Int(1));
        let err = graph.cypher("RETURN $param_0", params).unwrap_err();
        match err {
            FrameError::Execution { message, text, param_names } => {
                assert_eq!(message, "service unavailable");
                assert_eq!(text, "RETURN $param_0");
                assert_eq!(param_names, vec!["param_0".to_owned()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_password() {
        let config = GraphConfig::new("bolt://db:7687", "neo4j", "hunter2");
        let shown = format!("{config:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }
}
