//! The write-plan lifecycle.
//!
//! A plan wraps one write description and moves through
//! `Described → Compiled → Previewed → Committed`. Compilation and preview
//! are idempotent and repeatable before commit; commit runs the batch
//! statements sequentially and is permitted at most once. A failed commit
//! parks the plan in `Failed`; both end states are terminal. Dropping the
//! plan closes it.

use tracing::{info, warn};

use crate::compile::CompiledStatement;
use crate::error::{FrameError, Result};
use crate::graph::{Graph, Rows};
use crate::value::Value;
use crate::write::mutate::{Delete, Mutation, Patch};
use crate::write::schema::SchemaOp;
use crate::write::upsert::{NodeUpsert, NullPolicy, RelUpsert};

/// Lifecycle states of a write plan.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlanState {
    /// Description captured, nothing compiled yet.
    Described,
    /// Statements compiled and cached.
    Compiled,
    /// Statements shown to the caller via `preview`.
    Previewed,
    /// Commit ran to completion. Terminal.
    Committed,
    /// Commit hit an execution error. Terminal.
    Failed,
}

impl PlanState {
    fn name(&self) -> &'static str {
        match self {
            PlanState::Described => "described",
            PlanState::Compiled => "compiled",
            PlanState::Previewed => "previewed",
            PlanState::Committed => "committed",
            PlanState::Failed => "failed",
        }
    }

    fn terminal(&self) -> bool {
        matches!(self, PlanState::Committed | PlanState::Failed)
    }
}

/// Tagged write description held by a plan.
#[derive(Clone, Debug)]
pub(crate) enum WriteOp {
    NodeUpsert(NodeUpsert),
    RelUpsert(RelUpsert),
    Patch(Patch),
    Delete(Delete),
    Mutation(Mutation),
    Schema(SchemaOp),
}

impl WriteOp {
    fn compile(&self) -> Result<Vec<CompiledStatement>> {
        match self {
            WriteOp::NodeUpsert(op) => op.compile(),
            WriteOp::RelUpsert(op) => op.compile(),
            WriteOp::Patch(op) => Ok(vec![op.compile()?]),
            WriteOp::Delete(op) => Ok(vec![op.compile()?]),
            WriteOp::Mutation(op) => Ok(vec![op.compile()?]),
            WriteOp::Schema(op) => Ok(vec![op.compile()?]),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WriteOp::NodeUpsert(_) => "node_upsert",
            WriteOp::RelUpsert(_) => "rel_upsert",
            WriteOp::Patch(_) => "patch",
            WriteOp::Delete(_) => "delete",
            WriteOp::Mutation(_) => "mutation",
            WriteOp::Schema(_) => "schema",
        }
    }
}

/// Counters returned by a successful commit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteStats {
    /// Statements executed.
    pub statements: usize,
    /// Rows shipped across all `batch` parameters.
    pub rows_sent: usize,
}

/// A write description plus its lifecycle.
pub struct WritePlan {
    graph: Graph,
    op: WriteOp,
    state: PlanState,
    compiled: Option<Vec<CompiledStatement>>,
}

impl WritePlan {
    pub(crate) fn new(graph: Graph, op: WriteOp) -> Self {
        Self { graph, op, state: PlanState::Described, compiled: None }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlanState {
        self.state
    }

    fn invalidate(&mut self) {
        if !self.state.terminal() {
            self.compiled = None;
            self.state = PlanState::Described;
        }
    }

    /// Toggles patch mode on an upsert description. Resets any cached
    /// compilation; no effect on other write kinds or terminal plans.
    pub fn patch_mode(mut self, patch: bool) -> Self {
        if self.state.terminal() {
            return self;
        }
        match &mut self.op {
            WriteOp::NodeUpsert(op) => op.patch = patch,
            WriteOp::RelUpsert(op) => op.patch = patch,
            _ => return self,
        }
        self.invalidate();
        self
    }

    /// Sets the null policy of an upsert description.
    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        if self.state.terminal() {
            return self;
        }
        match &mut self.op {
            WriteOp::NodeUpsert(op) => op.null_policy = policy,
            WriteOp::RelUpsert(op) => op.null_policy = policy,
            _ => return self,
        }
        self.invalidate();
        self
    }

    /// Sets the batch size of an upsert description.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        if self.state.terminal() {
            return self;
        }
        match &mut self.op {
            WriteOp::NodeUpsert(op) => op.batch_size = batch_size,
            WriteOp::RelUpsert(op) => op.batch_size = batch_size,
            _ => return self,
        }
        self.invalidate();
        self
    }

    /// Adds a relationship key field to a relationship upsert.
    pub fn rel_key(mut self, field: impl Into<String>) -> Self {
        if self.state.terminal() {
            return self;
        }
        if let WriteOp::RelUpsert(op) = &mut self.op {
            op.rel_key_fields.push(field.into());
            self.invalidate();
        }
        self
    }

    fn ensure_compiled(&mut self) -> Result<()> {
        if self.compiled.is_none() {
            // A validation failure leaves the plan in Described with the
            // description unchanged.
            self.compiled = Some(self.op.compile()?);
        }
        Ok(())
    }

    /// Compiles the description, caching the statements. Idempotent and
    /// repeatable prior to commit.
    pub fn compile(&mut self) -> Result<&[CompiledStatement]> {
        if self.state.terminal() {
            return Err(FrameError::PlanConsumed { state: self.state.name() });
        }
        self.ensure_compiled()?;
        if self.state == PlanState::Described {
            self.state = PlanState::Compiled;
        }
        Ok(self.compiled.as_deref().unwrap_or_default())
    }

    /// Returns the statements that `commit` would run. Same payload as
    /// `compile`; kept separate so a sample-data extension can attach here.
    pub fn preview(&mut self) -> Result<&[CompiledStatement]> {
        if self.state.terminal() {
            return Err(FrameError::PlanConsumed { state: self.state.name() });
        }
        self.ensure_compiled()?;
        self.state = PlanState::Previewed;
        Ok(self.compiled.as_deref().unwrap_or_default())
    }

    /// Executes the compiled statements sequentially. Permitted at most
    /// once; the plan transitions to `Committed` or `Failed`.
    pub fn commit(&mut self) -> Result<WriteStats> {
        if self.state.terminal() {
            return Err(FrameError::PlanConsumed { state: self.state.name() });
        }
        self.ensure_compiled()?;
        let statements = self.compiled.clone().unwrap_or_default();
        let mut stats = WriteStats::default();
        for statement in &statements {
            match self.graph.run(statement) {
                Ok(_) => {
                    stats.statements += 1;
                    if let Some(Value::List(rows)) = statement.params.get("batch") {
                        stats.rows_sent += rows.len();
                    }
                }
                Err(err) => {
                    self.state = PlanState::Failed;
                    warn!(
                        op = self.op.kind(),
                        statement = stats.statements,
                        "write plan failed"
                    );
                    return Err(err);
                }
            }
        }
        self.state = PlanState::Committed;
        info!(
            op = self.op.kind(),
            statements = stats.statements,
            rows = stats.rows_sent,
            "write plan committed"
        );
        Ok(stats)
    }

    /// Runs the compiled statements under `EXPLAIN`. Read-only; does not
    /// advance the lifecycle.
    pub fn explain(&mut self) -> Result<Rows> {
        self.run_prefixed("EXPLAIN")
    }

    /// Runs the compiled statements under `PROFILE`. Read-only.
    pub fn profile(&mut self) -> Result<Rows> {
        self.run_prefixed("PROFILE")
    }

    fn run_prefixed(&mut self, prefix: &str) -> Result<Rows> {
        self.ensure_compiled()?;
        let statements = self.compiled.clone().unwrap_or_default();
        let mut rows = Rows::new();
        for statement in &statements {
            let prefixed = CompiledStatement {
                text: format!("{prefix} {}", statement.text),
                params: statement.params.clone(),
            };
            rows.extend(self.graph.run(&prefixed)?);
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for WritePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritePlan")
            .field("op", &self.op.kind())
            .field("state", &self.state)
            .finish()
    }
}
