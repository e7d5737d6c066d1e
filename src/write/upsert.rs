//! Idempotent upsert compilation for nodes and relationships.
//!
//! Upserts MERGE on the declared key properties only; non-key properties
//! are assigned in `ON CREATE SET` / `ON MATCH SET` blocks. Because UNWIND
//! requires homogeneous row shapes, rows are normalized to the field-set
//! union before binding.

use std::collections::BTreeSet;

use tracing::debug;

use crate::compile::ident::{validate_identifier, ParamRegistry};
use crate::compile::CompiledStatement;
use crate::error::{FrameError, Result};
use crate::graph::RelUniqueness;
use crate::value::{Record, Value};

/// Default number of rows per UNWIND batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How missing fields in patch-mode rows are treated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NullPolicy {
    /// Missing fields become explicit nulls for that row.
    #[default]
    SetNulls,
    /// Missing fields keep the stored value via `coalesce(item.f, n.f)`.
    Keep,
}

/// Key field list for a node upsert. Accepts a single field name or a list.
#[derive(Clone, Debug)]
pub struct KeyFields(pub Vec<String>);

impl From<&str> for KeyFields {
    fn from(field: &str) -> Self {
        KeyFields(vec![field.to_owned()])
    }
}

impl From<String> for KeyFields {
    fn from(field: String) -> Self {
        KeyFields(vec![field])
    }
}

impl From<Vec<String>> for KeyFields {
    fn from(fields: Vec<String>) -> Self {
        KeyFields(fields)
    }
}

impl From<Vec<&str>> for KeyFields {
    fn from(fields: Vec<&str>) -> Self {
        KeyFields(fields.into_iter().map(str::to_owned).collect())
    }
}

/// An endpoint of a relationship upsert: node label plus its key field.
#[derive(Clone, Debug)]
pub struct Endpoint {
    /// Node label to merge on.
    pub label: String,
    /// Row field holding the endpoint key.
    pub key_field: String,
}

impl From<(&str, &str)> for Endpoint {
    fn from((label, key_field): (&str, &str)) -> Self {
        Endpoint { label: label.to_owned(), key_field: key_field.to_owned() }
    }
}

impl From<(String, String)> for Endpoint {
    fn from((label, key_field): (String, String)) -> Self {
        Endpoint { label, key_field }
    }
}

/// Description of a batched node upsert.
#[derive(Clone, Debug)]
pub struct NodeUpsert {
    pub label: String,
    pub rows: Vec<Record>,
    pub key_fields: Vec<String>,
    pub patch: bool,
    pub null_policy: NullPolicy,
    pub batch_size: usize,
}

/// Description of a batched relationship upsert with endpoint merges.
#[derive(Clone, Debug)]
pub struct RelUpsert {
    pub rel_type: String,
    pub rows: Vec<Record>,
    pub src: Endpoint,
    pub dst: Endpoint,
    /// Relationship key fields; empty means the uniqueness policy decides.
    pub rel_key_fields: Vec<String>,
    pub patch: bool,
    pub null_policy: NullPolicy,
    pub batch_size: usize,
    pub uniqueness: RelUniqueness,
}

fn check_rows(rows: &[Record], key_fields: &[&String]) -> Result<()> {
    if rows.is_empty() {
        return Err(FrameError::EmptyInput { what: "rows" });
    }
    for (index, row) in rows.iter().enumerate() {
        for field in key_fields {
            if !row.contains_key(field.as_str()) {
                return Err(FrameError::MissingField {
                    field: (*field).clone(),
                    row: index,
                });
            }
        }
    }
    Ok(())
}

/// Union of field names across rows, minus the key set, sorted.
fn value_fields(rows: &[Record], keys: &BTreeSet<&str>) -> Vec<String> {
    let mut union: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        union.extend(row.keys().map(String::as_str));
    }
    union
        .into_iter()
        .filter(|field| !keys.contains(field))
        .map(str::to_owned)
        .collect()
}

/// Fills missing value fields with explicit nulls so every row in the
/// batch carries the same shape.
fn normalize_rows(rows: &[Record], fields: &[String]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let mut normalized = row.clone();
            for field in fields {
                normalized.entry(field.clone()).or_insert(Value::Null);
            }
            Value::Map(normalized)
        })
        .collect()
}

fn key_props(key_fields: &[String]) -> Result<String> {
    let parts: Vec<String> = key_fields
        .iter()
        .map(|field| {
            let emitted = validate_identifier(field, false)?;
            Ok(format!("{emitted}: item.{emitted}"))
        })
        .collect::<Result<_>>()?;
    Ok(parts.join(", "))
}

fn set_blocks(
    alias: &str,
    fields: &[String],
    patch: bool,
    null_policy: NullPolicy,
) -> Result<Option<String>> {
    if fields.is_empty() {
        return Ok(None);
    }
    let mut create_parts = Vec::with_capacity(fields.len());
    let mut match_parts = Vec::with_capacity(fields.len());
    for field in fields {
        let emitted = validate_identifier(field, false)?;
        create_parts.push(format!("{alias}.{emitted} = item.{emitted}"));
        let assignment = if patch && null_policy == NullPolicy::Keep {
            format!("{alias}.{emitted} = coalesce(item.{emitted}, {alias}.{emitted})")
        } else {
            format!("{alias}.{emitted} = item.{emitted}")
        };
        match_parts.push(assignment);
    }
    Ok(Some(format!(
        "ON CREATE SET {} ON MATCH SET {}",
        create_parts.join(", "),
        match_parts.join(", ")
    )))
}

fn batched(
    rows: &[Record],
    batch_size: usize,
    fields: &[String],
    text: &str,
) -> Result<Vec<CompiledStatement>> {
    if batch_size == 0 {
        return Err(FrameError::EmptyInput { what: "batch size" });
    }
    let statements = rows
        .chunks(batch_size)
        .map(|chunk| {
            let mut registry = ParamRegistry::new();
            registry.bind_named("batch", Value::List(normalize_rows(chunk, fields)));
            CompiledStatement { text: text.to_owned(), params: registry.into_params() }
        })
        .collect();
    Ok(statements)
}

impl NodeUpsert {
    /// Compiles the upsert into one statement per batch.
    pub fn compile(&self) -> Result<Vec<CompiledStatement>> {
        if self.key_fields.is_empty() {
            return Err(FrameError::EmptyInput { what: "key fields" });
        }
        check_rows(&self.rows, &self.key_fields.iter().collect::<Vec<_>>())?;

        let keys: BTreeSet<&str> = self.key_fields.iter().map(String::as_str).collect();
        let fields = value_fields(&self.rows, &keys);

        let mut text = format!(
            "UNWIND $batch AS item MERGE (n:{} {{{}}})",
            validate_identifier(&self.label, false)?,
            key_props(&self.key_fields)?
        );
        if let Some(blocks) = set_blocks("n", &fields, self.patch, self.null_policy)? {
            text.push(' ');
            text.push_str(&blocks);
        }

        let statements = batched(&self.rows, self.batch_size, &fields, &text)?;
        debug!(
            label = %self.label,
            rows = self.rows.len(),
            batches = statements.len(),
            "compiled node upsert"
        );
        Ok(statements)
    }
}

impl RelUpsert {
    /// Compiles the upsert: endpoint merges followed by the relationship
    /// merge, one statement per batch.
    pub fn compile(&self) -> Result<Vec<CompiledStatement>> {
        if self.rel_key_fields.is_empty() && self.uniqueness == RelUniqueness::Keyed {
            return Err(FrameError::EmptyInput { what: "rel_key_fields" });
        }
        let mut required: Vec<&String> = vec![&self.src.key_field, &self.dst.key_field];
        required.extend(self.rel_key_fields.iter());
        check_rows(&self.rows, &required)?;

        let mut keys: BTreeSet<&str> = BTreeSet::new();
        keys.insert(self.src.key_field.as_str());
        keys.insert(self.dst.key_field.as_str());
        keys.extend(self.rel_key_fields.iter().map(String::as_str));
        let fields = value_fields(&self.rows, &keys);

        let rel_props = if self.rel_key_fields.is_empty() {
            String::new()
        } else {
            format!(" {{{}}}", key_props(&self.rel_key_fields)?)
        };
        let mut text = format!(
            "UNWIND $batch AS item \
             MERGE (a:{} {{{}}}) \
             MERGE (b:{} {{{}}}) \
             MERGE (a)-[r:{}{}]->(b)",
            validate_identifier(&self.src.label, false)?,
            key_props(std::slice::from_ref(&self.src.key_field))?,
            validate_identifier(&self.dst.label, false)?,
            key_props(std::slice::from_ref(&self.dst.key_field))?,
            validate_identifier(&self.rel_type, false)?,
            rel_props
        );
        if let Some(blocks) = set_blocks("r", &fields, self.patch, self.null_policy)? {
            text.push(' ');
            text.push_str(&blocks);
        }

        let statements = batched(&self.rows, self.batch_size, &fields, &text)?;
        debug!(
            rel_type = %self.rel_type,
            rows = self.rows.len(),
            batches = statements.len(),
            "compiled relationship upsert"
        );
        Ok(statements)
    }
}
