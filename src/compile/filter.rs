//! Predicate parsing and WHERE-clause rendering.
//!
//! Filter keys follow the `[namespace__]field[__operator]` convention. A
//! leading segment is peeled off as a namespace only when it matches an
//! active alias of the frame being compiled, which keeps property names
//! containing double underscores unambiguous.

use crate::compile::ident::{validate_identifier, ParamRegistry};
use crate::error::{FrameError, Result};
use crate::value::Value;

/// Position of a pattern element a namespaced field resolves to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Slot {
    /// The traversal origin.
    From,
    /// The relationship.
    Rel,
    /// The traversal target.
    To,
}

/// The alias triple of a traversal pattern.
///
/// Built-in namespaces `from`, `rel`, and `to` always resolve. When the
/// caller customized the full triple, the custom names take precedence over
/// the built-ins on collision; otherwise the built-ins win.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AliasTriple {
    from: String,
    rel: String,
    to: String,
    customized: bool,
}

impl Default for AliasTriple {
    fn default() -> Self {
        Self {
            from: "from".to_owned(),
            rel: "rel".to_owned(),
            to: "to".to_owned(),
            customized: false,
        }
    }
}

impl AliasTriple {
    /// Builds a caller-supplied triple. The three names must be valid
    /// identifiers and pairwise distinct.
    pub fn custom(
        from: impl Into<String>,
        rel: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self> {
        let triple = Self {
            from: from.into(),
            rel: rel.into(),
            to: to.into(),
            customized: true,
        };
        for alias in [&triple.from, &triple.rel, &triple.to] {
            validate_identifier(alias, true)?;
        }
        if triple.from == triple.rel || triple.from == triple.to || triple.rel == triple.to {
            let dup = if triple.from == triple.rel || triple.from == triple.to {
                triple.from.clone()
            } else {
                triple.rel.clone()
            };
            return Err(FrameError::AmbiguousNamespace { segment: dup });
        }
        Ok(triple)
    }

    /// The emitted alias for a slot.
    pub fn alias(&self, slot: Slot) -> &str {
        match slot {
            Slot::From => &self.from,
            Slot::Rel => &self.rel,
            Slot::To => &self.to,
        }
    }

    fn builtin(segment: &str) -> Option<Slot> {
        match segment {
            "from" => Some(Slot::From),
            "rel" => Some(Slot::Rel),
            "to" => Some(Slot::To),
            _ => None,
        }
    }

    /// Resolves a leading field segment to a slot, if it names one.
    pub fn resolve(&self, segment: &str) -> Option<Slot> {
        if self.customized {
            if segment == self.from {
                return Some(Slot::From);
            }
            if segment == self.rel {
                return Some(Slot::Rel);
            }
            if segment == self.to {
                return Some(Slot::To);
            }
        }
        Self::builtin(segment)
    }
}

/// Comparison and test operators accepted in filter keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    /// `IS NOT NULL`; parsed from both `exists` and `not_null`.
    Exists,
    /// `IS NULL`.
    IsNull,
}

impl FilterOp {
    /// Parses an operator suffix. `None` for unknown suffixes.
    pub fn parse(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            "not_in" => FilterOp::NotIn,
            "contains" => FilterOp::Contains,
            "startswith" => FilterOp::StartsWith,
            "endswith" => FilterOp::EndsWith,
            "regex" => FilterOp::Regex,
            "exists" | "not_null" => FilterOp::Exists,
            "is_null" => FilterOp::IsNull,
            _ => return None,
        })
    }

    /// The suffix used in error messages.
    pub fn suffix(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
            FilterOp::NotIn => "not_in",
            FilterOp::Contains => "contains",
            FilterOp::StartsWith => "startswith",
            FilterOp::EndsWith => "endswith",
            FilterOp::Regex => "regex",
            FilterOp::Exists => "exists",
            FilterOp::IsNull => "is_null",
        }
    }

    /// Whether the operator takes no bound value.
    pub fn is_nullary(&self) -> bool {
        matches!(self, FilterOp::Exists | FilterOp::IsNull)
    }

    fn check_value(&self, field: &str, value: &Value) -> Result<()> {
        let mismatch = |expected: &'static str| FrameError::TypeMismatch {
            field: field.to_owned(),
            op: self.suffix(),
            expected,
        };
        match self {
            FilterOp::In | FilterOp::NotIn => match value {
                Value::List(_) => Ok(()),
                _ => Err(mismatch("a list value")),
            },
            FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith | FilterOp::Regex => {
                match value {
                    Value::String(_) => Ok(()),
                    _ => Err(mismatch("a string value")),
                }
            }
            FilterOp::Exists | FilterOp::IsNull => match value {
                Value::Null | Value::Bool(true) => Ok(()),
                _ => Err(mismatch("a truthy or absent argument")),
            },
            _ => Ok(()),
        }
    }
}

/// One parsed WHERE conjunct.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    /// Resolved namespace; `None` binds to the frame's default alias.
    pub slot: Option<Slot>,
    /// Property name (validated at render time).
    pub field: String,
    /// Operator.
    pub op: FilterOp,
    /// Bound value; `Null` for nullary operators.
    pub value: Value,
}

/// Parses a raw `key = value` filter pair against the active aliases.
///
/// `aliases` is `None` for node and relationship reads, where no namespace
/// segment is recognized and every key is `field[__operator]`.
pub fn parse_predicate(
    key: &str,
    value: Value,
    aliases: Option<&AliasTriple>,
) -> Result<Predicate> {
    let mut segments: Vec<&str> = key.split("__").collect();

    let slot = match aliases {
        Some(triple) if segments.len() >= 2 => match triple.resolve(segments[0]) {
            Some(slot) => {
                segments.remove(0);
                Some(slot)
            }
            None => None,
        },
        _ => None,
    };

    let op = if segments.len() >= 2 {
        match FilterOp::parse(segments[segments.len() - 1]) {
            Some(op) => {
                segments.pop();
                op
            }
            // A two-segment remainder with an unknown tail is a property
            // name containing a double underscore. Longer keys are typos.
            None if segments.len() == 2 => FilterOp::Eq,
            None => {
                return Err(FrameError::UnknownOperator {
                    key: key.to_owned(),
                    op: segments[segments.len() - 1].to_owned(),
                })
            }
        }
    } else {
        FilterOp::Eq
    };

    let field = segments.join("__");
    if field.is_empty() {
        return Err(FrameError::InvalidIdentifier { ident: key.to_owned() });
    }
    op.check_value(&field, &value)?;

    Ok(Predicate { slot, field, op, value })
}

/// Parses a projection or ordering field, peeling a namespace segment only.
pub fn parse_field(key: &str, aliases: Option<&AliasTriple>) -> (Option<Slot>, String) {
    if let Some(triple) = aliases {
        if let Some((head, rest)) = key.split_once("__") {
            if !rest.is_empty() {
                if let Some(slot) = triple.resolve(head) {
                    return (Some(slot), rest.to_owned());
                }
            }
        }
    }
    (None, key.to_owned())
}

fn conjunct(
    predicate: &Predicate,
    alias: &str,
    registry: &mut ParamRegistry,
) -> Result<String> {
    let field = validate_identifier(&predicate.field, false)?;
    let target = format!("{alias}.{field}");
    let rendered = match predicate.op {
        FilterOp::Eq => format!("{target} = ${}", registry.bind(predicate.value.clone())),
        FilterOp::Ne => format!("{target} <> ${}", registry.bind(predicate.value.clone())),
        FilterOp::Gt => format!("{target} > ${}", registry.bind(predicate.value.clone())),
        FilterOp::Gte => format!("{target} >= ${}", registry.bind(predicate.value.clone())),
        FilterOp::Lt => format!("{target} < ${}", registry.bind(predicate.value.clone())),
        FilterOp::Lte => format!("{target} <= ${}", registry.bind(predicate.value.clone())),
        FilterOp::In => match &predicate.value {
            // An empty membership list can never match. The conjunct stays
            // in the clause as the constant it reduces to.
            Value::List(items) if items.is_empty() => "false".to_owned(),
            _ => format!("{target} IN ${}", registry.bind(predicate.value.clone())),
        },
        FilterOp::NotIn => match &predicate.value {
            Value::List(items) if items.is_empty() => "true".to_owned(),
            _ => format!("NOT {target} IN ${}", registry.bind(predicate.value.clone())),
        },
        FilterOp::Contains => {
            format!("{target} CONTAINS ${}", registry.bind(predicate.value.clone()))
        }
        FilterOp::StartsWith => {
            format!("{target} STARTS WITH ${}", registry.bind(predicate.value.clone()))
        }
        FilterOp::EndsWith => {
            format!("{target} ENDS WITH ${}", registry.bind(predicate.value.clone()))
        }
        FilterOp::Regex => format!("{target} =~ ${}", registry.bind(predicate.value.clone())),
        FilterOp::Exists => format!("{target} IS NOT NULL"),
        FilterOp::IsNull => format!("{target} IS NULL"),
    };
    Ok(rendered)
}

/// Renders a conjunctive WHERE fragment, or `None` for an empty predicate
/// list. Predicate order follows insertion order.
pub fn render_where(
    predicates: &[Predicate],
    default_alias: &str,
    aliases: Option<&AliasTriple>,
    registry: &mut ParamRegistry,
) -> Result<Option<String>> {
    if predicates.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let alias = match (predicate.slot, aliases) {
            (Some(slot), Some(triple)) => triple.alias(slot),
            _ => default_alias,
        };
        parts.push(conjunct(predicate, alias, registry)?);
    }
    Ok(Some(format!("WHERE {}", parts.join(" AND "))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(key: &str, value: Value) -> Predicate {
        parse_predicate(key, value, None).unwrap()
    }

    #[test]
    fn bare_key_is_eq() {
        let p = parse("name", Value::from("J"));
        assert_eq!(p.op, FilterOp::Eq);
        assert_eq!(p.field, "name");
        assert_eq!(p.slot, None);
    }

    #[test]
    fn suffix_selects_operator() {
        assert_eq!(parse("age__gte", Value::Int(21)).op, FilterOp::Gte);
        assert_eq!(parse("name__not_in", Value::List(vec![])).op, FilterOp::NotIn);
        assert_eq!(parse("bio__exists", Value::Bool(true)).op, FilterOp::Exists);
    }

    #[test]
    fn double_underscore_field_without_namespace() {
        let p = parse("first__name", Value::from("J"));
        assert_eq!(p.field, "first__name");
        assert_eq!(p.op, FilterOp::Eq);
    }

    #[test]
    fn unknown_suffix_in_long_key_fails() {
        let err = parse_predicate("a__b__gteq", Value::Int(1), None).unwrap_err();
        assert_eq!(err.code(), "UnknownOperator");
    }

    #[test]
    fn namespace_peels_only_active_aliases() {
        let triple = AliasTriple::default();
        let p = parse_predicate("rel__since__gte", Value::Int(2020), Some(&triple)).unwrap();
        assert_eq!(p.slot, Some(Slot::Rel));
        assert_eq!(p.field, "since");
        assert_eq!(p.op, FilterOp::Gte);

        let p = parse_predicate("city__eq", Value::from("SF"), Some(&triple)).unwrap();
        assert_eq!(p.slot, None);
        assert_eq!(p.field, "city");
    }

    #[test]
    fn custom_alias_wins_over_builtin() {
        let triple = AliasTriple::custom("to", "r", "c").unwrap();
        let p = parse_predicate("to__age", Value::Int(1), Some(&triple)).unwrap();
        assert_eq!(p.slot, Some(Slot::From));
    }

    #[test]
    fn duplicate_aliases_are_ambiguous() {
        let err = AliasTriple::custom("x", "x", "y").unwrap_err();
        assert_eq!(err.code(), "AmbiguousNamespace");
    }

    #[test]
    fn type_mismatches_are_rejected() {
        assert_eq!(
            parse_predicate("tags__in", Value::Int(3), None).unwrap_err().code(),
            "TypeMismatch"
        );
        assert_eq!(
            parse_predicate("name__contains", Value::Int(3), None).unwrap_err().code(),
            "TypeMismatch"
        );
        assert_eq!(
            parse_predicate("bio__exists", Value::Bool(false), None).unwrap_err().code(),
            "TypeMismatch"
        );
    }

    #[test]
    fn empty_in_list_renders_constant() {
        let mut reg = ParamRegistry::new();
        let preds = vec![
            parse("tags__in", Value::List(vec![])),
            parse("tags__not_in", Value::List(vec![])),
        ];
        let clause = render_where(&preds, "n", None, &mut reg).unwrap().unwrap();
        assert_eq!(clause, "WHERE false AND true");
        assert!(reg.into_params().is_empty());
    }

    #[test]
    fn nullary_ops_bind_nothing() {
        let mut reg = ParamRegistry::new();
        let preds = vec![parse("bio__is_null", Value::Null)];
        let clause = render_where(&preds, "n", None, &mut reg).unwrap().unwrap();
        assert_eq!(clause, "WHERE n.bio IS NULL");
        assert!(reg.into_params().is_empty());
    }
}
