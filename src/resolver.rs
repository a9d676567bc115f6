//! Resolution of a filter tree against a catalog and operator table.
//!
//! Resolving never touches the caller's [`Filter`]: it produces a parallel
//! [`ResolvedFilter`] that borrows the caller's clauses, their data sources
//! and operators, and owns the vivified values.

use crate::ast::{Clause, ClausePath, Filter, FilterNode, LogicalOp};
use crate::catalog::{Catalog, DataSource};
use crate::error::{WinnowError, WinnowResult};
use crate::operators::{Operator, OperatorRegistry, ValueType};
use crate::values::{self, ChoiceId, Value};

/// A resolved group.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFilter<'a> {
    pub logical_op: LogicalOp,
    pub children: Vec<ResolvedNode<'a>>,
    pub path: ClausePath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedNode<'a> {
    Group(ResolvedFilter<'a>),
    Clause(ResolvedClause<'a>),
}

/// A leaf clause with its data source, operator and vivified value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClause<'a> {
    clause: &'a Clause,
    source: &'a DataSource,
    operator: &'a Operator,
    value: Value,
    path: ClausePath,
}

impl<'a> ResolvedFilter<'a> {
    /// Every resolved clause, depth first.
    pub fn clauses(&self) -> Vec<&ResolvedClause<'a>> {
        let mut out = Vec::new();
        self.collect_clauses(&mut out);
        out
    }

    fn collect_clauses<'s>(&'s self, out: &mut Vec<&'s ResolvedClause<'a>>) {
        for child in &self.children {
            match child {
                ResolvedNode::Group(group) => group.collect_clauses(out),
                ResolvedNode::Clause(clause) => out.push(clause),
            }
        }
    }
}

impl<'a> ResolvedClause<'a> {
    /// The clause as the caller wrote it.
    pub fn clause(&self) -> &'a Clause {
        self.clause
    }

    pub fn source(&self) -> &'a DataSource {
        self.source
    }

    pub fn column(&self) -> &'a str {
        &self.source.column
    }

    pub fn operator(&self) -> &'a Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn path(&self) -> &ClausePath {
        &self.path
    }

    /// Human readable description, e.g. `Number Scoops >= 1,000`.
    pub fn summary(&self) -> String {
        let op = self.operator;
        let mut template = op
            .summary_template
            .clone()
            .unwrap_or_else(|| format!("{{data_source}} {} {{value}}", op.name));

        let value = match (&self.value, op.coalesced_value_type()) {
            (Value::Collection(ids), ValueType::Collection) => {
                if ids.len() == 1 && op.summary_template.is_none() {
                    let verb = if op.negative { "is not" } else { "is" };
                    template = format!("{{data_source}} {} {{value}}", verb);
                }
                if ids.is_empty() {
                    "(none)".to_string()
                } else {
                    join_ids(ids)
                }
            }
            (Value::RelativeDate(token), _) => token.as_str().replace('_', " "),
            (Value::Int(n), _) => with_commas(&n.to_string()),
            (Value::Float(n), _) => with_commas(&n.to_string()),
            (Value::Text(s), _) => s.clone(),
            (Value::Bool(b), _) => b.to_string(),
            (Value::Timestamp(ts), _) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            (Value::Choice(choice), _) => match choice.get("name") {
                Some(serde_json::Value::String(name)) => name.clone(),
                Some(other) => other.to_string(),
                None => serde_json::Value::Object(choice.clone()).to_string(),
            },
            (Value::Collection(ids), _) => join_ids(ids),
        };

        // the value is user supplied, so it goes in last
        template
            .replace("{data_source}", &self.source.display_name)
            .replace("{value}", &value)
    }
}

fn join_ids(ids: &[ChoiceId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Insert thousands separators into a rendered number.
fn with_commas(number: &str) -> String {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Resolves filters against one catalog and operator table.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    operators: &'a OperatorRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, operators: &'a OperatorRegistry) -> Self {
        Self { catalog, operators }
    }

    /// Resolve a whole filter. Errors carry the path of the failing node.
    pub fn resolve(&self, filter: &'a Filter) -> WinnowResult<ResolvedFilter<'a>> {
        self.resolve_filter(filter, ClausePath::root())
    }

    fn resolve_filter(&self, filter: &'a Filter, path: ClausePath) -> WinnowResult<ResolvedFilter<'a>> {
        let logical_op = LogicalOp::parse(filter.logical_op.as_deref()).ok_or_else(|| {
            WinnowError::InvalidLogicalOp(filter.logical_op.clone().unwrap_or_default()).at(&path)
        })?;

        let children = filter
            .filter_clauses
            .iter()
            .enumerate()
            .map(|(ix, node)| {
                let child_path = path.child(ix);
                match node {
                    FilterNode::Group(group) => self.resolve_filter(group, child_path).map(ResolvedNode::Group),
                    FilterNode::Clause(clause) => self
                        .resolve_clause(clause, child_path.clone())
                        .map(ResolvedNode::Clause)
                        .map_err(|e| e.at(&child_path)),
                }
            })
            .collect::<WinnowResult<Vec<_>>>()?;

        Ok(ResolvedFilter {
            logical_op,
            children,
            path,
        })
    }

    /// Resolve one leaf: source, then operator among the source's value
    /// types, then the value under the operator's value type.
    pub fn resolve_clause(&self, clause: &'a Clause, path: ClausePath) -> WinnowResult<ResolvedClause<'a>> {
        let source = self.catalog.resolve(&clause.data_source)?;
        let operator = self.operators.resolve(&clause.operator, &source.value_types)?;
        let value = values::vivify(operator.coalesced_value_type(), &clause.value)?;

        tracing::trace!(
            source = %source.display_name,
            operator = %operator.name,
            value_type = %operator.value_type,
            "resolved clause"
        );

        Ok(ResolvedClause {
            clause,
            source,
            operator,
            value,
            path,
        })
    }
}
