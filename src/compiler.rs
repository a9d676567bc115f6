//! The filter compiler.
//!
//! [`Winnow`] owns a catalog, an operator table and a shared special-case
//! registry. It resolves a [`Filter`] into a separate resolved tree, then
//! compiles that tree bottom-up into one [`Fragment`].
//!
//! ```
//! use serde_json::json;
//! use winnow_sql::prelude::*;
//!
//! let catalog = Catalog::new(vec![
//!     DataSource::new("Number Scoops", "num_scoops", &[ValueType::Numeric, ValueType::Nullable]),
//!     DataSource::new("Flavor", "flavor", &[ValueType::Collection]),
//! ]);
//! let winnow = Winnow::new("ice_cream", catalog);
//!
//! let filter = Filter::and([
//!     Clause::new("Number Scoops", ">=", "2").into(),
//!     Clause::new("Flavor", "any of", json!(["Strawberry", "Chocolate"])).into(),
//! ]);
//! let condition = winnow.where_clauses(&filter).unwrap().unwrap();
//! assert_eq!(condition.text(), "((num_scoops >= ?)\n AND \n(flavor IN (?,?)))");
//! assert_eq!(condition.params().len(), 3);
//! ```

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::ast::{Filter, LogicalOp};
use crate::catalog::Catalog;
use crate::error::WinnowResult;
use crate::fragment::{Fragment, FragmentBuilder};
use crate::operators::OperatorRegistry;
use crate::resolver::{ResolvedClause, ResolvedFilter, ResolvedNode, Resolver};
use crate::special_cases::SpecialCases;
use crate::transpiler;

/// Compiles filters against one table and catalog.
///
/// `Winnow` is immutable once built and can be shared between threads;
/// every call works on its own resolved tree.
#[derive(Debug, Clone)]
pub struct Winnow {
    table: String,
    catalog: Catalog,
    operators: OperatorRegistry,
    special_cases: Arc<SpecialCases>,
    now: Option<NaiveDateTime>,
}

impl Winnow {
    pub fn new(table: impl Into<String>, catalog: Catalog) -> Self {
        Self {
            table: table.into(),
            catalog,
            operators: OperatorRegistry::default(),
            special_cases: Arc::new(SpecialCases::new()),
            now: None,
        }
    }

    /// Replace the default operator table.
    pub fn with_operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = operators;
        self
    }

    pub fn with_special_cases(mut self, special_cases: Arc<SpecialCases>) -> Self {
        self.special_cases = special_cases;
        self
    }

    /// Pin the clock relative dates are interpreted against.
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn special_cases(&self) -> &SpecialCases {
        &self.special_cases
    }

    /// The pinned clock, or local time.
    pub fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| chrono::Local::now().naive_local())
    }

    /// Resolve every node of `filter`. The filter itself is left untouched.
    pub fn resolve<'a>(&'a self, filter: &'a Filter) -> WinnowResult<ResolvedFilter<'a>> {
        let resolved = Resolver::new(&self.catalog, &self.operators).resolve(filter)?;
        tracing::debug!(clauses = resolved.clauses().len(), "resolved filter");
        Ok(resolved)
    }

    /// Check that `filter` resolves.
    pub fn validate(&self, filter: &Filter) -> WinnowResult<()> {
        self.resolve(filter).map(drop)
    }

    /// Compile `filter` into a WHERE condition. `None` means the filter puts
    /// no restriction on rows.
    pub fn where_clauses(&self, filter: &Filter) -> WinnowResult<Option<Fragment>> {
        let resolved = self.resolve(filter)?;
        self.compile(&resolved)
    }

    /// Compile an already resolved tree.
    pub fn compile(&self, resolved: &ResolvedFilter<'_>) -> WinnowResult<Option<Fragment>> {
        let now = self.now();
        self.compile_group(resolved, now)
    }

    fn compile_group(&self, group: &ResolvedFilter<'_>, now: NaiveDateTime) -> WinnowResult<Option<Fragment>> {
        let mut parts = Vec::with_capacity(group.children.len());
        let mut unconditional = false;

        // every child compiles, so errors surface even next to an empty group
        for child in &group.children {
            let part = match child {
                ResolvedNode::Group(inner) => self.compile_group(inner, now)?,
                ResolvedNode::Clause(clause) => Some(
                    self.compile_clause_at(clause, now)
                        .map_err(|e| e.at(clause.path()))?,
                ),
            };

            match part {
                Some(fragment) => parts.push(fragment),
                None => unconditional = true,
            }
        }

        // anything OR everything is everything
        if parts.is_empty() || (unconditional && group.logical_op == LogicalOp::Or) {
            return Ok(None);
        }
        Ok(Some(Fragment::join(group.logical_op.separator(), parts).parenthesize()))
    }

    /// SQL for one clause: the special case registered for its source and
    /// value type, or the default builder.
    pub fn compile_clause(&self, clause: &ResolvedClause<'_>) -> WinnowResult<Fragment> {
        self.compile_clause_at(clause, self.now())
    }

    fn compile_clause_at(&self, clause: &ResolvedClause<'_>, now: NaiveDateTime) -> WinnowResult<Fragment> {
        let source = &clause.source().display_name;
        let value_type = clause.operator().value_type;

        let fragment = match self.special_cases.lookup(source, value_type) {
            Some(builder) => {
                tracing::debug!(source = %source, %value_type, "dispatching special case");
                builder(self, clause)?
            }
            None => self.default_clause_at(clause, now)?,
        };

        tracing::trace!(path = %clause.path(), sql = fragment.text(), "compiled clause");
        Ok(fragment)
    }

    /// SQL from the default builder, ignoring special cases. Special cases
    /// may call this to extend the default output.
    pub fn default_clause(&self, clause: &ResolvedClause<'_>) -> WinnowResult<Fragment> {
        self.default_clause_at(clause, self.now())
    }

    fn default_clause_at(&self, clause: &ResolvedClause<'_>, now: NaiveDateTime) -> WinnowResult<Fragment> {
        transpiler::where_clause(clause.column(), clause.operator(), clause.value(), now)
    }

    /// `SELECT * FROM <table> WHERE <condition>`.
    pub fn query(&self, filter: &Filter) -> WinnowResult<Fragment> {
        let condition = self.where_clauses(filter)?;
        let query = build_query(&self.table, condition)?;
        tracing::debug!(table = %self.table, params = query.params().len(), "compiled query");
        Ok(query)
    }

    /// Human readable summary of every clause, depth first.
    pub fn summaries(&self, filter: &Filter) -> WinnowResult<Vec<String>> {
        let resolved = self.resolve(filter)?;
        Ok(resolved.clauses().iter().map(|clause| clause.summary()).collect())
    }
}

/// Wrap a compiled condition in a `SELECT` over `table`. A missing
/// condition selects every row.
pub fn build_query(table: &str, condition: Option<Fragment>) -> WinnowResult<Fragment> {
    let mut builder = FragmentBuilder::new();
    builder.push("SELECT * FROM ").push_identifier(table)?.push(" WHERE ");
    match condition {
        Some(condition) => builder.push_fragment(condition),
        None => builder.push("TRUE"),
    };
    Ok(builder.build())
}
