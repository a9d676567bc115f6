//! Filter tree types.
//!
//! Filters arrive as JSON in the shape they have always been stored in:
//!
//! ```json
//! {
//!   "logical_op": "|",
//!   "filter_clauses": [
//!     {"data_source": "Flavor", "operator": "is", "value": "Chocolate"},
//!     {"logical_op": "&", "filter_clauses": [ ... ]}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A group of clauses joined by one logical operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// `&`/`|` (or `and`/`or`). Missing means AND. Kept raw so that bad
    /// operators surface as resolution errors rather than parse errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_op: Option<String>,
    pub filter_clauses: Vec<FilterNode>,
}

/// One entry of a group: a nested group or a leaf comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(Filter),
    Clause(Clause),
}

/// A leaf comparison against a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub data_source: String,
    pub operator: String,
    #[serde(default)]
    pub value: Json,
}

impl Filter {
    /// A filter matching everything.
    pub fn empty() -> Self {
        Self {
            logical_op: Some(LogicalOp::And.symbol().to_string()),
            filter_clauses: Vec::new(),
        }
    }

    pub fn and(clauses: impl IntoIterator<Item = FilterNode>) -> Self {
        Self::group(LogicalOp::And, clauses)
    }

    pub fn or(clauses: impl IntoIterator<Item = FilterNode>) -> Self {
        Self::group(LogicalOp::Or, clauses)
    }

    fn group(op: LogicalOp, clauses: impl IntoIterator<Item = FilterNode>) -> Self {
        Self {
            logical_op: Some(op.symbol().to_string()),
            filter_clauses: clauses.into_iter().collect(),
        }
    }

    /// Parse a filter from JSON text.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn is_empty(&self) -> bool {
        self.filter_clauses.is_empty()
    }
}

impl Clause {
    pub fn new(data_source: impl Into<String>, operator: impl Into<String>, value: impl Into<Json>) -> Self {
        Self {
            data_source: data_source.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

impl From<Filter> for FilterNode {
    fn from(filter: Filter) -> Self {
        FilterNode::Group(filter)
    }
}

impl From<Clause> for FilterNode {
    fn from(clause: Clause) -> Self {
        FilterNode::Clause(clause)
    }
}

/// Logical operator between sibling clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl LogicalOp {
    /// Interpret a raw `logical_op` field. `None` means AND.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let Some(raw) = raw else {
            return Some(LogicalOp::And);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "&" | "and" => Some(LogicalOp::And),
            "|" | "or" => Some(LogicalOp::Or),
            _ => None,
        }
    }

    /// The stored form of this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&",
            LogicalOp::Or => "|",
        }
    }

    /// Separator placed between compiled sibling clauses.
    pub fn separator(self) -> &'static str {
        match self {
            LogicalOp::And => "\n AND \n",
            LogicalOp::Or => "\n OR \n",
        }
    }
}

/// Position of a node in a filter tree, as indexes into nested
/// `filter_clauses` lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClausePath(Vec<usize>);

impl ClausePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indexes = self.0.clone();
        indexes.push(index);
        Self(indexes)
    }

    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ClausePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "filter");
        }
        for (i, ix) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "filter_clauses[{}]", ix)?;
        }
        Ok(())
    }
}
