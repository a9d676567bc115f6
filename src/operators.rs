//! Value types and the operator table.
//!
//! Operators are stored by name; the same name may exist once per value type
//! (`is` exists for numbers, strings and booleans). A data source's value
//! types decide which of them a clause resolves to.

use serde::{Deserialize, Serialize};

use crate::error::{WinnowError, WinnowResult};

/// Semantic type of the values a data source can be compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Presence check (`IS [NOT] NULL`)
    Nullable,
    /// Boolean column
    Bool,
    /// Integer or float
    Numeric,
    /// Free text
    String,
    /// Word count of a text column
    StringLength,
    /// One of a set of string ids
    Collection,
    /// A single `{id, name}` choice
    SingleChoice,
    /// Symbolic range such as `last_7_days`
    RelativeDate,
    /// Concrete timestamp
    AbsoluteDate,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Nullable => "nullable",
            ValueType::Bool => "bool",
            ValueType::Numeric => "numeric",
            ValueType::String => "string",
            ValueType::StringLength => "string_length",
            ValueType::Collection => "collection",
            ValueType::SingleChoice => "single_choice",
            ValueType::RelativeDate => "relative_date",
            ValueType::AbsoluteDate => "absolute_date",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter operator, e.g. `>=` on numbers or `any of` on collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub negative: bool,
    /// The value type used to vivify and summarize values of this operator,
    /// when it differs from `value_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coalesced_value_type: Option<ValueType>,
    /// Summary text with `{data_source}` and `{value}` slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_template: Option<String>,
}

impl Operator {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            negative: false,
            coalesced_value_type: None,
            summary_template: None,
        }
    }

    pub fn negative(mut self) -> Self {
        self.negative = true;
        self
    }

    pub fn coalesce_to(mut self, value_type: ValueType) -> Self {
        self.coalesced_value_type = Some(value_type);
        self
    }

    pub fn summary(mut self, template: impl Into<String>) -> Self {
        self.summary_template = Some(template.into());
        self
    }

    /// The value type values of this operator are vivified as.
    pub fn coalesced_value_type(&self) -> ValueType {
        self.coalesced_value_type.unwrap_or(self.value_type)
    }

    /// The binary SQL token for this operator.
    pub fn sql_binary_op(&self) -> WinnowResult<&'static str> {
        binary_sql_operator(&self.name)
    }
}

/// Map an operator name to its binary SQL token.
pub fn binary_sql_operator(name: &str) -> WinnowResult<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        ">=" => Ok(">="),
        "<=" => Ok("<="),
        ">" => Ok(">"),
        "<" => Ok("<"),
        "before" => Ok("<"),
        "after" => Ok(">="),
        "is" => Ok("="),
        "is not" => Ok("<>"),
        _ => Err(WinnowError::UnsupportedOperator(name.to_string())),
    }
}

/// The set of operators a compiler resolves clauses against.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorRegistry {
    operators: Vec<Operator>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        use ValueType::*;

        let operators = vec![
            Operator::new(">=", Numeric),
            Operator::new("<=", Numeric),
            Operator::new(">", Numeric),
            Operator::new("<", Numeric),
            Operator::new("is", Numeric),
            Operator::new("is not", Numeric).negative(),
            Operator::new("is", String),
            Operator::new("is not", String).negative(),
            Operator::new("contains", String),
            Operator::new("starts with", String),
            Operator::new("more than __ words", StringLength)
                .coalesce_to(Numeric)
                .summary("{data_source} has more than {value} words"),
            Operator::new("fewer than __ words", StringLength)
                .coalesce_to(Numeric)
                .summary("{data_source} has fewer than {value} words"),
            Operator::new("any of", Collection),
            Operator::new("is", Bool),
            Operator::new("not any of", Collection).negative(),
            Operator::new("within", RelativeDate),
            Operator::new("outside of", RelativeDate).negative(),
            Operator::new("after", AbsoluteDate),
            Operator::new("before", AbsoluteDate),
            Operator::new("is set", Nullable).coalesce_to(Bool).negative(),
        ];

        Self { operators }
    }
}

impl OperatorRegistry {
    /// A registry with no operators at all.
    pub fn empty() -> Self {
        Self { operators: Vec::new() }
    }

    /// Add an operator. Names are unique per value type, ignoring case.
    pub fn push(&mut self, operator: Operator) -> WinnowResult<()> {
        let duplicate = self.operators.iter().any(|op| {
            op.value_type == operator.value_type && op.name.eq_ignore_ascii_case(&operator.name)
        });
        if duplicate {
            return Err(WinnowError::DuplicateOperator {
                name: operator.name,
                value_type: operator.value_type,
            });
        }
        self.operators.push(operator);
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, operator: Operator) -> WinnowResult<Self> {
        self.push(operator)?;
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.operators.iter()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Find the operator called `name` (case-insensitive) among those that
    /// accept one of `value_types`. With several matches the last one in
    /// table order wins.
    pub fn resolve(&self, name: &str, value_types: &[ValueType]) -> WinnowResult<&Operator> {
        let name = name.trim();
        let mut matches = self
            .operators
            .iter()
            .filter(|op| op.name.eq_ignore_ascii_case(name) && value_types.contains(&op.value_type));

        let mut found = matches.next();
        let mut count = usize::from(found.is_some());
        for op in matches {
            found = Some(op);
            count += 1;
        }
        if count > 1 {
            tracing::warn!(operator = name, count, "several operators match, using the last one");
        }

        found.ok_or_else(|| WinnowError::UnknownOperator(name.to_string()))
    }
}
