//! Data sources a filter may reference.

use serde::{Deserialize, Serialize};

use crate::error::{WinnowError, WinnowResult};
use crate::operators::ValueType;

/// One filterable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Name clauses refer to this source by.
    pub display_name: String,
    /// SQL expression for the field. Trusted: it is spliced into the query
    /// text as-is.
    pub column: String,
    pub value_types: Vec<ValueType>,
    /// Allowed choices, for collection and single choice sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

/// An `{id, name}` choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub name: String,
}

impl DataSource {
    pub fn new(display_name: impl Into<String>, column: impl Into<String>, value_types: &[ValueType]) -> Self {
        Self {
            display_name: display_name.into(),
            column: column.into(),
            value_types: value_types.to_vec(),
            choices: None,
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn accepts(&self, value_type: ValueType) -> bool {
        self.value_types.contains(&value_type)
    }
}

/// The ordered, read-only list of data sources a compiler resolves against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    sources: Vec<DataSource>,
}

impl Catalog {
    pub fn new(sources: Vec<DataSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The single source with this exact display name.
    pub fn resolve(&self, name: &str) -> WinnowResult<&DataSource> {
        let mut matches = self.sources.iter().filter(|s| s.display_name == name);
        match (matches.next(), matches.next()) {
            (Some(source), None) => Ok(source),
            (None, _) => Err(WinnowError::UnknownDataSource(name.to_string())),
            (Some(_), Some(_)) => Err(WinnowError::AmbiguousDataSource(name.to_string())),
        }
    }
}

impl From<Vec<DataSource>> for Catalog {
    fn from(sources: Vec<DataSource>) -> Self {
        Self::new(sources)
    }
}

impl FromIterator<DataSource> for Catalog {
    fn from_iter<I: IntoIterator<Item = DataSource>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
