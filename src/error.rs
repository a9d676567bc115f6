//! Error types for Winnow.

use thiserror::Error;

use crate::ast::ClausePath;
use crate::operators::ValueType;

/// The main error type for Winnow operations.
#[derive(Debug, Error)]
pub enum WinnowError {
    /// No data source in the catalog has this display name.
    #[error("Unknown data source '{0}'")]
    UnknownDataSource(String),

    /// More than one data source has this display name.
    #[error("Ambiguous data source '{0}'")]
    AmbiguousDataSource(String),

    /// No operator with this name accepts the source's value types.
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    /// The operator has no binary SQL token.
    #[error("No SQL binary operator for operator '{0}'")]
    UnsupportedOperator(String),

    /// A value could not be vivified (or stringified) as its value type.
    #[error("Invalid {value_type} value: {message}")]
    InvalidValue {
        value_type: ValueType,
        message: String,
    },

    /// A group's logical op is neither AND nor OR.
    #[error("Logical op must be one of &, |. Given: '{0}'")]
    InvalidLogicalOp(String),

    /// No default clause builder exists for this value type.
    #[error("Unknown value_type '{0}'")]
    UnknownValueType(ValueType),

    /// A special case is already registered for this key.
    #[error("Conflicting handlers registered for ({source_name}, {value_type})")]
    ConflictingHandler {
        source_name: String,
        value_type: ValueType,
    },

    /// An operator with the same name and value type already exists.
    #[error("Duplicate operator '{name}' for value_type {value_type}")]
    DuplicateOperator { name: String, value_type: ValueType },

    /// A table name is not a plain SQL identifier.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// SQL text and parameter list disagree.
    #[error("Fragment has {placeholders} placeholder(s) but {params} param(s)")]
    ParamMismatch { placeholders: usize, params: usize },

    /// A param the database driver cannot bind, e.g. a mixed-type array.
    #[error("Cannot bind param: {0}")]
    UnsupportedParam(String),

    /// An error raised while resolving or compiling one node of a filter.
    #[error("{path}: {source}")]
    Clause {
        path: ClausePath,
        source: Box<WinnowError>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WinnowError {
    /// Create an invalid value error.
    pub fn invalid(value_type: ValueType, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            value_type,
            message: message.into(),
        }
    }

    /// Attach the path of the offending node. Already-located errors keep
    /// their innermost path.
    pub fn at(self, path: &ClausePath) -> Self {
        match self {
            located @ Self::Clause { .. } => located,
            other => Self::Clause {
                path: path.clone(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, without location.
    pub fn kind(&self) -> &WinnowError {
        match self {
            Self::Clause { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Path of the offending node, if known.
    pub fn path(&self) -> Option<&ClausePath> {
        match self {
            Self::Clause { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for Winnow operations.
pub type WinnowResult<T> = Result<T, WinnowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WinnowError::invalid(ValueType::Numeric, "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "Invalid numeric value: invalid digit found in string"
        );
    }

    #[test]
    fn test_located_error() {
        let path = ClausePath::root().child(1).child(0);
        let err = WinnowError::UnknownDataSource("Sprinkles".into()).at(&path);
        assert_eq!(
            err.to_string(),
            "filter_clauses[1].filter_clauses[0]: Unknown data source 'Sprinkles'"
        );
        assert!(matches!(err.kind(), WinnowError::UnknownDataSource(name) if name == "Sprinkles"));
        assert_eq!(err.path(), Some(&path));

        // the innermost location wins
        let outer = err.at(&ClausePath::root());
        assert_eq!(outer.path(), Some(&path));
    }
}
