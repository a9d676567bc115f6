//! # Winnow: filter trees to parameterized SQL
//!
//! > **Values are bound, never spliced.**
//!
//! Winnow compiles nested AND/OR filters, stored as JSON by a UI or an API,
//! into a PostgreSQL `WHERE` condition plus its ordered parameters.
//!
//! ## Quick Example
//!
//! ```
//! use winnow_sql::prelude::*;
//!
//! let catalog = Catalog::new(vec![
//!     DataSource::new("Number Scoops", "num_scoops", &[ValueType::Numeric, ValueType::Nullable]),
//!     DataSource::new("Flavor", "flavor", &[ValueType::String]),
//! ]);
//! let winnow = Winnow::new("ice_cream", catalog);
//!
//! let filter = Filter::from_json(r#"{
//!     "logical_op": "|",
//!     "filter_clauses": [
//!         {"data_source": "Flavor", "operator": "is", "value": "Chocolate"},
//!         {"data_source": "Number Scoops", "operator": ">=", "value": "2"}
//!     ]
//! }"#).unwrap();
//!
//! let query = winnow.query(&filter).unwrap();
//! assert_eq!(
//!     query.to_numbered(),
//!     "SELECT * FROM ice_cream WHERE ((flavor = $1)\n OR \n(num_scoops >= $2))"
//! );
//! assert_eq!(query.params(), &[Param::from("Chocolate"), Param::Int(2)]);
//! ```
//!
//! ## Value types
//!
//! | Value type      | Example operators             | SQL                                  |
//! |-----------------|-------------------------------|--------------------------------------|
//! | `numeric`       | `>=`, `is`, `is not`          | `(col >= ?)`                         |
//! | `string`        | `contains`, `starts with`     | `(col ILIKE '%' \|\| ? \|\| '%')`    |
//! | `string_length` | `more than __ words`          | `(col ~ ?)`                          |
//! | `collection`    | `any of`, `not any of`        | `(col IN (?,?))`                     |
//! | `bool`          | `is`                          | `(col)` / `(NOT col)`                |
//! | `nullable`      | `is set`                      | `col IS NOT NULL`                    |
//! | `relative_date` | `within`, `outside of`        | `(col BETWEEN ?::timestamp AND ...)` |
//! | `absolute_date` | `before`, `after`             | `(col < ?::timestamp)`               |
//!
//! Clauses on a given data source and value type can be compiled by a
//! custom builder instead, see [`special_cases`].
//!
//! `relative_date` clauses get a `BETWEEN` default here. Earlier versions
//! had none and rejected them with `UnknownValueType` unless a special case
//! was registered; registered special cases still win. `single_choice` has
//! no default and still needs one.
//!
//! ## Limits
//!
//! Resolution and compilation recurse once per nesting level. Depth is not
//! bounded here: callers accepting filters from untrusted input should cap
//! filter size and depth before compiling.

pub mod ast;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod operators;
pub mod parser;
pub mod relative_dates;
pub mod resolver;
pub mod special_cases;
pub mod transpiler;
pub mod values;

pub mod prelude {
    pub use crate::ast::{Clause, ClausePath, Filter, FilterNode, LogicalOp};
    pub use crate::catalog::{Catalog, Choice, DataSource};
    pub use crate::compiler::{build_query, Winnow};
    pub use crate::config::WinnowConfig;
    pub use crate::engine::WinnowDb;
    pub use crate::error::*;
    pub use crate::fragment::{Fragment, FragmentBuilder, Param};
    pub use crate::operators::{Operator, OperatorRegistry, ValueType};
    pub use crate::relative_dates::RelativeDate;
    pub use crate::resolver::{ResolvedClause, ResolvedFilter};
    pub use crate::special_cases::SpecialCases;
    pub use crate::values::{ChoiceId, Value};
}

pub use compiler::{build_query, Winnow};
