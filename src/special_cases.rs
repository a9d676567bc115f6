//! Overrides of the default SQL for specific (data source, value type) pairs.
//!
//! Registration happens once, while the process starts; afterwards the
//! registry is shared read-only between compilers.
//!
//! ```
//! use std::sync::Arc;
//! use winnow_sql::prelude::*;
//!
//! let mut special = SpecialCases::new();
//! special
//!     .register("Has Sprinkles", ValueType::Bool, |_winnow, clause| {
//!         let exists = FragmentBuilder::new()
//!             .push("EXISTS (SELECT 1 FROM toppings t WHERE t.cone_id = cones.id AND t.kind = ")
//!             .push_bind("sprinkles")
//!             .push(")")
//!             .build();
//!         let negate = clause.value().as_bool() == Some(false);
//!         Ok(if negate { exists.wrap("NOT ", "") } else { exists })
//!     })
//!     .unwrap();
//!
//! let winnow = Winnow::new("cones", Catalog::default()).with_special_cases(Arc::new(special));
//! # let _ = winnow;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::Winnow;
use crate::error::{WinnowError, WinnowResult};
use crate::fragment::Fragment;
use crate::operators::ValueType;
use crate::resolver::ResolvedClause;

/// A clause builder: given the compiler and a resolved clause, produce its
/// SQL. The fragment is used exactly as returned.
pub type ClauseBuilder = Arc<dyn Fn(&Winnow, &ResolvedClause<'_>) -> WinnowResult<Fragment> + Send + Sync>;

/// Registry of special-case clause builders.
#[derive(Default, Clone)]
pub struct SpecialCases {
    // keyed by source name first so lookups can borrow a `&str`
    handlers: HashMap<String, HashMap<ValueType, ClauseBuilder>>,
}

impl SpecialCases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` for clauses on `source_name` whose operator has
    /// `value_type`.
    pub fn register<F>(&mut self, source_name: &str, value_type: ValueType, builder: F) -> WinnowResult<&mut Self>
    where
        F: Fn(&Winnow, &ResolvedClause<'_>) -> WinnowResult<Fragment> + Send + Sync + 'static,
    {
        self.register_all(source_name, &[value_type], builder)
    }

    /// Register one builder under several value types. Nothing is
    /// registered if any of the keys is taken.
    pub fn register_all<F>(
        &mut self,
        source_name: &str,
        value_types: &[ValueType],
        builder: F,
    ) -> WinnowResult<&mut Self>
    where
        F: Fn(&Winnow, &ResolvedClause<'_>) -> WinnowResult<Fragment> + Send + Sync + 'static,
    {
        for (i, value_type) in value_types.iter().enumerate() {
            if self.lookup(source_name, *value_type).is_some() || value_types[..i].contains(value_type) {
                return Err(WinnowError::ConflictingHandler {
                    source_name: source_name.to_string(),
                    value_type: *value_type,
                });
            }
        }

        let builder: ClauseBuilder = Arc::new(builder);
        let by_type = self.handlers.entry(source_name.to_string()).or_default();
        for value_type in value_types {
            by_type.insert(*value_type, Arc::clone(&builder));
        }
        tracing::debug!(source = source_name, ?value_types, "registered special case");
        Ok(self)
    }

    /// The builder registered for this key, if any.
    pub fn lookup(&self, source_name: &str, value_type: ValueType) -> Option<&ClauseBuilder> {
        self.handlers.get(source_name)?.get(&value_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SpecialCases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<(&str, ValueType)> = self
            .handlers
            .iter()
            .flat_map(|(source, by_type)| by_type.keys().map(move |vt| (source.as_str(), *vt)))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
        f.debug_struct("SpecialCases").field("handlers", &keys).finish()
    }
}
