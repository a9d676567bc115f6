use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use winnow_sql::prelude::*;

fn catalog() -> Catalog {
    Catalog::new(vec![
        DataSource::new("Has Sprinkles", "has_sprinkles", &[ValueType::Bool]),
        DataSource::new("Waffle Cone", "waffle_cone", &[ValueType::Bool]),
        DataSource::new("Number Scoops", "num_scoops", &[ValueType::Numeric, ValueType::Nullable]),
    ])
}

fn sprinkles(_: &Winnow, clause: &ResolvedClause<'_>) -> WinnowResult<Fragment> {
    let fragment = FragmentBuilder::new()
        .push("EXISTS (SELECT 1 FROM toppings t WHERE t.cone_id = ice_cream.id AND t.kind = ")
        .push_bind("sprinkles")
        .push(" AND t.visible = ")
        .push_bind(clause.value().as_bool().unwrap_or(false))
        .push(")")
        .build();
    Ok(fragment)
}

#[test]
fn test_special_case_output_passes_through() {
    let mut special = SpecialCases::new();
    special.register("Has Sprinkles", ValueType::Bool, sprinkles).unwrap();
    let winnow = Winnow::new("ice_cream", catalog()).with_special_cases(Arc::new(special));

    let filter = Filter::and([
        Clause::new("Number Scoops", ">=", 2).into(),
        Clause::new("Has Sprinkles", "is", true).into(),
        Clause::new("Waffle Cone", "is", false).into(),
    ]);
    let fragment = winnow.where_clauses(&filter).unwrap().unwrap();

    assert_eq!(
        fragment.text(),
        "((num_scoops >= ?)\n AND \nEXISTS (SELECT 1 FROM toppings t WHERE t.cone_id = ice_cream.id \
         AND t.kind = ? AND t.visible = ?)\n AND \n(NOT waffle_cone))"
    );
    assert_eq!(
        fragment.params(),
        &[Param::Int(2), Param::from("sprinkles"), Param::Bool(true)]
    );
}

#[test]
fn test_special_case_can_extend_default() {
    let mut special = SpecialCases::new();
    special
        .register("Number Scoops", ValueType::Numeric, |winnow, clause| {
            let default = winnow.default_clause(clause)?;
            let extra = FragmentBuilder::new().push(" AND num_scoops < ").push_bind(10).build();
            Ok((default + extra).parenthesize())
        })
        .unwrap();
    let winnow = Winnow::new("ice_cream", catalog()).with_special_cases(Arc::new(special));

    let filter = Filter::and([Clause::new("Number Scoops", ">", "3").into()]);
    let fragment = winnow.where_clauses(&filter).unwrap().unwrap();
    assert_eq!(fragment.text(), "(((num_scoops > ?) AND num_scoops < ?))");
    assert_eq!(fragment.params(), &[Param::Int(3), Param::Int(10)]);

    // the nullable operator on the same source is not overridden
    let filter = Filter::and([Clause::new("Number Scoops", "is set", false).into()]);
    assert_eq!(winnow.where_clauses(&filter).unwrap().unwrap().text(), "(num_scoops IS NULL)");
}

#[test]
fn test_special_case_errors_are_located() {
    let mut special = SpecialCases::new();
    special
        .register("Waffle Cone", ValueType::Bool, |_, _| Fragment::raw("waffle = ?"))
        .unwrap();
    let winnow = Winnow::new("ice_cream", catalog()).with_special_cases(Arc::new(special));

    let filter = Filter::and([Clause::new("Waffle Cone", "is", true).into()]);
    let err = winnow.where_clauses(&filter).unwrap_err();
    assert!(matches!(err.kind(), WinnowError::ParamMismatch { placeholders: 1, params: 0 }));
    assert_eq!(err.path().map(|p| p.to_string()), Some("filter_clauses[0]".to_string()));
}

#[test]
fn test_conflicting_registration() {
    let mut special = SpecialCases::new();
    special.register("Has Sprinkles", ValueType::Bool, sprinkles).unwrap();
    assert!(matches!(
        special.register("Has Sprinkles", ValueType::Bool, sprinkles),
        Err(WinnowError::ConflictingHandler { .. })
    ));
}

#[test]
fn test_shared_registry() {
    let mut special = SpecialCases::new();
    special.register("Has Sprinkles", ValueType::Bool, sprinkles).unwrap();
    let special = Arc::new(special);

    let a = Winnow::new("ice_cream", catalog()).with_special_cases(Arc::clone(&special));
    let b = Winnow::new("ice_cream", catalog()).with_special_cases(Arc::clone(&special));
    let filter = Filter::and([Clause::new("Has Sprinkles", "is", "true").into()]);

    assert_eq!(a.query(&filter).unwrap(), b.query(&filter).unwrap());
    assert_eq!(a.special_cases().len(), 1);
}

#[test]
fn test_special_case_runs_beside_empty_group() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut special = SpecialCases::new();
    special
        .register("Has Sprinkles", ValueType::Bool, move |winnow, clause| {
            seen.fetch_add(1, Ordering::SeqCst);
            sprinkles(winnow, clause)
        })
        .unwrap();
    special
        .register("Waffle Cone", ValueType::Bool, |_, _| Fragment::raw("waffle = ?"))
        .unwrap();
    let winnow = Winnow::new("ice_cream", catalog()).with_special_cases(Arc::new(special));

    let filter = Filter::or([Filter::empty().into(), Clause::new("Has Sprinkles", "is", true).into()]);
    assert_eq!(winnow.where_clauses(&filter).unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let filter = Filter::or([Filter::empty().into(), Clause::new("Waffle Cone", "is", true).into()]);
    let err = winnow.where_clauses(&filter).unwrap_err();
    assert!(matches!(err.kind(), WinnowError::ParamMismatch { placeholders: 1, params: 0 }));
    assert_eq!(err.path().map(|p| p.indexes().to_vec()), Some(vec![1]));
}
