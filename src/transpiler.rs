//! Default SQL for resolved clauses.
//!
//! One builder per value type family. Every builder parenthesizes its
//! output (nullable excepted) and binds user values as parameters; only the
//! trusted column expression is spliced into the text.

use chrono::NaiveDateTime;

use crate::error::{WinnowError, WinnowResult};
use crate::fragment::{Fragment, FragmentBuilder, Param};
use crate::operators::{Operator, ValueType};
use crate::values::Value;

/// Build the default WHERE condition for `column <operator> value`.
///
/// `now` anchors relative dates.
pub fn where_clause(column: &str, operator: &Operator, value: &Value, now: NaiveDateTime) -> WinnowResult<Fragment> {
    match operator.value_type {
        ValueType::Nullable => nullable_clause(column, value),
        ValueType::AbsoluteDate => absolute_date_clause(column, operator, value),
        ValueType::Collection => collection_clause(column, operator, value),
        ValueType::Bool => bool_clause(column, value),
        ValueType::Numeric => numeric_clause(column, operator, value),
        ValueType::String => string_clause(column, operator, value),
        ValueType::StringLength => string_length_clause(column, operator, value),
        ValueType::RelativeDate => relative_date_clause(column, operator, value, now),
        ValueType::SingleChoice => Err(WinnowError::UnknownValueType(operator.value_type)),
    }
}

fn mismatch(value_type: ValueType, value: &Value) -> WinnowError {
    WinnowError::invalid(value_type, format!("unexpected value {:?}", value))
}

/// `column IS NOT NULL` for true, `column IS NULL` for false.
pub fn nullable_clause(column: &str, value: &Value) -> WinnowResult<Fragment> {
    let is_set = value.as_bool().ok_or_else(|| mismatch(ValueType::Nullable, value))?;
    let test = if is_set { " IS NOT NULL" } else { " IS NULL" };
    Ok(FragmentBuilder::new().push(column).push(test).build())
}

pub fn bool_clause(column: &str, value: &Value) -> WinnowResult<Fragment> {
    let truthy = value.as_bool().ok_or_else(|| mismatch(ValueType::Bool, value))?;
    let prefix = if truthy { "(" } else { "(NOT " };
    Ok(FragmentBuilder::new().push(prefix).push(column).push(")").build())
}

/// `(column <op> ?)`
fn binary_clause(column: &str, sql_op: &str, param: Param) -> Fragment {
    FragmentBuilder::new()
        .push("(")
        .push(column)
        .push(" ")
        .push(sql_op)
        .push(" ")
        .push_bind(param)
        .push(")")
        .build()
}

pub fn numeric_clause(column: &str, operator: &Operator, value: &Value) -> WinnowResult<Fragment> {
    let param = match value {
        Value::Int(n) => Param::Int(*n),
        Value::Float(n) => Param::Float(*n),
        other => return Err(mismatch(ValueType::Numeric, other)),
    };
    Ok(binary_clause(column, operator.sql_binary_op()?, param))
}

pub fn absolute_date_clause(column: &str, operator: &Operator, value: &Value) -> WinnowResult<Fragment> {
    let Value::Timestamp(ts) = value else {
        return Err(mismatch(ValueType::AbsoluteDate, value));
    };
    Ok(binary_clause(column, operator.sql_binary_op()?, Param::Timestamp(*ts)))
}

/// `(column IN (?,?))`, or `NOT IN` for negative operators.
///
/// An empty list binds a lone NULL so the SQL stays valid: nothing is
/// `IN (NULL)`, and every non-null value `IS DISTINCT FROM` it.
pub fn collection_clause(column: &str, operator: &Operator, value: &Value) -> WinnowResult<Fragment> {
    let Value::Collection(ids) = value else {
        return Err(mismatch(ValueType::Collection, value));
    };

    let mut builder = FragmentBuilder::new();
    builder.push("(").push(column);
    match (ids.is_empty(), operator.negative) {
        (false, negative) => {
            builder
                .push(if negative { " NOT IN " } else { " IN " })
                .push_bind_list(ids.iter().map(Param::from));
        }
        (true, false) => {
            builder.push(" IN (").push_bind(Param::Null).push(")");
        }
        (true, true) => {
            builder.push(" IS DISTINCT FROM ").push_bind(Param::Null);
        }
    }
    Ok(builder.push(")").build())
}

/// Pattern operators use `ILIKE`; `is ''` also matches NULL, since forms
/// store blank answers as either.
pub fn string_clause(column: &str, operator: &Operator, value: &Value) -> WinnowResult<Fragment> {
    let Value::Text(text) = value else {
        return Err(mismatch(ValueType::String, value));
    };

    let mut builder = FragmentBuilder::new();
    builder.push("(").push(column);
    match operator.name.trim().to_ascii_lowercase().as_str() {
        "contains" => {
            builder.push(" ILIKE '%' || ").push_bind(text.as_str()).push(" || '%'");
        }
        "starts with" => {
            builder.push(" ILIKE ").push_bind(text.as_str()).push(" || '%'");
        }
        _ => {
            let sql_op = operator.sql_binary_op()?;
            builder.push(" ").push(sql_op).push(" ").push_bind(text.as_str());
            if sql_op == "=" && text.is_empty() {
                builder.push(" OR ").push(column).push(" IS NULL");
            }
        }
    }
    Ok(builder.push(")").build())
}

/// Word counts are checked with a regular expression bound as a parameter.
pub fn string_length_clause(column: &str, operator: &Operator, value: &Value) -> WinnowResult<Fragment> {
    // fractional counts truncate toward zero
    let words = match value {
        Value::Int(n) => *n,
        Value::Float(n) => n.trunc() as i64,
        other => return Err(mismatch(ValueType::StringLength, other)),
    };

    let name = operator.name.trim().to_ascii_lowercase();
    let pattern = if name.starts_with("more than") {
        format!(r"(\S+\s+){{{}}}\S+$", words.max(0))
    } else if name.starts_with("fewer than") {
        if words <= 0 {
            return Ok(FragmentBuilder::new().push("(").push(column).push(" IS NULL)").build());
        }
        format!(r"^(\S+\s+){{0,{}}}\S*$", words - 1)
    } else {
        return Err(WinnowError::UnsupportedOperator(operator.name.clone()));
    };

    Ok(binary_clause(column, "~", Param::Text(pattern)))
}

/// `(column BETWEEN ?::timestamp AND ?::timestamp)` over the token's range.
///
/// Older deployments had no default for relative dates and compiled them
/// only through special cases; a special case registered for the source
/// still takes precedence over this builder.
pub fn relative_date_clause(
    column: &str,
    operator: &Operator,
    value: &Value,
    now: NaiveDateTime,
) -> WinnowResult<Fragment> {
    let Value::RelativeDate(token) = value else {
        return Err(mismatch(ValueType::RelativeDate, value));
    };
    let (start, end) = token.interpret(now);

    Ok(FragmentBuilder::new()
        .push("(")
        .push(column)
        .push(if operator.negative { " NOT BETWEEN " } else { " BETWEEN " })
        .push_bind(start)
        .push(" AND ")
        .push_bind(end)
        .push(")")
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorRegistry;
    use crate::relative_dates::RelativeDate;
    use crate::values::ChoiceId;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(15, 30, 0).unwrap()
    }

    fn op(name: &str, value_type: ValueType) -> Operator {
        OperatorRegistry::default().resolve(name, &[value_type]).unwrap().clone()
    }

    fn compile(name: &str, value_type: ValueType, value: Value) -> WinnowResult<Fragment> {
        where_clause("col", &op(name, value_type), &value, now())
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_nullable() {
        let set = compile("is set", ValueType::Nullable, Value::Bool(true)).unwrap();
        assert_eq!(set.text(), "col IS NOT NULL");
        assert!(set.params().is_empty());

        let unset = compile("is set", ValueType::Nullable, Value::Bool(false)).unwrap();
        assert_eq!(unset.text(), "col IS NULL");
    }

    #[test]
    fn test_bool() {
        assert_eq!(compile("is", ValueType::Bool, Value::Bool(true)).unwrap().text(), "(col)");
        assert_eq!(compile("is", ValueType::Bool, Value::Bool(false)).unwrap().text(), "(NOT col)");
    }

    #[test]
    fn test_numeric() {
        let fragment = compile(">=", ValueType::Numeric, Value::Int(2)).unwrap();
        assert_eq!(fragment.text(), "(col >= ?)");
        assert_eq!(fragment.params(), &[Param::Int(2)]);

        let fragment = compile("is not", ValueType::Numeric, Value::Float(2.5)).unwrap();
        assert_eq!(fragment.text(), "(col <> ?)");
        assert_eq!(fragment.params(), &[Param::Float(2.5)]);
    }

    #[test]
    fn test_absolute_date() {
        let ts = NaiveDate::from_ymd_opt(2014, 1, 21).unwrap().and_hms_opt(16, 34, 2).unwrap();
        let fragment = compile("before", ValueType::AbsoluteDate, Value::Timestamp(ts)).unwrap();
        assert_eq!(fragment.text(), "(col < ?::timestamp)");
        assert_eq!(fragment.params(), &[Param::Timestamp(ts)]);

        let fragment = compile("after", ValueType::AbsoluteDate, Value::Timestamp(ts)).unwrap();
        assert_eq!(fragment.text(), "(col >= ?::timestamp)");
    }

    #[test]
    fn test_collection() {
        let ids = Value::Collection(vec!["Strawberry".into(), "Chocolate".into()]);
        let fragment = compile("any of", ValueType::Collection, ids.clone()).unwrap();
        assert_eq!(fragment.text(), "(col IN (?,?))");
        assert_eq!(fragment.params(), &[Param::from("Strawberry"), Param::from("Chocolate")]);

        let fragment = compile("not any of", ValueType::Collection, ids).unwrap();
        assert_eq!(fragment.text(), "(col NOT IN (?,?))");
    }

    #[test]
    fn test_collection_ids_keep_their_type() {
        let ids = Value::Collection(vec![ChoiceId::Int(7), "L".into()]);
        let fragment = compile("any of", ValueType::Collection, ids).unwrap();
        assert_eq!(fragment.params(), &[Param::Int(7), Param::from("L")]);
    }

    #[test]
    fn test_empty_collection_binds_null() {
        let empty = Value::Collection(vec![]);
        let fragment = compile("any of", ValueType::Collection, empty.clone()).unwrap();
        assert_eq!(fragment.text(), "(col IN (?))");
        assert_eq!(fragment.params(), &[Param::Null]);

        let fragment = compile("not any of", ValueType::Collection, empty).unwrap();
        assert_eq!(fragment.text(), "(col IS DISTINCT FROM ?)");
        assert_eq!(fragment.params(), &[Param::Null]);
    }

    #[test]
    fn test_string_patterns() {
        let fragment = compile("contains", ValueType::String, text("mint")).unwrap();
        assert_eq!(fragment.text(), "(col ILIKE '%' || ? || '%')");
        assert_eq!(fragment.params(), &[Param::from("mint")]);

        let fragment = compile("starts with", ValueType::String, text("mi")).unwrap();
        assert_eq!(fragment.text(), "(col ILIKE ? || '%')");

        let fragment = compile("is not", ValueType::String, text("mint")).unwrap();
        assert_eq!(fragment.text(), "(col <> ?)");
    }

    #[test]
    fn test_string_is_blank_matches_null() {
        let fragment = compile("is", ValueType::String, text("")).unwrap();
        assert_eq!(fragment.text(), "(col = ? OR col IS NULL)");
        assert_eq!(fragment.params(), &[Param::from("")]);

        let fragment = compile("is", ValueType::String, text("mint")).unwrap();
        assert_eq!(fragment.text(), "(col = ?)");
    }

    #[test]
    fn test_more_than_words() {
        let fragment = compile("more than __ words", ValueType::StringLength, Value::Int(3)).unwrap();
        assert_eq!(fragment.text(), "(col ~ ?)");
        assert_eq!(fragment.params(), &[Param::from(r"(\S+\s+){3}\S+$")]);

        let fragment = compile("more than __ words", ValueType::StringLength, Value::Int(-2)).unwrap();
        assert_eq!(fragment.params(), &[Param::from(r"(\S+\s+){0}\S+$")]);
    }

    #[test]
    fn test_fewer_than_words() {
        let fragment = compile("fewer than __ words", ValueType::StringLength, Value::Float(4.9)).unwrap();
        assert_eq!(fragment.text(), "(col ~ ?)");
        assert_eq!(fragment.params(), &[Param::from(r"^(\S+\s+){0,3}\S*$")]);

        for words in [Value::Int(0), Value::Int(-1), Value::Float(0.5)] {
            let fragment = compile("fewer than __ words", ValueType::StringLength, words).unwrap();
            assert_eq!(fragment.text(), "(col IS NULL)");
            assert!(fragment.params().is_empty());
        }
    }

    #[test]
    fn test_relative_date() {
        let fragment = compile("within", ValueType::RelativeDate, Value::RelativeDate(RelativeDate::Today)).unwrap();
        assert_eq!(fragment.text(), "(col BETWEEN ?::timestamp AND ?::timestamp)");
        let (start, end) = RelativeDate::Today.interpret(now());
        assert_eq!(fragment.params(), &[Param::Timestamp(start), Param::Timestamp(end)]);

        let fragment =
            compile("outside of", ValueType::RelativeDate, Value::RelativeDate(RelativeDate::Today)).unwrap();
        assert_eq!(fragment.text(), "(col NOT BETWEEN ?::timestamp AND ?::timestamp)");
    }

    #[test]
    fn test_single_choice_has_no_default() {
        let op = Operator::new("is", ValueType::SingleChoice);
        let err = where_clause("col", &op, &Value::Bool(true), now()).unwrap_err();
        assert!(matches!(err, WinnowError::UnknownValueType(ValueType::SingleChoice)));
    }

    #[test]
    fn test_mismatched_values_and_operators() {
        assert!(matches!(
            compile(">=", ValueType::Numeric, text("2")),
            Err(WinnowError::InvalidValue { value_type: ValueType::Numeric, .. })
        ));
        let odd = Operator::new("roughly", ValueType::Numeric);
        assert!(matches!(
            where_clause("col", &odd, &Value::Int(2), now()),
            Err(WinnowError::UnsupportedOperator(name)) if name == "roughly"
        ));
    }
}
