//! Recursive-descent parser for the vizquery query-string grammar
//! (spec §4.8): turns a query string into a `vizquery_core::Query`.

mod lexer;
mod parser;

pub use lexer::{tokenize, Token};
pub use parser::parse;

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::{AbstractColumn, AggregationOp, CompareOp, Filter, ScalarFunction, SortDirection};

    #[test]
    fn empty_query_parses_to_default() {
        let q = parse("").unwrap();
        assert!(q.is_empty());
    }

    #[test]
    fn select_simple_columns() {
        let q = parse("SELECT name, population").unwrap();
        assert_eq!(
            q.selection.unwrap(),
            vec![AbstractColumn::simple("name"), AbstractColumn::simple("population")]
        );
    }

    #[test]
    fn select_with_aggregation_and_group_by() {
        let q = parse("SELECT name, sum(population) GROUP BY name").unwrap();
        let sel = q.selection.unwrap();
        assert_eq!(sel[0], AbstractColumn::simple("name"));
        assert_eq!(
            sel[1],
            AbstractColumn::aggregation(AbstractColumn::simple("population"), AggregationOp::Sum)
        );
        assert_eq!(q.group, vec![AbstractColumn::simple("name")]);
    }

    #[test]
    fn where_clause_builds_column_value_filter() {
        let q = parse("SELECT name WHERE population > 1000").unwrap();
        match q.filter.unwrap() {
            Filter::ColumnValue { column, op, .. } => {
                assert_eq!(column, AbstractColumn::simple("population"));
                assert_eq!(op, CompareOp::Gt);
            }
            other => panic!("expected ColumnValue filter, got {other:?}"),
        }
    }

    #[test]
    fn and_or_not_compose_with_expected_precedence() {
        let q = parse("SELECT name WHERE a = 1 AND b = 2 OR NOT c = 3").unwrap();
        match q.filter.unwrap() {
            Filter::Compound { op, children } => {
                assert_eq!(op, vizquery_core::BoolOp::Or);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected top-level OR, got {other:?}"),
        }
    }

    #[test]
    fn order_by_with_direction_and_limit_offset() {
        let q = parse("SELECT name ORDER BY name DESC LIMIT 5 OFFSET 10").unwrap();
        assert_eq!(q.sort.len(), 1);
        assert_eq!(q.sort[0].direction, SortDirection::Desc);
        assert_eq!(q.row_limit, Some(5));
        assert_eq!(q.row_offset, Some(10));
    }

    #[test]
    fn label_and_format_clauses_key_by_column_id() {
        let q = parse("SELECT population LABEL population 'Pop' FORMAT population '#,##0'").unwrap();
        assert_eq!(q.labels.get("population").unwrap(), "Pop");
        assert_eq!(q.user_format_options.get("population").unwrap(), "#,##0");
    }

    #[test]
    fn options_clause_sets_flags() {
        let q = parse("SELECT name OPTIONS no_format, no_values").unwrap();
        assert!(q.options.no_format);
        assert!(q.options.no_values);
    }

    #[test]
    fn infix_arithmetic_builds_scalar_function_call() {
        let q = parse("SELECT a - b").unwrap();
        match &q.selection.unwrap()[0] {
            AbstractColumn::ScalarFunctionCall { function, args } => {
                assert_eq!(*function, ScalarFunction::Difference);
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected a scalar function call, got {other:?}"),
        }
    }

    #[test]
    fn date_literal_parses_into_constant_column() {
        let q = parse("SELECT name WHERE d = date '2024-01-01'").unwrap();
        match q.filter.unwrap() {
            Filter::ColumnValue { value, .. } => {
                assert!(!value.is_null());
            }
            other => panic!("expected ColumnValue filter, got {other:?}"),
        }
    }

    #[test]
    fn unknown_trailing_token_is_a_parse_error() {
        assert!(parse("SELECT name HAVING x").is_err());
    }
}
