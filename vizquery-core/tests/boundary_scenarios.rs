//! End-to-end checks against the worked animal-table example used
//! throughout the boundary scenarios: four rows of
//! `name:TEXT, population:NUMBER, vegetarian:BOOLEAN`.

use std::collections::BTreeMap;

use vizquery_core::{
    compute_signature, execute, AbstractColumn, AggregationOp, Cell, ColumnDescription, CompareOp, Filter, Query,
    SortDirection, SortSpec, Table, Value, ValueType,
};

fn animals() -> Table {
    let mut t = Table::new();
    t.add_column(ColumnDescription::new("name", ValueType::Text));
    t.add_column(ColumnDescription::new("population", ValueType::Number));
    t.add_column(ColumnDescription::new("vegetarian", ValueType::Boolean));
    for (name, population, vegetarian) in [
        ("Aye-aye", 100.0, true),
        ("Sloth", 300.0, true),
        ("Leopard", 50.0, false),
        ("Tiger", 80.0, false),
    ] {
        t.add_row(vec![
            Cell::new(Value::text(name)),
            Cell::new(Value::number(population)),
            Cell::new(Value::boolean(vegetarian)),
        ])
        .unwrap();
    }
    t
}

#[test]
fn scenario_1_select_single_column() {
    let t = animals();
    let q = Query {
        selection: Some(vec![AbstractColumn::simple("population")]),
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    assert_eq!(out.columns().len(), 1);
    assert_eq!(out.row_count(), 4);
    assert_eq!(out.rows()[1][0].value, Value::number(300.0));
}

#[test]
fn scenario_2_select_with_filter() {
    let t = animals();
    let q = Query {
        selection: Some(vec![AbstractColumn::simple("name"), AbstractColumn::simple("vegetarian")]),
        filter: Some(Filter::ColumnValue {
            column: AbstractColumn::simple("population"),
            value: Value::number(100.0),
            op: CompareOp::Gt,
        }),
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    assert_eq!(out.columns().len(), 2);
    assert_eq!(out.row_count(), 1);
    assert_eq!(out.rows()[0][0].value, Value::text("Sloth"));
    assert_eq!(out.rows()[0][1].value, Value::boolean(true));
}

#[test]
fn scenario_3_group_by_with_sum() {
    let t = animals();
    let q = Query {
        selection: Some(vec![
            AbstractColumn::simple("vegetarian"),
            AbstractColumn::aggregation(AbstractColumn::simple("population"), AggregationOp::Sum),
        ]),
        group: vec![AbstractColumn::simple("vegetarian")],
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    assert_eq!(out.row_count(), 2);
    assert_eq!(out.rows()[0][0].value, Value::boolean(false));
    assert_eq!(out.rows()[0][1].value, Value::number(130.0));
    assert_eq!(out.rows()[1][0].value, Value::boolean(true));
    assert_eq!(out.rows()[1][1].value, Value::number(400.0));
}

#[test]
fn scenario_4_pivot() {
    let t = animals();
    let q = Query {
        selection: Some(vec![AbstractColumn::aggregation(
            AbstractColumn::simple("population"),
            AggregationOp::Sum,
        )]),
        pivot: vec![AbstractColumn::simple("vegetarian")],
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    assert_eq!(out.row_count(), 1);
    assert_eq!(out.columns().len(), 2);
    assert_eq!(out.columns()[0].label, "false");
    assert_eq!(out.columns()[1].label, "true");
    assert_eq!(out.rows()[0][0].value, Value::number(130.0));
    assert_eq!(out.rows()[0][1].value, Value::number(400.0));
}

#[test]
fn scenario_5_sort_by_population() {
    let t = animals();
    let q = Query {
        selection: Some(vec![AbstractColumn::simple("name")]),
        sort: vec![SortSpec {
            column: AbstractColumn::simple("population"),
            direction: SortDirection::Asc,
        }],
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    let names: Vec<&Value> = out.rows().iter().map(|r| &r[0].value).collect();
    assert_eq!(
        names,
        vec![
            &Value::text("Leopard"),
            &Value::text("Tiger"),
            &Value::text("Aye-aye"),
            &Value::text("Sloth"),
        ]
    );
}

#[test]
fn scenario_6_limit_and_offset() {
    let t = animals();
    let q = Query {
        row_offset: Some(1),
        row_limit: Some(1),
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    assert_eq!(out.row_count(), 1);
    assert_eq!(out.rows()[0][0].value, Value::text("Sloth"));
    assert_eq!(out.rows()[0][1].value, Value::number(300.0));
    assert_eq!(out.rows()[0][2].value, Value::boolean(true));
}

#[test]
fn scenario_7_label_and_format() {
    let t = animals();
    let mut labels = BTreeMap::new();
    labels.insert("population".to_string(), "Population size (thousands)".to_string());
    let mut formats = BTreeMap::new();
    formats.insert("population".to_string(), "'$'#'k'".to_string());
    let q = Query {
        labels,
        user_format_options: formats,
        ..Query::empty()
    };
    let out = execute(&q, &t).unwrap();
    let population_col = out.columns().iter().position(|c| c.id == "population").unwrap();
    assert_eq!(out.columns()[population_col].label, "Population size (thousands)");
    assert_eq!(out.rows()[0][population_col].formatted_value.as_deref(), Some("$100k"));
}

#[test]
fn signature_is_stable_across_runs_and_changes_on_row_or_format_change() {
    let t = animals();
    let sig_a = compute_signature(&t);
    let sig_b = compute_signature(&t);
    assert_eq!(sig_a, sig_b);

    let mut with_extra_row = t.clone();
    with_extra_row
        .add_row(vec![
            Cell::new(Value::text("Panda")),
            Cell::new(Value::number(120.0)),
            Cell::new(Value::boolean(true)),
        ])
        .unwrap();
    assert_ne!(sig_a, compute_signature(&with_extra_row));

    let mut with_formatted_cell = Table::new();
    for col in t.columns() {
        with_formatted_cell.add_column(col.clone());
    }
    for (i, row) in t.rows().iter().enumerate() {
        let mut row = row.clone();
        if i == 0 {
            row[1] = row[1].clone().with_formatted("$100k");
        }
        with_formatted_cell.add_row(row).unwrap();
    }
    assert_ne!(sig_a, compute_signature(&with_formatted_cell));
}
