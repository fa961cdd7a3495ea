//! Response signature (spec §6, §8): a stable hash over column
//! descriptions, row values (raw and formatted) and table properties,
//! rendered as a decimal string for the `tqx` envelope's `sig` field and
//! the `not_modified` short-circuit.

use std::hash::{Hash, Hasher};

use crate::table::Table;

fn hash_custom_properties<H: Hasher>(props: &crate::table::CustomProperties, hasher: &mut H) {
    // `CustomProperties` is a `BTreeMap`, so iteration order is already
    // deterministic — no need to sort before hashing.
    for (k, v) in props {
        k.hash(hasher);
        v.hash(hasher);
    }
}

/// Computes the signature of `table`. Two tables with the same columns,
/// rows (including formatted values) and properties always produce the
/// same signature; any difference in those changes it (spec §8).
pub fn compute_signature(table: &Table) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();

    table.locale().tag().hash(&mut hasher);

    for col in table.columns() {
        col.id.hash(&mut hasher);
        col.value_type.hash(&mut hasher);
        col.label.hash(&mut hasher);
        col.pattern.hash(&mut hasher);
        hash_custom_properties(&col.custom_properties, &mut hasher);
    }

    for row in table.rows() {
        for cell in row {
            hasher.write_u64(cell.value.hash_value());
            cell.formatted_value.hash(&mut hasher);
            hash_custom_properties(&cell.custom_properties, &mut hasher);
        }
    }

    hash_custom_properties(table.properties(), &mut hasher);

    hasher.finish().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, ColumnDescription};
    use crate::value::{Value, ValueType};

    fn base_table() -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_row(vec![Cell::new(Value::number(10.0))]).unwrap();
        t
    }

    #[test]
    fn identical_tables_have_identical_signatures() {
        assert_eq!(compute_signature(&base_table()), compute_signature(&base_table()));
    }

    #[test]
    fn adding_a_row_changes_the_signature() {
        let mut t = base_table();
        let before = compute_signature(&t);
        t.add_row(vec![Cell::new(Value::number(20.0))]).unwrap();
        assert_ne!(before, compute_signature(&t));
    }

    #[test]
    fn changing_only_formatted_value_changes_the_signature() {
        let mut t = base_table();
        let before = compute_signature(&t);
        let mut rows = t.rows().to_vec();
        rows[0][0].formatted_value = Some("10".to_string());
        let mut rebuilt = Table::new();
        rebuilt.add_column(ColumnDescription::new("population", ValueType::Number));
        for r in rows {
            rebuilt.add_row(r).unwrap();
        }
        assert_ne!(before, compute_signature(&rebuilt));
    }
}
