//! HTML rendering of a `Table` (spec §6): a `<table>` with `<thead>` of
//! labels and `<tbody>` of formatted values.

use vizquery_core::Table;

use crate::display::cell_display;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_html(table: &Table) -> String {
    let mut out = String::from("<table>\n  <thead>\n    <tr>");
    for col in table.columns() {
        out.push_str(&format!("<th>{}</th>", escape(&col.label)));
    }
    out.push_str("</tr>\n  </thead>\n  <tbody>\n");
    for row in table.rows() {
        out.push_str("    <tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", escape(&cell_display(cell))));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("  </tbody>\n</table>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::{Cell, ColumnDescription, Value, ValueType};

    #[test]
    fn renders_header_and_body_rows() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text).with_label("Name"));
        t.add_row(vec![Cell::new(Value::text("Sloth"))]).unwrap();
        let html = render_html(&t);
        assert!(html.contains("<th>Name</th>"));
        assert!(html.contains("<td>Sloth</td>"));
    }

    #[test]
    fn escapes_html_special_characters() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_row(vec![Cell::new(Value::text("<b>&"))]).unwrap();
        let html = render_html(&t);
        assert!(html.contains("&lt;b&gt;&amp;"));
    }

    #[test]
    fn prefers_formatted_value_when_present() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_row(vec![Cell::new(Value::number(100.0)).with_formatted("$100k")])
            .unwrap();
        let html = render_html(&t);
        assert!(html.contains("<td>$100k</td>"));
    }
}
