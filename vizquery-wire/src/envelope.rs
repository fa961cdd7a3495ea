//! The `tqx` envelope: a semicolon-separated `key:value` parameter bag
//! (spec §6).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonp,
    Csv,
    TsvExcel,
    Html,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}

impl OutputFormat {
    fn parse(s: &str) -> Option<OutputFormat> {
        match s {
            "json" => Some(OutputFormat::Json),
            "jsonp" => Some(OutputFormat::Jsonp),
            "csv" => Some(OutputFormat::Csv),
            "tsv-excel" => Some(OutputFormat::TsvExcel),
            "html" => Some(OutputFormat::Html),
            _ => None,
        }
    }
}

pub const DEFAULT_RESPONSE_HANDLER: &str = "google.visualization.Query.setResponse";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TqxParams {
    pub req_id: Option<String>,
    pub sig: Option<String>,
    pub out: OutputFormat,
    pub response_handler: Option<String>,
    pub out_file_name: Option<String>,
}

impl TqxParams {
    pub fn response_handler(&self) -> &str {
        self.response_handler
            .as_deref()
            .unwrap_or(DEFAULT_RESPONSE_HANDLER)
    }

    /// CSV output always downloads as `.csv`, overriding any other
    /// extension the caller supplied (spec §6).
    pub fn csv_file_name(&self) -> String {
        let base = self
            .out_file_name
            .as_deref()
            .unwrap_or("data")
            .trim_end_matches(".csv");
        format!("{base}.csv")
    }
}

/// Parses the `tqx` envelope. Unknown keys are ignored for forward
/// compatibility; a malformed `out` value falls back to the default.
pub fn parse_tqx(raw: &str) -> TqxParams {
    let mut params = TqxParams::default();
    for entry in raw.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        match key {
            "reqId" => params.req_id = Some(value.to_string()),
            "sig" => params.sig = Some(value.to_string()),
            "out" => {
                if let Some(out) = OutputFormat::parse(value) {
                    params.out = out;
                }
            }
            "responseHandler" => params.response_handler = Some(value.to_string()),
            "outFileName" => params.out_file_name = Some(value.to_string()),
            _ => {}
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_keys() {
        let p = parse_tqx("reqId:0;out:csv;outFileName:report");
        assert_eq!(p.req_id.as_deref(), Some("0"));
        assert_eq!(p.out, OutputFormat::Csv);
        assert_eq!(p.csv_file_name(), "report.csv");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let p = parse_tqx("reqId:1;futureKey:whatever;out:json");
        assert_eq!(p.req_id.as_deref(), Some("1"));
        assert_eq!(p.out, OutputFormat::Json);
    }

    #[test]
    fn default_output_is_json() {
        assert_eq!(parse_tqx("").out, OutputFormat::Json);
    }

    #[test]
    fn default_response_handler_is_the_google_visualization_one() {
        let p = parse_tqx("out:jsonp");
        assert_eq!(p.response_handler(), DEFAULT_RESPONSE_HANDLER);
    }

    #[test]
    fn csv_file_name_enforces_extension() {
        let mut p = TqxParams::default();
        p.out_file_name = Some("mydata.csv".to_string());
        assert_eq!(p.csv_file_name(), "mydata.csv");
        p.out_file_name = Some("mydata".to_string());
        assert_eq!(p.csv_file_name(), "mydata.csv");
    }
}
