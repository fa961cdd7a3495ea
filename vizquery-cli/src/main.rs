use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use env_logger::Env;
use log::info;
use structopt::StructOpt;
use vizquery_server::providers::CsvProvider;
use vizquery_server::{DataProvider, ServerOptions};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "vizquery",
    about = "Serve a CSV file as a Google-Visualization-API (gviz) query endpoint."
)]
struct Opt {
    /// CSV file to serve as the query table
    #[structopt(long("csv"))]
    csv: Option<PathBuf>,
    /// Directory to scan for a single `*.csv` file to serve; an
    /// alternative to `--csv` for pointing at a known data drop
    #[structopt(long("dir"), short("d"))]
    directory: Option<PathBuf>,
    /// Port the server listens to
    #[structopt(short, long, default_value = "8080")]
    port: u16,
    /// Host address the server listens to
    #[structopt(long, default_value = "127.0.0.1")]
    host: String,
    /// Maximum number of rows returned per query
    #[structopt(long, default_value = "1000000")]
    max_rows: usize,
    /// Default locale used for number/date formatting when a request
    /// specifies none
    #[structopt(long, default_value = "en")]
    default_locale: String,
}

impl Opt {
    fn resolve_csv_path(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        if let Some(csv) = &self.csv {
            return Ok(csv.clone());
        }
        let directory = self
            .directory
            .as_ref()
            .ok_or("pass either --csv <file> or --dir <directory>")?;

        let mut found: Vec<PathBuf> = fs::read_dir(directory)
            .map_err(|e| format!("failed to read directory {}: {e}", directory.display()))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(OsStr::to_str)
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();

        match found.len() {
            0 => Err(format!("no *.csv file found in {}", directory.display()).into()),
            1 => Ok(found.remove(0)),
            n => Err(format!(
                "found {n} CSV files in {}; pass --csv <file> to pick one",
                directory.display()
            )
            .into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("vizquery_server=info,vizquery_cli=info")).init();

    let opt = Opt::from_args();
    let csv_path = opt.resolve_csv_path()?;

    let server_options = ServerOptions::new()
        .with_host(opt.host)
        .with_port(opt.port)
        .with_max_rows(opt.max_rows)
        .with_default_locale(opt.default_locale);

    let provider: Arc<dyn DataProvider> = Arc::new(
        CsvProvider::open(&csv_path)
            .map_err(|e| format!("failed to load {}: {e}", csv_path.display()))?,
    );
    info!("Loaded {} as the gviz query table", csv_path.display());

    vizquery_server::serve(provider, server_options)
        .await
        .map_err(|e| format!("failed to run server: {e}"))?;

    Ok(())
}
