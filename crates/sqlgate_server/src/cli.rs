use clap::Parser;

/// A network gateway exposing SQLite and DuckDB databases over HTTP as
/// transactional JSON endpoints.
#[derive(Debug, Parser)]
#[command(name = "sqlgate", version)]
pub struct Cli {
    /// Path to a YAML config file for one database. Repeatable.
    #[arg(long = "db")]
    pub db: Vec<String>,

    /// Open a SQLite file directly with defaults; mutually exclusive with --db.
    #[arg(long = "quick-db")]
    pub quick_db: Option<String>,

    /// Serve static files from this directory alongside the API.
    #[arg(long = "serve-dir")]
    pub serve_dir: Option<String>,

    /// Host to bind the HTTP server to.
    #[arg(long = "bind-host", default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Port to bind the HTTP server to.
    #[arg(long = "port", default_value_t = 12321)]
    pub port: u16,

    /// Increase log verbosity; repeatable (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if !self.db.is_empty() && self.quick_db.is_some() {
            return Err("--db and --quick-db are mutually exclusive".into());
        }
        if self.db.is_empty() && self.quick_db.is_none() && self.serve_dir.is_none() {
            return Err("specify at least one --db, --quick-db, or --serve-dir".into());
        }
        Ok(())
    }
}
