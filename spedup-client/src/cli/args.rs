//! Command-line arguments for the `spedup` binary

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for spedup
#[derive(Parser, Debug)]
#[command(name = "spedup")]
#[command(about = "Filter and upload SPED fiscal ledgers to the ingestion server")]
#[command(version)]
pub struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ingestion API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub server_url: Option<String>,

    /// Bearer token
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter, upload and import ledger files
    Upload(UploadArgs),

    /// Run the record filter locally without contacting the server
    Filter {
        /// Ledger file to filter
        input: PathBuf,

        /// Write the filtered payload here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List import jobs on the server
    Jobs,

    /// Request cancellation of an import job
    Cancel {
        /// Job identifier
        job_id: String,
    },

    /// Refresh the consolidated views on the server
    RefreshViews,
}

#[derive(ClapArgs, Debug)]
pub struct UploadArgs {
    /// Ledger files or directories containing .txt ledgers
    #[arg(required = true, value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Upload files even if the period was already imported
    #[arg(short, long)]
    pub yes: bool,

    /// Do not ask the server about previous imports
    #[arg(long)]
    pub skip_duplicate_check: bool,

    /// Return once all files are uploaded
    #[arg(long)]
    pub no_wait: bool,

    /// Do not refresh the consolidated views after the jobs finish
    #[arg(long)]
    pub no_consolidate: bool,

    /// Company the ledgers belong to
    #[arg(long, value_name = "ID")]
    pub company_id: Option<String>,
}
