use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "laisuat", about = "Vietnamese bank deposit-rate scraper")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape the configured banks once and emit the results as JSON
    Scrape {
        /// Run extractors concurrently (browser banks bounded by the page pool)
        #[arg(short, long)]
        parallel: bool,

        /// Only scrape one bank, by code (e.g. "vcb")
        #[arg(short, long)]
        bank: Option<String>,

        /// Write the JSON report to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the configured banks, their channels and source URLs
    Banks,
}
