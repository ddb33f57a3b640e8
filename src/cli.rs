use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pnpm-cdx",
    about = "Generate license compliance reports for pnpm projects",
    version,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// The output format
    #[arg(value_enum, required = true)]
    pub format: Option<ReportFormat>,

    /// A package.json or directory to process
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// A file to write to, otherwise writes to stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Config file [default: ./.pnpm-cdx/config.toml, fallback ~/.config/pnpm-cdx/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory of SPDX license records (license-list-data json/details)
    #[arg(long, value_name = "DIR", global = true)]
    pub license_data: Option<PathBuf>,

    /// Maximum number of packages resolved at once
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the license dataset record for an SPDX identifier
    Info {
        /// The SPDX identifier of the license you want to view
        spdx: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// GitLab license report 2.1
    Gitlab,
    /// CycloneDX BOM (not implemented)
    Cyclonedx,
}
