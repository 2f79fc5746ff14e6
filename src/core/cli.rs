use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// All relative paths will be interpreted relative to this directory
    #[arg(long, global = true)]
    pub cwd: Option<String>,

    /// Path to the config file (default: nearest reach.toml up from cwd)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Logging level (overrides config). One of: trace, debug, info, warn, error
    #[arg(long = "log.level", global = true)]
    pub log_level: Option<String>,

    /// Logging color control: "on" to force colors, "off" to disable; omit for auto
    #[arg(long = "log.color", global = true)]
    pub log_color: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a workspace config file
    Init,

    /// Model and instrument source units, writing artifacts and counter maps
    Instrument(InstrumentArgs),

    /// Merge execution snapshots into a coverage dataset
    Merge(MergeArgs),

    /// Compute coverage ratios and audit signals from a dataset
    Report(ReportArgs),

    /// Print various information about configuration and models
    Print {
        #[command(subcommand)]
        command: PrintArgs,
    },
}

/// Arguments for the instrument command
#[derive(Parser, Debug)]
pub struct InstrumentArgs {
    /// Source files to instrument. Files only: the engine never walks
    /// directories or expands globs; hand it every unit explicitly.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,

    /// Directory for instrumented artifacts, counter maps, and models.
    /// Replaces config out_dir if provided.
    #[arg(long = "out-dir")]
    pub out_dir: Option<String>,

    /// Comma-separated control constructs that count as decision sites
    /// (if, loop, switch, short-circuit).
    /// Replaces config [branch].kinds if provided.
    #[arg(long = "branch-kinds")]
    pub branch_kinds: Option<String>,

    /// Maximum units processed in parallel.
    /// Replaces config concurrency if provided.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for the merge command
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Counter map file(s) written by instrument (repeatable)
    #[arg(long = "map", required = true)]
    pub maps: Vec<String>,

    /// Snapshot file(s) to fold in, in any order (repeatable)
    #[arg(long = "snapshot")]
    pub snapshots: Vec<String>,

    /// Existing dataset to resume merging into
    #[arg(long)]
    pub into: Option<String>,

    /// Where to write the merged dataset
    #[arg(long, default_value = "coverage-out/dataset.json")]
    pub out: String,
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Merged dataset file
    #[arg(long)]
    pub dataset: String,

    /// Model file(s) written by instrument (repeatable)
    #[arg(long = "model", required = true)]
    pub models: Vec<String>,

    /// Outcome records for the audit pass (json). Omit to skip the audit.
    #[arg(long)]
    pub outcomes: Option<String>,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Also write the machine-readable report here
    #[arg(long)]
    pub out: Option<String>,

    /// Minimum aggregate line coverage; below it the command exits non-zero.
    /// Replaces config [thresholds].line if provided.
    #[arg(long = "threshold.line")]
    pub threshold_line: Option<f64>,

    /// Minimum aggregate branch coverage; below it the command exits non-zero.
    /// Replaces config [thresholds].branch if provided.
    #[arg(long = "threshold.branch")]
    pub threshold_branch: Option<f64>,
}

/// Arguments for the print command
#[derive(Subcommand, Debug)]
pub enum PrintArgs {
    /// Print the effective global configuration
    Config(PrintConfigArgs),

    /// List the countable units of a model
    Units(PrintUnitsArgs),
}

/// Arguments for the print config subcommand
#[derive(Parser, Debug)]
pub struct PrintConfigArgs {
    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the print units subcommand
#[derive(Parser, Debug)]
pub struct PrintUnitsArgs {
    /// Model file written by instrument
    #[arg(long)]
    pub model: String,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}
