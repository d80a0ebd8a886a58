use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "repoflat",
    about = "Flatten a source tree into a browsable HTML document and an LLM-ready corpus.",
    long_about = "Flatten a source tree (a local directory or a git URL) into a single \
self-contained HTML document for humans and a flat tagged corpus for LLM consumption."
)]
pub struct Cli {
    /// Local directory or git URL to flatten.
    #[arg(value_name = "SOURCE")]
    pub source: String,

    #[arg(
        short = 'o',
        long,
        help = "Output file path (default: a temp path derived from the source name).",
        value_name = "PATH",
        help_heading = "Output"
    )]
    pub out: Option<PathBuf>,

    #[arg(
        short = 'l',
        long,
        help = "Write only the flat corpus (plain text), no HTML document.",
        help_heading = "Output"
    )]
    pub llm: bool,

    #[arg(
        long,
        help = "Do not open the resulting document in a browser.",
        help_heading = "Output"
    )]
    pub no_open: bool,

    #[arg(
        long,
        help = "Maximum file size in bytes to render; larger files are listed but skipped.",
        value_name = "BYTES",
        help_heading = "Selection"
    )]
    pub max_bytes: Option<u64>,

    #[arg(
        short = 'e',
        long = "exclude",
        help = "Glob pattern to exclude, relative to the root (repeatable).",
        value_name = "GLOB",
        help_heading = "Selection"
    )]
    pub exclude: Vec<String>,

    #[arg(
        long,
        help = "Follow symbolic links while walking.",
        help_heading = "Selection"
    )]
    pub follow_symlinks: bool,

    #[arg(
        long,
        help = "Ignore .gitignore / .ignore files while walking.",
        help_heading = "Selection"
    )]
    pub no_gitignore: bool,

    #[arg(
        short = 'm',
        long,
        help = "Minify corpus content (strip comments and insignificant whitespace).",
        help_heading = "Output"
    )]
    pub minify: bool,

    #[arg(
        short = 'c',
        long,
        help = "Path to a TOML config file (default: <root>/repoflat.toml if present).",
        value_name = "FILE",
        help_heading = "Project Setup"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v, -vv, -vvv).",
        help_heading = "Logging"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Suppress all non-error output.",
        help_heading = "Logging"
    )]
    pub quiet: bool,
}
