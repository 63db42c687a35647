//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use quire_core::ResolveFrom;

/// quire - Process markdown files and check their links
#[derive(Parser, Debug, Clone)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files, folders and globs to process; reads stdin when empty
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// Write processed files to PATH, or over the input files without PATH
    #[arg(short, long, num_args = 0..=1, value_name = "PATH")]
    pub output: Option<Option<PathBuf>>,

    /// Use this configuration file instead of searching for one
    #[arg(short, long, value_name = "PATH")]
    pub rc_path: Option<PathBuf>,

    /// Use this ignore file instead of searching for one
    #[arg(short, long, value_name = "PATH")]
    pub ignore_path: Option<PathBuf>,

    /// Resolve patterns in `--ignore-path` from its folder or the working directory
    #[arg(long, value_enum, default_value_t = ResolveFromArg::Dir)]
    pub ignore_path_resolve_from: ResolveFromArg,

    /// Extra ignore patterns, comma separated
    #[arg(long, value_delimiter = ',', value_name = "GLOBS")]
    pub ignore_pattern: Vec<String>,

    /// Processor setting, such as `bullet="*"`
    #[arg(short, long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Plugin to use, with optional JSON options: `validate-links={"repository":false}`
    #[arg(short = 'u', long = "use", value_name = "PLUGIN")]
    pub plugins: Vec<String>,

    /// Extensions to search folders for, comma separated
    #[arg(short, long, value_delimiter = ',', value_name = "EXTENSIONS")]
    pub ext: Vec<String>,

    /// Do not search for configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Do not search for ignore files
    #[arg(long)]
    pub no_ignore: bool,

    /// Skip ignored files without a message, even when given
    #[arg(long)]
    pub silently_ignore: bool,

    /// Write the processed document to stdout
    #[arg(long, overrides_with = "no_stdout")]
    pub stdout: bool,

    /// Do not write the processed document to stdout
    #[arg(long, overrides_with = "stdout")]
    pub no_stdout: bool,

    /// Read and write JSON trees
    #[arg(short, long)]
    pub tree: bool,

    /// Read JSON trees
    #[arg(long)]
    pub tree_in: bool,

    /// Write JSON trees
    #[arg(long)]
    pub tree_out: bool,

    /// Write a readable dump of trees
    #[arg(long)]
    pub inspect: bool,

    /// Only report files with messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Only report fatal messages
    #[arg(short = 'S', long)]
    pub silent: bool,

    /// Exit with 1 on warnings too
    #[arg(short, long)]
    pub frail: bool,

    /// Color the report, defaults to on for terminals
    #[arg(long, overrides_with = "no_color")]
    pub color: bool,

    /// Do not color the report
    #[arg(long, overrides_with = "color")]
    pub no_color: bool,

    /// Path of the file read from stdin
    #[arg(long, value_name = "PATH")]
    pub file_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Process again when files change
    #[arg(short, long)]
    pub watch: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFromArg {
    Dir,
    Cwd,
}

impl From<ResolveFromArg> for ResolveFrom {
    fn from(value: ResolveFromArg) -> Self {
        match value {
            ResolveFromArg::Dir => ResolveFrom::Dir,
            ResolveFromArg::Cwd => ResolveFrom::Cwd,
        }
    }
}

impl Cli {
    /// `Some` only when one of `--stdout` or `--no-stdout` is passed.
    pub fn out(&self) -> Option<bool> {
        if self.stdout {
            Some(true)
        } else if self.no_stdout {
            Some(false)
        } else {
            None
        }
    }

    pub fn color(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            console::colors_enabled_stderr()
        }
    }
}
