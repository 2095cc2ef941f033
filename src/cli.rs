//! CLI argument parsing and interactive input handling

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prefix that marks an interactive line as a command rather than query text
pub const COMMAND_PREFIX: char = ':';

#[derive(Debug, Parser)]
#[command(name = "cinesearch", version, about = "Incremental movie catalog search")]
pub struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog API key (overrides TMDB_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Search count database path (empty counts in memory)
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Read query edits from stdin, one per line, and print results as they settle
    Search {
        /// Quiescence window in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Report each successful search to analytics only once
        #[arg(long)]
        exactly_once: bool,
    },
    /// List popular movies
    Browse {
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show the most searched terms
    Trending {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

impl Cli {
    /// Subcommand to run; bare `cinesearch` means interactive search.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Search {
            debounce_ms: None,
            exactly_once: false,
        })
    }

    /// Apply global flags on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(key) = &self.api_key {
            config.api.api_key = Some(key.clone());
        }
        if let Some(db) = &self.db {
            config.analytics.database_path = db.clone();
        }
        if let Command::Search {
            debounce_ms,
            exactly_once,
        } = self.command()
        {
            if let Some(ms) = debounce_ms {
                config.search.debounce_ms = ms;
            }
            if exactly_once {
                config.search.analytics_trigger = crate::config::AnalyticsTrigger::ExactlyOnce;
            }
        }
    }
}

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// New query text, kept exactly as typed
    Query(String),
    Retry,
    Quit,
}

/// Parse an interactive line
///
/// # Examples
/// ```
/// use cinesearch::cli::{parse_input_line, InputLine};
///
/// assert_eq!(parse_input_line("spider"), InputLine::Query("spider".to_string()));
/// assert_eq!(parse_input_line(":retry"), InputLine::Retry);
/// assert_eq!(parse_input_line(":q"), InputLine::Quit);
/// assert_eq!(parse_input_line("::literal"), InputLine::Query(":literal".to_string()));
/// ```
pub fn parse_input_line(line: &str) -> InputLine {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.strip_prefix(COMMAND_PREFIX) {
        Some(rest) if rest.starts_with(COMMAND_PREFIX) => InputLine::Query(rest.to_string()),
        Some("retry") | Some("r") => InputLine::Retry,
        Some("quit") | Some("q") => InputLine::Quit,
        _ => InputLine::Query(line.to_string()),
    }
}
