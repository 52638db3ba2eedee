//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DSA Mentor - code review that remembers your mistakes
#[derive(Parser, Debug)]
#[command(name = "dsa-mentor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "MENTOR_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Model used for diagnosis and feedback
    #[arg(short, long, env = "MENTOR_MODEL", global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Review a solution and get mentor feedback
    Review {
        /// Problem title, e.g. "Two Sum"
        #[arg(short, long)]
        title: String,

        /// Language of the solution
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Code to review (reads stdin if neither --code nor --file is given)
        #[arg(short, long, conflicts_with = "file")]
        code: Option<String>,

        /// File containing the code to review
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Load the expert solution dataset into the index
    LoadExperts {
        /// Dataset path (default: MENTOR_DATASET or the state data dir)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },

    /// Inspect the mistake memory log
    Memories {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Replay commits left unfinished by a crash
    Recover,

    /// Show storage paths
    Paths,
}

/// Memory log subcommands.
#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// List remembered mistakes
    List {
        /// Maximum number of memories to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one memory in full
    Show {
        /// Memory ID
        id: String,
    },

    /// Search by title or error pattern
    Search {
        /// Title substring to match
        #[arg(long, default_value = "")]
        title: String,

        /// Error patterns to match (repeatable)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,
    },
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_review() {
        let cli = Cli::parse_from(["dsa-mentor", "review", "--title", "Two Sum", "--code", "pass"]);
        match cli.command {
            Commands::Review {
                title,
                language,
                code,
                file,
            } => {
                assert_eq!(title, "Two Sum");
                assert_eq!(language, "python");
                assert_eq!(code.as_deref(), Some("pass"));
                assert!(file.is_none());
            }
            _ => panic!("Expected Review command"),
        }
    }

    #[test]
    fn test_cli_review_code_and_file_conflict() {
        let result = Cli::try_parse_from([
            "dsa-mentor", "review", "-t", "Two Sum", "--code", "pass", "--file", "a.py",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_memory_search() {
        let cli = Cli::parse_from([
            "dsa-mentor", "memories", "search", "-p", "edge-case", "-p", "logic-gap",
        ]);
        match cli.command {
            Commands::Memories {
                command: MemoryCommands::Search { title, patterns },
            } => {
                assert!(title.is_empty());
                assert_eq!(patterns, vec!["edge-case", "logic-gap"]);
            }
            _ => panic!("Expected memories search"),
        }
    }

    #[test]
    fn test_cli_verbose() {
        let cli = Cli::parse_from(["dsa-mentor", "-vv", "recover"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}
