use clap::{Parser, Subcommand, ValueEnum};
use clap::builder::PossibleValuesParser;
use findcomplain_core::{Difficulty, PostLimit, COMPLAINT_CATEGORIES};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "findcomplain")]
#[command(about = "Mine Reddit complaints for business and app ideas", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/findcomplain/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend API base URL, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Plain, global = true)]
    pub format: OutputFormat,

    #[arg(long, value_parser = ["error", "warn", "info", "debug", "trace"], default_value = "warn", global = true)]
    pub log_level: String,

    /// Print request metrics after the command
    #[arg(long, global = true)]
    pub stats: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an analysis and follow it until it finishes
    Analyze {
        subreddit: String,

        /// Comma-separated keywords
        #[arg(long)]
        keywords: Option<String>,

        #[arg(long, value_parser = parse_post_limit, default_value = "50")]
        limit: PostLimit,

        /// Print the new session and return without polling
        #[arg(long)]
        detach: bool,
    },

    /// Show the status of an analysis session
    Status {
        session_id: i64,

        #[arg(long)]
        follow: bool,
    },

    Complaints {
        #[arg(long)]
        subreddit: Option<String>,

        #[arg(long, value_parser = PossibleValuesParser::new(COMPLAINT_CATEGORIES))]
        category: Option<String>,
    },

    Complaint {
        id: i64,

        #[arg(long)]
        delete: bool,
    },

    /// Subreddits that have analyzed complaints
    Subreddits,

    Ideas {
        #[arg(long, value_parser = parse_difficulty, conflicts_with = "top")]
        difficulty: Option<Difficulty>,

        #[arg(long, conflicts_with = "top")]
        limit: Option<u32>,

        #[arg(long)]
        top: bool,
    },

    Idea {
        id: i64,

        #[arg(long)]
        delete: bool,
    },

    AppIdeas {
        #[arg(long, conflicts_with = "bookmarked")]
        top: bool,

        #[arg(long)]
        bookmarked: bool,
    },

    /// Toggle the bookmark on an app idea
    Bookmark { id: i64 },

    /// Run app idea discovery across the target subreddits
    Discover,

    /// List or edit the subreddits scanned for app ideas
    Targets {
        #[arg(long, conflicts_with = "remove")]
        add: Option<String>,

        #[arg(long)]
        remove: Option<String>,
    },

    /// Extract app ideas from one subreddit right away
    Scan {
        subreddit: String,

        #[arg(long)]
        limit: Option<u32>,
    },

    Dashboard,
}

fn parse_post_limit(raw: &str) -> Result<PostLimit, String> {
    let value: u32 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    PostLimit::try_from(value).map_err(|e| e.to_string())
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, String> {
    raw.parse::<Difficulty>().map_err(|e| e.to_string())
}
