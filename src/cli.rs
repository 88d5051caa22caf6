// src/cli.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::Severity;

/// certsnare: Certificate Transparency log monitor
///
/// Polls public CT logs in near-real time, scores newly issued
/// certificates against keyword profiles, and stores suspicious domains
/// in a local SQLite database for querying and enrichment.
#[derive(Parser, Debug)]
#[command(name = "certsnare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path override
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start live CT log monitoring
    ///
    /// Polls the configured CT logs, scores new certificates against the
    /// selected keyword profile, and stores hits. By default an
    /// interactive live feed is shown; use --headless for servers and
    /// background processes.
    Watch(WatchArgs),

    /// Search and filter stored hits
    ///
    /// All flags are optional and composable; unset flags match
    /// everything. Results are sorted by score descending by default.
    Query(QueryArgs),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommand),

    /// List and inspect keyword profiles
    ///
    /// Built-in profiles: crypto, phishing, all. Custom profiles are
    /// loaded from the config file.
    Profiles {
        #[command(subcommand)]
        command: Option<ProfilesCommand>,
    },
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Keyword profile for scoring (built-ins: crypto, phishing, all)
    #[arg(long)]
    pub profile: Option<String>,

    /// Tag grouping hits from this run, queryable later with --session
    #[arg(long, default_value = "")]
    pub session: String,

    /// Run without the live feed: poll and store only
    #[arg(long)]
    pub headless: bool,

    /// CT log entries to fetch per poll (default from config: 256)
    #[arg(long, default_value_t = 0)]
    pub batch_size: i64,

    /// Wait between polls per log, e.g. "5s", "1m" (default from config: 5s)
    #[arg(long, value_parser = parse_duration_arg)]
    pub poll_interval: Option<Duration>,

    /// Start N entries behind the log tip for immediate results
    #[arg(long, default_value_t = 0)]
    pub backtrack: i64,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Substring match against matched keywords
    #[arg(long, default_value = "")]
    pub keyword: String,

    /// Minimum score (HIGH=6+, MED=4-5, LOW=1-3)
    #[arg(long, default_value_t = 0)]
    pub score_min: i64,

    /// Only hits from within this duration, e.g. "1h", "24h"
    #[arg(long, value_parser = parse_duration_arg)]
    pub since: Option<Duration>,

    /// Filter by TLD suffix, e.g. ".xyz" or "xyz"
    #[arg(long, default_value = "")]
    pub tld: String,

    /// Filter by session tag set with 'certsnare watch --session'
    #[arg(long, default_value = "")]
    pub session: String,

    /// Filter by severity: HIGH, MED, or LOW
    #[arg(long)]
    pub severity: Option<Severity>,

    /// Only bookmarked hits
    #[arg(long)]
    pub bookmarked: bool,

    /// Only domains that answered an HTTP probe
    #[arg(long)]
    pub live: bool,

    /// Sort column: domain, score, severity, session, created_at,
    /// updated_at, ct_log, or profile
    #[arg(long, default_value = "score")]
    pub sort_by: String,

    /// Sort direction: ASC or DESC
    #[arg(long, default_value = "DESC")]
    pub sort_dir: String,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: QueryFormat,

    /// Maximum number of results
    #[arg(long, default_value_t = 50)]
    pub limit: i64,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Show database statistics
    Stats,

    /// Clear stored hits (requires --confirm)
    Clear {
        /// Only clear hits tagged with this session name
        #[arg(long)]
        session: Option<String>,

        /// Required: confirm deletion
        #[arg(long)]
        confirm: bool,
    },

    /// Export hits to JSONL or CSV
    Export {
        /// Export format
        #[arg(long, value_enum, default_value = "jsonl")]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the database file path
    Path,
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    /// Show full details of a keyword profile
    Show { name: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFormat {
    Table,
    Json,
    Csv,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Jsonl,
    Csv,
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    crate::config::parse_duration(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::parse_from(["certsnare", "watch"]);
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.profile, None);
                assert_eq!(args.session, "");
                assert!(!args.headless);
                assert_eq!(args.batch_size, 0);
                assert_eq!(args.poll_interval, None);
                assert_eq!(args.backtrack, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_watch_flags() {
        let cli = Cli::parse_from([
            "certsnare", "watch",
            "--profile", "crypto",
            "--session", "morning-run",
            "--headless",
            "--batch-size", "128",
            "--poll-interval", "10s",
            "--backtrack", "5000",
        ]);
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.profile.as_deref(), Some("crypto"));
                assert_eq!(args.session, "morning-run");
                assert!(args.headless);
                assert_eq!(args.batch_size, 128);
                assert_eq!(args.poll_interval, Some(Duration::from_secs(10)));
                assert_eq!(args.backtrack, 5000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_query_filter_flags() {
        let cli = Cli::parse_from([
            "certsnare", "query",
            "--keyword", "wallet",
            "--severity", "HIGH",
            "--since", "24h",
            "--format", "json",
            "--limit", "10",
            "--live",
        ]);
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.keyword, "wallet");
                assert_eq!(args.severity, Some(Severity::High));
                assert_eq!(args.since, Some(Duration::from_secs(86400)));
                assert_eq!(args.format, QueryFormat::Json);
                assert_eq!(args.limit, 10);
                assert!(args.live);
                assert!(!args.bookmarked);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_severity_rejected() {
        let result = Cli::try_parse_from(["certsnare", "query", "--severity", "EXTREME"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_db_clear_flags() {
        let cli = Cli::parse_from(["certsnare", "db", "clear", "--session", "run1", "--confirm"]);
        match cli.command {
            Command::Db(DbCommand::Clear { session, confirm }) => {
                assert_eq!(session.as_deref(), Some("run1"));
                assert!(confirm);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_profiles_show() {
        let cli = Cli::parse_from(["certsnare", "profiles", "show", "crypto"]);
        match cli.command {
            Command::Profiles { command: Some(ProfilesCommand::Show { name }) } => {
                assert_eq!(name, "crypto");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["certsnare", "db", "path", "--db", "/tmp/x.db", "--verbose"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(cli.verbose);
    }
}
