// src/main.rs
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use certsnare::cli::{Cli, Command, DbCommand, ExportFormat, ProfilesCommand, QueryArgs, QueryFormat, WatchArgs};
use certsnare::config::Config;
use certsnare::domain::QueryFilter;
use certsnare::output;
use certsnare::profile;
use certsnare::storage::Db;
use certsnare::watch;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = Config::load(cli.config.as_deref()).context("loading config")?;
    cfg.merge_flags(cli.db.as_deref(), 0, None, 0);

    match cli.command {
        Command::Watch(args) => run_watch(cfg, args).await,
        Command::Query(args) => run_query(cfg, args).await,
        Command::Db(command) => run_db(cfg, command).await,
        Command::Profiles { command } => run_profiles(cfg, command),
    }
}

async fn run_watch(mut cfg: Config, args: WatchArgs) -> Result<()> {
    cfg.merge_flags(None, args.batch_size, args.poll_interval, args.backtrack);
    let profile_name = args
        .profile
        .unwrap_or_else(|| cfg.default_profile.clone());
    watch::run(cfg, &profile_name, &args.session, args.headless).await
}

async fn run_query(cfg: Config, args: QueryArgs) -> Result<()> {
    let store = open_existing_db(&cfg.db_path).await?;

    let filter = QueryFilter {
        keyword: args.keyword,
        score_min: args.score_min,
        severity: args.severity,
        since: args.since,
        tld: args.tld,
        session: args.session,
        bookmarked: args.bookmarked,
        live_only: args.live,
        sort_by: args.sort_by,
        sort_dir: args.sort_dir,
        limit: args.limit,
        offset: 0,
    };

    let hits = store.query_hits(&filter).await?;
    store.close().await;

    if hits.is_empty() {
        eprintln!("No hits found matching the given filters.");
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    match args.format {
        QueryFormat::Table => output::format_table(&hits, &mut stdout),
        QueryFormat::Json => output::format_jsonl(&hits, &mut stdout),
        QueryFormat::Csv => output::format_csv(&hits, &mut stdout),
    }
}

async fn run_db(cfg: Config, command: DbCommand) -> Result<()> {
    match command {
        DbCommand::Stats => {
            let store = open_existing_db(&cfg.db_path).await?;
            let stats = store.stats().await?;
            store.close().await;
            output::format_stats(&stats, &mut std::io::stdout().lock())
        }
        DbCommand::Clear { session, confirm } => {
            if !confirm {
                anyhow::bail!("use --confirm to confirm deletion");
            }
            let store = open_existing_db(&cfg.db_path).await?;
            match session {
                Some(session) => {
                    store.clear_session(&session).await?;
                    eprintln!("Cleared all hits for session {session:?}.");
                }
                None => {
                    store.clear_all().await?;
                    eprintln!("All hits cleared from database.");
                }
            }
            store.close().await;
            Ok(())
        }
        DbCommand::Export { format, output } => {
            let store = open_existing_db(&cfg.db_path).await?;
            let filter = QueryFilter::default();

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    std::fs::File::create(path)
                        .with_context(|| format!("creating output file {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout().lock()),
            };

            match format {
                ExportFormat::Jsonl => store.export_jsonl(&mut writer, &filter).await?,
                ExportFormat::Csv => store.export_csv(&mut writer, &filter).await?,
            }
            writer.flush().context("flushing export output")?;
            store.close().await;

            if let Some(path) = output {
                let format_name = match format {
                    ExportFormat::Jsonl => "jsonl",
                    ExportFormat::Csv => "csv",
                };
                eprintln!("Exported to {} ({} format).", path.display(), format_name);
            }
            Ok(())
        }
        DbCommand::Path => {
            println!("{}", cfg.db_path.display());
            Ok(())
        }
    }
}

fn run_profiles(cfg: Config, command: Option<ProfilesCommand>) -> Result<()> {
    let registry = profile::Manager::new(&cfg.custom_profiles, &cfg.skip_suffixes)?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Some(ProfilesCommand::Show { name }) => {
            let prof = registry.load_profile(&name)?;
            output::format_profile_detail(&prof, &mut stdout)
        }
        None => {
            let profiles: Vec<_> = registry
                .list_profiles()
                .iter()
                .filter_map(|name| registry.load_profile(name).ok())
                .collect();
            output::format_profile_list(&profiles, &mut stdout)
        }
    }
}

/// Open the database for read commands, failing with a friendly hint
/// when it does not exist yet.
async fn open_existing_db(path: &Path) -> Result<Arc<Db>> {
    if !path.exists() {
        anyhow::bail!(
            "database not found at {} -- run 'certsnare watch' first to start collecting hits",
            path.display()
        );
    }
    Ok(Arc::new(Db::open(path).await?))
}
