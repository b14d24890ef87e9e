//! Command-line front end for the journal core.
//!
//! # Responsibility
//! - Smoke-test core linkage (`ping`, `version`).
//! - Print a viewer's feed or on-this-day page as JSON.

use clap::{Args, Parser, Subcommand, ValueEnum};
use kinjournal_core::{
    init_from_config, open_db, parse_time_zone, CoreConfig, FeedFilter, FeedRequest, MemoryCache,
    OnThisDayPeriod, ProgenyId, SortOrder, TimelineService, ViewerContext,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "kinjournal")]
#[command(about = "Family journal timeline queries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print `pong` from the core crate
    Ping,
    /// Print the core crate version
    Version,
    /// Print one page of the feed
    Feed(FeedArgs),
    /// Print entries that happened on this day in earlier periods
    OnThisDay {
        #[command(flatten)]
        feed: FeedArgs,

        #[arg(long, value_enum, default_value_t = Period::Year)]
        period: Period,
    },
}

#[derive(Args, Debug)]
struct FeedArgs {
    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for log files (overrides config)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Viewing user
    #[arg(long)]
    user: Uuid,

    /// IANA time zone of the viewer (defaults to the configured zone)
    #[arg(long)]
    tz: Option<String>,

    /// Progeny ids, comma separated (defaults to every granted progeny)
    #[arg(long, value_delimiter = ',')]
    progeny: Vec<ProgenyId>,

    #[arg(long, default_value = "")]
    tags: String,

    #[arg(long, default_value = "")]
    categories: String,

    #[arg(long, default_value = "")]
    contexts: String,

    #[arg(long, default_value = "")]
    keywords: String,

    /// Oldest entries first
    #[arg(long)]
    oldest: bool,

    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Page size; 0 uses the configured default
    #[arg(long, default_value_t = 0)]
    count: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

impl From<Period> for OnThisDayPeriod {
    fn from(period: Period) -> Self {
        match period {
            Period::Week => Self::Week,
            Period::Month => Self::Month,
            Period::Quarter => Self::Quarter,
            Period::Year => Self::Year,
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Ping => println!("kinjournal_core ping={}", kinjournal_core::ping()),
        Command::Version => println!("kinjournal_core version={}", kinjournal_core::core_version()),
        Command::Feed(args) => query(args, None)?,
        Command::OnThisDay { feed, period } => query(feed, Some(period.into()))?,
    }
    Ok(())
}

fn query(args: FeedArgs, period: Option<OnThisDayPeriod>) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir.clone();
    }
    init_from_config(&config)?;

    let db_path = args
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .ok_or("no database: pass --db or set database_path in the config")?;
    let time_zone = parse_time_zone(args.tz.as_deref().unwrap_or(&config.default_time_zone))?;

    let conn = open_db(&db_path)?;
    let cache = MemoryCache::from_settings(&config.cache);
    let viewer = ViewerContext::load(&conn, args.user, time_zone)?;
    let service = TimelineService::new(&conn, &cache).with_settings(config.feed);

    let request = FeedRequest {
        progeny_ids: viewer.progeny_or_all(args.progeny),
        filter: FeedFilter {
            tags: args.tags,
            categories: args.categories,
            contexts: args.contexts,
            keywords: args.keywords,
        },
        sort: if args.oldest {
            SortOrder::Oldest
        } else {
            SortOrder::Newest
        },
        skip: args.skip,
        count: args.count,
    };

    let page = match period {
        Some(period) => service.on_this_day(&viewer, &request, period)?,
        None => service.get_feed(&viewer, &request)?,
    };
    info!(
        "event=cli_query module=cli status=ok entries={} remaining={}",
        page.entries.len(),
        page.remaining_count
    );
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
