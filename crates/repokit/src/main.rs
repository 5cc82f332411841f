mod models;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repokit::cache::MemoryCache;
use repokit::config::{Config, ConfigCacheExpiryProvider};
use repokit::context::DbContext;
use repokit::repository::Repositories;
use repokit::storage::SqliteStore;
use repokit_core::specification::{
    field, Navigation, OrderOption, PagingOptions, QuerySpecification,
};
use repokit_core::storage::{CommandRepository, QueryRepository, SqlParameter};

use crate::models::{Category, Link};

/// repokit - Specification-driven repositories over SQLite
#[derive(Parser, Debug)]
#[command(name = "repokit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database path (defaults to SQLITE_PATH or repokit.db)
    #[arg(long, short)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Insert demo categories and one link per category
    Seed {
        /// Number of categories to create
        #[arg(long, default_value_t = 15)]
        count: u32,
    },

    /// List links with their category
    List {
        /// Only links whose category id is at least this value
        #[arg(long)]
        min_category: Option<u32>,

        /// Order by category id, highest first
        #[arg(long)]
        descending: bool,

        /// Zero-based page index
        #[arg(long)]
        page: Option<i64>,

        /// Page size
        #[arg(long)]
        size: Option<usize>,
    },

    /// Run a raw SQL query
    Raw {
        /// SQL text; rows live in `key` and the JSON `body` column
        sql: String,

        /// Named parameter as NAME=VALUE (VALUE parsed as JSON when possible)
        #[arg(long = "param", value_parser = parse_parameter)]
        params: Vec<SqlParameter>,
    },
}

fn parse_parameter(raw: &str) -> std::result::Result<SqlParameter, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok(SqlParameter::new(name, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repokit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let path = cli.database.unwrap_or_else(|| config.sqlite_path.clone());

    let store = SqliteStore::new(&path)
        .await
        .with_context(|| format!("failed to open {path}"))?;
    let repositories = Repositories::new(
        Arc::new(DbContext::new(Arc::new(store))),
        Arc::new(MemoryCache::new(config.cache_max_entries)),
        Arc::new(ConfigCacheExpiryProvider::new(&config)),
    );

    tracing::info!(database = %path, "Opened database");

    match cli.command {
        Commands::Seed { count } => seed(&repositories, count).await,
        Commands::List {
            min_category,
            descending,
            page,
            size,
        } => list(&repositories, min_category, descending, page, size).await,
        Commands::Raw { sql, params } => raw(&repositories, &sql, &params).await,
    }
}

async fn seed(repositories: &Repositories<SqliteStore, MemoryCache>, count: u32) -> Result<()> {
    let categories = repositories.command::<Category>();
    let links = repositories.command::<Link>();

    categories
        .add_range((1..=count).map(Category::new).collect())
        .await?;
    links
        .add_range(
            (1..=count)
                .map(|id| Link::new(id, format!("org {}", id % 3)))
                .collect(),
        )
        .await?;

    let written = links.save_changes().await?;
    tracing::info!(written, "Seeded database");
    Ok(())
}

async fn list(
    repositories: &Repositories<SqliteStore, MemoryCache>,
    min_category: Option<u32>,
    descending: bool,
    page: Option<i64>,
    size: Option<usize>,
) -> Result<()> {
    let order = if descending {
        OrderOption::desc("category_id")
    } else {
        OrderOption::asc("category_id")
    };
    let mut spec = QuerySpecification::<Link>::new()
        .apply_order_by([order])
        .apply_includes([Navigation::new("category")])
        .as_non_tracking();
    if let Some(min) = min_category {
        spec = spec.apply_filter(field("category_id").ge(min));
    }

    let defaults = PagingOptions::default();
    let paging = PagingOptions::new(
        page.unwrap_or(defaults.page_index),
        size.unwrap_or(defaults.page_size),
    );

    let result = repositories
        .cached_query::<Link>()
        .get_page(Some(&spec), Some(&paging))
        .await?;

    for link in &result.data {
        let category = link.category.as_ref().map_or("-", |c| c.name.as_str());
        println!(
            "{}\t{}\t{}\t{}",
            link.id, link.category_id, category, link.organization
        );
    }
    println!("{} of {} links", result.data.len(), result.total_items);
    Ok(())
}

async fn raw(
    repositories: &Repositories<SqliteStore, MemoryCache>,
    sql: &str,
    params: &[SqlParameter],
) -> Result<()> {
    let table = repositories.query::<Link>().get_raw(sql, params).await?;

    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(Value::to_string).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}
