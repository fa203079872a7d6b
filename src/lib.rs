pub mod catalog;
pub mod config;
pub mod craftable;
pub mod entry;
pub mod model;
pub mod overlay;
pub mod search;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::catalog::JsonCatalogProvider;
use crate::config::OverlayConfig;
use crate::craftable::SnapshotTracker;
use crate::entry::{ComparatorRegistry, ComparisonContext, EntryIdentity};
use crate::overlay::OverlayContext;
use crate::search::tokenizer::Token;
use crate::search::{Predicate, SearchFilter, tokenize};

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "CATALOG_OVERLAY_LOG";

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "catalog-overlay",
    version,
    about = "Search, tokenize and fingerprint a JSON item catalog"
)]
pub struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/catalog-overlay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print catalog entries matching a query
    Search {
        /// JSON catalog file (array of entries)
        #[arg(long)]
        catalog: PathBuf,

        /// Emit JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,

        /// Stop after this many matches
        #[arg(long)]
        limit: Option<usize>,

        /// Query text; several words are joined with spaces
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Show how a query is tokenized and compiled
    Tokens {
        #[arg(long)]
        json: bool,

        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Print the fingerprint of every catalog entry
    Fingerprint {
        #[arg(long)]
        catalog: PathBuf,

        /// Use exact instead of fuzzy comparison
        #[arg(long)]
        exact: bool,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

/// Installs the stderr log subscriber. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> Result<()> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search {
            catalog,
            json,
            limit,
            query,
        } => run_search(cli.config.as_deref(), &catalog, &query.join(" "), json, limit),
        Commands::Tokens { json, query } => {
            run_tokens(cli.config.as_deref(), &query.join(" "), json)
        }
        Commands::Fingerprint { catalog, exact } => {
            let ctx = if exact {
                ComparisonContext::Exact
            } else {
                ComparisonContext::Fuzzy
            };
            run_fingerprint(cli.config.as_deref(), &catalog, ctx)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "catalog-overlay", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<OverlayConfig> {
    let config = match path {
        Some(path) => OverlayConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OverlayConfig::load().context("loading config")?,
    };
    Ok(config)
}

fn open_overlay(config_path: Option<&Path>, catalog: &Path) -> Result<OverlayContext> {
    let config = load_config(config_path)?;
    let provider = JsonCatalogProvider::new(catalog);
    OverlayContext::new(
        Arc::new(ComparatorRegistry::with_builtins()),
        config,
        &provider,
        SnapshotTracker::idle(),
    )
    .with_context(|| format!("loading catalog {}", catalog.display()))
}

#[derive(Serialize)]
struct EntryRow<'a> {
    #[serde(rename = "type")]
    type_tag: &'a str,
    id: String,
    name: String,
    count: i64,
}

impl<'a> From<&'a EntryIdentity> for EntryRow<'a> {
    fn from(entry: &'a EntryIdentity) -> Self {
        Self {
            type_tag: entry.type_tag().as_str(),
            id: entry.value().id.to_string(),
            name: entry.value().display_text().into_owned(),
            count: entry.count(),
        }
    }
}

fn run_search(
    config_path: Option<&Path>,
    catalog: &Path,
    query: &str,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut overlay = open_overlay(config_path, catalog)?;
    tracing::info!(query = query, "search_start");
    overlay.set_query(query);

    let rows: Vec<EntryRow<'_>> = overlay
        .visible()
        .take(limit.unwrap_or(usize::MAX))
        .map(EntryRow::from)
        .collect();

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        for row in &rows {
            writeln!(out, "{}\t{}\t{}", row.id, row.name, row.count)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TokenRow<'a> {
    #[serde(flatten)]
    token: &'a Token,
    text: &'a str,
}

#[derive(Serialize)]
struct TokensReport<'a> {
    query: &'a str,
    tokens: Vec<TokenRow<'a>>,
    predicate: &'a Predicate,
}

fn run_tokens(config_path: Option<&Path>, query: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let tokens = tokenize(query);
    let filter = SearchFilter::from_tokens(query, &tokens, &config.search.grammar());

    let mut out = std::io::stdout().lock();
    if json {
        let report = TokensReport {
            query,
            tokens: tokens
                .iter()
                .map(|token| TokenRow {
                    token,
                    text: token.text(query),
                })
                .collect(),
            predicate: filter.predicate(),
        };
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for token in &tokens {
            writeln!(
                out,
                "{:?}\t{}..{}\t{:?}",
                token.kind,
                token.span.start,
                token.span.end,
                token.text(query)
            )?;
        }
        writeln!(out, "{:?}", filter.predicate())?;
    }
    Ok(())
}

fn run_fingerprint(config_path: Option<&Path>, catalog: &Path, ctx: ComparisonContext) -> Result<()> {
    let overlay = open_overlay(config_path, catalog)?;
    let mut out = std::io::stdout().lock();
    for entry in overlay.catalog().iter() {
        let fp = entry.fingerprint(overlay.registry(), ctx);
        writeln!(out, "{fp}\t{}\t{}", entry.type_tag(), entry.value().id)?;
    }
    Ok(())
}
