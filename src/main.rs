//! cinesearch - incremental movie catalog search
//!
//! Command-line usage:
//!   cinesearch [search]        - Type queries line by line, results print as they settle
//!   cinesearch browse          - Popular movies
//!   cinesearch trending        - Most searched terms

use anyhow::{Context, Result};
use cinesearch::analytics::{open_store, SearchAnalytics};
use cinesearch::cli::{parse_input_line, Cli, Command, InputLine};
use cinesearch::config::AppConfig;
use cinesearch::fetch::{FetchController, FetchOptions};
use cinesearch::search::view::format_movie;
use cinesearch::search::{DebouncedSearchController, MovieFetchState, SearchView};
use cinesearch::services::{QueryClient, TmdbClient};
use cinesearch::types::SearchResults;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    match cli.command() {
        Command::Search { .. } => run_search(&config).await,
        Command::Browse { page } => run_browse(&config, page).await,
        Command::Trending { limit } => run_trending(&config, limit).await,
    }
}

fn open_analytics(config: &AppConfig) -> Result<Arc<dyn SearchAnalytics>> {
    open_store(&config.analytics)
        .with_context(|| format!("Failed to open {}", config.analytics.database_path))
}

/// Interactive search screen driven by stdin.
async fn run_search(config: &AppConfig) -> Result<()> {
    let client: Arc<dyn QueryClient> = Arc::new(TmdbClient::new(&config.api)?);
    let analytics = open_analytics(config)?;

    let mut search = DebouncedSearchController::new(client, analytics, config.search.clone());
    let printer = tokio::spawn(print_views(search.subscribe(), search.subscribe_query()));

    println!("{}", SearchView::from_state("", &search.snapshot()).render_lines().join("\n"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse_input_line(&line) {
            InputLine::Query(text) => search.set_query(text),
            InputLine::Retry => {
                if !search.retry() {
                    log::info!("Nothing to retry");
                }
            }
            InputLine::Quit => break,
        }
    }

    search.shutdown();
    printer.abort();
    Ok(())
}

/// Print the view every time the fetch state changes.
async fn print_views(mut state: watch::Receiver<MovieFetchState>, query: watch::Receiver<String>) {
    while state.changed().await.is_ok() {
        let view = {
            let snapshot = state.borrow_and_update();
            SearchView::from_state(&query.borrow(), &snapshot)
        };
        println!("---");
        for line in view.render_lines() {
            println!("{}", line);
        }
    }
}

async fn run_browse(config: &AppConfig, page: Option<u32>) -> Result<()> {
    let client: Arc<dyn QueryClient> = Arc::new(TmdbClient::new(&config.api)?);
    let fetch = FetchController::new(
        move || {
            let client = Arc::clone(&client);
            async move {
                client
                    .fetch_movies("", page)
                    .await
                    .map(|movies| SearchResults::new("", movies))
            }
        },
        FetchOptions { auto_run: true },
    );

    let mut state = fetch.subscribe();
    let settled = state
        .wait_for(|s| !s.loading)
        .await
        .context("Fetch controller dropped")?
        .clone();

    if let Some(err) = settled.error {
        anyhow::bail!("Error : {}", err);
    }
    for movie in settled.data.map(|results| results.movies).unwrap_or_default() {
        println!("{}", format_movie(&movie));
    }
    Ok(())
}

async fn run_trending(config: &AppConfig, limit: usize) -> Result<()> {
    let store = open_analytics(config)?;
    let entries = store.trending(limit).await.context("Failed to load trending searches")?;

    if entries.is_empty() {
        println!("No searches recorded yet");
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!("{:>2}. {} ({}) - {}", rank + 1, entry.search_term, entry.count, entry.title);
    }
    Ok(())
}
