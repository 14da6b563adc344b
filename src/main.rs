mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use url::Url;

use cli::{Cli, Commands};
use skatelist::catalog::{Catalog, Category};
use skatelist::config::SkateConfig;
use skatelist::server;
use skatelist::source::{load_catalog, CatalogSource, DirSource, HttpSource, LoadError};
use skatelist::view::{ViewEvent, ViewState};

/// One recorded input for `replay`.
#[derive(Debug, Deserialize)]
struct ReplayStep {
    at_ms: u64,
    event: ViewEvent,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = SkateConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, root } => {
            if let Some(port) = port { config.server.port = port; }
            if let Some(root) = root { config.server.root = root; }
            server::serve(config).await?;
        }
        Commands::Check { root, url } => {
            let catalog = load(&config, root, url).await?;
            print_summary(&catalog);
        }
        Commands::Search { query, root, url } => {
            let catalog = load(&config, root, url).await?;
            let hits = catalog.search(&query);
            for category in Category::ALL {
                let videos = hits.get(category);
                if videos.is_empty() { continue; }
                println!("{} ({})", category.label(), videos.len());
                for v in videos {
                    println!("  {}{}", v.title, if v.has_video() { "" } else { "  [no video]" });
                }
            }
            if hits.is_empty() { println!("No tricks match '{}'", query.trim()); }
        }
        Commands::Replay { events, root, url } => {
            let steps = read_steps(&events)?;
            let source = make_source(&config, root, url)?;
            match load_catalog(source.as_ref(), &config.endpoints).await {
                Ok(catalog) => replay(config, catalog, steps)?,
                Err(e) => {
                    tracing::error!("{e}");
                    print_effects(0, &ViewState::failed(&config, &e))?;
                }
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn make_source(config: &SkateConfig, root: Option<PathBuf>, url: Option<Url>) -> Result<Box<dyn CatalogSource>> {
    Ok(match url {
        Some(url) => Box::new(HttpSource::new(url).context("building HTTP client")?),
        None => Box::new(DirSource::new(root.unwrap_or_else(|| config.server.root.clone()))),
    })
}

async fn load(config: &SkateConfig, root: Option<PathBuf>, url: Option<Url>) -> Result<Catalog> {
    let source = make_source(config, root, url)?;
    load_catalog(source.as_ref(), &config.endpoints).await.map_err(|e: LoadError| {
        tracing::error!("{e}");
        anyhow::Error::new(e)
    })
}

fn print_summary(catalog: &Catalog) {
    let nav = catalog.navigation();
    println!("{}", nav.done_title());
    println!("{}", nav.todo_title());
    let mode = if catalog.has_dedicated_lists() { "dedicated lists" } else { "single file" };
    println!("Categories ({mode}):");
    let grids = catalog.categorize();
    for category in Category::ALL {
        let videos = grids.get(category);
        let playable = videos.iter().filter(|v| v.has_video()).count();
        println!("  {:<12} {:>4} ({} with video)", category.label(), videos.len(), playable);
    }
}

fn read_steps(path: &Path) -> Result<Vec<ReplayStep>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading events: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing events: {}", path.display()))
}

fn replay(config: SkateConfig, catalog: Catalog, steps: Vec<ReplayStep>) -> Result<()> {
    let (mut state, initial) = ViewState::new(config, catalog);
    print_effects(0, &initial)?;
    for step in steps {
        let effects = state.handle(step.event, step.at_ms);
        print_effects(step.at_ms, &effects)?;
    }
    Ok(())
}

fn print_effects<T: serde::Serialize>(at_ms: u64, effects: &[T]) -> Result<()> {
    if effects.is_empty() { return Ok(()); }
    println!("{}", serde_json::to_string(&json!({"at_ms": at_ms, "effects": effects}))?);
    Ok(())
}
