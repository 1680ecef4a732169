use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use sitecache::config::Config;
use sitecache::site::{BlogFilters, ProjectFilters, ServiceFilters, SiteClient};
use sitecache::swr::{FromPayload, Swr};

#[derive(Parser, Debug)]
#[command(name = "sitecache")]
#[command(about = "Fetch content from the construction site API through the SWR cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./sitecache.yaml or $XDG_CONFIG_HOME/sitecache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL (overrides config and SITECACHE_API_URL)
  #[arg(long)]
  base_url: Option<String>,

  /// Don't read or write the on-disk cache
  #[arg(long)]
  no_persist: bool,

  /// Force a fresh request even if cached data is recent
  #[arg(long, global = true)]
  revalidate: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Blog posts
  Blogs {
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Projects
  Projects {
    #[arg(long)]
    featured: Option<bool>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Services
  Services {
    #[arg(long)]
    featured: Option<bool>,
  },
  /// Site settings
  Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Command line wins over config and environment
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }
  if args.no_persist {
    config.cache.persist = false;
  }

  let _log_guard = sitecache::logging::init(&config.log)?;
  info!(base_url = %config.api_base_url()?, "starting");

  let client = SiteClient::from_config(&config)?;
  let revalidate = args.revalidate;

  match args.command {
    Command::Blogs { status, limit } => {
      let filters = BlogFilters { status, limit };
      print_resource(client.blogs(filters), revalidate, |d| d).await
    }
    Command::Projects { featured, limit } => {
      let filters = ProjectFilters { featured, limit };
      print_resource(client.projects(filters), revalidate, |d| d).await
    }
    Command::Services { featured } => {
      let filters = ServiceFilters { featured };
      print_resource(client.services(filters), revalidate, |d| d).await
    }
    Command::Settings => {
      print_resource(client.settings(), revalidate, |d| d.value().clone()).await
    }
  }
}

/// Wait for the hook to settle and print its data as JSON.
///
/// Cached data behind a failed request is still printed; only a failure with
/// nothing to show is an error.
async fn print_resource<D, S, F>(mut handle: Swr<D>, revalidate: bool, view: F) -> Result<()>
where
  D: FromPayload,
  S: Serialize,
  F: FnOnce(D) -> S,
{
  let state = handle.resolve(revalidate).await;
  if let (Some(e), true) = (&state.error, state.has_data) {
    warn!(key = %handle.key(), "serving cached data: {}", e);
  }

  let data = state
    .into_result()
    .map_err(|e| eyre!("Failed to fetch {}: {}", handle.key(), e))?;

  let json = serde_json::to_string_pretty(&view(data))?;
  println!("{}", json);
  Ok(())
}
