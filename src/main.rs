use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use iptv_catalog::config::Config;
use iptv_catalog::{ChannelGroupList, FileCache, IptvRepository};

/// Get the home directory (from $HOME)
fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home))
}

/// Get the config file path (~/.config/iptv-catalog/config.toml)
fn default_config_path() -> Result<PathBuf> {
    Ok(home_dir()?
        .join(".config")
        .join("iptv-catalog")
        .join("config.toml"))
}

/// Get the cache directory path (~/.cache/iptv-catalog/)
fn default_cache_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".cache").join("iptv-catalog"))
}

#[derive(Parser, Debug)]
#[command(
    name = "iptv-catalog",
    about = "Fetch, cache, and list the channels of an IPTV source"
)]
struct Args {
    /// IPTV source URL (overrides source_url from the config file)
    #[arg(long, value_name = "URL")]
    source: Option<String>,

    /// Maximum age of the cached source in seconds (0 = always refetch)
    #[arg(long, value_name = "SECS")]
    cache_time: Option<u64>,

    /// Keep only CCTV and satellite channels
    #[arg(long)]
    simplify: bool,

    /// Print the catalog as JSON
    #[arg(long)]
    json: bool,

    /// Delete the cached source text and exit
    #[arg(long)]
    clear_cache: bool,

    /// Alternate config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn print_listing(out: &mut impl Write, groups: &ChannelGroupList) -> std::io::Result<()> {
    for group in groups {
        writeln!(out, "{} ({} channels)", group.name, group.channels.len())?;
        for channel in &group.channels {
            writeln!(out, "    {}", channel.name)?;
        }
    }
    writeln!(
        out,
        "{} groups, {} channels",
        groups.len(),
        groups.channel_count()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let Some(source_url) = args.source.or(config.source_url.clone()) else {
        eprintln!("Error: No IPTV source configured.");
        eprintln!();
        eprintln!("Pass one on the command line:");
        eprintln!("  iptv-catalog --source https://example.com/live.m3u");
        eprintln!();
        eprintln!("Or set source_url in {}.", config_path.display());
        std::process::exit(1);
    };

    let cache_dir = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => default_cache_dir()?,
    };

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")?;

    let repo = IptvRepository::new(&source_url, client, FileCache::new(&cache_dir))
        .with_timeout(config.request_timeout());

    if args.clear_cache {
        repo.clear_cache()
            .await
            .context("Failed to clear cache")?;
        println!("Cleared cache for {}", source_url);
        return Ok(());
    }

    let cache_time = args
        .cache_time
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.cache_time());
    let simplify = args.simplify || config.simplify;

    let groups = repo
        .get_channel_group_list(cache_time, simplify)
        .await
        .with_context(|| format!("Could not load channels from {}", source_url))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &groups).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        print_listing(&mut out, &groups)?;
    }

    Ok(())
}
