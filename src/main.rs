// src/main.rs
//! geometa - fetch and inspect geo-entities for map tiles

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use geometa::{
    config::OriginConfig,
    logging,
    map::{tile_to_lat_lon, Subdomains},
    origin::TileState,
    Origin, TileCoord,
};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "geometa", version, about = "Tile-keyed geo-entity cache for map overlays")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/geometa/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the cache key of a tile
    Key(TileArgs),
    /// Find the tile containing a position
    Tile {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        zoom: u8,
    },
    /// Fetch the entities of one tile and print them as JSON
    Fetch {
        #[command(flatten)]
        tile: TileArgs,
        /// URL template, overriding the configured one
        #[arg(long)]
        url: Option<String>,
        /// Host aliases for {s}, e.g. "abc"
        #[arg(long)]
        subdomains: Option<String>,
    },
    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Store the request URL template
    SetUrl { url: String },
    /// Store the host aliases
    SetSubdomains { subdomains: String },
}

/// A tile given either directly or by position
#[derive(Args)]
struct TileArgs {
    #[arg(long, allow_negative_numbers = true)]
    x: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<i64>,
    #[arg(long)]
    z: Option<u8>,
    #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["x", "y"])]
    lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["x", "y"])]
    lon: Option<f64>,
    #[arg(long, conflicts_with = "z")]
    zoom: Option<u8>,
}

impl TileArgs {
    fn resolve(&self) -> anyhow::Result<TileCoord> {
        match (self.x, self.y, self.z, self.lat, self.lon, self.zoom) {
            (Some(x), Some(y), Some(z), None, None, None) => Ok(TileCoord::new(x, y, z)),
            (None, None, None, Some(lat), Some(lon), Some(zoom)) => {
                Ok(TileCoord::from_lat_lon(lat, lon, zoom)?)
            }
            _ => bail!("Give either --x --y --z or --lat --lon --zoom"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => OriginConfig::config_path()?,
    };

    match cli.command {
        Command::Key(tile) => {
            let coord = tile.resolve()?;
            println!("{}", coord.key());
        }
        Command::Tile { lat, lon, zoom } => {
            let coord = TileCoord::from_lat_lon(lat, lon, zoom)?;
            let (north, west) = tile_to_lat_lon(coord.x, coord.y, coord.z);
            println!("tile:   {}", coord);
            println!("key:    {}", coord.key());
            println!("corner: {:.6}, {:.6}", north, west);
        }
        Command::Fetch { tile, url, subdomains } => {
            let coord = tile.resolve()?;
            let mut config = OriginConfig::load_from(&config_path)
                .with_context(|| format!("Loading {}", config_path.display()))?;
            if let Some(url) = url {
                config.update_url(url);
            }
            if let Some(subdomains) = subdomains {
                config.update_subdomains(subdomains.as_str());
            }
            if config.url.is_none() {
                bail!("No URL configured; pass --url or run `geometa config set-url`");
            }

            fetch(&config, coord).await?;
        }
        Command::Config { action } => {
            let mut config = OriginConfig::load_from(&config_path)?;
            match action {
                ConfigAction::Show => println!("{}", serde_json::to_string_pretty(&config)?),
                ConfigAction::Path => println!("{}", config_path.display()),
                ConfigAction::SetUrl { url } => {
                    config.update_url(url);
                    config.save_to(&config_path)?;
                    info!(path = %config_path.display(), "Saved URL template");
                }
                ConfigAction::SetSubdomains { subdomains } => {
                    config.update_subdomains(Subdomains::from(subdomains.as_str()));
                    config.save_to(&config_path)?;
                    info!(path = %config_path.display(), "Saved subdomains");
                }
            }
        }
    }

    Ok(())
}

async fn fetch(config: &OriginConfig, coord: TileCoord) -> anyhow::Result<()> {
    let origin = Origin::from_config(config)?;
    debug!(tile = %coord.key(), "Fetching");

    let entities = match origin.settled(coord).await? {
        TileState::Resolved(entities) => entities,
        TileState::Pending => bail!("Tile {} did not resolve", coord.key()),
    };

    let stats = origin.stats();
    info!(
        tile = %coord.key(),
        entities = entities.len(),
        fetches = stats.fetches_started,
        "Tile resolved"
    );

    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}
