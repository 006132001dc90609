use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gigmatch::config::AppConfig;
use gigmatch::listings::browser::HttpLauncher;
use gigmatch::listings::{CancelToken, ScrapeResult};
use gigmatch::matching::UserArtistSet;
use gigmatch::models::{ArtistProfile, ShowRecord};
use gigmatch::provider::spotify::SpotifyClient;
use gigmatch::provider::tokens::{InMemoryTokenStore, TokenStore, UserToken};
use gigmatch::provider::{ArtistSource, NoRefresh, ProviderError};

/// Token store key for the single CLI user.
const CLI_USER: &str = "cli";

#[derive(Parser)]
#[command(name = "gigmatch", version, about = "Find upcoming shows by the artists you listen to")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape upcoming shows from the listings site
    Scrape {
        /// Number of listing pages (defaults to config, 5)
        #[arg(short = 'p', long)]
        pages: Option<u32>,

        /// Directory for the snapshot file (defaults to config or XDG data dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Don't write a snapshot file
        #[arg(long)]
        no_snapshot: bool,

        /// Print shows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Match upcoming shows against your top and liked artists
    Match {
        /// Shows snapshot file (defaults to the latest snapshot)
        #[arg(long)]
        shows: Option<PathBuf>,

        /// JSON file with top artists (otherwise fetched from the provider)
        #[arg(long)]
        top: Option<PathBuf>,

        /// JSON file with liked artists (otherwise fetched from the provider)
        #[arg(long)]
        liked: Option<PathBuf>,

        /// Print matches as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List your top and liked artists from the streaming provider
    Artists,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    match cli.command {
        Commands::Scrape { pages, out_dir, no_snapshot, json } => {
            let result = run_scrape(&config, pages)?;

            if !no_snapshot {
                let dir = out_dir.unwrap_or_else(|| config.resolve_snapshot_dir());
                let path = gigmatch::snapshot::write_snapshot(&dir, &result.shows, Utc::now())
                    .context("Failed to write snapshot")?;
                eprintln!("Snapshot: {}", path.display());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result.shows)?);
            } else {
                print_show_table(&result.shows, None);
                println!();
                println!(
                    "Scrape complete: {} shows from {} pages, {} pages failed, {} rows skipped",
                    result.shows.len(),
                    result.pages_scraped,
                    result.failed_pages.len(),
                    result.rows_skipped
                );
            }
        }

        Commands::Match { shows, top, liked, json } => {
            let shows_path = match shows {
                Some(path) => path,
                None => {
                    let dir = config.resolve_snapshot_dir();
                    match gigmatch::snapshot::latest_snapshot(&dir).context("Failed to read snapshots")? {
                        Some(path) => path,
                        None => anyhow::bail!(
                            "No snapshot in {}. Run `gigmatch scrape` first or pass --shows.",
                            dir.display()
                        ),
                    }
                }
            };
            log::info!("Shows: {}", shows_path.display());
            let raw_shows = gigmatch::snapshot::load_snapshot(&shows_path)
                .context("Failed to load shows")?;

            let (top_artists, liked_artists) = if top.is_some() || liked.is_some() {
                (load_artists(top.as_deref())?, load_artists(liked.as_deref())?)
            } else {
                let client = provider_client(&config)?;
                (
                    client.top_artists(CLI_USER).map_err(surface_provider_error)?,
                    client.liked_artists(CLI_USER).map_err(surface_provider_error)?,
                )
            };

            let matches = gigmatch::matching::find_matches(&top_artists, &raw_shows, &liked_artists);

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No upcoming shows found.");
            } else {
                let user_artists = UserArtistSet::from_profiles(&top_artists, &liked_artists);
                println!(
                    "{} upcoming shows for {} of your artists ({} shows checked):",
                    matches.len(),
                    user_artists.len(),
                    raw_shows.len()
                );
                println!();
                print_show_table(&matches, Some(&user_artists));
            }
        }

        Commands::Artists => {
            let client = provider_client(&config)?;
            let top = client.top_artists(CLI_USER).map_err(surface_provider_error)?;
            let liked = client.liked_artists(CLI_USER).map_err(surface_provider_error)?;

            println!("Top artists ({}):", top.len());
            print_artists(&top);
            println!();
            println!("Liked artists ({}):", liked.len());
            print_artists(&liked);
        }
    }

    Ok(())
}

fn run_scrape(config: &AppConfig, pages: Option<u32>) -> Result<ScrapeResult> {
    let scraper = &config.scraper;
    let last_page = pages.unwrap_or(scraper.pages);
    let launcher = HttpLauncher {
        page_timeout: scraper.page_timeout(),
        user_agent: scraper.user_agent.clone(),
    };

    let result = gigmatch::listings::fetch_upcoming_shows(&launcher, scraper, 1..=last_page, &CancelToken::new())
        .context("Scrape failed")?;

    if result.pages_scraped == 0 && last_page > 0 {
        anyhow::bail!("Every listing page failed to load (see -v output)");
    }
    Ok(result)
}

/// Read an artist list from a JSON file. `None` means an empty list.
fn load_artists(path: Option<&Path>) -> Result<Vec<ArtistProfile>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse artists in {}", path.display()))
}

fn provider_client(config: &AppConfig) -> Result<SpotifyClient<InMemoryTokenStore, NoRefresh>> {
    let access_token = std::env::var(gigmatch::ACCESS_TOKEN_ENV).with_context(|| {
        format!(
            "No artist source: pass --top/--liked or set {}",
            gigmatch::ACCESS_TOKEN_ENV
        )
    })?;

    let store = InMemoryTokenStore::new();
    // Provider access tokens live for an hour; a pasted one may be older,
    // in which case the first 401 surfaces as an auth error.
    store.set(
        CLI_USER,
        UserToken {
            access_token,
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::hours(1),
            username: None,
        },
    );
    Ok(SpotifyClient::new(config.provider.api_base.clone(), store, NoRefresh))
}

/// Log the provider's detail, show the user the generic message.
fn surface_provider_error(e: ProviderError) -> anyhow::Error {
    log::error!("{e}");
    match e {
        ProviderError::Auth(_) => anyhow::anyhow!(
            "{}: set a fresh {}",
            e.user_message(),
            gigmatch::ACCESS_TOKEN_ENV
        ),
        ProviderError::Upstream(_) => anyhow::anyhow!("{}", e.user_message()),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Print a table of shows. With a user artist set, the first column lists
/// the artists that matched instead of the whole bill.
fn print_show_table(shows: &[ShowRecord], user_artists: Option<&UserArtistSet>) {
    let label = if user_artists.is_some() { "Your artists" } else { "Artists" };
    println!("{:<40} {:>10} {:>8}  {}", label, "Date", "Time", "Venue");
    println!("{}", "-".repeat(85));

    for show in shows {
        let artists = match user_artists {
            Some(set) => {
                let matched = set.matching_artists(show);
                let others = show.artists.len() - matched.len();
                if others > 0 {
                    format!("{} (+{others})", matched.join(", "))
                } else {
                    matched.join(", ")
                }
            }
            None => show.artist_line(),
        };

        println!(
            "{:<40} {:>10} {:>8}  {}",
            truncate(&artists, 40),
            show.date,
            show.time,
            show.venue
        );
    }
}

fn print_artists(artists: &[ArtistProfile]) {
    for artist in artists {
        if artist.genres.is_empty() {
            println!("  {}", artist.name);
        } else {
            println!("  {:<30} {}", truncate(&artist.name, 30), artist.genres.join(", "));
        }
    }
}
