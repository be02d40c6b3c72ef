use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::FeedClient;
use shared::{domain::Coordinate, geo, protocol::DEFAULT_POST_TTL_SECONDS};
use tracing::warn;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8080/api")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Great-circle distance between two `lat,lon` points.
    Distance {
        #[arg(allow_hyphen_values = true)]
        from: String,
        #[arg(allow_hyphen_values = true)]
        to: String,
    },
    /// Ask the feed service whether it is healthy.
    Health,
    /// Post `count` numbered messages spread around a center point.
    Seed {
        #[arg(allow_hyphen_values = true)]
        center: String,
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Maximum offset from the center, in degrees.
        #[arg(long, default_value_t = 0.02)]
        spread: f64,
        #[arg(long, default_value_t = DEFAULT_POST_TTL_SECONDS)]
        ttl_secs: i64,
        #[arg(long, default_value = "seed post")]
        content: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    match cli.command {
        Command::Distance { from, to } => {
            let from = parse_coordinate(&from)?;
            let to = parse_coordinate(&to)?;
            println!("{:.2} km", geo::round_km(geo::distance_km(from, to)));
        }
        Command::Health => {
            let client = FeedClient::new(cli.server_url);
            let healthy = client.health().await?;
            println!("healthy={healthy}");
        }
        Command::Seed {
            center,
            count,
            spread,
            ttl_secs,
            content,
        } => {
            let center = parse_coordinate(&center)?;
            let client = FeedClient::new(cli.server_url);
            let mut created = 0;
            for index in 0..count {
                let location = seed_location(center, index, count, spread);
                let message = format!("{content} #{}", index + 1);
                match client.submit_post(location, &message, ttl_secs).await {
                    Ok(_) => created += 1,
                    Err(error) => warn!(%error, index, "seed post failed"),
                }
            }
            println!("created {created}/{count} posts around {center:?}");
        }
    }

    Ok(())
}

fn parse_coordinate(raw: &str) -> Result<Coordinate> {
    let Some((lat, lon)) = raw.split_once(',') else {
        bail!("expected 'lat,lon', got '{raw}'");
    };
    let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude in '{raw}'"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("bad longitude in '{raw}'"))?;
    Ok(Coordinate::new(lat, lon)?)
}

/// Places seed posts on a spiral so they are spread but deterministic.
fn seed_location(center: Coordinate, index: usize, count: usize, spread: f64) -> Coordinate {
    let fraction = (index + 1) as f64 / count.max(1) as f64;
    let angle = index as f64 * 2.399_963; // golden angle, radians
    let offset = spread * fraction.sqrt();
    Coordinate {
        latitude: (center.latitude + offset * angle.sin()).clamp(-90.0, 90.0),
        longitude: wrap_longitude(center.longitude + offset * angle.cos()),
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}
