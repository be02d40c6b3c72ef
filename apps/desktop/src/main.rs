use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    FeedClient, FeedClientConfig, FeedSettings, FixedLocationProvider, InsecureContext,
    LocationFeedController, LocationProvider, PostOutcome,
};
use shared::{
    domain::Coordinate,
    protocol::{DEFAULT_POST_TTL_SECONDS, DEFAULT_RADIUS_KM},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod config;

#[derive(Parser, Debug)]
#[command(name = "radius", about = "Post to and read the feed around you")]
struct Args {
    /// Feed service base url, e.g. http://127.0.0.1:8080/api
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
    /// Run without precise location; the feed is anchored at (0, 0).
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    insecure: bool,
    #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
    radius_km: f64,
    #[arg(long, default_value_t = DEFAULT_POST_TTL_SECONDS)]
    ttl_secs: i64,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Post each message in order after the initial feed load.
    #[arg(long = "message", short = 'm')]
    messages: Vec<String>,
    /// Keep reading lines from stdin: text is posted, `/refresh` reloads, `/quit` exits.
    #[arg(long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings()?;
    if let Some(raw) = &args.server_url {
        settings.server_url = config::parse_server_url(raw)?;
    }
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let feed = FeedClient::with_config(
        settings.server_url.as_str(),
        &FeedClientConfig {
            request_timeout: settings.request_timeout,
        },
    )?;
    info!(server_url = %feed.base_url(), "using feed service");

    let location: Arc<dyn LocationProvider> = if args.insecure {
        Arc::new(InsecureContext)
    } else {
        let position = match (args.lat, args.lon) {
            (Some(lat), Some(lon)) => {
                Some(Coordinate::new(lat, lon).context("invalid --lat/--lon")?)
            }
            _ => None,
        };
        Arc::new(FixedLocationProvider::new(position))
    };

    let mut controller = LocationFeedController::with_settings(
        Arc::new(feed),
        location,
        FeedSettings {
            radius_km: args.radius_km,
            post_ttl_seconds: args.ttl_secs,
        },
    );
    controller.initialize().await;
    if controller.state().current_location.is_none() {
        println!("Location unavailable; pass --lat/--lon or --insecure.");
        return Ok(());
    }
    print_feed(&controller);

    for message in &args.messages {
        post_and_print(&mut controller, message).await;
    }

    if args.interactive {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match line.trim() {
                "/quit" => break,
                "/refresh" => {
                    controller.refresh().await;
                    print_feed(&controller);
                }
                _ => post_and_print(&mut controller, &line).await,
            }
        }
    }

    Ok(())
}

async fn post_and_print(controller: &mut LocationFeedController, message: &str) {
    controller.set_draft(message);
    match controller.post().await {
        PostOutcome::EmptyDraft => println!("Nothing to post."),
        PostOutcome::LocationUnknown => println!("Location unknown; cannot post."),
        PostOutcome::SubmitFailed => println!("Post failed; try again."),
        PostOutcome::Published { refreshed: false } => {
            println!("Posted, but the feed could not be refreshed.")
        }
        PostOutcome::Published { refreshed: true } => print_feed(controller),
    }
}

fn print_feed(controller: &LocationFeedController) {
    let entries = controller.render();
    if entries.is_empty() {
        println!("No posts within {} km.", controller.settings().radius_km);
        return;
    }
    for entry in entries {
        println!("- {entry}");
    }
}
