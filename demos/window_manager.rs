//! Window management walkthrough.
//!
//! Demonstrates:
//! - Building a client with an explicit or default URL
//! - Subscribing to lifecycle and broadcast events
//! - Creating, listing, focusing and closing windows
//! - Handling business failures without treating them as errors
//!
//! Usage:
//!   cargo run --example window_manager
//!   cargo run --example window_manager -- --url ws://127.0.0.1:8080/ws
//!   cargo run --example window_manager -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use window_relay::{ClientEvent, EventBus, EventKind, Result, WindowClient};

// ============================================================================
// Constants
// ============================================================================

const DEMO_LABEL: &str = "demo-window";
const DEMO_URL: &str = "https://example.com";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    url: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let url = args
            .iter()
            .position(|a| a == "--url")
            .and_then(|i| args.get(i + 1))
            .cloned();

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            url,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "window_relay=trace"
    } else {
        "window_relay=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Window Manager ===\n");

    // ========================================================================
    // Connect
    // ========================================================================

    let events = EventBus::new();
    events.subscribe(EventKind::Message, |event| {
        if let ClientEvent::Message(response) = event
            && response.action == "window_update"
        {
            println!("    [broadcast] {}", response.message);
        }
    });

    events.subscribe(EventKind::Disconnected, |event| {
        if let ClientEvent::ReconnectFailed { attempts } = event {
            println!("    [lifecycle] gave up after {attempts} attempts");
        }
    });

    let mut builder = WindowClient::builder().events(events);
    if let Some(url) = args.url {
        builder = builder.url(url);
    }

    println!("[1] Connecting...");
    let client = builder.build().await?;
    println!("    URL: {}", client.url());

    if let Err(e) = client.wait_connected(Duration::from_secs(5)).await {
        println!("    ✗ Not connected: {e}");
        client.close();
        return Ok(());
    }
    println!("    ✓ Connected\n");

    // ========================================================================
    // Ping
    // ========================================================================

    println!("[2] Ping...");
    let pong = client.ping().await?;
    println!("    ✓ {} ({})\n", pong.action, pong.message);

    // ========================================================================
    // Create + List
    // ========================================================================

    println!("[3] Creating '{DEMO_LABEL}'...");
    let created = client.create_window(DEMO_LABEL, DEMO_URL, true).await?;
    if created.is_success() {
        println!("    ✓ {}\n", created.message);
    } else {
        println!("    ✗ Server refused: {}\n", created.message);
    }

    println!("[4] Listing windows...");
    for window in client.windows().await? {
        println!(
            "    - {:<16} {:<32} focused={} on_top={}",
            window.label, window.url, window.is_focused, window.is_always_on_top
        );
    }
    println!();

    // ========================================================================
    // Manipulate
    // ========================================================================

    println!("[5] Focusing and pinning...");
    client.focus_window(DEMO_LABEL).await?;
    client.set_always_on_top(DEMO_LABEL, true).await?;
    let info = client.window_info(DEMO_LABEL).await?;
    println!("    ✓ always_on_top = {}\n", info.is_always_on_top);

    println!("[6] Closing '{DEMO_LABEL}'...");
    let closed = client.close_window(DEMO_LABEL).await?;
    println!("    {} {}\n", if closed.success { "✓" } else { "✗" }, closed.message);

    client.close();
    println!("=== Done ===");
    Ok(())
}
