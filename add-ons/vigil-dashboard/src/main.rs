//! Vigil dashboard client.
//!
//! Usage:
//!   vigil-dashboard --meeting <id> [--history <email>] [--endpoint <url>]
//!
//! Looks up attention scores for one meeting and renders a table, the
//! no-data message, or an error message. One request per invocation.

use vigil_core::{render_history, render_scores, DashboardClient, VigilConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut meeting: Option<String> = None;
    let mut history_email: Option<String> = None;
    let mut endpoint_override: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--meeting" => meeting = args.next(),
            "--history" => history_email = args.next(),
            "--endpoint" => endpoint_override = args.next(),
            _ => {}
        }
    }

    let meeting = match meeting {
        Some(m) => m,
        None => {
            eprintln!("Vigil — attention score lookup");
            eprintln!("  --meeting <id>      Meeting to look up (required)");
            eprintln!("  --history <email>   Per-participant attention history instead of the score table");
            eprintln!("  --endpoint <url>    Backend base URL (default: VIGIL_BACKEND_URL / vigil.toml)");
            return;
        }
    };

    let mut config = VigilConfig::load();
    if let Some(base) = endpoint_override {
        config.set_backend_url(&base);
    }

    let client = match DashboardClient::new(&config.query_endpoint, &config.history_endpoint) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not build query client: {}", e);
            std::process::exit(1);
        }
    };

    match history_email {
        Some(email) => match client.fetch_history(&meeting, &email).await {
            Ok(points) => println!("{}", render_history(&points)),
            Err(e) => {
                eprintln!("Could not load attention history: {}", e);
                std::process::exit(1);
            }
        },
        None => match client.fetch_scores(&meeting).await {
            Ok(rows) => println!("{}", render_scores(&rows)),
            Err(e) => {
                eprintln!("Could not load attention data: {}", e);
                std::process::exit(1);
            }
        },
    }
}
