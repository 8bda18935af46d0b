//! chaincache CLI: serve the transaction cache or check a node from the terminal.
//!
//! Usage:
//! ```bash
//! # Serve the cache over HTTP
//! chaincache serve --config chaincache.json
//!
//! # Check a node
//! chaincache check --url https://wallet.rise.vision
//!
//! # Print the default settings file
//! chaincache config > chaincache.json
//! ```

mod logging;
mod settings;

use std::env;
use std::path::Path;
use std::process;
use std::time::Instant;

use anyhow::Context;

use chaincache_core::{NodeClient, TransactionFilter};
use chaincache_http::{build_listener, router, HttpClientConfig, HttpNodeClient};

use crate::settings::Settings;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "serve" => cmd_serve(&args[2..]).await,
        "check" => cmd_check(&args[2..]).await,
        "config" => cmd_config(),
        "version" | "--version" | "-V" => {
            println!("chaincache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chaincache {}", env!("CARGO_PKG_VERSION"));
    println!("Polling transaction cache for RISE-style blockchain nodes\n");
    println!("USAGE:");
    println!("    chaincache <COMMAND>\n");
    println!("COMMANDS:");
    println!("    serve      Poll the configured nodes and serve the cache over HTTP");
    println!("    check      Query one node (height, recent transactions, latency)");
    println!("    config     Print the default settings as JSON");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("SERVE FLAGS:");
    println!("    --config <FILE>   JSON settings file  [default: built-in settings]\n");
    println!("CHECK FLAGS:");
    println!("    --url <URL>       Node base URL  [required]");
}

async fn cmd_serve(args: &[String]) -> anyhow::Result<()> {
    let config_path = parse_flag(args, "--config");
    let settings = Settings::load(config_path.as_deref().map(Path::new))?;
    logging::init_tracing(&settings.log);

    let listener = build_listener(&settings.listener, HttpClientConfig::default())
        .context("invalid listener configuration")?;
    let app = router(listener.facade(), &settings.routes);

    let addr = settings.bind_addr(env::var("PORT").ok().as_deref());
    let socket = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    listener.launch();
    tracing::info!(%addr, base_path = %settings.routes.base_path, "serving");

    axum::serve(socket, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    listener.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn cmd_check(args: &[String]) -> anyhow::Result<()> {
    let url = parse_flag(args, "--url").context("--url is required")?;
    let client = HttpNodeClient::default_for(url.as_str())?;

    println!("Checking {url}...");

    let start = Instant::now();
    let height = client.get_height().await?.height;
    let latency = start.elapsed();

    let filter = TransactionFilter::window(height.saturating_sub(100), 1000);
    let listed = client.list_transactions(&filter).await?;
    let found = listed.transactions.as_ref().map_or(0, Vec::len);

    println!("  Status:       {}", if listed.success { "OK" } else { "node rejected query" });
    println!("  Height:       {height}");
    println!("  Last 100 blk: {found} transactions (count {})", listed.count);
    println!("  Latency:      {}ms", latency.as_millis());

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&Settings::default())?);
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_found_by_name() {
        let args: Vec<String> = ["--url", "https://node.test", "--config", "a.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_flag(&args, "--config").as_deref(), Some("a.json"));
        assert_eq!(parse_flag(&args, "--url").as_deref(), Some("https://node.test"));
        assert!(parse_flag(&args, "--port").is_none());
    }

    #[test]
    fn trailing_flag_without_value() {
        let args = vec!["--config".to_string()];
        assert!(parse_flag(&args, "--config").is_none());
    }
}
