//! Startup banner and URL display

use super::config::{AppConfig, is_all_interfaces};
use super::constants::APP_NAME;

/// Print the startup banner with endpoints and pipeline layout
pub fn print_banner(config: &AppConfig) {
    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(&config.server.host) {
        "localhost"
    } else {
        &config.server.host
    };
    let port = config.server.port;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    const W: usize = 12;
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/api/v1/checkout",
        "Checkout:", display_host, port
    );
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}/api/v1/health",
        "Health:", display_host, port
    );

    let stages: Vec<String> = config
        .pipeline
        .stages
        .iter()
        .map(|s| format!("{} ({})", s.name, s.policy))
        .collect();
    println!(
        "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "Pipeline:",
        stages.join(" → ")
    );
    println!();
}
