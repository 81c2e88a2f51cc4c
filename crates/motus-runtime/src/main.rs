//! `motusd` – hosts the components listed in the robot config until Ctrl-C.
//!
//! ```text
//! MOTUS_CONFIG=bench.toml motusd
//! motusd --schema        # print the config JSON schema
//! ```

use std::sync::Arc;

use colored::Colorize;
use motus_runtime::{config, default_registry, telemetry, ResourceManager};
use motus_types::MotusError;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if std::env::args().any(|a| a == "--schema") {
        println!("{:#}", config::schema());
        return;
    }

    let _guard = telemetry::init_tracing("motusd");

    if let Err(e) = run().await {
        error!(error = %e, "motusd exited with error");
        println!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MotusError> {
    let robot = match config::load()? {
        Some(robot) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            robot
        }
        None => {
            println!(
                "  {} No config at {}; starting with no components.",
                "!".yellow(),
                config::config_path().display()
            );
            config::RobotConfig::default()
        }
    };

    let registry = Arc::new(default_registry(None)?);
    let mut manager = ResourceManager::from_config(registry, &robot).await?;
    info!(robot = %robot.name, components = manager.names().len(), "robot started");

    for name in manager.names() {
        let state = match manager.status(&name).await {
            Ok(_) => "ready".green(),
            Err(_) => "no status".yellow(),
        };
        println!("    • {} {}", name.to_string().bold(), state);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
    }
    println!();
    println!("{}", "  Ctrl-C received – closing components …".yellow().bold());
    manager.close().await?;
    println!("{}", "  ✓ All components closed.".green());
    Ok(())
}
