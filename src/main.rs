use log::{error, info, warn};

use crate::config::Config;

mod app;
mod auth;
mod config;
mod http;
mod logs;
mod player;
mod registration;
mod report;
mod session;
mod settings;
mod store;
mod transfer;
mod views;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logs::init_logger(config.log_file.as_ref()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if std::env::var("PARTY_BANK_SESSION_SECRET").is_err() {
        warn!("PARTY_BANK_SESSION_SECRET not set, sessions will not survive a restart");
    }
    if config.admin_password == config::DEFAULT_ADMIN_PASSWORD {
        warn!("Using the default admin password, set PARTY_BANK_ADMIN_PASSWORD to change it");
    }

    let app = match app::construct_app(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to build application: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting party bank with {} account slots and an initial balance of {}",
        config.max_accounts, config.initial_balance
    );

    if let Err(e) = http::run(app, &config.bind_address(), shutdown_signal()).await {
        error!("HTTP server failed: {}", e);
        std::process::exit(1);
    }
}
