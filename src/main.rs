// Entrypoint for the upload step.
// - Builds the configuration once, authenticates once, then hands both to
//   the upload loop.
// - Any error ends the run with an `::error::` annotation and exit code 1.

use anyhow::{Context, Result};
use drive_upload::{
    api::DriveClient,
    auth::{ServiceAccountAuth, ServiceAccountKey},
    config::Config,
    upload::run,
};
use reqwest::blocking::Client;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("drive_upload=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn upload() -> Result<()> {
    let config = Config::from_env()?;

    let key = ServiceAccountKey::from_base64(&config.credentials)?;
    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let auth = ServiceAccountAuth::new(key)?;
    let drive = DriveClient::new(client, auth);

    run(&config, &drive)?;
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(e) = upload() {
        println!("::error::{:#}", e);
        std::process::exit(1);
    }
}
