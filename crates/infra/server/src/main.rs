//! OTP Gate server binary.

use otp_gate_server::{load_config, AppConfig, OtpServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config path from the first argument, default alongside the binary.
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "otp-gate.toml".to_string());

    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("no usable config at {path} ({err}), using defaults");
            AppConfig::default()
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let server = OtpServer::new(config);
    server.run().await?;

    Ok(())
}
