//! # OTP Gate Server
//!
//! Standalone phone-verification server. Wires the in-memory adapter,
//! the configured delivery providers, and the OTP service into an HTTP
//! API with two main endpoints: `POST /otp/send` and `POST /otp/verify`.

mod config;
mod routes;

pub use config::{load_config, AppConfig, ConfigError, ProvidersConfig, ServerConfig};
pub use routes::otp_routes;

use otp_gate_adapter_memory::MemoryAdapter;
use otp_gate_core::{OtpError, OtpResult};
use otp_gate_delivery::{DeliveryProvider, TwilioSmsProvider, ZaloZnsProvider};
use otp_gate_service::OtpService;
use std::net::SocketAddr;
use std::sync::Arc;

/// The OTP Gate HTTP server.
pub struct OtpServer {
    config: AppConfig,
}

impl OtpServer {
    /// Creates a server from loaded configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Builds the OTP service from the configuration.
    pub fn build_service(&self) -> OtpResult<Arc<OtpService>> {
        let adapter = Arc::new(MemoryAdapter::new());
        let mut builder = OtpService::builder()
            .config(self.config.otp.clone())
            .store(adapter.clone())
            .counters(adapter);

        if let Some(zalo) = &self.config.providers.zalo {
            let provider = ZaloZnsProvider::new(zalo.clone())
                .map_err(|e| OtpError::config(e.to_string()))?;
            builder = builder.provider(Arc::new(provider) as Arc<dyn DeliveryProvider>);
        }
        if let Some(twilio) = &self.config.providers.twilio {
            let provider = TwilioSmsProvider::new(twilio.clone())
                .map_err(|e| OtpError::config(e.to_string()))?;
            builder = builder.provider(Arc::new(provider) as Arc<dyn DeliveryProvider>);
        }

        Ok(Arc::new(builder.build()?))
    }

    /// Binds and serves until shutdown.
    pub async fn run(&self) -> OtpResult<()> {
        let service = self.build_service()?;
        let app = otp_routes(service);

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| OtpError::config(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(addr = %addr, "OTP Gate server listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| OtpError::config(format!("server error: {e}")))
    }
}
