//! Process configuration, read once at startup from flags and environment.

use crate::error::{PaymentError, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaymentEnvironment {
    Sandbox,
    Production,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Payment gateway proxy for third-party websites", long_about = None)]
pub struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Public base URL of this service, used for processing and callback URLs
    #[arg(long, env = "BASE_URL", default_value = "https://pay.example.com")]
    pub base_url: String,

    /// Where the payer is sent when a gateway callback cannot be resolved
    #[arg(long, env = "ERROR_REDIRECT_URL", default_value = "https://pay.example.com/error")]
    pub error_redirect_url: String,

    /// Upstream payment gateway to use
    #[arg(long, env = "PAYMENT_GATEWAY", default_value = "zarinpal")]
    pub gateway: String,

    /// Selects sandbox or production credentials and endpoints
    #[arg(long, env = "PAYMENT_ENV", value_enum, default_value_t = PaymentEnvironment::Sandbox)]
    pub payment_env: PaymentEnvironment,

    #[arg(long, env = "ZARINPAL_MERCHANT_ID", hide_env_values = true)]
    pub zarinpal_merchant_id: Option<String>,

    #[arg(long, env = "ZIBAL_MERCHANT_ID", hide_env_values = true)]
    pub zibal_merchant_id: Option<String>,

    /// Upper bound for a single call to the upstream gateway, in seconds
    #[arg(long, env = "GATEWAY_TIMEOUT_SECS", default_value_t = 10)]
    pub gateway_timeout_secs: u64,

    /// CSV file of merchants to register at startup
    #[arg(long, env = "MERCHANTS_FILE")]
    pub merchants: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// Settings the orchestrator needs at request time.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: Url,
    pub error_redirect_url: Url,
    pub gateway_timeout: Duration,
}

/// Credentials and environment handed to gateway constructors.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: PaymentEnvironment,
    pub zarinpal_merchant_id: Option<String>,
    pub zibal_merchant_id: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn sandbox(timeout: Duration) -> Self {
        Self {
            environment: PaymentEnvironment::Sandbox,
            zarinpal_merchant_id: None,
            zibal_merchant_id: None,
            timeout,
        }
    }
}

impl Cli {
    pub fn service_config(&self) -> Result<ServiceConfig> {
        if self.gateway_timeout_secs == 0 {
            return Err(PaymentError::Config(
                "gateway timeout must be at least one second".to_string(),
            ));
        }
        Ok(ServiceConfig {
            base_url: parse_http_url("BASE_URL", &self.base_url)?,
            error_redirect_url: parse_http_url("ERROR_REDIRECT_URL", &self.error_redirect_url)?,
            gateway_timeout: Duration::from_secs(self.gateway_timeout_secs),
        })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            environment: self.payment_env,
            zarinpal_merchant_id: self.zarinpal_merchant_id.clone(),
            zibal_merchant_id: self.zibal_merchant_id.clone(),
            timeout: Duration::from_secs(self.gateway_timeout_secs),
        }
    }
}

fn parse_http_url(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| PaymentError::Config(format!("{name} '{raw}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PaymentError::Config(format!(
            "{name} '{raw}' must use http or https"
        )));
    }
    Ok(url)
}
