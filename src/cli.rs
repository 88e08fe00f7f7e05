//! Command line interface.

use clap::Parser;

use crate::config::schema::DEFAULT_TARGET;
use crate::config::{load_config, ConfigError, ConfigSource, ProxyConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "api-relay", version, about = "Streaming reverse proxy for a single upstream API", long_about = None)]
pub struct Cli {
    /// The target domain to proxy (absolute base URL)
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    pub domain: String,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:9001")]
    pub listen: String,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_address: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Turn the parsed arguments into a validated configuration.
    ///
    /// `debug_mode` is the raw value of the debug mode environment variable.
    pub fn into_config(self, debug_mode: Option<String>) -> Result<ProxyConfig, ConfigError> {
        load_config(ConfigSource {
            target: Some(self.domain),
            bind_address: Some(self.listen),
            metrics_address: self.metrics_address,
            log_level: Some(self.log_level),
            debug_mode,
        })
    }
}
