use crate::collector::signal::SignalSampler;
use clap::Parser;
use std::{env, time::Duration};

pub const APN_ENV: &str = "MODEM_EXPORTER_APN";

/// Prometheus exporter for modems managed by ModemManager
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about)]
pub struct Cli {
    /// Address to listen on for the web interface and telemetry
    #[arg(long = "web.listen-address", default_value = ":9898")]
    pub listen_address: String,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub metrics_path: String,

    /// Seconds to wait for fresh signal values after enabling refresh
    #[arg(long = "signal.settle", default_value_t = 2, value_name = "SECS")]
    pub settle_secs: u64,

    /// Signal refresh rate in seconds while sampling
    #[arg(
        long = "signal.refresh-rate",
        default_value_t = 1,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_rate_secs: u64,
}

impl Cli {
    /// `:9898` listens on every interface. The unspecified IPv6 address also
    /// accepts IPv4 clients unless the host sets `net.ipv6.bindv6only`.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("[::]{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }

    pub fn signal_sampler(&self) -> SignalSampler {
        SignalSampler {
            refresh_rate: Duration::from_secs(self.refresh_rate_secs),
            settle: Duration::from_secs(self.settle_secs),
        }
    }
}

/// Where the APN used for new bearers comes from. An unset or empty APN
/// turns bearer management off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApnSource {
    /// Read from the environment on every sweep.
    Env(String),
    Fixed(Option<String>),
}

impl Default for ApnSource {
    fn default() -> Self {
        ApnSource::Env(APN_ENV.to_string())
    }
}

impl ApnSource {
    pub fn resolve(&self) -> Option<String> {
        let apn = match self {
            ApnSource::Env(var) => env::var(var).ok(),
            ApnSource::Fixed(apn) => apn.clone(),
        };

        apn.filter(|apn| !apn.is_empty())
    }
}
