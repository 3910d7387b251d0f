use clap::Parser;
use color_eyre::eyre::Result;
use modem_exporter::{config::Cli, modem_manager::cli::ModemManagerCli};
use tokio::signal::unix::{self, SignalKind};
use tracing::{info, warn};

const SYSLOG_IDENTIFIER: &str = "modem-exporter";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let tel_flusher = modem_telemetry::TelemetryConfig::new()
        .with_journald(SYSLOG_IDENTIFIER)
        .init();

    let cli = Cli::parse();

    let result = async {
        let mut sigterm = unix::signal(SignalKind::terminate())?;
        let mut sigint = unix::signal(SignalKind::interrupt())?;

        let shutdown = async move {
            tokio::select! {
                _ = sigterm.recv() => warn!("received SIGTERM"),
                _ = sigint.recv()  => warn!("received SIGINT"),
            }

            info!("shutting down");
        };

        modem_exporter::program()
            .cli(cli)
            .modem_manager(ModemManagerCli)
            .shutdown(shutdown)
            .run()
            .await
    }
    .await;

    tel_flusher.flush();

    result
}
