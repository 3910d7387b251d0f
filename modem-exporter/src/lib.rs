use color_eyre::eyre::{Result, WrapErr as _};
use config::Cli;
use modem_manager::{LogLevel, ModemManager};
use sweep::Sweep;
use tokio::net::TcpListener;
use tracing::info;

pub mod collector;
pub mod config;
pub mod metrics;
pub mod modem_manager;
pub mod nmea;
pub mod server;
pub mod sweep;

mod utils;

/// Checks that ModemManager is reachable, then serves metrics until
/// `shutdown` resolves.
#[bon::builder(finish_fn = run)]
pub async fn program(
    cli: Cli,
    modem_manager: impl ModemManager,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let version = modem_manager
        .version()
        .await
        .wrap_err("failed to get ModemManager version")?;

    modem_manager
        .set_logging(LogLevel::Error)
        .await
        .wrap_err("failed to set ModemManager logging level")?;

    info!("starting modem exporter using ModemManager v{version}");

    let sweep = Sweep::builder()
        .modem_manager(modem_manager)
        .sampler(cli.signal_sampler())
        .build();

    let app = server::create_app(sweep, &cli.metrics_path)?;

    let addr = cli.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to listen on {addr}"))?;

    info!("listening on {addr}, metrics at {}", cli.metrics_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .wrap_err("http server failed")
}
