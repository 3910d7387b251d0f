use crate::modem_manager::{ModemId, ModemManager, SignalSample};
use color_eyre::{Result, eyre::WrapErr};
use std::time::Duration;
use tokio::time;
use tracing::error;

/// Signal values are only refreshed while polling is switched on, so every
/// sample turns it on, waits for fresh values and turns it back off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSampler {
    pub refresh_rate: Duration,
    pub settle: Duration,
}

impl Default for SignalSampler {
    fn default() -> Self {
        Self {
            refresh_rate: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }
}

impl SignalSampler {
    pub async fn sample(
        &self,
        mm: &dyn ModemManager,
        modem_id: &ModemId,
    ) -> Result<Vec<SignalSample>> {
        mm.signal_setup(modem_id, self.refresh_rate)
            .await
            .wrap_err("failed to enable signal refresh")?;

        time::sleep(self.settle).await;

        let samples = mm
            .signal_get(modem_id)
            .await
            .wrap_err("failed to get signal");

        // disabling is attempted even when reading failed
        let disabled = mm
            .signal_setup(modem_id, Duration::ZERO)
            .await
            .inspect_err(|e| {
                error!("signal refresh left enabled on modem {modem_id}: {e}")
            });

        let samples = samples?;
        disabled.wrap_err("failed to disable signal refresh")?;

        Ok(samples)
    }
}
