use crate::modem_manager::{ModemId, ModemManager};
use tracing::{info, warn};

/// Replaces every bearer of a registered modem with a fresh connection on
/// `apn`. Failures never stop the sweep: each one is logged and the remaining
/// steps still run.
pub async fn ensure_bearer(mm: &dyn ModemManager, modem_id: &ModemId, apn: &str) {
    let bearers = mm
        .list_bearers(modem_id)
        .await
        .inspect_err(|e| warn!("failed to list bearers of modem {modem_id}: {e}"))
        .unwrap_or_default();

    for bearer in &bearers {
        if let Err(e) = mm.disconnect_bearer(bearer).await {
            warn!("failed to disconnect bearer {bearer} of modem {modem_id}: {e}");
        }

        if let Err(e) = mm.delete_bearer(modem_id, bearer).await {
            warn!("failed to delete bearer {bearer} of modem {modem_id}: {e}");
        }
    }

    match mm.simple_connect(modem_id, apn).await {
        Ok(()) => info!("modem {modem_id} connected with apn {apn}"),
        Err(e) => warn!("failed to connect modem {modem_id} with apn {apn}: {e}"),
    }
}
