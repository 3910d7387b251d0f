//! Per modem collection pipeline.
//!
//! Every step talks to ModemManager and may fail on its own. A failing step
//! skips the rest of that modem, except for the steps whose failures only
//! cost a single observation or are best effort (bearers).

use crate::{
    metrics::{Metric, ModemIdentity, Observation},
    modem_manager::{Modem, ModemId, ModemManager, SignalSample, state::ModemState},
};
use chrono::{DateTime, Utc};
use color_eyre::Report;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub mod bearer;
pub mod location;
pub mod signal;

use location::decode_location;
use signal::SignalSampler;

#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("failed to read modem state: {0}")]
    State(Report),
    #[error("failed to enable modem: {0}")]
    Enable(Report),
    #[error("failed to read SIM identity: {0}")]
    SimIdentity(Report),
    #[error("failed to read 3GPP identity: {0}")]
    GppIdentity(Report),
    #[error("failed to read access technologies: {0}")]
    AccessTechnologies(Report),
    #[error("expected exactly one access technology, modem reports {0:?}")]
    AmbiguousAccessTechnology(Vec<String>),
    #[error("failed to read state failed reason: {0}")]
    StateFailedReason(Report),
    #[error("failed to get location: {0}")]
    Location(Report),
    #[error("failed to read registration state: {0}")]
    RegistrationState(Report),
    #[error("failed to read operator code: {0}")]
    OperatorCode(Report),
    #[error("failed to sample signal: {0}")]
    Signal(Report),
}

#[derive(Debug)]
pub enum Outcome {
    Complete,
    Skipped(SkipReason),
}

/// What one modem contributed to a sweep. A skipped modem keeps whatever it
/// observed before the failing step.
#[derive(Debug)]
pub struct ModemReport {
    pub modem_id: ModemId,
    pub observations: Vec<Observation>,
    pub outcome: Outcome,
}

impl ModemReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, Outcome::Complete)
    }
}

pub struct ModemCollector<'a> {
    pub mm: &'a dyn ModemManager,
    pub sampler: &'a SignalSampler,
    /// Bearers are only managed when an APN is configured.
    pub apn: Option<&'a str>,
    /// GPS fix times without a date are the latest such time not after this.
    pub now: DateTime<Utc>,
}

impl ModemCollector<'_> {
    pub async fn collect(&self, modem: &Modem) -> ModemReport {
        let mut observations = Vec::new();

        let outcome = match self.run(&modem.id, &mut observations).await {
            Ok(()) => Outcome::Complete,
            Err(reason) => {
                warn!("skipping modem {}: {reason}", modem.id);
                Outcome::Skipped(reason)
            }
        };

        ModemReport {
            modem_id: modem.id.clone(),
            observations,
            outcome,
        }
    }

    async fn run(
        &self,
        modem_id: &ModemId,
        out: &mut Vec<Observation>,
    ) -> Result<(), SkipReason> {
        let mm = self.mm;

        let state = mm.state(modem_id).await.map_err(SkipReason::State)?;
        if state == ModemState::Disabled {
            debug!("enabling modem {modem_id}");
            mm.enable(modem_id).await.map_err(SkipReason::Enable)?;
        }

        let sim = mm
            .sim_identity(modem_id)
            .await
            .map_err(SkipReason::SimIdentity)?;

        let gpp = mm
            .gpp_identity(modem_id)
            .await
            .map_err(SkipReason::GppIdentity)?;

        let techs = mm
            .access_technologies(modem_id)
            .await
            .map_err(SkipReason::AccessTechnologies)?;
        if techs.len() != 1 {
            return Err(SkipReason::AmbiguousAccessTechnology(techs));
        }
        let rat = techs[0].to_lowercase();

        let identity = Arc::new(ModemIdentity {
            imei: gpp.imei,
            icc: sim.sim_identifier,
            imsi: sim.imsi,
            operator_id: sim.operator_identifier,
            operator: sim.operator_name,
            visited_operator: gpp.operator_name,
            rat,
        });

        let state = mm.state(modem_id).await.map_err(SkipReason::State)?;

        if state == ModemState::Registered
            && let Some(apn) = self.apn
        {
            bearer::ensure_bearer(mm, modem_id, apn).await;
        }

        out.push(Observation::flag(
            Metric::Registered,
            &identity,
            state.is_registered(),
        ));
        out.push(Observation::flag(
            Metric::Connected,
            &identity,
            state.is_connected(),
        ));

        let reason = mm
            .state_failed_reason(modem_id)
            .await
            .map_err(SkipReason::StateFailedReason)?;
        debug!("modem {modem_id} state failed reason: {reason}");

        let location = mm
            .location(modem_id)
            .await
            .map_err(SkipReason::Location)?;
        let decoded = decode_location(&location, self.now);
        for e in &decoded.errors {
            warn!("modem {modem_id} (imei {}): {e}", identity.imei);
        }

        let cells = [
            (Metric::CellId, decoded.cell_id),
            (Metric::Lac, decoded.lac),
            (Metric::Tac, decoded.tac),
        ];
        for (metric, value) in cells {
            if let Some(value) = value {
                out.push(Observation::modem(metric, &identity, value as f64));
            }
        }

        if let Some(fix) = decoded.fix {
            out.push(Observation::modem(Metric::Lat, &identity, fix.latitude));
            out.push(Observation::modem(Metric::Lon, &identity, fix.longitude));
            out.push(Observation::modem(Metric::Alt, &identity, fix.altitude));
            if let Some(time_fix) = fix.time_fix {
                out.push(Observation::modem(
                    Metric::TimeFix,
                    &identity,
                    time_fix as f64,
                ));
            }
        }

        let registration = mm
            .registration_state(modem_id)
            .await
            .map_err(SkipReason::RegistrationState)?;
        out.push(Observation::flag(
            Metric::Roaming,
            &identity,
            registration.is_roaming(),
        ));

        let code = mm
            .operator_code(modem_id)
            .await
            .map_err(SkipReason::OperatorCode)?;
        match parse_operator_code(&code) {
            Some(code) => {
                out.push(Observation::modem(Metric::OperatorCode, &identity, code))
            }
            None => {
                warn!("modem {modem_id}: operator code {code:?} is not a number")
            }
        }

        let samples = self
            .sampler
            .sample(mm, modem_id)
            .await
            .map_err(SkipReason::Signal)?;
        for sample in &samples {
            push_signal(out, &identity, sample);
        }

        Ok(())
    }
}

fn parse_operator_code(code: &str) -> Option<f64> {
    code.trim().parse::<f64>().ok().filter(|code| code.is_finite())
}

/// Every sample is emitted as a full set, values the modem did not report
/// are NaN.
fn push_signal(
    out: &mut Vec<Observation>,
    identity: &Arc<ModemIdentity>,
    sample: &SignalSample,
) {
    let values = [
        (Metric::Rssi, sample.rssi),
        (Metric::Rsrp, sample.rsrp),
        (Metric::Snr, sample.snr),
        (Metric::Sinr, sample.sinr),
        (Metric::Rsrq, sample.rsrq),
    ];

    for (metric, value) in values {
        out.push(Observation::modem(
            metric,
            identity,
            value.unwrap_or(f64::NAN),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_operator_codes() {
        assert_eq!(parse_operator_code("310"), Some(310.0));
        assert_eq!(parse_operator_code(" 23415 "), Some(23415.0));
        assert_eq!(parse_operator_code("N/A"), None);
        assert_eq!(parse_operator_code(""), None);
        assert_eq!(parse_operator_code("inf"), None);
        assert_eq!(parse_operator_code("NaN"), None);
    }

    #[test]
    fn missing_signal_values_are_nan() {
        let identity = Arc::new(ModemIdentity::default());
        let sample = SignalSample {
            access_tech: "lte".to_string(),
            rssi: Some(-67.0),
            ..Default::default()
        };
        let mut out = Vec::new();

        push_signal(&mut out, &identity, &sample);

        assert_eq!(out.len(), 5);
        assert_eq!(out[0].metric, Metric::Rssi);
        assert_eq!(out[0].value, -67.0);
        assert!(out[1..].iter().all(|obs| obs.value.is_nan()));
    }
}
