use crate::{
    collector::{ModemCollector, ModemReport, signal::SignalSampler},
    config::ApnSource,
    metrics::{Catalogue, Observation},
    modem_manager::ModemManager,
};
use bon::bon;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};

/// One pass over every modem ModemManager knows about.
pub struct Sweep {
    mm: Arc<dyn ModemManager>,
    catalogue: Arc<Catalogue>,
    apn: ApnSource,
    sampler: SignalSampler,
}

#[derive(Debug)]
pub struct SweepReport {
    pub up: bool,
    pub modems: Vec<ModemReport>,
}

impl SweepReport {
    /// `modem_up` first, then each modem's observations in the order they
    /// were collected.
    pub fn observations(&self) -> Vec<Observation> {
        let mut observations = vec![Observation::up(self.up)];
        observations.extend(
            self.modems
                .iter()
                .flat_map(|report| report.observations.iter().cloned()),
        );

        observations
    }
}

#[bon]
impl Sweep {
    #[builder]
    pub fn new(
        modem_manager: impl ModemManager,
        #[builder(default)] catalogue: Arc<Catalogue>,
        #[builder(default)] apn: ApnSource,
        #[builder(default)] sampler: SignalSampler,
    ) -> Self {
        Self {
            mm: Arc::new(modem_manager),
            catalogue,
            apn,
            sampler,
        }
    }
}

impl Sweep {
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub async fn run(&self) -> SweepReport {
        let modems = match self.mm.list_modems().await {
            Ok(modems) => modems,
            Err(e) => {
                error!("failed to list modems: {e}");
                return SweepReport {
                    up: false,
                    modems: Vec::new(),
                };
            }
        };

        debug!("sweeping {} modem(s)", modems.len());

        let apn = self.apn.resolve();
        let collector = ModemCollector {
            mm: self.mm.as_ref(),
            sampler: &self.sampler,
            apn: apn.as_deref(),
            now: Utc::now(),
        };

        let mut reports = Vec::with_capacity(modems.len());
        for modem in &modems {
            reports.push(collector.collect(modem).await);
        }

        SweepReport {
            up: true,
            modems: reports,
        }
    }
}
