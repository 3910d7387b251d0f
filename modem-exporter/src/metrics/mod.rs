//! Metric descriptors and the observations a sweep produces.
//!
//! The set of metrics is fixed at startup. Observations are plain values tagged
//! with the metric they belong to and, for per-modem metrics, the identity of
//! the modem they describe.

use derive_more::Display;
use std::sync::Arc;

pub mod exposition;

pub use exposition::Exposition;

pub const NAMESPACE: &str = "modem";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    #[display("up")]
    Up,
    #[display("registered")]
    Registered,
    #[display("connected")]
    Connected,
    #[display("roaming")]
    Roaming,
    #[display("operatorcode")]
    OperatorCode,
    #[display("rssi")]
    Rssi,
    #[display("rsrp")]
    Rsrp,
    #[display("snr")]
    Snr,
    #[display("sinr")]
    Sinr,
    #[display("rsrq")]
    Rsrq,
    #[display("cellid")]
    CellId,
    #[display("lac")]
    Lac,
    #[display("tac")]
    Tac,
    #[display("lat")]
    Lat,
    #[display("lon")]
    Lon,
    #[display("alt")]
    Alt,
    #[display("TimeFix")]
    TimeFix,
}

impl Metric {
    /// Exposition order.
    pub const ALL: [Metric; 17] = [
        Metric::Up,
        Metric::Registered,
        Metric::Connected,
        Metric::Roaming,
        Metric::OperatorCode,
        Metric::Rssi,
        Metric::Rsrp,
        Metric::Snr,
        Metric::Sinr,
        Metric::Rsrq,
        Metric::CellId,
        Metric::Lac,
        Metric::Tac,
        Metric::Lat,
        Metric::Lon,
        Metric::Alt,
        Metric::TimeFix,
    ];

    pub fn help(self) -> &'static str {
        match self {
            Metric::Up => "Was the last modem query successful",
            Metric::Registered => "Is the modem registered",
            Metric::Connected => "Is the modem connected",
            Metric::Roaming => "Is the modem roaming",
            Metric::OperatorCode => "Code of the operator currently used by the modem",
            Metric::Rssi => "Level of signal reported by the modem",
            Metric::Rsrp => "Level of noise reported by the modem",
            Metric::Snr => "The LTE S/R ratio",
            Metric::Sinr => "Signal-to-interference-plus-noise ratio",
            Metric::Rsrq => "Reference Signal Received Quality",
            Metric::CellId => "CellID currently used by the modem",
            Metric::Lac => "LAC currently used by the modem",
            Metric::Tac => "TAC currently used by the modem",
            Metric::Lat => "Latitude",
            Metric::Lon => "Longitude",
            Metric::Alt => "Altitude",
            Metric::TimeFix => "Time To Fix",
        }
    }

    /// Only `up` is exported without modem labels.
    pub fn is_labeled(self) -> bool {
        !matches!(self, Metric::Up)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub metric: Metric,
    /// Fully qualified name, e.g. `modem_rssi`.
    pub name: String,
    pub help: &'static str,
    pub labeled: bool,
}

/// Immutable descriptor set shared by every sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    descs: Vec<MetricDesc>,
}

impl Catalogue {
    pub fn new(namespace: &str) -> Self {
        let descs = Metric::ALL
            .into_iter()
            .map(|metric| MetricDesc {
                metric,
                name: format!("{namespace}_{metric}"),
                help: metric.help(),
                labeled: metric.is_labeled(),
            })
            .collect();

        Self { descs }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDesc> {
        self.descs.iter()
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::new(NAMESPACE)
    }
}

/// Label values attached to every per-modem observation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModemIdentity {
    pub imei: String,
    pub icc: String,
    pub imsi: String,
    /// MCC + MNC of the SIM's home network.
    pub operator_id: String,
    /// Operator name stored on the SIM.
    pub operator: String,
    /// Operator name of the network the modem is registered on.
    pub visited_operator: String,
    /// Lowercased radio access technology.
    pub rat: String,
}

impl ModemIdentity {
    pub const LABEL_NAMES: [&'static str; 7] = [
        "imei",
        "icc",
        "imsi",
        "operatorid",
        "operator",
        "v_operator",
        "rat",
    ];

    pub fn label_values(&self) -> [&str; 7] {
        [
            &self.imei,
            &self.icc,
            &self.imsi,
            &self.operator_id,
            &self.operator,
            &self.visited_operator,
            &self.rat,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: Metric,
    pub labels: Option<Arc<ModemIdentity>>,
    pub value: f64,
}

impl Observation {
    pub fn up(up: bool) -> Self {
        Self {
            metric: Metric::Up,
            labels: None,
            value: if up { 1.0 } else { 0.0 },
        }
    }

    pub fn modem(metric: Metric, identity: &Arc<ModemIdentity>, value: f64) -> Self {
        Self {
            metric,
            labels: Some(Arc::clone(identity)),
            value,
        }
    }

    pub fn flag(metric: Metric, identity: &Arc<ModemIdentity>, flag: bool) -> Self {
        Self::modem(metric, identity, if flag { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_names_are_namespaced() {
        let catalogue = Catalogue::new(NAMESPACE);

        let names: Vec<_> = catalogue.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(names.len(), Metric::ALL.len());
        assert_eq!(names[0], "modem_up");
        assert!(names.contains(&"modem_operatorcode"));
        assert!(names.contains(&"modem_cellid"));
        assert_eq!(names[names.len() - 1], "modem_TimeFix");
    }

    #[test]
    fn only_up_is_unlabeled() {
        let catalogue = Catalogue::default();

        let unlabeled: Vec<_> = catalogue
            .iter()
            .filter(|d| !d.labeled)
            .map(|d| d.metric)
            .collect();

        assert_eq!(unlabeled, vec![Metric::Up]);
        assert_eq!(
            catalogue
                .iter()
                .find(|d| d.metric == Metric::Rssi)
                .unwrap()
                .help,
            "Level of signal reported by the modem"
        );
    }
}
