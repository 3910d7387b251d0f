use async_trait::async_trait;
use color_eyre::Result;
use derive_more::Display;
use state::ModemState;
use std::time::Duration;

pub mod cli;
pub mod state;

/// Access to ModemManager. Every call is scoped to a single modem (or bearer)
/// and may fail independently of the others.
#[async_trait]
pub trait ModemManager: 'static + Send + Sync {
    async fn version(&self) -> Result<String>;

    async fn set_logging(&self, level: LogLevel) -> Result<()>;

    async fn list_modems(&self) -> Result<Vec<Modem>>;

    async fn state(&self, modem_id: &ModemId) -> Result<ModemState>;

    async fn enable(&self, modem_id: &ModemId) -> Result<()>;

    async fn sim_identity(&self, modem_id: &ModemId) -> Result<SimIdentity>;

    async fn gpp_identity(&self, modem_id: &ModemId) -> Result<GppIdentity>;

    async fn access_technologies(&self, modem_id: &ModemId) -> Result<Vec<String>>;

    async fn state_failed_reason(&self, modem_id: &ModemId) -> Result<String>;

    async fn list_bearers(&self, modem_id: &ModemId) -> Result<Vec<BearerId>>;

    async fn disconnect_bearer(&self, bearer_id: &BearerId) -> Result<()>;

    async fn delete_bearer(&self, modem_id: &ModemId, bearer_id: &BearerId)
    -> Result<()>;

    async fn simple_connect(&self, modem_id: &ModemId, apn: &str) -> Result<()>;

    async fn location(&self, modem_id: &ModemId) -> Result<Location>;

    async fn registration_state(&self, modem_id: &ModemId)
    -> Result<RegistrationState>;

    async fn operator_code(&self, modem_id: &ModemId) -> Result<String>;

    /// Sets the signal refresh rate. A zero rate disables refreshing.
    async fn signal_setup(&self, modem_id: &ModemId, rate: Duration) -> Result<()>;

    async fn signal_get(&self, modem_id: &ModemId) -> Result<Vec<SignalSample>>;
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct ModemId(String);

impl ModemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for ModemId {
    fn from(value: usize) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct SimId(String);

impl SimId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for SimId {
    fn from(value: usize) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct BearerId(String);

impl BearerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for BearerId {
    fn from(value: usize) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modem {
    pub id: ModemId,
    pub vendor: String,
    pub model: String,
}

/// Log level of the ModemManager daemon itself.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    #[display("ERR")]
    Error,
}

/// Identity of the SIM card inserted in a modem.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimIdentity {
    /// ICCID
    pub sim_identifier: String,
    pub imsi: String,
    /// MCC + MNC of the SIM's home network.
    pub operator_identifier: String,
    pub operator_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GppIdentity {
    pub imei: String,
    /// Name of the network the modem is currently registered on.
    pub operator_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Home,
    Roaming,
    Other(String),
}

impl RegistrationState {
    pub fn is_roaming(&self) -> bool {
        matches!(self, RegistrationState::Roaming)
    }
}

impl From<&str> for RegistrationState {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "home" => RegistrationState::Home,
            "roaming" => RegistrationState::Roaming,
            other => RegistrationState::Other(other.to_string()),
        }
    }
}

/// Location as reported by the modem. Cell identifiers are hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub cid: Option<String>,
    pub lac: Option<String>,
    pub tac: Option<String>,
    /// Raw NMEA sentences in the order the modem stored them.
    pub nmea: Vec<String>,
    /// UTC time of the raw GPS fix.
    pub utc: Option<String>,
}

/// Signal quality of one radio technology. Values the modem does not report
/// are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSample {
    pub access_tech: String,
    pub rssi: Option<f64>,
    pub rsrp: Option<f64>,
    pub snr: Option<f64>,
    pub sinr: Option<f64>,
    pub rsrq: Option<f64>,
}
