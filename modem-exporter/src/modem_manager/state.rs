use derive_more::Display;

/// The subset of ModemManager modem states the exporter acts on.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ModemState {
    Disabled,
    Registered,
    Connected,
    #[display("{_0}")]
    Other(String),
}

impl ModemState {
    /// Registered or better: a connected modem is also registered.
    pub fn is_registered(&self) -> bool {
        matches!(self, ModemState::Registered | ModemState::Connected)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ModemState::Connected)
    }
}

impl From<&str> for ModemState {
    fn from(value: &str) -> Self {
        let value = value.trim().trim_matches('\'').to_lowercase();

        match value.as_str() {
            "disabled" => ModemState::Disabled,
            "registered" => ModemState::Registered,
            "connected" => ModemState::Connected,
            _ => ModemState::Other(value),
        }
    }
}
