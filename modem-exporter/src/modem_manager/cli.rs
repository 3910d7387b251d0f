use super::{
    BearerId, GppIdentity, Location, LogLevel, Modem, ModemId, ModemManager,
    RegistrationState, SignalSample, SimId, SimIdentity, state::ModemState,
};
use crate::utils::run_cmd;
use async_trait::async_trait;
use color_eyre::{
    Result,
    eyre::{WrapErr, bail, eyre},
};
use regex::Regex;
use serde_json::Value;
use std::{sync::LazyLock, time::Duration};

const MMCLI: &str = "mmcli";

macro_rules! jerr {
    ($s:expr) => {
        eyre!("could not get {}", $s)
    };
}

/// Talks to ModemManager through `mmcli`.
pub struct ModemManagerCli;

#[async_trait]
impl ModemManager for ModemManagerCli {
    async fn version(&self) -> Result<String> {
        let output = run_cmd(MMCLI, &["--version"]).await?;
        parse_version(&output)
    }

    async fn set_logging(&self, level: LogLevel) -> Result<()> {
        run_cmd(MMCLI, &[&format!("--set-logging={level}")]).await?;
        Ok(())
    }

    async fn list_modems(&self) -> Result<Vec<Modem>> {
        let output = run_cmd(MMCLI, &["-L"]).await?;
        Ok(parse_mmcli_modem_list(&output))
    }

    async fn state(&self, modem_id: &ModemId) -> Result<ModemState> {
        let info = self.modem_info(modem_id).await?;
        let state = info.state.ok_or_else(|| jerr!("modem.generic.state"))?;

        Ok(ModemState::from(state.as_str()))
    }

    async fn enable(&self, modem_id: &ModemId) -> Result<()> {
        run_cmd(MMCLI, &["-m", modem_id.as_str(), "--enable"]).await?;
        Ok(())
    }

    async fn sim_identity(&self, modem_id: &ModemId) -> Result<SimIdentity> {
        let sim_id = self
            .modem_info(modem_id)
            .await?
            .sim
            .ok_or_else(|| eyre!("modem {modem_id} has no SIM"))?;

        let output = run_cmd(MMCLI, &["-i", sim_id.as_str(), "-J"]).await?;

        parse_sim_identity(&output)
    }

    async fn gpp_identity(&self, modem_id: &ModemId) -> Result<GppIdentity> {
        let info = self.modem_info(modem_id).await?;
        let imei = info.imei.ok_or_else(|| jerr!("modem.3gpp.imei"))?;

        Ok(GppIdentity {
            imei,
            operator_name: info.operator_name.unwrap_or_default(),
        })
    }

    async fn access_technologies(&self, modem_id: &ModemId) -> Result<Vec<String>> {
        Ok(self.modem_info(modem_id).await?.access_techs)
    }

    async fn state_failed_reason(&self, modem_id: &ModemId) -> Result<String> {
        let reason = self.modem_info(modem_id).await?.state_failed_reason;

        Ok(reason.unwrap_or_else(|| "none".to_string()))
    }

    async fn list_bearers(&self, modem_id: &ModemId) -> Result<Vec<BearerId>> {
        Ok(self.modem_info(modem_id).await?.bearers)
    }

    async fn disconnect_bearer(&self, bearer_id: &BearerId) -> Result<()> {
        run_cmd(MMCLI, &["-b", bearer_id.as_str(), "--disconnect"]).await?;
        Ok(())
    }

    async fn delete_bearer(
        &self,
        modem_id: &ModemId,
        bearer_id: &BearerId,
    ) -> Result<()> {
        let bearer = format!("--delete-bearer={bearer_id}");
        run_cmd(MMCLI, &["-m", modem_id.as_str(), bearer.as_str()]).await?;

        Ok(())
    }

    async fn simple_connect(&self, modem_id: &ModemId, apn: &str) -> Result<()> {
        if apn.is_empty() {
            bail!("apn cannot be empty!");
        }

        let connect = format!("--simple-connect=apn={apn}");
        run_cmd(MMCLI, &["-m", modem_id.as_str(), connect.as_str()]).await?;

        Ok(())
    }

    async fn location(&self, modem_id: &ModemId) -> Result<Location> {
        let output = run_cmd(
            MMCLI,
            &["-m", modem_id.as_str(), "--location-get", "--output-json"],
        )
        .await?;

        parse_location(&output)
    }

    async fn registration_state(
        &self,
        modem_id: &ModemId,
    ) -> Result<RegistrationState> {
        let state = self.modem_info(modem_id).await?.registration_state;

        Ok(state
            .as_deref()
            .map(RegistrationState::from)
            .unwrap_or_else(|| RegistrationState::Other("unknown".to_string())))
    }

    async fn operator_code(&self, modem_id: &ModemId) -> Result<String> {
        Ok(self
            .modem_info(modem_id)
            .await?
            .operator_code
            .unwrap_or_default())
    }

    async fn signal_setup(&self, modem_id: &ModemId, rate: Duration) -> Result<()> {
        let rate = format!("--signal-setup={}", rate.as_secs());
        run_cmd(MMCLI, &["-m", modem_id.as_str(), rate.as_str()]).await?;

        Ok(())
    }

    async fn signal_get(&self, modem_id: &ModemId) -> Result<Vec<SignalSample>> {
        let output =
            run_cmd(MMCLI, &["-m", modem_id.as_str(), "--signal-get", "-J"]).await?;

        parse_signal(&output)
    }
}

impl ModemManagerCli {
    async fn modem_info(&self, modem_id: &ModemId) -> Result<ModemInfo> {
        let output = run_cmd(MMCLI, &["-m", modem_id.as_str(), "-J"]).await?;
        parse_modem_info(&output)
            .wrap_err_with(|| format!("failed to parse info of modem {modem_id}"))
    }
}

/// Snapshot of `mmcli -m <id> -J`.
#[derive(Debug, Default, PartialEq)]
struct ModemInfo {
    state: Option<String>,
    state_failed_reason: Option<String>,
    access_techs: Vec<String>,
    sim: Option<SimId>,
    bearers: Vec<BearerId>,
    imei: Option<String>,
    operator_name: Option<String>,
    operator_code: Option<String>,
    registration_state: Option<String>,
}

/// mmcli prints `--` for values it does not know.
fn known(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "--")
        .map(str::to_string)
}

fn known_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|values| values.iter().filter_map(known).collect())
        .unwrap_or_default()
}

/// `/org/freedesktop/ModemManager1/Bearer/3` -> `3`
fn object_index(path: &str) -> Option<usize> {
    path.rsplit('/').next()?.parse().ok()
}

fn parse_version(str: &str) -> Result<String> {
    str.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .ok_or_else(|| eyre!("unexpected mmcli --version output: {str}"))
}

fn parse_mmcli_modem_list(str: &str) -> Vec<Modem> {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^/org/freedesktop/ModemManager\d+/Modem/(?P<id>\d+)\s+\[(?P<vendor>[^\]]+)]\s+(?P<model>.+)$").unwrap()
    });

    str.trim()
        .lines()
        .map(|line| line.trim())
        .filter(|line| line.starts_with("/org/freedesktop"))
        .filter_map(|line| {
            let captures = RE.captures(line)?;
            let id = captures.name("id")?.as_str().parse::<usize>().ok()?;
            let vendor = captures.name("vendor")?.as_str().to_string();
            let model = captures.name("model")?.as_str().to_string();

            Some(Modem {
                id: ModemId::from(id),
                vendor,
                model,
            })
        })
        .collect()
}

fn parse_modem_info(str: &str) -> Result<ModemInfo> {
    let json: Value = serde_json::from_str(str)?;
    let generic = &json["modem"]["generic"];
    let gpp = &json["modem"]["3gpp"];

    let sim = known(&generic["sim"])
        .and_then(|path| object_index(&path))
        .map(SimId::from);

    let bearers = known_list(&generic["bearers"])
        .iter()
        .filter_map(|path| object_index(path))
        .map(BearerId::from)
        .collect();

    Ok(ModemInfo {
        state: known(&generic["state"]),
        state_failed_reason: known(&generic["state-failed-reason"]),
        access_techs: known_list(&generic["access-technologies"]),
        sim,
        bearers,
        imei: known(&gpp["imei"]),
        operator_name: known(&gpp["operator-name"]),
        operator_code: known(&gpp["operator-code"]),
        registration_state: known(&gpp["registration-state"]),
    })
}

fn parse_sim_identity(str: &str) -> Result<SimIdentity> {
    let json: Value = serde_json::from_str(str)?;
    let props = &json["sim"]["properties"];

    let sim_identifier =
        known(&props["iccid"]).ok_or_else(|| jerr!("sim.properties.iccid"))?;

    let imsi = known(&props["imsi"]).ok_or_else(|| jerr!("sim.properties.imsi"))?;

    Ok(SimIdentity {
        sim_identifier,
        imsi,
        operator_identifier: known(&props["operator-code"]).unwrap_or_default(),
        operator_name: known(&props["operator-name"]).unwrap_or_default(),
    })
}

fn parse_location(str: &str) -> Result<Location> {
    let json: Value = serde_json::from_str(str)?;
    let location = &json["modem"]["location"];
    if location.is_null() {
        return Err(jerr!("modem.location"));
    }

    let gpp = &location["3gpp"];
    let gps = &location["gps"];

    // Some mmcli versions print the NMEA trace as one string.
    let nmea = match &gps["nmea"] {
        Value::String(trace) => trace
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "--")
            .map(str::to_string)
            .collect(),
        other => known_list(other),
    };

    Ok(Location {
        cid: known(&gpp["cid"]),
        lac: known(&gpp["lac"]),
        tac: known(&gpp["tac"]),
        nmea,
        utc: known(&gps["utc"]),
    })
}

/// Sections of `--signal-get` in the order ModemManager reports them.
const SIGNAL_SECTIONS: [&str; 6] = ["cdma1x", "evdo", "gsm", "umts", "lte", "5g"];

fn parse_signal(str: &str) -> Result<Vec<SignalSample>> {
    let json: Value = serde_json::from_str(str)?;
    let signal = &json["modem"]["signal"];
    if signal.is_null() {
        return Err(jerr!("modem.signal"));
    }

    let samples = SIGNAL_SECTIONS
        .iter()
        .filter_map(|access_tech| {
            let section = &signal[*access_tech];
            let get = |field: &str| -> Option<f64> {
                known(&section[field]).and_then(|v| v.parse().ok())
            };

            let sample = SignalSample {
                access_tech: access_tech.to_string(),
                rssi: get("rssi"),
                rsrp: get("rsrp"),
                snr: get("snr"),
                sinr: get("sinr"),
                rsrq: get("rsrq"),
            };

            let reported =
                [sample.rssi, sample.rsrp, sample.snr, sample.sinr, sample.rsrq]
                    .iter()
                    .any(Option::is_some);

            reported.then_some(sample)
        })
        .collect();

    Ok(samples)
}
