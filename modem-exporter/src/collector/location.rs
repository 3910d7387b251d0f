use crate::{
    modem_manager::Location,
    nmea::{Gga, NmeaError, Sentence},
};
use chrono::{DateTime, Days, NaiveTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    #[error("{field} {value:?} is not a hexadecimal number")]
    Hex { field: &'static str, value: String },
    #[error("skipping NMEA sentence: {0}")]
    Sentence(#[from] NmeaError),
    #[error("GPS fix time {0:?} is not a UTC time")]
    FixTime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Unix seconds of the fix, when the modem reported a usable time.
    pub time_fix: Option<i64>,
}

/// Whatever could be decoded from one location sample. Fields that failed to
/// decode are `None` and the reason is in `errors`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedLocation {
    pub cell_id: Option<u64>,
    pub lac: Option<u64>,
    pub tac: Option<u64>,
    pub fix: Option<GpsFix>,
    pub errors: Vec<DecodeError>,
}

/// Strictly hexadecimal, no prefix or sign. Values that do not fit in 64
/// bits are rejected.
pub fn decode_hex(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    u64::from_str_radix(value, 16).ok()
}

pub fn decode_location(location: &Location, now: DateTime<Utc>) -> DecodedLocation {
    let mut decoded = DecodedLocation::default();

    let mut hex = |field: &'static str, value: &Option<String>| {
        let value = value.as_deref().unwrap_or_default();
        let parsed = decode_hex(value);
        if parsed.is_none() {
            decoded.errors.push(DecodeError::Hex {
                field,
                value: value.to_string(),
            });
        }

        parsed
    };

    let cell_id = hex("cell id", &location.cid);
    let lac = hex("lac", &location.lac);
    let tac = hex("tac", &location.tac);
    decoded.cell_id = cell_id;
    decoded.lac = lac;
    decoded.tac = tac;

    let (gga, skipped) = find_fix(&location.nmea);
    decoded.errors.extend(skipped.into_iter().map(DecodeError::from));

    decoded.fix = gga.map(|gga| {
        // The sentence's own time of day stands in when the modem omits one.
        let utc = location
            .utc
            .as_deref()
            .or(Some(gga.time.as_str()).filter(|time| !time.is_empty()));
        let time_fix = match utc {
            Some(utc) => {
                let parsed = fix_time(utc, now);
                if parsed.is_none() {
                    decoded.errors.push(DecodeError::FixTime(utc.to_string()));
                }

                parsed
            }
            None => None,
        };

        GpsFix {
            latitude: gga.latitude,
            longitude: gga.longitude,
            altitude: gga.altitude,
            time_fix,
        }
    });

    decoded
}

/// Walks the trace from the most recent sentence backwards and returns the
/// first fix record found, along with the sentences that failed to parse on
/// the way.
pub fn find_fix(sentences: &[String]) -> (Option<Gga>, Vec<NmeaError>) {
    let mut skipped = Vec::new();

    for raw in sentences.iter().rev() {
        match Sentence::parse(raw) {
            Ok(Sentence::Gga(gga)) => return (Some(gga), skipped),
            Ok(Sentence::Other { .. }) => {}
            Err(e) => skipped.push(e),
        }
    }

    (None, skipped)
}

/// `hhmmss[.sss]` is the most recent such time of day not after `now`, so a
/// fix taken just before midnight and read just after lands on the previous
/// day. A full RFC 3339 timestamp is taken as is.
pub fn fix_time(raw: &str, now: DateTime<Utc>) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.timestamp());
    }

    let time = NaiveTime::parse_from_str(raw, "%H%M%S%.f").ok()?;

    let today = now.date_naive().and_time(time).and_utc();
    let fixed = if today > now {
        today.checked_sub_days(Days::new(1))?
    } else {
        today
    };

    Some(fixed.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 2024-03-14T23:00:00Z
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1710457200, 0).unwrap()
    }

    #[test]
    fn it_decodes_hex() {
        assert_eq!(decode_hex("1A2B"), Some(6699));
        assert_eq!(decode_hex("0"), Some(0));
        assert_eq!(decode_hex("FFFFFFFF"), Some(4294967295));
        assert_eq!(decode_hex("ffffffff"), Some(4294967295));
    }

    #[test]
    fn it_rejects_non_hex() {
        for value in ["", "--", "0x1A", "+1A", "-1", "1A 2B", "G1", "1FFFFFFFFFFFFFFFF"] {
            assert_eq!(decode_hex(value), None, "{value:?} should not decode");
        }
    }

    proptest! {
        #[test]
        fn hex_decoding_matches_formatting(n: u64) {
            prop_assert_eq!(decode_hex(&format!("{n:X}")), Some(n));
            prop_assert_eq!(decode_hex(&format!("{n:x}")), Some(n));
        }

        #[test]
        fn non_hex_strings_never_decode(s in "[0-9a-fA-F]{0,8}[g-zG-Z \\-]+[0-9a-fA-F]{0,8}") {
            prop_assert_eq!(decode_hex(&s), None);
        }
    }

    #[test]
    fn it_decodes_cell_location_fields_independently() {
        let location = Location {
            cid: Some("1A2B".to_string()),
            lac: Some("zz".to_string()),
            tac: None,
            ..Default::default()
        };

        let actual = decode_location(&location, now());

        assert_eq!(actual.cell_id, Some(6699));
        assert_eq!(actual.lac, None);
        assert_eq!(actual.tac, None);
        assert_eq!(actual.fix, None);
        assert_eq!(actual.errors.len(), 2);
        assert!(matches!(
            actual.errors[0],
            DecodeError::Hex { field: "lac", .. }
        ));
    }

    #[test]
    fn the_most_recent_fix_wins() {
        let sentences = vec![
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47".to_string(),
            "$GNGGA,092725.00,3352.128,S,15112.558,W,1,08,1.03,61.7,M,55.2,M,,".to_string(),
            "$GPGSA,A,1,,,,,,,,,,,,,,,*1E".to_string(),
        ];

        let (gga, skipped) = find_fix(&sentences);

        let gga = gga.unwrap();
        assert_eq!(gga.time, "092725.00");
        assert!(gga.latitude < 0.0);
        assert!(skipped.is_empty());
    }

    #[test]
    fn malformed_sentences_are_skipped() {
        let sentences = vec![
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47".to_string(),
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48".to_string(),
            "garbage".to_string(),
        ];

        let (gga, skipped) = find_fix(&sentences);

        assert_eq!(gga.unwrap().time, "123519");
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn it_decodes_a_fix_with_time() {
        let location = Location {
            cid: Some("0".to_string()),
            lac: Some("0".to_string()),
            tac: Some("0".to_string()),
            nmea: vec![
                "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
                    .to_string(),
            ],
            utc: Some("123519.00".to_string()),
        };

        let actual = decode_location(&location, now());

        let fix = actual.fix.unwrap();
        assert!((fix.latitude - 48.1173).abs() < 1e-6);
        assert!((fix.altitude - 545.4).abs() < 1e-6);
        // 2024-03-14T12:35:19Z
        assert_eq!(fix.time_fix, Some(1710419719));
        assert!(actual.errors.is_empty());
    }

    #[test]
    fn unparseable_fix_time_keeps_position() {
        let location = Location {
            cid: Some("0".to_string()),
            lac: Some("0".to_string()),
            tac: Some("0".to_string()),
            nmea: vec![
                "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
                    .to_string(),
            ],
            utc: Some("yesterday".to_string()),
        };

        let actual = decode_location(&location, now());

        let fix = actual.fix.unwrap();
        assert_eq!(fix.time_fix, None);
        assert_eq!(
            actual.errors,
            vec![DecodeError::FixTime("yesterday".to_string())]
        );
    }

    #[test]
    fn it_parses_fix_times() {
        assert_eq!(fix_time("123519", now()), Some(1710419719));
        assert_eq!(fix_time("000000.5", now()), Some(1710374400));
        assert_eq!(fix_time("2024-03-14T12:35:19Z", now()), Some(1710419719));
        assert_eq!(fix_time("2024-03-14T13:35:19+01:00", now()), Some(1710419719));
        assert_eq!(fix_time("", now()), None);
        assert_eq!(fix_time("--", now()), None);
    }

    #[test]
    fn fix_time_falls_back_to_the_sentence_time() {
        let location = Location {
            nmea: vec![
                "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
                    .to_string(),
            ],
            utc: None,
            ..Default::default()
        };

        let actual = decode_location(&location, now());

        assert_eq!(actual.fix.unwrap().time_fix, Some(1710419719));
    }

    #[test]
    fn fix_times_after_now_belong_to_the_previous_day() {
        // 2024-03-14T00:00:30Z
        let just_after_midnight = DateTime::from_timestamp(1710374430, 0).unwrap();

        // 2024-03-13T23:59:59Z
        assert_eq!(fix_time("235959", just_after_midnight), Some(1710374399));
        assert_eq!(fix_time("000030", just_after_midnight), Some(1710374430));
        assert_eq!(fix_time("000000", just_after_midnight), Some(1710374400));
    }

    #[test]
    fn decoded_locations_can_be_cloned_with_errors() {
        let location = Location {
            cid: Some("--".to_string()),
            nmea: vec!["garbage".to_string()],
            ..Default::default()
        };

        let actual = decode_location(&location, now());

        assert_eq!(actual.clone(), actual);
        assert!(actual.errors.contains(&DecodeError::Sentence(NmeaError::Malformed(
            "garbage".to_string()
        ))));
    }
}
