//! Minimal NMEA 0183 support: frames any sentence and decodes `GGA`, the
//! fix record carrying position and altitude.

use nom::{
    IResult,
    bytes::complete::{take_till1, take_while_m_n, take_while1},
    character::complete::{char, multispace0},
    combinator::{eof, opt},
    sequence::preceded,
};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NmeaError {
    #[error("malformed sentence {0:?}")]
    Malformed(String),
    #[error("checksum mismatch: expected {expected:02X}, computed {actual:02X}")]
    Checksum { expected: u8, actual: u8 },
    #[error("invalid {field} {value:?}")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(Gga),
    /// Any sentence type other than a fix record, e.g. `GSA` or `RMC`.
    Other { talker: String, kind: String },
}

impl Sentence {
    pub fn parse(raw: &str) -> Result<Self, NmeaError> {
        let malformed = || NmeaError::Malformed(raw.to_string());

        let (_, (body, checksum)) = frame(raw.trim()).map_err(|_| malformed())?;

        if let Some(expected) = checksum {
            let expected =
                u8::from_str_radix(expected, 16).map_err(|_| malformed())?;
            let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
            if expected != actual {
                return Err(NmeaError::Checksum { expected, actual });
            }
        }

        let (fields, (talker, kind)) = address(body).map_err(|_| malformed())?;
        let fields: Vec<&str> = match fields.strip_prefix(',') {
            Some(fields) => fields.split(',').collect(),
            None if fields.is_empty() => Vec::new(),
            None => return Err(malformed()),
        };

        match kind {
            "GGA" => Gga::from_fields(&fields).map(Sentence::Gga),
            _ => Ok(Sentence::Other {
                talker: talker.to_string(),
                kind: kind.to_string(),
            }),
        }
    }
}

/// Global positioning system fix data.
#[derive(Debug, Clone, PartialEq)]
pub struct Gga {
    /// `hhmmss.ss` as sent, without a date.
    pub time: String,
    /// Signed decimal degrees, south is negative.
    pub latitude: f64,
    /// Signed decimal degrees, west is negative.
    pub longitude: f64,
    /// Meters above mean sea level.
    pub altitude: f64,
}

impl Gga {
    fn from_fields(fields: &[&str]) -> Result<Self, NmeaError> {
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        Ok(Self {
            time: field(0).to_string(),
            latitude: coordinate(field(1), field(2), 'S', "latitude")?,
            longitude: coordinate(field(3), field(4), 'W', "longitude")?,
            altitude: number(field(8), "altitude")?,
        })
    }
}

/// `$<address>,<fields>*<checksum>` -> (`<address>,<fields>`, checksum)
fn frame(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, _) = char('$')(input)?;
    let (input, body) =
        take_till1(|c: char| c == '*' || c == '\r' || c == '\n')(input)?;
    let (input, checksum) = opt(preceded(
        char('*'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;

    Ok((input, (body, checksum)))
}

/// `GPGGA` -> (`GP`, `GGA`), proprietary `PMTK001` -> (`P`, `MTK001`)
fn address(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, address) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let split = if address.starts_with('P') { 1 } else { 2 };
    if address.len() <= split {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    Ok((rest, address.split_at(split)))
}

/// Empty numeric fields are what a receiver without a fix sends; they decode
/// as zero.
fn number<T>(value: &str, field: &'static str) -> Result<T, NmeaError>
where
    T: std::str::FromStr + Default,
{
    if value.is_empty() {
        return Ok(T::default());
    }

    value.parse().map_err(|_| NmeaError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// `ddmm.mmmm` (or `dddmm.mmmm`) plus hemisphere to decimal degrees.
fn coordinate(
    value: &str,
    hemisphere: &str,
    negative: char,
    field: &'static str,
) -> Result<f64, NmeaError> {
    let raw: f64 = number(value, field)?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;

    match hemisphere.chars().next() {
        Some(h) if h == negative => Ok(-decimal),
        Some('N' | 'S' | 'E' | 'W') | None => Ok(decimal),
        Some(_) => Err(NmeaError::InvalidField {
            field,
            value: format!("{value},{hemisphere}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "{actual} is not close to {expected}"
        );
    }

    #[test]
    fn it_parses_gga() {
        let raw = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

        let Sentence::Gga(gga) = Sentence::parse(raw).unwrap() else {
            panic!("expected a GGA sentence");
        };

        assert_eq!(gga.time, "123519");
        assert_close(gga.latitude, 48.1173);
        assert_close(gga.longitude, 11.516_666_666);
        assert_close(gga.altitude, 545.4);
    }

    #[test]
    fn southern_and_western_hemispheres_are_negative() {
        let raw = "$GNGGA,092725.00,3352.128,S,15112.558,W,1,08,1.03,61.7,M,55.2,M,,";

        let Sentence::Gga(gga) = Sentence::parse(raw).unwrap() else {
            panic!("expected a GGA sentence");
        };

        assert_close(gga.latitude, -33.868_8);
        assert_close(gga.longitude, -151.209_3);
    }

    #[test]
    fn gga_without_fix_decodes_as_zero() {
        let raw = "$GPGGA,,,,,,0,00,99.99,,,,,,*48";

        let Sentence::Gga(gga) = Sentence::parse(raw).unwrap() else {
            panic!("expected a GGA sentence");
        };

        assert_eq!(gga.latitude, 0.0);
        assert_eq!(gga.longitude, 0.0);
        assert_eq!(gga.altitude, 0.0);
    }

    #[test]
    fn other_sentences_are_classified_only() {
        let actual = Sentence::parse("$GPGSA,A,1,,,,,,,,,,,,,,,*1E\r\n").unwrap();

        assert_eq!(
            actual,
            Sentence::Other {
                talker: "GP".to_string(),
                kind: "GSA".to_string(),
            }
        );
    }

    #[test]
    fn proprietary_sentences_use_single_letter_talker() {
        let actual = Sentence::parse("$PMTK001,604,3").unwrap();

        assert_eq!(
            actual,
            Sentence::Other {
                talker: "P".to_string(),
                kind: "MTK001".to_string(),
            }
        );
    }

    #[test]
    fn it_rejects_bad_checksum() {
        let raw = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48";

        assert_eq!(
            Sentence::parse(raw),
            Err(NmeaError::Checksum {
                expected: 0x48,
                actual: 0x47
            })
        );
    }

    #[test]
    fn it_rejects_malformed_sentences() {
        for raw in ["", "GPGGA,1,2", "$", "$GP", "$GPGGA;1;2", "$GPGGA,1*4"] {
            assert!(
                matches!(Sentence::parse(raw), Err(NmeaError::Malformed(_))),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn it_rejects_garbage_in_gga_fields() {
        let raw = "$GPGGA,123519,48O7.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";

        assert_eq!(
            Sentence::parse(raw),
            Err(NmeaError::InvalidField {
                field: "latitude",
                value: "48O7.038".to_string(),
            })
        );
    }
}
