//! Prometheus text exposition format, version 0.0.4.

use super::{Catalogue, ModemIdentity, Observation};
use std::fmt::{self, Display, Formatter};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders a sweep's observations grouped by metric, in catalogue order.
/// Samples keep the order they were observed in, duplicates included.
/// Metrics without observations are left out.
pub struct Exposition<'a> {
    catalogue: &'a Catalogue,
    observations: &'a [Observation],
}

impl<'a> Exposition<'a> {
    pub fn new(catalogue: &'a Catalogue, observations: &'a [Observation]) -> Self {
        Self {
            catalogue,
            observations,
        }
    }
}

impl Display for Exposition<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for desc in self.catalogue.iter() {
            let mut samples = self
                .observations
                .iter()
                .filter(|obs| obs.metric == desc.metric)
                .peekable();

            if samples.peek().is_none() {
                continue;
            }

            writeln!(f, "# HELP {} {}", desc.name, escape_help(desc.help))?;
            writeln!(f, "# TYPE {} gauge", desc.name)?;

            for sample in samples {
                f.write_str(&desc.name)?;
                if let Some(identity) = &sample.labels {
                    write_labels(f, identity)?;
                }
                writeln!(f, " {}", Value(sample.value))?;
            }
        }

        Ok(())
    }
}

fn write_labels(f: &mut Formatter<'_>, identity: &ModemIdentity) -> fmt::Result {
    f.write_str("{")?;

    let labels = ModemIdentity::LABEL_NAMES
        .iter()
        .zip(identity.label_values());
    for (i, (name, value)) in labels.enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{name}=\"{}\"", escape_label(value))?;
    }

    f.write_str("}")
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

struct Value(f64);

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            f.write_str("NaN")
        } else if v == f64::INFINITY {
            f.write_str("+Inf")
        } else if v == f64::NEG_INFINITY {
            f.write_str("-Inf")
        } else {
            write!(f, "{v}")
        }
    }
}
