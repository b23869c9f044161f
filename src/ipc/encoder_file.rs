use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire status string for `ems22_position.json`: `"OK"`,
/// `"SPI_ERROR <detail>"` or `"FROZEN"`.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderStatus {
    Ok,
    SpiError(String),
    Frozen,
}

impl Serialize for EncoderStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let text = match self {
            EncoderStatus::Ok => "OK".to_string(),
            EncoderStatus::SpiError(detail) => format!("SPI_ERROR {detail}"),
            EncoderStatus::Frozen => "FROZEN".to_string(),
        };
        s.serialize_str(&text)
    }
}

struct StatusVisitor;
impl<'de> Visitor<'de> for StatusVisitor {
    type Value = EncoderStatus;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("\"OK\", \"SPI_ERROR <detail>\" or \"FROZEN\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<EncoderStatus, E> {
        if v == "OK" {
            Ok(EncoderStatus::Ok)
        } else if v == "FROZEN" {
            Ok(EncoderStatus::Frozen)
        } else if let Some(detail) = v.strip_prefix("SPI_ERROR ") {
            Ok(EncoderStatus::SpiError(detail.to_string()))
        } else {
            Err(de::Error::custom(format!("unrecognized encoder status: {v}")))
        }
    }
}

impl<'de> Deserialize<'de> for EncoderStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<EncoderStatus, D::Error> {
        d.deserialize_str(StatusVisitor)
    }
}

/// `ems22_position.json`, produced by the encoder daemon, consumed by
/// the feedback controller and any client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSample {
    pub ts: f64,
    pub angle: f64,
    pub raw: u16,
    pub status: EncoderStatus,
    pub calibrated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_duration: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_strings() {
        for status in [
            EncoderStatus::Ok,
            EncoderStatus::SpiError("timeout".into()),
            EncoderStatus::Frozen,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let back: EncoderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, back);
        }
    }

    #[test]
    fn spi_error_wire_format_includes_detail() {
        let json = serde_json::to_string(&EncoderStatus::SpiError("bad read".into())).unwrap();
        assert_eq!(json, "\"SPI_ERROR bad read\"");
    }
}
