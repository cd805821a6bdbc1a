// src/types.rs
use serde::{Deserialize, Serialize};

/// Type Name Format, the 3-bit field in every record header that decides
/// how the `type` and `payload` fields are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tnf {
    Empty,
    WellKnown,
    MimeMedia,
    AbsoluteUri,
    ExternalType,
    Unknown,
    Unchanged,
    Reserved,
}

impl Tnf {
    pub fn from_bits(bits: u8) -> Tnf {
        match bits & 0x07 {
            0x00 => Tnf::Empty,
            0x01 => Tnf::WellKnown,
            0x02 => Tnf::MimeMedia,
            0x03 => Tnf::AbsoluteUri,
            0x04 => Tnf::ExternalType,
            0x05 => Tnf::Unknown,
            0x06 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Tnf::Empty => 0x00,
            Tnf::WellKnown => 0x01,
            Tnf::MimeMedia => 0x02,
            Tnf::AbsoluteUri => 0x03,
            Tnf::ExternalType => 0x04,
            Tnf::Unknown => 0x05,
            Tnf::Unchanged => 0x06,
            Tnf::Reserved => 0x07,
        }
    }
}

// On the wire the TNF travels as its 3-bit value, not as a name.
impl Serialize for Tnf {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for Tnf {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Tnf, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Ok(Tnf::from_bits(bits))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdefRecord {
    pub tnf: Tnf,
    #[serde(rename = "type", with = "hex_bytes")]
    pub record_type: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes_opt")]
    pub id: Option<Vec<u8>>,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

impl NdefRecord {
    pub fn new(tnf: Tnf, record_type: &[u8], id: Option<&[u8]>, payload: &[u8]) -> NdefRecord {
        NdefRecord {
            tnf,
            record_type: record_type.to_vec(),
            id: id.map(|i| i.to_vec()),
            payload: payload.to_vec(),
        }
    }
}

// Byte fields travel hex-encoded inside JSON frames.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

pub mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&hex::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => hex::decode(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// One tag/peer discovery as reported by the radio daemon. The techList is
/// kept loosely typed on purpose: a shapeless list must still reach the
/// dispatcher and degrade there instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryMessage {
    #[serde(default, rename = "techList")]
    pub tech_list: serde_json::Value,
    #[serde(default)]
    pub records: Vec<NdefRecord>,
    #[serde(default, rename = "sessionToken")]
    pub session_token: Option<String>,
}

// Platform signals received over the WebSocket
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    #[serde(rename = "nfc-manager-tech-discovered")]
    TechDiscovered(DiscoveryMessage),
    #[serde(rename = "nfc-manager-tech-lost")]
    TechLost(DiscoveryMessage),
    #[serde(rename = "nfc-settings-changed")]
    SettingsChanged { enabled: bool },
    #[serde(rename = "lockscreen-appopened")]
    LockscreenOpened,
    #[serde(rename = "lockscreen-appclosed")]
    LockscreenClosed,
    #[serde(rename = "screenchange")]
    ScreenChange,
    #[serde(rename = "shrinking-sent")]
    ShrinkingSent,
    #[serde(rename = "check-p2p-registration")]
    CheckP2pRegistration {
        #[serde(rename = "manifestUrl")]
        manifest_url: String,
    },
    #[serde(rename = "p2p-registration-result")]
    P2pRegistrationResult { allowed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverCall {
    #[serde(rename = "powerOff")]
    PowerOff,
    #[serde(rename = "startPoll")]
    StartPoll,
    #[serde(rename = "stopPoll")]
    StopPoll,
}

// Requests and envelopes emitted to the platform collaborators
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    #[serde(rename = "activity")]
    Activity {
        name: String,
        data: serde_json::Value,
    },
    #[serde(rename = "event")]
    PlatformEvent { name: String },
    #[serde(rename = "vibrate")]
    Vibrate { pattern: Vec<u32> },
    #[serde(rename = "try-handover")]
    TryHandover {
        records: Vec<NdefRecord>,
        #[serde(rename = "sessionToken", skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
    },
    #[serde(rename = "driver")]
    Driver { call: DriverCall },
    #[serde(rename = "check-p2p-registration")]
    CheckP2pRegistration {
        #[serde(rename = "manifestUrl")]
        manifest_url: String,
    },
}

pub const VIBRATION_PATTERN: [u32; 3] = [25, 50, 125];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tnf_round_trips_through_bits() {
        for bits in 0u8..8 {
            assert_eq!(Tnf::from_bits(bits).bits(), bits);
        }
        // only the low 3 bits matter
        assert_eq!(Tnf::from_bits(0xD1), Tnf::WellKnown);
    }

    #[test]
    fn record_serializes_bytes_as_hex() {
        let record = NdefRecord::new(Tnf::WellKnown, b"U", None, &[0x04, 0x61]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tnf"], 1);
        assert_eq!(json["type"], "55");
        assert_eq!(json["payload"], "0461");
        assert!(json.get("id").is_none());

        let back: NdefRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn discovery_message_tolerates_shapeless_fields() {
        let msg: IncomingMessage = serde_json::from_str(
            r#"{"type":"nfc-manager-tech-discovered","techList":"invalid"}"#,
        )
        .unwrap();
        match msg {
            IncomingMessage::TechDiscovered(m) => {
                assert_eq!(m.tech_list, serde_json::json!("invalid"));
                assert!(m.records.is_empty());
                assert!(m.session_token.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
