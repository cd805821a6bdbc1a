// src/decoder.rs
use serde_json::{Map, Value, json};

use crate::codec;
use crate::smart_poster;
use crate::types::{NdefRecord, Tnf};

pub const ACTIVITY_NDEF_DISCOVERED: &str = "nfc-ndef-discovered";
pub const ACTIVITY_DIAL: &str = "dial";
pub const ACTIVITY_NEW: &str = "new";
pub const ACTIVITY_IMPORT: &str = "import";

/// The activity envelope handed to the platform launcher. Exactly one
/// semantic shape populates `data`; keys that are absent carry no
/// meaning downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOptions {
    pub name: String,
    pub data: Map<String, Value>,
}

impl ActivityOptions {
    fn new(name: &str) -> ActivityOptions {
        ActivityOptions {
            name: name.to_string(),
            data: Map::new(),
        }
    }

    fn with_data(name: &str, data: Map<String, Value>) -> ActivityOptions {
        ActivityOptions {
            name: name.to_string(),
            data,
        }
    }
}

fn records_value(records: &[NdefRecord]) -> Value {
    serde_json::to_value(records).unwrap_or_default()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Classifies one NDEF message into an activity. Only the first record
/// is decoded, except that a Smart Poster anywhere in the list takes
/// precedence over the records before it. Decode failures never escape:
/// they fold into the typeless "unknown" shape.
pub fn handle_ndef_message(records: &[NdefRecord]) -> ActivityOptions {
    let record = records
        .iter()
        .find(|r| smart_poster::is_smart_poster(r))
        .or_else(|| records.first());

    let record = match record {
        Some(record) => record,
        // an empty message classifies like a TNF Empty record
        None => {
            let mut options = ActivityOptions::new(ACTIVITY_NDEF_DISCOVERED);
            options.data = object(json!({ "type": "empty", "records": records_value(records) }));
            return options;
        }
    };

    match record.tnf {
        Tnf::Empty => attach_records(
            ActivityOptions::with_data(
                ACTIVITY_NDEF_DISCOVERED,
                object(json!({ "type": "empty" })),
            ),
            records,
        ),
        Tnf::WellKnown => decode_well_known(record, records),
        Tnf::MimeMedia => decode_mime(record, records),
        Tnf::AbsoluteUri => {
            // quirk of the format: the URI is carried in the type field
            match std::str::from_utf8(&record.record_type) {
                Ok(uri) => attach_records(
                    ActivityOptions::with_data(
                        ACTIVITY_NDEF_DISCOVERED,
                        object(json!({ "type": uri })),
                    ),
                    records,
                ),
                Err(_) => unknown(records),
            }
        }
        Tnf::ExternalType => match std::str::from_utf8(&record.record_type) {
            Ok(name) => attach_records(
                ActivityOptions::with_data(
                    ACTIVITY_NDEF_DISCOVERED,
                    object(json!({ "type": name })),
                ),
                records,
            ),
            Err(_) => unknown(records),
        },
        Tnf::Unknown | Tnf::Reserved => unknown(records),
        // chunked continuation, not reassembled: no content, no records
        Tnf::Unchanged => ActivityOptions::new(ACTIVITY_NDEF_DISCOVERED),
    }
}

fn attach_records(mut options: ActivityOptions, records: &[NdefRecord]) -> ActivityOptions {
    options
        .data
        .insert("records".to_string(), records_value(records));
    options
}

/// Valid classification for content nobody can interpret; the envelope
/// still goes out, just without a type.
fn unknown(records: &[NdefRecord]) -> ActivityOptions {
    attach_records(ActivityOptions::new(ACTIVITY_NDEF_DISCOVERED), records)
}

fn decode_well_known(record: &NdefRecord, records: &[NdefRecord]) -> ActivityOptions {
    match record.record_type.as_slice() {
        b"U" => decode_uri(record, records),
        b"T" => decode_text(record, records),
        b"Sp" => decode_smart_poster(record, records),
        _ => unknown(records),
    }
}

fn decode_uri(record: &NdefRecord, records: &[NdefRecord]) -> ActivityOptions {
    let uri = match codec::expand_uri(&record.payload) {
        Some(uri) => uri,
        None => return unknown(records),
    };

    if let Some(number) = uri.strip_prefix("tel:") {
        attach_records(
            ActivityOptions::with_data(
                ACTIVITY_DIAL,
                object(json!({
                    "type": "webtelephony/number",
                    "number": number,
                    "uri": uri,
                })),
            ),
            records,
        )
    } else if uri.starts_with("mailto:") {
        attach_records(
            ActivityOptions::with_data(
                ACTIVITY_NEW,
                object(json!({ "type": "mail", "url": uri })),
            ),
            records,
        )
    } else {
        attach_records(
            ActivityOptions::with_data(
                ACTIVITY_NDEF_DISCOVERED,
                object(json!({ "type": "url", "url": uri, "rtd": "U" })),
            ),
            records,
        )
    }
}

fn decode_text(record: &NdefRecord, records: &[NdefRecord]) -> ActivityOptions {
    match codec::decode_text(&record.payload) {
        Some(decoded) => attach_records(
            ActivityOptions::with_data(
                ACTIVITY_NDEF_DISCOVERED,
                object(json!({
                    "type": "text",
                    "text": decoded.text,
                    "language": decoded.language,
                    "encoding": decoded.encoding,
                    "rtd": "T",
                })),
            ),
            records,
        ),
        None => unknown(records),
    }
}

fn decode_smart_poster(record: &NdefRecord, records: &[NdefRecord]) -> ActivityOptions {
    let poster = match smart_poster::resolve(&record.payload) {
        Some(poster) => poster,
        // structurally invalid: a well-formed but content-less envelope
        None => return ActivityOptions::new(ACTIVITY_NDEF_DISCOVERED),
    };

    let mut data = object(json!({ "type": "url", "url": poster.url }));
    if !poster.text.is_empty() {
        data.insert("text".to_string(), json!(poster.text));
    }
    if !poster.icons.is_empty() {
        let icons: Vec<Value> = poster
            .icons
            .iter()
            .map(|icon| json!({ "type": icon.mime_type, "bytes": hex::encode(&icon.bytes) }))
            .collect();
        data.insert("icons".to_string(), Value::Array(icons));
    }

    attach_records(
        ActivityOptions::with_data(ACTIVITY_NDEF_DISCOVERED, data),
        records,
    )
}

fn decode_mime(record: &NdefRecord, records: &[NdefRecord]) -> ActivityOptions {
    let mime = match std::str::from_utf8(&record.record_type) {
        Ok(mime) => mime,
        Err(_) => return unknown(records),
    };

    if mime.eq_ignore_ascii_case("text/vcard") || mime.eq_ignore_ascii_case("text/x-vcard") {
        // forwarded to the contact importer as a typed blob
        attach_records(
            ActivityOptions::with_data(
                ACTIVITY_IMPORT,
                object(json!({ "type": mime, "blob": hex::encode(&record.payload) })),
            ),
            records,
        )
    } else {
        attach_records(
            ActivityOptions::with_data(
                ACTIVITY_NDEF_DISCOVERED,
                object(json!({ "type": mime })),
            ),
            records,
        )
    }
}
