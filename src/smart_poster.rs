// src/smart_poster.rs
//
// A Smart Poster record carries a complete NDEF message in its payload.
// The sub-records use short well-known type tags: "U" for the single
// URI, "T" for titles, "act" for the recommended action, "Sz" for the
// content size. MIME sub-records with an image/* type are icons.
use std::collections::BTreeMap;
use std::str;

use log::debug;

use crate::types::{NdefRecord, Tnf};
use crate::{codec, ndef};

pub const RTD_URI: &[u8] = b"U";
pub const RTD_TEXT: &[u8] = b"T";
pub const RTD_ACTION: &[u8] = b"act";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterIcon {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartPoster {
    pub url: String,
    pub text: BTreeMap<String, String>,
    pub icons: Vec<PosterIcon>,
    pub action: Option<u8>,
}

/// Resolves a Smart Poster payload into its aggregate. A structurally
/// invalid poster yields `None`: more than one URI sub-record, a missing
/// URI, or two titles with the same language tag. Sub-records with any
/// other type are left inert.
pub fn resolve(payload: &[u8]) -> Option<SmartPoster> {
    let records = match ndef::parse_ndef_message(payload) {
        Ok(records) => records,
        Err(err) => {
            debug!("Smart Poster payload did not parse: {}", err);
            return None;
        }
    };

    let mut url: Option<String> = None;
    let mut text: BTreeMap<String, String> = BTreeMap::new();
    let mut icons: Vec<PosterIcon> = Vec::new();
    let mut action: Option<u8> = None;

    for record in &records {
        match (record.tnf, record.record_type.as_slice()) {
            (Tnf::WellKnown, RTD_URI) => {
                if url.is_some() {
                    debug!("Smart Poster with more than one URI sub-record");
                    return None;
                }
                url = Some(codec::expand_uri(&record.payload)?);
            }
            (Tnf::WellKnown, RTD_TEXT) => {
                let decoded = codec::decode_text(&record.payload)?;
                if text.insert(decoded.language.clone(), decoded.text).is_some() {
                    debug!("Smart Poster with duplicate title language {:?}", decoded.language);
                    return None;
                }
            }
            (Tnf::WellKnown, RTD_ACTION) => {
                if action.is_none() {
                    action = record.payload.first().copied();
                }
            }
            (Tnf::MimeMedia, mime) if mime.starts_with(b"image/") => {
                let mime_type = str::from_utf8(mime).ok()?.to_string();
                icons.push(PosterIcon {
                    mime_type,
                    bytes: record.payload.clone(),
                });
            }
            _ => {} // unsupported sub-record, bytes stay inert
        }
    }

    url.map(|url| SmartPoster {
        url,
        text,
        icons,
        action,
    })
}

pub fn is_smart_poster(record: &NdefRecord) -> bool {
    record.tnf == Tnf::WellKnown && record.record_type == b"Sp"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndef::encode_ndef_message;

    fn uri_sub_record() -> NdefRecord {
        let mut payload = vec![0x01]; // "http://www."
        payload.extend_from_slice(b"youtube.com");
        NdefRecord::new(Tnf::WellKnown, b"U", None, &payload)
    }

    fn text_sub_record(lang: &[u8], text: &str) -> NdefRecord {
        let mut payload = vec![lang.len() as u8];
        payload.extend_from_slice(lang);
        payload.extend_from_slice(text.as_bytes());
        NdefRecord::new(Tnf::WellKnown, b"T", None, &payload)
    }

    #[test]
    fn resolves_single_uri_poster() {
        let payload = encode_ndef_message(&[uri_sub_record()]);
        let poster = resolve(&payload).unwrap();
        assert_eq!(poster.url, "http://www.youtube.com");
        assert!(poster.text.is_empty());
        assert!(poster.icons.is_empty());
    }

    #[test]
    fn collects_titles_action_and_icons() {
        let icon_bytes = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let payload = encode_ndef_message(&[
            uri_sub_record(),
            text_sub_record(b"en", "Best page ever!  q#@"),
            text_sub_record(b"pl", "ąćńó"),
            NdefRecord::new(Tnf::WellKnown, b"act", None, &[0x00]),
            NdefRecord::new(Tnf::MimeMedia, b"image/png", None, &icon_bytes),
        ]);

        let poster = resolve(&payload).unwrap();
        assert_eq!(poster.url, "http://www.youtube.com");
        assert_eq!(poster.text["en"], "Best page ever!  q#@");
        assert_eq!(poster.text["pl"], "ąćńó");
        assert_eq!(poster.action, Some(0x00));
        assert_eq!(poster.icons.len(), 1);
        assert_eq!(poster.icons[0].mime_type, "image/png");
        assert_eq!(poster.icons[0].bytes, icon_bytes);
    }

    #[test]
    fn second_uri_invalidates_poster() {
        let payload = encode_ndef_message(&[uri_sub_record(), uri_sub_record()]);
        assert_eq!(resolve(&payload), None);
    }

    #[test]
    fn missing_uri_invalidates_poster() {
        let payload = encode_ndef_message(&[
            text_sub_record(b"en", "Best page ever!  q#@"),
            NdefRecord::new(Tnf::WellKnown, b"act", None, &[0x00]),
        ]);
        assert_eq!(resolve(&payload), None);
    }

    #[test]
    fn duplicate_language_invalidates_poster() {
        let payload = encode_ndef_message(&[
            uri_sub_record(),
            text_sub_record(b"en", "one"),
            text_sub_record(b"en", "two"),
        ]);
        assert_eq!(resolve(&payload), None);
    }

    #[test]
    fn unsupported_sub_records_are_ignored() {
        let payload = encode_ndef_message(&[
            uri_sub_record(),
            text_sub_record(b"en", "Best page ever!  q#@"),
            NdefRecord::new(Tnf::WellKnown, b"X", None, &[0xAB, 0xCD, 0xEF]),
        ]);

        let poster = resolve(&payload).unwrap();
        assert_eq!(poster.url, "http://www.youtube.com");
        assert_eq!(poster.text["en"], "Best page ever!  q#@");
    }

    #[test]
    fn garbage_payload_invalidates_poster() {
        assert_eq!(resolve(&[0xD1, 0x01, 0xFF]), None);
    }
}
