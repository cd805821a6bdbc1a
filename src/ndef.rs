// src/ndef.rs
use thiserror::Error;

use crate::types::{NdefRecord, Tnf};

// Record header flag bits
pub const FLAG_MB: u8 = 0x80; // Message Begin
pub const FLAG_ME: u8 = 0x40; // Message End
pub const FLAG_CF: u8 = 0x20; // Chunk Flag
pub const FLAG_SR: u8 = 0x10; // Short Record
pub const FLAG_IL: u8 = 0x08; // ID Length present

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NdefError {
    #[error("empty NDEF message")]
    Empty,
    #[error("message truncated at offset {0}")]
    Truncated(usize),
}

/// Parses a full NDEF message into its records. Parsing stops after the
/// record carrying the Message End flag; chunked records (CF set) are
/// surfaced as-is, continuation is never reassembled.
pub fn parse_ndef_message(data: &[u8]) -> Result<Vec<NdefRecord>, NdefError> {
    if data.is_empty() {
        return Err(NdefError::Empty);
    }

    let mut records = Vec::new();
    let mut cursor = 0;

    while cursor < data.len() {
        let header = data[cursor];
        let tnf = Tnf::from_bits(header);
        let is_short_record = (header & FLAG_SR) != 0;
        let has_id = (header & FLAG_IL) != 0;
        let is_me = (header & FLAG_ME) != 0;
        cursor += 1;

        // 1. Type Length
        let type_len = *data.get(cursor).ok_or(NdefError::Truncated(cursor))? as usize;
        cursor += 1;

        // 2. Payload Length (1 byte for Short Record, 4 bytes otherwise)
        let payload_len = if is_short_record {
            let len = *data.get(cursor).ok_or(NdefError::Truncated(cursor))? as usize;
            cursor += 1;
            len
        } else {
            let bytes = data
                .get(cursor..cursor + 4)
                .ok_or(NdefError::Truncated(cursor))?;
            cursor += 4;
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
        };

        // 3. ID Length (if present)
        let id_len = if has_id {
            let len = *data.get(cursor).ok_or(NdefError::Truncated(cursor))? as usize;
            cursor += 1;
            len
        } else {
            0
        };

        // 4. Type
        let record_type = data
            .get(cursor..cursor + type_len)
            .ok_or(NdefError::Truncated(cursor))?
            .to_vec();
        cursor += type_len;

        // 5. ID
        let id = if has_id {
            let val = data
                .get(cursor..cursor + id_len)
                .ok_or(NdefError::Truncated(cursor))?
                .to_vec();
            cursor += id_len;
            Some(val)
        } else {
            None
        };

        // 6. Payload
        let payload = data
            .get(cursor..cursor + payload_len)
            .ok_or(NdefError::Truncated(cursor))?
            .to_vec();
        cursor += payload_len;

        records.push(NdefRecord {
            tnf,
            record_type,
            id,
            payload,
        });

        if is_me {
            break;
        }
    }

    Ok(records)
}

fn encode_record(record: &NdefRecord, mb: bool, me: bool) -> Vec<u8> {
    let short_record = record.payload.len() < 256;

    // Header: MB | ME | CF(0) | SR | IL | TNF
    let mut header = record.tnf.bits();
    if mb {
        header |= FLAG_MB;
    }
    if me {
        header |= FLAG_ME;
    }
    if short_record {
        header |= FLAG_SR;
    }
    if record.id.is_some() {
        header |= FLAG_IL;
    }

    let mut out = Vec::new();
    out.push(header);
    out.push(record.record_type.len() as u8);
    if short_record {
        out.push(record.payload.len() as u8);
    } else {
        out.extend_from_slice(&(record.payload.len() as u32).to_be_bytes());
    }
    if let Some(id) = &record.id {
        out.push(id.len() as u8);
    }
    out.extend_from_slice(&record.record_type);
    if let Some(id) = &record.id {
        out.extend_from_slice(id);
    }
    out.extend_from_slice(&record.payload);
    out
}

/// Encodes records into one NDEF message: Message Begin on the first
/// record, Message End on the last.
pub fn encode_ndef_message(records: &[NdefRecord]) -> Vec<u8> {
    let mut message = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let mb = i == 0;
        let me = i == records.len() - 1;
        message.extend(encode_record(record, mb, me));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_record(lang: &[u8], text: &str) -> NdefRecord {
        let mut payload = vec![lang.len() as u8];
        payload.extend_from_slice(lang);
        payload.extend_from_slice(text.as_bytes());
        NdefRecord::new(Tnf::WellKnown, b"T", None, &payload)
    }

    #[test]
    fn parses_single_short_record() {
        // MB|ME|SR|TNF=1, type "T", payload "\x02enhi"
        let data = [0xD1, 0x01, 0x04, 0x54, 0x02, 0x65, 0x6E, 0x68];
        let records = parse_ndef_message(&data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tnf, Tnf::WellKnown);
        assert_eq!(records[0].record_type, b"T");
        assert_eq!(records[0].payload, [0x02, 0x65, 0x6E, 0x68]);
        assert_eq!(records[0].id, None);
    }

    #[test]
    fn round_trips_multi_record_message() {
        let records = vec![
            NdefRecord::new(Tnf::WellKnown, b"U", None, &[0x01, 0x61]),
            text_record(b"en", "hello"),
            NdefRecord::new(Tnf::MimeMedia, b"image/png", Some(&[0x07]), &[1, 2, 3]),
        ];

        let wire = encode_ndef_message(&records);
        assert_eq!(wire[0] & FLAG_MB, FLAG_MB);
        assert_eq!(wire[0] & FLAG_ME, 0);

        let parsed = parse_ndef_message(&wire).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn round_trips_long_record() {
        let record = NdefRecord::new(Tnf::MimeMedia, b"application/octet-stream", None, &[0xAB; 300]);
        let wire = encode_ndef_message(std::slice::from_ref(&record));
        assert_eq!(wire[0] & FLAG_SR, 0);

        let parsed = parse_ndef_message(&wire).unwrap();
        assert_eq!(parsed, vec![record]);
    }

    #[test]
    fn stops_at_message_end_flag() {
        let records = vec![NdefRecord::new(Tnf::WellKnown, b"U", None, &[0x00, 0x61])];
        let mut wire = encode_ndef_message(&records);
        // trailing junk after the ME record is never touched
        wire.extend_from_slice(&[0xFF, 0xFF, 0xFF]);

        let parsed = parse_ndef_message(&wire).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        // claims a 9-byte payload, delivers 2
        let data = [0xD1, 0x01, 0x09, 0x54, 0x02, 0x65];
        assert!(matches!(
            parse_ndef_message(&data),
            Err(NdefError::Truncated(_))
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse_ndef_message(&[]), Err(NdefError::Empty));
    }

    #[test]
    fn non_final_record_header_matches_reference_bytes() {
        // single inner record of a composite payload: ME|SR|TNF=1
        let records = vec![
            NdefRecord::new(Tnf::WellKnown, b"U", None, &[0x01, 0x61]),
            NdefRecord::new(Tnf::WellKnown, b"X", None, &[0xAB, 0xCD, 0xEF]),
        ];
        let wire = encode_ndef_message(&records);
        let tail = &wire[wire.len() - 7..];
        assert_eq!(tail, [0x51, 0x01, 0x03, 0x58, 0xAB, 0xCD, 0xEF]);
    }
}
