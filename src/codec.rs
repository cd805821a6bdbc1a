// src/codec.rs
use std::str;

use lazy_static::lazy_static;

lazy_static! {
    /// URI abbreviation table from the URI Record Type Definition. The
    /// abbreviation code in the first payload byte indexes this table;
    /// entry 0 means the URI is carried literally.
    pub static ref URI_PREFIXES: Vec<&'static str> = vec![
        "",                         // 0x00
        "http://www.",              // 0x01
        "https://www.",             // 0x02
        "http://",                  // 0x03
        "https://",                 // 0x04
        "tel:",                     // 0x05
        "mailto:",                  // 0x06
        "ftp://anonymous:anonymous@", // 0x07
        "ftp://ftp.",               // 0x08
        "ftps://",                  // 0x09
        "sftp://",                  // 0x0A
        "smb://",                   // 0x0B
        "nfs://",                   // 0x0C
        "ftp://",                   // 0x0D
        "dav://",                   // 0x0E
        "news:",                    // 0x0F
        "telnet://",                // 0x10
        "imap:",                    // 0x11
        "rtsp://",                  // 0x12
        "urn:",                     // 0x13
        "pop:",                     // 0x14
        "sip:",                     // 0x15
        "sips:",                    // 0x16
        "tftp:",                    // 0x17
        "btspp://",                 // 0x18
        "btl2cap://",               // 0x19
        "btgoep://",                // 0x1A
        "tcpobex://",               // 0x1B
        "irdaobex://",              // 0x1C
        "file://",                  // 0x1D
        "urn:epc:id:",              // 0x1E
        "urn:epc:tag:",             // 0x1F
        "urn:epc:pat:",             // 0x20
        "urn:epc:raw:",             // 0x21
        "urn:epc:",                 // 0x22
        "urn:nfc:",                 // 0x23
    ];
}

/// Expands a URI record payload: [abbreviation code] + UTF-8 suffix.
/// Unrecognized codes are treated like code 0 (no prefix).
pub fn expand_uri(payload: &[u8]) -> Option<String> {
    let (&code, suffix) = payload.split_first()?;
    let prefix = URI_PREFIXES.get(code as usize).copied().unwrap_or("");
    let suffix = str::from_utf8(suffix).ok()?;
    Some(format!("{}{}", prefix, suffix))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub language: String,
    pub encoding: &'static str,
}

/// Decodes a Text record payload.
///
/// Status byte: bit 7 selects the encoding (0 = UTF-8, 1 = UTF-16),
/// bits 0-5 give the length of the ASCII language tag that follows.
pub fn decode_text(payload: &[u8]) -> Option<DecodedText> {
    let (&status, rest) = payload.split_first()?;
    let lang_len = (status & 0x3F) as usize;
    if rest.len() < lang_len {
        return None;
    }

    let language = str::from_utf8(&rest[..lang_len]).ok()?.to_string();
    let body = &rest[lang_len..];

    if status & 0x80 == 0 {
        let text = str::from_utf8(body).ok()?.to_string();
        Some(DecodedText {
            text,
            language,
            encoding: "UTF-8",
        })
    } else {
        let text = decode_utf16(body)?;
        Some(DecodedText {
            text,
            language,
            encoding: "UTF-16",
        })
    }
}

/// UTF-16 decode with byte-order-mark detection. Without a BOM the
/// content is taken as big-endian.
pub fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (little_endian, body) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        rest => (false, rest),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).ok()
}
