//! History file formats.
//!
//! Two encodings of the same logical record shape (a key plus its ordered
//! lines):
//!
//! - [`HistoryFormat::Flat`]: the plain text layout older installs wrote.
//!   A key line `low-high`, the log's lines, then a blank line. Decoding
//!   treats any non-empty line containing [`KEY_SEPARATOR`] as the start of a
//!   new record, so a content line or identity containing `-` is mis-read as
//!   a key boundary. That ambiguity is kept as-is for compatibility.
//! - [`HistoryFormat::Json`]: a JSON document with explicit participants and
//!   lines. Unambiguous for any identity or content; the default.
//!
//! Both are pure string transforms. Reading and writing the file is done by
//! `peerchat-client`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use peerchat_types::{ConversationKey, Identity, KEY_SEPARATOR};

use crate::store::ConversationStore;

/// Current version of the JSON history document.
pub const JSON_VERSION: u32 = 1;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON encoding or decoding failed.
    #[error("json history error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON document has a version we don't understand.
    #[error("unsupported history version: {0}")]
    UnsupportedVersion(u32),

    /// Unknown format name.
    #[error("unknown history format: {0}")]
    UnknownFormat(String),
}

/// On-disk layout of the history file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFormat {
    /// Key line, content lines, blank line. Ambiguous on `-`.
    Flat,
    /// Structured JSON records.
    #[default]
    Json,
}

impl fmt::Display for HistoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryFormat::Flat => f.write_str("flat"),
            HistoryFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for HistoryFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" | "text" => Ok(HistoryFormat::Flat),
            "json" => Ok(HistoryFormat::Json),
            other => Err(CodecError::UnknownFormat(other.to_string())),
        }
    }
}

/// Result of decoding a history file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// The rebuilt store.
    pub store: ConversationStore,
    /// Non-empty lines that could not be attached to any conversation
    /// (content before the first key line, or keys with no lines).
    pub skipped_lines: usize,
}

impl HistoryFormat {
    /// Encode a whole store.
    pub fn encode(self, store: &ConversationStore) -> Result<String, CodecError> {
        match self {
            HistoryFormat::Flat => Ok(encode_flat(store)),
            HistoryFormat::Json => encode_json(store),
        }
    }

    /// Decode a whole store.
    pub fn decode(self, text: &str) -> Result<Decoded, CodecError> {
        match self {
            HistoryFormat::Flat => Ok(decode_flat(text)),
            HistoryFormat::Json => decode_json(text),
        }
    }
}

// ===========================================
// Flat text
// ===========================================

/// Write every record as key line, content lines, blank line.
pub fn encode_flat(store: &ConversationStore) -> String {
    let mut out = String::new();
    for (key, lines) in store.iter() {
        out.push_str(&key.to_string());
        out.push('\n');
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Parse the flat layout back.
///
/// A record is committed when the next key line (or end of input) is
/// reached, and only if it collected at least one line. A later record with
/// the same key replaces the earlier one.
pub fn decode_flat(text: &str) -> Decoded {
    let mut decoded = Decoded::default();
    let mut current: Option<ConversationKey> = None;
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some((a, b)) = line.split_once(KEY_SEPARATOR) {
            commit(&mut decoded, current.take(), std::mem::take(&mut lines));
            current = Some(ConversationKey::new(&Identity::from(a), &Identity::from(b)));
        } else if current.is_some() {
            lines.push(line.to_string());
        } else {
            decoded.skipped_lines += 1;
        }
    }
    commit(&mut decoded, current, lines);

    decoded
}

fn commit(decoded: &mut Decoded, key: Option<ConversationKey>, lines: Vec<String>) {
    match key {
        Some(key) if !lines.is_empty() => decoded.store.insert_log(key, lines),
        Some(_) => decoded.skipped_lines += 1,
        None => {}
    }
}

// ===========================================
// JSON
// ===========================================

#[derive(Serialize, Deserialize)]
struct JsonHistory {
    version: u32,
    conversations: Vec<JsonRecord>,
}

#[derive(Serialize, Deserialize)]
struct JsonRecord {
    participants: [Identity; 2],
    lines: Vec<String>,
}

/// Encode as a pretty-printed JSON document.
pub fn encode_json(store: &ConversationStore) -> Result<String, CodecError> {
    let doc = JsonHistory {
        version: JSON_VERSION,
        conversations: store
            .iter()
            .map(|(key, lines)| JsonRecord {
                participants: [key.low().clone(), key.high().clone()],
                lines: lines.to_vec(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Decode a JSON document. Records naming the same pair are concatenated in
/// document order.
pub fn decode_json(text: &str) -> Result<Decoded, CodecError> {
    let mut decoded = Decoded::default();
    if text.trim().is_empty() {
        return Ok(decoded);
    }

    let doc: JsonHistory = serde_json::from_str(text)?;
    if doc.version != JSON_VERSION {
        return Err(CodecError::UnsupportedVersion(doc.version));
    }

    for record in doc.conversations {
        let [a, b] = record.participants;
        let key = ConversationKey::new(&a, &b);
        for line in record.lines {
            decoded.store.append_line(key.clone(), line);
        }
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::from(name)
    }

    fn alice_bob_store() -> ConversationStore {
        let mut store = ConversationStore::new();
        store.add_message(&id("alice"), &id("bob"), "hi");
        store.add_message(&id("bob"), &id("alice"), "yo");
        store
    }

    // ===========================================
    // Flat Format Tests
    // ===========================================

    #[test]
    fn flat_layout_matches_expected_text() {
        let mut store = alice_bob_store();
        store.add_message(&id("carol"), &id("dave"), "hey");

        let text = encode_flat(&store);
        assert_eq!(text, "alice-bob\nalice: hi\nbob: yo\n\ncarol-dave\ncarol: hey\n\n");
    }

    #[test]
    fn flat_roundtrip_preserves_keys_and_order() {
        let mut store = alice_bob_store();
        store.add_message(&id("carol"), &id("alice"), "hello there");

        let decoded = decode_flat(&encode_flat(&store));
        assert_eq!(decoded.store, store);
        assert_eq!(decoded.skipped_lines, 0);
    }

    #[test]
    fn flat_content_with_separator_is_misread_as_key() {
        // Known limitation of the flat layout.
        let mut store = ConversationStore::new();
        store.add_message(&id("alice"), &id("bob"), "well-known");

        let decoded = decode_flat(&encode_flat(&store));
        assert_ne!(decoded.store, store);
        // "alice-bob" gets no lines and is dropped; the content line became a key.
        let alice_bob = ConversationKey::new(&id("alice"), &id("bob"));
        assert!(decoded.store.log(&alice_bob).is_none());
        assert_eq!(decoded.skipped_lines, 2);
    }

    #[test]
    fn flat_skips_lines_before_first_key() {
        let decoded = decode_flat("orphan: line\nalice-bob\nalice: hi\n");
        assert_eq!(decoded.skipped_lines, 1);
        assert_eq!(decoded.store.total_lines(), 1);
    }

    #[test]
    fn flat_tolerates_crlf_and_missing_trailing_blank() {
        let decoded = decode_flat("alice-bob\r\nalice: hi\r\nbob: yo");
        let key = ConversationKey::new(&id("alice"), &id("bob"));
        assert_eq!(
            decoded.store.log(&key).unwrap(),
            &["alice: hi".to_string(), "bob: yo".to_string()]
        );
    }

    #[test]
    fn flat_later_duplicate_key_replaces_earlier() {
        let decoded = decode_flat("alice-bob\nalice: one\n\nbob-alice\nbob: two\n");
        let key = ConversationKey::new(&id("alice"), &id("bob"));
        assert_eq!(decoded.store.log(&key).unwrap(), &["bob: two".to_string()]);
    }

    #[test]
    fn flat_empty_input_is_empty_store() {
        let decoded = decode_flat("");
        assert!(decoded.store.is_empty());
    }

    // ===========================================
    // JSON Format Tests
    // ===========================================

    #[test]
    fn json_roundtrip_handles_separator_everywhere() {
        let mut store = ConversationStore::new();
        store.add_message(&id("a-b"), &id("c"), "x-y-z");
        store.add_message(&id("a"), &id("b-c"), "line - with dashes");

        let text = encode_json(&store).unwrap();
        let decoded = decode_json(&text).unwrap();
        assert_eq!(decoded.store, store);
        assert_eq!(decoded.store.len(), 2);
    }

    #[test]
    fn json_empty_file_is_empty_store() {
        assert!(decode_json("  \n").unwrap().store.is_empty());
    }

    #[test]
    fn json_rejects_unknown_version() {
        let text = r#"{"version": 99, "conversations": []}"#;
        assert!(matches!(
            decode_json(text),
            Err(CodecError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn json_rejects_garbage() {
        assert!(matches!(decode_json("alice-bob\n"), Err(CodecError::Json(_))));
    }

    // ===========================================
    // Format Selection Tests
    // ===========================================

    #[test]
    fn format_parses_from_name() {
        assert_eq!("flat".parse::<HistoryFormat>().unwrap(), HistoryFormat::Flat);
        assert_eq!("JSON".parse::<HistoryFormat>().unwrap(), HistoryFormat::Json);
        assert!("xml".parse::<HistoryFormat>().is_err());
        assert_eq!(HistoryFormat::default(), HistoryFormat::Json);
    }

    #[test]
    fn both_formats_agree_on_plain_history() {
        let store = alice_bob_store();
        for format in [HistoryFormat::Flat, HistoryFormat::Json] {
            let text = format.encode(&store).unwrap();
            assert_eq!(format.decode(&text).unwrap().store, store, "{}", format);
        }
    }
}
