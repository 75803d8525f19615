//! Opaque keyset cursors.
//!
//! A cursor marks a position in a sequence ordered by `(created_at DESC, id DESC)`.
//! On the wire it is unpadded base64url of `{"createdAt": <rfc3339>, "id": <string>}`.
//! Callers must treat it as opaque. Anything that does not decode cleanly is
//! read as "no cursor", which restarts pagination from the newest row.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Accepts cursors with or without trailing `=` padding.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Tie-break key of one row: timestamp first, id second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorKey {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl CursorKey {
    pub fn new(created_at: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            created_at,
            id: id.into(),
        }
    }

    /// Whether a row with this key comes strictly after `bound` in
    /// `(created_at DESC, id DESC)` order.
    pub fn is_after(&self, bound: &CursorKey) -> bool {
        self.created_at < bound.created_at
            || (self.created_at == bound.created_at && self.id < bound.id)
    }

    /// Descending comparator for sorting rows newest first.
    pub fn descending(a: &CursorKey, b: &CursorKey) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCursor<'a> {
    created_at: String,
    id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCursor {
    created_at: String,
    id: String,
}

pub fn encode_cursor(key: &CursorKey) -> String {
    let wire = WireCursor {
        created_at: key.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        id: &key.id,
    };
    // Serializing two strings cannot fail.
    let json = serde_json::to_vec(&wire).unwrap_or_default();
    general_purpose::URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_cursor(cursor: Option<&str>) -> Option<CursorKey> {
    let cursor = cursor.map(str::trim).filter(|c| !c.is_empty())?;

    let bytes = LENIENT_URL_SAFE.decode(cursor).ok()?;
    let raw: RawCursor = serde_json::from_slice(&bytes).ok()?;
    let created_at = DateTime::parse_from_rfc3339(&raw.created_at)
        .ok()?
        .with_timezone(&Utc);

    Some(CursorKey {
        created_at,
        id: raw.id,
    })
}
