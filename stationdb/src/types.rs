// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Entity types stored by the station database, together with the
//! per-entity conflict/merge policy helpers layered on top of the
//! generic read/write cascades.

use serde::{Deserialize, Serialize};

/// An entity identifier (user, group or service bot).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored command record (contacts list, block list or mute list).
///
/// The record body is opaque to this layer; only the logical send time
/// participates in the supersession rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command name, e.g. `"contacts"`, `"block"`, `"mute"`
    pub cmd: String,
    /// Logical send time in milliseconds. Zero or negative means the
    /// sender attached no time (legacy clients).
    pub time: i64,
    /// Opaque command payload
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl Command {
    /// Build a command record with an opaque payload
    pub fn new(cmd: impl Into<String>, time: i64, extra: serde_json::Value) -> Self {
        Self {
            cmd: cmd.into(),
            time,
            extra,
        }
    }

    /// Whether the sender attached a usable logical send time
    pub fn is_timed(&self) -> bool {
        self.time > 0
    }

    /// Whether this record is strictly newer than `old`. A record that is
    /// not strictly newer must not replace the stored one.
    pub fn supersedes(&self, old: &Command) -> bool {
        self.time > old.time
    }
}

/// Logical document types carried by identity documents
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Primary identity document of a user (keys + avatar)
    Visa,
    /// Legacy name for the primary user document
    Profile,
    /// Group document
    Bulletin,
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visa => write!(f, "visa"),
            Self::Profile => write!(f, "profile"),
            Self::Bulletin => write!(f, "bulletin"),
        }
    }
}

/// A typed identity document presented by an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The entity this document describes
    pub identifier: UserId,
    /// Logical document type
    pub doc_type: DocumentType,
    /// Signing time in milliseconds; documents of the same type are
    /// ordered by this field
    pub time: i64,
    /// Opaque signed document body
    #[serde(default)]
    pub data: serde_json::Value,
    /// Base64 signature over the body
    #[serde(default)]
    pub signature: Option<String>,
}

impl Document {
    /// Whether this document is expired relative to `old`, i.e. not
    /// strictly newer by signing time
    pub fn is_expired(&self, old: &Document) -> bool {
        self.time <= old.time
    }
}

/// Find the most recent document of `doc_type` in `documents`
pub fn last_document(documents: &[Document], doc_type: DocumentType) -> Option<&Document> {
    documents
        .iter()
        .filter(|doc| doc.doc_type == doc_type)
        .max_by_key(|doc| doc.time)
}

/// A registered device of a user, addressable for push notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable device identity (push token)
    pub device_id: String,
    /// Device platform, e.g. `"ios"`, `"android"`
    #[serde(default)]
    pub platform: Option<String>,
    /// Registration time in milliseconds
    pub time: i64,
}

/// Merge a device descriptor into an existing device list.
///
/// A descriptor with a known `device_id` replaces the stored one in place;
/// an unknown descriptor is appended. Returns `None` when the list would
/// be unchanged (exact duplicate), so the caller can skip the write.
pub fn insert_device(info: DeviceInfo, devices: &[DeviceInfo]) -> Option<Vec<DeviceInfo>> {
    for (index, old) in devices.iter().enumerate() {
        if old.device_id != info.device_id {
            continue;
        }
        if *old == info {
            // duplicate descriptor, nothing to save
            return None;
        }
        let mut merged = devices.to_vec();
        merged[index] = info;
        return Some(merged);
    }
    let mut merged = devices.to_vec();
    merged.push(info);
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, time: i64) -> DeviceInfo {
        DeviceInfo {
            device_id: id.to_string(),
            platform: Some("ios".to_string()),
            time,
        }
    }

    #[test]
    fn test_command_supersession_ordering() {
        let old = Command::new("contacts", 100, serde_json::Value::Null);
        let newer = Command::new("contacts", 150, serde_json::Value::Null);
        let stale = Command::new("contacts", 50, serde_json::Value::Null);
        let untimed = Command::new("contacts", 0, serde_json::Value::Null);

        assert!(newer.supersedes(&old));
        assert!(!stale.supersedes(&old));
        assert!(!old.supersedes(&old));
        assert!(!untimed.is_timed());
    }

    #[test]
    fn test_last_document_picks_most_recent_of_type() {
        let docs = vec![
            Document {
                identifier: UserId::from("alice"),
                doc_type: DocumentType::Visa,
                time: 100,
                data: serde_json::Value::Null,
                signature: None,
            },
            Document {
                identifier: UserId::from("alice"),
                doc_type: DocumentType::Visa,
                time: 300,
                data: serde_json::Value::Null,
                signature: None,
            },
            Document {
                identifier: UserId::from("alice"),
                doc_type: DocumentType::Bulletin,
                time: 500,
                data: serde_json::Value::Null,
                signature: None,
            },
        ];
        let last = last_document(&docs, DocumentType::Visa).unwrap();
        assert_eq!(300, last.time);
        assert!(last_document(&docs, DocumentType::Profile).is_none());
    }

    #[test]
    fn test_insert_device_replaces_in_place() {
        let devices = vec![device("a", 1), device("b", 2)];

        // same identity, changed descriptor: replaced at the same position
        let merged = insert_device(device("a", 9), &devices).unwrap();
        assert_eq!(2, merged.len());
        assert_eq!(9, merged[0].time);
        assert_eq!("b", merged[1].device_id);

        // unknown identity: appended
        let merged = insert_device(device("c", 3), &devices).unwrap();
        assert_eq!(3, merged.len());
        assert_eq!("c", merged[2].device_id);

        // exact duplicate: no change to save
        assert!(insert_device(device("b", 2), &devices).is_none());
    }
}
