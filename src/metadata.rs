//! Typed metadata blobs.
//!
//! The source system stores open-ended structured data in free-form JSON
//! fields (`metadataRaw`). Here recognised keys get a tagged variant each,
//! with an `Other` bucket for forward-compatible extensions (spec.md §9).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PickupMetadata {
    pub pickup_tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DropMetadata {
    pub drop_tx_hash: Option<String>,
    pub courier_reward_wei: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OnchainMetadata {
    pub pickup_tx_hash: Option<String>,
    pub drop_tx_hash: Option<String>,
    pub escrow_release_tx: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EscrowMetadata {
    pub escrow_tx: Option<String>,
    pub escrowed_amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemsMetadata {
    pub line_items_json: Option<String>,
}

/// A single recognised metadata entry, or an opaque bucket for anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetadataEntry {
    Pickup(PickupMetadata),
    Drop(DropMetadata),
    Onchain(OnchainMetadata),
    Escrow(EscrowMetadata),
    Items(ItemsMetadata),
    Other(serde_json::Value),
}

/// A bag of metadata entries keyed by an arbitrary caller-chosen name,
/// persisted as JSONB. Most rows carry a handful of entries (`onchain`,
/// `escrow`, `items`); lookups are by key, insertion order is not preserved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metadata(pub BTreeMap<String, MetadataEntry>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// A one-entry metadata bag, for patching a single recognised key via a
    /// shallow JSONB merge (`metadata || patch`) without disturbing sibling
    /// keys already on the row.
    pub fn single(key: impl Into<String>, entry: MetadataEntry) -> Self {
        let mut metadata = Self::new();
        metadata.insert(key, entry);
        metadata
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: MetadataEntry) {
        self.0.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&MetadataEntry> {
        self.0.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A `Metadata::single` patch must round-trip through the same JSON
    /// shape a `metadata || patch` merge produces on the stored column —
    /// a flat `{"<key>": <value>}` merge would otherwise leave the row
    /// holding a value `Metadata`'s tagged enum can't deserialize back.
    #[test]
    fn single_patch_round_trips_through_json() {
        let patch = Metadata::single(
            "onchain",
            MetadataEntry::Onchain(OnchainMetadata {
                pickup_tx_hash: Some("0xabc".to_string()),
                ..Default::default()
            }),
        );
        let encoded = serde_json::to_value(&patch).unwrap();
        let decoded: Metadata = serde_json::from_value(encoded).unwrap();
        match decoded.get("onchain") {
            Some(MetadataEntry::Onchain(onchain)) => {
                assert_eq!(onchain.pickup_tx_hash.as_deref(), Some("0xabc"));
            }
            other => panic!("expected an onchain entry, got {other:?}"),
        }
    }

    #[test]
    fn unrecognised_keys_fall_back_to_other() {
        let raw = serde_json::json!({ "legacyField": { "kind": "other", "note": "pre-migration" } });
        let decoded: Metadata = serde_json::from_value(raw).unwrap();
        assert!(matches!(decoded.get("legacyField"), Some(MetadataEntry::Other(_))));
    }
}
