//! Availability snapshot types
//!
//! A snapshot is always replaced wholesale, never patched field by field.

use crate::util::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which update path produced a snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncChannel {
    Push,
    Pull,
}

/// Full availability state as returned by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityPayload {
    /// product_id -> available
    #[serde(default)]
    pub products: HashMap<String, bool>,
    /// ingredient_id -> available
    #[serde(default)]
    pub ingredients: HashMap<String, bool>,
}

/// Availability snapshot held by the synchronizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    pub products: HashMap<String, bool>,
    pub ingredients: HashMap<String, bool>,
    /// Wall-clock time the snapshot was obtained (unix millis)
    pub obtained_at: i64,
    /// Update path that triggered the fetch
    pub channel: SyncChannel,
}

impl AvailabilitySnapshot {
    pub fn from_payload(payload: AvailabilityPayload, channel: SyncChannel) -> Self {
        Self {
            products: payload.products,
            ingredients: payload.ingredients,
            obtained_at: now_millis(),
            channel,
        }
    }

    pub fn product(&self, id: &str) -> Option<bool> {
        self.products.get(id).copied()
    }

    pub fn ingredient(&self, id: &str) -> Option<bool> {
        self.ingredients.get(id).copied()
    }

    /// Unknown products are treated as available
    pub fn is_product_available(&self, id: &str) -> bool {
        self.product(id).unwrap_or(true)
    }

    /// Unknown ingredients are treated as available
    pub fn is_ingredient_available(&self, id: &str) -> bool {
        self.ingredient(id).unwrap_or(true)
    }

    /// IDs of ingredients flagged unavailable, sorted
    pub fn unavailable_ingredients(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .ingredients
            .iter()
            .filter(|(_, available)| !**available)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_deserialize_with_missing_sections() {
        let payload: AvailabilityPayload =
            serde_json::from_str(r#"{"products":{"p1":false}}"#).unwrap();
        assert_eq!(payload.products.get("p1"), Some(&false));
        assert!(payload.ingredients.is_empty());
    }

    #[test]
    fn test_lookup_defaults() {
        let mut payload = AvailabilityPayload::default();
        payload.products.insert("p1".to_string(), false);
        payload.ingredients.insert("i2".to_string(), false);
        payload.ingredients.insert("i1".to_string(), false);
        payload.ingredients.insert("i3".to_string(), true);

        let snapshot = AvailabilitySnapshot::from_payload(payload, SyncChannel::Pull);
        assert_eq!(snapshot.product("p1"), Some(false));
        assert_eq!(snapshot.product("p2"), None);
        assert!(!snapshot.is_product_available("p1"));
        assert!(snapshot.is_product_available("p2"));
        assert!(snapshot.is_ingredient_available("i3"));
        assert_eq!(snapshot.unavailable_ingredients(), vec!["i1", "i2"]);
        assert_eq!(snapshot.channel, SyncChannel::Pull);
    }
}
