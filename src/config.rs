//! Configuration for mock entity sets.

use serde::{Deserialize, Serialize};

/// How a key property is recognized when no identity function was supplied.
///
/// With the defaults, an entity `Stock` is keyed by a field named `Id`, or
/// failing that `StockId`, compared case-insensitively.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConvention {
    /// Property name tried first.
    pub id_property: String,
    /// Suffix appended to the entity name for the second candidate.
    pub entity_suffix: String,
    pub case_insensitive: bool,
}

impl Default for KeyConvention {
    fn default() -> Self {
        Self {
            id_property: "Id".to_string(),
            entity_suffix: "Id".to_string(),
            case_insensitive: true,
        }
    }
}

impl KeyConvention {
    /// Candidate property names for an entity, in the order they are tried.
    #[must_use]
    pub fn candidates(&self, entity_name: &str) -> Vec<String> {
        vec![
            self.id_property.clone(),
            format!("{entity_name}{}", self.entity_suffix),
        ]
    }

    /// With `case_insensitive`, underscores are ignored too, so `StockId`
    /// matches `stock_id`, `stockid` and `STOCK_ID`.
    pub(crate) fn name_matches(&self, candidate: &str, field: &str) -> bool {
        if !self.case_insensitive {
            return candidate == field;
        }
        let folded = |name: &str| {
            name.chars()
                .filter(|c| *c != '_')
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        };
        folded(candidate) == folded(field)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSetConfig {
    pub key_convention: KeyConvention,
    /// Per-subscriber buffer for change streams of the implicit store.
    /// `None` means unbounded.
    pub change_stream_capacity: Option<usize>,
}

impl MockSetConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidates() {
        let conv = KeyConvention::default();
        assert_eq!(conv.candidates("Stock"), vec!["Id", "StockId"]);
        assert!(conv.name_matches("StockId", "stockid"));
    }

    #[test]
    fn test_snake_case_fields_match() {
        let conv = KeyConvention::default();
        assert!(conv.name_matches("StockId", "stock_id"));
        assert!(conv.name_matches("StockId", "STOCK_ID"));
        assert!(conv.name_matches("Id", "id"));
        assert!(!conv.name_matches("StockId", "stock_ids"));
        assert!(!conv.name_matches("Id", "entity_id"));
    }

    #[test]
    fn test_case_sensitive_convention() {
        let conv = KeyConvention {
            case_insensitive: false,
            ..KeyConvention::default()
        };
        assert!(!conv.name_matches("Id", "id"));
        assert!(!conv.name_matches("StockId", "stock_id"));
        assert!(conv.name_matches("Id", "Id"));
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = MockSetConfig::from_json_str(
            r#"{"key_convention": {"id_property": "Key"}, "change_stream_capacity": 8}"#,
        )
        .unwrap();
        assert_eq!(cfg.key_convention.id_property, "Key");
        assert_eq!(cfg.key_convention.entity_suffix, "Id");
        assert!(cfg.key_convention.case_insensitive);
        assert_eq!(cfg.change_stream_capacity, Some(8));

        let cfg = MockSetConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, MockSetConfig::default());
    }
}
