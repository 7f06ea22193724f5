//! Coordination-layer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{HfsError, HfsResult};
use crate::path::normalize_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HfsConfig {
    /// Path of the tree root (default: "/")
    #[serde(default = "default_root")]
    pub root: String,

    /// Entries per page for `list_page` / `list_all` (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_root() -> String {
    "/".to_string()
}

fn default_page_size() -> usize {
    20
}

impl Default for HfsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            page_size: default_page_size(),
        }
    }
}

impl HfsConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Parses and validates a JSON document; missing fields take defaults.
    pub fn from_json(json: &str) -> HfsResult<Self> {
        let config: HfsConfig = serde_json::from_str(json)?;
        config.validate()
    }

    /// Checks the page size and normalizes the root path.
    pub fn validate(mut self) -> HfsResult<Self> {
        if self.page_size == 0 {
            return Err(HfsError::Config("page_size must be greater than zero".into()));
        }
        self.root = normalize_path(&self.root)
            .map_err(|e| HfsError::Config(format!("root: {}", e)))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HfsConfig::default();
        assert_eq!(config.root, "/");
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = HfsConfig::from_json(r#"{ "pageSize": 5 }"#).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.root, "/");

        let config = HfsConfig::from_json(r#"{ "root": "data/" }"#).unwrap();
        assert_eq!(config.root, "/data");
    }

    #[test]
    fn from_json_rejects_bad_values() {
        assert!(matches!(
            HfsConfig::from_json(r#"{ "pageSize": 0 }"#),
            Err(HfsError::Config(_))
        ));
        assert!(matches!(
            HfsConfig::from_json(r#"{ "root": "/a/../b" }"#),
            Err(HfsError::Config(_))
        ));
        assert!(matches!(HfsConfig::from_json("not json"), Err(HfsError::Config(_))));
    }
}
