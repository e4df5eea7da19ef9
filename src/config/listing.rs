use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Collection listing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    /// Records per page for paginated listings (1..=200).
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Maximum results returned by patient search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            search_limit: default_search_limit(),
        }
    }
}

impl ListingConfig {
    pub const MAX_PER_PAGE: usize = 200;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_page == 0 || self.per_page > Self::MAX_PER_PAGE {
            return Err(ConfigError::Validation(format!(
                "listing.per_page must be between 1 and {}, got {}",
                Self::MAX_PER_PAGE,
                self.per_page
            )));
        }
        if self.search_limit == 0 {
            return Err(ConfigError::Validation(
                "listing.search_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_per_page() -> usize {
    20
}

fn default_search_limit() -> usize {
    10
}
