//! Repository cache record handed from the `pre` phase to the `post` phase

use crate::action::ActionContext;
use crate::cache::{CacheKey, RestoreOutcome};
use crate::error::FlatterResult;
use serde::{Deserialize, Serialize};

/// State name the record is stored under
pub const CACHE_RECORD_STATE: &str = "cache-record";

/// Keys used when the repository was restored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Key the repository was requested with (and will be saved under)
    pub primary_key: String,
    /// Key the cache service actually matched, if any
    pub matched_key: Option<String>,
}

impl CacheRecord {
    /// Build a record from a restore attempt
    pub fn new(primary_key: &CacheKey, outcome: &RestoreOutcome) -> Self {
        Self {
            primary_key: primary_key.to_string(),
            matched_key: outcome.matched_key().map(str::to_string),
        }
    }

    /// Key the repository should be saved under
    pub fn primary_key(&self) -> CacheKey {
        CacheKey::from(self.primary_key.as_str())
    }

    /// Reclassify the restore outcome
    pub fn outcome(&self) -> RestoreOutcome {
        RestoreOutcome::classify(&self.primary_key, self.matched_key.as_deref())
    }

    /// Persist through the context's state mechanism
    pub fn persist(&self, ctx: &dyn ActionContext) -> FlatterResult<()> {
        let json = serde_json::to_string(self)?;
        ctx.set_state(CACHE_RECORD_STATE, &json)
    }

    /// Load the record saved by an earlier phase. `None` means caching was
    /// disabled when the repository was restored.
    pub fn load(ctx: &dyn ActionContext) -> FlatterResult<Option<Self>> {
        match ctx.state(CACHE_RECORD_STATE) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
