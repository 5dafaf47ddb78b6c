//! API credential cache and acquisition.
//!
//! The secret lives only in memory for the life of the process. When a turn
//! starts without one, the host is asked through [`CredentialPrompt`]; an
//! authentication failure clears it so the next turn asks again.

use async_trait::async_trait;

/// Host-side interaction that asks the user for an API key.
///
/// Returns `None` when the user cancels.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn request_secret(&self, current: Option<&str>) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct CredentialCache {
    secret: Option<String>,
}

impl CredentialCache {
    pub fn new(seed: Option<String>) -> Self {
        let mut cache = Self::default();
        if let Some(seed) = seed {
            cache.set(seed);
        }
        cache
    }

    pub fn get(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Stores the trimmed secret. Blank input clears the cache and returns
    /// false.
    pub fn set(&mut self, secret: impl AsRef<str>) -> bool {
        let trimmed = secret.as_ref().trim();
        if trimmed.is_empty() {
            self.secret = None;
            return false;
        }
        self.secret = Some(trimmed.to_string());
        true
    }

    pub fn invalidate(&mut self) {
        if self.secret.take().is_some() {
            tracing::info!("cached API key invalidated");
        }
    }

    pub fn is_set(&self) -> bool {
        self.secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_trims_and_rejects_blank() {
        let mut cache = CredentialCache::new(Some("  sk-1 ".to_string()));
        assert_eq!(cache.get(), Some("sk-1"));

        assert!(!cache.set("   "));
        assert!(!cache.is_set());
    }

    #[test]
    fn test_invalidate_clears_secret() {
        let mut cache = CredentialCache::new(Some("sk-1".to_string()));
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }
}
