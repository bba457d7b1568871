//! App configuration persisted as individual key-value entries.

use anyhow::Result;

use shared::settings::AppConfig;
use shared::types::{Platform, SubscriptionStatus};

use crate::kv::KeyValueStore;

const ONBOARDING_KEY: &str = "onboarding_complete";
const ENVIRONMENT_KEY: &str = "environment_profile";
const PLATFORM_KEY: &str = "platform";
const SUB_STATUS_KEY: &str = "sub_status";
const TRIAL_END_KEY: &str = "trial_end";

/// Trial length in unix millis.
pub const TRIAL_DURATION_MS: i64 = 10 * 24 * 60 * 60 * 1000;

pub struct ConfigStore<S> {
    store: S,
}

impl<S: KeyValueStore> ConfigStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unreadable or missing entries fall back to defaults; configuration
    /// is never a reason to refuse to start.
    pub fn load(&self) -> AppConfig {
        AppConfig {
            onboarding_complete: self
                .store
                .get(ONBOARDING_KEY)
                .is_some_and(|v| v == "true"),
            environment_profile: self.store.get(ENVIRONMENT_KEY),
            platform: self
                .store
                .get(PLATFORM_KEY)
                .and_then(|s| Platform::parse(&s)),
            subscription: self
                .store
                .get(SUB_STATUS_KEY)
                .and_then(|s| SubscriptionStatus::parse(&s))
                .unwrap_or_default(),
            trial_end: self.store.get(TRIAL_END_KEY).and_then(|s| s.parse().ok()),
        }
    }

    pub fn save(&mut self, config: &AppConfig) -> Result<()> {
        self.store
            .set(ONBOARDING_KEY, if config.onboarding_complete { "true" } else { "false" })?;
        match &config.environment_profile {
            Some(profile) => self.store.set(ENVIRONMENT_KEY, profile)?,
            None => self.store.remove(ENVIRONMENT_KEY),
        }
        match config.platform {
            Some(platform) => self.store.set(PLATFORM_KEY, platform.as_str())?,
            None => self.store.remove(PLATFORM_KEY),
        }
        self.store
            .set(SUB_STATUS_KEY, config.subscription.as_str())?;
        match config.trial_end {
            Some(end) => self.store.set(TRIAL_END_KEY, &end.to_string())?,
            None => self.store.remove(TRIAL_END_KEY),
        }
        Ok(())
    }

    /// Begins the free trial, stamping its end time.
    pub fn start_trial(&mut self, config: &mut AppConfig, now_ms: i64) -> Result<()> {
        config.subscription = SubscriptionStatus::Trial;
        config.trial_end = Some(now_ms + TRIAL_DURATION_MS);
        self.save(config)
    }

    /// Re-evaluates the subscription against the clock. A lapsed trial
    /// becomes Expired and is persisted immediately; the transition is
    /// one-way so winding the clock back does not restore access.
    pub fn refresh_subscription(
        &mut self,
        config: &mut AppConfig,
        now_ms: i64,
    ) -> Result<SubscriptionStatus> {
        if config.subscription == SubscriptionStatus::Trial {
            let lapsed = config.trial_end.is_none_or(|end| end <= now_ms);
            if lapsed {
                config.subscription = SubscriptionStatus::Expired;
                self.save(config)?;
            }
        }
        Ok(config.subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn test_defaults_when_empty() {
        let config = ConfigStore::new(MemoryStore::new()).load();
        assert!(!config.onboarding_complete);
        assert_eq!(config.platform, None);
        assert_eq!(config.subscription, SubscriptionStatus::None);
    }

    #[test]
    fn test_round_trip() {
        let mut store = ConfigStore::new(MemoryStore::new());
        let config = AppConfig {
            onboarding_complete: true,
            environment_profile: Some("Ubuntu 24.04, 16GB RAM".to_string()),
            platform: Some(Platform::Linux),
            subscription: SubscriptionStatus::Subscribed,
            trial_end: None,
        };
        store.save(&config).unwrap();
        let loaded = store.load();
        assert!(loaded.onboarding_complete);
        assert_eq!(loaded.environment_profile.as_deref(), Some("Ubuntu 24.04, 16GB RAM"));
        assert_eq!(loaded.platform, Some(Platform::Linux));
        assert_eq!(loaded.subscription, SubscriptionStatus::Subscribed);
    }

    #[test]
    fn test_trial_expiry_is_one_way() {
        let mut store = ConfigStore::new(MemoryStore::new());
        let mut config = AppConfig::default();
        store.start_trial(&mut config, 1_000).unwrap();
        assert_eq!(config.subscription, SubscriptionStatus::Trial);

        let after_end = 1_000 + TRIAL_DURATION_MS + 1;
        let status = store.refresh_subscription(&mut config, after_end).unwrap();
        assert_eq!(status, SubscriptionStatus::Expired);

        // winding the clock back does not bring the trial back
        let status = store.refresh_subscription(&mut config, 0).unwrap();
        assert_eq!(status, SubscriptionStatus::Expired);
        assert_eq!(store.load().subscription, SubscriptionStatus::Expired);
    }

    #[test]
    fn test_trial_still_active_before_end() {
        let mut store = ConfigStore::new(MemoryStore::new());
        let mut config = AppConfig::default();
        store.start_trial(&mut config, 1_000).unwrap();
        let status = store.refresh_subscription(&mut config, 2_000).unwrap();
        assert_eq!(status, SubscriptionStatus::Trial);
    }
}
