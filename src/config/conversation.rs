//! Conversation configuration
//!
//! Passed to the inbound message handler at construction so tests can
//! vary thresholds without touching process state.

use serde::Deserialize;

use super::error::ValidationError;
use super::features::FeatureFlags;
use crate::domain::foundation::ChannelId;
use crate::domain::lead::QualificationPolicy;

/// Intake conversation rules
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Consecutive parse failures on one field before a person takes over
    #[serde(default = "default_parse_failure_threshold")]
    pub parse_failure_threshold: u32,

    /// Minimum gap between "still paused" replies
    #[serde(default = "default_holding_reply_interval")]
    pub holding_reply_interval_secs: i64,

    /// Budgets below this go to follow-up instead of approval
    #[serde(default = "default_min_budget_pence")]
    pub min_budget_pence: i64,

    #[serde(default = "default_home_country")]
    pub home_country: String,

    /// Countries the artist does guest spots in
    #[serde(default)]
    pub tour_countries: Vec<String>,

    /// Artist's WhatsApp number for summaries and handoff notices
    #[serde(default)]
    pub artist_channel: Option<String>,

    /// Days of client silence before a lead is abandoned or goes stale
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: i64,
}

impl ConversationConfig {
    pub fn qualification_policy(&self, features: &FeatureFlags) -> QualificationPolicy {
        QualificationPolicy {
            min_budget_pence: self.min_budget_pence,
            home_country: self.home_country.clone(),
            tour_countries: self.tour_countries.clone(),
            tour_offers_enabled: features.enable_tour_offers,
        }
    }

    /// The artist's channel, if configured and well formed.
    pub fn artist_channel_id(&self) -> Option<ChannelId> {
        self.artist_channel
            .as_deref()
            .and_then(|raw| ChannelId::new(raw).ok())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.parse_failure_threshold == 0 {
            return Err(ValidationError::InvalidFailureThreshold);
        }
        if self.holding_reply_interval_secs <= 0 {
            return Err(ValidationError::NonPositive("holding_reply_interval_secs"));
        }
        if self.min_budget_pence <= 0 {
            return Err(ValidationError::NonPositive("min_budget_pence"));
        }
        if self.inactivity_days <= 0 {
            return Err(ValidationError::NonPositive("inactivity_days"));
        }
        if let Some(raw) = &self.artist_channel {
            ChannelId::new(raw.as_str()).map_err(|_| ValidationError::InvalidChannel("artist_channel"))?;
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            parse_failure_threshold: default_parse_failure_threshold(),
            holding_reply_interval_secs: default_holding_reply_interval(),
            min_budget_pence: default_min_budget_pence(),
            home_country: default_home_country(),
            tour_countries: Vec::new(),
            artist_channel: None,
            inactivity_days: default_inactivity_days(),
        }
    }
}

fn default_parse_failure_threshold() -> u32 {
    3
}

fn default_holding_reply_interval() -> i64 {
    3600
}

fn default_min_budget_pence() -> i64 {
    15_000
}

fn default_home_country() -> String {
    "United Kingdom".to_string()
}

fn default_inactivity_days() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConversationConfig::default();
        assert_eq!(config.parse_failure_threshold, 3);
        assert_eq!(config.holding_reply_interval_secs, 3600);
        assert_eq!(config.min_budget_pence, 15_000);
        assert_eq!(config.inactivity_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let config = ConversationConfig {
            parse_failure_threshold: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidFailureThreshold));
    }

    #[test]
    fn malformed_artist_channel_is_rejected() {
        let config = ConversationConfig {
            artist_channel: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidChannel("artist_channel"))
        );
    }

    #[test]
    fn policy_carries_tour_flag() {
        let config = ConversationConfig {
            tour_countries: vec!["Germany".to_string()],
            ..Default::default()
        };
        let features = FeatureFlags {
            enable_tour_offers: false,
            ..Default::default()
        };
        let policy = config.qualification_policy(&features);
        assert!(!policy.tour_offers_enabled);
        assert_eq!(policy.tour_countries, vec!["Germany".to_string()]);
        assert_eq!(policy.home_country, "United Kingdom");
    }
}
