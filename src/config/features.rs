//! Feature flags configuration

use serde::Deserialize;

/// Switches for optional behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Offer guest spot dates to leads in touring countries
    #[serde(default = "default_true")]
    pub enable_tour_offers: bool,

    /// Send summaries and handoff notices to the artist
    #[serde(default = "default_true")]
    pub notify_artist: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_tour_offers: true,
            notify_artist: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_serde_defaults() {
        let from_default = FeatureFlags::default();
        let from_empty: FeatureFlags = serde_json::from_str("{}").unwrap();
        assert_eq!(from_default.enable_tour_offers, from_empty.enable_tour_offers);
        assert_eq!(from_default.notify_artist, from_empty.notify_artist);
    }

    #[test]
    fn flags_deserialize() {
        let flags: FeatureFlags = serde_json::from_str(
            r#"{ "enable_tour_offers": false, "notify_artist": false }"#,
        )
        .unwrap();
        assert!(!flags.enable_tour_offers);
        assert!(!flags.notify_artist);
    }
}
