// Settings data models
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable rules for marking non-main tracks as extras
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierPolicy {
    /// Tracks shorter than this fraction of the main feature are extras.
    /// `None` disables the duration rule.
    pub extra_max_ratio: Option<f64>,
    /// Case-insensitive substrings of a track name that mark it as an extra
    pub extra_name_keywords: Vec<String>,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            extra_max_ratio: Some(0.25),
            extra_name_keywords: vec![
                String::from("bonus"),
                String::from("extra"),
                String::from("trailer"),
                String::from("featurette"),
                String::from("deleted"),
                String::from("behind the scenes"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RipperConfig {
    /// Program name or path of the robot-mode ripping tool
    pub makemkvcon_path: String,
    /// How long a cancelled rip gets to exit after SIGTERM before SIGKILL
    pub cancel_grace_period_ms: u64,
    pub scan_timeout_secs: u64,
    pub classifier: ClassifierPolicy,
}

impl RipperConfig {
    pub fn cancel_grace_period(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_period_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

impl Default for RipperConfig {
    fn default() -> Self {
        Self {
            makemkvcon_path: String::from("makemkvcon"),
            cancel_grace_period_ms: 5000,
            scan_timeout_secs: 600,
            classifier: ClassifierPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RipperConfig = serde_json::from_str(
            r#"{ "makemkvcon_path": "/opt/makemkv/bin/makemkvcon", "classifier": { "extra_max_ratio": null } }"#,
        )
        .unwrap();

        assert_eq!(config.makemkvcon_path, "/opt/makemkv/bin/makemkvcon");
        assert_eq!(config.cancel_grace_period(), Duration::from_secs(5));
        assert_eq!(config.scan_timeout(), Duration::from_secs(600));
        assert_eq!(config.classifier.extra_max_ratio, None);
        assert!(config
            .classifier
            .extra_name_keywords
            .contains(&"trailer".to_string()));
    }
}
