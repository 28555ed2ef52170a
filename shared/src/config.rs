use crate::annotation::{AnnotationSession, ClassCatalog, DEFAULT_MIN_BOX_SIZE};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base: String,
    pub score_threshold: f64,
    pub log_lines: u32,
    pub progress_lines: u32,
    pub log_poll_ms: u32,
    pub health_poll_ms: u32,
    pub progress_poll_ms: u32,
    pub classes: Vec<String>,
    pub default_class: String,
    pub min_box_size: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".to_string(),
            score_threshold: 0.5,
            log_lines: 200,
            progress_lines: 120,
            log_poll_ms: 2500,
            health_poll_ms: 10_000,
            progress_poll_ms: 2500,
            classes: vec!["person".into(), "car".into(), "airplane".into()],
            default_class: "airplane".to_string(),
            min_box_size: DEFAULT_MIN_BOX_SIZE,
        }
    }
}

impl ClientConfig {
    /// Parses a (possibly partial) JSON override; missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base is empty".into()));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::Invalid(format!(
                "score_threshold {} outside [0, 1]",
                self.score_threshold
            )));
        }
        if self.log_poll_ms == 0 || self.health_poll_ms == 0 || self.progress_poll_ms == 0 {
            return Err(ConfigError::Invalid("poll intervals must be non-zero".into()));
        }
        if self.classes.is_empty() {
            return Err(ConfigError::Invalid("class list is empty".into()));
        }
        if !self.classes.contains(&self.default_class) {
            return Err(ConfigError::Invalid(format!(
                "default class {:?} is not in the class list",
                self.default_class
            )));
        }
        if self.min_box_size < 0.0 {
            return Err(ConfigError::Invalid("min_box_size is negative".into()));
        }
        Ok(())
    }

    pub fn catalog(&self) -> ClassCatalog {
        ClassCatalog::from_names(self.classes.iter().cloned())
    }

    pub fn annotation_session(&self) -> AnnotationSession {
        AnnotationSession::new(self.catalog(), self.default_class.clone(), self.min_box_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let config = ClientConfig::from_json(r#"{"api_base": "http://ml:9000", "log_lines": 50}"#)
            .unwrap();
        assert_eq!(config.api_base, "http://ml:9000");
        assert_eq!(config.log_lines, 50);
        assert_eq!(config.progress_poll_ms, 2500);
        assert_eq!(config.default_class, "airplane");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"score_threshold": 1.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"health_poll_ms": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"classes": ["cat"]}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(ClientConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn session_uses_configured_classes() {
        let config =
            ClientConfig::from_json(r#"{"classes": ["cat", "dog"], "default_class": "dog"}"#)
                .unwrap();
        let session = config.annotation_session();
        assert_eq!(session.selected_class_id(), 1);
        assert_eq!(session.catalog().name_of(0), Some("cat"));
    }
}
