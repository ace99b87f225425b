//! Model endpoint and preprocessing configuration.
//!
//! These types mirror the JSON configuration objects kept in blob storage:
//! the per-slug stream configuration (active model endpoints per question
//! category plus the index name list) and the per-endpoint run configuration
//! (preprocessing settings for a trained model).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Standardize function applied when a run configuration does not name one.
pub const DEFAULT_STANDARDIZE_FUNC_NAME: &str = "standardize_anonymize";

/// A single active model endpoint behind a question category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Identifier of the training run/model version behind the endpoint.
    pub run_name: String,
    /// Tag selecting inference batching parameters.
    pub model_type: String,
}

/// The active endpoints of one question category.
///
/// Invariant: when `primary` is present it names a key of `active`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEndpoints {
    /// Endpoint name to endpoint info.
    #[serde(default)]
    pub active: BTreeMap<String, EndpointInfo>,
    /// The endpoint whose output is also surfaced as top-level fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
}

/// Question tag to the category's endpoint configuration.
pub type ModelEndpoints = BTreeMap<String, QuestionEndpoints>;

/// Per-slug entry of the stream configuration object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Short identifier for the content category.
    pub slug: String,
    /// Ordered index names for this slug. The last entry is the active
    /// write target.
    #[serde(default)]
    pub index: Vec<String>,
    /// Model endpoints per question category.
    #[serde(default)]
    pub model_endpoints: ModelEndpoints,
}

impl StreamConfig {
    /// The index currently written to for this slug.
    pub fn active_index(&self) -> Option<&str> {
        self.index.last().map(String::as_str)
    }
}

/// Per-endpoint run configuration fetched from blob storage.
///
/// A fetch failure degrades to the default value, which carries an empty
/// preprocessing config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub preprocess: PreprocessingConfig,
}

/// Preprocessing settings for one model endpoint.
///
/// `standardize_func_name` has three states that the JSON encoding must
/// preserve: absent (apply the default standardize function), explicit
/// `null` (skip standardization), and a concrete name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default = "default_standardize_func_name")]
    pub standardize_func_name: Option<String>,
    #[serde(flatten)]
    pub options: PreprocessOptions,
}

fn default_standardize_func_name() -> Option<String> {
    Some(DEFAULT_STANDARDIZE_FUNC_NAME.to_string())
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            standardize_func_name: default_standardize_func_name(),
            options: PreprocessOptions::default(),
        }
    }
}

/// Generic preprocessing options applied after standardization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_case: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_punctuation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_num_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_url_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_user_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_email_with: Option<String>,
}

impl PreprocessOptions {
    /// True when no option is set, meaning the generic preprocessing
    /// transform is skipped entirely.
    pub fn is_empty(&self) -> bool {
        self.lower_case.is_none()
            && self.remove_punctuation.is_none()
            && self.min_num_tokens.is_none()
            && self.replace_url_with.is_none()
            && self.replace_user_with.is_none()
            && self.replace_email_with.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize_func_name_defaults_when_absent() {
        let config: PreprocessingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(
            config.standardize_func_name.as_deref(),
            Some(DEFAULT_STANDARDIZE_FUNC_NAME)
        );
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_standardize_func_name_null_disables() {
        let config: PreprocessingConfig =
            serde_json::from_str(r#"{"standardize_func_name": null}"#).unwrap();
        assert_eq!(config.standardize_func_name, None);
    }

    #[test]
    fn test_options_flatten() {
        let config: PreprocessingConfig = serde_json::from_str(
            r#"{"standardize_func_name": "standardize", "lower_case": true, "replace_url_with": "<url>"}"#,
        )
        .unwrap();
        assert_eq!(config.standardize_func_name.as_deref(), Some("standardize"));
        assert_eq!(config.options.lower_case, Some(true));
        assert_eq!(config.options.replace_url_with.as_deref(), Some("<url>"));
        assert!(!config.options.is_empty());
    }

    #[test]
    fn test_run_config_empty_preprocess() {
        let run: RunConfig = serde_json::from_str(r#"{"preprocess": {}}"#).unwrap();
        assert_eq!(run, RunConfig::default());
        assert!(run.preprocess.options.is_empty());
    }

    #[test]
    fn test_stream_config_active_index() {
        let config: StreamConfig = serde_json::from_str(
            r#"{"slug": "vaccine", "index": ["project_vaccine_v1", "project_vaccine_v2"]}"#,
        )
        .unwrap();
        assert_eq!(config.active_index(), Some("project_vaccine_v2"));

        let config: StreamConfig = serde_json::from_str(r#"{"slug": "empty"}"#).unwrap();
        assert_eq!(config.active_index(), None);
    }

    #[test]
    fn test_model_endpoints_shape() {
        let endpoints: ModelEndpoints = serde_json::from_str(
            r#"{
                "sentiment": {
                    "active": {
                        "ep-sent-1": {"run_name": "run1", "model_type": "fasttext"}
                    },
                    "primary": "ep-sent-1"
                }
            }"#,
        )
        .unwrap();

        let question = &endpoints["sentiment"];
        assert_eq!(question.primary.as_deref(), Some("ep-sent-1"));
        assert_eq!(question.active["ep-sent-1"].run_name, "run1");
        assert_eq!(question.active["ep-sent-1"].model_type, "fasttext");
    }
}
