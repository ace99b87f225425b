//! Text preprocessing for model inference.
//!
//! Every model endpoint names a standardize function and an optional set of
//! generic preprocessing options in its run configuration. Standardize
//! functions are resolved against a fixed registry at construction, so an
//! unknown name surfaces as a configuration error before any batch is
//! processed. The transforms themselves are pure functions over single
//! texts.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::PipelineError;
use enrich_indexer_shared::{PreprocessOptions, PreprocessingConfig};

/// A named text-standardization transform.
pub type StandardizeFn = fn(&str) -> String;

/// Look up a standardize function by its registered name.
pub fn resolve_standardize(name: &str) -> Option<StandardizeFn> {
    match name {
        "standardize" => Some(standardize),
        "standardize_anonymize" => Some(standardize_anonymize),
        _ => None,
    }
}

/// Preprocessor for one model endpoint.
///
/// Applies the endpoint's standardize function first, then the generic
/// preprocessing transform when any option is set.
#[derive(Clone)]
pub struct Preprocessor {
    standardize: Option<StandardizeFn>,
    options: PreprocessOptions,
}

impl Preprocessor {
    /// Build a preprocessor from an endpoint's run configuration.
    ///
    /// Fails fast on an unknown standardize function name so that a bad
    /// configuration never surfaces deep inside batch processing.
    pub fn from_config(config: &PreprocessingConfig) -> Result<Self, PipelineError> {
        let standardize = match &config.standardize_func_name {
            Some(name) => Some(resolve_standardize(name).ok_or_else(|| {
                PipelineError::config(format!("Unknown standardize function: {}", name))
            })?),
            None => None,
        };

        Ok(Self {
            standardize,
            options: config.options.clone(),
        })
    }

    /// Apply the configured transforms to a batch of texts.
    pub fn apply(&self, texts: &[String]) -> Vec<String> {
        texts.iter().map(|text| self.apply_one(text)).collect()
    }

    /// Apply the configured transforms to one text.
    pub fn apply_one(&self, text: &str) -> String {
        let mut text = match self.standardize {
            Some(func) => {
                debug!("Standardizing text");
                func(text)
            }
            None => text.to_string(),
        };
        if !self.options.is_empty() {
            debug!("Preprocessing text");
            text = preprocess(&text, &self.options);
        }
        text
    }
}

/// Normalize whitespace and decode the HTML entities seen in feed payloads.
pub fn standardize(text: &str) -> String {
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    collapse_whitespace(&text)
}

/// Standardize, then mask user mentions, URLs and email addresses.
pub fn standardize_anonymize(text: &str) -> String {
    let text = standardize(text);
    let text = replace_urls(&text, "<url>");
    let text = replace_users(&text, "@user");
    let text = replace_emails(&text, "<email>");
    collapse_whitespace(&text)
}

/// Apply the generic preprocessing options to one text.
///
/// Returns an empty string when the result falls below `min_num_tokens`,
/// which keeps the batch aligned with record order while giving the model
/// nothing to predict on.
pub fn preprocess(text: &str, options: &PreprocessOptions) -> String {
    let mut text = text.to_string();

    if let Some(replacement) = &options.replace_url_with {
        text = replace_urls(&text, replacement);
    }
    if let Some(replacement) = &options.replace_user_with {
        text = replace_users(&text, replacement);
    }
    if let Some(replacement) = &options.replace_email_with {
        text = replace_emails(&text, replacement);
    }
    if options.lower_case == Some(true) {
        text = text.to_lowercase();
    }
    if options.remove_punctuation == Some(true) {
        text = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    }

    let text = collapse_whitespace(&text);

    if let Some(min) = options.min_num_tokens {
        if text.split_whitespace().count() < min {
            return String::new();
        }
    }
    text
}

fn replace_urls(input: &str, replacement: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").unwrap());
    RE.replace_all(input, replacement).into_owned()
}

fn replace_users(input: &str, replacement: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").unwrap());
    RE.replace_all(input, replacement).into_owned()
}

fn replace_emails(input: &str, replacement: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap());
    RE.replace_all(input, replacement).into_owned()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_standardize_name_fails_fast() {
        let config = PreprocessingConfig {
            standardize_func_name: Some("no_such_transform".to_string()),
            options: PreprocessOptions::default(),
        };
        let result = Preprocessor::from_config(&config);
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_known_names_resolve() {
        assert!(resolve_standardize("standardize").is_some());
        assert!(resolve_standardize("standardize_anonymize").is_some());
        assert!(resolve_standardize("").is_none());
    }

    #[test]
    fn test_default_config_standardizes() {
        let preprocessor = Preprocessor::from_config(&PreprocessingConfig::default()).unwrap();
        let out = preprocessor.apply_one("so   much\n\nspace @someone https://t.co/abc");
        assert_eq!(out, "so much space @user <url>");
    }

    #[test]
    fn test_null_standardize_skips_standardization() {
        let config = PreprocessingConfig {
            standardize_func_name: None,
            options: PreprocessOptions::default(),
        };
        let preprocessor = Preprocessor::from_config(&config).unwrap();
        assert_eq!(preprocessor.apply_one("Left  as-is"), "Left  as-is");
    }

    #[test]
    fn test_standardize_decodes_entities() {
        assert_eq!(standardize("fish &amp; chips\n&lt;3"), "fish & chips <3");
    }

    #[test]
    fn test_anonymize_masks_identities() {
        let out = standardize_anonymize("ask @doc_bob or mail bob@clinic.org via www.clinic.org");
        assert_eq!(out, "ask @user or mail <email> via <url>");
    }

    #[test]
    fn test_options_applied_after_standardize() {
        let config = PreprocessingConfig {
            standardize_func_name: Some("standardize".to_string()),
            options: PreprocessOptions {
                lower_case: Some(true),
                remove_punctuation: Some(true),
                ..PreprocessOptions::default()
            },
        };
        let preprocessor = Preprocessor::from_config(&config).unwrap();
        assert_eq!(preprocessor.apply_one("Great DAY, isn't it?"), "great day isnt it");
    }

    #[test]
    fn test_min_num_tokens_blanks_short_texts() {
        let options = PreprocessOptions {
            min_num_tokens: Some(3),
            ..PreprocessOptions::default()
        };
        assert_eq!(preprocess("two words", &options), "");
        assert_eq!(preprocess("three words here", &options), "three words here");
    }

    #[test]
    fn test_apply_preserves_batch_order() {
        let preprocessor = Preprocessor::from_config(&PreprocessingConfig::default()).unwrap();
        let texts = vec!["first  one".to_string(), "second  one".to_string()];
        assert_eq!(preprocessor.apply(&texts), vec!["first one", "second one"]);
    }
}
