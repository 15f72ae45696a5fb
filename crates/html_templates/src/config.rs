//! Replacer configuration, loadable from TOML.
//!
//! ```toml
//! context_element = "div"
//! resource_directive = "mw:resourceloader"
//! wikitext_body_attribute = "data-mw-wikitext"
//!
//! [url]
//! protocols = ["https://", "mailto:"]
//! relative_prefixes = ["/", "./"]
//! blocked_replacement = "about:blank#NotAllowedURLProtocol"
//! ```

use html::elements::{is_raw_text_element, is_rcdata_element, is_void_element};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::url::UrlPolicy;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading a configuration file.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Validation error.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplacerConfig {
    /// Element the fragment is parsed as the children of.
    pub context_element: String,
    /// Name of the pseudo-element declaring resource module dependencies.
    pub resource_directive: String,
    /// Attribute marking an element whose children are re-run through the
    /// block-markup processor.
    pub wikitext_body_attribute: String,
    pub url: UrlPolicy,
}

impl Default for ReplacerConfig {
    fn default() -> Self {
        Self {
            context_element: "div".to_owned(),
            resource_directive: "mw:resourceloader".to_owned(),
            wikitext_body_attribute: "data-mw-wikitext".to_owned(),
            url: UrlPolicy::default(),
        }
    }
}

impl ReplacerConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` for malformed TOML or unknown keys and
    /// `ConfigError::Invalid` if validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(target: "html_templates", "loaded configuration from {}", path.display());
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_lowercase_name(&self.context_element, "context_element")?;
        let context = self.context_element.as_str();
        if is_raw_text_element(context) || is_rcdata_element(context) || is_void_element(context)
        {
            return Err(ConfigError::Invalid(format!(
                "context_element cannot be <{context}>: its children are not parsed as markup"
            )));
        }
        require_lowercase_name(&self.resource_directive, "resource_directive")?;
        require_lowercase_name(&self.wikitext_body_attribute, "wikitext_body_attribute")?;
        if self.url.protocols.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "url.protocols cannot contain an empty prefix".into(),
            ));
        }
        if self.url.relative_prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "url.relative_prefixes cannot contain an empty prefix".into(),
            ));
        }
        if self.url.blocked_replacement.is_empty() {
            return Err(ConfigError::Invalid(
                "url.blocked_replacement cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Names are matched against tokenizer output, which is ASCII-lowercased.
fn require_lowercase_name(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} cannot be empty")));
    }
    let valid = value
        .bytes()
        .all(|b| !b.is_ascii_uppercase() && !b.is_ascii_whitespace() && !b"/>=\"'<".contains(&b));
    if !valid {
        return Err(ConfigError::Invalid(format!(
            "{field} must be a lowercase tag or attribute name, got {value:?}"
        )));
    }
    Ok(())
}
