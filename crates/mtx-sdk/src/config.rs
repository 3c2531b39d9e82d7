use std::path::{Path, PathBuf};

use mtx_publish::GitAuthor;
use mtx_store::{ContentLayout, StoreConfig};
use mtx_sync::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Conventional configuration file name.
pub const CONFIG_FILE: &str = "microtext.toml";

/// Top-level configuration, usually read from `microtext.toml`.
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrotextConfig {
    /// Directory holding one content document per page.
    pub content_root: PathBuf,
    /// Header key holding the content tree.
    pub content_key: String,
    /// Content document extension, without the dot.
    pub extension: String,
    /// Where drafts are kept between runs. Unset keeps them in memory.
    pub drafts_file: Option<PathBuf>,
    pub publish: PublishConfig,
    pub sync: SyncConfig,
    pub interpreter: InterpreterConfig,
}

impl Default for MicrotextConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("content"),
            content_key: "content".into(),
            extension: "md".into(),
            drafts_file: Some(PathBuf::from(".microtext/drafts.json")),
            publish: PublishConfig::default(),
            sync: SyncConfig::default(),
            interpreter: InterpreterConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishBackend {
    /// Commit to the git repository containing the content root.
    #[default]
    Git,
    /// Publishing is disabled.
    None,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub backend: PublishBackend,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl PublishConfig {
    /// Commit author, if any part of it is configured.
    pub fn author(&self) -> Option<GitAuthor> {
        if self.author_name.is_none() && self.author_email.is_none() {
            return None;
        }
        let default = GitAuthor::default();
        Some(GitAuthor {
            name: self.author_name.clone().unwrap_or(default.name),
            email: self.author_email.clone().unwrap_or(default.email),
        })
    }
}

/// External program used for `interpret-instruction`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// `[program, args...]`. Empty disables instruction interpretation.
    pub command: Vec<String>,
}

impl MicrotextConfig {
    /// A configuration rooted at `content_root` with defaults otherwise.
    pub fn for_root(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Load a configuration file, resolving relative paths against its
    /// directory.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolved_against(base))
    }

    /// Make relative paths relative to `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        if self.content_root.is_relative() {
            self.content_root = base.join(&self.content_root);
        }
        if let Some(drafts) = &self.drafts_file {
            if drafts.is_relative() {
                self.drafts_file = Some(base.join(drafts));
            }
        }
        self
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            content_key: self.content_key.clone(),
        }
    }

    pub fn layout(&self) -> ContentLayout {
        ContentLayout::new(self.extension.clone())
    }

    pub(crate) fn validate(&self) -> SdkResult<()> {
        if self.content_key.trim().is_empty() {
            return Err(SdkError::Config("content_key cannot be empty".into()));
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(SdkError::Config(format!(
                "invalid extension {:?}",
                self.extension
            )));
        }
        if self.sync.max_in_flight == 0 {
            return Err(SdkError::Config("sync.max_in_flight must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = MicrotextConfig::default();
        assert_eq!(c.content_root, PathBuf::from("content"));
        assert_eq!(c.content_key, "content");
        assert_eq!(c.extension, "md");
        assert_eq!(c.publish.backend, PublishBackend::Git);
        assert_eq!(c.sync.max_in_flight, 1);
        assert!(c.interpreter.command.is_empty());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        let c = MicrotextConfig::from_toml_str(
            r#"
content_root = "site/content"
extension = "mdx"

[publish]
backend = "none"
author_name = "Editor"

[sync]
max_in_flight = 4

[interpreter]
command = ["edit-bot", "--json"]
"#,
        )
        .unwrap();
        assert_eq!(c.content_root, PathBuf::from("site/content"));
        assert_eq!(c.extension, "mdx");
        assert_eq!(c.content_key, "content");
        assert_eq!(c.publish.backend, PublishBackend::None);
        assert_eq!(c.sync.max_in_flight, 4);
        assert_eq!(c.interpreter.command, vec!["edit-bot", "--json"]);

        let author = c.publish.author().unwrap();
        assert_eq!(author.name, "Editor");
        assert_eq!(author.email, GitAuthor::default().email);
    }

    #[test]
    fn no_author_configured() {
        assert!(PublishConfig::default().author().is_none());
    }

    #[test]
    fn unknown_backend_is_config_error() {
        assert!(matches!(
            MicrotextConfig::from_toml_str("[publish]\nbackend = \"svn\"\n"),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        std::fs::write(&file, "content_root = \"pages\"\n").unwrap();

        let c = MicrotextConfig::load(&file).unwrap();
        assert_eq!(c.content_root, dir.path().join("pages"));
        assert_eq!(
            c.drafts_file,
            Some(dir.path().join(".microtext/drafts.json"))
        );
    }

    #[test]
    fn toml_roundtrip() {
        let c = MicrotextConfig::for_root("/srv/site");
        let text = c.to_toml_string().unwrap();
        assert_eq!(MicrotextConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = MicrotextConfig::default();
        c.extension = ".md".into();
        assert!(c.validate().is_err());

        let mut c = MicrotextConfig::default();
        c.sync.max_in_flight = 0;
        assert!(c.validate().is_err());
    }
}
