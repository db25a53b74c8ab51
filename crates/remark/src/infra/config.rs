//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::model::TargetLanguage;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));

/// Layered configuration loaded from defaults, user config, an explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default)]
    pub prompt: Prompt,
    #[serde(default)]
    pub api: Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub language: TargetLanguage,
    #[serde(default = "Defaults::default_model")]
    pub model: String,
}

impl Defaults {
    fn default_model() -> String {
        "gemini-2.5-flash".to_owned()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            language: TargetLanguage::default(),
            model: Self::default_model(),
        }
    }
}

/// Which files under the study folder count as notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default = "Notes::default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "Notes::default_include_hidden")]
    pub include_hidden: bool,
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Notes {
    fn default_extensions() -> Vec<String> {
        vec!["md".into()]
    }

    fn default_include_hidden() -> bool {
        true
    }
}

impl Default for Notes {
    fn default() -> Self {
        Self {
            extensions: Self::default_extensions(),
            include_hidden: Self::default_include_hidden(),
            ignore: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Prompt {
    /// Path to a minijinja template replacing the built-in prompts.
    #[serde(default)]
    pub template: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Api {
    #[serde(default = "Api::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Api {
    fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_owned()
    }
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    model: Option<String>,
    language: Option<String>,
    api_key: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            model: env::var("REMARK_MODEL").ok(),
            language: env::var("REMARK_LANGUAGE").ok(),
            api_key: env::var("GEMINI_API_KEY").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(model: &str, language: &str, api_key: &str) -> Self {
        Self {
            model: Some(model.to_owned()),
            language: Some(language.to_owned()),
            api_key: Some(api_key.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the user config, an optional explicit file, and env
    /// overrides, in increasing precedence.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let explicit = match explicit {
            Some(path) if !path.exists() => {
                anyhow::bail!("config file not found: {}", path.display())
            }
            other => other.map(Path::to_path_buf),
        };
        Self::load_with_layers(global_config_path(), explicit, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        explicit: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<ConfigLayer> = Vec::new();

        layers.push(ConfigLayer::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading user config");
            layers.push(ConfigLayer::from_file(&global_path)?);
        }

        if let Some(explicit_path) = explicit.filter(|path| path.exists()) {
            tracing::debug!(path = %explicit_path.display(), "loading explicit config");
            layers.push(ConfigLayer::from_file(&explicit_path)?);
        }

        let merged = layers
            .into_iter()
            .reduce(ConfigLayer::merge)
            .unwrap_or_default();
        apply_env_overrides(merged.resolve(), env_overrides)
    }
}

/// One config file as written, where an absent key leaves the lower layer in place.
#[derive(Debug, Default, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    defaults: DefaultsLayer,
    #[serde(default)]
    notes: NotesLayer,
    #[serde(default)]
    prompt: Prompt,
    #[serde(default)]
    api: ApiLayer,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsLayer {
    #[serde(default)]
    language: Option<TargetLanguage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotesLayer {
    #[serde(default)]
    extensions: Option<Vec<String>>,
    #[serde(default)]
    include_hidden: Option<bool>,
    #[serde(default)]
    ignore: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiLayer {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

impl ConfigLayer {
    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let layer: ConfigLayer =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(layer)
    }

    fn merge(self, overlay: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, overlay.defaults),
            notes: merge_notes(self.notes, overlay.notes),
            prompt: Prompt {
                template: overlay.prompt.template.or(self.prompt.template),
            },
            api: merge_api(self.api, overlay.api),
        }
    }

    fn resolve(self) -> Config {
        Config {
            defaults: Defaults {
                language: self.defaults.language.unwrap_or_default(),
                model: self
                    .defaults
                    .model
                    .unwrap_or_else(Defaults::default_model),
            },
            notes: Notes {
                extensions: self
                    .notes
                    .extensions
                    .unwrap_or_else(Notes::default_extensions),
                include_hidden: self
                    .notes
                    .include_hidden
                    .unwrap_or_else(Notes::default_include_hidden),
                ignore: self.notes.ignore,
            },
            prompt: self.prompt,
            api: Api {
                base_url: self.api.base_url.unwrap_or_else(Api::default_base_url),
                api_key: self.api.api_key,
            },
        }
    }
}

fn merge_defaults(mut base: DefaultsLayer, overlay: DefaultsLayer) -> DefaultsLayer {
    if let Some(language) = overlay.language {
        base.language = Some(language);
    }
    if let Some(model) = overlay.model {
        base.model = Some(model);
    }
    base
}

fn merge_notes(mut base: NotesLayer, overlay: NotesLayer) -> NotesLayer {
    if let Some(extensions) = overlay.extensions {
        base.extensions = Some(extensions);
    }
    if let Some(include_hidden) = overlay.include_hidden {
        base.include_hidden = Some(include_hidden);
    }

    let mut ignore: BTreeSet<String> = base.ignore.into_iter().collect();
    ignore.extend(overlay.ignore);
    base.ignore = ignore.into_iter().collect();
    base
}

fn merge_api(mut base: ApiLayer, overlay: ApiLayer) -> ApiLayer {
    if let Some(base_url) = overlay.base_url {
        base.base_url = Some(base_url);
    }
    if let Some(api_key) = overlay.api_key {
        base.api_key = Some(api_key);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("remark/config.toml"))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(model) = env.model {
        config.defaults.model = model;
    }
    if let Some(language) = env.language {
        config.defaults.language = language
            .parse()
            .context("invalid REMARK_LANGUAGE override")?;
    }
    if let Some(api_key) = env.api_key.filter(|key| !key.trim().is_empty()) {
        config.api.api_key = Some(api_key);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.defaults.model, "gemini-2.5-flash");
        assert_eq!(config.defaults.language, TargetLanguage::Korean);
        assert_eq!(config.notes.extensions, vec!["md".to_string()]);
        assert!(config.notes.include_hidden);
        assert!(config.api.api_key.is_none());
    }

    #[test]
    fn merge_global_and_explicit() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[defaults]
model = "gemini-2.0-pro"
[notes]
ignore = ["archive/**"]
[api]
api_key = "from-global"
"#,
        )?;

        let explicit = temp.path().join("override.toml");
        fs::write(
            &explicit,
            r#"
[defaults]
language = "english"
[notes]
extensions = ["md", "markdown"]
include_hidden = false
ignore = ["drafts/**"]
[prompt]
template = "custom.jinja"
"#,
        )?;

        let config =
            Config::load_with_layers(Some(global), Some(explicit), EnvOverrides::default())?;

        assert_eq!(config.defaults.model, "gemini-2.0-pro");
        assert_eq!(config.defaults.language, TargetLanguage::English);
        assert_eq!(config.notes.extensions, vec!["md", "markdown"]);
        assert!(!config.notes.include_hidden);
        assert!(config.notes.ignore.contains(&"archive/**".into()));
        assert!(config.notes.ignore.contains(&"drafts/**".into()));
        assert_eq!(config.prompt.template, Some(PathBuf::from("custom.jinja")));
        assert_eq!(config.api.api_key.as_deref(), Some("from-global"));

        Ok(())
    }

    #[test]
    fn explicit_layer_can_restore_default_values() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[defaults]
language = "english"
model = "gemini-2.0-pro"
[notes]
extensions = ["markdown"]
include_hidden = false
[api]
base_url = "http://localhost:8080/v1beta"
"#,
        )?;

        let explicit = temp.path().join("override.toml");
        fs::write(
            &explicit,
            r#"
[defaults]
language = "korean"
model = "gemini-2.5-flash"
[notes]
extensions = ["md"]
include_hidden = true
[api]
base_url = "https://generativelanguage.googleapis.com/v1beta"
"#,
        )?;

        let config =
            Config::load_with_layers(Some(global), Some(explicit), EnvOverrides::default())?;

        assert_eq!(config.defaults.language, TargetLanguage::Korean);
        assert_eq!(config.defaults.model, "gemini-2.5-flash");
        assert_eq!(config.notes.extensions, vec!["md".to_string()]);
        assert!(config.notes.include_hidden);
        assert_eq!(
            config.api.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests("gemini-test", "en", "secret");
        let config = Config::load_with_layers(None, None, overrides)?;
        assert_eq!(config.defaults.model, "gemini-test");
        assert_eq!(config.defaults.language, TargetLanguage::English);
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        Ok(())
    }

    #[test]
    fn unknown_language_override_is_rejected() {
        let overrides = EnvOverrides::for_tests("gemini-test", "klingon", "secret");
        assert!(Config::load_with_layers(None, None, overrides).is_err());
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        let result = ConfigLayer::from_file(&file);
        assert!(result.is_err());
        Ok(())
    }
}
