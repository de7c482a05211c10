//! Settings for genscribe.
//!
//! Settings live in `settings.toml`, looked up in this order: an explicit
//! `--config` path, the working directory, then `~/.genscribe/`. When none
//! exists the built-in defaults are used. Settings are loaded once per
//! process and never mutated afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GenscribeError, Result};
use crate::types::{ChatMessage, ResponseFormat};

/// Default settings file name.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Settings directory name under the user's home.
const SETTINGS_DIR_NAME: &str = ".genscribe";

// ---------------------------------------------------------------------------
// Settings structs (matching settings.toml schema)
// ---------------------------------------------------------------------------

/// Top-level settings document, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Model and API settings shared by both pipelines.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where logs and generated code land.
    #[serde(default)]
    pub output: OutputConfig,

    /// Fully preconfigured message list for the welcome pipeline.
    #[serde(default)]
    pub welcome_prompts: WelcomePromptsConfig,

    /// Persona and instruction for the dropdown pipeline.
    #[serde(default)]
    pub code_prompts: CodePromptsConfig,
}

/// `[general]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Response-shape hint for the welcome pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            response_format: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_api_key_env() -> String {
    "OPEN_API_KEY_ONE".into()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding the `welcome.json` and `dropdown.json` logs.
    #[serde(default = "default_responses_dir")]
    pub responses_dir: PathBuf,

    /// Directory holding the `r<N>` version directories.
    #[serde(default = "default_dropdowns_dir")]
    pub dropdowns_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            responses_dir: default_responses_dir(),
            dropdowns_dir: default_dropdowns_dir(),
        }
    }
}

impl OutputConfig {
    /// Path of the welcome log.
    pub fn welcome_log(&self) -> PathBuf {
        self.responses_dir.join("welcome.json")
    }

    /// Path of the dropdown log.
    pub fn dropdown_log(&self) -> PathBuf {
        self.responses_dir.join("dropdown.json")
    }

    /// Resolve relative directories against `base`.
    pub fn rooted_at(&self, base: &Path) -> Self {
        Self {
            responses_dir: base.join(&self.responses_dir),
            dropdowns_dir: base.join(&self.dropdowns_dir),
        }
    }
}

fn default_responses_dir() -> PathBuf {
    PathBuf::from("responses")
}
fn default_dropdowns_dir() -> PathBuf {
    PathBuf::from("dropdowns")
}

/// `[welcome_prompts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomePromptsConfig {
    #[serde(default = "default_welcome_messages")]
    pub messages: Vec<ChatMessage>,
}

impl Default for WelcomePromptsConfig {
    fn default() -> Self {
        Self {
            messages: default_welcome_messages(),
        }
    }
}

fn default_welcome_messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a friendly assistant who greets developers trying a language model API \
             for the first time.",
        ),
        ChatMessage::user("Write a short, warm welcome message for a new user."),
    ]
}

/// `[code_prompts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePromptsConfig {
    #[serde(default = "default_system_persona")]
    pub system_persona: String,

    #[serde(default = "default_user_instruction")]
    pub user_instruction: String,
}

impl Default for CodePromptsConfig {
    fn default() -> Self {
        Self {
            system_persona: default_system_persona(),
            user_instruction: default_user_instruction(),
        }
    }
}

fn default_system_persona() -> String {
    "You are a senior front-end developer who writes clean, accessible HTML and CSS.".into()
}
fn default_user_instruction() -> String {
    "Create a dropdown button. Answer with a single ```json fenced block holding an object \
     with exactly two string keys, \"HTML\" and \"CSS\"."
        .into()
}

// ---------------------------------------------------------------------------
// Settings loading
// ---------------------------------------------------------------------------

/// Get the path to the per-user settings directory (`~/.genscribe/`).
pub fn settings_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| GenscribeError::config("could not determine home directory"))?;
    Ok(home.join(SETTINGS_DIR_NAME))
}

/// Load settings, honoring an explicit path first.
///
/// An explicit path must exist. Without one, `./settings.toml` and then
/// `~/.genscribe/settings.toml` are tried; defaults apply if neither exists.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_settings_from(path);
    }

    let local = PathBuf::from(SETTINGS_FILE_NAME);
    if local.exists() {
        return load_settings_from(&local);
    }

    if let Ok(dir) = settings_dir() {
        let user = dir.join(SETTINGS_FILE_NAME);
        if user.exists() {
            return load_settings_from(&user);
        }
    }

    tracing::debug!("settings file not found, using defaults");
    Ok(Settings::default())
}

/// Load settings from a specific file path.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| GenscribeError::io(path, e))?;

    let settings: Settings = toml::from_str(&content).map_err(|e| {
        GenscribeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    tracing::debug!(path = %path.display(), model = %settings.general.model, "settings loaded");
    Ok(settings)
}

/// Write a default settings file to `path`. Refuses to replace an existing file.
pub fn init_settings(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(GenscribeError::config(format!(
            "{} already exists; remove it first to regenerate defaults",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| GenscribeError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&Settings::default())
        .map_err(|e| GenscribeError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| GenscribeError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default settings file");

    Ok(path.to_path_buf())
}

/// Reject settings that cannot produce a meaningful request.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.general.model.trim().is_empty() {
        return Err(GenscribeError::config("general.model must not be empty"));
    }
    if settings.general.timeout_secs == 0 {
        return Err(GenscribeError::config("general.timeout_secs must be positive"));
    }
    Url::parse(&settings.general.api_base).map_err(|e| {
        GenscribeError::config(format!(
            "general.api_base '{}' is not a valid URL: {e}",
            settings.general.api_base
        ))
    })?;
    if settings.welcome_prompts.messages.is_empty() {
        return Err(GenscribeError::config(
            "welcome_prompts.messages must contain at least one message",
        ));
    }
    if settings.code_prompts.system_persona.trim().is_empty()
        || settings.code_prompts.user_instruction.trim().is_empty()
    {
        return Err(GenscribeError::config(
            "code_prompts.system_persona and code_prompts.user_instruction must be set",
        ));
    }
    Ok(())
}

/// Read the API key from the env var named in the settings.
pub fn resolve_api_key(settings: &Settings) -> Result<String> {
    let var_name = &settings.general.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(GenscribeError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gs-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_settings_serialize() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).expect("serialize default settings");
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("OPEN_API_KEY_ONE"));
        assert!(toml_str.contains("system_persona"));
    }

    #[test]
    fn settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).expect("serialize");
        let parsed: Settings = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.api_key_env, "OPEN_API_KEY_ONE");
        assert_eq!(parsed.welcome_prompts.messages.len(), 2);
        assert!(parsed.general.response_format.is_none());
    }

    #[test]
    fn settings_with_prompts_and_format() {
        let toml_str = r#"
[general]
model = "gpt-4o"
response_format = { type = "json_object" }

[welcome_prompts]
messages = [
  { role = "system", content = "Reply in JSON." },
  { role = "user", content = "Greet me." },
  { role = "assistant", content = "{}" },
]

[code_prompts]
system_persona = "front-end dev"
user_instruction = "make a dropdown"
"#;
        let settings: Settings = toml::from_str(toml_str).expect("parse");
        assert_eq!(settings.general.model, "gpt-4o");
        assert_eq!(
            settings.general.response_format,
            Some(ResponseFormat::JsonObject)
        );
        assert_eq!(settings.welcome_prompts.messages.len(), 3);
        assert_eq!(settings.welcome_prompts.messages[2].role, Role::Assistant);
        assert_eq!(settings.code_prompts.user_instruction, "make a dropdown");
        assert_eq!(settings.output.dropdowns_dir, PathBuf::from("dropdowns"));
    }

    #[test]
    fn example_settings_file_is_valid() {
        let settings: Settings =
            toml::from_str(include_str!("../../../../settings.example.toml")).expect("parse");
        validate_settings(&settings).expect("valid");
        assert_eq!(
            settings.general.response_format,
            Some(ResponseFormat::JsonObject)
        );
    }

    #[test]
    fn output_paths() {
        let output = OutputConfig::default().rooted_at(Path::new("/work"));
        assert_eq!(output.welcome_log(), PathBuf::from("/work/responses/welcome.json"));
        assert_eq!(output.dropdown_log(), PathBuf::from("/work/responses/dropdown.json"));
        assert_eq!(output.dropdowns_dir, PathBuf::from("/work/dropdowns"));
    }

    #[test]
    fn validation_rejects_empty_model() {
        let mut settings = Settings::default();
        assert!(validate_settings(&settings).is_ok());

        settings.general.model = "  ".into();
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("general.model"));
    }

    #[test]
    fn validation_rejects_bad_api_base_and_empty_prompts() {
        let mut settings = Settings::default();
        settings.general.api_base = "not a url".into();
        assert!(validate_settings(&settings).is_err());

        let mut settings = Settings::default();
        settings.welcome_prompts.messages.clear();
        assert!(validate_settings(&settings).is_err());

        let mut settings = Settings::default();
        settings.code_prompts.user_instruction = String::new();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn init_writes_loadable_file_and_refuses_overwrite() {
        let dir = temp_dir();
        let path = dir.join("nested").join(SETTINGS_FILE_NAME);

        init_settings(&path).expect("init");
        let loaded = load_settings(Some(&path)).expect("load");
        assert_eq!(loaded.general.model, "gpt-4o-mini");

        assert!(init_settings(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = temp_dir();
        let path = dir.join("absent.toml");
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, GenscribeError::Io { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_settings_are_a_config_error() {
        let dir = temp_dir();
        let path = dir.join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "[general\nmodel = ").unwrap();
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, GenscribeError::Config { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn api_key_resolution() {
        let mut settings = Settings::default();
        // Use a unique env var name to avoid interfering with other tests
        settings.general.api_key_env = "GS_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&settings);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
