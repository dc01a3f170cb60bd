pub mod cache;
pub mod codec;
pub mod defaults;
pub mod highlight;
pub mod schema;
pub mod source;
pub mod state;
pub mod store;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use cache::{content_hash, AnalysisCache};
pub use highlight::{locate_highlights, Highlight};
pub use schema::{SchemaError, Validate};
pub use store::{FileStore, MemoryStore, Store, StoreError};

// --- Types ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct Guideline {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct ChecklistItem {
    pub id: u32,
    pub text: String,
}

/// A reported guideline failure. Without `text_verbatim` it applies to the
/// whole document rather than to located spans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuidelineViolation {
    pub guideline_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_verbatim: Option<Vec<String>>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub violations: Vec<GuidelineViolation>,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct ChecklistResult {
    pub id: u32,
    pub checked: bool,
    /// Only set for unchecked items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistAnalysisResult {
    pub results: Vec<ChecklistResult>,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Guidelines,
    Checklist,
}

impl RuleKind {
    pub const ALL: [RuleKind; 2] = [RuleKind::Guidelines, RuleKind::Checklist];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Guidelines => "guidelines",
            RuleKind::Checklist => "checklist",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ties a rule type to its kind and to the result shape the analyzer returns for it.
pub trait Rule:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    const KIND: RuleKind;
    type Outcome: Clone
        + PartialEq
        + std::fmt::Debug
        + Serialize
        + DeserializeOwned
        + Validate
        + Send
        + Sync
        + 'static;

    fn id(&self) -> u32;
    fn encode(rules: &[Self]) -> String;
    fn decode(markdown: &str) -> Vec<Self>;
}

impl Rule for Guideline {
    const KIND: RuleKind = RuleKind::Guidelines;
    type Outcome = AnalysisResult;

    fn id(&self) -> u32 {
        self.id
    }

    fn encode(rules: &[Self]) -> String {
        codec::encode_guidelines(rules)
    }

    fn decode(markdown: &str) -> Vec<Self> {
        codec::decode_guidelines(markdown)
    }
}

impl Rule for ChecklistItem {
    const KIND: RuleKind = RuleKind::Checklist;
    type Outcome = ChecklistAnalysisResult;

    fn id(&self) -> u32 {
        self.id
    }

    fn encode(rules: &[Self]) -> String {
        codec::encode_checklist(rules)
    }

    fn decode(markdown: &str) -> Vec<Self> {
        codec::decode_checklist(markdown)
    }
}

/// Next free id: one past the largest existing id, or 1 for an empty collection.
/// `None` once the largest id is `u32::MAX`.
pub fn next_id<R: Rule>(items: &[R]) -> Option<u32> {
    items.iter().map(Rule::id).max().map_or(Some(1), |max| max.checked_add(1))
}

// --- Storage root ---

/// Resolve the global data directory (~/.scribo/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scribo")
}

/// Location of the key/value store under a data directory.
pub fn store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("store")
}

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    /// Remote analyzer base URL. When unset the LLM is called in-process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl AiSettings {
    /// Stored key, falling back to `<PROVIDER>_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() || self.provider.is_empty() {
            return self.api_key.clone();
        }
        let var = format!("{}_API_KEY", self.provider.to_uppercase());
        std::env::var(var).unwrap_or_default()
    }
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

/// Settings stored under `data_dir`, or defaults when missing or unreadable.
pub fn read_settings(data_dir: &Path) -> AiSettings {
    let path = settings_path(data_dir);
    if !path.exists() {
        return AiSettings::default();
    }
    match fs::read_to_string(&path).map(|s| serde_json::from_str(&s)) {
        Ok(Ok(settings)) => settings,
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            AiSettings::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read settings");
            AiSettings::default()
        }
    }
}

pub fn write_settings(data_dir: &Path, settings: &AiSettings) -> Result<(), StoreError> {
    fs::create_dir_all(data_dir)?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(settings_path(data_dir), json)?;
    Ok(())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.resolved_api_key().is_empty())
}
