use anyhow::{Context, Result};
use clap::Args;

use scribo_core::{ai_configured, write_settings, AiSettings};

use crate::output::mask_key;
use crate::workspace::Workspace;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// AI provider (openai, anthropic, google, ollama, groq, mistral, deepseek)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// API key; empty falls back to <PROVIDER>_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// Remote analyzer base URL; empty to call the model directly
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl ConfigArgs {
    fn is_update(&self) -> bool {
        self.provider.is_some() || self.model.is_some() || self.api_key.is_some() || self.endpoint.is_some()
    }

    fn apply(self, settings: &mut AiSettings) {
        if let Some(provider) = self.provider {
            settings.provider = provider.trim().to_lowercase();
        }
        if let Some(model) = self.model {
            settings.model = model.trim().to_string();
        }
        if let Some(api_key) = self.api_key {
            settings.api_key = api_key.trim().to_string();
        }
        if let Some(endpoint) = self.endpoint {
            let endpoint = endpoint.trim();
            settings.endpoint = (!endpoint.is_empty()).then(|| endpoint.to_string());
        }
    }
}

pub fn run(workspace: &Workspace, args: ConfigArgs) -> Result<()> {
    let mut settings = workspace.settings();

    if args.is_update() {
        args.apply(&mut settings);
        write_settings(workspace.data_dir(), &settings).with_context(|| {
            format!("failed to save settings in {}", workspace.data_dir().display())
        })?;
        tracing::info!(provider = %settings.provider, model = %settings.model, "settings updated");
    }

    println!("{}", describe(&settings));
    Ok(())
}

fn describe(settings: &AiSettings) -> String {
    let or_unset = |value: &str| {
        if value.is_empty() {
            "(not set)".to_string()
        } else {
            value.to_string()
        }
    };
    let api_key = if !settings.api_key.is_empty() {
        mask_key(&settings.api_key)
    } else if !settings.resolved_api_key().is_empty() {
        format!("(from {}_API_KEY)", settings.provider.to_uppercase())
    } else {
        "(not set)".to_string()
    };

    [
        format!("provider: {}", or_unset(&settings.provider)),
        format!("model:    {}", or_unset(&settings.model)),
        format!("api key:  {api_key}"),
        format!("endpoint: {}", settings.endpoint.as_deref().unwrap_or("(direct model call)")),
        format!("configured: {}", if ai_configured(settings) { "yes" } else { "no" }),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn update_only_touches_given_fields() {
        let mut settings = AiSettings {
            provider: "openai".into(),
            api_key: "sk-old".into(),
            model: "gpt-4o".into(),
            endpoint: Some("http://localhost:5173".into()),
        };
        let args = ConfigArgs {
            model: Some(" gpt-4o-mini ".into()),
            endpoint: Some(String::new()),
            ..Default::default()
        };
        assert!(args.is_update());
        args.apply(&mut settings);

        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.api_key, "sk-old");
        assert_eq!(settings.endpoint, None);
    }

    #[test]
    fn describe_masks_the_key() {
        let settings = AiSettings {
            provider: "anthropic".into(),
            api_key: "sk-ant-secret-9876".into(),
            model: "claude-sonnet".into(),
            endpoint: None,
        };
        let text = describe(&settings);
        assert!(text.contains("api key:  ********9876"));
        assert!(!text.contains("secret"));
        assert!(text.contains("configured: yes"));
    }
}
