//! services/api/src/prompts.rs
//!
//! Prompt templates for the two AI calls, loaded from the prompts directory.

use incident_core::ports::{AdviceContext, DescriptionContext, PromptRenderer};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

pub const DESCRIPTION_FILE: &str = "image_description.txt";
pub const ADVICE_FILE: &str = "advice.txt";

const DEFAULT_DESCRIPTION: &str = r#"You are helping people report hazards and incidents in public spaces.
Describe what the attached photo shows in two or three sentences: what happened,
which hazards are visible, and how severe the situation looks.

Photo: {image_url}
Reporter's note: {user_description}

Photo metadata:
{metadata}"#;

const DEFAULT_ADVICE: &str = r#"An incident was reported with this description:
{ai_description}

Reporter's note: {user_description}

About the person who will read your advice:
{profile_text}

Give short, practical safety advice for this person in at most four sentences.
If the situation may be an emergency, tell them to contact local emergency services."#;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder pattern"))
}

/// Substitutes `{name}` placeholders. Unknown names are left untouched.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    description: String,
    advice: String,
    public_base_url: String,
}

impl PromptTemplates {
    pub fn new(description: String, advice: String, public_base_url: &str) -> Self {
        Self {
            description,
            advice,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The built-in templates.
    pub fn defaults(public_base_url: &str) -> Self {
        Self::new(
            DEFAULT_DESCRIPTION.to_string(),
            DEFAULT_ADVICE.to_string(),
            public_base_url,
        )
    }

    /// Reads both templates from `dir`, falling back to the built-in text per missing file.
    pub async fn load(dir: &Path, public_base_url: &str) -> Self {
        let description = read_template(dir, DESCRIPTION_FILE, DEFAULT_DESCRIPTION).await;
        let advice = read_template(dir, ADVICE_FILE, DEFAULT_ADVICE).await;
        Self::new(description, advice, public_base_url)
    }
}

async fn read_template(dir: &Path, file: &str, fallback: &str) -> String {
    let path = dir.join(file);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => {
            info!("Loaded prompt template {}", path.display());
            text
        }
        Err(e) => {
            warn!(
                "Prompt template {} unavailable ({}); using the built-in one",
                path.display(),
                e
            );
            fallback.to_string()
        }
    }
}

impl PromptRenderer for PromptTemplates {
    fn description_prompt(&self, ctx: &DescriptionContext<'_>) -> String {
        let image_url = format!("{}/uploads/{}", self.public_base_url, ctx.image_filename);
        render(
            &self.description,
            &[
                ("image_url", image_url.as_str()),
                ("metadata", ctx.metadata),
                ("user_description", ctx.user_description),
            ],
        )
    }

    fn advice_prompt(&self, ctx: &AdviceContext<'_>) -> String {
        render(
            &self.advice,
            &[
                ("ai_description", ctx.ai_description),
                ("profile_text", ctx.profile_text),
                ("user_description", ctx.user_description),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_known_and_keeps_unknown() {
        let out = render("{a} and {b} but not {c}", &[("a", "1"), ("b", "{a}")]);
        assert_eq!(out, "1 and {a} but not {c}");
    }

    #[test]
    fn description_prompt_has_absolute_image_url() {
        let prompts = PromptTemplates::new(
            "{image_url}\n{metadata}".to_string(),
            String::new(),
            "http://example.org/",
        );
        let prompt = prompts.description_prompt(&DescriptionContext {
            image_filename: "abc.jpg",
            metadata: "Make: Canon",
            user_description: "",
        });
        assert_eq!(prompt, "http://example.org/uploads/abc.jpg\nMake: Canon");
    }

    #[test]
    fn advice_prompt_fills_description_and_profile() {
        let prompt = PromptTemplates::defaults("http://localhost").advice_prompt(&AdviceContext {
            ai_description: "A fallen tree blocks the bike lane.",
            profile_text: "I commute by bike.",
            user_description: "",
        });
        assert!(prompt.contains("A fallen tree blocks the bike lane."));
        assert!(prompt.contains("I commute by bike."));
        assert!(!prompt.contains("{profile_text}"));
    }

    #[tokio::test]
    async fn load_falls_back_per_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(ADVICE_FILE), "custom {ai_description}")
            .await
            .unwrap();

        let prompts = PromptTemplates::load(dir.path(), "http://localhost").await;

        assert_eq!(prompts.description, DEFAULT_DESCRIPTION);
        assert_eq!(prompts.advice, "custom {ai_description}");
    }
}
