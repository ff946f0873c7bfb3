//! Catalogue of models that can be evaluated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// LLM provider serving a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => f.write_str("openai"),
            Provider::Anthropic => f.write_str("anthropic"),
        }
    }
}

/// Supported models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Model {
    Gpt41,
    Gpt4o,
    Gpt4oMini,
    O1Mini,
    O3Mini,
    O1,
    O3,
    Claude37Sonnet,
    ClaudeSonnet4,
}

impl Model {
    pub const ALL: [Model; 9] = [
        Model::Gpt41,
        Model::Gpt4o,
        Model::Gpt4oMini,
        Model::O1Mini,
        Model::O3Mini,
        Model::O1,
        Model::O3,
        Model::Claude37Sonnet,
        Model::ClaudeSonnet4,
    ];

    /// Name used on the command line and in result files.
    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Gpt41 => "gpt-4.1",
            Model::Gpt4o => "gpt-4o",
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::O1Mini => "o1-mini",
            Model::O3Mini => "o3-mini",
            Model::O1 => "o1",
            Model::O3 => "o3",
            Model::Claude37Sonnet => "claude-3-7-sonnet",
            Model::ClaudeSonnet4 => "claude-sonnet-4",
        }
    }

    /// Identifier sent to the provider API.
    pub fn api_id(&self) -> &'static str {
        match self {
            Model::Claude37Sonnet => "claude-3-7-sonnet-latest",
            Model::ClaudeSonnet4 => "claude-sonnet-4-0",
            other => other.display_name(),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Model::Claude37Sonnet | Model::ClaudeSonnet4 => Provider::Anthropic,
            _ => Provider::OpenAi,
        }
    }

    /// Reasoning models reject sampling parameters and system prompts.
    pub fn is_reasoning(&self) -> bool {
        matches!(self, Model::O1Mini | Model::O3Mini | Model::O1 | Model::O3)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a model name is not in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model '{name}' (expected one of: {expected})")]
pub struct UnknownModel {
    pub name: String,
    pub expected: String,
}

impl FromStr for Model {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Model::ALL
            .iter()
            .copied()
            .find(|m| m.display_name() == wanted || m.api_id() == wanted)
            .ok_or_else(|| UnknownModel {
                name: s.to_string(),
                expected: Model::ALL
                    .iter()
                    .map(|m| m.display_name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl TryFrom<String> for Model {
    type Error = UnknownModel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.display_name().to_string()
    }
}
