//! Error types for provider calls.

use apidrift_core::{GeneratorError, Provider};

/// Failures talking to an LLM provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} response contained no text")]
    EmptyResponse { provider: Provider },

    #[error("could not decode {provider} response: {source}")]
    Decode {
        provider: Provider,
        #[source]
        source: serde_json::Error,
    },

    #[error("no API key configured for {0}")]
    MissingKey(Provider),
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

impl From<LlmError> for GeneratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => GeneratorError::Transport(e.to_string()),
            LlmError::Status {
                provider,
                status,
                body,
            } => GeneratorError::Provider {
                provider: provider.to_string(),
                status,
                message: body,
            },
            e @ (LlmError::EmptyResponse { .. } | LlmError::Decode { .. }) => {
                GeneratorError::InvalidResponse(e.to_string())
            }
            LlmError::MissingKey(provider) => {
                GeneratorError::NotConfigured(format!("no API key for {provider}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_provider_error() {
        let err: GeneratorError = LlmError::Status {
            provider: Provider::Anthropic,
            status: 529,
            body: "overloaded".to_string(),
        }
        .into();
        assert_eq!(
            err,
            GeneratorError::Provider {
                provider: "anthropic".to_string(),
                status: 529,
                message: "overloaded".to_string(),
            }
        );
    }

    #[test]
    fn empty_response_maps_to_invalid_response() {
        let err: GeneratorError = LlmError::EmptyResponse {
            provider: Provider::OpenAi,
        }
        .into();
        assert!(matches!(err, GeneratorError::InvalidResponse(_)));
    }

    #[test]
    fn missing_key_maps_to_not_configured() {
        let err: GeneratorError = LlmError::MissingKey(Provider::OpenAi).into();
        assert!(matches!(err, GeneratorError::NotConfigured(_)));
        assert!(err.to_string().contains("openai"));
    }
}
