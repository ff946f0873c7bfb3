//! Command-line arguments and their validation into a [`RunConfig`].

use std::path::PathBuf;

use apidrift_core::{DispatchConfig, HarnessConfig, Model, Provider};
use apidrift_llm::client::{ANTHROPIC_ENDPOINT, OPENAI_ENDPOINT};
use apidrift_llm::LlmConfig;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "apidrift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Evaluate how well LLMs adapt code to library API changes",
    long_about = None
)]
pub struct Cli {
    /// JSON file with the API changes to evaluate
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the JSON results
    #[arg(short, long)]
    pub output: PathBuf,

    /// Models to evaluate (repeat or comma-separate)
    #[arg(short, long = "model", required = true, value_delimiter = ',')]
    pub models: Vec<Model>,

    /// OpenAI API key
    #[arg(
        short = 'a',
        long,
        env = "OPENAI_API_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub openai_api_key: String,

    /// Anthropic API key
    #[arg(
        short = 'A',
        long,
        env = "ANTHROPIC_API_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub anthropic_api_key: String,

    /// Number of units evaluated concurrently
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,

    /// Maximum failed test runs per unit before giving up
    #[arg(long, default_value_t = 15)]
    pub max_iterations: u32,

    /// Build tool entry point (default: resolved from GRADLE_HOME)
    #[arg(long)]
    pub gradle: Option<PathBuf>,

    /// Wall-clock limit per test run in seconds (0 = none)
    #[arg(long, default_value_t = 0)]
    pub test_timeout_secs: u64,

    /// Directory for the temporary test projects (default: system temp dir)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// HTTP timeout per LLM request in seconds
    #[arg(long, default_value_t = 300)]
    pub llm_timeout_secs: u64,

    /// OpenAI chat-completions endpoint
    #[arg(
        long,
        env = "APIDRIFT_OPENAI_ENDPOINT",
        default_value = OPENAI_ENDPOINT
    )]
    pub openai_endpoint: String,

    /// Anthropic messages endpoint
    #[arg(
        long,
        env = "APIDRIFT_ANTHROPIC_ENDPOINT",
        default_value = ANTHROPIC_ENDPOINT
    )]
    pub anthropic_endpoint: String,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    pub json: bool,
}

/// Reasons a run is refused before any work starts.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key provided: set --openai-api-key or --anthropic-api-key")]
    NoApiKey,

    #[error("model {model} needs an API key for {provider}")]
    MissingProviderKey { model: Model, provider: Provider },

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("--workers must be at least 1")]
    NoWorkers,

    #[error("--max-iterations must be at least 1")]
    NoIterations,
}

/// Validated settings for one evaluation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub models: Vec<Model>,
    pub llm: LlmConfig,
    pub dispatch: DispatchConfig,
    pub harness: HarnessConfig,
    pub show_progress: bool,
}

fn non_empty(key: String) -> Option<String> {
    let key = key.trim().to_string();
    (!key.is_empty()).then_some(key)
}

impl Cli {
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        let llm = LlmConfig {
            openai_api_key: non_empty(self.openai_api_key),
            anthropic_api_key: non_empty(self.anthropic_api_key),
            openai_endpoint: self.openai_endpoint,
            anthropic_endpoint: self.anthropic_endpoint,
            timeout_secs: self.llm_timeout_secs,
            ..LlmConfig::default()
        };

        if llm.openai_api_key.is_none() && llm.anthropic_api_key.is_none() {
            return Err(ConfigError::NoApiKey);
        }
        if let Some(model) = self
            .models
            .iter()
            .find(|m| llm.api_key(m.provider()).is_none())
        {
            return Err(ConfigError::MissingProviderKey {
                model: *model,
                provider: model.provider(),
            });
        }
        if !self.input.exists() {
            return Err(ConfigError::InputNotFound(self.input));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }

        let mut models = self.models;
        let mut seen = Vec::with_capacity(models.len());
        models.retain(|m| {
            let first = !seen.contains(m);
            seen.push(*m);
            first
        });

        Ok(RunConfig {
            input: self.input,
            output: self.output,
            models,
            llm,
            dispatch: DispatchConfig {
                workers: self.workers,
                max_iterations: self.max_iterations,
            },
            harness: HarnessConfig {
                build_tool: self.gradle,
                timeout_secs: self.test_timeout_secs,
                work_dir: self.work_dir,
                ..HarnessConfig::default()
            },
            show_progress: !self.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str], input: &std::path::Path) -> Cli {
        let mut args = vec![
            "apidrift".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            "out.json".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        Cli::try_parse_from(args).unwrap()
    }

    fn input_file() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn defaults() {
        let input = input_file();
        let cli = parse(&["-m", "gpt-4o", "-a", "sk-test"], input.path());
        assert_eq!(cli.workers, 4);
        assert_eq!(cli.max_iterations, 15);

        let config = cli.into_run_config().unwrap();
        assert_eq!(config.models, vec![Model::Gpt4o]);
        assert_eq!(config.dispatch, DispatchConfig::default());
        assert_eq!(config.harness.timeout_secs, 0);
        assert!(config.harness.build_tool.is_none());
        assert!(config.harness.work_dir.is_none());
        assert_eq!(config.llm.timeout_secs, 300);
        assert!(config.show_progress);
    }

    #[test]
    fn models_accept_lists_and_repeats() {
        let input = input_file();
        let cli = parse(
            &["-m", "gpt-4o,o3", "-m", "gpt-4.1", "-m", "o3", "-a", "sk"],
            input.path(),
        );
        let config = cli.into_run_config().unwrap();
        assert_eq!(config.models, vec![Model::Gpt4o, Model::O3, Model::Gpt41]);
    }

    #[test]
    fn unknown_model_is_rejected_by_parser() {
        let args = ["apidrift", "-i", "x", "-o", "y", "-m", "gpt-2"];
        let err = Cli::try_parse_from(args).unwrap_err();
        assert!(err.to_string().contains("gpt-2"));
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let input = input_file();
        let cli = parse(&["-m", "gpt-4o", "-a", "  ", "-A", ""], input.path());
        assert_eq!(cli.into_run_config().unwrap_err(), ConfigError::NoApiKey);
    }

    #[test]
    fn model_needs_its_provider_key() {
        let input = input_file();
        let cli = parse(
            &["-m", "gpt-4o,claude-sonnet-4", "-a", "sk", "-A", ""],
            input.path(),
        );
        assert_eq!(
            cli.into_run_config().unwrap_err(),
            ConfigError::MissingProviderKey {
                model: Model::ClaudeSonnet4,
                provider: Provider::Anthropic,
            }
        );
    }

    #[test]
    fn missing_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = parse(&["-m", "o1", "-a", "sk"], &dir.path().join("absent.json"));
        assert!(matches!(
            cli.into_run_config().unwrap_err(),
            ConfigError::InputNotFound(_)
        ));
    }

    #[test]
    fn zero_workers_and_iterations_are_rejected() {
        let input = input_file();
        let cli = parse(&["-m", "o1", "-a", "sk", "-w", "0"], input.path());
        assert_eq!(cli.into_run_config().unwrap_err(), ConfigError::NoWorkers);

        let cli = parse(
            &["-m", "o1", "-a", "sk", "--max-iterations", "0"],
            input.path(),
        );
        assert_eq!(
            cli.into_run_config().unwrap_err(),
            ConfigError::NoIterations
        );
    }

    #[test]
    fn gradle_and_timeouts_flow_into_harness() {
        let input = input_file();
        let cli = parse(
            &[
                "-m",
                "claude-3-7-sonnet",
                "-A",
                "sk-ant",
                "--gradle",
                "/opt/gradle/bin/gradle",
                "--test-timeout-secs",
                "600",
                "--work-dir",
                "/var/tmp/apidrift",
                "--no-progress",
            ],
            input.path(),
        );
        let config = cli.into_run_config().unwrap();
        assert_eq!(
            config.harness.build_tool,
            Some(PathBuf::from("/opt/gradle/bin/gradle"))
        );
        assert_eq!(config.harness.timeout_secs, 600);
        assert_eq!(
            config.harness.work_dir,
            Some(PathBuf::from("/var/tmp/apidrift"))
        );
        assert!(!config.show_progress);
    }
}
