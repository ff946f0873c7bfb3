//! Gradle-backed harness: one temporary project per invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::{reports, HarnessConfig, HarnessError, TestHarness};
use crate::domain::{ApiChange, TestOutcome};

const PROJECT_PREFIX: &str = "api-change-";

/// Captured result of one build tool process.
#[derive(Debug, Clone)]
struct BuildRun {
    exit_code: i32,
    stdout: String,
    stderr: String,
    duration_ms: u64,
}

impl BuildRun {
    fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Why the build tool produced no exit status.
#[derive(Debug, thiserror::Error)]
enum LaunchError {
    #[error("failed to prepare project: {0}")]
    Prepare(#[source] std::io::Error),

    #[error("failed to run build tool {}: {source}", .tool.display())]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build tool timed out after {secs} seconds")]
    TimedOut {
        secs: u64,
        stdout: String,
        stderr: String,
    },
}

impl LaunchError {
    /// Captured stdout, if any, and the error text for the outcome.
    fn into_diagnostics(self) -> (Option<String>, String) {
        let message = self.to_string();
        match self {
            LaunchError::TimedOut { stdout, stderr, .. } => {
                let error = if stderr.trim().is_empty() {
                    message
                } else {
                    format!("{message}\n{stderr}")
                };
                (Some(stdout).filter(|s| !s.is_empty()), error)
            }
            _ => (None, message),
        }
    }
}

/// A child pipe drained in the background into a shared buffer.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            if let Some(mut pipe) = pipe {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => sink
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                    }
                }
            }
        });
        Self { buffer, task }
    }

    /// Wait for end of stream and return everything read.
    async fn finish(self) -> String {
        let Self { buffer, task } = self;
        if let Err(e) = task.await {
            debug!(error = %e, "output reader stopped early");
        }
        text(&buffer)
    }

    /// Stop reading and return what arrived so far.
    fn abort(self) -> String {
        self.task.abort();
        text(&self.buffer)
    }
}

fn text(buffer: &Mutex<Vec<u8>>) -> String {
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Harness that runs the acceptance test through a Gradle installation.
#[derive(Debug, Clone, Default)]
pub struct GradleHarness {
    config: HarnessConfig,
}

impl GradleHarness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Harness using an explicit build tool instead of the environment.
    pub fn with_build_tool(path: impl Into<PathBuf>) -> Self {
        Self::new(HarnessConfig {
            build_tool: Some(path.into()),
            ..HarnessConfig::default()
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Resolve the build tool entry point.
    ///
    /// The environment is consulted on every call, so a missing variable is
    /// reported by the first invocation rather than at construction.
    pub fn resolve_build_tool(&self) -> Result<PathBuf, HarnessError> {
        if let Some(path) = &self.config.build_tool {
            return Ok(path.clone());
        }
        match std::env::var_os(&self.config.build_tool_env) {
            Some(value) if !value.is_empty() => Ok(entry_point(PathBuf::from(value))),
            _ => Err(HarnessError::MissingBuildTool {
                var: self.config.build_tool_env.clone(),
            }),
        }
    }

    fn allocate_project(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PROJECT_PREFIX);
        match &self.config.work_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }

    async fn materialize(
        &self,
        root: &Path,
        change: &ApiChange,
        source_code: &str,
        build_descriptor: &str,
    ) -> std::io::Result<()> {
        let layout = &self.config.layout;
        let files = [
            (&layout.main_source, source_code),
            (&layout.test_source, change.test_program.as_str()),
            (&layout.build_file, build_descriptor),
        ];

        for (relative, contents) in files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, contents).await?;
        }
        Ok(())
    }

    async fn run_build_tool(&self, tool: &Path, project: &Path) -> Result<BuildRun, LaunchError> {
        let start = Instant::now();
        let spawn_error = |source| LaunchError::Spawn {
            tool: tool.to_path_buf(),
            source,
        };

        let mut child = Command::new(tool)
            .args(&self.config.args)
            .current_dir(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let status = if self.config.timeout_secs > 0 {
            let limit = Duration::from_secs(self.config.timeout_secs);
            match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "failed to kill build tool");
                    }
                    return Err(LaunchError::TimedOut {
                        secs: self.config.timeout_secs,
                        stdout: stdout.abort(),
                        stderr: stderr.abort(),
                    });
                }
            }
        } else {
            child.wait().await
        };
        let status = status.map_err(spawn_error)?;

        Ok(BuildRun {
            exit_code: status.code().unwrap_or(-1),
            stdout: stdout.finish().await,
            stderr: stderr.finish().await,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn run_in(
        &self,
        project: &Path,
        tool: &Path,
        change: &ApiChange,
        source_code: &str,
        build_descriptor: &str,
    ) -> TestOutcome {
        let mut outcome = echo(change, source_code, build_descriptor);

        let run = match self
            .materialize(project, change, source_code, build_descriptor)
            .await
        {
            Ok(()) => self.run_build_tool(tool, project).await,
            Err(e) => Err(LaunchError::Prepare(e)),
        };

        let run = match run {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "build tool did not run to completion");
                let (stdout, error) = e.into_diagnostics();
                outcome.output = stdout;
                outcome.error_output = Some(error);
                return outcome;
            }
        };

        let reports_dir = project.join(&self.config.layout.reports_dir);
        let collected = tokio::task::spawn_blocking(move || reports::collect(&reports_dir));
        let collected = collected.await;
        outcome.test_results = collected.unwrap_or_else(|e| {
            warn!(error = %e, "test report collection failed");
            Vec::new()
        });
        let failed_cases = outcome.failed_case_count();
        let passed = run.passed();
        outcome.success = passed && failed_cases == 0;

        debug!(
            exit_code = run.exit_code,
            duration_ms = run.duration_ms,
            cases = outcome.test_results.len(),
            failed_cases,
            "build tool finished"
        );

        outcome.output = Some(run.stdout);
        if !outcome.success {
            outcome.error_output = Some(if passed {
                format!("{failed_cases} test case(s) failed")
            } else if run.stderr.trim().is_empty() {
                format!("build tool exited with code {}", run.exit_code)
            } else {
                run.stderr
            });
        }
        outcome
    }
}

#[async_trait]
impl TestHarness for GradleHarness {
    #[instrument(skip_all, fields(change = %change.name))]
    async fn execute(
        &self,
        change: &ApiChange,
        source_code: &str,
        build_descriptor: &str,
    ) -> Result<TestOutcome, HarnessError> {
        let tool = self.resolve_build_tool()?;

        let project = match self.allocate_project() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "failed to allocate project directory");
                let mut outcome = echo(change, source_code, build_descriptor);
                outcome.error_output =
                    Some(format!("failed to allocate project directory: {e}"));
                return Ok(outcome);
            }
        };
        debug!(project = %project.path().display(), "materialized project");

        let outcome = self
            .run_in(project.path(), &tool, change, source_code, build_descriptor)
            .await;

        // Dropping the TempDir also removes it; closing surfaces the error.
        if let Err(e) = project.close() {
            warn!(error = %e, "failed to remove project directory");
        }

        Ok(outcome)
    }
}

/// A failing outcome that echoes the invocation inputs.
fn echo(change: &ApiChange, source_code: &str, build_descriptor: &str) -> TestOutcome {
    TestOutcome {
        api_change: Some(change.clone()),
        generated_code: Some(source_code.to_string()),
        gradle_build: Some(build_descriptor.to_string()),
        model: None,
        success: false,
        output: None,
        error_output: None,
        test_results: Vec::new(),
    }
}

/// `GRADLE_HOME` may name the installation or the executable itself.
fn entry_point(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        let exe = if cfg!(windows) {
            "gradle.bat"
        } else {
            "gradle"
        };
        path.join("bin").join(exe)
    } else {
        path
    }
}
