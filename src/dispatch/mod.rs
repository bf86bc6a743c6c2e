//! The module command dispatcher: the validated, timeout-bounded bridge
//! between an external lifecycle request and an OS subprocess.

pub mod error;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::registry::{Module, ModuleRegistry};
use error::DispatchError;

/// Wall-clock bound for one lifecycle script invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Lifecycle verbs that reach the module script as its single argument.
///
/// `log` and `edit` belong to the request vocabulary but are served from
/// files by the HTTP layer; a dispatch call with either of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Start,
    Stop,
    Restart,
    Status,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

/// Outcome of one dispatch call. On success `output` is the child's stdout
/// verbatim, trailing newlines included; on failure it is a plain failure
/// token or diagnostic.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub output: String,
}

impl CommandResult {
    fn ok(output: String) -> Self {
        Self {
            success: true,
            output,
        }
    }

    fn failed(err: &DispatchError) -> Self {
        Self {
            success: false,
            output: err.failure_payload(),
        }
    }
}

/// Validates a (module, verb) pair against the registry and runs the module's
/// lifecycle script with a hard timeout.
///
/// Stateless per call: concurrent dispatches are not serialized, not even for
/// the same module. Overlapping restarts racing at the OS level is the
/// script's concern.
pub struct CommandDispatcher {
    registry: Arc<ModuleRegistry>,
    timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self::with_timeout(registry, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(registry: Arc<ModuleRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Validate and run one lifecycle command. Every failure comes back as a
    /// `CommandResult`; nothing here takes the daemon down.
    pub async fn execute(&self, name: &str, verb: &str) -> CommandResult {
        match self.try_execute(name, verb).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Dispatch '{} {}' failed: {}", name, verb, e);
                CommandResult::failed(&e)
            }
        }
    }

    async fn try_execute(&self, name: &str, verb: &str) -> Result<CommandResult, DispatchError> {
        let module = self
            .registry
            .resolve(name)
            .ok_or_else(|| DispatchError::UnknownModule(name.to_string()))?;
        let verb =
            Verb::parse(verb).ok_or_else(|| DispatchError::UnsupportedVerb(verb.to_string()))?;
        self.run_script(module, verb).await
    }

    async fn run_script(&self, module: &Module, verb: Verb) -> Result<CommandResult, DispatchError> {
        tracing::info!("{} {}", module.script_path.display(), verb.as_str());

        let mut child = Command::new(&module.script_path)
            .arg(verb.as_str())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        // Drain both pipes while waiting; a child with a full pipe never exits.
        let stdout_pipe = child.stdout.take();
        let stdout_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let module_name = module.name.clone();
        let stderr_pipe = child.stderr.take();
        let stderr_handle = tokio::spawn(async move {
            if let Some(pipe) = stderr_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("[{}] stderr: {}", module_name, line);
                }
            }
        });

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let _ = stderr_handle.await;
                let stdout = stdout_handle.await.unwrap_or_default();
                if !status.success() {
                    tracing::warn!(
                        "Script for '{}' exited with {:?}; returning its output as-is",
                        module.name,
                        status.code()
                    );
                }
                // Exit codes are the script author's convention, not ours.
                Ok(CommandResult::ok(stdout))
            }
            Ok(Err(e)) => Err(DispatchError::Launch(e)),
            Err(_) => {
                // Kill and reap; an abandoned child would outlive the request.
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                Err(DispatchError::Timeout(self.timeout.as_millis()))
            }
        }
    }
}
