// External diagnostic commands. Failures never propagate to samplers: they
// degrade to empty output, which the parsers read as "no records".

use crate::config::CommandsConfig;
use crate::parsers;
use futures_util::future::BoxFuture;
use std::fmt;
use std::process::ExitStatus;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}")]
    Status { program: String, status: ExitStatus },
}

/// Program and arguments of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Builds an invocation from a configured argv template, appending `extra`
    /// (device name, pid) when given.
    pub fn from_template(template: &[String], extra: Option<&str>) -> Result<Self, CommandError> {
        let (program, rest) = template.split_first().ok_or(CommandError::Empty)?;
        let mut args = rest.to_vec();
        if let Some(extra) = extra {
            args.push(extra.to_string());
        }
        Ok(Self {
            program: program.clone(),
            args,
        })
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs an invocation and returns its stdout.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<String, CommandError>>;
}

/// Spawns real processes on tokio's process driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<String, CommandError>> {
        Box::pin(async move {
            let output = tokio::process::Command::new(&invocation.program)
                .args(&invocation.args)
                .stdin(std::process::Stdio::null())
                .output()
                .await
                .map_err(|source| CommandError::Spawn {
                    program: invocation.program.clone(),
                    source,
                })?;
            if !output.status.success() {
                return Err(CommandError::Status {
                    program: invocation.program.clone(),
                    status: output.status,
                });
            }
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}

/// Synchronous variant for callers that are already off the worker task.
pub fn run_blocking(invocation: &Invocation) -> Result<String, CommandError> {
    let output = std::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(std::process::Stdio::null())
        .output()
        .map_err(|source| CommandError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(CommandError::Status {
            program: invocation.program.clone(),
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs the invocation, treating any failure as empty output.
pub async fn output_or_empty(runner: &dyn CommandRunner, invocation: &Invocation) -> String {
    match runner.run(invocation).await {
        Ok(out) => out,
        Err(e) => {
            tracing::debug!(error = %e, command = %invocation, "command failed; using empty output");
            String::new()
        }
    }
}

/// Command name of a running process (`ps -o comm= -p <pid>`).
#[instrument(skip(runner, commands), fields(operation = "process_name"))]
pub async fn process_name(
    runner: &dyn CommandRunner,
    commands: &CommandsConfig,
    pid: u32,
) -> Option<String> {
    let pid = pid.to_string();
    let invocation = match Invocation::from_template(&commands.process_name, Some(&pid)) {
        Ok(i) => i,
        Err(e) => {
            tracing::warn!(error = %e, "process name command not configured");
            return None;
        }
    };
    parsers::parse_process_name(&output_or_empty(runner, &invocation).await)
}
