#![allow(clippy::result_large_err)] // Command filter returns AppError to surface process diagnostics without boxing.

use crate::core::codec;
use crate::core::data::{Data, Payload};
use crate::core::error::AppError;
use crate::core::filter::{Filter, FilterConfig};
use crate::core::types::{content_type, ErrorCategory};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};

const OUTPUT_CONTEXT_LIMIT_BYTES: usize = 65_536;

/// Runs an external program, feeding it the current payload on stdin and decoding its stdout.
pub struct CommandFilter {
    runner: Arc<dyn CommandRunner>,
    request: Option<CommandExecutionRequest>,
    content_type: String,
    input_content_type: Option<String>,
}

impl Default for CommandFilter {
    fn default() -> Self {
        Self::with_runner(Arc::new(TokioCommandRunner))
    }
}

impl CommandFilter {
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            request: None,
            content_type: content_type::TEXT.to_string(),
            input_content_type: None,
        }
    }

    fn stdin_bytes(&self, payload: &Payload) -> Result<Vec<u8>, AppError> {
        if let Some(ref input_type) = self.input_content_type {
            return codec::encode(input_type, payload)
                .map_err(|err| err.into_encode_failure(input_type));
        }
        match payload {
            Payload::Raw(bytes) => Ok(bytes.clone()),
            Payload::Text(text) => Ok(text.as_bytes().to_vec()),
            Payload::Structured(value) => {
                let mut bytes = serde_json::to_vec(value).map_err(|err| {
                    AppError::with_source(
                        ErrorCategory::EncodeFailure,
                        "failed to encode command input as JSON",
                        err,
                    )
                })?;
                bytes.push(b'\n');
                Ok(bytes)
            }
        }
    }
}

#[async_trait]
impl Filter for CommandFilter {
    fn name(&self) -> &'static str {
        "command"
    }

    fn prep(&mut self, config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        let params: CommandParams = config.parse_params()?;
        if params.args.is_empty() || params.args[0].trim().is_empty() {
            tracing::error!("command filter requires 'args' parameter");
            return Err(AppError::new(
                ErrorCategory::MissingParams,
                "command filter requires a non-empty 'args' list",
            ));
        }
        let timeout = match params.timeout.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(humantime::parse_duration(raw).map_err(|err| {
                AppError::with_source(
                    ErrorCategory::InvalidParams,
                    format!("invalid command timeout '{}'", raw),
                    err,
                )
            })?),
            _ => None,
        };
        let env = params
            .env
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        self.content_type = params.content_type;
        self.input_content_type = params.input_content_type.filter(|ct| !ct.is_empty());
        self.request = Some(CommandExecutionRequest {
            args: params.args,
            dir: params.dir,
            env,
            keep_envs: params.keep_envs,
            input: Vec::new(),
            timeout,
        });
        Ok(())
    }

    async fn process(&mut self, data: &Data) -> Result<Data, AppError> {
        let mut request = self.request.take().ok_or_else(|| {
            AppError::new(ErrorCategory::Internal, "command filter processed before prep")
        })?;
        request.input = self.stdin_bytes(&data.payload)?;

        tracing::debug!(
            args = ?request.args,
            dir = ?request.dir,
            keep_envs = request.keep_envs,
            input_len = request.input.len(),
            "executing command"
        );
        let start = Instant::now();
        let output = self.runner.run(&request).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if output.exit_code != 0 {
            let stdout = limit_bytes(&output.stdout);
            let stderr = limit_bytes(&output.stderr);
            tracing::error!(
                program = %request.args[0],
                exit_code = output.exit_code,
                stdout = %stdout,
                stderr = %stderr,
                "command failed"
            );
            return Err(AppError::new(
                ErrorCategory::CommandFailed,
                format!(
                    "command '{}' failed with exit code {}",
                    request.args[0], output.exit_code
                ),
            )
            .with_context("exit_code", output.exit_code.to_string())
            .with_context("stdout", stdout)
            .with_context("stderr", stderr));
        }
        tracing::debug!(
            program = %request.args[0],
            duration_ms,
            stdout_len = output.stdout.len(),
            "command finished"
        );

        let payload = codec::decode(&self.content_type, &output.stdout)
            .map_err(|err| err.into_decode_failure(&self.content_type))?;
        Ok(Data {
            content_type: self.content_type.clone(),
            payload,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CommandParams {
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    dir: Option<PathBuf>,
    #[serde(default)]
    env: BTreeMap<String, Value>,
    #[serde(default, alias = "keep_envs")]
    keep_envs: bool,
    #[serde(default, alias = "input_content_type")]
    input_content_type: Option<String>,
    #[serde(default = "default_content_type", alias = "content_type")]
    content_type: String,
    #[serde(default)]
    timeout: Option<String>,
}

fn default_content_type() -> String {
    content_type::TEXT.to_string()
}

#[derive(Clone, Debug)]
pub struct CommandExecutionRequest {
    /// Program followed by its arguments.
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Inherit the parent environment (with `env` layered on top) instead of starting empty.
    pub keep_envs: bool,
    pub input: Vec<u8>,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct CommandExecutionOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError>;
}

pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        let (program, args) = request.args.split_first().ok_or_else(|| {
            AppError::new(ErrorCategory::MissingParams, "command args are empty")
        })?;
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = request.dir {
            command.current_dir(dir);
        }
        if !request.keep_envs {
            command.env_clear();
        }
        command.envs(&request.env);

        let mut child = command.spawn().map_err(|err| {
            AppError::with_source(
                ErrorCategory::CommandFailed,
                format!("failed to spawn '{}': {}", program, err),
                err,
            )
            .with_code("FW-CMD-002")
        })?;

        let exchanged = match request.timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, exchange(&mut child, &request.input)).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        if let Err(err) = child.kill().await {
                            tracing::warn!(program = %program, error = %err, "failed to kill timed out command");
                        }
                        return Err(AppError::new(
                            ErrorCategory::CommandFailed,
                            format!(
                                "command '{}' timed out after {}",
                                program,
                                humantime::format_duration(limit)
                            ),
                        )
                        .with_code("FW-CMD-003"));
                    }
                }
            }
            None => exchange(&mut child, &request.input).await,
        };
        let (status, stdout, stderr) = exchanged.map_err(|err| {
            AppError::with_source(
                ErrorCategory::CommandFailed,
                format!("i/o with '{}' failed: {}", program, err),
                err,
            )
            .with_code("FW-CMD-004")
        })?;

        Ok(CommandExecutionOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

/// Drain stdout and stderr, feed stdin, and wait for exit; all four are joined.
async fn exchange(child: &mut Child, input: &[u8]) -> io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout, stderr, (), status) =
        tokio::join!(drain(stdout), drain(stderr), feed(stdin, input), child.wait());
    Ok((status?, stdout?, stderr?))
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

async fn feed(pipe: Option<ChildStdin>, input: &[u8]) {
    let Some(mut pipe) = pipe else {
        return;
    };
    if let Err(err) = pipe.write_all(input).await {
        // the child may exit without reading its input
        tracing::warn!(error = %err, "failed to write command input");
        return;
    }
    if let Err(err) = pipe.shutdown().await {
        tracing::debug!(error = %err, "failed to close command input");
    }
}

fn limit_bytes(bytes: &[u8]) -> String {
    let limit = OUTPUT_CONTEXT_LIMIT_BYTES.min(bytes.len());
    String::from_utf8_lossy(&bytes[..limit]).into_owned()
}
