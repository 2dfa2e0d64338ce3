use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{Decrypt, EncryptedPayload, FileFormat};
use crate::error::ProviderError;

/// Runs the `sops` executable once per call, feeding the encrypted bytes on
/// stdin and reading the decrypted document as JSON from stdout.
#[derive(Debug, Clone)]
pub struct SopsDecryptor {
    program: PathBuf,
    timeout: Duration,
}

impl SopsDecryptor {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Decrypt for SopsDecryptor {
    async fn decrypt(
        &self,
        payload: &EncryptedPayload,
        kms_key: Option<&str>,
    ) -> Result<Value, ProviderError> {
        let args = sops_args(payload.format, kms_key);
        info!(
            program = %self.program.display(),
            location = %payload.location,
            ?args,
            "Running sops command"
        );

        let mut command = Command::new(&self.program);
        command.args(&args);

        let output = run_piped(command, &payload.bytes, self.timeout).await?;
        info!(
            location = %payload.location,
            stdout_bytes = output.stdout.len(),
            stderr_empty = output.stderr.is_empty(),
            "sops finished"
        );

        parse_document(&output.stdout)
    }
}

pub fn sops_args(format: FileFormat, kms_key: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-d".to_string(),
        "--input-type".to_string(),
        format.to_string(),
        "--output-type".to_string(),
        "json".to_string(),
    ];
    if let Some(key) = kms_key {
        args.push("--kms".to_string());
        args.push(key.to_string());
    }
    args.push("/dev/stdin".to_string());
    args
}

#[derive(Debug)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Spawns `command` with all three standard streams piped, writes `input` to
/// its stdin and collects its output.
///
/// The child is killed when the returned future is dropped, which covers
/// both the timeout and cancellation by the caller.
pub async fn run_piped(
    mut command: Command,
    input: &[u8],
    timeout: Duration,
) -> Result<CapturedOutput, ProviderError> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(ProviderError::Spawn)?;
    let mut stdin = child.stdin.take().ok_or_else(|| {
        ProviderError::Spawn(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "child stdin was not captured",
        ))
    })?;

    // stdin is fed while stdout is drained so neither side can block the other.
    let feed = async move {
        let written = stdin.write_all(input).await;
        drop(stdin);
        written
    };

    let (fed, output) = tokio::time::timeout(timeout, async {
        tokio::join!(feed, child.wait_with_output())
    })
    .await
    .map_err(|_| {
        error!(?timeout, "sops did not finish in time, killing it");
        ProviderError::DecryptionTimeout(timeout)
    })?;

    let output = output.map_err(ProviderError::Spawn)?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let exit_code = output.status.code();
        error!(?exit_code, %stderr, "Exec exited with a failure");
        return Err(ProviderError::DecryptionFailed { exit_code, stderr });
    }

    // A clean exit wins over a stdin write error; the child may stop reading early.
    if let Err(e) = fed {
        warn!(error = %e, "sops exited cleanly before consuming all of stdin");
    }

    if stderr.is_empty() {
        debug!("Exec exited cleanly");
    } else {
        warn!(%stderr, "Exec exited cleanly, but stderr was not empty");
    }

    Ok(CapturedOutput {
        stdout: output.stdout,
        stderr,
    })
}

pub fn parse_document(stdout: &[u8]) -> Result<Value, ProviderError> {
    serde_json::from_slice(stdout).map_err(ProviderError::DecodeFailed)
}
