//! Signer backed by an external command.
//!
//! The command receives the message on stdin and prints the signature
//! on stdout. Keys never enter this process.

use std::process::Stdio;

use anyhow::bail;
use hyperplay_api::{ApiError, Signer, SignerFuture};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct CommandSigner {
    address: String,
    program: String,
    args: Vec<String>,
}

impl CommandSigner {
    pub fn new(address: &str, command: &[String]) -> anyhow::Result<Self> {
        if address.trim().is_empty() {
            bail!("signer_address is not set in the settings file");
        }
        let Some((program, args)) = command.split_first() else {
            bail!("signer_command is not set in the settings file");
        };
        Ok(Self {
            address: address.trim().to_string(),
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    async fn run(&self, message: &str) -> Result<String, ApiError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ApiError::Signer(format!("could not start `{}`: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A signer that exits without reading closes the pipe; its
            // exit status tells the rest.
            match stdin.write_all(message.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    return Err(ApiError::Signer(format!("writing message to signer: {e}")));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ApiError::Signer(format!("waiting for signer: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::Signer(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let signature = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if signature.is_empty() {
            return Err(ApiError::Signer(format!(
                "`{}` printed no signature",
                self.program
            )));
        }
        Ok(signature)
    }
}

impl Signer for CommandSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign_message<'a>(&'a self, message: &'a str) -> SignerFuture<'a> {
        Box::pin(self.run(message))
    }
}
