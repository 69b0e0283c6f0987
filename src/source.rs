/// The external rtl_433 decoder process feeding JSON lines
use log::{info, warn};
use std::process::Stdio;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};

use crate::error::{ExporterError, Result};

pub struct DecoderProcess {
    child: Child,
}

impl DecoderProcess {
    /// Run `command` through bash with stdout captured
    ///
    /// stderr is inherited so decoder failures show up in our logs.
    pub fn spawn(command: &str) -> Result<Self> {
        let child = Command::new("/bin/bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExporterError::Subprocess(format!("failed to spawn '{}': {}", command, e)))?;

        info!("Started decoder subprocess: {}", command);
        Ok(DecoderProcess { child })
    }

    /// Take the buffered stdout reader. Only available once.
    pub fn take_output(&mut self) -> Result<BufReader<ChildStdout>> {
        self.child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| ExporterError::Subprocess("decoder stdout already taken".into()))
    }

    /// Wait for the decoder to exit, treating a non-zero status as an error
    pub async fn wait(mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ExporterError::Subprocess(format!("failed to wait for decoder: {}", e)))?;

        if status.success() {
            info!("Decoder subprocess exited cleanly");
            Ok(())
        } else {
            Err(ExporterError::Subprocess(format!(
                "decoder exited with {}",
                status
            )))
        }
    }

    /// Stop the decoder after the stream has failed
    pub async fn kill(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill decoder subprocess: {}", e);
        }
    }
}
