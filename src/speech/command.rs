//! Speech synthesis through a system text-to-speech program.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::{AppError, Result};

/// Boxed future returned by [`Synthesizer::speak`].
pub type SpeakFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Text in, audio out as a side effect.
///
/// The returned future resolves when playback finishes. Dropping it before
/// completion must stop playback.
pub trait Synthesizer: Send + Sync {
    /// Speak `text` aloud.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Speech`] if synthesis cannot start or fails.
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFuture<'a>;
}

/// How the reply text reaches the TTS program.
///
/// Reply text embeds untrusted chat input, so it is never placed where the
/// program could parse it as an option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInput {
    /// Written to standard input, then stdin is closed
    /// (`espeak --stdin`, `say -f -`).
    #[default]
    Stdin,
    /// Passed as the final argument after a `--` end-of-options marker.
    Argument,
}

/// Runs the configured TTS program for one reply and waits for it to exit.
///
/// The child is spawned with `kill_on_drop(true)`, so a caller that times
/// out and drops the future also stops the audio.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    input: TextInput,
}

impl CommandSynthesizer {
    /// Create a synthesizer for `program` with leading `args`, feeding the
    /// text on stdin.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            input: TextInput::Stdin,
        }
    }

    /// Choose how the text is handed to the program.
    #[must_use]
    pub fn with_input(mut self, input: TextInput) -> Self {
        self.input = input;
        self
    }

    /// Create a synthesizer from speech configuration.
    #[must_use]
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone()).with_input(config.input)
    }

    async fn run(&self, text: &str) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        match self.input {
            TextInput::Stdin => {
                cmd.stdin(Stdio::piped());
            }
            TextInput::Argument => {
                cmd.arg("--").arg(text).stdin(Stdio::null());
            }
        }
        cmd.stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|err| {
            AppError::Speech(format!("failed to spawn {}: {err}", self.program))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            write_text(&mut stdin, text, &self.program).await?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| AppError::Speech(format!("failed to wait for {}: {err}", self.program)))?;

        if output.status.success() {
            debug!(program = %self.program, "speech synthesis finished");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        Err(AppError::Speech(match output.status.code() {
            Some(code) => format!("{} exited with code {code}: {detail}", self.program),
            None => format!("{} terminated by signal: {detail}", self.program),
        }))
    }
}

impl Synthesizer for CommandSynthesizer {
    fn speak<'a>(&'a self, text: &'a str) -> SpeakFuture<'a> {
        Box::pin(self.run(text))
    }
}

/// Write `text` plus a newline, then close the pipe.
///
/// A program that exits without reading is judged by its exit status, so a
/// broken pipe is not an error here.
async fn write_text(
    stdin: &mut tokio::process::ChildStdin,
    text: &str,
    program: &str,
) -> Result<()> {
    let mut payload = String::with_capacity(text.len() + 1);
    payload.push_str(text);
    payload.push('\n');

    let written = match stdin.write_all(payload.as_bytes()).await {
        Ok(()) => stdin.shutdown().await,
        Err(err) => Err(err),
    };
    match written {
        Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => Err(AppError::Speech(
            format!("failed to write text to {program}: {err}"),
        )),
        _ => Ok(()),
    }
}
