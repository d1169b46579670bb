use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ScorerConfig;
use crate::error::{AnalyzerError, Result};
use crate::prediction_tools::scorer::{check_scores, LikelihoodScorer};

#[derive(Serialize)]
struct WorkerRequest<'a> {
    sequences: &'a [String],
}

#[derive(Debug, Deserialize)]
struct WorkerReply {
    #[serde(default)]
    ready: bool,
    scores: Option<Vec<f64>>,
    error: Option<String>,
}

struct WorkerIo {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl WorkerIo {
    fn send(&mut self, sequences: &[String]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AnalyzerError::Scoring("Evo2 worker stdin is closed".into()))?;
        serde_json::to_writer(&mut *stdin, &WorkerRequest { sequences })?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Next protocol line from the worker, skipping anything that is not a JSON object.
    fn read_reply(&mut self) -> Result<WorkerReply> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                let status = self.child.try_wait()?;
                return Err(AnalyzerError::Scoring(format!(
                    "Evo2 worker exited unexpectedly ({status:?})"
                )));
            }
            if let Some(reply) = parse_reply(&line)? {
                return Ok(reply);
            }
        }
    }
}

/// `None` for stray output such as progress text a library printed to stdout.
fn parse_reply(line: &str) -> Result<Option<WorkerReply>> {
    let line = line.trim();
    if !line.starts_with('{') {
        if !line.is_empty() {
            debug!("Ignoring worker output: {}", line);
        }
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Evo 2 running in a long-lived Python child process.
///
/// The model is loaded once when the worker starts and then serves every
/// scoring call over line-delimited JSON on stdin/stdout. Dropping the worker
/// closes its stdin and waits for it to exit.
pub struct Evo2Worker {
    model_name: String,
    io: Mutex<WorkerIo>,
}

fn resolve_python(python: &str) -> Result<PathBuf> {
    if python.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(python);
        return if path.exists() {
            Ok(path)
        } else {
            Err(AnalyzerError::Scoring(format!(
                "Python executable not found at '{}'",
                path.display()
            )))
        };
    }
    which::which(python).map_err(|e| {
        AnalyzerError::Scoring(format!("Python executable '{python}' not found on PATH: {e}"))
    })
}

impl Evo2Worker {
    pub fn spawn(config: &ScorerConfig) -> Result<Self> {
        let python = resolve_python(&config.python)?;
        if !Path::new(&config.script).exists() {
            return Err(AnalyzerError::Scoring(format!(
                "Evo2 worker script not found at '{}'",
                config.script.display()
            )));
        }

        info!("Loading Evo2 model {}...", config.model_name);
        let mut child = Command::new(&python)
            .arg(&config.script)
            .arg("--model")
            .arg(&config.model_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalyzerError::Scoring("Evo2 worker stdout unavailable".into()))?;

        let mut io = WorkerIo {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let hello = io.read_reply().and_then(|hello| match hello {
            WorkerReply { ready: true, .. } => Ok(()),
            WorkerReply { error, .. } => Err(AnalyzerError::Scoring(
                error.unwrap_or_else(|| "no ready signal".into()),
            )),
        });
        if let Err(e) = hello {
            error!("Evo2 worker failed to start: {}", e);
            let _ = io.child.kill();
            let _ = io.child.wait();
            return Err(e);
        }
        info!("Evo2 model loaded");

        Ok(Self {
            model_name: config.model_name.clone(),
            io: Mutex::new(io),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl LikelihoodScorer for Evo2Worker {
    fn score_sequences(&self, sequences: &[String]) -> Result<Vec<f64>> {
        if sequences.is_empty() {
            return Ok(Vec::new());
        }

        let mut io = self
            .io
            .lock()
            .map_err(|_| AnalyzerError::Scoring("Evo2 worker lock poisoned".into()))?;

        debug!("Scoring {} sequences with {}", sequences.len(), self.model_name);
        io.send(sequences)?;
        let reply = io.read_reply()?;

        match (reply.scores, reply.error) {
            (_, Some(message)) => Err(AnalyzerError::Scoring(message)),
            (Some(scores), None) => check_scores(sequences.len(), scores),
            (None, None) => Err(AnalyzerError::Scoring("Evo2 worker sent no scores".into())),
        }
    }
}

impl Drop for Evo2Worker {
    fn drop(&mut self) {
        let io = match self.io.get_mut() {
            Ok(io) => io,
            Err(poisoned) => poisoned.into_inner(),
        };
        // EOF on stdin is the worker's shutdown signal
        drop(io.stdin.take());
        match io.child.wait() {
            Ok(status) => info!("Evo2 worker stopped ({})", status),
            Err(e) => warn!("Failed to reap Evo2 worker: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_interpreter_is_reported() {
        let config = ScorerConfig {
            python: "/nonexistent/bin/python".into(),
            ..ScorerConfig::default()
        };
        assert!(matches!(
            Evo2Worker::spawn(&config),
            Err(AnalyzerError::Scoring(_))
        ));
    }

    #[test]
    fn stray_output_is_skipped() {
        assert!(parse_reply("Loading checkpoint shards: 100%\n").unwrap().is_none());
        assert!(parse_reply("\n").unwrap().is_none());
        let reply = parse_reply("{\"ready\": true}\n").unwrap().unwrap();
        assert!(reply.ready);
        assert!(parse_reply("{not json").is_err());
    }

    #[test]
    fn reply_shapes_parse() {
        let ready: WorkerReply = serde_json::from_str(r#"{"ready": true}"#).unwrap();
        assert!(ready.ready);
        let scores: WorkerReply = serde_json::from_str(r#"{"scores": [-1.5, -2.25]}"#).unwrap();
        assert_eq!(scores.scores, Some(vec![-1.5, -2.25]));
        assert!(!scores.ready);
        let failed: WorkerReply = serde_json::from_str(r#"{"error": "CUDA OOM"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("CUDA OOM"));
    }
}
