//! Compositor adapter for an external executable.
//!
//! Each build gets a private work directory. Submitted images are written
//! there, followed by a `manifest.json` listing `{count, path}` entries in
//! submission order. The program is run as `<program> <args...> <manifest>`;
//! it writes the PDF to stdout and may report progress on stderr with lines
//! of the form `progress: <message>`.

use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::CompositorConfig;
use crate::fetcher::ImageBytes;

use super::{CompositionError, CompositorFactory, ProgressCallback, SheetCompositor};

/// Prefix of stderr lines that are relayed as progress.
const PROGRESS_PREFIX: &str = "progress:";

/// How many trailing stderr lines are kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Serialize)]
struct ManifestEntry {
    count: u32,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    cards: &'a [ManifestEntry],
}

/// A single build driven through an external compositor program.
pub struct CommandCompositor {
    program: PathBuf,
    args: Vec<String>,
    work_dir: Option<TempDir>,
    entries: Vec<ManifestEntry>,
    progress: Option<ProgressCallback>,
}

impl CommandCompositor {
    fn new(config: &CompositorConfig, program: PathBuf) -> Result<Self, CompositionError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("proxysheet-");
            builder
        };
        let work_dir = match &config.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        debug!(work_dir = %work_dir.path().display(), "Created compositor work directory");

        Ok(Self {
            program,
            args: config.args.clone(),
            work_dir: Some(work_dir),
            entries: Vec::new(),
            progress: None,
        })
    }

    fn work_dir(&self) -> Result<&TempDir, CompositionError> {
        self.work_dir
            .as_ref()
            .ok_or_else(|| CompositionError::Internal("compositor already disposed".to_string()))
    }

    fn relay(&mut self, message: &str) {
        if let Some(callback) = self.progress.as_mut() {
            callback(message);
        }
    }
}

impl SheetCompositor for CommandCompositor {
    fn name(&self) -> &str {
        "command"
    }

    fn submit(&mut self, count: u32, image: ImageBytes) -> Result<(), CompositionError> {
        let path = self
            .work_dir()?
            .path()
            .join(format!("card-{:04}.img", self.entries.len()));
        std::fs::write(&path, &image)?;
        self.entries.push(ManifestEntry { count, path });
        Ok(())
    }

    fn register_progress(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    fn build(&mut self) -> Result<Vec<u8>, CompositionError> {
        let manifest_path = self.work_dir()?.path().join("manifest.json");
        let manifest = serde_json::to_vec(&Manifest {
            cards: &self.entries,
        })
        .map_err(|e| CompositionError::Internal(format!("Failed to encode manifest: {}", e)))?;
        std::fs::write(&manifest_path, manifest)?;

        debug!(
            program = %self.program.display(),
            runs = self.entries.len(),
            "Running compositor"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&manifest_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CompositionError::Spawn {
                path: self.program.clone(),
                reason: e.to_string(),
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CompositionError::Internal("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CompositionError::Internal("stderr was not captured".to_string()))?;

        // stdout is drained on its own thread so a large PDF cannot stall stderr.
        let (output, stderr_tail) = std::thread::scope(|scope| {
            let reader = scope.spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            });

            let mut tail: Vec<String> = Vec::new();
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                match line.strip_prefix(PROGRESS_PREFIX) {
                    Some(message) => self.relay(message.trim()),
                    None => {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.remove(0);
                        }
                        tail.push(line);
                    }
                }
            }

            let output = reader
                .join()
                .map_err(|_| CompositionError::Internal("stdout reader panicked".to_string()));
            (output, tail)
        });

        let output = output??;
        let status = child.wait()?;
        let stderr_text = (!stderr_tail.is_empty()).then(|| stderr_tail.join("\n"));

        if !status.success() {
            return Err(CompositionError::build_failed(
                format!("compositor exited with {}", status),
                stderr_text,
            ));
        }
        if output.is_empty() {
            return Err(CompositionError::EmptyOutput);
        }

        debug!(bytes = output.len(), "Compositor finished");
        Ok(output)
    }

    fn dispose(&mut self) {
        self.progress = None;
        self.entries.clear();
        if let Some(dir) = self.work_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "Failed to remove compositor work directory");
            }
        }
    }
}

/// Creates [`CommandCompositor`] instances from configuration.
///
/// Without a configured program every `create` fails with
/// [`CompositionError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct CommandCompositorFactory {
    config: CompositorConfig,
}

impl CommandCompositorFactory {
    pub fn new(config: CompositorConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.program.is_some()
    }
}

impl CompositorFactory for CommandCompositorFactory {
    fn name(&self) -> &str {
        "command"
    }

    fn create(&self) -> Result<Box<dyn SheetCompositor>, CompositionError> {
        let program = self
            .config
            .program
            .clone()
            .ok_or(CompositionError::NotConfigured)?;
        Ok(Box::new(CommandCompositor::new(&self.config, program)?))
    }
}
