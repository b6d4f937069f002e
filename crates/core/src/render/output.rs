//! Where finished documents go: saved to disk, sent to a printer, or both.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::document::PrintDocument;
use super::error::RenderError;

/// Files written for one saved document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    /// JSON manifest: page size, mode and per-page placements.
    pub manifest: PathBuf,
    /// One file per printed page, in page order.
    pub pages: Vec<PathBuf>,
}

/// Persists print documents.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn save(&self, document: &PrintDocument) -> Result<SavedDocument, RenderError>;
}

/// Hands print documents to a printer.
#[async_trait]
pub trait PrintSpooler: Send + Sync {
    async fn print(&self, document: &PrintDocument) -> Result<(), RenderError>;
}

/// Writes `<stem>.json` and one `<stem>-<page>.<ext>` per page into a
/// directory.
#[derive(Debug, Clone)]
pub struct FsDocumentSink {
    dir: PathBuf,
}

impl FsDocumentSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentSink for FsDocumentSink {
    async fn save(&self, document: &PrintDocument) -> Result<SavedDocument, RenderError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| RenderError::Save {
                path: self.dir.clone(),
                source,
            })?;

        let stem = document.file_stem();
        let extension = document.image.extension();
        let manifest = self.dir.join(format!("{}.json", stem));

        let mut pages = Vec::with_capacity(document.page_count());
        for (i, content) in document.paginate()?.into_iter().enumerate() {
            let path = self.dir.join(format!("{}-{}.{}", stem, i + 1, extension));
            tokio::fs::write(&path, content)
                .await
                .map_err(|source| RenderError::Save {
                    path: path.clone(),
                    source,
                })?;
            pages.push(path);
        }

        let json = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&manifest, json)
            .await
            .map_err(|source| RenderError::Save {
                path: manifest.clone(),
                source,
            })?;

        info!(
            "Saved document {} ({} page(s)) to {}",
            document.id,
            pages.len(),
            manifest.display()
        );

        Ok(SavedDocument { manifest, pages })
    }
}

/// Pipes the paginated document into a print command (`lp` by default).
#[derive(Debug, Clone)]
pub struct CommandSpooler {
    program: String,
    args: Vec<String>,
}

impl Default for CommandSpooler {
    fn default() -> Self {
        Self::new("lp", vec!["-t".to_string()])
    }
}

impl CommandSpooler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl PrintSpooler for CommandSpooler {
    async fn print(&self, document: &PrintDocument) -> Result<(), RenderError> {
        debug!("Spooling document {} via {}", document.id, self.program);
        let data = document.print_data()?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&document.title)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::SpoolerNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    RenderError::Print(e.to_string())
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&data).await {
                drop(stdin);
                if let Err(kill_err) = child.kill().await {
                    warn!("Failed to stop {}: {}", self.program, kill_err);
                }
                return Err(RenderError::Print(e.to_string()));
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RenderError::Print(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Print(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        info!("Sent document {} to the printer", document.id);
        Ok(())
    }
}
