//! Mock capture surface, document sink and print spooler for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::render::{
    CaptureSurface, DocumentSink, HiddenElement, PrintDocument, PrintSpooler, Raster,
    RenderError, SavedDocument,
};

/// Mock implementation of the CaptureSurface trait.
///
/// Produces a blank raster of a fixed size and records what was hidden while
/// each capture ran.
#[derive(Debug)]
pub struct MockSurface {
    width: u32,
    height: u32,
    /// Names (ids and classes) hidden right now.
    hidden: Arc<RwLock<Vec<String>>>,
    /// Snapshot of `hidden` at every capture.
    hidden_during_capture: Arc<RwLock<Vec<Vec<String>>>>,
    capture_scales: Arc<RwLock<Vec<u32>>>,
    /// If set, the next capture fails with this error.
    next_error: Arc<RwLock<Option<RenderError>>>,
}

impl MockSurface {
    /// Surface whose unscaled content measures `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            hidden: Arc::new(RwLock::new(Vec::new())),
            hidden_during_capture: Arc::new(RwLock::new(Vec::new())),
            capture_scales: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_next_error(&self, error: RenderError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn capture_scales(&self) -> Vec<u32> {
        self.capture_scales.read().await.clone()
    }

    pub async fn hidden_during_capture(&self) -> Vec<Vec<String>> {
        self.hidden_during_capture.read().await.clone()
    }

    /// True when nothing is left hidden.
    pub async fn all_restored(&self) -> bool {
        self.hidden.read().await.is_empty()
    }
}

#[async_trait]
impl CaptureSurface for MockSurface {
    async fn hide_controls(
        &self,
        ids: &[String],
        classes: &[String],
    ) -> Result<Vec<HiddenElement>, RenderError> {
        let mut hidden = self.hidden.write().await;
        let start = hidden.len();
        hidden.extend(ids.iter().chain(classes).cloned());
        Ok((start..hidden.len())
            .map(|index| HiddenElement {
                index,
                was_visible: true,
            })
            .collect())
    }

    async fn capture(&self, scale: u32) -> Result<Raster, RenderError> {
        self.capture_scales.write().await.push(scale);
        self.hidden_during_capture
            .write()
            .await
            .push(self.hidden.read().await.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(Raster {
            width: self.width * scale,
            height: self.height * scale,
            scale,
            media_type: "image/png".to_string(),
            data: vec![0; 16],
        })
    }

    async fn restore_controls(&self, hidden: &[HiddenElement]) -> Result<(), RenderError> {
        let mut current = self.hidden.write().await;
        let mut indices: Vec<usize> = hidden.iter().map(|h| h.index).collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        for index in indices {
            if index < current.len() {
                current.remove(index);
            }
        }
        Ok(())
    }
}

/// Mock implementation of the DocumentSink trait. Keeps documents in memory.
#[derive(Debug, Default)]
pub struct MockDocumentSink {
    saved: Arc<RwLock<Vec<PrintDocument>>>,
}

impl MockDocumentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn saved(&self) -> Vec<PrintDocument> {
        self.saved.read().await.clone()
    }
}

#[async_trait]
impl DocumentSink for MockDocumentSink {
    async fn save(&self, document: &PrintDocument) -> Result<SavedDocument, RenderError> {
        self.saved.write().await.push(document.clone());
        let dir = PathBuf::from("memory");
        let stem = document.file_stem();
        Ok(SavedDocument {
            manifest: dir.join(format!("{}.json", stem)),
            pages: (1..=document.page_count())
                .map(|n| dir.join(format!("{}-{}.{}", stem, n, document.image.extension())))
                .collect(),
        })
    }
}

/// Mock implementation of the PrintSpooler trait.
#[derive(Debug, Default)]
pub struct MockPrintSpooler {
    printed: Arc<RwLock<Vec<PrintDocument>>>,
    next_error: Arc<RwLock<Option<RenderError>>>,
}

impl MockPrintSpooler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn printed(&self) -> Vec<PrintDocument> {
        self.printed.read().await.clone()
    }

    pub async fn set_next_error(&self, error: RenderError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl PrintSpooler for MockPrintSpooler {
    async fn print(&self, document: &PrintDocument) -> Result<(), RenderError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.printed.write().await.push(document.clone());
        Ok(())
    }
}
