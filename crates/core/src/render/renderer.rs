use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::document::{PrintDocument, Raster, RenderMode};
use super::error::RenderError;
use super::geometry::{fit_to_page, slice_pages, PageSize};
use super::output::{DocumentSink, PrintSpooler, SavedDocument};
use super::surface::CaptureSurface;
use crate::config::RenderConfig;
use crate::metrics::{DOCUMENTS_RENDERED, DOCUMENT_PAGES};

/// What to do with a rendered document. `save` and `print` are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub save: bool,
    pub print: bool,
    /// Paginate instead of fitting onto one page.
    pub slice: bool,
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub document: PrintDocument,
    pub saved: Option<SavedDocument>,
    pub printed: bool,
}

/// Captures a surface and turns the image into a print document.
pub struct DocumentRenderer {
    config: RenderConfig,
    sink: Arc<dyn DocumentSink>,
    spooler: Arc<dyn PrintSpooler>,
}

impl DocumentRenderer {
    pub fn new(
        config: RenderConfig,
        sink: Arc<dyn DocumentSink>,
        spooler: Arc<dyn PrintSpooler>,
    ) -> Self {
        Self {
            config,
            sink,
            spooler,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn page(&self) -> PageSize {
        PageSize::new(self.config.page_width_mm, self.config.page_height_mm)
    }

    /// Hide controls, capture, restore, then compose, save and print.
    ///
    /// Hidden controls are restored whether or not the capture succeeds.
    pub async fn render(
        &self,
        surface: &dyn CaptureSurface,
        title: &str,
        options: RenderOptions,
    ) -> Result<RenderOutput, RenderError> {
        let hidden = surface
            .hide_controls(&self.config.exclude_ids, &self.config.exclude_classes)
            .await?;

        let captured = surface.capture(self.config.oversample).await;

        if let Err(e) = surface.restore_controls(&hidden).await {
            match captured {
                Ok(_) => return Err(e),
                Err(capture_err) => {
                    warn!("Restoring controls after failed capture also failed: {}", e);
                    return Err(capture_err);
                }
            }
        }

        let mode = if options.slice {
            RenderMode::Slice
        } else {
            RenderMode::Fit
        };
        let document = self.compose(title, captured?, mode)?;

        DOCUMENTS_RENDERED
            .with_label_values(&[mode.as_str()])
            .inc();
        DOCUMENT_PAGES
            .with_label_values(&[mode.as_str()])
            .observe(document.page_count() as f64);
        info!(
            "Rendered '{}' in {} mode: {} page(s)",
            title,
            mode.as_str(),
            document.page_count()
        );

        let saved = if options.save {
            Some(self.sink.save(&document).await?)
        } else {
            None
        };

        if options.print {
            self.spooler.print(&document).await?;
        }

        Ok(RenderOutput {
            document,
            saved,
            printed: options.print,
        })
    }

    /// Place a captured image on pages.
    pub fn compose(
        &self,
        title: &str,
        image: Raster,
        mode: RenderMode,
    ) -> Result<PrintDocument, RenderError> {
        let page = self.page();
        let empty = || RenderError::EmptyCapture {
            width: image.width,
            height: image.height,
        };

        let pages = match mode {
            RenderMode::Fit => vec![fit_to_page(page, image.width, image.height).ok_or_else(empty)?],
            RenderMode::Slice => {
                let pages = slice_pages(page, image.width, image.height);
                if pages.is_empty() {
                    return Err(empty());
                }
                pages
            }
        };

        Ok(PrintDocument {
            id: Uuid::new_v4(),
            title: title.to_string(),
            page,
            mode,
            image,
            pages,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDocumentSink, MockPrintSpooler, MockSurface};

    fn renderer(sink: Arc<MockDocumentSink>, spooler: Arc<MockPrintSpooler>) -> DocumentRenderer {
        DocumentRenderer::new(RenderConfig::default(), sink, spooler)
    }

    #[tokio::test]
    async fn test_capture_at_configured_oversample_with_controls_hidden() {
        let surface = MockSurface::new(630, 891);
        let sink = Arc::new(MockDocumentSink::new());
        let spooler = Arc::new(MockPrintSpooler::new());

        let output = renderer(sink.clone(), spooler.clone())
            .render(&surface, "COR", RenderOptions::default())
            .await
            .unwrap();

        assert_eq!(surface.capture_scales().await, vec![3]);
        assert_eq!(
            surface.hidden_during_capture().await,
            vec![vec!["printPDFButton".to_string()]]
        );
        assert!(surface.all_restored().await);
        assert_eq!(output.document.page_count(), 1);
        assert!(output.saved.is_none());
        assert!(!output.printed);
        assert!(sink.saved().await.is_empty());
        assert!(spooler.printed().await.is_empty());
    }

    #[tokio::test]
    async fn test_controls_restored_when_capture_fails() {
        let surface = MockSurface::new(630, 891);
        surface
            .set_next_error(RenderError::Capture("canvas tainted".into()))
            .await;

        let result = renderer(
            Arc::new(MockDocumentSink::new()),
            Arc::new(MockPrintSpooler::new()),
        )
        .render(&surface, "COR", RenderOptions::default())
        .await;

        assert!(matches!(result, Err(RenderError::Capture(_))));
        assert!(surface.all_restored().await);
    }

    #[tokio::test]
    async fn test_save_and_print_are_independent() {
        for (save, print) in [(true, false), (false, true), (true, true)] {
            let surface = MockSurface::new(630, 891);
            let sink = Arc::new(MockDocumentSink::new());
            let spooler = Arc::new(MockPrintSpooler::new());
            let options = RenderOptions {
                save,
                print,
                slice: false,
            };

            let output = renderer(sink.clone(), spooler.clone())
                .render(&surface, "COR", options)
                .await
                .unwrap();

            assert_eq!(sink.saved().await.len(), usize::from(save));
            assert_eq!(spooler.printed().await.len(), usize::from(print));
            assert_eq!(output.saved.is_some(), save);
            assert_eq!(output.printed, print);
        }
    }

    #[tokio::test]
    async fn test_slice_mode_pages() {
        // 2.5 A4 pages once scaled to page width
        let surface = MockSurface::new(2100, 7425);
        let output = renderer(
            Arc::new(MockDocumentSink::new()),
            Arc::new(MockPrintSpooler::new()),
        )
        .render(
            &surface,
            "COR",
            RenderOptions {
                slice: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(output.document.mode, RenderMode::Slice);
        let offsets: Vec<f64> = output.document.pages.iter().map(|p| p.y).collect();
        assert_eq!(offsets, vec![0.0, -297.0, -594.0]);
    }

    #[test]
    fn test_compose_rejects_empty_image() {
        let renderer = renderer(
            Arc::new(MockDocumentSink::new()),
            Arc::new(MockPrintSpooler::new()),
        );
        let image = Raster {
            width: 0,
            height: 0,
            scale: 3,
            media_type: "image/png".into(),
            data: vec![],
        };
        let err = renderer.compose("COR", image, RenderMode::Fit).unwrap_err();
        assert!(matches!(err, RenderError::EmptyCapture { .. }));
    }
}
