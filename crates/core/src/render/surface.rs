use async_trait::async_trait;
use tokio::sync::RwLock;

use super::document::Raster;
use super::error::RenderError;
use super::layout::{Block, HiddenElement, Layout};

/// Something that can draw a layout and hand back an image of it.
#[async_trait]
pub trait CaptureSurface: Send + Sync {
    /// Hide elements matching `ids` or `classes`; the handles restore them.
    async fn hide_controls(
        &self,
        ids: &[String],
        classes: &[String],
    ) -> Result<Vec<HiddenElement>, RenderError>;

    /// Capture the visible layout at `scale`× resolution.
    async fn capture(&self, scale: u32) -> Result<Raster, RenderError>;

    /// Undo [`CaptureSurface::hide_controls`].
    async fn restore_controls(&self, hidden: &[HiddenElement]) -> Result<(), RenderError>;
}

/// Pixel size of one character cell before oversampling.
const CELL_WIDTH: u32 = 8;
const CELL_HEIGHT: u32 = 16;

/// Draws a layout as fixed-width text. One character cell maps to
/// `CELL_WIDTH x CELL_HEIGHT` pixels times the oversampling factor.
#[derive(Debug)]
pub struct TextSurface {
    layout: RwLock<Layout>,
    columns: usize,
}

impl TextSurface {
    pub fn new(layout: Layout) -> Self {
        Self::with_columns(layout, 96)
    }

    pub fn with_columns(layout: Layout, columns: usize) -> Self {
        Self {
            layout: RwLock::new(layout),
            columns: columns.max(20),
        }
    }

    /// Current layout, including visibility.
    pub async fn layout(&self) -> Layout {
        self.layout.read().await.clone()
    }
}

#[async_trait]
impl CaptureSurface for TextSurface {
    async fn hide_controls(
        &self,
        ids: &[String],
        classes: &[String],
    ) -> Result<Vec<HiddenElement>, RenderError> {
        Ok(self.layout.write().await.hide(ids, classes))
    }

    async fn capture(&self, scale: u32) -> Result<Raster, RenderError> {
        let layout = self.layout.read().await;
        let lines = render_lines(&layout, self.columns);
        let width = lines
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as u32;

        Ok(Raster {
            width: width * CELL_WIDTH * scale,
            height: lines.len() as u32 * CELL_HEIGHT * scale,
            scale,
            media_type: "text/plain".to_string(),
            data: lines.join("\n").into_bytes(),
        })
    }

    async fn restore_controls(&self, hidden: &[HiddenElement]) -> Result<(), RenderError> {
        self.layout.write().await.restore(hidden);
        Ok(())
    }
}

/// Lay out the visible elements as text lines no wider than `columns`.
pub fn render_lines(layout: &Layout, columns: usize) -> Vec<String> {
    let mut out = Vec::new();
    for element in layout.visible() {
        match &element.block {
            Block::Heading { text } => {
                out.push(center(&text.to_uppercase(), columns));
            }
            Block::Text { text } => {
                out.push(center(text, columns));
            }
            Block::Fields { fields } => {
                let label_width = fields.iter().map(|(l, _)| l.len()).max().unwrap_or(0) + 1;
                for (label, value) in fields {
                    out.push(clip(
                        &format!("{:<width$} {}", format!("{}:", label), value, width = label_width),
                        columns,
                    ));
                }
            }
            Block::Table { headers, rows } => {
                let widths = column_widths(headers, rows);
                out.push(clip(&table_row(headers, &widths), columns));
                out.push(clip(&"-".repeat(widths.iter().sum::<usize>() + 3 * widths.len()), columns));
                for row in rows {
                    out.push(clip(&table_row(row, &widths), columns));
                }
            }
            Block::Columns { columns: cols } => {
                if cols.is_empty() {
                    continue;
                }
                let col_width = (columns / cols.len()).saturating_sub(2).max(10);
                let cells: Vec<Vec<String>> = cols
                    .iter()
                    .map(|c| {
                        let mut cell = vec![c.heading.clone()];
                        if c.lines.is_empty() {
                            cell.extend(c.placeholder.clone());
                        }
                        cell.extend(c.lines.iter().map(|(name, amount)| {
                            let pad = col_width.saturating_sub(name.len() + amount.len()).max(1);
                            format!("{}{}{}", name, " ".repeat(pad), amount)
                        }));
                        cell
                    })
                    .collect();
                let height = cells.iter().map(Vec::len).max().unwrap_or(0);
                for i in 0..height {
                    let line: Vec<String> = cells
                        .iter()
                        .map(|cell| {
                            let text = cell.get(i).map(String::as_str).unwrap_or("");
                            format!("{:<width$}", truncate(text, col_width), width = col_width)
                        })
                        .collect();
                    out.push(clip(line.join("  ").trim_end(), columns));
                }
            }
            Block::Signature { label } => {
                out.push(String::new());
                out.push(format!("{} {}", label, "_".repeat(30)));
            }
            Block::Control { label } => {
                out.push(format!("[ {} ]", label));
            }
        }
        out.push(String::new());
    }
    out
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            format!("{:<width$}", cell, width = *w)
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn center(text: &str, columns: usize) -> String {
    let len = text.chars().count();
    if len >= columns {
        return truncate(text, columns);
    }
    format!("{}{}", " ".repeat((columns - len) / 2), text)
}

fn clip(line: &str, columns: usize) -> String {
    truncate(line, columns)
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::layout::{Column, Element};

    fn layout() -> Layout {
        let mut layout = Layout::new("Certificate");
        layout
            .push(Element::new(Block::Heading {
                text: "Registration Form".into(),
            }))
            .push(Element::new(Block::Columns {
                columns: vec![
                    Column {
                        heading: "Lab Fees".into(),
                        lines: vec![],
                        placeholder: Some("No billings available.".into()),
                    },
                    Column {
                        heading: "Assessment".into(),
                        lines: vec![("Tuition".into(), "5000.00".into())],
                        placeholder: Some("No billings available.".into()),
                    },
                ],
            }))
            .push(
                Element::new(Block::Control {
                    label: "Print PDF".into(),
                })
                .with_id("printPDFButton"),
            );
        layout
    }

    #[test]
    fn test_render_lines() {
        let lines = render_lines(&layout(), 80);
        let text = lines.join("\n");
        assert!(text.contains("REGISTRATION FORM"));
        assert!(text.contains("No billings available."));
        assert!(text.contains("Tuition"));
        assert!(text.contains("[ Print PDF ]"));
        assert!(lines.iter().all(|l| l.chars().count() <= 80));
    }

    #[tokio::test]
    async fn test_capture_excludes_hidden_controls() {
        let surface = TextSurface::with_columns(layout(), 80);
        let hidden = surface
            .hide_controls(&["printPDFButton".into()], &[])
            .await
            .unwrap();

        let raster = surface.capture(3).await.unwrap();
        let text = String::from_utf8(raster.data.clone()).unwrap();
        assert!(!text.contains("Print PDF"));
        assert_eq!(raster.scale, 3);
        assert_eq!(raster.height % (CELL_HEIGHT * 3), 0);
        assert!(raster.width > 0);

        surface.restore_controls(&hidden).await.unwrap();
        assert_eq!(surface.layout().await, layout());
    }
}
