use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::RenderError;
use super::geometry::{PageSize, Placement};

/// Page break between the pages of a text document.
const FORM_FEED: u8 = 0x0c;

/// Tolerance when comparing page-unit offsets.
const EPSILON: f64 = 1e-9;

/// Captured image of a layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Raster {
    /// Pixel size, oversampling included.
    pub width: u32,
    pub height: u32,
    /// Oversampling factor the capture ran at.
    pub scale: u32,
    pub media_type: String,
    /// Encoded image; stored next to the manifest, not inside it.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Raster {
    /// File extension for `media_type`.
    pub fn extension(&self) -> &'static str {
        match self.media_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "text/plain" => "txt",
            _ => "bin",
        }
    }

    pub fn is_text(&self) -> bool {
        self.media_type == "text/plain"
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Whole image scaled onto one page.
    Fit,
    /// Image at page width, tiled across pages.
    Slice,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Fit => "fit",
            RenderMode::Slice => "slice",
        }
    }
}

/// A print-ready document: one captured image and where it lands on each page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrintDocument {
    pub id: Uuid,
    pub title: String,
    pub page: PageSize,
    pub mode: RenderMode,
    pub image: Raster,
    /// One placement per page, in page order.
    pub pages: Vec<Placement>,
    pub created_at: DateTime<Utc>,
}

impl PrintDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// File stem used when the document is saved.
    pub fn file_stem(&self) -> String {
        let slug: String = self
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}", slug.trim_matches('_'), self.id.simple())
    }

    /// Print-ready content, one entry per page, with each page's placement
    /// applied.
    ///
    /// Text captures are cut into whole lines. In fit mode the single page is
    /// padded by its margins; in slice mode each page gets the lines whose top
    /// edge falls inside its band. Other media only paginate onto one page.
    pub fn paginate(&self) -> Result<Vec<Vec<u8>>, RenderError> {
        if !self.image.is_text() {
            return match self.pages.len() {
                1 => Ok(vec![self.image.data.clone()]),
                pages => Err(RenderError::Unpaginated {
                    media_type: self.image.media_type.clone(),
                    pages,
                }),
            };
        }

        let text = String::from_utf8_lossy(&self.image.data);
        let lines: Vec<&str> = text.split('\n').collect();
        Ok(self
            .pages
            .iter()
            .map(|placement| match self.mode {
                RenderMode::Fit => fit_text(&lines, placement),
                RenderMode::Slice => slice_text(&lines, placement, self.page.height),
            })
            .map(String::into_bytes)
            .collect())
    }

    /// All pages joined by form feeds, as handed to a printer.
    pub fn print_data(&self) -> Result<Vec<u8>, RenderError> {
        let pages = self.paginate()?;
        let mut data = Vec::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                data.push(FORM_FEED);
            }
            data.extend_from_slice(page);
        }
        Ok(data)
    }
}

/// One page holding every line, shifted down and right by the margins.
fn fit_text(lines: &[&str], placement: &Placement) -> String {
    let rows = lines.len().max(1) as f64;
    let columns = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let top = (placement.y / (placement.height / rows)).round().max(0.0) as usize;
    let left = (placement.x / (placement.width / columns)).round().max(0.0) as usize;

    let indent = " ".repeat(left);
    let body: Vec<String> = lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect();
    format!("{}{}", "\n".repeat(top), body.join("\n"))
}

/// The band of lines visible through a page with the image drawn at
/// `placement.y`.
fn slice_text(lines: &[&str], placement: &Placement, page_height: f64) -> String {
    let line_height = placement.height / lines.len().max(1) as f64;
    let top = -placement.y;
    let bottom = top + page_height;
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let edge = *i as f64 * line_height;
            edge >= top - EPSILON && edge < bottom - EPSILON
        })
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}
