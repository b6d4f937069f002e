//! Page geometry for print documents. All lengths are page units (mm).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// A4 portrait.
    pub const A4: PageSize = PageSize {
        width: 210.0,
        height: 297.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Where the captured image is drawn on a page. `y` may be negative: the
/// image origin sits above the page and only the overlapping band prints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale the image to fit one page, preserving aspect ratio, and center it.
///
/// Returns `None` for an image with a zero dimension.
pub fn fit_to_page(page: PageSize, image_width: u32, image_height: u32) -> Option<Placement> {
    if image_width == 0 || image_height == 0 {
        return None;
    }

    let (iw, ih) = (f64::from(image_width), f64::from(image_height));
    let scale = (page.width / iw).min(page.height / ih);
    let width = iw * scale;
    let height = ih * scale;

    Some(Placement {
        x: (page.width - width) / 2.0,
        y: (page.height - height) / 2.0,
        width,
        height,
    })
}

/// Scale the image to page width and tile it over as many pages as needed.
///
/// Page `i` draws the image at `y = -page.height * i`, so consecutive pages
/// show adjacent bands with no gap or overlap.
pub fn slice_pages(page: PageSize, image_width: u32, image_height: u32) -> Vec<Placement> {
    if image_width == 0 || image_height == 0 {
        return Vec::new();
    }

    let width = page.width;
    let height = f64::from(image_height) * page.width / f64::from(image_width);
    let count = page_count(height, page.height);

    (0..count)
        .map(|i| Placement {
            x: 0.0,
            y: -page.height * i as f64,
            width,
            height,
        })
        .collect()
}

/// `ceil(content / page)`, at least one page. Tolerates float noise at exact
/// multiples.
fn page_count(content_height: f64, page_height: f64) -> usize {
    let ratio = content_height / page_height;
    let rounded = ratio.round();
    let pages = if (ratio - rounded).abs() < 1e-9 {
        rounded
    } else {
        ratio.ceil()
    };
    pages.max(1.0) as usize
}
