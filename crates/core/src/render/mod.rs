//! Document rendering: layout capture to a paginated print document.
//!
//! ```text
//! Layout ──hide controls──▶ CaptureSurface::capture(3×) ──restore──▶ Raster
//!                                                                     │
//!                    fit: one page, scaled and centered  ◀────────────┤
//!                    slice: page width, ceil(H/h) pages  ◀────────────┘
//!                                     │
//!                         PrintDocument ──▶ DocumentSink (save)
//!                                       ──▶ PrintSpooler (print)
//! ```

mod document;
mod error;
mod geometry;
mod layout;
mod output;
mod renderer;
mod surface;

pub use document::{PrintDocument, Raster, RenderMode};
pub use error::RenderError;
pub use geometry::{fit_to_page, slice_pages, PageSize, Placement};
pub use layout::{Block, Column, Element, HiddenElement, Layout};
pub use output::{CommandSpooler, DocumentSink, FsDocumentSink, PrintSpooler, SavedDocument};
pub use renderer::{DocumentRenderer, RenderOptions, RenderOutput};
pub use surface::{render_lines, CaptureSurface, TextSurface};
