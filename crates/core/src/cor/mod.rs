//! Certificate of registration (COR): the committed enrollment snapshot and
//! its printable layout.

mod certificate;
mod record;

pub use certificate::{certificate_layout, CertificateHeader, PRINT_BUTTON_ID};
pub use record::EnrollmentRecord;
