//! Supported content types and how each one is fetched.
//!
//! | MIME type | Category | Fetch | Output dir |
//! |-----------|----------|-------|------------|
//! | `application/pdf` | pdf | media (binary) | `pdf` |
//! | `application/vnd.google-apps.document` | document | export `text/plain` | `document` |
//! | `application/vnd.google-apps.spreadsheet` | spreadsheet | export `text/csv` | `spreadsheet` |
//! | `application/vnd.google-apps.presentation` | presentation | export `text/plain` | `presentation` |
//! | `application/vnd.openxmlformats-officedocument.wordprocessingml.document` | word-doc | media (binary) | `word-doc` |
//! | `text/plain` | plain-text | media (text) | `plain-text` |

use std::fmt;

use serde::Serialize;

use crate::models::ResponseEncoding;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_GOOGLE_DOC: &str = "application/vnd.google-apps.document";
pub const MIME_GOOGLE_SHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const MIME_GOOGLE_SLIDES: &str = "application/vnd.google-apps.presentation";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_CSV: &str = "text/csv";

/// Extraction category: selects the decoding algorithm and the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Pdf,
    Document,
    Spreadsheet,
    Presentation,
    WordDoc,
    PlainText,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Pdf,
        Category::Document,
        Category::Spreadsheet,
        Category::Presentation,
        Category::WordDoc,
        Category::PlainText,
    ];

    /// Directory name under the output root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Pdf => "pdf",
            Category::Document => "document",
            Category::Spreadsheet => "spreadsheet",
            Category::Presentation => "presentation",
            Category::WordDoc => "word-doc",
            Category::PlainText => "plain-text",
        }
    }

    /// The declared MIME type that maps to this category.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Category::Pdf => MIME_PDF,
            Category::Document => MIME_GOOGLE_DOC,
            Category::Spreadsheet => MIME_GOOGLE_SHEET,
            Category::Presentation => MIME_GOOGLE_SLIDES,
            Category::WordDoc => MIME_DOCX,
            Category::PlainText => MIME_TEXT,
        }
    }

    pub fn from_mime(mime_type: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.mime_type() == mime_type)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Which remote operation retrieves a category's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Server-side conversion to `target_mime`.
    Export { target_mime: &'static str },
    /// Raw download; `text` selects text or binary handling.
    Media { text: bool },
}

impl FetchPlan {
    /// Encoding to expect when the transport returns a plain body.
    pub fn default_encoding(&self) -> ResponseEncoding {
        match self {
            FetchPlan::Export { .. } => ResponseEncoding::ExportText,
            FetchPlan::Media { text: true } => ResponseEncoding::MediaText,
            FetchPlan::Media { text: false } => ResponseEncoding::MediaBinary,
        }
    }
}

impl fmt::Display for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPlan::Export { target_mime } => write!(f, "export {}", target_mime),
            FetchPlan::Media { text: true } => f.write_str("media (text)"),
            FetchPlan::Media { text: false } => f.write_str("media (binary)"),
        }
    }
}

/// Native editor formats are exported server-side; everything else is downloaded.
pub fn fetch_plan(category: Category) -> FetchPlan {
    match category {
        Category::Document | Category::Presentation => FetchPlan::Export {
            target_mime: MIME_TEXT,
        },
        Category::Spreadsheet => FetchPlan::Export {
            target_mime: MIME_CSV,
        },
        Category::Pdf | Category::WordDoc => FetchPlan::Media { text: false },
        Category::PlainText => FetchPlan::Media { text: true },
    }
}
