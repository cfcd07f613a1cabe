//! Artifact layout on local disk.
//!
//! Every extracted file lands at
//! `<base>/<category-dir>/<base-name>-converted.txt`. The path depends only
//! on the category and the source name, so re-running overwrites the same
//! file instead of accumulating versions.

use std::path::{Path, PathBuf};

use crate::error::WriteError;
use crate::formats::Category;
use crate::models::OutputArtifact;

const ARTIFACT_SUFFIX: &str = "-converted.txt";
const FALLBACK_NAME: &str = "untitled";

/// Writes extracted text beneath an explicit base directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    base_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Destination for a source file of the given category.
    pub fn artifact_path(&self, category: Category, source_name: &str) -> PathBuf {
        self.base_dir
            .join(category.dir_name())
            .join(format!("{}{}", base_name(source_name), ARTIFACT_SUFFIX))
    }

    /// Write `text`, creating the category directory if needed and replacing
    /// any previous artifact at the same path.
    pub async fn write(
        &self,
        text: &str,
        source_name: &str,
        category: Category,
    ) -> Result<OutputArtifact, WriteError> {
        let path = self.artifact_path(category, source_name);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| WriteError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, text.as_bytes())
            .await
            .map_err(|source| WriteError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(OutputArtifact {
            path,
            bytes_written: text.len() as u64,
        })
    }
}

/// Local file stem for a remote display name.
///
/// Strips the last extension (but not a leading dot), replaces characters
/// that are unsafe in file names with `_`, and trims trailing dots and
/// spaces. Names that end up empty become `untitled`.
pub fn base_name(source_name: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(idx) if idx > 0 => &source_name[..idx],
        _ => source_name,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extension_is_stripped() {
        assert_eq!(base_name("Report.docx"), "Report");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(base_name("Budget 2024"), "Budget 2024");
    }

    #[test]
    fn dotfiles_keep_their_name() {
        assert_eq!(base_name(".env"), ".env");
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(base_name("Q1/Q2: plan?.pdf"), "Q1_Q2_ plan_");
        assert_eq!(base_name("a\\b|c*d.txt"), "a_b_c_d");
        assert_eq!(base_name("tab\there.txt"), "tab_here");
    }

    #[test]
    fn empty_names_fall_back() {
        assert_eq!(base_name(""), "untitled");
        assert_eq!(base_name("   "), "untitled");
        assert_eq!(base_name("...."), "untitled");
        assert_eq!(base_name("..."), "untitled");
    }

    #[test]
    fn path_follows_category_layout() {
        let writer = OutputWriter::new("/out");
        assert_eq!(
            writer.artifact_path(Category::WordDoc, "Report.docx"),
            PathBuf::from("/out/word-doc/Report-converted.txt")
        );
        assert_eq!(
            writer.artifact_path(Category::Spreadsheet, "Budget"),
            PathBuf::from("/out/spreadsheet/Budget-converted.txt")
        );
    }

    #[tokio::test]
    async fn write_creates_directory_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().join("saved-outputs"));
        let text = "line one\nline two — ünïcode\n";

        let artifact = writer.write(text, "notes.txt", Category::PlainText).await.unwrap();
        assert_eq!(
            artifact.path,
            tmp.path()
                .join("saved-outputs")
                .join("plain-text")
                .join("notes-converted.txt")
        );
        assert_eq!(artifact.bytes_written, text.len() as u64);
        assert_eq!(std::fs::read(&artifact.path).unwrap(), text.as_bytes());
    }

    #[tokio::test]
    async fn rewrite_overwrites_in_place() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path());

        writer
            .write("a much longer first version", "doc", Category::Document)
            .await
            .unwrap();
        let second = writer.write("short", "doc", Category::Document).await.unwrap();

        assert_eq!(std::fs::read_to_string(&second.path).unwrap(), "short");
        let entries = std::fs::read_dir(tmp.path().join("document")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the category directory should go.
        std::fs::write(tmp.path().join("pdf"), "blocker").unwrap();
        let writer = OutputWriter::new(tmp.path());

        let err = writer
            .write("text", "scan.pdf", Category::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::CreateDir { .. }), "{}", err);
    }
}
