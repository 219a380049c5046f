//! File content extraction.
//!
//! Turns a stored asset into page-level records: `.txt` yields a single
//! record holding the whole UTF-8 text, `.pdf` one record per page with
//! `{page, source}` metadata. Unsupported extensions and unreadable
//! files yield an empty sequence; the processing pipeline records a
//! per-file failure instead of aborting the run.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

/// One extracted page with its source metadata.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub page_content: String,
    pub metadata: Value,
}

/// Extension of a file name, lowercase, without the dot.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

pub struct FileParser;

impl FileParser {
    /// Extract the pages of one stored file. `project_dir` is the
    /// project's upload directory; `file_name` the server-assigned asset
    /// name.
    pub async fn parse(project_dir: &Path, file_name: &str) -> Vec<ParsedPage> {
        let path = project_dir.join(file_name);

        if !path.exists() {
            tracing::warn!(file = file_name, "file missing on disk");
            return vec![];
        }

        match file_extension(file_name).as_str() {
            "txt" => Self::parse_text(&path, file_name).await,
            "pdf" => Self::parse_pdf(path, file_name.to_string()).await,
            other => {
                tracing::warn!(file = file_name, extension = other, "unsupported file type");
                vec![]
            }
        }
    }

    async fn parse_text(path: &Path, file_name: &str) -> Vec<ParsedPage> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => vec![ParsedPage {
                page_content: content,
                metadata: json!({ "source": file_name }),
            }],
            Err(err) => {
                tracing::error!(file = file_name, %err, "failed to read text file");
                vec![]
            }
        }
    }

    async fn parse_pdf(path: PathBuf, file_name: String) -> Vec<ParsedPage> {
        // pdf extraction is CPU-bound; keep it off the async workers
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_by_pages(&path)
        })
        .await;

        let pages = match pages {
            Ok(Ok(pages)) => pages,
            Ok(Err(err)) => {
                tracing::error!(file = %file_name, %err, "failed to parse pdf");
                return vec![];
            }
            Err(err) => {
                tracing::error!(file = %file_name, %err, "pdf parse task failed");
                return vec![];
            }
        };

        pages
            .into_iter()
            .enumerate()
            .map(|(index, page_content)| {
                let mut metadata = Map::new();
                metadata.insert("page".to_string(), json!(index + 1));
                metadata.insert("source".to_string(), json!(file_name));
                ParsedPage {
                    page_content,
                    metadata: Value::Object(metadata),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("notes.TXT"), "txt");
        assert_eq!(file_extension("report.pdf"), "pdf");
        assert_eq!(file_extension("no_extension"), "");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
    }

    #[tokio::test]
    async fn test_parse_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("a.txt")).unwrap();
        writeln!(file, "The capital of France is Paris.").unwrap();

        let pages = FileParser::parse(dir.path(), "a.txt").await;

        assert_eq!(pages.len(), 1);
        assert!(pages[0].page_content.contains("Paris"));
        assert_eq!(pages[0].metadata["source"], "a.txt");
    }

    #[tokio::test]
    async fn test_parse_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pages = FileParser::parse(dir.path(), "missing.txt").await;
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_parse_unsupported_extension_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"1234").unwrap();

        let pages = FileParser::parse(dir.path(), "data.bin").await;
        assert!(pages.is_empty());
    }
}
