//! Writing the aggregated document to disk.

use std::path::Path;

use super::aggregate::AggregatedDocument;
use super::types::ExtractError;

/// Make sure the output location can take a file before any page is touched.
///
/// Creates missing parent directories and rejects a destination that is a
/// directory or sits under a regular file.
pub async fn prepare_output(path: &Path) -> Result<(), ExtractError> {
    let output_error = |source| ExtractError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(output_error)?;
        let metadata = tokio::fs::metadata(parent).await.map_err(output_error)?;
        if metadata.permissions().readonly() {
            return Err(output_error(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "output directory is read-only",
            )));
        }
    }

    if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir()) {
        return Err(output_error(std::io::Error::new(
            std::io::ErrorKind::Other,
            "output path is a directory",
        )));
    }

    Ok(())
}

/// Write the rendered document as UTF-8, creating parent directories.
///
/// Returns the number of characters written. An empty document is never
/// written; callers report it as a no-text run instead.
pub async fn write_document(
    document: &AggregatedDocument,
    path: &Path,
) -> Result<Option<usize>, ExtractError> {
    if document.is_empty() {
        return Ok(None);
    }

    let output_error = |source| ExtractError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(output_error)?;
    }

    let rendered = document.render();
    tokio::fs::write(path, rendered.as_bytes())
        .await
        .map_err(output_error)?;

    tracing::info!("Wrote {} pages to {}", document.len(), path.display());
    Ok(Some(rendered.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extract::types::PageOutcome;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("nested").join("out.txt");
        let doc = AggregatedDocument::from_outcomes(&[PageOutcome::Done {
            page: 1,
            text: "café".into(),
        }]);

        let chars = write_document(&doc, &path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "=== PAGE 1 ===\ncafé\n");
        assert_eq!(chars, Some(written.chars().count()));
    }

    #[tokio::test]
    async fn test_empty_document_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");

        let chars = write_document(&AggregatedDocument::default(), &path)
            .await
            .unwrap();

        assert_eq!(chars, None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_parent_is_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let doc = AggregatedDocument::from_outcomes(&[PageOutcome::Done {
            page: 1,
            text: "x".into(),
        }]);

        let err = write_document(&doc, &blocker.join("out.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Output { .. }));
    }

    #[tokio::test]
    async fn test_prepare_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("out.txt");

        prepare_output(&path).await.unwrap();

        assert!(dir.path().join("a").join("b").is_dir());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_prepare_rejects_path_under_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let err = prepare_output(&blocker.join("sub").join("out.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Output { .. }));
    }

    #[tokio::test]
    async fn test_prepare_rejects_directory_destination() {
        let dir = TempDir::new().unwrap();

        let err = prepare_output(dir.path()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Output { .. }));
    }
}
