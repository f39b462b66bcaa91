use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::FileError;
use crate::models::{Chunk, FileFailure};

/// One transcript's text and the name it is keyed by
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the corpus root, `/`-separated
    pub filename: String,
    pub text: String,
}

/// Everything read from a corpus directory
#[derive(Debug, Default)]
pub struct Corpus {
    /// Sorted by filename
    pub files: Vec<SourceFile>,
    /// Files that could not be read
    pub failures: Vec<FileFailure>,
}

/// Read every `.txt` file under a directory, recursively
///
/// Unreadable files are recorded as failures and do not stop the load.
/// Only a missing or unlistable root directory is an error.
pub fn load_corpus(dir: &Path) -> Result<Corpus> {
    let mut paths = Vec::new();
    collect_transcripts(dir, &mut paths)
        .with_context(|| format!("Failed to list corpus directory: {:?}", dir))?;
    paths.sort();

    let mut corpus = Corpus::default();
    for path in paths {
        let filename = relative_name(dir, &path);
        match std::fs::read_to_string(&path) {
            Ok(text) => corpus.files.push(SourceFile { filename, text }),
            Err(e) => {
                let reason = FileError::from(e).to_string();
                warn!("Skipping {}: {}", filename, reason);
                corpus.failures.push(FileFailure { filename, reason });
            }
        }
    }

    corpus.files.sort_by(|a, b| a.filename.cmp(&b.filename));
    info!(
        "Loaded {} transcripts from {:?} ({} unreadable)",
        corpus.files.len(),
        dir,
        corpus.failures.len()
    );
    Ok(corpus)
}

/// Read a single transcript file
pub fn load_transcript(path: &Path) -> Result<SourceFile> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile { filename, text })
}

fn collect_transcripts(dir: &Path, paths: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_transcripts(&path, paths)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        {
            paths.push(path);
        } else {
            debug!("Ignoring non-transcript file {:?}", path);
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Load pre-computed chunks from a JSON array
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let chunks: Vec<Chunk> =
        serde_json::from_str(&content).context("Failed to parse chunk JSON")?;
    info!("Loaded {} chunks from {:?}", chunks.len(), path);
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_corpus_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("week4")).unwrap();
        std::fs::write(dir.path().join("vr002_EP1.txt"), "vr002_c: hi").unwrap();
        std::fs::write(dir.path().join("week4").join("vr002_EP4.TXT"), "vr002_c: hello").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let corpus = load_corpus(dir.path()).unwrap();

        let names: Vec<&str> = corpus.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["vr002_EP1.txt", "week4/vr002_EP4.TXT"]);
        assert!(corpus.failures.is_empty());
    }

    #[test]
    fn test_missing_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_corpus(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_load_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.json");
        std::fs::write(
            &path,
            r#"[
                {"chunk_id": "c1", "filename": "a.txt", "chunk_index": 0, "text": "hi", "embedding": [0.1, 0.2]},
                {"chunk_id": "c2", "filename": "a.txt", "chunk_index": 1, "text": "there"}
            ]"#,
        )
        .unwrap();

        let chunks = load_chunks(&path).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].embedding.as_deref(), Some(&[0.1f32, 0.2][..]));
        assert!(chunks[1].embedding.is_none());
    }
}
