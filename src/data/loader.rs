// ============================================================
// Layer 4 — Text Loader
// ============================================================
// Loads the training text. Each dataset path is either a
// UTF-8 file or a directory whose .txt files are read in
// sorted name order, so the corpus is identical across runs.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

/// Loads plain-text documents from a list of files and directories.
pub struct TextLoader {
    paths: Vec<PathBuf>,
}

impl TextLoader {
    pub fn new<P: AsRef<Path>>(paths: &[P]) -> Self {
        Self {
            paths: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }
}

impl DocumentSource for TextLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if self.paths.is_empty() {
            bail!("No dataset paths given");
        }

        let mut docs = Vec::new();

        for path in &self.paths {
            if path.is_dir() {
                docs.extend(load_directory(path)?);
            } else {
                // An explicitly named file must be readable
                docs.push(load_single_text(path)?);
            }
        }

        tracing::info!("Successfully loaded {} documents", docs.len());
        Ok(docs)
    }
}

/// Read every `.txt` file in `dir`, skipping files that fail to load.
fn load_directory(dir: &Path) -> Result<Vec<Document>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    files.sort();

    let mut docs = Vec::with_capacity(files.len());
    for path in files {
        match load_single_text(&path) {
            Ok(doc) => {
                tracing::debug!("Loaded: {} ({} chars)", doc.source, doc.char_count());
                docs.push(doc);
            }
            Err(e) => {
                tracing::warn!("Skipping '{}': {:#}", path.display(), e);
            }
        }
    }

    if docs.is_empty() {
        tracing::warn!("Directory '{}' contains no readable .txt files", dir.display());
    }
    Ok(docs)
}

fn load_single_text(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Document::new(path.display().to_string(), text))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("char_rnn_loader_{name}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_directory_files_in_sorted_order() {
        let dir = scratch_dir("sorted");
        fs::write(dir.join("b.txt"), "second").unwrap();
        fs::write(dir.join("a.txt"), "first").unwrap();
        fs::write(dir.join("notes.md"), "ignored").unwrap();

        let docs = TextLoader::new(&[&dir]).load_all().unwrap();
        fs::remove_dir_all(&dir).ok();

        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("char_rnn_loader_definitely_missing.txt");
        assert!(TextLoader::new(&[missing]).load_all().is_err());
    }

    #[test]
    fn test_no_paths_is_an_error() {
        let none: [&str; 0] = [];
        assert!(TextLoader::new(&none).load_all().is_err());
    }
}
