//! Polarity review corpus loader.
//!
//! Epistemic foundation:
//! - K_i: The corpus root holds `pos/` and `neg/`, one review per `.txt` file
//! - K_i: File names look like `cv123_4567.txt`; the fold is `123 / 100 + 1`
//! - B_i: The directory may be missing or hold stray files → Result

use crate::models::{InferlabError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Review polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Negative review (label 0)
    Neg,
    /// Positive review (label 1)
    Pos,
}

impl Polarity {
    /// Numeric class label.
    pub fn label(self) -> usize {
        match self {
            Self::Neg => 0,
            Self::Pos => 1,
        }
    }

    /// Sub-directory holding reviews of this polarity.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Pos => "pos",
        }
    }
}

/// One review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// File name without directory
    pub name: String,
    /// Lower-cased text, newlines replaced by spaces
    pub text: String,
    /// Review polarity
    pub polarity: Polarity,
    /// Fold number (1-based) from the file name
    pub fold: usize,
}

/// Fold encoded in a corpus file name: characters 2..5 as a number, `/ 100 + 1`.
pub fn fold_from_file_name(name: &str) -> Option<usize> {
    let digits = name.get(2..5)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().map(|n| n / 100 + 1)
}

/// Labelled review collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Wrap already-built documents.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load `root/pos/*.txt` then `root/neg/*.txt`.
    pub fn load(root: &Path) -> Result<Self> {
        let mut files: Vec<(PathBuf, Polarity)> = Vec::new();
        for polarity in [Polarity::Pos, Polarity::Neg] {
            let dir = root.join(polarity.dir_name());
            if !dir.is_dir() {
                return Err(InferlabError::io(
                    format!("corpus directory {} not found", dir.display()),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "missing directory"),
                ));
            }
            let pattern = dir.join("*.txt");
            let paths = glob::glob(&pattern.to_string_lossy())
                .map_err(|e| InferlabError::InvalidInput(format!("bad corpus pattern: {e}")))?;
            let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
            found.sort();
            debug!(polarity = polarity.dir_name(), files = found.len(), "Listed corpus files");
            files.extend(found.into_iter().map(|p| (p, polarity)));
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} reviews")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        let mut documents = Vec::with_capacity(files.len());
        for (path, polarity) in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let fold = fold_from_file_name(&name)
                .ok_or_else(|| InferlabError::CorpusFileName(path.clone()))?;
            let bytes = std::fs::read(&path)
                .map_err(|e| InferlabError::io(format!("reading {}", path.display()), e))?;
            let text = String::from_utf8_lossy(&bytes)
                .to_lowercase()
                .replace(['\r', '\n'], " ");
            documents.push(Document {
                name,
                text,
                polarity,
                fold,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();

        let corpus = Self { documents };
        info!(
            documents = corpus.len(),
            positive = corpus.count(Polarity::Pos),
            negative = corpus.count(Polarity::Neg),
            "Loaded corpus"
        );
        Ok(corpus)
    }

    /// All documents.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Document texts.
    pub fn texts(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.text.as_str()).collect()
    }

    /// Class labels (pos = 1, neg = 0).
    pub fn labels(&self) -> Vec<usize> {
        self.documents.iter().map(|d| d.polarity.label()).collect()
    }

    /// Fold numbers.
    pub fn folds(&self) -> Vec<usize> {
        self.documents.iter().map(|d| d.fold).collect()
    }

    /// Number of documents with `polarity`.
    pub fn count(&self, polarity: Polarity) -> usize {
        self.documents.iter().filter(|d| d.polarity == polarity).count()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fold_from_file_name() {
        assert_eq!(fold_from_file_name("cv000_29416.txt"), Some(1));
        assert_eq!(fold_from_file_name("cv099_1.txt"), Some(1));
        assert_eq!(fold_from_file_name("cv100_1.txt"), Some(2));
        assert_eq!(fold_from_file_name("cv999_13106.txt"), Some(10));
        assert_eq!(fold_from_file_name("readme"), None);
        assert_eq!(fold_from_file_name("cv"), None);
    }

    #[test]
    fn test_load_labels_and_normalizes_text() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pos")).unwrap();
        fs::create_dir_all(dir.path().join("neg")).unwrap();
        fs::write(dir.path().join("pos/cv000_1.txt"), "Great\nFilm").unwrap();
        fs::write(dir.path().join("pos/cv250_2.txt"), "loved it").unwrap();
        fs::write(dir.path().join("neg/cv900_3.txt"), "Dull").unwrap();
        fs::write(dir.path().join("neg/notes.md"), "ignored").unwrap();

        let corpus = Corpus::load(dir.path()).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.labels(), vec![1, 1, 0]);
        assert_eq!(corpus.folds(), vec![1, 3, 10]);
        assert_eq!(corpus.texts()[0], "great film");
        assert_eq!(corpus.count(Polarity::Neg), 1);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pos")).unwrap();
        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(matches!(err, InferlabError::Io { .. }));
    }

    #[test]
    fn test_bad_file_name() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pos")).unwrap();
        fs::create_dir_all(dir.path().join("neg")).unwrap();
        fs::write(dir.path().join("neg/review.txt"), "meh").unwrap();
        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(matches!(err, InferlabError::CorpusFileName(_)));
    }
}
