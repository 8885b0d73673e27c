//! Word vector model and its lazily-initialized service
//!
//! The model is a fastText-style `.vec` text file: an optional `count dim`
//! header line followed by one `word v1 v2 ... vd` row per word.
//!
//! [`EmbeddingService`] loads it at most once per process. Any failure
//! (disabled by config, no path, missing file, corrupt file) pins the service
//! to [`ModelStatus::Disabled`] for its lifetime; there is no retry. The
//! failure is logged once and never returned to callers, who simply see no
//! model and score by tags alone.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{info, warn};
use uniconnect_common::config::SemanticConfig;

/// Why the model could not be made available
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("semantic scoring disabled by configuration")]
    Disabled,

    #[error("no embedding model path configured")]
    MissingPath,

    #[error("embedding model file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read embedding model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed embedding model at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("embedding model contains no vectors")]
    Empty,
}

/// In-memory word vectors, all of the same dimension
#[derive(Debug, Clone)]
pub struct WordVectors {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    /// Load a `.vec` text file
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            ModelLoadError::Io { source, .. } => ModelLoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse `.vec` text from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ModelLoadError> {
        let mut dim: Option<usize> = None;
        let mut vectors = HashMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|source| ModelLoadError::Io {
                path: PathBuf::new(),
                source,
            })?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();

            if index == 0 {
                if let Some(header_dim) = parse_header(word, &values) {
                    dim = Some(header_dim);
                    continue;
                }
            }

            let vector = values
                .iter()
                .map(|value| value.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| ModelLoadError::Parse {
                    line: line_no,
                    reason: format!("invalid component for {:?}: {}", word, e),
                })?;

            if let Some(position) = vector.iter().position(|value| !value.is_finite()) {
                return Err(ModelLoadError::Parse {
                    line: line_no,
                    reason: format!("non-finite component {} for {:?}", position + 1, word),
                });
            }

            match dim {
                Some(expected) if expected != vector.len() => {
                    return Err(ModelLoadError::Parse {
                        line: line_no,
                        reason: format!(
                            "expected {} components for {:?}, found {}",
                            expected,
                            word,
                            vector.len()
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    if vector.is_empty() {
                        return Err(ModelLoadError::Parse {
                            line: line_no,
                            reason: format!("no components for {:?}", word),
                        });
                    }
                    dim = Some(vector.len());
                }
            }

            // First occurrence wins
            vectors.entry(word.to_string()).or_insert(vector);
        }

        match dim {
            Some(dim) if !vectors.is_empty() => Ok(Self { dim, vectors }),
            _ => Err(ModelLoadError::Empty),
        }
    }

    /// Build from explicit entries; every vector must share one non-zero dimension
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ModelLoadError>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut dim = None;
        let mut vectors = HashMap::new();
        for (index, (word, vector)) in entries.into_iter().enumerate() {
            let expected = *dim.get_or_insert(vector.len());
            if expected == 0 || vector.len() != expected {
                return Err(ModelLoadError::Parse {
                    line: index + 1,
                    reason: format!("expected {} components, found {}", expected, vector.len()),
                });
            }
            if vector.iter().any(|value| !value.is_finite()) {
                return Err(ModelLoadError::Parse {
                    line: index + 1,
                    reason: "non-finite component".to_string(),
                });
            }
            vectors.entry(word.into()).or_insert(vector);
        }
        match dim {
            Some(dim) => Ok(Self { dim, vectors }),
            None => Err(ModelLoadError::Empty),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }
}

/// `count dim` header, both positive integers
fn parse_header(first: &str, rest: &[&str]) -> Option<usize> {
    if rest.len() != 1 {
        return None;
    }
    let _count: usize = first.parse().ok()?;
    rest[0].parse::<usize>().ok().filter(|dim| *dim > 0)
}

/// Externally visible model state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    /// No load attempted yet
    Unloaded,
    Loaded,
    /// Load failed or was disabled; permanent
    Disabled,
}

enum ModelState {
    Unloaded,
    Loaded(Arc<WordVectors>),
    Disabled,
}

/// Process-wide embedding resource, passed to scorers by reference
pub struct EmbeddingService {
    config: SemanticConfig,
    state: Mutex<ModelState>,
}

impl EmbeddingService {
    /// Service that loads `config.model_path` on first use when `config.enabled`
    pub fn new(config: SemanticConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ModelState::Unloaded),
        }
    }

    /// Service that never has a model
    pub fn disabled() -> Self {
        Self {
            config: SemanticConfig::default(),
            state: Mutex::new(ModelState::Disabled),
        }
    }

    /// Service with an already-loaded model
    pub fn with_vectors(vectors: WordVectors) -> Self {
        Self {
            config: SemanticConfig {
                enabled: true,
                model_path: None,
            },
            state: Mutex::new(ModelState::Loaded(Arc::new(vectors))),
        }
    }

    /// The loaded model, loading it on the first call
    ///
    /// Concurrent first callers wait on the lock while one of them loads.
    pub fn model(&self) -> Option<Arc<WordVectors>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            ModelState::Loaded(vectors) => return Some(Arc::clone(vectors)),
            ModelState::Disabled => return None,
            ModelState::Unloaded => {}
        }

        match self.load() {
            Ok(vectors) => {
                let vectors = Arc::new(vectors);
                *state = ModelState::Loaded(Arc::clone(&vectors));
                Some(vectors)
            }
            Err(e) => {
                match &e {
                    ModelLoadError::Disabled | ModelLoadError::MissingPath => {
                        info!("Semantic scoring unavailable ({}), using tag-based recommendations", e);
                    }
                    _ => {
                        warn!("Embedding model unavailable ({}), using tag-based recommendations", e);
                    }
                }
                *state = ModelState::Disabled;
                None
            }
        }
    }

    /// Current state without triggering a load
    pub fn status(&self) -> ModelStatus {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            ModelState::Unloaded => ModelStatus::Unloaded,
            ModelState::Loaded(_) => ModelStatus::Loaded,
            ModelState::Disabled => ModelStatus::Disabled,
        }
    }

    fn load(&self) -> Result<WordVectors, ModelLoadError> {
        if !self.config.enabled {
            return Err(ModelLoadError::Disabled);
        }
        let path = self.config.model_path.as_deref().ok_or(ModelLoadError::MissingPath)?;

        info!("Loading embedding model: {}", path.display());
        let vectors = WordVectors::load(path)?;
        info!(
            words = vectors.len(),
            dim = vectors.dim(),
            "Embedding model loaded"
        );
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_VEC: &str = "3 2\nmüzik 1.0 0.0\nkonser 0.9 0.1\nrobot 0.0 1.0\n";

    fn write_model(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parses_header_and_rows() {
        let vectors = WordVectors::from_reader(Cursor::new(SAMPLE_VEC)).unwrap();
        assert_eq!(vectors.dim(), 2);
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors.get("robot"), Some(&[0.0f32, 1.0][..]));
        assert!(vectors.get("tiyatro").is_none());
    }

    #[test]
    fn test_parses_without_header() {
        let vectors = WordVectors::from_reader(Cursor::new("a 1 2 3\nb 4 5 6\n\n")).unwrap();
        assert_eq!(vectors.dim(), 3);
        assert_eq!(vectors.len(), 2);
    }

    #[test]
    fn test_rejects_inconsistent_dimensions() {
        let err = WordVectors::from_reader(Cursor::new("2 2\na 1 2\nb 1 2 3\n")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { line: 3, .. }), "got {:?}", err);
    }

    #[test]
    fn test_rejects_unparsable_component() {
        let err = WordVectors::from_reader(Cursor::new("a 1 x\n")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { line: 1, .. }), "got {:?}", err);
    }

    #[test]
    fn test_rejects_non_finite_components() {
        for content in ["a 1 0\nb NaN 1\n", "a 1 0\nb 1 inf\n", "a -inf 0\n"] {
            let err = WordVectors::from_reader(Cursor::new(content)).unwrap_err();
            assert!(matches!(err, ModelLoadError::Parse { .. }), "{:?} -> {:?}", content, err);
        }
        assert!(WordVectors::from_entries([("a", vec![f32::NAN, 1.0])]).is_err());
    }

    #[test]
    fn test_service_model_with_nan_disables() {
        let file = write_model("3 2\nmüzik 1 0\nbozuk NaN 1\nkonser 0.9 0.1\n");
        let service = EmbeddingService::new(SemanticConfig {
            enabled: true,
            model_path: Some(file.path().to_path_buf()),
        });
        assert!(service.model().is_none());
        assert_eq!(service.status(), ModelStatus::Disabled);
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = WordVectors::from_reader(Cursor::new("0 300\n")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Empty), "got {:?}", err);
    }

    #[test]
    fn test_from_entries_checks_dimension() {
        assert!(WordVectors::from_entries([("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]).is_ok());
        assert!(WordVectors::from_entries([("a", vec![1.0, 0.0]), ("b", vec![1.0])]).is_err());
        assert!(WordVectors::from_entries(Vec::<(String, Vec<f32>)>::new()).is_err());
    }

    #[test]
    fn test_service_disabled_by_config_never_loads() {
        let file = write_model(SAMPLE_VEC);
        let service = EmbeddingService::new(SemanticConfig {
            enabled: false,
            model_path: Some(file.path().to_path_buf()),
        });

        assert_eq!(service.status(), ModelStatus::Unloaded);
        assert!(service.model().is_none());
        assert_eq!(service.status(), ModelStatus::Disabled);
    }

    #[test]
    fn test_service_loads_once_and_caches() {
        let file = write_model(SAMPLE_VEC);
        let service = EmbeddingService::new(SemanticConfig {
            enabled: true,
            model_path: Some(file.path().to_path_buf()),
        });

        let first = service.model().unwrap();
        assert_eq!(service.status(), ModelStatus::Loaded);

        // Deleting the file must not matter once loaded
        drop(file);
        let second = service.model().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_service_failure_is_pinned() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cc.tr.300.vec");
        let service = EmbeddingService::new(SemanticConfig {
            enabled: true,
            model_path: Some(path.clone()),
        });

        assert!(service.model().is_none());
        assert_eq!(service.status(), ModelStatus::Disabled);

        // The file appearing later does not trigger a retry
        std::fs::write(&path, SAMPLE_VEC).unwrap();
        assert!(service.model().is_none());
        assert_eq!(service.status(), ModelStatus::Disabled);
    }

    #[test]
    fn test_service_corrupt_model_disables() {
        let file = write_model("2 2\na 1 2\nb oops 2\n");
        let service = EmbeddingService::new(SemanticConfig {
            enabled: true,
            model_path: Some(file.path().to_path_buf()),
        });
        assert!(service.model().is_none());
        assert_eq!(service.status(), ModelStatus::Disabled);
    }

    #[test]
    fn test_concurrent_first_use_yields_one_model() {
        let file = write_model(SAMPLE_VEC);
        let service = Arc::new(EmbeddingService::new(SemanticConfig {
            enabled: true,
            model_path: Some(file.path().to_path_buf()),
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.model().unwrap())
            })
            .collect();
        let models: Vec<Arc<WordVectors>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for model in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], model));
        }
    }
}
