//! Trained data read from a directory of JSON files.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use lsmvec_vector::quantization::{TrainedDataSource, TrainedIndexData, TrainedSource};
use lsmvec_vector::VectorError;
use tracing::debug;

use crate::error::Result;

/// Trained data sets stored as `<dir>/<table>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonTrainedDataDir {
    root: PathBuf,
}

impl JsonTrainedDataDir {
    /// Read trained data below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory trained data is read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a data set where [`load`](TrainedDataSource::load) will find it.
    ///
    /// # Errors
    ///
    /// Returns an error if the source names an unsafe path, or the file
    /// cannot be written.
    pub fn save(&self, source: &TrainedSource, data: &TrainedIndexData) -> Result<()> {
        let path = self.path_of(source)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, serde_json::to_vec_pretty(data)?)?;
        Ok(())
    }

    fn path_of(&self, source: &TrainedSource) -> std::result::Result<PathBuf, VectorError> {
        for part in [&source.table, &source.id] {
            let mut components = Path::new(part.as_str()).components();
            let plain = matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            );
            if !plain {
                return Err(VectorError::InvalidConfig(format!(
                    "trained data name '{part}' is not a plain file name"
                )));
            }
        }
        Ok(self.root.join(&source.table).join(format!("{}.json", source.id)))
    }
}

impl TrainedDataSource for JsonTrainedDataDir {
    fn load(&self, source: &TrainedSource) -> std::result::Result<TrainedIndexData, VectorError> {
        let path = self.path_of(source)?;
        debug!(path = %path.display(), "loading trained data");
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VectorError::InvalidConfig(format!(
                "no trained index data '{}' in table '{}'",
                source.id, source.table
            )),
            _ => VectorError::InvalidConfig(format!("cannot read {}: {e}", path.display())),
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VectorError::CorruptData(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TrainedIndexData {
        TrainedIndexData {
            nlist: 2,
            quantizer_codes: vec![0.0, 0.0, 1.0, 1.0],
            ..TrainedIndexData::default()
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let source = TrainedSource::new("trained", "centroids");
        let store = JsonTrainedDataDir::new(dir.path());
        store.save(&source, &data()).unwrap();

        assert!(dir.path().join("trained").join("centroids.json").exists());
        assert_eq!(store.load(&source).unwrap(), data());
    }

    #[test]
    fn missing_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrainedDataDir::new(dir.path());
        let err = store.load(&TrainedSource::new("t", "nope")).unwrap_err();
        assert!(matches!(err, VectorError::InvalidConfig(_)));
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("t")).unwrap();
        std::fs::write(dir.path().join("t").join("bad.json"), b"not json").unwrap();
        let err = JsonTrainedDataDir::new(dir.path()).load(&TrainedSource::new("t", "bad")).unwrap_err();
        assert!(matches!(err, VectorError::CorruptData(_)));
    }

    #[test]
    fn rejects_path_escapes() {
        let store = JsonTrainedDataDir::new("/tmp");
        for (table, id) in [("..", "x"), ("t", "../x"), ("a/b", "x"), ("", "x")] {
            let err = store.load(&TrainedSource::new(table, id)).unwrap_err();
            assert!(matches!(err, VectorError::InvalidConfig(_)), "{table}/{id}");
        }
    }
}
