//! Versioned binary snapshot codec for crash-safe restart.
//!
//! Encodes the fields in the order the design calls out: `postings`,
//! `id_map`, `doc_vectors`, `term_frequency`, `phonetic_postings`,
//! `vocabulary`, `globally_seen`, `term_vectors`, `fragments_of`,
//! `terms_of`. Atomicity comes from writing to a temporary path and
//! renaming over the target on close; a missing file is a cold start, not
//! an error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SnapshotError;
use crate::index::IndexState;

const FORMAT_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotBody {
    postings: std::collections::HashMap<String, Vec<u32>>,
    id_map: std::collections::HashMap<u32, String>,
    doc_vectors: std::collections::HashMap<u32, Vec<f32>>,
    term_frequency: std::collections::HashMap<String, u64>,
    phonetic_postings: std::collections::HashMap<String, Vec<u32>>,
    vocabulary: std::collections::HashMap<usize, Vec<String>>,
    globally_seen: std::collections::HashSet<String>,
    term_vectors: std::collections::HashMap<String, Vec<f32>>,
    fragments_of: std::collections::HashMap<u32, std::collections::HashSet<String>>,
    terms_of: std::collections::HashMap<u32, Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u16,
    body: SnapshotBody,
}

impl From<&IndexState> for SnapshotBody {
    fn from(state: &IndexState) -> Self {
        Self {
            postings: state.postings.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            id_map: state.id_map.iter().map(|(&k, v)| (k, v.clone())).collect(),
            doc_vectors: state.doc_vectors.iter().map(|(&k, v)| (k, v.clone())).collect(),
            term_frequency: state
                .term_frequency
                .iter()
                .map(|(k, &v)| (k.clone(), v))
                .collect(),
            phonetic_postings: state
                .phonetic_postings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            vocabulary: state
                .vocabulary
                .iter()
                .map(|(&k, v)| (k, v.clone()))
                .collect(),
            globally_seen: state.globally_seen.iter().cloned().collect(),
            term_vectors: state
                .term_vectors
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            fragments_of: state
                .fragments_of
                .iter()
                .map(|(&k, v)| (k, v.iter().cloned().collect()))
                .collect(),
            terms_of: state.terms_of.iter().map(|(&k, v)| (k, v.clone())).collect(),
        }
    }
}

impl From<SnapshotBody> for IndexState {
    fn from(body: SnapshotBody) -> Self {
        Self {
            id_map: body.id_map.into_iter().collect(),
            postings: body.postings.into_iter().collect(),
            phonetic_postings: body.phonetic_postings.into_iter().collect(),
            doc_vectors: body.doc_vectors.into_iter().collect(),
            fragments_of: body
                .fragments_of
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
            terms_of: body.terms_of.into_iter().collect(),
            term_frequency: body.term_frequency.into_iter().collect(),
            vocabulary: body.vocabulary.into_iter().collect(),
            globally_seen: body.globally_seen.into_iter().collect(),
            term_vectors: body.term_vectors.into_iter().collect(),
        }
    }
}

/// Encodes `state` and writes it atomically to `path` (write to `path.tmp`,
/// then rename over `path`).
pub fn save(state: &IndexState, path: &Path) -> Result<(), SnapshotError> {
    let file = SnapshotFile {
        version: FORMAT_VERSION,
        body: SnapshotBody::from(state),
    };

    let bytes = postcard::to_allocvec(&file).map_err(SnapshotError::Encode)?;

    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;

    info!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

/// Loads a snapshot from `path`. A missing file is reported as `Ok(None)`
/// (cold start); any other I/O or decode failure is an error.
pub fn load(path: &Path) -> Result<Option<IndexState>, SnapshotError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no snapshot file found, starting fresh");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let file: SnapshotFile = postcard::from_bytes(&bytes).map_err(SnapshotError::Decode)?;
    if file.version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(file.version));
    }

    info!(path = %path.display(), "snapshot loaded");
    Ok(Some(file.body.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.db");
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn round_trips_index_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zenith.db");

        let mut state = IndexState::default();
        state.id_map.insert(42, "DOC-1".to_string());
        state.postings.insert("rank".to_string(), vec![42]);
        state.doc_vectors.insert(42, vec![0.1, 0.2, 0.3]);

        save(&state, &path).unwrap();
        let loaded = load(&path).unwrap().expect("snapshot exists");

        assert_eq!(loaded.id_map.get(&42), Some(&"DOC-1".to_string()));
        assert_eq!(loaded.postings.get("rank"), Some(&vec![42]));
        assert_eq!(loaded.doc_vectors.get(&42), Some(&vec![0.1, 0.2, 0.3]));
    }

    #[test]
    fn rejects_unknown_format_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zenith.db");
        let bogus = SnapshotFile {
            version: 9999,
            body: SnapshotBody::from(&IndexState::default()),
        };
        std::fs::write(&path, postcard::to_allocvec(&bogus).unwrap()).unwrap();

        assert!(matches!(
            load(&path),
            Err(SnapshotError::UnsupportedVersion(9999))
        ));
    }
}
