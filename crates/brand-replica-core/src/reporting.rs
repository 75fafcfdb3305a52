//! Persisted pipeline run reports.
//!
//! A report is the serialized [`PipelineRun`] plus a SHA-256 digest of the
//! exact bytes written, so a tampered or truncated report is detected on read.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{PipelineError, Result};
use crate::orchestrator::PipelineRun;

const REPORT_FILE: &str = "pipeline.json";
const DIGEST_FILE: &str = "pipeline.digest";

/// Hex-encoded SHA-256 of `bytes`.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/<run_id>/pipeline.json` and `<dir>/<run_id>/pipeline.digest`.
pub fn write_run_report(dir: &Path, run: &PipelineRun) -> Result<PathBuf> {
    let run_dir = dir.join(&run.run_id);
    std::fs::create_dir_all(&run_dir)?;

    let path = run_dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(run)?;
    let digest = digest_hex(&json);

    std::fs::write(&path, &json)?;
    std::fs::write(run_dir.join(DIGEST_FILE), digest.as_bytes())?;
    debug!(run_id = %run.run_id, path = %path.display(), "run report written");

    Ok(path)
}

/// Read `<dir>/<run_id>/pipeline.json` and verify it against its digest.
pub fn read_run_report(dir: &Path, run_id: &str) -> Result<PipelineRun> {
    let run_dir = dir.join(run_id);
    let json = std::fs::read(run_dir.join(REPORT_FILE))?;
    let expected = std::fs::read_to_string(run_dir.join(DIGEST_FILE))?;

    let actual = digest_hex(&json);
    if expected.trim() != actual {
        return Err(PipelineError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_is_stable() {
        assert_eq!(
            digest_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_report_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_run_report(dir.path(), "nope").expect_err("missing");
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
