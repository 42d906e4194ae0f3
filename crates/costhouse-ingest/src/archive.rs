//! Report Archive Decoder
//!
//! An upload is a gzip-compressed POSIX tar containing one `manifest.json`
//! and any number of CSV members. The manifest declares the authoritative
//! file set; members outside it are untrusted and ignored.
//!
//! Decoding is two forward scans over the compressed stream:
//!
//! 1. [`read_manifest`] walks tar headers until it finds the member whose
//!    name ends in `manifest.json`, reads it, and parses the JSON.
//! 2. [`read_declared_csvs`] walks the archive again and reads, in archive
//!    order, each member whose name ends in `.csv` and appears in
//!    `manifest.files`. Undeclared members are skipped without being read.
//!
//! A missing or malformed manifest, an unreadable gzip/tar stream, and a
//! non-UUID cluster id are all fatal for the archive.

use std::io::Read;

use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;
use tracing::debug;
use uuid::Uuid;

use crate::error::{IngestError, Result};

/// Parsed `manifest.json`. Unknown keys are ignored; absent sections default
/// to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub cr_status: CrStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrStatus {
    #[serde(default, rename = "clusterID")]
    pub cluster_id: String,
    #[serde(default)]
    pub source: CrSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrSource {
    #[serde(default)]
    pub name: String,
}

impl Manifest {
    /// The manifest-declared cluster id, which must be a UUID.
    pub fn cluster_uuid(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.cluster_id).map_err(|e| {
            IngestError::Archive(format!("invalid cluster_id {:?}: {e}", self.cluster_id))
        })
    }

    /// Cluster display name: the source name when reported, otherwise the
    /// cluster id itself.
    pub fn effective_cluster_name(&self) -> &str {
        if !self.cr_status.source.name.is_empty() {
            &self.cr_status.source.name
        } else {
            &self.cluster_id
        }
    }

    fn declares(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }
}

/// One declared CSV member, read out of the archive.
#[derive(Debug, Clone)]
pub struct CsvMember {
    pub name: String,
    pub data: Vec<u8>,
}

fn archive_err(context: &str, e: impl std::fmt::Display) -> IngestError {
    IngestError::Archive(format!("{context}: {e}"))
}

fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> Result<String> {
    let path = entry
        .path()
        .map_err(|e| archive_err("unreadable member path", e))?;
    Ok(path.to_string_lossy().into_owned())
}

/// Scan the archive for `manifest.json` and parse it.
pub fn read_manifest(bytes: &[u8]) -> Result<Manifest> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|e| archive_err("failed to read archive", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_err("failed to read archive member", e))?;
        let name = entry_name(&entry)?;
        if !name.ends_with("manifest.json") {
            continue;
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| archive_err("failed to read manifest.json", e))?;
        let manifest = serde_json::from_slice(&data)
            .map_err(|e| archive_err("failed to parse manifest.json", e))?;
        return Ok(manifest);
    }

    Err(IngestError::Archive(
        "no manifest.json found in archive".to_string(),
    ))
}

/// Read every CSV member declared by the manifest, in archive order.
pub fn read_declared_csvs(bytes: &[u8], manifest: &Manifest) -> Result<Vec<CsvMember>> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|e| archive_err("failed to read archive", e))?;

    let mut members = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| archive_err("failed to read archive member", e))?;
        let name = entry_name(&entry)?;
        if !name.ends_with(".csv") {
            continue;
        }
        if !manifest.declares(&name) {
            debug!(member = %name, "skipping member not listed in manifest.files");
            continue;
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| archive_err("failed to read csv member", e))?;
        members.push(CsvMember { name, data });
    }

    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn build_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o600);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    const MANIFEST: &str = r#"{
        "cluster_id": "10f5a0f9-223a-41c1-8456-9a3eb0323a99",
        "files": ["data.csv"],
        "cr_status": {
            "clusterID": "10f5a0f9-223a-41c1-8456-9a3eb0323a99",
            "source": {"name": "test-cluster"}
        }
    }"#;

    #[test]
    fn reads_manifest_by_basename() {
        let bytes = build_archive(&[("nested/dir/manifest.json", MANIFEST)]);
        let manifest = read_manifest(&bytes).unwrap();
        assert_eq!(manifest.cluster_id, "10f5a0f9-223a-41c1-8456-9a3eb0323a99");
        assert_eq!(manifest.effective_cluster_name(), "test-cluster");
        assert_eq!(manifest.files, vec!["data.csv"]);
    }

    #[test]
    fn cluster_name_falls_back_to_id() {
        let manifest_json = r#"{"cluster_id": "10f5a0f9-223a-41c1-8456-9a3eb0323a99", "files": []}"#;
        let bytes = build_archive(&[("manifest.json", manifest_json)]);
        let manifest = read_manifest(&bytes).unwrap();
        assert_eq!(
            manifest.effective_cluster_name(),
            "10f5a0f9-223a-41c1-8456-9a3eb0323a99"
        );
    }

    #[test]
    fn unknown_manifest_keys_are_ignored() {
        let manifest_json = r#"{
            "cluster_id": "10f5a0f9-223a-41c1-8456-9a3eb0323a99",
            "files": ["data.csv"],
            "certified": true,
            "version": "4.16"
        }"#;
        let bytes = build_archive(&[("manifest.json", manifest_json)]);
        assert!(read_manifest(&bytes).is_ok());
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let bytes = build_archive(&[("data.csv", "a,b\n1,2")]);
        let err = read_manifest(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::Archive(_)));
    }

    #[test]
    fn malformed_manifest_is_fatal() {
        let bytes = build_archive(&[("manifest.json", "{not json")]);
        let err = read_manifest(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::Archive(_)));
    }

    #[test]
    fn invalid_gzip_is_fatal() {
        let err = read_manifest(b"definitely not a gzip stream").unwrap_err();
        assert!(matches!(err, IngestError::Archive(_)));
    }

    #[test]
    fn non_uuid_cluster_id_is_fatal() {
        let manifest_json = r#"{"cluster_id": "not-a-uuid", "files": []}"#;
        let bytes = build_archive(&[("manifest.json", manifest_json)]);
        let manifest = read_manifest(&bytes).unwrap();
        assert!(matches!(
            manifest.cluster_uuid(),
            Err(IngestError::Archive(_))
        ));
    }

    #[test]
    fn only_declared_csvs_are_read() {
        let bytes = build_archive(&[
            ("manifest.json", MANIFEST),
            ("data.csv", "declared"),
            ("extra.csv", "undeclared"),
            ("notes.txt", "not a csv"),
        ]);
        let manifest = read_manifest(&bytes).unwrap();
        let members = read_declared_csvs(&bytes, &manifest).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "data.csv");
        assert_eq!(members[0].data, b"declared");
    }
}
