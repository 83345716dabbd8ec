//! Logical file resolution within one bundle directory.
//!
//! A [`Directory`] is the bundle root or a single node's subtree. Opening a
//! logical file walks the file type's candidate paths in order, trying each
//! plain path and then its `.gz` sibling, and stops at the first that exists.

use crate::error::{BundleError, Result};
use crate::file_type::{ContentCategory, FileType, FileTypeRegistry, NodeRole};
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const GZIP_SUFFIX: &str = ".gz";

/// One directory of a bundle.
#[derive(Debug, Clone)]
pub struct Directory {
    role: NodeRole,
    path: PathBuf,
    registry: Arc<FileTypeRegistry>,
}

/// A physical location that may hold a logical file.
#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    compressed: bool,
}

impl Directory {
    pub fn new(role: NodeRole, path: impl Into<PathBuf>, registry: Arc<FileTypeRegistry>) -> Self {
        Self {
            role,
            path: path.into(),
            registry,
        }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &FileTypeRegistry {
        &self.registry
    }

    /// Physical locations for a file type, in resolution order.
    fn candidates<'a>(&'a self, file_type: &'a FileType) -> impl Iterator<Item = Candidate> + 'a {
        file_type.paths.iter().flat_map(move |relative| {
            let plain = self.path.join(relative);
            let mut gz = plain.clone().into_os_string();
            gz.push(GZIP_SUFFIX);
            [
                Candidate {
                    path: plain,
                    compressed: false,
                },
                Candidate {
                    path: PathBuf::from(gz),
                    compressed: true,
                },
            ]
        })
    }

    /// Open the logical file `name`, decompressing `.gz` members on the fly.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the file catalogue.
    pub fn open_file(&self, name: &str) -> Result<BundleFile> {
        let file_type = self.registry.get(name);
        if !file_type.exists_on(self.role) {
            return Err(BundleError::RoleMismatch {
                file_type: name.to_string(),
                role: self.role,
            });
        }

        let mut attempted = Vec::new();
        for candidate in self.candidates(file_type) {
            match File::open(&candidate.path) {
                Ok(file) => {
                    debug!(
                        file_type = name,
                        path = %candidate.path.display(),
                        compressed = candidate.compressed,
                        "Resolved bundle file"
                    );
                    return Ok(BundleFile::new(candidate, file));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => attempted.push(candidate.path),
                Err(source) => {
                    return Err(BundleError::Io {
                        path: candidate.path,
                        source,
                    })
                }
            }
        }

        Err(BundleError::NotFound {
            file_type: name.to_string(),
            attempted,
        })
    }

    /// Decode the full body of a JSON logical file.
    ///
    /// # Panics
    ///
    /// Panics if `name` is unknown or its content category is not JSON.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let file_type = self.registry.get(name);
        if file_type.content != ContentCategory::Json {
            panic!("bt-bundle: content of the {name} file is not JSON");
        }
        let file = self.open_file(name)?;
        let path = file.path().to_path_buf();
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| BundleError::Decode { path, source })
    }

    /// Visit the lines of a logical file with 1-based line numbers.
    ///
    /// Scanning stops early when `visit` returns [`ControlFlow::Break`].
    /// Returns the physical path that was read so callers can cite it.
    /// Invalid UTF-8 is replaced rather than treated as an error.
    pub fn scan_lines<F>(&self, name: &str, mut visit: F) -> Result<PathBuf>
    where
        F: FnMut(usize, &str) -> ControlFlow<()>,
    {
        let file = self.open_file(name)?;
        let path = file.path().to_path_buf();
        let compressed = file.is_compressed();
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let read = match reader.read_until(b'\n', &mut buf) {
                Ok(read) => read,
                Err(source) => {
                    if compressed {
                        warn!(
                            path = %path.display(),
                            error = %source,
                            "The .gz file might be corrupted; try `gzrecover -o {} {}` and run the check again",
                            path.with_extension("").display(),
                            path.display()
                        );
                    }
                    return Err(BundleError::Io { path, source });
                }
            };
            if read == 0 {
                break;
            }
            line_no += 1;
            let line = String::from_utf8_lossy(trim_line_ending(&buf));
            if visit(line_no, &line).is_break() {
                debug!(path = %path.display(), line = line_no, "Scan stopped early");
                break;
            }
        }

        Ok(path)
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

enum Source {
    Plain(File),
    Gzip(MultiGzDecoder<File>),
}

/// An open bundle file. Closed when dropped.
pub struct BundleFile {
    path: PathBuf,
    source: Source,
}

impl BundleFile {
    fn new(candidate: Candidate, file: File) -> Self {
        let source = if candidate.compressed {
            Source::Gzip(MultiGzDecoder::new(file))
        } else {
            Source::Plain(file)
        };
        Self {
            path: candidate.path,
            source,
        }
    }

    /// The physical path that was opened (ends in `.gz` when compressed).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.source, Source::Gzip(_))
    }
}

impl Read for BundleFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::Plain(file) => file.read(buf),
            Source::Gzip(decoder) => decoder.read(buf),
        }
    }
}

impl std::fmt::Debug for BundleFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleFile")
            .field("path", &self.path)
            .field("compressed", &self.is_compressed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn registry() -> Arc<FileTypeRegistry> {
        let mut registry = FileTypeRegistry::new();
        registry
            .register(FileType {
                name: "foo".to_string(),
                description: String::new(),
                content: ContentCategory::Json,
                roles: vec![NodeRole::Master],
                paths: vec!["foo.json".to_string(), "old/foo.json".to_string()],
            })
            .unwrap();
        registry
            .register(FileType {
                name: "log".to_string(),
                description: String::new(),
                content: ContentCategory::LineLog,
                roles: vec![NodeRole::Master],
                paths: vec!["unit.service".to_string()],
            })
            .unwrap();
        Arc::new(registry)
    }

    fn write_gz(path: &Path, body: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(body).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_candidates_order() {
        let dir = Directory::new(NodeRole::Master, "/b", registry());
        let reg = registry();
        let paths: Vec<PathBuf> = dir.candidates(reg.get("foo")).map(|c| c.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/b/foo.json"),
                PathBuf::from("/b/foo.json.gz"),
                PathBuf::from("/b/old/foo.json"),
                PathBuf::from("/b/old/foo.json.gz"),
            ]
        );
    }

    #[test]
    fn test_open_plain_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo.json"), b"{}").unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let mut file = dir.open_file("foo").unwrap();
        assert!(!file.is_compressed());
        assert_eq!(file.path(), tmp.path().join("foo.json"));
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn test_open_gzip_fallback() {
        let tmp = TempDir::new().unwrap();
        let source = br#"{"hostname": "10.0.0.1"}"#;
        write_gz(&tmp.path().join("foo.json.gz"), source);
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let mut file = dir.open_file("foo").unwrap();
        assert!(file.is_compressed());
        assert!(file.path().to_string_lossy().ends_with("foo.json.gz"));
        let mut body = Vec::new();
        file.read_to_end(&mut body).unwrap();
        assert_eq!(body, source);
    }

    #[test]
    fn test_plain_preferred_over_gzip() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo.json"), b"[1]").unwrap();
        write_gz(&tmp.path().join("foo.json.gz"), b"[2]");
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let value: Vec<u32> = dir.read_json("foo").unwrap();
        assert_eq!(value, vec![1]);
    }

    #[test]
    fn test_second_candidate_used() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("old")).unwrap();
        std::fs::write(tmp.path().join("old/foo.json"), b"[3]").unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let value: Vec<u32> = dir.read_json("foo").unwrap();
        assert_eq!(value, vec![3]);
    }

    #[test]
    fn test_not_found_mentions_every_attempt() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let err = dir.open_file("foo").unwrap_err();
        let text = err.to_string();
        for suffix in ["foo.json", "foo.json.gz", "old/foo.json", "old/foo.json.gz"] {
            let expected = tmp.path().join(suffix);
            assert!(
                text.contains(&expected.display().to_string()),
                "{text} does not mention {suffix}"
            );
        }
        match err {
            BundleError::NotFound { attempted, .. } => assert_eq!(attempted.len(), 4),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_role_mismatch() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo.json"), b"{}").unwrap();
        let dir = Directory::new(NodeRole::Agent, tmp.path(), registry());

        let err = dir.open_file("foo").unwrap_err();
        assert!(matches!(err, BundleError::RoleMismatch { role: NodeRole::Agent, .. }));
    }

    #[test]
    fn test_read_json_decode_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("foo.json"), b"{not json").unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let err = dir.read_json::<serde_json::Value>("foo").unwrap_err();
        match err {
            BundleError::Decode { path, .. } => assert_eq!(path, tmp.path().join("foo.json")),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    #[should_panic(expected = "is not JSON")]
    fn test_read_json_on_log_panics() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());
        let _ = dir.read_json::<serde_json::Value>("log");
    }

    #[test]
    fn test_scan_lines_numbers_and_endings() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("unit.service"), b"one\r\ntwo\nthree").unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let mut seen = Vec::new();
        let path = dir
            .scan_lines("log", |n, line| {
                seen.push((n, line.to_string()));
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(path, tmp.path().join("unit.service"));
        assert_eq!(
            seen,
            vec![
                (1, "one".to_string()),
                (2, "two".to_string()),
                (3, "three".to_string())
            ]
        );
    }

    #[test]
    fn test_scan_lines_stops_early() {
        let tmp = TempDir::new().unwrap();
        write_gz(&tmp.path().join("unit.service.gz"), b"a\nb\nc\nd\n");
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let mut last = 0;
        let path = dir
            .scan_lines("log", |n, line| {
                last = n;
                if line == "b" {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(last, 2);
        assert!(path.to_string_lossy().ends_with(".gz"));
    }

    #[test]
    fn test_scan_lines_corrupt_gzip_is_io_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("unit.service.gz"), b"definitely not gzip").unwrap();
        let dir = Directory::new(NodeRole::Master, tmp.path(), registry());

        let err = dir
            .scan_lines("log", |_, _| ControlFlow::Continue(()))
            .unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
