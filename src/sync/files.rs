//! One-shot copy of build output into a plugin folder.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{self, File},
    io::{BufReader, ErrorKind, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

/// Build output files mirrored from a plugin folder into the vault.
pub const WATCH_SET: [&str; 4] = ["main.js", "styles.css", "data.json", "manifest.json"];

/// Why a file was copied.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    /// Copied by the initial sync of a session
    Copied,

    /// Copied after a change notification
    Modified,
}

/// A file that was copied to the destination folder.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SyncEvent {
    /// What triggered the copy
    pub kind: SyncKind,

    /// Source file that was copied
    pub source: PathBuf,

    /// Destination folder the file was copied into
    pub destination: PathBuf,
}

impl SyncEvent {
    /// File name of the copied file.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let verb = match self.kind {
            SyncKind::Copied => "copied",
            SyncKind::Modified => "modified",
        };

        write!(f, "{verb} {}", self.file_name())
    }
}

/// Returns the watched file name of `path`, if it is in [`WATCH_SET`].
#[must_use]
pub fn watched_file_name(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?;

    WATCH_SET.iter().copied().find(|watched| *watched == name)
}

/// Copy every watched file that is missing or stale in `dest`.
///
/// A file is copied when it exists in `source` and the destination copy is
/// absent or differs byte for byte. Running it twice in a row copies nothing
/// the second time.
///
/// # Errors
///
/// Fails on the first comparison or copy error.
pub fn sync_once(source: &Path, dest: &Path) -> Result<Vec<SyncEvent>> {
    let mut events = Vec::new();

    for file in WATCH_SET {
        let src = source.join(file);

        if src.is_file() && copy_if_changed(&src, &dest.join(file))? {
            events.push(SyncEvent {
                kind: SyncKind::Copied,
                source: src,
                destination: dest.to_path_buf(),
            });
        }
    }

    Ok(events)
}

/// Copy `src` to `dest` unless `dest` already has identical content.
///
/// Returns whether a copy happened.
///
/// # Errors
///
/// Fails if either file cannot be read or the copy fails.
pub fn copy_if_changed(src: &Path, dest: &Path) -> Result<bool> {
    if dest.is_file() && files_equal(src, dest)? {
        return Ok(false);
    }

    fs::copy(src, dest).with_context(|| {
        format!("Failed to copy {} to {}", src.display(), dest.display())
    })?;

    Ok(true)
}

/// Byte for byte comparison of two files.
///
/// # Errors
///
/// Fails if either file cannot be opened or read.
pub fn files_equal(a: &Path, b: &Path) -> Result<bool> {
    let open = |path: &Path| {
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))
    };

    let (file_a, file_b) = (open(a)?, open(b)?);

    if file_a.metadata()?.len() != file_b.metadata()?.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(file_a);
    let mut reader_b = BufReader::new(file_b);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let read = read_full(&mut reader_a, &mut buf_a)
            .with_context(|| format!("Failed to read {}", a.display()))?;
        let read_other = read_full(&mut reader_b, &mut buf_b)
            .with_context(|| format!("Failed to read {}", b.display()))?;

        if read != read_other || buf_a[..read] != buf_b[..read] {
            return Ok(false);
        }

        if read == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as possible, stopping early only at end of file.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
