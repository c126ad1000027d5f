//! Persists the core's context as a raw `.sav` blob next to the user's home directory
//!
//! The blob is exactly `context_size()` bytes with no header; a file of a different length is
//! treated as corrupt rather than guessed at.

use lynxgo_common::context::ContextCursor;
use lynxgo_common::frontend::EmulatorCore;
use std::error::Error;
use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EXTENSION: &str = "sav";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Unable to determine file name for path: '{0}'")]
    ParseFileName(String),
    #[error("Unable to allocate {len} bytes for state file '{path}'")]
    Allocate { path: String, len: u64 },
    #[error("I/O error reading state file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("State file '{path}' holds {actual} bytes; the core's context is {expected} bytes")]
    SizeMismatch { path: String, expected: u64, actual: u64 },
    #[error("Short read from state file '{path}': expected {expected} bytes, got {actual}")]
    ShortRead { path: String, expected: u64, actual: u64 },
    #[error("I/O error writing state file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Short write to state file '{path}': expected {expected} bytes, wrote {actual}")]
    ShortWrite { path: String, expected: u64, actual: u64 },
    #[error("Core rejected state for '{path}': {source}")]
    Core {
        path: String,
        #[source]
        source: Box<dyn Error + Send + Sync + 'static>,
    },
}

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No usable file; the core keeps its power-on state
    NoState,
    Loaded { bytes: usize },
}

/// `<save_dir>/<rom file name>.sav`, keeping the ROM's own extension (`game.lnx` ->
/// `game.lnx.sav`).
///
/// # Errors
///
/// Returns an error if `rom_path` has no file name.
pub fn save_path_for(rom_path: &Path, save_dir: &Path) -> StateResult<PathBuf> {
    let file_name = rom_path
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| StateError::ParseFileName(rom_path.display().to_string()))?;

    Ok(save_dir.join(format!("{file_name}.{EXTENSION}")))
}

/// Restore `core` from `path` if a non-empty state file exists there.
///
/// # Errors
///
/// A missing or empty file is not an error. Returns an error if the file's length differs from
/// `core.context_size()`, the file cannot be read in full, or the core rejects its contents;
/// `core` may be partially restored in the last case.
pub fn load<Core: EmulatorCore>(core: &mut Core, path: &Path) -> StateResult<LoadOutcome> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            log::debug!("No saved state at '{}': {err}", path.display());
            return Ok(LoadOutcome::NoState);
        }
    };

    let len = file.metadata().map(|metadata| metadata.len()).unwrap_or(0);
    if len < 1 {
        log::debug!("Saved state at '{}' is empty; ignoring", path.display());
        return Ok(LoadOutcome::NoState);
    }

    let expected = core.context_size() as u64;
    if len != expected {
        return Err(StateError::SizeMismatch {
            path: path.display().to_string(),
            expected,
            actual: len,
        });
    }

    let mut buffer = allocate(path, len)?;
    read_exact_len(&mut file, &mut buffer, path)?;

    core.context_load(&mut ContextCursor::new(&mut buffer)).map_err(|err| StateError::Core {
        path: path.display().to_string(),
        source: err.into(),
    })?;

    log::info!("Loaded {len} byte state from '{}'", path.display());

    Ok(LoadOutcome::Loaded { bytes: buffer.len() })
}

/// Write the complete context of `core` to `path`, replacing any previous file.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns an error if the core fails to serialize or the file cannot be written in full.
pub fn save<Core: EmulatorCore>(core: &Core, path: &Path) -> StateResult<usize> {
    let len = core.context_size();
    let mut buffer = allocate(path, len as u64)?;

    core.context_save(&mut ContextCursor::new(&mut buffer)).map_err(|err| StateError::Core {
        path: path.display().to_string(),
        source: err.into(),
    })?;

    let mut file = File::create(path)
        .map_err(|source| StateError::Write { path: path.display().to_string(), source })?;
    write_exact_len(&mut file, &buffer, path)?;

    log::info!("Saved {len} byte state to '{}'", path.display());

    Ok(len)
}

fn allocate(path: &Path, len: u64) -> StateResult<Vec<u8>> {
    let alloc_err = || StateError::Allocate { path: path.display().to_string(), len };

    let len_usize = usize::try_from(len).map_err(|_| alloc_err())?;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len_usize).map_err(|_| alloc_err())?;
    buffer.resize(len_usize, 0);

    Ok(buffer)
}

// Read until the buffer is full or the reader runs dry, reporting a count mismatch instead of
// masking it the way read_exact would
fn read_exact_len<R: Read>(reader: &mut R, buffer: &mut [u8], path: &Path) -> StateResult<()> {
    let mut total = 0;
    while total < buffer.len() {
        match reader.read(&mut buffer[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(source) => {
                return Err(StateError::Read { path: path.display().to_string(), source });
            }
        }
    }

    if total != buffer.len() {
        return Err(StateError::ShortRead {
            path: path.display().to_string(),
            expected: buffer.len() as u64,
            actual: total as u64,
        });
    }

    Ok(())
}

fn write_exact_len<W: Write>(writer: &mut W, buffer: &[u8], path: &Path) -> StateResult<()> {
    let mut total = 0;
    while total < buffer.len() {
        match writer.write(&buffer[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(source) => {
                return Err(StateError::Write { path: path.display().to_string(), source });
            }
        }
    }

    if total != buffer.len() {
        return Err(StateError::ShortWrite {
            path: path.display().to_string(),
            expected: buffer.len() as u64,
            actual: total as u64,
        });
    }

    writer.flush().map_err(|source| StateError::Write { path: path.display().to_string(), source })
}
