//! Contains various `std::fs` wrapper functions that also contain the target path in their errors.

use crate::errors::FsPathError;
use serde::{Serialize, de::DeserializeOwned};
use std::{fs, io::Write, path::Path};

/// The [`fs`](self) result type.
pub type Result<T> = std::result::Result<T, FsPathError>;

/// Wrapper for [`std::fs::read_to_string`].
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|err| FsPathError::read(err, path))
}

/// Reads the JSON file and deserialize it into the provided type.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let s = read_to_string(path)?;
    serde_json::from_str(&s).map_err(|source| FsPathError::read_json(source, path))
}

/// Writes the object as a pretty JSON object.
///
/// The file is created if missing and truncated otherwise. A trailing newline is appended.
pub fn write_pretty_json_file<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
    let mut json =
        serde_json::to_vec_pretty(obj).map_err(|source| FsPathError::write_json(source, path))?;
    json.push(b'\n');
    let mut file = fs::File::create(path).map_err(|err| FsPathError::write(err, path))?;
    file.write_all(&json).map_err(|err| FsPathError::write(err, path))
}

/// Wrapper for [`std::fs::write`].
pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, contents).map_err(|err| FsPathError::write(err, path))
}

/// Wrapper for [`std::fs::create_dir_all`].
pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|err| FsPathError::create_dir(err, path))
}
