use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON document from disk into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let value = read_json_value(path)?;
    serde_json::from_value(value).map_err(|e| format!("Invalid contents in '{}': {}", path, e).into())
}

/// Read a JSON document from disk without imposing a shape on it.
pub fn read_json_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let location = resolve_path(path)?;
    let contents = fs::read_to_string(&location)
        .map_err(|e| format!("Failed to read '{}': {}", location.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", location.display(), e).into())
}

/// Relative paths resolve against the working directory; the target must be a regular file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let location = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !location.exists() {
        return Err(format!("File not found: {}", location.display()).into());
    }
    if !location.is_file() {
        return Err(format!("Not a file: {}", location.display()).into());
    }

    Ok(location)
}
