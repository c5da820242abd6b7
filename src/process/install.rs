use crate::error::{io_error, SimulationError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Finds exactly one executable named `binary` under `install_dir`, either
/// directly inside it or anywhere below it when `recursive` is set.
pub fn locate_executable(
    install_dir: &Path,
    binary: &str,
    recursive: bool,
) -> Result<PathBuf, SimulationError> {
    if !install_dir.is_dir() {
        return Err(not_found(install_dir, binary));
    }

    let mut matches = if recursive {
        search_tree(install_dir, binary)?
    } else {
        let candidate = install_dir.join(binary);
        if is_executable(&candidate) {
            vec![candidate]
        } else {
            Vec::new()
        }
    };

    match matches.len() {
        0 => Err(not_found(install_dir, binary)),
        1 => Ok(matches.remove(0)),
        count => Err(SimulationError::AmbiguousExecutable {
            install_dir: install_dir.display().to_string(),
            binary: binary.to_string(),
            count,
        }),
    }
}

fn search_tree(root: &Path, binary: &str) -> Result<Vec<PathBuf>, SimulationError> {
    let mut matches = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|source| io_error(&path, source))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if entry.file_name() == binary && is_executable(&path) {
                matches.push(path);
            }
        }
    }
    matches.sort();
    Ok(matches)
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn not_found(install_dir: &Path, binary: &str) -> SimulationError {
    SimulationError::ExecutableNotFound {
        install_dir: install_dir.display().to_string(),
        binary: binary.to_string(),
    }
}
