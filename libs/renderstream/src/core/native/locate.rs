// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Finding the compositor library on disk.

use std::path::{Path, PathBuf};

/// Overrides the library path outright.
pub const LIBRARY_ENV: &str = "RENDERSTREAM_LIBRARY";

/// Path of the compositor executable (or its directory), as recorded under
/// `HKCU\Software\d3 Technologies\d3 Production Suite\exe path`.
pub const EXE_PATH_ENV: &str = "RENDERSTREAM_EXE_PATH";

pub const LIBRARY_STEM: &str = "d3renderstream";

/// Platform file name of the library.
pub fn library_file_name() -> String {
    format!(
        "{}{LIBRARY_STEM}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

/// Resolves the library path. The first match wins:
/// 1. `configured`
/// 2. `RENDERSTREAM_LIBRARY`
/// 3. the library next to the executable named by `RENDERSTREAM_EXE_PATH`
pub fn locate_library(configured: Option<&Path>) -> Option<PathBuf> {
    locate_with(configured, |key| std::env::var_os(key).map(PathBuf::from))
}

fn locate_with<F>(configured: Option<&Path>, env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env(LIBRARY_ENV).filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    env(EXE_PATH_ENV).map(|exe_path| library_beside(&exe_path))
}

/// The registry value holds either the executable or its directory, possibly
/// with doubled separators.
fn library_beside(exe_path: &Path) -> PathBuf {
    let normalized = exe_path.to_string_lossy().replace("\\\\", "\\");
    let normalized = PathBuf::from(normalized);
    let dir = if normalized.extension().is_some() {
        normalized.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        normalized
    };
    dir.join(library_file_name())
}
