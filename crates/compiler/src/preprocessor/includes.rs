//! Include directory search and the static-include registry.
//!
//! Grounded on `cprocess.c`'s `default_include_dirs` and
//! `preprocessor/static_include.c`'s synthetic-header mechanism for
//! `stdarg_internal.h`/`stddef_internal.h`.

use rcc_core::CompileError;
use std::path::{Path, PathBuf};

/// `default_include_dirs`: search order for `#include <...>`, exactly
/// as the original declares it.
pub fn default_include_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./rc_includes"),
        PathBuf::from("../rc_includes"),
        PathBuf::from("/usr/include/rosebud_includes"),
        PathBuf::from("/usr/include"),
    ]
}

/// Synthetic header bodies the preprocessor injects without touching
/// the filesystem, the same way `static_include.c` serves
/// `stdarg_internal.h`'s `__builtin_va_list`/`va_list`/`va_arg` and
/// `stddef_internal.h`'s `size_t`/`NULL` without a real file on disk.
pub fn static_include_body(name: &str) -> Option<&'static str> {
    match name {
        "stdarg_internal.h" => Some(
            "typedef char* __builtin_va_list;\n\
             typedef __builtin_va_list va_list;\n",
        ),
        "stddef_internal.h" => Some(
            "typedef unsigned int size_t;\n\
             #define NULL ((void*) 0)\n",
        ),
        _ => None,
    }
}

/// Resolves `#include <name>` against the search path, or `#include
/// "name"` against the including file's own directory first.
pub fn resolve_include(
    name: &str,
    quoted: bool,
    including_file_dir: &Path,
    search_dirs: &[PathBuf],
) -> Result<PathBuf, CompileError> {
    if let Some(body) = static_include_body(name) {
        let _ = body;
        return Ok(PathBuf::from(format!("<static:{name}>")));
    }

    if quoted {
        let candidate = including_file_dir.join(name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    for dir in search_dirs {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(CompileError::preprocess(
        format!("include file '{name}' not found"),
        rcc_core::Position::default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dirs_match_original_order() {
        let dirs = default_include_dirs();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("./rc_includes"),
                PathBuf::from("../rc_includes"),
                PathBuf::from("/usr/include/rosebud_includes"),
                PathBuf::from("/usr/include"),
            ]
        );
    }

    #[test]
    fn static_include_serves_stdarg_without_filesystem() {
        let body = static_include_body("stdarg_internal.h").unwrap();
        assert!(body.contains("__builtin_va_list"));
    }

    #[test]
    fn unknown_include_errors() {
        let err = resolve_include(
            "nope_this_does_not_exist.h",
            true,
            Path::new("."),
            &[],
        );
        assert!(err.is_err());
    }
}
