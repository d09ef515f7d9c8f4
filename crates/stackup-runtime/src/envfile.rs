//! Environment file materialization.
//!
//! The environment file is created once per deployment target by copying
//! a template. An existing file is never touched, so operator edits survive
//! every rerun.

use std::io::Write;
use std::path::Path;

use stackup_common::error::{Result, StackupError};

/// What [`ensure_environment_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    /// The file already existed and was left as is.
    Existing,
    /// The file was created from the template.
    Created,
}

/// Ensures `path` exists, copying it from `template` if absent.
///
/// The copy is written to a temporary file beside `path` and then linked
/// into place without replacing anything, so the destination is either
/// absent or complete. If another process creates `path` first, its file
/// wins.
///
/// # Errors
///
/// Returns [`StackupError::MissingTemplate`] if `path` is absent and so is
/// `template`, or an I/O error if the copy fails.
pub fn ensure_environment_file(path: &Path, template: &Path) -> Result<Materialized> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "environment file present");
        return Ok(Materialized::Existing);
    }
    if !template.is_file() {
        return Err(StackupError::MissingTemplate {
            path: template.to_path_buf(),
        });
    }

    let io_err = |p: &Path| {
        let p = p.to_path_buf();
        move |e: std::io::Error| StackupError::Io { path: p, source: e }
    };

    let contents = std::fs::read(template).map_err(io_err(template))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    staged.write_all(&contents).map_err(io_err(path))?;
    staged.as_file().sync_all().map_err(io_err(path))?;

    match staged.persist_noclobber(path) {
        Ok(_) => {
            tracing::info!(
                path = %path.display(),
                template = %template.display(),
                "environment file created from template"
            );
            Ok(Materialized::Created)
        }
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "environment file appeared concurrently");
            Ok(Materialized::Existing)
        }
        Err(e) => Err(StackupError::Io {
            path: path.to_path_buf(),
            source: e.error,
        }),
    }
}
