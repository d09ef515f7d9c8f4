//! Environment file stage.

use std::path::Path;

use stackup_common::error::{Result, StackupError};
use stackup_runtime::envfile::{self, Materialized};

use crate::console::Console;

/// Ensures the environment file exists, deriving it from the template on
/// first run. An existing file is left untouched.
///
/// # Errors
///
/// Returns [`stackup_common::error::StackupError::MissingTemplate`] if
/// neither file exists.
pub fn ensure_environment_file(
    path: &Path,
    template: &Path,
    console: &Console,
) -> Result<Materialized> {
    console.info("Setting up environment configuration...");
    if !path.exists() {
        console.warning(format!(
            "{} not found. Creating from {}...",
            display_name(path),
            display_name(template)
        ));
    }
    let outcome = envfile::ensure_environment_file(path, template)?;
    match outcome {
        Materialized::Created => console.success(format!(
            "Created {} from {}",
            display_name(path),
            display_name(template)
        )),
        Materialized::Existing => {
            console.success(format!("{} already exists", display_name(path)));
        }
    }
    Ok(outcome)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Reports what [`ensure_environment_file`] would do without writing.
///
/// # Errors
///
/// Returns [`StackupError::MissingTemplate`] if neither file exists.
pub fn preview_environment_file(path: &Path, template: &Path) -> Result<Materialized> {
    if path.exists() {
        Ok(Materialized::Existing)
    } else if template.is_file() {
        Ok(Materialized::Created)
    } else {
        Err(StackupError::MissingTemplate {
            path: template.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_matches_real_run_and_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = dir.path().join("env.docker");
        let template = dir.path().join("env.example");
        std::fs::write(&template, "DEBUG=1\n").expect("write");

        assert_eq!(
            preview_environment_file(&env, &template).expect("preview"),
            Materialized::Created
        );
        assert!(!env.exists());

        assert_eq!(
            ensure_environment_file(&env, &template, &Console::quiet()).expect("create"),
            Materialized::Created
        );
        assert_eq!(
            preview_environment_file(&env, &template).expect("preview"),
            Materialized::Existing
        );
    }

    #[test]
    fn preview_without_template_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = preview_environment_file(&dir.path().join("a"), &dir.path().join("b"))
            .expect_err("missing");
        assert!(matches!(err, StackupError::MissingTemplate { .. }));
    }
}
