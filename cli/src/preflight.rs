//! Checks and inputs gathered before any agent runs.

use anyhow::{bail, Context, Result};
use autodeploy_core::tools::executors::shell::run_command;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const NAME_PATTERN: &str = r"^[a-z][a-z0-9\-]{1,30}[a-z0-9]$";
const MAX_DEFAULT_NAME: usize = 30;

/// Confirm `root` is a clean git work tree and return the active branch.
pub async fn check_repository(root: &Path) -> Result<String> {
    let inside = git(root, &["rev-parse", "--is-inside-work-tree"]).await;
    if !matches!(inside.as_deref().map(str::trim), Ok("true")) {
        bail!(
            "This operation can only be performed inside a Git repository.\n\
             Execute 'git init' to create a new repository."
        );
    }

    let status = git(root, &["status", "--porcelain"]).await?;
    if !status.trim().is_empty() {
        bail!("The repository has uncommitted changes. Please commit or stash them before proceeding.");
    }

    let branch = git(root, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    Ok(branch.trim().to_string())
}

/// Create `branch` and switch to it.
pub async fn checkout_branch(root: &Path, branch: &str) -> Result<()> {
    git(root, &["checkout", "-b", branch])
        .await
        .with_context(|| format!("Unable to switch to branch {:?}. It may already exist", branch))?;
    Ok(())
}

async fn git(root: &Path, args: &[&str]) -> Result<String> {
    let output = run_command("git", args, Some(root))
        .await
        .context("Failed to run git. Is it installed?")?;
    if !output.success() {
        bail!("git {} failed: {}", args.join(" "), output.failure_reason());
    }
    Ok(output.stdout)
}

/// Deployment name derived from the project directory.
pub fn default_name(root: &Path) -> String {
    let base = root
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let replaced: String = base
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    let joined = replaced
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let truncated: String = joined.chars().take(MAX_DEFAULT_NAME).collect();
    truncated.trim_end_matches('-').to_string()
}

pub fn validate_name(name: &str) -> Result<()> {
    let pattern = Regex::new(NAME_PATTERN)?;
    if !pattern.is_match(name) {
        bail!(
            "The name should be between 3 and 32 lowercase alphanumeric characters and '-'. \
             It must start with a letter and must not end with '-'."
        );
    }
    Ok(())
}

/// Parse an env file; relative paths are taken from the project root.
pub fn load_env(root: &Path, path: &Path) -> Result<BTreeMap<String, String>> {
    let path: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    if !path.is_file() {
        bail!("Invalid path {:?}", path);
    }

    let mut environment = BTreeMap::new();
    for item in dotenvy::from_path_iter(&path).with_context(|| format!("Failed to read {:?}", path))? {
        let (key, value) = item.with_context(|| format!("Failed to parse {:?}", path))?;
        environment.insert(key, value);
    }
    Ok(environment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_name_is_sanitized() {
        assert_eq!(default_name(Path::new("/work/My_Flask App")), "my-flask-app");
        assert_eq!(default_name(Path::new("/work/--api--v2--")), "api-v2");
        let long = default_name(Path::new("/work/a-very-long-project-name-that-keeps-going"));
        assert_eq!(long, "a-very-long-project-name-that");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("my-app").is_ok());
        assert!(validate_name("api2").is_ok());
        assert!(validate_name("2api").is_err());
        assert!(validate_name("ab").is_err());
        assert!(validate_name("trailing-").is_err());
        assert!(validate_name("Upper").is_err());
    }

    #[test]
    fn test_load_env_relative_to_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "# comment\nPORT=8000\nGREETING=\"hello world\"\n").unwrap();

        let environment = load_env(dir.path(), Path::new(".env")).unwrap();

        assert_eq!(environment.get("PORT").map(String::as_str), Some("8000"));
        assert_eq!(environment.get("GREETING").map(String::as_str), Some("hello world"));
        assert_eq!(environment.len(), 2);
    }

    #[test]
    fn test_load_env_missing_file() {
        let dir = TempDir::new().unwrap();

        let error = load_env(dir.path(), Path::new("missing.env")).unwrap_err();
        assert!(error.to_string().contains("Invalid path"));
    }

    #[tokio::test]
    async fn test_check_repository_rejects_plain_directory() {
        let dir = TempDir::new().unwrap();

        // Without git on PATH the check fails for a different reason; either way it fails.
        assert!(check_repository(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_check_repository_detects_dirty_tree() {
        if run_command("git", ["--version"], None).await.is_err() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for args in [
            vec!["init", "--quiet"],
            vec!["config", "user.email", "dev@example.com"],
            vec!["config", "user.name", "Dev"],
            vec!["symbolic-ref", "HEAD", "refs/heads/main"],
        ] {
            run_command("git", args, Some(root)).await.unwrap();
        }
        fs::write(root.join("app.py"), "print('hi')\n").unwrap();
        run_command("git", ["add", "."], Some(root)).await.unwrap();
        run_command("git", ["commit", "--quiet", "-m", "init"], Some(root))
            .await
            .unwrap();

        assert_eq!(check_repository(root).await.unwrap(), "main");

        fs::write(root.join("app.py"), "print('bye')\n").unwrap();
        let error = check_repository(root).await.unwrap_err();
        assert!(error.to_string().contains("uncommitted changes"));
    }
}
