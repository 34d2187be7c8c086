use crate::agent::AgentError;
use crate::events::{Event, Host, HostError, Message, Tone};
use crate::execution::Emitter;
use crate::tools::types::{
    FileTypeCountsRequest, FileTypeCountsResponse, Line, ListFilesRequest, ListFilesResponse, ReadFileRequest,
    ReadFileResponse,
};
use crate::tools::Tool;
use async_trait::async_trait;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Patterns from the project's root `.gitignore`.
///
/// The last matching pattern decides, so `!pattern` re-includes what an
/// earlier pattern excluded.
#[derive(Debug, Clone)]
pub struct GitIgnore {
    patterns: GlobSet,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    negated: bool,
    dir_only: bool,
}

impl GitIgnore {
    pub fn empty() -> Self {
        Self {
            patterns: GlobSet::empty(),
            rules: Vec::new(),
        }
    }

    /// Load `<root>/.gitignore`, or nothing if it is missing.
    pub fn load(root: &Path) -> Self {
        match std::fs::read_to_string(root.join(".gitignore")) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::empty(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut patterns = GlobSetBuilder::new();
        let mut rules = Vec::new();

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (negated, line) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line.strip_prefix('\\').unwrap_or(line)),
            };
            let dir_only = line.ends_with('/');
            let line = line.trim_end_matches('/');
            let anchored = line.contains('/');
            let line = line.trim_start_matches('/');
            if line.is_empty() {
                continue;
            }

            let pattern = if anchored {
                line.to_string()
            } else {
                format!("**/{}", line)
            };
            match GlobBuilder::new(&pattern).literal_separator(true).build() {
                Ok(glob) => {
                    patterns.add(glob);
                    rules.push(Rule { negated, dir_only });
                }
                Err(e) => debug!(pattern = raw, error = %e, "skipping gitignore pattern"),
            }
        }

        match patterns.build() {
            Ok(patterns) => Self { patterns, rules },
            Err(e) => {
                debug!(error = %e, "unusable gitignore");
                Self::empty()
            }
        }
    }

    /// `path` is relative to the project root.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.patterns
            .matches(path)
            .into_iter()
            .filter(|&index| is_dir || !self.rules[index].dir_only)
            .max()
            .map_or(false, |index| !self.rules[index].negated)
    }
}

/// Files below `start`, skipping `.git` and anything ignored relative to `root`.
fn project_files<'a>(root: &'a Path, start: &Path, ignore: &'a GitIgnore) -> impl Iterator<Item = DirEntry> + 'a {
    WalkDir::new(start)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_dir();
            if is_dir && entry.file_name() == ".git" {
                return false;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            !ignore.is_ignored(relative, is_dir)
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
}

/// Extension used for counting: the text after the last dot, or the whole
/// name for dot-files and names without one.
fn file_type(name: &str) -> &str {
    if name.is_empty() || name.starts_with('.') {
        return name;
    }
    name.rsplit('.').next().unwrap_or(name)
}

/// Table of file counts by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowFileCount {
    pub file_types: BTreeMap<String, usize>,
}

impl Event for ShowFileCount {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        let total: usize = self.file_types.values().sum();
        host.say(&format!("Found {} files.", total), Tone::Plain);
        host.say(&format!("{:<24} {:>8}", "File Type", "Count"), Tone::Info);
        for (file_type, count) in &self.file_types {
            host.say(&format!("{:<24} {:>8}", file_type, count), Tone::Plain);
        }
        Ok(None)
    }
}

/// Read a project file as numbered lines.
pub struct ReadFile {
    project_root: PathBuf,
}

impl ReadFile {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Tool for ReadFile {
    type Request = ReadFileRequest;
    type Response = ReadFileResponse;

    fn name(&self) -> &str {
        "ReadFile"
    }

    fn description(&self) -> &str {
        "Read contents of a file.\nAvoid reading *.lock type files as they tend to be large"
    }

    async fn run(&self, request: ReadFileRequest, emitter: &Emitter) -> Result<ReadFileResponse, AgentError> {
        emitter
            .emit(Message::info(format!(
                "Reading file at {} and extracting details...",
                request.path
            )))
            .await?;

        let path = self.project_root.join(&request.path);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(ReadFileResponse {
                    data: None,
                    error: Some(format!("{}: {}", request.path, e)),
                })
            }
        };

        let data = content
            .split_inclusive('\n')
            .enumerate()
            .map(|(i, line)| Line {
                line_number: i + 1,
                content: line.to_string(),
            })
            .collect();
        Ok(ReadFileResponse {
            data: Some(data),
            error: None,
        })
    }
}

/// Recursive file-name glob below a project directory.
pub struct ListFiles {
    project_root: PathBuf,
}

impl ListFiles {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn list(&self, request: &ListFilesRequest) -> Result<Vec<String>, String> {
        let matcher = Glob::new(&request.pattern)
            .map_err(|e| format!("Invalid pattern {}: {}", request.pattern, e))?
            .compile_matcher();

        let start = match request.sub_dir.trim_matches('/') {
            "" | "." => self.project_root.clone(),
            sub_dir => self.project_root.join(sub_dir),
        };
        if !start.exists() {
            return Err(format!("Incorrect sub_dir {}. Does not exist", request.sub_dir));
        }

        let ignore = GitIgnore::load(&self.project_root);
        let paths = project_files(&self.project_root, &start, &ignore)
            .filter(|entry| matcher.is_match(entry.file_name()))
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&start)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        Ok(paths)
    }
}

#[async_trait]
impl Tool for ListFiles {
    type Request = ListFilesRequest;
    type Response = ListFilesResponse;

    fn name(&self) -> &str {
        "ListFiles"
    }

    fn description(&self) -> &str {
        "List all files.\n\
         If you want to find all json files recursively under directory a/b\n\
         the sub_dir should be a/b and pattern will be *.json\n\n\
         If you want to find all json files recursively under current directory\n\
         the sub_dir should be . and pattern will be *.json"
    }

    async fn run(&self, request: ListFilesRequest, emitter: &Emitter) -> Result<ListFilesResponse, AgentError> {
        emitter
            .emit(Message::info(format!(
                "Looking for files matching the pattern {}",
                request.pattern
            )))
            .await?;

        let paths = match self.list(&request) {
            Ok(paths) => paths,
            Err(error) => {
                return Ok(ListFilesResponse {
                    paths: None,
                    error: Some(error),
                })
            }
        };

        if paths.is_empty() {
            emitter
                .emit(Message::alert(format!(
                    "No files found matching the pattern {}.",
                    request.pattern
                )))
                .await?;
        } else {
            emitter
                .emit(Message::success(format!("Found {} files.", paths.len())))
                .await?;
        }
        Ok(ListFilesResponse {
            paths: Some(paths),
            error: None,
        })
    }
}

/// Count project files by type.
pub struct FileTypeCounts {
    project_root: PathBuf,
}

impl FileTypeCounts {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    pub fn count(&self) -> BTreeMap<String, usize> {
        let ignore = GitIgnore::load(&self.project_root);
        let mut counts = BTreeMap::new();
        for entry in project_files(&self.project_root, &self.project_root, &ignore) {
            let name = entry.file_name().to_string_lossy();
            *counts.entry(file_type(&name).to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl Tool for FileTypeCounts {
    type Request = FileTypeCountsRequest;
    type Response = FileTypeCountsResponse;

    fn name(&self) -> &str {
        "FileTypeCounts"
    }

    fn description(&self) -> &str {
        "Get counts of different types of file present."
    }

    async fn run(
        &self,
        _request: FileTypeCountsRequest,
        emitter: &Emitter,
    ) -> Result<FileTypeCountsResponse, AgentError> {
        emitter
            .emit(Message::info("Scanning for various file types..."))
            .await?;

        let file_types = self.count();
        emitter
            .emit(ShowFileCount {
                file_types: file_types.clone(),
            })
            .await?;
        Ok(FileTypeCountsResponse { file_types })
    }
}
