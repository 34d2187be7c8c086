pub mod ask;
pub mod docker;
pub mod fs;
pub mod git;
pub mod http;
pub mod shell;

pub use ask::{Ask, AskQuestion};
pub use docker::{DockerBuild, DockerBuildLog, DockerRun, DockerRunLog};
pub use fs::{FileTypeCounts, GitIgnore, ListFiles, ReadFile, ShowFileCount};
pub use git::{Commit, CommitConfirmation};
pub use http::SendRequest;
