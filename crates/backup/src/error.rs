use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{category} writer has stopped")]
    WriterStopped { category: &'static str },

    #[error("{category} batch write failed on {failed_hosts} host(s)")]
    Write {
        category: &'static str,
        failed_hosts: usize,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("blocking task failed: {0}")]
    Task(String),
}
