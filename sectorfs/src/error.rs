use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("not enough free sectors")]
    NoSpace,
    #[error("directory has no free entry")]
    DirectoryFull,
    #[error("file of {0} bytes exceeds the largest indexable size")]
    FileTooLarge(usize),
    #[error("found no file at path {0}")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0} is not a directory")]
    NotADirectory(String),
    #[error("directory {0} is not empty")]
    DirectoryNotEmpty(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("name {0} is too long")]
    NameTooLong(String),
    #[error("offset {offset} is beyond the end of a {length} byte file")]
    OutOfRange { offset: usize, length: usize },
    #[error("no open file with id {0}")]
    InvalidHandle(i32),
    #[error("disk does not hold a formatted file system")]
    Unformatted,
    #[error("invalid file system block layout")]
    InvalidBlock(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
