use thiserror::Error;

pub type Result<T> = std::result::Result<T, EntitiesError>;

#[derive(Error, Debug)]
pub enum EntitiesError {
    #[error("Unknown subject kind: {0}")]
    UnknownSubjectKind(String),

    #[error("Unknown object kind: {0}")]
    UnknownObjectKind(String),

    #[error("Unknown group type: {0}")]
    UnknownGroupType(String),
}
