use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Row decoding error: {0}")]
    Decode(String),

    #[error("Initialization error: {0}")]
    Initialization(String),
}

// Stored kind/type columns that fail to parse surface as decode errors.
impl From<entities::EntitiesError> for StoreError {
    fn from(err: entities::EntitiesError) -> Self {
        StoreError::Decode(err.to_string())
    }
}
