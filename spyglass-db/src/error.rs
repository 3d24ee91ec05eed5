use thiserror::Error;
use tokio_rusqlite::rusqlite;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    #[error("server not found")]
    ServerNotFound,

    #[error("player not found")]
    PlayerNotFound,
}

pub type Result<T> = std::result::Result<T, DbError>;
