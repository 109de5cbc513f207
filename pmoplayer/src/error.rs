//! Types d'erreurs pour pmoplayer

/// Erreurs du contrôleur de playlist
///
/// Aucune de ces erreurs n'est fatale : la [`Session`](crate::Session) les
/// journalise et se replie sur un état plus petit mais cohérent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Malformed persisted document {key}: {reason}")]
    MalformedPersisted { key: String, reason: String },

    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("Failed to delete record {id}: {reason}")]
    DeleteFailure { id: String, reason: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

/// Type Result spécialisé pour pmoplayer
pub type Result<T> = std::result::Result<T, Error>;
