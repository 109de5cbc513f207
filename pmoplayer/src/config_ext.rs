//! Extension de pmoconfig pour le lecteur

use crate::persistence::blob::{BinaryStore, SqliteBlobStore};
use crate::persistence::FileScalarStore;
use crate::session::{SessionOptions, Stores};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_BLOB_FILE: &str = "media.db";

/// Trait d'extension pour pmoconfig::Config
pub trait PlayerConfigExt {
    /// Répertoire des documents scalaires (playlist et réglages)
    fn player_state_dir(&self) -> Result<PathBuf>;

    /// Chemin de la base du store binaire, `None` si l'hôte le désactive
    fn player_blob_db_path(&self) -> Result<Option<PathBuf>>;

    fn player_sweep_orphans(&self) -> bool;

    /// Ouvre les deux stores configurés
    ///
    /// Un store binaire impossible à ouvrir n'est pas une erreur : les
    /// blobs ne vivent alors qu'en mémoire.
    fn player_stores(&self) -> Result<Stores>;

    fn player_session_options(&self) -> SessionOptions {
        SessionOptions {
            sweep_orphans: self.player_sweep_orphans(),
        }
    }
}

impl PlayerConfigExt for pmoconfig::Config {
    fn player_state_dir(&self) -> Result<PathBuf> {
        Ok(self.get_managed_dir(&["player", "state", "directory"], "state")?)
    }

    fn player_blob_db_path(&self) -> Result<Option<PathBuf>> {
        if !self.get_bool(&["player", "blobs", "enabled"], true) {
            return Ok(None);
        }
        let dir = self.get_managed_dir(&["player", "blobs", "directory"], "blobs")?;
        let file = self.get_string(&["player", "blobs", "file"], DEFAULT_BLOB_FILE);
        Ok(Some(dir.join(file)))
    }

    fn player_sweep_orphans(&self) -> bool {
        self.get_bool(&["player", "restore", "sweep_orphans"], true)
    }

    fn player_stores(&self) -> Result<Stores> {
        let scalars = FileScalarStore::new(self.player_state_dir()?)?;

        let blobs = match self.player_blob_db_path()? {
            Some(path) => match SqliteBlobStore::open(&path) {
                Ok(store) => BinaryStore::new(Arc::new(store)),
                Err(e) => {
                    warn!("{}, keeping binaries in memory only", e);
                    BinaryStore::unavailable()
                }
            },
            None => BinaryStore::unavailable(),
        };

        Ok(Stores::new(blobs, Arc::new(scalars)))
    }
}
