//! Persistance à deux niveaux
//!
//! - [`ScalarStore`] : magasin clé/valeur synchrone pour les deux documents
//!   JSON (playlist et réglages), réécrits en entier à chaque snapshot.
//! - [`blob::BlobStore`] : magasin binaire asynchrone pour le contenu des
//!   pistes locales et des deux assets.

pub mod blob;

use crate::playlist::Playlist;
use crate::settings::Settings;
use crate::track::{MediaKind, TrackEntry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Clé du document playlist
pub const PLAYLIST_KEY: &str = "pmoplayer-playlist";
/// Clé du document de réglages
pub const SETTINGS_KEY: &str = "pmoplayer-settings";

/// Magasin clé/valeur synchrone pour petits documents
pub trait ScalarStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Magasin scalaire sur disque : un fichier `{key}.json` par document
pub struct FileScalarStore {
    dir: PathBuf,
}

impl FileScalarStore {
    /// Ouvre (et crée si besoin) le répertoire des documents
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created state directory: {}", dir.display());
        }
        Ok(Self { dir })
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl ScalarStore for FileScalarStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key);
        // Écriture via fichier temporaire pour ne jamais laisser un document tronqué
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Saved document {}", path.display());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Magasin scalaire en mémoire
#[derive(Default)]
pub struct MemoryScalarStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryScalarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| Error::Persistence("scalar store lock poisoned".into()))
    }
}

impl ScalarStore for MemoryScalarStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

/// Entrée du document playlist
///
/// `src` vaut `null` pour les entrées adossées à un blob : le handle n'est
/// pas stable d'une session à l'autre et sera recréé à la restauration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTrack {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub has_blob: bool,
    #[serde(default, alias = "isObjectUrl")]
    pub is_handle_backed: bool,
}

impl From<&TrackEntry> for PersistedTrack {
    fn from(entry: &TrackEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            src: if entry.has_blob {
                None
            } else {
                Some(entry.src().to_string())
            },
            kind: entry.kind,
            has_blob: entry.has_blob,
            is_handle_backed: entry.is_handle_backed(),
        }
    }
}

/// Sérialise la playlist pour le magasin scalaire
///
/// `pending` porte les entrées lues mais pas encore restaurées ; elles sont
/// réécrites telles quelles à la suite des entrées vivantes.
pub fn playlist_document(playlist: &Playlist, pending: &[PersistedTrack]) -> Vec<PersistedTrack> {
    playlist
        .entries()
        .iter()
        .map(PersistedTrack::from)
        .chain(pending.iter().cloned())
        .collect()
}

/// Écrit le document playlist (remplacement complet)
pub fn write_playlist_document(
    store: &dyn ScalarStore,
    playlist: &Playlist,
    pending: &[PersistedTrack],
) -> Result<()> {
    let json = serde_json::to_string(&playlist_document(playlist, pending))?;
    store.set_item(PLAYLIST_KEY, &json)
}

/// Écrit le document de réglages (remplacement complet)
pub fn write_settings_document(store: &dyn ScalarStore, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string(&settings.to_document())?;
    store.set_item(SETTINGS_KEY, &json)
}

/// Écrit les deux documents
pub fn write_snapshot(
    store: &dyn ScalarStore,
    playlist: &Playlist,
    pending: &[PersistedTrack],
    settings: &Settings,
) -> Result<()> {
    write_playlist_document(store, playlist, pending)?;
    write_settings_document(store, settings)
}

/// Lit le document playlist
///
/// Document absent, illisible ou qui n'est pas un tableau : playlist vide.
/// Une entrée mal formée est ignorée sans invalider les autres. Seule une
/// erreur du store lui-même est remontée : le document existe peut-être
/// toujours et ne doit pas être pris pour une playlist vide.
pub fn read_playlist_document(store: &dyn ScalarStore) -> Result<Vec<PersistedTrack>> {
    let items = match read_json(store, PLAYLIST_KEY)? {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => {
            warn!(key = PLAYLIST_KEY, "Persisted playlist is not an array, ignoring it");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<PersistedTrack>(item) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!(key = PLAYLIST_KEY, "Skipping malformed playlist entry: {}", e);
                None
            }
        })
        .collect())
}

/// Lit le document de réglages (valeurs par défaut si absent ou illisible)
pub fn read_settings_document(store: &dyn ScalarStore) -> Settings {
    match read_json(store, SETTINGS_KEY) {
        Ok(Some(document)) => Settings::from_document(&document),
        Ok(None) => Settings::default(),
        Err(e) => {
            warn!(key = SETTINGS_KEY, "Scalar store unavailable: {}", e);
            Settings::default()
        }
    }
}

/// `Ok(None)` pour un document absent ou qui n'est pas du JSON
fn read_json(store: &dyn ScalarStore, key: &str) -> Result<Option<Value>> {
    let Some(raw) = store.get_item(key)? else {
        return Ok(None);
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let err = Error::MalformedPersisted {
                key: key.to_string(),
                reason: e.to_string(),
            };
            warn!("{}", err);
            Ok(None)
        }
    }
}
