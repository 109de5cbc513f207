//! Store binaire asynchrone (pistes locales et assets)
//!
//! Deux collections : `files` (une entrée par piste, clé = id de la piste)
//! et `assets` (deux clés fixes, voir [`AssetKey`](crate::AssetKey)).
//! [`BinaryStore`] enveloppe un backend optionnel : sans backend, toutes les
//! opérations deviennent des no-op et les lectures retournent `None`.

use crate::blob::Blob;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Collection du store binaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Files,
    Assets,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Files => "files",
            Collection::Assets => "assets",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Backend de stockage binaire
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, collection: Collection, id: &str, blob: &Blob) -> Result<()>;
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Blob>>;
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
    /// Liste les clés présentes dans une collection
    async fn ids(&self, collection: Collection) -> Result<Vec<String>>;
}

/// Store binaire SQLite (une base, deux tables)
pub struct SqliteBlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBlobStore {
    /// Ouvre la base, crée le répertoire parent et les tables si nécessaire
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StorageUnavailable(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::StorageUnavailable(format!("Failed to open database: {}", e)))?;
        info!("Opened blob store {}", db_path.display());
        Self::init(conn)
    }

    /// Base SQLite en mémoire (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::StorageUnavailable(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        for collection in [Collection::Files, Collection::Assets] {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id TEXT PRIMARY KEY,
                        content_type TEXT,
                        data BLOB NOT NULL
                    )",
                    collection.table()
                ),
                [],
            )
            .map_err(|e| {
                Error::StorageUnavailable(format!("Failed to create {} table: {}", collection, e))
            })?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Exécute une requête sur le pool bloquant de tokio
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Persistence("blob store lock poisoned".into()))?;
            f(&guard).map_err(Error::from)
        })
        .await
        .map_err(|e| Error::Persistence(format!("blob store task failed: {}", e)))?
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, collection: Collection, id: &str, blob: &Blob) -> Result<()> {
        let id = id.to_string();
        let data = blob.data.clone();
        let content_type = blob.content_type.clone();
        let sql = format!(
            "INSERT OR REPLACE INTO {} (id, content_type, data) VALUES (?1, ?2, ?3)",
            collection.table()
        );
        self.with_conn(move |conn| conn.execute(&sql, params![id, content_type, &data[..]]))
            .await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Blob>> {
        let id = id.to_string();
        let sql = format!(
            "SELECT content_type, data FROM {} WHERE id = ?1",
            collection.table()
        );
        self.with_conn(move |conn| {
            conn.query_row(&sql, params![id], |row| {
                let content_type: Option<String> = row.get(0)?;
                let data: Vec<u8> = row.get(1)?;
                Ok(Blob::new(Bytes::from(data), content_type))
            })
            .optional()
        })
        .await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let id = id.to_string();
        let sql = format!("DELETE FROM {} WHERE id = ?1", collection.table());
        self.with_conn(move |conn| conn.execute(&sql, params![id]))
            .await?;
        Ok(())
    }

    async fn ids(&self, collection: Collection) -> Result<Vec<String>> {
        let sql = format!("SELECT id FROM {} ORDER BY id", collection.table());
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
        .await
    }
}

/// Store binaire en mémoire (durée de vie du processus)
#[derive(Default)]
pub struct MemoryBlobStore {
    records: Mutex<HashMap<(Collection, String), Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(Collection, String), Blob>>> {
        self.records
            .lock()
            .map_err(|_| Error::Persistence("blob store lock poisoned".into()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, collection: Collection, id: &str, blob: &Blob) -> Result<()> {
        self.records()?
            .insert((collection, id.to_string()), blob.clone());
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Blob>> {
        Ok(self.records()?.get(&(collection, id.to_string())).cloned())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.records()?.remove(&(collection, id.to_string()));
        Ok(())
    }

    async fn ids(&self, collection: Collection) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .records()?
            .keys()
            .filter(|(c, _)| *c == collection)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Accès au store binaire, éventuellement indisponible
#[derive(Clone)]
pub struct BinaryStore {
    backend: Option<Arc<dyn BlobStore>>,
}

impl BinaryStore {
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Store désactivé par l'hôte : persistance binaire en mémoire seulement
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn put(&self, collection: Collection, id: &str, blob: &Blob) -> Result<()> {
        match &self.backend {
            Some(backend) => {
                backend.put(collection, id, blob).await?;
                debug!(%collection, id, size = blob.len(), "Stored blob");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub async fn get(&self, collection: Collection, id: &str) -> Result<Option<Blob>> {
        match &self.backend {
            Some(backend) => backend.get(collection, id).await,
            None => Ok(None),
        }
    }

    pub async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        match &self.backend {
            Some(backend) => {
                backend.delete(collection, id).await?;
                debug!(%collection, id, "Deleted blob");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub async fn ids(&self, collection: Collection) -> Result<Vec<String>> {
        match &self.backend {
            Some(backend) => backend.ids(collection).await,
            None => Ok(Vec::new()),
        }
    }
}
