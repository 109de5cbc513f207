//! Tests de restauration de session (rechargement simulé)

use async_trait::async_trait;
use pmoplayer::persistence::{PLAYLIST_KEY, SETTINGS_KEY};
use pmoplayer::{
    AudioArtMode, BackgroundMode, BinaryStore, Blob, BlobStore, Collection, Error,
    FileScalarStore, LocalFile, MediaKind, MemoryBlobStore, MemoryScalarStore, ObjectHandle,
    PlaybackSurface, ScalarStore, Session, SessionOptions, SimulatedSurface, SqliteBlobStore,
    Stores,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn audio_file(name: &str) -> LocalFile {
    LocalFile::new(name, Blob::new(name.as_bytes().to_vec(), Some("audio/ogg".into())))
}

async fn open(stores: &Stores) -> Session<SimulatedSurface> {
    Session::open(stores.clone(), SimulatedSurface::new(), SessionOptions::default()).await
}

fn persisted_playlist(stores: &Stores) -> anyhow::Result<Value> {
    let raw = stores.scalars.get_item(PLAYLIST_KEY)?.unwrap_or_default();
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::test]
async fn test_reload_mints_fresh_handles() -> anyhow::Result<()> {
    let stores = Stores::in_memory();

    let before: Vec<ObjectHandle> = {
        let mut session = open(&stores).await;
        for name in ["a.ogg", "b.ogg", "c.ogg"] {
            session.add_local(audio_file(name)).await;
        }
        let handles: Vec<ObjectHandle> = session
            .playlist()
            .entries()
            .iter()
            .filter_map(|e| e.handle().cloned())
            .collect();
        handles
    };
    assert_eq!(before.len(), 3);

    let session = open(&stores).await;
    let after: Vec<ObjectHandle> = session
        .playlist()
        .entries()
        .iter()
        .filter_map(|e| e.handle().cloned())
        .collect();

    assert_eq!(after.len(), 3);
    let distinct: HashSet<&ObjectHandle> = after.iter().collect();
    assert_eq!(distinct.len(), 3);
    assert!(after.iter().all(|h| !before.contains(h)));
    assert!(after.iter().all(|h| session.handles().is_live(h)));

    let titles: Vec<&str> = session
        .playlist()
        .entries()
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(titles, ["a.ogg", "b.ogg", "c.ogg"]);
    assert!(session.playlist().entries().iter().all(|e| e.has_blob));

    // Rien n'est sélectionné après un rechargement
    assert_eq!(session.playlist().current_index(), None);
    assert_eq!(session.surface().source(), None);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_nulls_handle_sources() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    let mut session = open(&stores).await;
    let local = session.add_local(audio_file("a.ogg")).await;
    session.add_remote("https://ex.com/b.mp3");

    let document = persisted_playlist(&stores)?;
    assert_eq!(document[0]["id"], json!(local.id));
    assert_eq!(document[0]["src"], Value::Null);
    assert_eq!(document[0]["hasBlob"], json!(true));
    assert_eq!(document[0]["isHandleBacked"], json!(true));
    assert_eq!(document[1]["src"], json!("https://ex.com/b.mp3"));
    assert_eq!(document[1]["kind"], json!("audio"));
    Ok(())
}

#[tokio::test]
async fn test_missing_blob_drops_entry() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    let lost = {
        let mut session = open(&stores).await;
        let lost = session.add_local(audio_file("lost.ogg")).await;
        session.add_local(audio_file("kept.ogg")).await;
        session.add_remote("https://ex.com/remote.mp3");
        lost
    };

    // Stockage vidé hors de l'application
    stores.blobs.delete(Collection::Files, &lost.id).await?;

    let session = open(&stores).await;
    let titles: Vec<&str> = session
        .playlist()
        .entries()
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(titles, ["kept.ogg", "remote.mp3"]);
    assert_eq!(session.handles().live_count(), 1);

    // Le document réparé ne référence plus l'entrée perdue
    let document = persisted_playlist(&stores)?;
    assert_eq!(document.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_corrupt_documents_give_empty_state() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    stores.scalars.set_item(PLAYLIST_KEY, "[{\"id\": ")?;
    stores.scalars.set_item(SETTINGS_KEY, "not json")?;

    let session = open(&stores).await;

    assert!(session.playlist().is_empty());
    assert_eq!(session.settings(), &pmoplayer::Settings::default());
    assert_eq!(session.surface().volume(), 1.0);
    Ok(())
}

#[tokio::test]
async fn test_stale_and_legacy_entries() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    stores.scalars.set_item(
        PLAYLIST_KEY,
        &json!([
            { "id": "stale", "title": "Gone", "src": null, "kind": "audio",
              "hasBlob": false, "isHandleBacked": false },
            { "id": "empty", "title": "Empty", "src": "", "kind": "audio",
              "hasBlob": false, "isHandleBacked": false },
            { "id": "legacy", "title": "Legacy", "src": "https://ex.com/legacy.webm",
              "kind": "video", "hasBlob": false, "isObjectUrl": false },
            { "id": "odd", "title": "", "src": "https://ex.com/stream", "kind": "radio" }
        ])
        .to_string(),
    )?;

    let session = open(&stores).await;
    let entries = session.playlist().entries();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "legacy");
    assert_eq!(entries[0].kind, MediaKind::Video);
    assert_eq!(entries[0].src(), "https://ex.com/legacy.webm");
    assert_eq!(entries[1].title, "Untitled Track");
    assert_eq!(entries[1].kind, MediaKind::Media);
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_volume_falls_back() -> anyhow::Result<()> {
    for volume in [json!(1.4), json!("loud"), json!(-2), Value::Null] {
        let stores = Stores::in_memory();
        stores.scalars.set_item(
            SETTINGS_KEY,
            &json!({ "volume": volume, "muted": true, "loopPlaylist": true }).to_string(),
        )?;

        let session = open(&stores).await;
        assert_eq!(session.settings().volume, 1.0);
        assert_eq!(session.surface().volume(), 1.0);
        assert!(session.surface().is_muted());
        assert!(session.settings().loop_playlist);
    }
    Ok(())
}

#[tokio::test]
async fn test_valid_volume_is_applied() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    {
        let mut session = open(&stores).await;
        session.set_volume(0.3);
        session.toggle_shuffle();
    }

    let session = open(&stores).await;
    assert_eq!(session.settings().volume, 0.3);
    assert_eq!(session.surface().volume(), 0.3);
    assert!(session.settings().shuffle);
    assert!(!session.surface().is_muted());
    Ok(())
}

#[tokio::test]
async fn test_track_loop_survives_reload() {
    let stores = Stores::in_memory();
    {
        let mut session = open(&stores).await;
        session.toggle_loop_track();
    }

    let session = open(&stores).await;
    assert!(session.settings().loop_track);
    assert!(session.surface().is_looping());
}

#[tokio::test]
async fn test_orphan_records_are_swept() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    let kept = {
        let mut session = open(&stores).await;
        let kept = session.add_local(audio_file("kept.ogg")).await;
        kept
    };
    stores
        .blobs
        .put(Collection::Files, "orphan", &Blob::new(vec![0], None))
        .await?;

    let _session = open(&stores).await;
    assert_eq!(stores.blobs.ids(Collection::Files).await?, vec![kept.id]);
    Ok(())
}

#[tokio::test]
async fn test_orphan_sweep_can_be_disabled() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    stores
        .blobs
        .put(Collection::Files, "orphan", &Blob::new(vec![0], None))
        .await?;

    let options = SessionOptions {
        sweep_orphans: false,
    };
    let _session = Session::open(stores.clone(), SimulatedSurface::new(), options).await;
    assert_eq!(stores.blobs.ids(Collection::Files).await?, vec!["orphan"]);
    Ok(())
}

#[tokio::test]
async fn test_missing_assets_demote_modes() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    stores.scalars.set_item(
        SETTINGS_KEY,
        &json!({
            "backgroundSettings": { "mode": "image" },
            "audioArtMode": "custom",
            "volume": 0.5
        })
        .to_string(),
    )?;

    let session = open(&stores).await;

    assert_eq!(session.settings().background, BackgroundMode::Default);
    assert_eq!(session.settings().audio_art, AudioArtMode::Default);
    assert!(session.background_handle().is_none());
    assert!(session.audio_art_handle().is_none());

    // Les réglages réparés sont réécrits
    let raw = stores.scalars.get_item(SETTINGS_KEY)?.unwrap_or_default();
    let document: Value = serde_json::from_str(&raw)?;
    assert_eq!(document["backgroundSettings"]["mode"], json!("default"));
    assert_eq!(document["audioArtMode"], json!("default"));
    assert_eq!(document["volume"], json!(0.5));
    Ok(())
}

#[tokio::test]
async fn test_assets_are_restored() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    let (background, art) = {
        let mut session = open(&stores).await;
        let background = session
            .set_background_image(Blob::new(vec![1], Some("image/jpeg".into())))
            .await;
        let art = session
            .set_audio_art(Blob::new(vec![2], Some("image/png".into())))
            .await;
        (background, art)
    };

    let session = open(&stores).await;

    assert_eq!(session.settings().background, BackgroundMode::Image);
    assert_eq!(session.settings().audio_art, AudioArtMode::Custom);
    let restored_background = session.background_handle().expect("background");
    let restored_art = session.audio_art_handle().expect("art");
    assert_ne!(restored_background, &background);
    assert_ne!(restored_art, &art);
    assert_eq!(
        session.handles().resolve(restored_art).map(|b| b.data.to_vec()),
        Some(vec![2])
    );
    Ok(())
}

#[tokio::test]
async fn test_unavailable_binary_store_demotes_assets() -> anyhow::Result<()> {
    let scalars: Arc<dyn ScalarStore> = Arc::new(MemoryScalarStore::new());
    let stores = Stores::new(BinaryStore::unavailable(), scalars);
    {
        let mut session = open(&stores).await;
        session.set_background_image(Blob::new(vec![1], None)).await;
        assert_eq!(session.settings().background, BackgroundMode::Image);
    }

    let session = open(&stores).await;
    assert_eq!(session.settings().background, BackgroundMode::Default);
    Ok(())
}

#[tokio::test]
async fn test_on_disk_stores_survive_reload() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let stores = || -> anyhow::Result<Stores> {
        let blobs = SqliteBlobStore::open(&dir.path().join("blobs").join("media.db"))?;
        let scalars = FileScalarStore::new(dir.path().join("state"))?;
        Ok(Stores::new(
            BinaryStore::new(Arc::new(blobs)),
            Arc::new(scalars),
        ))
    };

    {
        let mut session = open(&stores()?).await;
        session.add_local(audio_file("disk.ogg")).await;
        session.add_remote("https://ex.com/b.mp3");
        session.toggle_loop_playlist();
    }

    let session = open(&stores()?).await;
    assert_eq!(session.playlist().len(), 2);
    assert!(session.settings().loop_playlist);

    let entry = session.playlist().get(0).expect("entry");
    let handle = entry.handle().expect("handle");
    assert_eq!(
        session.handles().resolve(handle).map(|b| b.data.to_vec()),
        Some(b"disk.ogg".to_vec())
    );
    Ok(())
}

/// Store scalaire dont les lectures peuvent être coupées
#[derive(Default)]
struct FlakyScalarStore {
    inner: MemoryScalarStore,
    failing: AtomicBool,
}

impl ScalarStore for FlakyScalarStore {
    fn get_item(&self, key: &str) -> pmoplayer::Result<Option<String>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable(format!("cannot read {}", key)));
        }
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> pmoplayer::Result<()> {
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> pmoplayer::Result<()> {
        self.inner.remove_item(key)
    }
}

/// Store binaire dont les lectures peuvent être coupées
#[derive(Default)]
struct FlakyBlobStore {
    inner: MemoryBlobStore,
    failing: AtomicBool,
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, collection: Collection, id: &str, blob: &Blob) -> pmoplayer::Result<()> {
        self.inner.put(collection, id, blob).await
    }

    async fn get(&self, collection: Collection, id: &str) -> pmoplayer::Result<Option<Blob>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable(format!("cannot read {}", id)));
        }
        self.inner.get(collection, id).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> pmoplayer::Result<()> {
        self.inner.delete(collection, id).await
    }

    async fn ids(&self, collection: Collection) -> pmoplayer::Result<Vec<String>> {
        self.inner.ids(collection).await
    }
}

async fn file_ids(stores: &Stores) -> anyhow::Result<Vec<String>> {
    let mut ids = stores.blobs.ids(Collection::Files).await?;
    ids.sort();
    Ok(ids)
}

fn titles(session: &Session<SimulatedSurface>) -> Vec<String> {
    session
        .playlist()
        .entries()
        .iter()
        .map(|e| e.title.clone())
        .collect()
}

#[tokio::test]
async fn test_unreadable_playlist_keeps_stored_files() -> anyhow::Result<()> {
    let scalars = Arc::new(FlakyScalarStore::default());
    let stores = Stores::new(
        BinaryStore::new(Arc::new(MemoryBlobStore::new())),
        scalars.clone(),
    );
    {
        let mut session = open(&stores).await;
        session.add_local(audio_file("a.ogg")).await;
        session.add_local(audio_file("b.ogg")).await;
    }
    let stored = file_ids(&stores).await?;
    assert_eq!(stored.len(), 2);
    let saved_playlist = scalars.inner.get_item(PLAYLIST_KEY)?;

    scalars.failing.store(true, Ordering::SeqCst);
    {
        let mut session = open(&stores).await;
        assert!(session.playlist().is_empty());
        assert_eq!(file_ids(&stores).await?, stored);

        // Une mutation ne doit pas écraser le document qu'on n'a pas pu lire
        session.toggle_shuffle();
        session.add_remote("https://ex.com/r.mp3");
        assert_eq!(scalars.inner.get_item(PLAYLIST_KEY)?, saved_playlist);
    }

    scalars.failing.store(false, Ordering::SeqCst);
    let session = open(&stores).await;
    assert_eq!(titles(&session), ["a.ogg", "b.ogg"]);
    assert!(session.settings().shuffle);
    assert_eq!(file_ids(&stores).await?, stored);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_file_is_kept_for_next_start() -> anyhow::Result<()> {
    let blobs = Arc::new(FlakyBlobStore::default());
    let stores = Stores::new(
        BinaryStore::new(blobs.clone()),
        Arc::new(MemoryScalarStore::new()),
    );
    {
        let mut session = open(&stores).await;
        session.add_local(audio_file("a.ogg")).await;
        session.add_remote("https://ex.com/r.mp3");
        session.add_local(audio_file("b.ogg")).await;
    }
    let stored = file_ids(&stores).await?;
    stores
        .blobs
        .put(Collection::Files, "orphan", &Blob::new(vec![0], None))
        .await?;

    blobs.failing.store(true, Ordering::SeqCst);
    {
        let mut session = open(&stores).await;
        assert_eq!(titles(&session), ["r.mp3"]);
        // Ni balayage ni réécriture tant qu'une lecture a échoué
        assert_eq!(file_ids(&stores).await?.len(), 3);
        let ids: Vec<Value> = persisted_playlist(&stores)?
            .as_array()
            .map(|items| items.iter().map(|item| item["id"].clone()).collect())
            .unwrap_or_default();
        assert_eq!(ids.len(), 3);

        // Les entrées en attente survivent aux snapshots de la session
        session.add_remote("https://ex.com/s.mp3");
        assert_eq!(persisted_playlist(&stores)?.as_array().map(Vec::len), Some(4));
    }

    blobs.failing.store(false, Ordering::SeqCst);
    let session = open(&stores).await;
    assert_eq!(titles(&session), ["r.mp3", "s.mp3", "a.ogg", "b.ogg"]);
    assert_eq!(session.handles().live_count(), 2);
    // L'orphelin est balayé une fois la lecture revenue
    assert_eq!(file_ids(&stores).await?, stored);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_asset_is_not_deleted() -> anyhow::Result<()> {
    let blobs = Arc::new(FlakyBlobStore::default());
    let stores = Stores::new(
        BinaryStore::new(blobs.clone()),
        Arc::new(MemoryScalarStore::new()),
    );
    {
        let mut session = open(&stores).await;
        session.set_background_image(Blob::new(vec![1], None)).await;
    }

    blobs.failing.store(true, Ordering::SeqCst);
    {
        let session = open(&stores).await;
        assert_eq!(session.settings().background, BackgroundMode::Image);
        assert!(session.background_handle().is_none());
    }
    assert_eq!(
        stores.blobs.ids(Collection::Assets).await?,
        vec!["background-image"]
    );

    blobs.failing.store(false, Ordering::SeqCst);
    let session = open(&stores).await;
    assert_eq!(session.settings().background, BackgroundMode::Image);
    assert!(session.background_handle().is_some());
    Ok(())
}
