//! Restauration de session et réparation des incohérences entre stores

use super::assets::AssetReload;
use super::{Session, SessionOptions, Stores};
use crate::blob::AssetKey;
use crate::handle::HandleRegistry;
use crate::persistence::blob::Collection;
use crate::persistence::{read_playlist_document, read_settings_document, PersistedTrack};
use crate::playlist::Playlist;
use crate::settings::{AudioArtMode, BackgroundMode};
use crate::surface::PlaybackSurface;
use crate::track::{TrackEntry, UNTITLED_TRACK};
use crate::Error;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Bilan de la restauration de la playlist
#[derive(Debug, Default)]
struct PlaylistRestore {
    entries: Vec<TrackEntry>,
    dropped: usize,
    /// Entrées dont le blob n'a pas pu être lu
    deferred: Vec<PersistedTrack>,
    /// Le document playlist lui-même n'a pas pu être lu
    unreadable: bool,
}

impl PlaylistRestore {
    /// Une lecture a échoué : l'état restauré est incomplet et ne doit ni
    /// servir à balayer les blobs ni remplacer les documents
    fn degraded(&self) -> bool {
        self.unreadable || !self.deferred.is_empty()
    }
}

/// Sort d'une entrée persistée
enum EntryRestore {
    Kept(TrackEntry),
    Dropped,
    /// Blob illisible pour l'instant, l'entrée sera retentée
    Deferred,
}

impl<S: PlaybackSurface> Session<S> {
    /// Ouvre une session à partir des stores
    ///
    /// La playlist est restaurée, puis les réglages, strictement dans cet
    /// ordre ; la session n'est rendue qu'une fois la restauration terminée,
    /// aucune mutation ne peut donc s'y intercaler. Rien ici n'est fatal :
    /// un document illisible ou un blob disparu donne simplement un état
    /// plus petit. Une erreur de lecture d'un store ne supprime jamais rien.
    pub async fn open(stores: Stores, surface: S, options: SessionOptions) -> Self {
        let mut session = Self {
            playlist: Playlist::new(),
            settings: Default::default(),
            handles: HandleRegistry::new(),
            stores,
            surface,
            paused: true,
            pending: Vec::new(),
            playlist_unreadable: false,
        };

        let restore = session.restore_playlist().await;
        let degraded = restore.degraded();
        let mut repaired = restore.dropped > 0;
        let restored = restore.entries.len();
        let deferred = restore.deferred.len();
        session.playlist = Playlist::from_entries(restore.entries);
        session.pending = restore.deferred;
        session.playlist_unreadable = restore.unreadable;

        if options.sweep_orphans && !degraded {
            session.sweep_orphans().await;
        }

        repaired |= session.restore_settings().await;

        if repaired && !degraded {
            session.snapshot();
        }

        info!(
            tracks = restored,
            dropped = restore.dropped,
            deferred,
            degraded,
            repaired,
            "Session restored"
        );
        session
    }

    async fn restore_playlist(&mut self) -> PlaylistRestore {
        let mut restore = PlaylistRestore::default();

        let persisted = match read_playlist_document(self.stores.scalars.as_ref()) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Failed to read saved playlist, starting empty: {}", e);
                restore.unreadable = true;
                return restore;
            }
        };

        for track in persisted {
            match self.restore_entry(&track).await {
                EntryRestore::Kept(entry) => restore.entries.push(entry),
                EntryRestore::Dropped => restore.dropped += 1,
                EntryRestore::Deferred => restore.deferred.push(track),
            }
        }

        restore
    }

    async fn restore_entry(&mut self, persisted: &PersistedTrack) -> EntryRestore {
        let title = if persisted.title.is_empty() {
            UNTITLED_TRACK.to_string()
        } else {
            persisted.title.clone()
        };

        if persisted.has_blob {
            return match self.stores.blobs.get(Collection::Files, &persisted.id).await {
                Ok(Some(blob)) => {
                    let handle = self.handles.mint(blob);
                    EntryRestore::Kept(TrackEntry::with_handle(
                        persisted.id.clone(),
                        title,
                        persisted.kind,
                        handle,
                    ))
                }
                Ok(None) => {
                    debug!("{}, dropping track", Error::RecordNotFound(persisted.id.clone()));
                    EntryRestore::Dropped
                }
                Err(e) => {
                    warn!(id = %persisted.id, "Failed to read stored file, keeping it for next start: {}", e);
                    EntryRestore::Deferred
                }
            };
        }

        match persisted.src.as_deref().map(str::trim) {
            Some(src) if !src.is_empty() => EntryRestore::Kept(TrackEntry::restored_remote(
                persisted.id.clone(),
                title,
                persisted.kind,
                src.to_string(),
            )),
            _ => {
                debug!(id = %persisted.id, "Dropping stale track without source");
                EntryRestore::Dropped
            }
        }
    }

    /// Supprime les blobs `files` qu'aucune piste restaurée ne référence
    async fn sweep_orphans(&self) {
        let referenced: HashSet<&str> = self
            .playlist
            .entries()
            .iter()
            .filter(|entry| entry.has_blob)
            .map(|entry| entry.id.as_str())
            .chain(self.pending.iter().map(|track| track.id.as_str()))
            .collect();

        let ids = match self.stores.blobs.ids(Collection::Files).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to list stored files: {}", e);
                return;
            }
        };

        let mut swept = 0;
        for id in ids.iter().filter(|id| !referenced.contains(id.as_str())) {
            self.forget_blob(id).await;
            swept += 1;
        }
        if swept > 0 {
            info!(swept, "Swept orphaned file records");
        }
    }

    /// Restaure les réglages et les applique à la surface
    ///
    /// Retourne true si un mode d'asset a dû être rétrogradé. Un asset
    /// illisible n'est ni rétrogradé ni supprimé.
    async fn restore_settings(&mut self) -> bool {
        self.settings = read_settings_document(self.stores.scalars.as_ref());

        self.surface.set_volume(self.settings.volume);
        self.surface.set_muted(self.settings.muted);
        self.surface.set_loop(self.settings.loop_track);

        let mut repaired = false;

        if self.settings.background == BackgroundMode::Image {
            match self.reload_asset(AssetKey::BackgroundImage).await {
                AssetReload::Loaded => {}
                AssetReload::Missing => {
                    self.settings.background = BackgroundMode::Default;
                    self.forget_asset(AssetKey::BackgroundImage).await;
                    repaired = true;
                }
                // Le mode est gardé : l'asset sera relu au prochain démarrage
                AssetReload::Unreadable => {}
            }
        }

        if self.settings.audio_art == AudioArtMode::Custom {
            match self.reload_asset(AssetKey::AudioArt).await {
                AssetReload::Loaded => {}
                AssetReload::Missing => {
                    self.settings.audio_art = AudioArtMode::Default;
                    self.forget_asset(AssetKey::AudioArt).await;
                    repaired = true;
                }
                AssetReload::Unreadable => {}
            }
        }

        repaired
    }
}
