//! Session : état possédé du lecteur et coordination des deux stores
//!
//! La session possède la playlist, les réglages, le registre de handles, les
//! stores et la surface de lecture. Toute opération qui touche aux deux
//! niveaux de stockage (ajout local, suppression, vidage, restauration)
//! passe par elle ; une défaillance partielle se résout toujours vers
//! « moins de choses mémorisées », jamais vers une référence pendante.
//!
//! Les échecs de stockage et de lecture sont journalisés puis absorbés :
//! aucune opération publique n'échoue à cause d'un store.

mod assets;
mod restore;

use crate::blob::LocalFile;
use crate::handle::HandleRegistry;
use crate::persistence::blob::{BinaryStore, Collection, MemoryBlobStore};
use crate::persistence::{
    write_settings_document, write_snapshot, MemoryScalarStore, PersistedTrack, ScalarStore,
};
use crate::playlist::navigation::{next_index, previous_index, Advance, NavigationModes};
use crate::playlist::{Playlist, SelectionChange};
use crate::settings::{clamp_volume, Settings};
use crate::surface::{PlaybackEvent, PlaybackSurface};
use crate::track::{detect_kind, TrackEntry, UNTITLED_TRACK};
use crate::Error;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Les deux niveaux de stockage
#[derive(Clone)]
pub struct Stores {
    pub blobs: BinaryStore,
    pub scalars: Arc<dyn ScalarStore>,
}

impl Stores {
    pub fn new(blobs: BinaryStore, scalars: Arc<dyn ScalarStore>) -> Self {
        Self { blobs, scalars }
    }

    /// Stores volatils, limités à la durée de vie du processus
    pub fn in_memory() -> Self {
        Self {
            blobs: BinaryStore::new(Arc::new(MemoryBlobStore::new())),
            scalars: Arc::new(MemoryScalarStore::new()),
        }
    }
}

/// Options de restauration
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Supprime au démarrage les blobs `files` qu'aucune piste ne référence
    pub sweep_orphans: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sweep_orphans: true,
        }
    }
}

/// Résultat d'une soumission du formulaire d'ajout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Ni fichier ni URL : l'appelant doit redemander une saisie
    Empty,
    Added(usize),
}

/// Session de lecture
pub struct Session<S: PlaybackSurface> {
    playlist: Playlist,
    settings: Settings,
    handles: HandleRegistry,
    stores: Stores,
    surface: S,
    paused: bool,
    /// Entrées dont le blob n'a pas pu être lu à l'ouverture ; conservées
    /// dans chaque snapshot pour être retentées au prochain démarrage
    pending: Vec<PersistedTrack>,
    /// Le document playlist n'a pas pu être lu : on ne l'écrase pas
    playlist_unreadable: bool,
}

impl<S: PlaybackSurface> Session<S> {
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Accès direct à la surface (position, durée, évènements de l'hôte)
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Indicateur lecture/pause affiché par l'interface
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Réécrit les deux documents scalaires
    ///
    /// Un échec est journalisé : l'état en mémoire reste la référence.
    fn snapshot(&self) {
        let store = self.stores.scalars.as_ref();
        let result = if self.playlist_unreadable {
            write_settings_document(store, &self.settings)
        } else {
            write_snapshot(store, &self.playlist, &self.pending, &self.settings)
        };
        if let Err(e) = result {
            warn!("Failed to save player state: {}", e);
        }
    }

    fn append(&mut self, entry: TrackEntry) -> TrackEntry {
        let index = self.playlist.push(entry.clone());
        debug!(id = %entry.id, index, kind = %entry.kind, "Added track");
        self.snapshot();
        if self.playlist.current_index().is_none() {
            self.select(index);
        }
        entry
    }

    /// Ajoute un fichier local
    ///
    /// Le contenu est persisté sous un nouvel identifiant puis un handle est
    /// créé pour la lecture immédiate. Si le store binaire refuse l'écriture,
    /// la piste reste jouable pour la session en cours.
    pub async fn add_local(&mut self, file: LocalFile) -> TrackEntry {
        let id = uuid::Uuid::new_v4().to_string();

        if let Err(e) = self.stores.blobs.put(Collection::Files, &id, &file.blob).await {
            warn!(id = %id, "Failed to persist local file {}: {}", file.name, e);
        }

        let kind = detect_kind(&file.name, file.content_type());
        let title = if file.name.is_empty() {
            UNTITLED_TRACK.to_string()
        } else {
            file.name
        };
        let handle = self.handles.mint(file.blob);
        self.append(TrackEntry::with_handle(id, title, kind, handle))
    }

    /// Ajoute une URL distante (ignorée si vide)
    pub fn add_remote(&mut self, url: &str) -> Option<TrackEntry> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let id = uuid::Uuid::new_v4().to_string();
        Some(self.append(TrackEntry::remote(id, url.to_string())))
    }

    fn stop_and_unload(&mut self) {
        self.surface.pause();
        self.surface.load(None);
        self.paused = true;
    }

    async fn forget_blob(&self, id: &str) {
        if let Err(e) = self.stores.blobs.delete(Collection::Files, id).await {
            let err = Error::DeleteFailure {
                id: id.to_string(),
                reason: e.to_string(),
            };
            warn!("{}", err);
        }
    }

    /// Retire la piste à `index`
    ///
    /// Le handle est révoqué, le blob supprimé (au mieux) et la sélection
    /// suit la même piste logique. Retirer la piste courante arrête la
    /// lecture.
    pub async fn remove(&mut self, index: usize) -> Option<TrackEntry> {
        let (removed, change) = self.playlist.remove(index)?;

        if let Some(handle) = removed.handle() {
            self.handles.revoke(handle);
        }
        if removed.has_blob {
            self.forget_blob(&removed.id).await;
        }
        if change == SelectionChange::Cleared {
            self.stop_and_unload();
        }

        debug!(id = %removed.id, index, ?change, "Removed track");
        self.snapshot();
        Some(removed)
    }

    /// Vide la playlist
    ///
    /// L'appelant doit avoir obtenu une confirmation de l'utilisateur.
    pub async fn clear(&mut self) {
        let removed = self.playlist.drain();
        let mut forgotten = HashSet::new();

        for entry in &removed {
            if let Some(handle) = entry.handle() {
                self.handles.revoke(handle);
            }
            if entry.has_blob {
                self.forget_blob(&entry.id).await;
                forgotten.insert(entry.id.as_str());
            }
        }

        // Enregistrements résiduels (ajouts dont la piste n'a jamais été restaurée)
        match self.stores.blobs.ids(Collection::Files).await {
            Ok(ids) => {
                for id in ids.iter().filter(|id| !forgotten.contains(id.as_str())) {
                    self.forget_blob(id).await;
                }
            }
            Err(e) => warn!("Failed to list stored files: {}", e),
        }

        // Le vidage fait foi, y compris pour ce qui n'avait pas pu être relu
        self.pending.clear();
        self.playlist_unreadable = false;

        self.stop_and_unload();
        debug!(count = removed.len(), "Cleared playlist");
        self.snapshot();
    }

    /// Sélectionne et lance la piste à `index`
    pub fn select(&mut self, index: usize) -> Option<TrackEntry> {
        let entry = self.playlist.set_current(index)?.clone();

        self.surface.load(Some(entry.src()));
        self.surface.set_loop(self.settings.loop_track);
        self.start_playback();
        self.snapshot();
        Some(entry)
    }

    fn start_playback(&mut self) {
        match self.surface.play() {
            Ok(()) => self.paused = false,
            Err(e) => {
                warn!("{}", e);
                self.paused = true;
            }
        }
    }

    /// Piste suivante
    ///
    /// `automatic` indique une fin de piste naturelle : seule celle-ci
    /// déclenche le tirage aléatoire, et seule une demande manuelle en fin de
    /// playlist arrête la lecture.
    pub fn advance(&mut self, automatic: bool) {
        let modes = NavigationModes {
            loop_playlist: self.settings.loop_playlist,
            shuffle: self.settings.shuffle,
        };
        let decision = next_index(
            self.playlist.len(),
            self.playlist.current_index(),
            modes,
            automatic,
            &mut rand::rng(),
        );

        match decision {
            Advance::Select(index) => {
                self.select(index);
            }
            Advance::StopAndRewind => {
                self.surface.pause();
                self.surface.seek(0.0);
                self.paused = true;
            }
            Advance::Stay => {}
        }
    }

    /// Piste précédente (bouclage vers la fin seulement si la playlist boucle)
    pub fn retreat(&mut self) {
        if let Some(index) = previous_index(
            self.playlist.len(),
            self.playlist.current_index(),
            self.settings.loop_playlist,
        ) {
            self.select(index);
        }
    }

    /// Bascule lecture/pause ; sans source, lance la première piste
    pub fn play_pause(&mut self) {
        if self.surface.source().is_none() {
            if !self.playlist.is_empty() {
                self.select(0);
            }
            return;
        }
        if self.surface.is_paused() {
            self.start_playback();
        } else {
            self.surface.pause();
            self.paused = true;
        }
    }

    /// Reprend la piste courante depuis le début
    pub fn restart(&mut self) {
        self.surface.seek(0.0);
        self.start_playback();
    }

    /// Positionne la lecture à `permille` millièmes de la durée
    pub fn seek_fraction(&mut self, permille: u32) {
        match self.surface.duration() {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                let fraction = f64::from(permille.min(1000)) / 1000.0;
                self.surface.seek(fraction * duration);
            }
            _ => {}
        }
    }

    /// Règle le volume ; un volume nul coupe le son
    pub fn set_volume(&mut self, volume: f64) {
        let volume = clamp_volume(volume);
        self.settings.volume = volume;
        self.settings.muted = volume == 0.0;
        self.surface.set_volume(volume);
        self.surface.set_muted(self.settings.muted);
        self.snapshot();
    }

    pub fn toggle_mute(&mut self) {
        self.settings.muted = !self.settings.muted;
        self.surface.set_muted(self.settings.muted);
        self.snapshot();
    }

    pub fn toggle_loop_playlist(&mut self) {
        self.settings.loop_playlist = !self.settings.loop_playlist;
        self.snapshot();
    }

    pub fn toggle_shuffle(&mut self) {
        self.settings.shuffle = !self.settings.shuffle;
        self.snapshot();
    }

    /// Boucle sur la piste courante, appliquée immédiatement à la surface
    pub fn toggle_loop_track(&mut self) {
        self.settings.loop_track = !self.settings.loop_track;
        self.surface.set_loop(self.settings.loop_track);
        self.snapshot();
    }

    /// Traite un évènement de la surface de lecture
    pub fn handle_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Ended => self.advance(true),
            PlaybackEvent::Play => self.paused = false,
            PlaybackEvent::Pause => self.paused = true,
            // La vue de progression est recalculée à la demande
            PlaybackEvent::TimeUpdate | PlaybackEvent::LoadedMetadata => {}
        }
    }

    /// Soumission du formulaire d'ajout : fichiers d'abord, puis l'URL
    pub async fn submit(&mut self, files: Vec<LocalFile>, url: &str) -> SubmitOutcome {
        let url = url.trim();
        if files.is_empty() && url.is_empty() {
            return SubmitOutcome::Empty;
        }

        let mut added = 0;
        for file in files {
            self.add_local(file).await;
            added += 1;
        }
        if self.add_remote(url).is_some() {
            added += 1;
        }
        SubmitOutcome::Added(added)
    }

    /// Fichiers glissés-déposés : seuls l'audio et la vidéo sont retenus
    pub async fn drop_files(&mut self, files: Vec<LocalFile>) -> usize {
        let mut added = 0;
        for file in files.into_iter().filter(LocalFile::is_playable_media) {
            self.add_local(file).await;
            added += 1;
        }
        added
    }

    /// Libère tous les handles vivants (pistes et assets)
    ///
    /// Idempotent : un second appel ne révoque rien.
    pub fn teardown(&mut self) -> usize {
        let revoked = self.handles.revoke_all();
        if revoked > 0 {
            debug!(revoked, "Session torn down");
        }
        revoked
    }
}

impl<S: PlaybackSurface> Drop for Session<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
