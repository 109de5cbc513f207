//! Registre des handles éphémères (object URLs)
//!
//! Un [`ObjectHandle`] est une référence révocable vers un [`Blob`] chargé en
//! mémoire, utilisable comme adresse de lecture. Seul le [`HandleRegistry`]
//! peut en créer. Les handles des pistes vivent dans un ensemble général ;
//! l'image de fond et la pochette audio occupent chacune un emplacement
//! unique.

use crate::blob::{AssetKey, Blob};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

const HANDLE_SCHEME: &str = "blob:pmoplayer/";

/// Handle opaque vers un blob en mémoire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    fn mint() -> Self {
        Self(format!("{}{}", HANDLE_SCHEME, uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Slot {
    handle: ObjectHandle,
    blob: Blob,
}

/// Registre des handles vivants
///
/// Chaque handle créé est révoqué au plus une fois ; révoquer un handle
/// inconnu ou déjà révoqué ne fait rien.
#[derive(Default)]
pub struct HandleRegistry {
    live: HashMap<ObjectHandle, Blob>,
    background: Option<Slot>,
    audio_art: Option<Slot>,
    minted: u64,
    revoked: u64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crée et enregistre un handle pour une piste
    pub fn mint(&mut self, blob: Blob) -> ObjectHandle {
        let handle = ObjectHandle::mint();
        debug!(handle = %handle, size = blob.len(), "Minted track handle");
        self.live.insert(handle.clone(), blob);
        self.minted += 1;
        handle
    }

    /// Révoque un handle de piste (retourne true s'il était vivant)
    pub fn revoke(&mut self, handle: &ObjectHandle) -> bool {
        if self.live.remove(handle).is_some() {
            debug!(handle = %handle, "Revoked track handle");
            self.revoked += 1;
            true
        } else {
            false
        }
    }

    fn slot_mut(&mut self, key: AssetKey) -> &mut Option<Slot> {
        match key {
            AssetKey::BackgroundImage => &mut self.background,
            AssetKey::AudioArt => &mut self.audio_art,
        }
    }

    fn slot_ref(&self, key: AssetKey) -> Option<&Slot> {
        match key {
            AssetKey::BackgroundImage => self.background.as_ref(),
            AssetKey::AudioArt => self.audio_art.as_ref(),
        }
    }

    /// Remplace le handle d'un asset singleton
    ///
    /// L'ancien handle de l'emplacement est révoqué avant la création du
    /// nouveau.
    pub fn mint_asset(&mut self, key: AssetKey, blob: Blob) -> ObjectHandle {
        self.revoke_asset(key);
        let handle = ObjectHandle::mint();
        debug!(asset = %key, handle = %handle, "Minted asset handle");
        *self.slot_mut(key) = Some(Slot {
            handle: handle.clone(),
            blob,
        });
        self.minted += 1;
        handle
    }

    /// Libère l'emplacement d'un asset (retourne true s'il était occupé)
    pub fn revoke_asset(&mut self, key: AssetKey) -> bool {
        match self.slot_mut(key).take() {
            Some(slot) => {
                debug!(asset = %key, handle = %slot.handle, "Revoked asset handle");
                self.revoked += 1;
                true
            }
            None => false,
        }
    }

    /// Handle courant d'un asset
    pub fn asset(&self, key: AssetKey) -> Option<&ObjectHandle> {
        self.slot_ref(key).map(|slot| &slot.handle)
    }

    /// Résout un handle vivant (piste ou asset) vers son contenu
    pub fn resolve(&self, handle: &ObjectHandle) -> Option<&Blob> {
        if let Some(blob) = self.live.get(handle) {
            return Some(blob);
        }
        AssetKey::ALL
            .iter()
            .filter_map(|key| self.slot_ref(*key))
            .find(|slot| &slot.handle == handle)
            .map(|slot| &slot.blob)
    }

    pub fn is_live(&self, handle: &ObjectHandle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Nombre de handles de pistes vivants (hors assets)
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn minted_count(&self) -> u64 {
        self.minted
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked
    }

    /// Révoque tous les handles (pistes et assets), retourne le nombre libéré
    pub fn revoke_all(&mut self) -> usize {
        let tracks = self.live.len();
        self.live.clear();
        self.revoked += tracks as u64;

        let assets = AssetKey::ALL
            .iter()
            .filter(|key| self.revoke_asset(**key))
            .count();

        if tracks + assets > 0 {
            debug!(tracks, assets, "Revoked all live handles");
        }
        tracks + assets
    }
}
