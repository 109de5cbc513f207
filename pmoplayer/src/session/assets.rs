//! Assets singletons : image de fond et pochette audio

use super::Session;
use crate::blob::{AssetKey, Blob};
use crate::handle::ObjectHandle;
use crate::persistence::blob::Collection;
use crate::settings::{AudioArtMode, BackgroundMode};
use crate::surface::PlaybackSurface;
use crate::Error;
use tracing::{debug, warn};

/// Résultat de la relecture d'un asset persistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AssetReload {
    Loaded,
    /// Aucun enregistrement : l'asset a disparu
    Missing,
    /// Le store a échoué, l'enregistrement existe peut-être toujours
    Unreadable,
}

impl<S: PlaybackSurface> Session<S> {
    /// Handle courant de l'image de fond
    pub fn background_handle(&self) -> Option<&ObjectHandle> {
        self.handles.asset(AssetKey::BackgroundImage)
    }

    /// Handle courant de la pochette personnalisée
    pub fn audio_art_handle(&self) -> Option<&ObjectHandle> {
        self.handles.asset(AssetKey::AudioArt)
    }

    /// Relit un asset persistant et lui associe un nouveau handle
    pub(super) async fn reload_asset(&mut self, key: AssetKey) -> AssetReload {
        match self.stores.blobs.get(Collection::Assets, key.as_str()).await {
            Ok(Some(blob)) => {
                self.handles.mint_asset(key, blob);
                AssetReload::Loaded
            }
            Ok(None) => {
                debug!("{}", Error::RecordNotFound(key.to_string()));
                AssetReload::Missing
            }
            Err(e) => {
                warn!(asset = %key, "Failed to read asset: {}", e);
                AssetReload::Unreadable
            }
        }
    }

    pub(super) async fn forget_asset(&self, key: AssetKey) {
        if let Err(e) = self.stores.blobs.delete(Collection::Assets, key.as_str()).await {
            let err = Error::DeleteFailure {
                id: key.to_string(),
                reason: e.to_string(),
            };
            warn!("{}", err);
        }
    }

    async fn store_asset(&mut self, key: AssetKey, blob: Blob) -> ObjectHandle {
        if let Err(e) = self.stores.blobs.put(Collection::Assets, key.as_str(), &blob).await {
            warn!(asset = %key, "Failed to persist asset: {}", e);
        }
        self.handles.mint_asset(key, blob)
    }

    /// Remplace l'image de fond et passe en mode image
    pub async fn set_background_image(&mut self, blob: Blob) -> ObjectHandle {
        let handle = self.store_asset(AssetKey::BackgroundImage, blob).await;
        self.settings.background = BackgroundMode::Image;
        self.snapshot();
        handle
    }

    /// Revient au fond par défaut et oublie l'image
    pub async fn reset_background(&mut self) {
        self.settings.background = BackgroundMode::Default;
        self.handles.revoke_asset(AssetKey::BackgroundImage);
        self.forget_asset(AssetKey::BackgroundImage).await;
        self.snapshot();
    }

    /// Change la source de la pochette audio
    ///
    /// Passer en mode personnalisé sans pochette en mémoire relit l'asset
    /// persistant ; s'il n'existe pas, le mode retombe sur `Default`.
    pub async fn set_audio_art_mode(&mut self, mode: AudioArtMode) -> AudioArtMode {
        self.settings.audio_art = mode;
        if mode == AudioArtMode::Custom
            && self.audio_art_handle().is_none()
            && self.reload_asset(AssetKey::AudioArt).await != AssetReload::Loaded
        {
            self.settings.audio_art = AudioArtMode::Default;
        }
        self.snapshot();
        self.settings.audio_art
    }

    /// Remplace la pochette personnalisée et passe en mode personnalisé
    pub async fn set_audio_art(&mut self, blob: Blob) -> ObjectHandle {
        let handle = self.store_asset(AssetKey::AudioArt, blob).await;
        self.settings.audio_art = AudioArtMode::Custom;
        self.snapshot();
        handle
    }

    /// Oublie la pochette personnalisée
    pub async fn reset_audio_art(&mut self) {
        self.handles.revoke_asset(AssetKey::AudioArt);
        self.forget_asset(AssetKey::AudioArt).await;
        if self.settings.audio_art == AudioArtMode::Custom {
            self.settings.audio_art = AudioArtMode::Default;
        }
        self.snapshot();
    }
}
