//! Aides de présentation (sans rendu)
//!
//! Valeurs calculées à partir de l'état de la session, consommées par la
//! couche d'affichage de l'hôte.

use crate::blob::LocalFile;
use crate::handle::ObjectHandle;
use crate::session::Session;
use crate::settings::AudioArtMode;
use crate::surface::PlaybackSurface;
use crate::track::MediaKind;

/// Formate une durée en `MM:SS` (`00:00` si la valeur n'est pas finie)
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "00:00".to_string();
    }
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Libellé du compteur de pistes
pub fn playlist_count_label(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

/// Libellé de la sélection de fichiers du formulaire d'ajout
pub fn file_selection_label(files: &[LocalFile]) -> String {
    match files {
        [] => "No files selected".to_string(),
        [file] => file.name.clone(),
        _ => format!("{} files selected", files.len()),
    }
}

/// Contenu de la zone média
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSurfaceView {
    /// Aucune piste sélectionnée
    Placeholder,
    Video,
    /// Piste audio : pochette éventuelle
    AudioCover { art: Option<ObjectHandle> },
}

/// Progression de la lecture
#[derive(Debug, Clone, PartialEq)]
pub struct TimingView {
    pub current: String,
    pub duration: String,
    pub progress_permille: u32,
}

impl<S: PlaybackSurface> Session<S> {
    /// Ce que la zone média doit afficher
    pub fn media_view(&self) -> MediaSurfaceView {
        let Some(current) = self.playlist().current() else {
            return MediaSurfaceView::Placeholder;
        };
        if current.kind != MediaKind::Audio {
            return MediaSurfaceView::Video;
        }

        let art = match self.settings().audio_art {
            AudioArtMode::Background => self.background_handle().cloned(),
            AudioArtMode::Custom => self.audio_art_handle().cloned(),
            AudioArtMode::Default => None,
        };
        MediaSurfaceView::AudioCover { art }
    }

    /// Temps écoulé, durée et position de la barre (`None` sans durée)
    pub fn timing_view(&self) -> Option<TimingView> {
        let duration = self.surface().duration().filter(|d| d.is_finite() && *d > 0.0)?;
        let current = self.surface().current_time();
        let progress = (current / duration * 1000.0).clamp(0.0, 1000.0);

        Some(TimingView {
            current: format_time(current),
            duration: format_time(duration),
            progress_permille: progress.round() as u32,
        })
    }
}
