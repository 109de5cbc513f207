//! Frontière avec la primitive de lecture de l'hôte
//!
//! Le décodage et le rendu sont délégués à l'hôte. Le cœur ne fait que
//! positionner la source et le bouclage, piloter lecture/pause/position et
//! relire le temps courant et la durée.

use crate::{Error, Result};

/// Évènements émis par la surface de lecture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Play,
    Pause,
    /// Fin naturelle de la piste
    Ended,
    TimeUpdate,
    LoadedMetadata,
}

/// Primitive de lecture pilotée par la session
pub trait PlaybackSurface {
    /// Positionne la source (`None` : retire la source) puis recharge
    fn load(&mut self, src: Option<&str>);
    fn set_loop(&mut self, enabled: bool);
    /// Démarre la lecture ; l'hôte peut refuser (politique d'autoplay)
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);

    fn source(&self) -> Option<&str>;
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    /// Durée connue de la source courante
    fn duration(&self) -> Option<f64>;
}

/// Surface simulée : mémorise les commandes reçues
///
/// Sert de double de test et de surface pour le binaire en ligne de
/// commande.
#[derive(Debug, Clone)]
pub struct SimulatedSurface {
    src: Option<String>,
    looping: bool,
    paused: bool,
    current_time: f64,
    duration: Option<f64>,
    volume: f64,
    muted: bool,
    autoplay_allowed: bool,
    loads: usize,
}

impl Default for SimulatedSurface {
    fn default() -> Self {
        Self {
            src: None,
            looping: false,
            paused: true,
            current_time: 0.0,
            duration: None,
            volume: 1.0,
            muted: false,
            autoplay_allowed: true,
            loads: 0,
        }
    }
}

impl SimulatedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simule un hôte qui refuse la lecture automatique
    pub fn with_autoplay_blocked() -> Self {
        Self {
            autoplay_allowed: false,
            ..Self::default()
        }
    }

    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration;
    }

    /// Avance la tête de lecture (bornée par la durée si connue)
    pub fn advance_time(&mut self, seconds: f64) {
        let next = self.current_time + seconds;
        self.current_time = match self.duration {
            Some(duration) => next.min(duration),
            None => next,
        };
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Nombre d'appels à `load`
    pub fn load_count(&self) -> usize {
        self.loads
    }
}

impl PlaybackSurface for SimulatedSurface {
    fn load(&mut self, src: Option<&str>) {
        self.src = src.map(str::to_string);
        self.current_time = 0.0;
        self.duration = None;
        self.paused = true;
        self.loads += 1;
    }

    fn set_loop(&mut self, enabled: bool) {
        self.looping = enabled;
    }

    fn play(&mut self) -> Result<()> {
        if self.src.is_none() {
            return Err(Error::PlaybackRejected("no source".into()));
        }
        if !self.autoplay_allowed {
            return Err(Error::PlaybackRejected("autoplay blocked".into()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn seek(&mut self, seconds: f64) {
        self.current_time = seconds.max(0.0);
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }
}
