//! Préférences utilisateur et document de réglages persistant

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_VOLUME: f64 = 1.0;

/// Mode d'arrière-plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    #[default]
    Default,
    Image,
}

/// Source de la pochette affichée pour les pistes audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioArtMode {
    #[default]
    Default,
    Background,
    Custom,
}

impl AudioArtMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(AudioArtMode::Default),
            "background" => Some(AudioArtMode::Background),
            "custom" => Some(AudioArtMode::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackgroundSettings {
    pub mode: BackgroundMode,
}

/// Préférences courantes
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub loop_playlist: bool,
    pub shuffle: bool,
    pub loop_track: bool,
    pub volume: f64,
    pub muted: bool,
    pub background: BackgroundMode,
    pub audio_art: AudioArtMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loop_playlist: false,
            shuffle: false,
            loop_track: false,
            volume: DEFAULT_VOLUME,
            muted: false,
            background: BackgroundMode::Default,
            audio_art: AudioArtMode::Default,
        }
    }
}

/// Forme sérialisée des réglages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub loop_playlist: bool,
    pub shuffle_mode: bool,
    #[serde(default)]
    pub loop_track: bool,
    pub volume: f64,
    pub muted: bool,
    pub background_settings: BackgroundSettings,
    pub audio_art_mode: AudioArtMode,
}

impl From<&Settings> for SettingsDocument {
    fn from(settings: &Settings) -> Self {
        Self {
            loop_playlist: settings.loop_playlist,
            shuffle_mode: settings.shuffle,
            loop_track: settings.loop_track,
            volume: settings.volume,
            muted: settings.muted,
            background_settings: BackgroundSettings {
                mode: settings.background,
            },
            audio_art_mode: settings.audio_art,
        }
    }
}

impl Settings {
    /// Lecture tolérante d'un document de réglages
    ///
    /// Chaque champ est lu indépendamment : un champ absent ou mal typé prend
    /// sa valeur par défaut sans invalider le reste du document.
    pub fn from_document(document: &Value) -> Self {
        let field = |name: &str| document.get(name).unwrap_or(&Value::Null);

        let background = match field("backgroundSettings").get("mode").and_then(Value::as_str) {
            Some("image") => BackgroundMode::Image,
            _ => BackgroundMode::Default,
        };

        let audio_art = field("audioArtMode")
            .as_str()
            .and_then(AudioArtMode::parse)
            .unwrap_or_default();

        Self {
            loop_playlist: is_truthy(field("loopPlaylist")),
            shuffle: is_truthy(field("shuffleMode")),
            loop_track: is_truthy(field("loopTrack")),
            volume: sanitize_volume(field("volume")),
            muted: is_truthy(field("muted")),
            background,
            audio_art,
        }
    }

    pub fn to_document(&self) -> SettingsDocument {
        SettingsDocument::from(self)
    }
}

/// Volume persistant : un nombre fini dans `[0, 1]`, sinon 1
pub fn sanitize_volume(value: &Value) -> f64 {
    match value.as_f64() {
        Some(volume) if (0.0..=1.0).contains(&volume) => volume,
        _ => DEFAULT_VOLUME,
    }
}

/// Ramène un volume demandé dans `[0, 1]`
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        DEFAULT_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
