//! TrackEntry : une entrée de la playlist
//!
//! La source d'une piste est soit une URL distante stable, soit un
//! [`ObjectHandle`] éphémère vers un blob local. Le type et le titre sont
//! déduits à l'ajout puis ne changent plus.

use crate::handle::ObjectHandle;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Titre utilisé quand aucune source ne permet d'en déduire un
pub const UNTITLED_TRACK: &str = "Untitled Track";

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac", "aac"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "mov"];

/// Nature du média
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    #[serde(other)]
    Media,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Media => "media",
        }
    }
}

impl Default for MediaKind {
    fn default() -> Self {
        MediaKind::Media
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adresse résolvable par la surface de lecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    Remote(String),
    Handle(ObjectHandle),
}

impl TrackSource {
    pub fn as_str(&self) -> &str {
        match self {
            TrackSource::Remote(url) => url,
            TrackSource::Handle(handle) => handle.as_str(),
        }
    }
}

/// Une piste chargée en mémoire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    /// Le contenu binaire est stocké dans le store binaire sous `id`
    pub has_blob: bool,
    source: TrackSource,
}

impl TrackEntry {
    pub(crate) fn remote(id: String, url: String) -> Self {
        Self {
            title: derive_title_from_source(&url),
            kind: detect_kind(&url, None),
            id,
            has_blob: false,
            source: TrackSource::Remote(url),
        }
    }

    pub(crate) fn with_handle(
        id: String,
        title: String,
        kind: MediaKind,
        handle: ObjectHandle,
    ) -> Self {
        Self {
            id,
            title,
            kind,
            has_blob: true,
            source: TrackSource::Handle(handle),
        }
    }

    /// Reconstruit une entrée distante depuis le document persistant
    pub(crate) fn restored_remote(id: String, title: String, kind: MediaKind, url: String) -> Self {
        Self {
            id,
            title,
            kind,
            has_blob: false,
            source: TrackSource::Remote(url),
        }
    }

    pub fn src(&self) -> &str {
        self.source.as_str()
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    /// Handle à révoquer quand l'entrée quitte la mémoire
    pub fn handle(&self) -> Option<&ObjectHandle> {
        match &self.source {
            TrackSource::Handle(handle) => Some(handle),
            TrackSource::Remote(_) => None,
        }
    }

    pub fn is_handle_backed(&self) -> bool {
        self.handle().is_some()
    }
}

/// Déduit le type de média depuis le type MIME, sinon l'extension
///
/// `src` peut être une URL ou un nom de fichier ; la requête et le fragment
/// sont ignorés.
pub fn detect_kind(src: &str, content_type: Option<&str>) -> MediaKind {
    if let Some(mime) = content_type.filter(|t| !t.is_empty()) {
        if mime.starts_with("audio") {
            return MediaKind::Audio;
        }
        if mime.starts_with("video") {
            return MediaKind::Video;
        }
    }

    let without_query = src.split('?').next().unwrap_or_default();
    let path = without_query.split('#').next().unwrap_or_default();
    let extension = path.rsplit('.').next().unwrap_or_default().to_lowercase();

    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Audio
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Media
    }
}

/// Déduit un titre lisible depuis une URL ou un chemin
///
/// URL absolue : dernier segment non vide décodé, sinon l'hôte. Chaîne non
/// analysable : dernier morceau non vide après découpe sur `/`, décodé,
/// sinon la chaîne brute.
pub fn derive_title_from_source(src: &str) -> String {
    if src.is_empty() {
        return UNTITLED_TRACK.to_string();
    }

    match Url::parse(src) {
        Ok(parsed) => {
            let last_segment = parsed
                .path()
                .split('/')
                .filter(|segment| !segment.is_empty())
                .last();
            match last_segment.or(parsed.host_str()) {
                Some(raw) if !raw.is_empty() => decode_component(raw),
                _ => UNTITLED_TRACK.to_string(),
            }
        }
        Err(_) => match src.split('/').filter(|part| !part.is_empty()).last() {
            Some(part) => decode_component(part),
            None => src.to_string(),
        },
    }
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
