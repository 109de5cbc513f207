//! Contenu binaire manipulé par le lecteur (fichiers média, images)

use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// Contenu binaire opaque accompagné de son type MIME éventuel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Fichier local fourni par l'utilisateur (sélection ou glisser-déposer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub blob: Blob,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, blob: Blob) -> Self {
        Self {
            name: name.into(),
            blob,
        }
    }

    /// Lit un fichier du disque, le type MIME est déduit de l'extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = guess_content_type(&name).map(str::to_string);
        Ok(Self::new(name, Blob::new(data, content_type)))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.blob.content_type.as_deref()
    }

    /// Vrai pour les types `audio/*` et `video/*`
    pub fn is_playable_media(&self) -> bool {
        self.content_type()
            .map(|t| t.starts_with("audio/") || t.starts_with("video/"))
            .unwrap_or(false)
    }
}

/// Devine un type MIME à partir de l'extension d'un nom de fichier
pub fn guess_content_type(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}

/// Clés fixes des deux assets singletons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    BackgroundImage,
    AudioArt,
}

impl AssetKey {
    pub const ALL: [AssetKey; 2] = [AssetKey::BackgroundImage, AssetKey::AudioArt];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKey::BackgroundImage => "background-image",
            AssetKey::AudioArt => "audio-art",
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
