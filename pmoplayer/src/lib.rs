//! # pmoplayer - Contrôleur de playlist média à persistance double
//!
//! Cette crate fournit le cœur d'un lecteur média mono-session :
//! - Playlist ordonnée de sources distantes (URL) ou locales (fichiers)
//! - Persistance à deux niveaux : documents JSON synchrones + store binaire
//!   asynchrone (SQLite)
//! - Handles éphémères révocables vers les blobs chargés en mémoire
//! - Restauration au démarrage avec réparation des incohérences
//!
//! # Architecture
//!
//! - **Session** : état possédé, coordonne les stores et la surface de lecture
//! - **Playlist** : séquence de [`TrackEntry`] et pointeur de sélection
//! - **HandleRegistry** : création et révocation des [`ObjectHandle`]
//! - **PlaybackSurface** : primitive de lecture fournie par l'hôte
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pmoplayer::{Session, SessionOptions, SimulatedSurface, Stores};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut session = Session::open(
//!     Stores::in_memory(),
//!     SimulatedSurface::new(),
//!     SessionOptions::default(),
//! )
//! .await;
//!
//! session.add_remote("https://example.com/music/Song%20One.mp3");
//! assert_eq!(session.playlist().current_index(), Some(0));
//!
//! session.advance(false);
//! session.teardown();
//! # }
//! ```

mod blob;
mod error;
mod handle;
mod session;
mod settings;
mod track;

pub mod persistence;
pub mod playlist;
pub mod surface;
pub mod view;

#[cfg(feature = "pmoconfig")]
mod config_ext;

// Réexports publics
pub use blob::{guess_content_type, AssetKey, Blob, LocalFile};
pub use error::{Error, Result};
pub use handle::{HandleRegistry, ObjectHandle};
pub use persistence::blob::{BinaryStore, BlobStore, Collection, MemoryBlobStore, SqliteBlobStore};
pub use persistence::{FileScalarStore, MemoryScalarStore, ScalarStore};
pub use playlist::Playlist;
pub use session::{Session, SessionOptions, Stores, SubmitOutcome};
pub use settings::{AudioArtMode, BackgroundMode, Settings};
pub use surface::{PlaybackEvent, PlaybackSurface, SimulatedSurface};
pub use track::{derive_title_from_source, detect_kind, MediaKind, TrackEntry, TrackSource};

#[cfg(feature = "pmoconfig")]
pub use config_ext::PlayerConfigExt;
