//! PMOPlayer - pilote en ligne de commande d'une session de lecture
//!
//! Chaque invocation ouvre la session depuis les stores configurés,
//! applique une commande puis referme la session proprement.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pmoconfig::Config;
use pmoplayer::view::{playlist_count_label, file_selection_label};
use pmoplayer::{
    AudioArtMode, LocalFile, PlayerConfigExt, Session, SimulatedSurface, SubmitOutcome,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pmoplayer")]
#[command(about = "Media playlist controller with persistent local files")]
#[command(version)]
struct Args {
    /// Répertoire de configuration (sinon PMOPLAYER_CONFIG, puis .pmoplayer)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Affiche la playlist et les réglages
    List,
    /// Ajoute des fichiers locaux et/ou une URL
    Add {
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
        #[arg(short, long, default_value = "")]
        url: String,
    },
    /// Ajoute des fichiers en ne gardant que l'audio et la vidéo
    Drop { paths: Vec<PathBuf> },
    /// Retire la piste à l'index donné
    Remove { index: usize },
    /// Vide la playlist
    Clear {
        /// Confirme l'opération
        #[arg(long)]
        yes: bool,
    },
    /// Sélectionne une piste
    Select { index: usize },
    /// Règle le volume (0 à 1)
    Volume { value: f64 },
    Mute,
    LoopPlaylist,
    LoopTrack,
    Shuffle,
    /// Change l'image de fond (sans chemin : revient au fond par défaut)
    Background { path: Option<PathBuf> },
    /// Change la pochette audio (sans chemin : oublie la pochette)
    AudioArt { path: Option<PathBuf> },
    /// Source de la pochette audio : default, background ou custom
    AudioArtMode { mode: String },
}

fn load_config(dir: Option<&PathBuf>) -> Result<Arc<Config>> {
    match dir {
        Some(dir) => Ok(Arc::new(Config::load_config(&dir.to_string_lossy())?)),
        None => Ok(pmoconfig::get_config()),
    }
}

fn init_logging(config: &Config) -> Result<()> {
    if !config.get_log_enable_console()? {
        return Ok(());
    }
    let level = config.get_log_min_level()?.to_lowercase();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<LocalFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = LocalFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

fn print_playlist(session: &Session<SimulatedSurface>) {
    let playlist = session.playlist();
    println!("{}", playlist_count_label(playlist.len()));
    for (index, entry) in playlist.entries().iter().enumerate() {
        let marker = if playlist.current_index() == Some(index) { "*" } else { " " };
        let origin = if entry.has_blob { "local" } else { entry.src() };
        println!("{marker} {index:>3}  [{}] {}  ({origin})", entry.kind, entry.title);
    }

    let settings = session.settings();
    println!(
        "volume {:.2}{}  loop-playlist {}  shuffle {}  loop-track {}",
        settings.volume,
        if settings.muted { " (muted)" } else { "" },
        settings.loop_playlist,
        settings.shuffle,
        settings.loop_track,
    );
    println!(
        "background {:?}  audio-art {:?}",
        settings.background, settings.audio_art
    );
}

async fn run(session: &mut Session<SimulatedSurface>, command: Command) -> Result<()> {
    match command {
        Command::List => {}
        Command::Add { files, url } => {
            let files = read_files(&files).await?;
            info!("{}", file_selection_label(&files));
            if session.submit(files, &url).await == SubmitOutcome::Empty {
                bail!("Nothing to add: give --file and/or --url");
            }
        }
        Command::Drop { paths } => {
            let added = session.drop_files(read_files(&paths).await?).await;
            info!(added, "Dropped files added");
        }
        Command::Remove { index } => {
            if session.remove(index).await.is_none() {
                bail!("No track at index {}", index);
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("Clearing the playlist cannot be undone, pass --yes to confirm");
            }
            session.clear().await;
        }
        Command::Select { index } => {
            let entry = session
                .select(index)
                .with_context(|| format!("No track at index {}", index))?;
            println!("Playing {}", entry.title);
        }
        Command::Volume { value } => session.set_volume(value),
        Command::Mute => session.toggle_mute(),
        Command::LoopPlaylist => session.toggle_loop_playlist(),
        Command::LoopTrack => session.toggle_loop_track(),
        Command::Shuffle => session.toggle_shuffle(),
        Command::Background { path: Some(path) } => {
            let file = LocalFile::from_path(&path).await?;
            session.set_background_image(file.blob).await;
        }
        Command::Background { path: None } => session.reset_background().await,
        Command::AudioArt { path: Some(path) } => {
            let file = LocalFile::from_path(&path).await?;
            session.set_audio_art(file.blob).await;
        }
        Command::AudioArt { path: None } => session.reset_audio_art().await,
        Command::AudioArtMode { mode } => {
            let requested = AudioArtMode::parse(&mode)
                .with_context(|| format!("Unknown audio art mode {}", mode))?;
            let applied = session.set_audio_art_mode(requested).await;
            if applied != requested {
                println!("No stored audio art, falling back to {:?}", applied);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config_dir.as_ref())?;
    init_logging(&config)?;
    info!("Using config directory {}", config.config_dir().display());

    let stores = config.player_stores().context("Failed to open player stores")?;
    let mut session = Session::open(
        stores,
        SimulatedSurface::new(),
        config.player_session_options(),
    )
    .await;

    let outcome = run(&mut session, args.command).await;
    print_playlist(&session);
    session.teardown();
    outcome
}
