//! Tests des assets (fond, pochette) et des vues dérivées

use pmoplayer::view::{MediaSurfaceView, TimingView};
use pmoplayer::{
    AudioArtMode, BackgroundMode, Blob, Collection, Session, SessionOptions, SimulatedSurface,
    Stores,
};

fn image(byte: u8) -> Blob {
    Blob::new(vec![byte; 8], Some("image/png".into()))
}

async fn open(stores: &Stores) -> Session<SimulatedSurface> {
    Session::open(stores.clone(), SimulatedSurface::new(), SessionOptions::default()).await
}

#[tokio::test]
async fn test_background_replace_and_reset() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    let mut session = open(&stores).await;

    let first = session.set_background_image(image(1)).await;
    assert_eq!(session.settings().background, BackgroundMode::Image);
    assert_eq!(session.background_handle(), Some(&first));

    let second = session.set_background_image(image(2)).await;
    assert!(!session.handles().is_live(&first));
    assert!(session.handles().is_live(&second));
    assert_eq!(
        stores.blobs.get(Collection::Assets, "background-image").await?,
        Some(image(2))
    );

    session.reset_background().await;
    assert_eq!(session.settings().background, BackgroundMode::Default);
    assert!(session.background_handle().is_none());
    assert!(!session.handles().is_live(&second));
    assert_eq!(stores.blobs.get(Collection::Assets, "background-image").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_custom_art_mode_without_asset_falls_back() {
    let mut session = open(&Stores::in_memory()).await;

    let mode = session.set_audio_art_mode(AudioArtMode::Custom).await;
    assert_eq!(mode, AudioArtMode::Default);
    assert_eq!(session.settings().audio_art, AudioArtMode::Default);

    let mode = session.set_audio_art_mode(AudioArtMode::Background).await;
    assert_eq!(mode, AudioArtMode::Background);
}

#[tokio::test]
async fn test_custom_art_mode_reloads_stored_asset() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    stores.blobs.put(Collection::Assets, "audio-art", &image(7)).await?;
    let mut session = open(&stores).await;
    assert!(session.audio_art_handle().is_none());

    let mode = session.set_audio_art_mode(AudioArtMode::Custom).await;

    assert_eq!(mode, AudioArtMode::Custom);
    let handle = session.audio_art_handle().expect("art handle");
    assert_eq!(session.handles().resolve(handle), Some(&image(7)));
    Ok(())
}

#[tokio::test]
async fn test_audio_art_set_and_reset() -> anyhow::Result<()> {
    let stores = Stores::in_memory();
    let mut session = open(&stores).await;

    let handle = session.set_audio_art(image(3)).await;
    assert_eq!(session.settings().audio_art, AudioArtMode::Custom);

    // Le handle en mémoire est conservé quand on revient au mode personnalisé
    session.set_audio_art_mode(AudioArtMode::Default).await;
    session.set_audio_art_mode(AudioArtMode::Custom).await;
    assert_eq!(session.audio_art_handle(), Some(&handle));

    session.reset_audio_art().await;
    assert_eq!(session.settings().audio_art, AudioArtMode::Default);
    assert!(!session.handles().is_live(&handle));
    assert!(stores.blobs.ids(Collection::Assets).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reset_audio_art_keeps_background_mode() {
    let mut session = open(&Stores::in_memory()).await;
    session.set_audio_art_mode(AudioArtMode::Background).await;

    session.reset_audio_art().await;
    assert_eq!(session.settings().audio_art, AudioArtMode::Background);
}

#[tokio::test]
async fn test_media_view() {
    let mut session = open(&Stores::in_memory()).await;
    assert_eq!(session.media_view(), MediaSurfaceView::Placeholder);

    session.add_remote("https://ex.com/clip.mp4");
    assert_eq!(session.media_view(), MediaSurfaceView::Video);

    session.add_remote("https://ex.com/song.mp3");
    session.select(1);
    assert_eq!(session.media_view(), MediaSurfaceView::AudioCover { art: None });

    let background = session.set_background_image(image(1)).await;
    session.set_audio_art_mode(AudioArtMode::Background).await;
    assert_eq!(
        session.media_view(),
        MediaSurfaceView::AudioCover {
            art: Some(background)
        }
    );

    let art = session.set_audio_art(image(2)).await;
    assert_eq!(
        session.media_view(),
        MediaSurfaceView::AudioCover { art: Some(art) }
    );

    // Flux sans extension reconnue : affiché comme une vidéo
    session.add_remote("https://ex.com/live");
    session.select(2);
    assert_eq!(session.media_view(), MediaSurfaceView::Video);
}

#[tokio::test]
async fn test_timing_view() {
    let mut session = open(&Stores::in_memory()).await;
    session.add_remote("https://ex.com/song.mp3");
    assert_eq!(session.timing_view(), None);

    session.surface_mut().set_duration(Some(200.0));
    session.surface_mut().advance_time(50.0);

    assert_eq!(
        session.timing_view(),
        Some(TimingView {
            current: "00:50".into(),
            duration: "03:20".into(),
            progress_permille: 250,
        })
    );
}
