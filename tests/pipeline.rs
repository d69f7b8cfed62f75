//! End-to-end runs of `generate` against in-memory collaborators.

use anyhow::Result;
use async_trait::async_trait;
use ksm_autovideo::api::SpeechSynthesizer;
use ksm_autovideo::background::{BackgroundReference, BackgroundSelector, CuratedTable, VideoSearch};
use ksm_autovideo::config::Config;
use ksm_autovideo::error::GenerateError;
use ksm_autovideo::fetch::AssetFetch;
use ksm_autovideo::ffmpeg::MediaEncoder;
use ksm_autovideo::generator::{generate, Services};
use ksm_autovideo::overlay::BoxedText;
use ksm_autovideo::timeline::{
    AudioTrack, FrameSize, LayerKind, NarrationRequest, RenderOptions, RenderPlan,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SEARCH_HIT: &str = "https://videos.test/lean-office.mp4";

struct FakeSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, text: &str, _voice: &str, out_mp3_path: &Path) -> Result<()> {
        if self.fail {
            anyhow::bail!("voice service unreachable");
        }
        tokio::fs::write(out_mp3_path, text.as_bytes()).await?;
        Ok(())
    }
}

struct FixedSearch;

#[async_trait]
impl VideoSearch for FixedSearch {
    async fn search(&self, _query: &str) -> Option<BackgroundReference> {
        Some(BackgroundReference {
            source_url: SEARCH_HIT.to_string(),
            width_hint: 1920,
        })
    }
}

#[derive(Default)]
struct FakeFetcher {
    /// URLs containing any of these fail.
    failing: Vec<&'static str>,
    requested: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AssetFetch for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.failing.iter().any(|f| url.contains(f)) {
            anyhow::bail!("HTTP 404 for {url}");
        }
        Ok(b"media bytes".to_vec())
    }
}

/// Answers probes from the file name and records every plan it is asked to render.
#[derive(Default)]
struct FakeEncoder {
    narration_seconds: f64,
    background_seconds: f64,
    rendered: Arc<Mutex<Vec<RenderPlan>>>,
    inputs_present: Arc<Mutex<Vec<bool>>>,
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match name {
            "narration.mp3" => Ok(self.narration_seconds),
            "background.mp4" => Ok(self.background_seconds),
            other => anyhow::bail!("unexpected probe of {other}"),
        }
    }

    async fn frame_size(&self, _path: &Path) -> Result<FrameSize> {
        Ok(FrameSize {
            width: 1280,
            height: 720,
        })
    }

    async fn render(&self, plan: &RenderPlan) -> Result<PathBuf> {
        if let Some((video, _, audio)) = plan.base() {
            let present = video.is_file()
                && audio.narration().is_file()
                && audio.music().map_or(true, |m| m.source.is_file());
            self.inputs_present.lock().unwrap().push(present);
        }
        self.rendered.lock().unwrap().push(plan.clone());
        tokio::fs::write(plan.output_path(), b"mp4").await?;
        Ok(plan.output_path().to_path_buf())
    }
}

struct Harness {
    cfg: Config,
    services: Services,
    rendered: Arc<Mutex<Vec<RenderPlan>>>,
    inputs_present: Arc<Mutex<Vec<bool>>>,
    requested: Arc<Mutex<Vec<String>>>,
    _out: TempDir,
}

fn harness(speech_fails: bool, failing_urls: Vec<&'static str>) -> Harness {
    let out = tempfile::tempdir().unwrap();
    let cfg = Config {
        output_dir: Some(out.path().to_path_buf()),
        ..Config::default()
    };

    let encoder = FakeEncoder {
        narration_seconds: 20.0,
        background_seconds: 120.0,
        ..FakeEncoder::default()
    };
    let rendered = encoder.rendered.clone();
    let inputs_present = encoder.inputs_present.clone();

    let fetcher = FakeFetcher {
        failing: failing_urls,
        ..FakeFetcher::default()
    };
    let requested = fetcher.requested.clone();

    let services = Services {
        speech: Box::new(FakeSpeech { fail: speech_fails }),
        selector: BackgroundSelector::new(CuratedTable::default())
            .with_search(Box::new(FixedSearch)),
        fetcher: Box::new(fetcher),
        text: Box::new(BoxedText),
        encoder: Box::new(encoder),
    };

    Harness {
        cfg,
        services,
        rendered,
        inputs_present,
        requested,
        _out: out,
    }
}

fn request(title: &str) -> NarrationRequest {
    NarrationRequest {
        title: title.to_string(),
        body: "Lean manufacturing removes waste from every step of production. ".repeat(20),
        target_duration_seconds: 60,
        topic_hint: Some("lean factory".to_string()),
        voice_selector: String::new(),
    }
}

#[tokio::test]
async fn renders_full_plan_and_cleans_workspace() {
    let h = harness(false, vec![]);
    let req = request("Lean 101: Waste!");
    let out = generate(&h.cfg, &h.services, &req, &RenderOptions::default(), None)
        .await
        .unwrap();

    assert!(out.output_path.is_file());
    assert_eq!(out.output_path.file_name().unwrap().to_str(), Some("lean-101-waste.mp4"));
    assert_eq!(out.output_path.parent(), Some(h.cfg.output_dir().as_path()));

    let plan = &out.plan;
    assert!((plan.resolved_duration_seconds() - 30.0).abs() < 1e-9);
    assert_eq!(plan.layers()[0].kind(), LayerKind::BackgroundVideo);
    assert_eq!(plan.layers()[1].kind(), LayerKind::TitleCard);
    assert!(plan.layers()[2..].iter().all(|l| l.kind() == LayerKind::Caption));
    assert!(plan.layers().len() > 3);
    assert!(plan.skipped().is_empty());
    assert!(plan.layers().iter().all(|l| l.end_seconds() <= 30.0 + 1e-9));

    assert_eq!(h.rendered.lock().unwrap().len(), 1);
    assert_eq!(h.inputs_present.lock().unwrap().as_slice(), &[true]);
    assert!(h.requested.lock().unwrap().contains(&SEARCH_HIT.to_string()));

    // Intermediates are gone once the call returns.
    let (video, _, audio) = plan.base().unwrap();
    assert!(!video.exists());
    assert!(!audio.narration().exists());
    assert!(!video.parent().unwrap().exists());
}

#[tokio::test]
async fn bare_plan_has_only_the_base_layer() {
    let h = harness(false, vec![]);
    let options = RenderOptions {
        captions: false,
        title_card: false,
        music: false,
    };
    let out = generate(&h.cfg, &h.services, &request("Bare"), &options, None)
        .await
        .unwrap();

    assert_eq!(out.plan.layers().len(), 1);
    assert!(out.plan.skipped().is_empty());
    let (_, frame, audio) = out.plan.base().unwrap();
    assert_eq!(frame.width, 1280);
    assert!(matches!(audio, AudioTrack::Narration { .. }));
}

#[tokio::test]
async fn speech_failure_is_fatal_and_nothing_renders() {
    let h = harness(true, vec![]);
    let err = generate(&h.cfg, &h.services, &request("Lean"), &RenderOptions::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Speech(_)));
    assert!(err.to_string().contains("voice service unreachable"));
    assert!(h.rendered.lock().unwrap().is_empty());
    assert!(h.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn background_download_failure_is_fatal() {
    let h = harness(false, vec!["videos.test"]);
    let err = generate(&h.cfg, &h.services, &request("Lean"), &RenderOptions::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Background(_)));
    assert!(h.rendered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn music_failure_still_renders_without_music() {
    let h = harness(false, vec!["pixabay"]);
    let options = RenderOptions {
        music: true,
        ..RenderOptions::default()
    };
    let out = generate(&h.cfg, &h.services, &request("Lean"), &options, None)
        .await
        .unwrap();

    assert_eq!(out.plan.skipped().len(), 1);
    assert_eq!(out.plan.skipped()[0].kind, LayerKind::MusicBed);
    let (_, _, audio) = out.plan.base().unwrap();
    assert!(audio.music().is_none());
    assert_eq!(h.rendered.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn music_is_mixed_into_the_base_layer() {
    let h = harness(false, vec![]);
    let options = RenderOptions {
        music: true,
        ..RenderOptions::default()
    };
    let out = generate(&h.cfg, &h.services, &request("Lean"), &options, None)
        .await
        .unwrap();

    let (_, _, audio) = out.plan.base().unwrap();
    let music = audio.music().unwrap();
    assert!((music.volume - h.cfg.tuning.music_volume).abs() < 1e-9);
    assert!((music.duration_seconds - out.plan.resolved_duration_seconds()).abs() < 1e-9);
    assert_eq!(h.inputs_present.lock().unwrap().as_slice(), &[true]);
}

#[tokio::test]
async fn unreachable_remote_logo_is_skipped() {
    let h = harness(false, vec!["brand.test"]);
    let out = generate(
        &h.cfg,
        &h.services,
        &request("Lean"),
        &RenderOptions::default(),
        Some("https://brand.test/logo.png"),
    )
    .await
    .unwrap();

    assert!(out.plan.layers().iter().all(|l| l.kind() != LayerKind::Logo));
    assert_eq!(out.plan.skipped().len(), 1);
    assert_eq!(out.plan.skipped()[0].kind, LayerKind::Logo);
}

#[tokio::test]
async fn remote_logo_is_overlaid_after_the_title_card() {
    let h = harness(false, vec![]);
    let out = generate(
        &h.cfg,
        &h.services,
        &request("Lean"),
        &RenderOptions::default(),
        Some("https://brand.test/logo.png"),
    )
    .await
    .unwrap();

    let kinds: Vec<LayerKind> = out.plan.layers().iter().map(|l| l.kind()).collect();
    assert_eq!(&kinds[..3], &[LayerKind::BackgroundVideo, LayerKind::TitleCard, LayerKind::Logo]);
    assert!(out.plan.skipped().is_empty());
}

#[tokio::test]
async fn empty_title_is_rejected_before_any_work() {
    let h = harness(false, vec![]);
    let err = generate(&h.cfg, &h.services, &request("   "), &RenderOptions::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Precondition(_)));
    assert!(h.requested.lock().unwrap().is_empty());
    assert!(h.rendered.lock().unwrap().is_empty());
}
