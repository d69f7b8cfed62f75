use crate::api::{self, SpeechSynthesizer};
use crate::background::BackgroundSelector;
use crate::config::Config;
use crate::error::{GenerateError, Result};
use crate::estimate::DurationEstimator;
use crate::fetch::{self, AssetFetch, HttpFetcher};
use crate::ffmpeg::{Ffmpeg, MediaEncoder};
use crate::overlay::{self, TextRenderer};
use crate::timeline::{
    LayerKind, LayerOutcome, NarrationRequest, PlanAssets, RenderOptions, RenderPlan,
    SourceDurations, TimelineCompiler,
};
use crate::{logi, logok, logw};
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_AGENT: &str = concat!("ksm-autovideo/", env!("CARGO_PKG_VERSION"));

/// The external collaborators one request talks to.
pub struct Services {
    pub speech: Box<dyn SpeechSynthesizer>,
    pub selector: BackgroundSelector,
    pub fetcher: Box<dyn AssetFetch>,
    pub text: Box<dyn TextRenderer>,
    pub encoder: Box<dyn MediaEncoder>,
}

impl Services {
    /// Wires the real HTTP, TTS and ffmpeg collaborators. Fails before any
    /// network traffic if a required credential is missing.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|err| {
                GenerateError::Precondition(format!("Failed to build HTTP client: {err}"))
            })?;

        let speech = api::speech_for(cfg, client.clone())?;
        let mut selector = BackgroundSelector::new(cfg.curated_backgrounds.clone());
        if let Some(search) = api::search_for(cfg, client.clone()) {
            selector = selector.with_search(search);
        } else {
            logi("No Pexels key configured; using curated backgrounds.");
        }

        Ok(Self {
            speech,
            selector,
            fetcher: Box::new(HttpFetcher::new(client)),
            text: overlay::renderer_for(cfg.caption_style),
            encoder: Box::new(Ffmpeg::new(cfg.font_file.clone())),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOutput {
    pub output_path: PathBuf,
    pub plan: RenderPlan,
}

/// Renders one request end to end.
///
/// Every intermediate file lives in a temp directory owned by this call and
/// removed when it returns, whichever way it returns.
pub async fn generate(
    cfg: &Config,
    services: &Services,
    request: &NarrationRequest,
    options: &RenderOptions,
    logo: Option<&str>,
) -> Result<GenerateOutput> {
    request.check()?;

    let estimator = DurationEstimator::new(cfg.tuning.words_per_second);
    let narration = estimator.trim(&request.body, request.target_duration_seconds);
    let original_words = request.body.split_whitespace().count();
    if narration.word_count() < original_words {
        logw(format!(
            "Trimmed narration from {} to {} words to fit {}s",
            original_words,
            narration.word_count(),
            request.target_duration_seconds
        ));
    }
    logi(format!(
        "Narration: {} words, about {:.0}s spoken",
        narration.word_count(),
        narration.estimated_duration_seconds
    ));

    let workspace = tempfile::Builder::new().prefix("ksm-autovideo-").tempdir()?;
    let work = workspace.path();

    let narration_mp3 = work.join("narration.mp3");
    logi(format!("Generating voice with {}...", services.speech.name()));
    services
        .speech
        .synthesize(&narration.text, &request.voice_selector, &narration_mp3)
        .await
        .map_err(GenerateError::Speech)?;
    logok(format!("Narration audio: {}", narration_mp3.display()));

    let background = services
        .selector
        .pick_background(&request.title, &request.body, request.topic_hint())
        .await;
    let background_mp4 = work.join("background.mp4");
    logi(format!("Downloading background: {}", background.source_url));
    fetch::fetch_to_file(services.fetcher.as_ref(), &background.source_url, &background_mp4)
        .await
        .map_err(GenerateError::Background)?;
    logok("Background downloaded.");

    let narration_seconds = services
        .encoder
        .duration_seconds(&narration_mp3)
        .await
        .map_err(GenerateError::Probe)?;
    let background_seconds = services
        .encoder
        .duration_seconds(&background_mp4)
        .await
        .map_err(GenerateError::Probe)?;
    let frame = services
        .encoder
        .frame_size(&background_mp4)
        .await
        .map_err(GenerateError::Probe)?;

    let logo = match logo.map(str::trim).filter(|l| !l.is_empty()) {
        Some(location) => Some(prepare_logo(services.fetcher.as_ref(), location, work).await),
        None => None,
    };
    let music = if options.music {
        Some(prepare_music(services.fetcher.as_ref(), &cfg.music_url, work).await)
    } else {
        None
    };

    let compiler = TimelineCompiler::new(services.text.as_ref(), &cfg.tuning, cfg.output_dir());
    let plan = compiler.build_plan(
        request,
        options,
        &narration,
        SourceDurations {
            narration_audio_seconds: narration_seconds,
            background_video_seconds: background_seconds,
        },
        PlanAssets {
            narration_audio: narration_mp3,
            background_video: background_mp4,
            frame,
            logo,
            music,
        },
    );
    logi(format!(
        "Plan: {} layer(s) over {:.2}s, {} skipped",
        plan.layers().len(),
        plan.resolved_duration_seconds(),
        plan.skipped().len()
    ));

    let output_path = services
        .encoder
        .render(&plan)
        .await
        .map_err(GenerateError::Render)?;
    logok(format!("Video ready: {}", output_path.display()));

    drop(workspace);
    Ok(GenerateOutput { output_path, plan })
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

async fn prepare_logo(
    fetcher: &dyn AssetFetch,
    location: &str,
    work: &Path,
) -> LayerOutcome<PathBuf> {
    if !fetch::is_remote(location) {
        return LayerOutcome::Added(PathBuf::from(location));
    }
    let ext = extension_from_url(location).unwrap_or_else(|| "png".to_string());
    let dest = work.join(format!("logo.{ext}"));
    match fetch::fetch_to_file(fetcher, location, &dest).await {
        Ok(()) => LayerOutcome::Added(dest),
        Err(err) => {
            LayerOutcome::skipped(LayerKind::Logo, format!("logo download failed: {err:#}"))
        }
    }
}

async fn prepare_music(fetcher: &dyn AssetFetch, url: &str, work: &Path) -> LayerOutcome<PathBuf> {
    let dest = work.join("music.mp3");
    logi(format!("Downloading music bed: {}", url));
    match fetch::fetch_to_file(fetcher, url, &dest).await {
        Ok(()) => LayerOutcome::Added(dest),
        Err(err) => LayerOutcome::skipped(
            LayerKind::MusicBed,
            format!("music download failed: {err:#}"),
        ),
    }
}
