use crate::captions::{self, CaptionChunk, CaptionTiming};
use crate::config::Tuning;
use crate::error::GenerateError;
use crate::estimate::TrimmedNarration;
use crate::overlay::{TextBlock, TextRenderer};
use crate::{logi, logw};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

/// Output never goes shorter than this unless the footage itself is shorter.
pub const MIN_OUTPUT_SECONDS: f64 = 30.0;
pub const MIN_TARGET_SECONDS: u32 = 30;
pub const MAX_TARGET_SECONDS: u32 = 90;

pub const TITLE_FONT_SIZE: u32 = 42;
pub const CAPTION_FONT_SIZE: u32 = 32;
pub const LOGO_MIN_WIDTH: u32 = 96;
pub const LOGO_WIDTH_FRACTION: f64 = 0.12;
pub const LOGO_MARGIN_RIGHT: u32 = 40;
pub const LOGO_MARGIN_BOTTOM: u32 = 30;
pub const CAPTION_TOP_FRACTION: f64 = 0.82;

const LOGO_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, PartialEq)]
pub struct NarrationRequest {
    pub title: String,
    pub body: String,
    pub target_duration_seconds: u32,
    pub topic_hint: Option<String>,
    pub voice_selector: String,
}

impl NarrationRequest {
    pub fn check(&self) -> Result<(), GenerateError> {
        if self.title.trim().is_empty() {
            return Err(GenerateError::Precondition("a video title is required".into()));
        }
        if self.body.trim().is_empty() {
            return Err(GenerateError::Precondition("video content is required".into()));
        }
        if !(MIN_TARGET_SECONDS..=MAX_TARGET_SECONDS).contains(&self.target_duration_seconds) {
            return Err(GenerateError::Precondition(format!(
                "target duration must be between {} and {} seconds (got {})",
                MIN_TARGET_SECONDS, MAX_TARGET_SECONDS, self.target_duration_seconds
            )));
        }
        Ok(())
    }

    pub fn topic_hint(&self) -> Option<&str> {
        self.topic_hint.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub captions: bool,
    pub title_card: bool,
    pub music: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            captions: true,
            title_card: true,
            music: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Center,
    /// Horizontally centred with the top edge at `y`.
    CenterX { y: u32 },
    BottomRight { margin_right: u32, margin_bottom: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    BackgroundVideo,
    TitleCard,
    Logo,
    Caption,
    MusicBed,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerKind::BackgroundVideo => "background video",
            LayerKind::TitleCard => "title card",
            LayerKind::Logo => "logo",
            LayerKind::Caption => "captions",
            LayerKind::MusicBed => "music bed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicBed {
    pub source: PathBuf,
    pub volume: f64,
    /// The source is looped, then cut to this length.
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioTrack {
    Narration { source: PathBuf },
    Mixed { narration: PathBuf, music: MusicBed },
}

impl AudioTrack {
    pub fn narration(&self) -> &Path {
        match self {
            AudioTrack::Narration { source } => source,
            AudioTrack::Mixed { narration, .. } => narration,
        }
    }

    pub fn music(&self) -> Option<&MusicBed> {
        match self {
            AudioTrack::Narration { .. } => None,
            AudioTrack::Mixed { music, .. } => Some(music),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    /// Base layer. Carries the only audio in the plan.
    BackgroundVideo {
        source: PathBuf,
        frame: FrameSize,
        audio: AudioTrack,
    },
    TitleCard {
        block: TextBlock,
        placement: Placement,
    },
    Logo {
        source: PathBuf,
        width: u32,
        placement: Placement,
    },
    Caption {
        chunk: CaptionChunk,
        block: TextBlock,
        placement: Placement,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayer {
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub content: LayerContent,
}

impl TimelineLayer {
    pub fn kind(&self) -> LayerKind {
        match self.content {
            LayerContent::BackgroundVideo { .. } => LayerKind::BackgroundVideo,
            LayerContent::TitleCard { .. } => LayerKind::TitleCard,
            LayerContent::Logo { .. } => LayerKind::Logo,
            LayerContent::Caption { .. } => LayerKind::Caption,
        }
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// Result of one optional step: either it contributed, or it was dropped and
/// the reason kept for the log.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOutcome<T> {
    Added(T),
    Skipped { kind: LayerKind, reason: String },
}

impl<T> LayerOutcome<T> {
    pub fn skipped(kind: LayerKind, reason: impl Into<String>) -> Self {
        LayerOutcome::Skipped {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLayer {
    pub kind: LayerKind,
    pub reason: String,
}

/// A fully resolved timeline.
///
/// Layers are in paint order: index 0 is the background video and every later
/// layer is composited on top of the ones before it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    resolved_duration_seconds: f64,
    layers: Vec<TimelineLayer>,
    output_path: PathBuf,
    skipped: Vec<SkippedLayer>,
}

impl RenderPlan {
    pub fn resolved_duration_seconds(&self) -> f64 {
        self.resolved_duration_seconds
    }

    pub fn layers(&self) -> &[TimelineLayer] {
        &self.layers
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn skipped(&self) -> &[SkippedLayer] {
        &self.skipped
    }

    pub fn base(&self) -> Option<(&Path, FrameSize, &AudioTrack)> {
        match self.layers.first().map(|l| &l.content) {
            Some(LayerContent::BackgroundVideo {
                source,
                frame,
                audio,
            }) => Some((source.as_path(), *frame, audio)),
            _ => None,
        }
    }
}

/// Media already on disk for one request.
#[derive(Debug, Clone)]
pub struct PlanAssets {
    pub narration_audio: PathBuf,
    pub background_video: PathBuf,
    pub frame: FrameSize,
    /// `None` when no logo was supplied.
    pub logo: Option<LayerOutcome<PathBuf>>,
    /// `None` when no music was requested.
    pub music: Option<LayerOutcome<PathBuf>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceDurations {
    pub narration_audio_seconds: f64,
    pub background_video_seconds: f64,
}

/// `min(max(narration, 30), target, background)`.
pub fn resolve_duration(narration_audio: f64, target: f64, background_video: f64) -> f64 {
    narration_audio
        .max(MIN_OUTPUT_SECONDS)
        .min(target)
        .min(background_video)
}

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern"));

pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let slug = SLUG_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "ksm-video".to_string()
    } else {
        slug.to_string()
    }
}

pub struct TimelineCompiler<'a> {
    text: &'a dyn TextRenderer,
    timing: CaptionTiming,
    title_card_seconds: f64,
    music_volume: f64,
    output_dir: PathBuf,
}

impl<'a> TimelineCompiler<'a> {
    pub fn new(
        text: &'a dyn TextRenderer,
        tuning: &Tuning,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text,
            timing: CaptionTiming::from(tuning),
            title_card_seconds: tuning.title_card_seconds,
            music_volume: tuning.music_volume,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path_for(&self, title: &str) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", slugify(title)))
    }

    pub fn build_plan(
        &self,
        request: &NarrationRequest,
        options: &RenderOptions,
        narration: &TrimmedNarration,
        durations: SourceDurations,
        assets: PlanAssets,
    ) -> RenderPlan {
        let resolved = resolve_duration(
            durations.narration_audio_seconds,
            request.target_duration_seconds as f64,
            durations.background_video_seconds,
        );
        if durations.background_video_seconds < MIN_OUTPUT_SECONDS {
            logw(format!(
                "Background footage is only {:.2}s; output will be shorter than {}s",
                durations.background_video_seconds, MIN_OUTPUT_SECONDS
            ));
        }
        logi(format!(
            "Resolved duration {:.2}s (narration {:.2}s, target {}s, footage {:.2}s)",
            resolved,
            durations.narration_audio_seconds,
            request.target_duration_seconds,
            durations.background_video_seconds
        ));

        let mut skipped = Vec::new();
        let frame = assets.frame;

        let audio = match assets.music {
            Some(outcome) => match self.music_bed(outcome, resolved) {
                LayerOutcome::Added(music) => AudioTrack::Mixed {
                    narration: assets.narration_audio.clone(),
                    music,
                },
                LayerOutcome::Skipped { kind, reason } => {
                    record_skip(&mut skipped, kind, reason);
                    AudioTrack::Narration {
                        source: assets.narration_audio.clone(),
                    }
                }
            },
            None => AudioTrack::Narration {
                source: assets.narration_audio.clone(),
            },
        };

        let mut layers = vec![TimelineLayer {
            start_seconds: 0.0,
            duration_seconds: resolved,
            content: LayerContent::BackgroundVideo {
                source: assets.background_video.clone(),
                frame,
                audio,
            },
        }];

        if options.title_card {
            match self.title_card(&request.title, frame, resolved) {
                LayerOutcome::Added(layer) => layers.push(layer),
                LayerOutcome::Skipped { kind, reason } => record_skip(&mut skipped, kind, reason),
            }
        }

        if let Some(outcome) = assets.logo {
            match self.logo(outcome, frame, resolved) {
                LayerOutcome::Added(layer) => layers.push(layer),
                LayerOutcome::Skipped { kind, reason } => record_skip(&mut skipped, kind, reason),
            }
        }

        if options.captions {
            match self.captions(narration, frame, resolved, &mut skipped) {
                LayerOutcome::Added(captions) => layers.extend(captions),
                LayerOutcome::Skipped { kind, reason } => record_skip(&mut skipped, kind, reason),
            }
        }

        RenderPlan {
            resolved_duration_seconds: resolved,
            layers,
            output_path: self.output_path_for(&request.title),
            skipped,
        }
    }

    fn music_bed(&self, outcome: LayerOutcome<PathBuf>, resolved: f64) -> LayerOutcome<MusicBed> {
        match outcome {
            LayerOutcome::Added(source) => LayerOutcome::Added(MusicBed {
                source,
                volume: self.music_volume,
                duration_seconds: resolved,
            }),
            LayerOutcome::Skipped { kind, reason } => LayerOutcome::Skipped { kind, reason },
        }
    }

    fn title_card(
        &self,
        title: &str,
        frame: FrameSize,
        resolved: f64,
    ) -> LayerOutcome<TimelineLayer> {
        let duration = self.title_card_seconds.min(resolved);
        if duration <= 0.0 {
            return LayerOutcome::skipped(LayerKind::TitleCard, "title card has no screen time");
        }
        let width = frame
            .width
            .saturating_sub(80)
            .min((frame.width as f64 * 0.9) as u32);

        match self.text.render(title.trim(), width, TITLE_FONT_SIZE) {
            Ok(block) => LayerOutcome::Added(TimelineLayer {
                start_seconds: 0.0,
                duration_seconds: duration,
                content: LayerContent::TitleCard {
                    block,
                    placement: Placement::Center,
                },
            }),
            Err(err) => LayerOutcome::skipped(LayerKind::TitleCard, format!("{err:#}")),
        }
    }

    fn logo(
        &self,
        outcome: LayerOutcome<PathBuf>,
        frame: FrameSize,
        resolved: f64,
    ) -> LayerOutcome<TimelineLayer> {
        let source = match outcome {
            LayerOutcome::Added(path) => path,
            LayerOutcome::Skipped { kind, reason } => return LayerOutcome::Skipped { kind, reason },
        };

        let supported = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| LOGO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            return LayerOutcome::skipped(
                LayerKind::Logo,
                format!("unsupported logo format: {}", source.display()),
            );
        }
        match std::fs::metadata(&source) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            Ok(_) => {
                return LayerOutcome::skipped(
                    LayerKind::Logo,
                    format!("logo file is empty: {}", source.display()),
                );
            }
            Err(err) => {
                return LayerOutcome::skipped(
                    LayerKind::Logo,
                    format!("logo unreadable ({}): {}", err, source.display()),
                );
            }
        }

        let width = LOGO_MIN_WIDTH.max((frame.width as f64 * LOGO_WIDTH_FRACTION) as u32);
        if width + LOGO_MARGIN_RIGHT > frame.width {
            return LayerOutcome::skipped(
                LayerKind::Logo,
                format!("frame {}px is too narrow for a {}px logo", frame.width, width),
            );
        }

        LayerOutcome::Added(TimelineLayer {
            start_seconds: 0.0,
            duration_seconds: resolved,
            content: LayerContent::Logo {
                source,
                width,
                placement: Placement::BottomRight {
                    margin_right: LOGO_MARGIN_RIGHT,
                    margin_bottom: LOGO_MARGIN_BOTTOM,
                },
            },
        })
    }

    /// One layer per chunk. A chunk that fails to render is recorded as skipped
    /// on its own; the step as a whole is skipped only when nothing rendered.
    fn captions(
        &self,
        narration: &TrimmedNarration,
        frame: FrameSize,
        resolved: f64,
        skipped: &mut Vec<SkippedLayer>,
    ) -> LayerOutcome<Vec<TimelineLayer>> {
        let chunks = captions::segment_captions(&narration.text, resolved, &self.timing);
        if chunks.is_empty() {
            return LayerOutcome::skipped(LayerKind::Caption, "narration has no words to caption");
        }

        let uncaptioned = narration
            .word_count()
            .saturating_sub(captions::captioned_word_count(&chunks));
        if uncaptioned > 0 {
            logw(format!(
                "Captions end at {:.2}s; {} trailing word(s) are spoken but not captioned",
                resolved, uncaptioned
            ));
        }

        let width = (frame.width as f64 * 0.9) as u32;
        let placement = Placement::CenterX {
            y: (frame.height as f64 * CAPTION_TOP_FRACTION) as u32,
        };

        let mut layers = Vec::with_capacity(chunks.len());
        let mut failures = Vec::new();
        for chunk in chunks {
            match self.text.render(&chunk.text, width, CAPTION_FONT_SIZE) {
                Ok(block) => layers.push(TimelineLayer {
                    start_seconds: chunk.start_offset_seconds,
                    duration_seconds: chunk.duration_seconds,
                    content: LayerContent::Caption {
                        chunk,
                        block,
                        placement,
                    },
                }),
                Err(err) => failures.push(format!(
                    "caption at {:.2}s: {err:#}",
                    chunk.start_offset_seconds
                )),
            }
        }

        if layers.is_empty() {
            let count = failures.len();
            let mut reason = failures.into_iter().next().unwrap_or_default();
            if count > 1 {
                reason.push_str(&format!(" (and {} more)", count - 1));
            }
            return LayerOutcome::skipped(LayerKind::Caption, reason);
        }
        for reason in failures {
            record_skip(skipped, LayerKind::Caption, reason);
        }

        logi(format!(
            "Captions: {} chunk(s) using {} text",
            layers.len(),
            self.text.name()
        ));
        LayerOutcome::Added(layers)
    }
}

fn record_skip(skipped: &mut Vec<SkippedLayer>, kind: LayerKind, reason: String) {
    logw(format!("Skipping {}: {}", kind, reason));
    skipped.push(SkippedLayer { kind, reason });
}
