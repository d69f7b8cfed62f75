use crate::overlay::TextBlock;
use crate::timeline::{FrameSize, LayerContent, Placement, RenderPlan, TimelineLayer};
use crate::{logi, logok};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

pub const OUTPUT_FPS: u32 = 24;
pub const VIDEO_BITRATE: &str = "3000k";
pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";
pub const ENCODER_PRESET: &str = "medium";
pub const ENCODER_THREADS: u32 = 4;

/// Probing and encoding of the media a plan refers to.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn duration_seconds(&self, path: &Path) -> Result<f64>;
    async fn frame_size(&self, path: &Path) -> Result<FrameSize>;
    async fn render(&self, plan: &RenderPlan) -> Result<PathBuf>;
}

/// `ffmpeg` / `ffprobe` from PATH.
#[derive(Debug, Default, Clone)]
pub struct Ffmpeg {
    font_file: Option<PathBuf>,
}

impl Ffmpeg {
    pub fn new(font_file: Option<PathBuf>) -> Self {
        Self { font_file }
    }
}

#[async_trait]
impl MediaEncoder for Ffmpeg {
    async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        ffprobe_duration_seconds(path).await
    }

    async fn frame_size(&self, path: &Path) -> Result<FrameSize> {
        ffprobe_video_dimensions(path).await
    }

    async fn render(&self, plan: &RenderPlan) -> Result<PathBuf> {
        let out = plan.output_path().to_path_buf();
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }

        let args = build_render_args(plan, self.font_file.as_deref())?;
        logi(format!(
            "Encoding {} layer(s), {:.2}s -> {}",
            plan.layers().len(),
            plan.resolved_duration_seconds(),
            out.display()
        ));
        run_cmd(&args).await?;

        if fs::metadata(&out).await.is_err() {
            anyhow::bail!("ffmpeg finished but {} was not written", out.display());
        }
        logok(format!("Encoded {}", out.display()));
        Ok(out)
    }
}

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to start {}", args[0]))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        anyhow::bail!("{} exited with {}: {}", args[0], output.status, tail.join(" | "));
    }

    Ok(())
}

pub async fn ffprobe_video_dimensions(path: &Path) -> Result<FrameSize> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed for {}", path.display()));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    parse_dimensions(&text).ok_or_else(|| anyhow::anyhow!("Invalid dimensions \"{}\"", text))
}

fn parse_dimensions(text: &str) -> Option<FrameSize> {
    let mut parts = text.lines().next()?.split('x');
    let width = parts.next()?.trim().parse::<u32>().ok()?;
    let height = parts.next()?.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(FrameSize { width, height })
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed for {}", path.display()));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration \"{}\" for {}", text, path.display()));
    }
    Ok(duration)
}

/// Escapes text for a single-quoted drawtext option inside `-filter_complex`.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push('\u{2019}'),
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

fn enable_expr(layer: &TimelineLayer) -> String {
    format!(
        "enable='between(t,{:.3},{:.3})'",
        layer.start_seconds,
        layer.end_seconds()
    )
}

fn block_origin(block: &TextBlock, placement: Placement, frame: FrameSize) -> (i64, i64) {
    let (fw, fh) = (frame.width as i64, frame.height as i64);
    let (bw, bh) = (block.width as i64, block.height as i64);
    let (x, y) = match placement {
        Placement::Center => ((fw - bw) / 2, (fh - bh) / 2),
        Placement::CenterX { y } => ((fw - bw) / 2, y as i64),
        Placement::BottomRight {
            margin_right,
            margin_bottom,
        } => (fw - bw - margin_right as i64, fh - bh - margin_bottom as i64),
    };
    (x.max(0), y.max(0))
}

fn text_filters(
    block: &TextBlock,
    placement: Placement,
    frame: FrameSize,
    enable: &str,
    font_file: Option<&Path>,
) -> Vec<String> {
    let (x, y) = block_origin(block, placement, frame);
    let style = &block.style;
    let mut filters = Vec::new();

    if let Some(bg) = style.background {
        filters.push(format!(
            "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill:{}",
            x,
            y,
            block.width,
            block.height,
            bg.to_ffmpeg(),
            enable
        ));
    }

    let font = font_file
        .map(|f| format!("fontfile='{}':", escape_drawtext(&f.display().to_string())))
        .unwrap_or_default();
    let border = style
        .border
        .map(|(colour, width)| format!("borderw={}:bordercolor={}:", width, colour.to_ffmpeg()))
        .unwrap_or_default();

    for (i, line) in block.lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_y = y + style.padding as i64 + (i as i64) * style.line_height as i64;
        filters.push(format!(
            "drawtext={}text='{}':expansion=none:fontsize={}:fontcolor={}:{}x={}:y={}:{}",
            font,
            escape_drawtext(line),
            style.font_size,
            style.foreground.to_ffmpeg(),
            border,
            x + style.padding as i64,
            line_y,
            enable
        ));
    }
    filters
}

/// Builds the full ffmpeg command line for a plan. Layers are composited in
/// plan order, so later layers end up on top.
pub fn build_render_args(plan: &RenderPlan, font_file: Option<&Path>) -> Result<Vec<String>> {
    let (background, frame, audio) = plan
        .base()
        .context("render plan has no background layer")?;
    let duration = plan.resolved_duration_seconds();
    let dur = format!("{:.3}", duration);

    let mut args: Vec<String> = vec![
        "ffmpeg".into(),
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        background.display().to_string(),
        "-i".into(),
        audio.narration().display().to_string(),
    ];
    let mut next_input = 2usize;

    let mut graph: Vec<String> = vec![format!("[0:v]trim=duration={dur},setpts=PTS-STARTPTS[v0]")];
    let mut current = "v0".to_string();
    let mut step = 0usize;

    for layer in plan.layers().iter().skip(1) {
        let enable = enable_expr(layer);
        match &layer.content {
            LayerContent::TitleCard { block, placement }
            | LayerContent::Caption {
                block, placement, ..
            } => {
                let filters = text_filters(block, *placement, frame, &enable, font_file);
                if filters.is_empty() {
                    continue;
                }
                step += 1;
                let next = format!("v{step}");
                graph.push(format!("[{current}]{}[{next}]", filters.join(",")));
                current = next;
            }
            LayerContent::Logo {
                source,
                width,
                placement,
            } => {
                args.extend([
                    "-loop".into(),
                    "1".into(),
                    "-i".into(),
                    source.display().to_string(),
                ]);
                let input = next_input;
                next_input += 1;

                let (x, y) = match placement {
                    Placement::Center => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
                    Placement::CenterX { y } => ("(W-w)/2".to_string(), y.to_string()),
                    Placement::BottomRight {
                        margin_right,
                        margin_bottom,
                    } => (format!("W-w-{margin_right}"), format!("H-h-{margin_bottom}")),
                };
                step += 1;
                let next = format!("v{step}");
                graph.push(format!("[{input}:v]scale={width}:-1,format=rgba[logo{step}]"));
                graph.push(format!(
                    "[{current}][logo{step}]overlay=x={x}:y={y}:shortest=0:{enable}[{next}]"
                ));
                current = next;
            }
            LayerContent::BackgroundVideo { .. } => {
                anyhow::bail!("background video must be the first layer only");
            }
        }
    }

    graph.push(format!(
        "[1:a]apad,atrim=duration={dur},asetpts=PTS-STARTPTS[narr]"
    ));
    let audio_out = match audio.music() {
        Some(music) => {
            args.extend([
                "-stream_loop".into(),
                "-1".into(),
                "-i".into(),
                music.source.display().to_string(),
            ]);
            let input = next_input;
            graph.push(format!(
                "[{input}:a]volume={:.3},atrim=duration={:.3},asetpts=PTS-STARTPTS[bgm]",
                music.volume, music.duration_seconds
            ));
            graph.push("[narr][bgm]amix=inputs=2:duration=first:normalize=0[aout]".to_string());
            "aout"
        }
        None => "narr",
    };

    args.extend([
        "-filter_complex".into(),
        graph.join(";"),
        "-map".into(),
        format!("[{current}]"),
        "-map".into(),
        format!("[{audio_out}]"),
        "-t".into(),
        dur,
        "-r".into(),
        OUTPUT_FPS.to_string(),
        "-c:v".into(),
        VIDEO_CODEC.into(),
        "-preset".into(),
        ENCODER_PRESET.into(),
        "-b:v".into(),
        VIDEO_BITRATE.into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        AUDIO_CODEC.into(),
        "-b:a".into(),
        "192k".into(),
        "-threads".into(),
        ENCODER_THREADS.to_string(),
        "-movflags".into(),
        "+faststart".into(),
        plan.output_path().display().to_string(),
    ]);
    Ok(args)
}
