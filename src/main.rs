use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use indicatif::{ProgressBar, ProgressStyle};
use ksm_autovideo::config::Config;
use ksm_autovideo::generator::{self, Services};
use ksm_autovideo::timeline::{
    MAX_TARGET_SECONDS, MIN_TARGET_SECONDS, NarrationRequest, RenderOptions,
};
use ksm_autovideo::{init, platform, set_log_hook};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "ksm-autovideo",
    version,
    about = "Paste a title and a paragraph, get a 30-90s narrated MP4"
)]
struct Cli {
    /// Video title (also used for the title card and the file name)
    #[arg(short, long)]
    title: String,

    /// Narration text
    #[arg(short, long, conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the narration text from a file
    #[arg(long, value_hint = ValueHint::FilePath)]
    body_file: Option<PathBuf>,

    /// Target duration in seconds
    #[arg(
        short,
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u32)
            .range(MIN_TARGET_SECONDS as i64..=MAX_TARGET_SECONDS as i64)
    )]
    duration: u32,

    /// Topic / keywords used to pick the background
    #[arg(long)]
    topic: Option<String>,

    /// Voice: language code for gtts (en, en-uk, hi, ...) or an ElevenLabs voice id
    #[arg(long, default_value = "")]
    voice: String,

    /// Logo image (png/jpg) as a local path or an http(s) URL
    #[arg(long)]
    logo: Option<String>,

    /// Do not burn rolling captions into the video
    #[arg(long, action = ArgAction::SetTrue)]
    no_captions: bool,

    /// Do not show the title card for the first seconds
    #[arg(long, action = ArgAction::SetTrue)]
    no_title_card: bool,

    /// Mix in light background music
    #[arg(long, action = ArgAction::SetTrue)]
    music: bool,

    /// Open the finished video in the default player
    #[arg(long, action = ArgAction::SetTrue)]
    open: bool,

    /// Configuration file
    #[arg(long, default_value = "config.json", value_hint = ValueHint::FilePath)]
    config: PathBuf,
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Generating voice, selecting background, and rendering video...");
    pb
}

async fn run(cli: Cli) -> Result<PathBuf> {
    let cfg = Config::load(&cli.config).await?;

    let body = match (&cli.body, &cli.body_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => String::new(),
    };

    let request = NarrationRequest {
        title: cli.title.trim().to_string(),
        body: body.trim().to_string(),
        target_duration_seconds: cli.duration,
        topic_hint: cli.topic.clone(),
        voice_selector: cli.voice.clone(),
    };
    let options = RenderOptions {
        captions: !cli.no_captions,
        title_card: !cli.no_title_card,
        music: cli.music,
    };

    request.check()?;
    let services = Services::from_config(&cfg)?;

    init::ensure_output_dir(&cfg.output_dir()).await?;
    if !init::check_ffmpeg().await {
        anyhow::bail!("ffmpeg and ffprobe are required to render video");
    }

    let pb = spinner();
    let hook_pb = pb.clone();
    set_log_hook(Some(Arc::new(Mutex::new(move |line: &str| {
        hook_pb.set_message(line.to_string());
    }))));

    let logo = cli.logo.as_deref();
    let result = generator::generate(&cfg, &services, &request, &options, logo).await;

    set_log_hook(None);
    pb.finish_and_clear();

    let output = result?;
    for skipped in output.plan.skipped() {
        eprintln!("Note: {} skipped ({})", skipped.kind, skipped.reason);
    }
    Ok(output.output_path)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let open = cli.open;

    match run(cli).await {
        Ok(path) => {
            println!("Video generated: {}", path.display());
            if open {
                if let Err(err) = platform::open_in_viewer(&path) {
                    eprintln!("Could not open player: {:#}", err);
                }
            }
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
