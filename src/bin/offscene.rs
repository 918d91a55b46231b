use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use offscene::SceneEngine as _;

#[derive(Parser, Debug)]
#[command(name = "offscene", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the scene's timeline length and frame count.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based). Omit to render the scene at rest.
    #[arg(long)]
    frame: Option<u64>,

    /// Output width in logical pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Output height in logical pixels.
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Frame rate, `N` or `N/D`.
    #[arg(long, default_value = "25", value_parser = parse_fps)]
    fps: offscene::Fps,

    /// Timeline length in seconds; 0 uses the scene's own timeline.
    #[arg(long, default_value_t = 0)]
    duration: u64,

    /// Device pixel ratio the scene is drawn at; the PNG stays `width` by `height`.
    #[arg(long)]
    dpr: Option<f64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame rate, `N` or `N/D`.
    #[arg(long, default_value = "25", value_parser = parse_fps)]
    fps: offscene::Fps,
}

fn parse_fps(raw: &str) -> Result<offscene::Fps, String> {
    let (num, den) = match raw.split_once('/') {
        Some((n, d)) => (n.trim(), d.trim()),
        None => (raw.trim(), "1"),
    };
    let num: u32 = num.parse().map_err(|_| format!("invalid fps numerator '{num}'"))?;
    let den: u32 = den.parse().map_err(|_| format!("invalid fps denominator '{den}'"))?;
    offscene::Fps::new(num, den).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let source = offscene::read_scene_source(&args.in_path)?;

    let mut opts = offscene::SceneHostOpts::from_env()?;
    opts.fps = args.fps;
    opts.duration_secs = args.duration;
    if let Some(dpr) = args.dpr {
        opts.device_pixel_ratio = dpr;
    }

    let mut host = offscene::SceneHost::new(source, opts)?;
    let image = match args.frame {
        Some(frame) => host.render_frame(
            args.width,
            args.height,
            offscene::PixelFormat::Rgba8,
            offscene::FrameIndex(frame),
        )?,
        None => host.render_static(args.width, args.height, offscene::PixelFormat::Rgba8)?,
    };
    if let Some(stats) = host.last_stats() {
        tracing::info!(?stats, "frame rendered");
    }
    drop(host);

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &image.data,
        image.width,
        image.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let source = offscene::read_scene_source(&args.in_path)?;
    let runtime = offscene::JsonSceneEngine
        .load(&source)
        .with_context(|| format!("load scene '{}'", args.in_path.display()))?;

    let duration_ms = runtime.duration_ms();
    let secs = offscene::duration_secs(duration_ms);
    println!("duration_ms: {duration_ms}");
    println!("duration_secs: {secs}");
    println!("frames: {}", args.fps.frames_in_ms(duration_ms));
    println!("items: {}", runtime.item_count());
    println!("animations: {}", runtime.animation_count());
    Ok(())
}
