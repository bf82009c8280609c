use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "timberlens", version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an image with its detection overlays as a PNG.
    Render(RenderArgs),
    /// Print natural size, fitted layout and mapped boxes as JSON.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Image source: a path, `file://` path, or `data:` URI.
    #[arg(long)]
    image: String,

    /// Detection response JSON (`{"count": N, "boxes": [[x1, y1, x2, y2], ...]}`).
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Container width in pixels.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Overlay style JSON.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Give up on the decode after this many milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Image source: a path, `file://` path, or `data:` URI.
    #[arg(long)]
    image: String,

    /// Detection response JSON to map onto the layout.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Container width in pixels (defaults to the natural width).
    #[arg(long)]
    width: Option<u32>,

    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn load_detections(path: Option<&PathBuf>) -> anyhow::Result<timberlens::DetectionSet> {
    Ok(match path {
        Some(p) => timberlens::DetectionResponse::from_path(p)?.into_set(),
        None => timberlens::DetectionSet::empty(),
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let style = match &args.style {
        Some(p) => timberlens::OverlayStyle::from_path(p)?,
        None => timberlens::OverlayStyle::default(),
    };
    let timeout = Duration::from_millis(args.timeout_ms);
    let opts = timberlens::LoaderOpts::from_env().with_decode_timeout(Some(timeout));
    let loader = timberlens::ImageLoader::new(opts)?;

    let mut view = timberlens::OverlayView::new(
        loader,
        timberlens::OverlayRenderer::new(style),
        timberlens::LayoutHandle::new(args.width),
    );
    view.set_detections(load_detections(args.detections.as_ref())?);
    view.set_source(timberlens::ImageSource::new(&args.image)?);

    let rendered = match view.wait_ready(timeout)? {
        timberlens::ViewState::Ready(frame) => frame.clone(),
        timberlens::ViewState::Failed(reason) => bail!("failed to load image: {reason}"),
        timberlens::ViewState::TimedOut | timberlens::ViewState::Loading => {
            bail!("image did not decode within {} ms", args.timeout_ms)
        }
        timberlens::ViewState::NoSource => bail!("no image source"),
    };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let frame = &rendered.frame;
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} boxes)",
        args.out.display(),
        frame.width,
        frame.height,
        rendered.rects.len()
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let timeout = Duration::from_millis(args.timeout_ms);
    let opts = timberlens::LoaderOpts::from_env().with_decode_timeout(Some(timeout));
    let mut loader = timberlens::ImageLoader::new(opts)?;
    let source = timberlens::ImageSource::new(&args.image)?;
    loader.begin(source.clone());

    let decoded = match loader.wait(timeout) {
        timberlens::LoadState::Ready(img) => img.clone(),
        timberlens::LoadState::Failed { reason, .. } => bail!("failed to load image: {reason}"),
        _ => bail!("image did not decode within {} ms", args.timeout_ms),
    };

    let width = args.width.unwrap_or(decoded.width());
    let layout = timberlens::FitLayout::fit_width(decoded.width(), decoded.height(), width);
    let boxes = load_detections(args.detections.as_ref())?;
    let rects: Vec<timberlens::Rect> = boxes
        .iter()
        .filter(|b| b.is_finite())
        .map(|b| layout.map_box(*b))
        .collect();

    let report = serde_json::json!({
        "source": source.describe(),
        "natural_width": decoded.width(),
        "natural_height": decoded.height(),
        "layout": layout,
        "rects": rects,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
