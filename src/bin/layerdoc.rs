use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use layerdoc::{ColorMode, Document, DocumentSpec, EditorOpts, LoadReport};

#[derive(Parser, Debug)]
#[command(name = "layerdoc", version)]
struct Cli {
    /// Editor options JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty document.
    New(NewArgs),
    /// Print header, layers and load repairs of a document.
    Info(InfoArgs),
    /// Write the background of a document as PNG.
    ExportBackground(ExportArgs),
    /// Load and save a document, repairing what can be repaired.
    Resave(ResaveArgs),
}

#[derive(Parser, Debug)]
struct NewArgs {
    /// Canvas width.
    #[arg(long)]
    width: u32,

    /// Canvas height.
    #[arg(long)]
    height: u32,

    /// Background channels (3 or 4).
    #[arg(long, default_value_t = 4)]
    channels: u8,

    /// Name of the first layer.
    #[arg(long, default_value = "Layer 1")]
    layer: String,

    /// Output document path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input document.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input document.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ResaveArgs {
    /// Input document.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output document path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(serde::Serialize)]
struct Summary {
    width: u32,
    height: u32,
    original_width: u32,
    original_height: u32,
    channels: u8,
    color_mode: ColorMode,
    resolution: Option<u32>,
    thumbnail: Option<(u32, u32)>,
    layers: Vec<LayerSummary>,
    report: LoadReport,
}

#[derive(serde::Serialize)]
struct LayerSummary {
    name: String,
    kind: layerdoc::LayerKind,
    depth: usize,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    opacity: u8,
    visible: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LAYERDOC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = match &cli.config {
        Some(path) => EditorOpts::from_path(path)?,
        None => EditorOpts::default(),
    };
    match cli.cmd {
        Command::New(args) => cmd_new(args, opts),
        Command::Info(args) => cmd_info(args, opts),
        Command::ExportBackground(args) => cmd_export(args, opts),
        Command::Resave(args) => cmd_resave(args, opts),
    }
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_new(args: NewArgs, opts: EditorOpts) -> anyhow::Result<()> {
    let spec = DocumentSpec {
        width: args.width,
        height: args.height,
        channels: args.channels,
        first_layer: args.layer,
        ..DocumentSpec::default()
    };
    let mut doc = Document::new(&spec, opts)?;
    ensure_parent(&args.out)?;
    doc.save(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(args: InfoArgs, opts: EditorOpts) -> anyhow::Result<()> {
    let (doc, report) = Document::load(&args.in_path, opts)?;
    let canvas = doc.canvas();
    let layers = doc.layers();
    let summary = Summary {
        width: canvas.width(),
        height: canvas.height(),
        original_width: canvas.original_width(),
        original_height: canvas.original_height(),
        channels: canvas.channels(),
        color_mode: canvas.color_mode(),
        resolution: canvas.meta.resolution,
        thumbnail: canvas.thumbnail().map(|t| (t.width, t.height)),
        layers: layers
            .iter()
            .map(|l| {
                let b = l.bounds();
                LayerSummary {
                    name: l.name().to_string(),
                    kind: l.kind(),
                    depth: layers.depth(l.id()),
                    x: b.x,
                    y: b.y,
                    width: b.width,
                    height: b.height,
                    opacity: l.opacity(),
                    visible: l.is_visible(),
                }
            })
            .collect(),
        report,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{}x{} (requested {}x{}), {} channels, {:?}",
        summary.width,
        summary.height,
        summary.original_width,
        summary.original_height,
        summary.channels,
        summary.color_mode
    );
    if let Some(dpi) = summary.resolution {
        println!("resolution: {dpi} dpi");
    }
    println!("layers (bottom to top):");
    for l in &summary.layers {
        println!(
            "  {:indent$}{} [{:?}] {}x{} at ({}, {}) opacity {}{}",
            "",
            l.name,
            l.kind,
            l.width,
            l.height,
            l.x,
            l.y,
            l.opacity,
            if l.visible { "" } else { " hidden" },
            indent = l.depth * 2
        );
    }
    if !summary.report.is_clean() {
        println!("repairs: {}", serde_json::to_string(&summary.report)?);
    }
    Ok(())
}

fn cmd_export(args: ExportArgs, opts: EditorOpts) -> anyhow::Result<()> {
    let (doc, _) = Document::load(&args.in_path, opts)?;
    let bg = doc.canvas().background();
    let color = match bg.channels() {
        3 => image::ColorType::Rgb8,
        _ => image::ColorType::Rgba8,
    };
    ensure_parent(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        bg.as_bytes(),
        bg.width(),
        bg.height(),
        color,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_resave(args: ResaveArgs, opts: EditorOpts) -> anyhow::Result<()> {
    let (mut doc, report) = Document::load(&args.in_path, opts)?;
    if !report.is_clean() {
        eprintln!("repaired: {}", serde_json::to_string(&report)?);
    }
    ensure_parent(&args.out)?;
    doc.save(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
