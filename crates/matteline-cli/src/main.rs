use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use matteline_core::{FrameBuffer, MattelineConfig};
use matteline_ir::{validate_document, AnimationDocument, ProjectSettings};
use matteline_render::image_loader::{load_image, save_frame_png, save_matte_png};
use matteline_render::{build_animation, render_document, BuildRequest, RenderOptions};

/// Foreground argument that leaves its slot empty.
const EMPTY_SLOT: &str = "none";

#[derive(Parser)]
#[command(
    name = "matteline",
    version,
    about = "Matteline: keyframed layer compositing with per-frame mattes"
)]
struct Cli {
    /// Path to the config file (defaults are used when it does not exist)
    #[arg(long, global = true, default_value = "matteline.config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an animation document from images and cached editor layers
    Build {
        /// JSON file with the cached layer list ("-" reads stdin)
        #[arg(long)]
        layers: Option<PathBuf>,

        /// Background image
        #[arg(long)]
        background: Option<PathBuf>,

        /// Foreground image, repeatable. Pass "none" to leave a slot empty.
        #[arg(long = "foreground")]
        foregrounds: Vec<String>,

        #[arg(long)]
        width: Option<i64>,
        #[arg(long)]
        height: Option<i64>,
        #[arg(long)]
        fps: Option<i64>,
        #[arg(long)]
        total_frames: Option<i64>,
        /// Matte dilation (positive) or erosion (negative) in pixels
        #[arg(long, allow_hyphen_values = true)]
        mask_expansion: Option<i64>,
        /// Matte feather radius
        #[arg(long)]
        mask_feather: Option<i64>,

        /// Also print the preview document
        #[arg(long)]
        preview: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render an animation document to PNG frames and mattes
    Render {
        /// Path to the animation JSON
        #[arg()]
        file: PathBuf,

        /// First frame to render
        #[arg(long, default_value_t = 0)]
        start: i64,

        /// End frame (exclusive), -1 renders to the last frame
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        end: i64,

        /// Output directory (default: render.output_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render frames one after another on the calling thread
        #[arg(long)]
        sequential: bool,
    },

    /// Display version and engine info, or summarize an animation document
    Info {
        #[arg()]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Build {
            layers,
            background,
            foregrounds,
            width,
            height,
            fps,
            total_frames,
            mask_expansion,
            mask_feather,
            preview,
            output,
        } => {
            let defaults = &config.project;
            let settings = ProjectSettings::for_build(
                width.unwrap_or(defaults.width as i64),
                height.unwrap_or(defaults.height as i64),
                fps.unwrap_or(defaults.fps as i64),
                total_frames.unwrap_or(defaults.total_frames as i64),
                mask_expansion.unwrap_or(defaults.mask_expansion as i64),
                mask_feather.unwrap_or(defaults.mask_feather as i64),
            );
            cmd_build(
                settings,
                layers,
                background,
                &foregrounds,
                preview,
                output,
            )
        }
        Commands::Render {
            file,
            start,
            end,
            output,
            sequential,
        } => {
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&config.render.output_dir));
            let options = RenderOptions {
                parallel: config.render.parallel && !sequential,
            };
            cmd_render(&config, &file, start, end, &out_dir, options)
        }
        Commands::Info { file } => match file {
            Some(file) => cmd_inspect(&file),
            None => cmd_info(&config),
        },
    }
}

fn load_config(path: &Path) -> Result<MattelineConfig> {
    if !path.exists() {
        return Ok(MattelineConfig::default());
    }
    MattelineConfig::load_from_file(path)
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))
}

fn cmd_build(
    settings: ProjectSettings,
    layers: Option<PathBuf>,
    background: Option<PathBuf>,
    foregrounds: &[String],
    preview: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let cached_layers = match layers {
        Some(path) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read cached layers from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read cached layers: {}", path.display()))?,
        None => String::new(),
    };

    let background = background.as_deref().map(read_image).transpose()?;
    let foregrounds = foregrounds
        .iter()
        .map(|arg| match arg.as_str() {
            EMPTY_SLOT => Ok(None),
            path => read_image(Path::new(path)).map(Some),
        })
        .collect::<Result<Vec<_>>>()?;

    let built = build_animation(&BuildRequest {
        settings,
        cached_layers,
        background,
        foregrounds,
        preview,
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &built.animation)
                .with_context(|| format!("failed to write animation: {}", path.display()))?;
            println!("✓ Animation written to {}", path.display());
            if let Some(preview) = built.preview {
                println!("{}", preview);
            }
        }
        None => println!("{}", built.animation),
    }
    Ok(())
}

fn read_image(path: &Path) -> Result<FrameBuffer> {
    load_image(path).with_context(|| format!("failed to read image: {}", path.display()))
}

fn cmd_render(
    config: &MattelineConfig,
    file: &Path,
    start: i64,
    end: i64,
    out_dir: &Path,
    options: RenderOptions,
) -> Result<()> {
    let started = Instant::now();
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read file: {}", file.display()))?;

    println!("Matteline Render");
    println!("   Source:    {}", file.display());

    let result = render_document(&source, start, end, options);
    let render_time = started.elapsed();

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    for (i, (frame, matte)) in result.frames.iter().zip(&result.mattes).enumerate() {
        let index = result.start_frame + i as u64;
        let frame_path = out_dir.join(format!("{}_{:05}.png", config.render.frame_prefix, index));
        let matte_path = out_dir.join(format!("{}_{:05}.png", config.render.matte_prefix, index));
        save_frame_png(frame, &frame_path)?;
        save_matte_png(matte, &matte_path)?;
    }

    println!("   Frames:    {}", result.frame_count());
    println!("   Size:      {}x{}", result.width, result.height);
    println!("   Output:    {}", out_dir.display());
    println!("   Hash:      {}", result.content_hash());
    println!(
        "   Time:      {:.2?} render, {:.2?} total",
        render_time,
        started.elapsed()
    );
    Ok(())
}

fn cmd_info(config: &MattelineConfig) -> Result<()> {
    println!("Matteline Compositing Engine");
    println!("   Version:   {}", env!("CARGO_PKG_VERSION"));
    println!(
        "   Renderer:  CPU ({})",
        if config.render.parallel {
            "frame-parallel"
        } else {
            "sequential"
        }
    );
    println!("   Output:    PNG frames + mattes in {}", config.render.output_dir);
    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read file: {}", file.display()))?;
    let document = AnimationDocument::parse(&source)?;
    let project = &document.project;

    println!("Animation: {}", file.display());
    println!("   Size:       {}x{}", project.width, project.height);
    println!("   FPS:        {}", project.fps);
    println!(
        "   Frames:     {} ({:.2}s)",
        project.frame_count(),
        project.frame_count() as f64 / project.time_base()
    );
    println!(
        "   Matte:      expansion {}, feather {}",
        project.mask_expansion, project.mask_feather
    );
    println!("   Layers:     {}", document.layers.len());
    for record in &document.layers {
        println!(
            "     - {} [{}]",
            record.label(),
            record.layer_type().unwrap_or("?")
        );
    }

    match validate_document(&document) {
        Ok(()) => println!("✓ No problems found"),
        Err(errors) => {
            println!("✗ {} problem(s):", errors.len());
            for error in errors {
                println!("     - {}", error);
            }
        }
    }
    Ok(())
}
