// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TSP: tattoo stencil editing and print preparation.
//
// Entry point. Initialises logging and backend services, then runs the
// requested subcommand.

mod args;
mod editor;
mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use image::RgbaImage;
use tokio::sync::watch;
use tracing::{info, warn};

use tsp_core::{JobStatus, PixelSize, PrintType};
use tsp_filters::raster;
use tsp_pipeline::EditEvent;
use tsp_print::compositor::canvas_size;
use tsp_print::{
    CropMarkStyle, Pan, PreviewView, PrintProgress, PrintRequest, PrintStage, PrintTask, ViewTransform, ViewportSize,
};

use args::{EditArgs, LayoutChoice, PaperChoice, parse_canvas, parse_viewport};
use editor::Editor;
use services::app_services::AppServices;

#[derive(Parser, Debug)]
#[command(name = "tsp", version, about = "Tattoo stencil editing and print preparation")]
struct Cli {
    /// Directory for config, job history, and default outputs.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply edits to an image and save the result.
    Edit(EditCmd),
    /// Lay an image out across sheets and spool it to a PDF.
    Print(PrintCmd),
    /// Show or change the persisted settings.
    Config(ConfigCmd),
    /// List recorded print jobs.
    Jobs(JobsCmd),
}

#[derive(Parser, Debug)]
struct EditCmd {
    /// Image to edit.
    input: PathBuf,

    /// Output image path. Saved to the exports directory when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    edit: EditArgs,
}

#[derive(Parser, Debug)]
struct PrintCmd {
    /// Image to print.
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = LayoutChoice::Single)]
    layout: LayoutChoice,

    /// Preview zoom, 0.5 to 5.
    #[arg(long)]
    scale: Option<f32>,

    /// Horizontal pan in viewport units.
    #[arg(long, allow_hyphen_values = true)]
    pan_x: Option<f32>,

    /// Vertical pan in viewport units.
    #[arg(long, allow_hyphen_values = true)]
    pan_y: Option<f32>,

    /// Preview viewport the scale and pan refer to, as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<ViewportSize>,

    /// Override the print canvas size, as WIDTHxHEIGHT pixels.
    #[arg(long, value_parser = parse_canvas)]
    canvas: Option<PixelSize>,

    /// Directory for the PDF. Defaults to the prints directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Job name. Generated from the layout and time when omitted.
    #[arg(long)]
    job_name: Option<String>,

    #[command(flatten)]
    edit: EditArgs,
}

#[derive(Parser, Debug)]
struct ConfigCmd {
    /// Restore every setting to its default first.
    #[arg(long)]
    reset: bool,

    #[arg(long)]
    dpi: Option<u32>,

    #[arg(long, value_enum)]
    paper: Option<PaperChoice>,

    #[arg(long)]
    debounce_ms: Option<u64>,

    #[arg(long)]
    preview_max: Option<u32>,

    #[arg(long)]
    crop_mark_length: Option<u32>,

    #[arg(long)]
    crop_mark_thickness: Option<u32>,

    /// Grain texture for the dotwork composite.
    #[arg(long)]
    grain: Option<PathBuf>,

    #[arg(long)]
    job_prefix: Option<String>,
}

#[derive(Parser, Debug)]
struct JobsCmd {
    /// Maximum number of jobs to list.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let services = AppServices::init(cli.data_dir.as_deref()).context("initialise app services")?;
    info!(data_dir = %services.data_dir().display(), "TSP starting");

    match cli.cmd {
        Command::Edit(cmd) => cmd_edit(&services, cmd).await,
        Command::Print(cmd) => cmd_print(&services, cmd).await,
        Command::Config(cmd) => cmd_config(&services, cmd),
        Command::Jobs(cmd) => cmd_jobs(&services, cmd),
    }
}

/// Run `edit` over `input` and return the committed full-resolution result.
async fn edited_image(services: &AppServices, input: &Path, edit: &EditArgs) -> anyhow::Result<(Editor, RgbaImage)> {
    let image = services
        .load_image(input)
        .with_context(|| format!("load image '{}'", input.display()))?;
    let mut editor = Editor::new(services.spawn_editor());
    for event in edit.events(image)? {
        editor.dispatch(event);
    }
    for notice in editor.take_notices() {
        eprintln!("{notice}");
    }
    info!(version = editor.state().version, mode = %editor.state().mode, "Edits queued");

    let shown = editor.settle().await.context("editor stopped before finishing")?;
    if let Some(notice) = &shown.notification {
        eprintln!("{notice}");
    }
    let committed = shown
        .committed
        .context("the pipeline produced no image")?;
    Ok((editor, Arc::unwrap_or_clone(committed)))
}

async fn cmd_edit(services: &AppServices, cmd: EditCmd) -> anyhow::Result<()> {
    let (mut editor, committed) = edited_image(services, &cmd.input, &cmd.edit).await?;

    editor.dispatch(EditEvent::SaveRequested);
    for notice in editor.take_notices() {
        eprintln!("{notice}");
    }
    if editor.take_save_request() {
        match &cmd.out {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create output dir '{}'", parent.display()))?;
                }
                raster::save(&committed, path)?;
                println!("{}", path.display());
            }
            None => {
                let saved = services.export_image(&committed).context("save to the image store")?;
                println!("{saved}");
            }
        }
    }
    editor.close().await;
    Ok(())
}

async fn cmd_print(services: &AppServices, cmd: PrintCmd) -> anyhow::Result<()> {
    let (mut editor, source) = edited_image(services, &cmd.input, &cmd.edit).await?;
    let print_type = PrintType::from(cmd.layout);
    editor.dispatch(EditEvent::PrintTypeSelected(print_type));
    let accepted = editor.take_print_request();
    editor.close().await;
    let print_type = accepted.context("no image to print")?;

    let config = services.config();
    let view = preview_view(&cmd, &source, print_type, &config);
    let job_name = cmd.job_name.clone().unwrap_or_else(|| {
        format!(
            "{} {} {}",
            config.job_name_prefix,
            print_type,
            chrono::Local::now().format("%Y-%m-%d %H%M%S")
        )
    });
    let request = PrintRequest {
        source: Arc::new(source),
        print_type,
        view,
        paper_size: config.paper_size,
        dpi: config.print_dpi,
        canvas_override: cmd.canvas,
        crop_marks: CropMarkStyle::from(&config),
        job_name: job_name.clone(),
    };

    let spooler = services.spooler(cmd.out_dir.as_deref())?;
    let output = spooler.output_path(&job_name);
    let task = PrintTask::spawn(request, Arc::new(spooler));
    let reporter = tokio::spawn(report_progress(task.progress()));

    let cancel = task.cancel_handle();
    let wait = task.wait();
    tokio::pin!(wait);
    let result = tokio::select! {
        result = &mut wait => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling print job");
            cancel.cancel();
            wait.await
        }
    };
    reporter.abort();

    let job = result.context("print job failed")?;
    services.record_job(&job).context("record print job")?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    match job.status {
        JobStatus::Completed => {
            eprintln!("wrote {}", output.display());
            Ok(())
        }
        JobStatus::Cancelled => anyhow::bail!("print job cancelled"),
        _ => anyhow::bail!(
            "print job failed: {}",
            job.error_message.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// The preview framing the print should reproduce. `None` prints the whole
/// image centred when no framing flags were given.
fn preview_view(
    cmd: &PrintCmd,
    source: &RgbaImage,
    print_type: PrintType,
    config: &tsp_core::AppConfig,
) -> Option<PreviewView> {
    if cmd.scale.is_none() && cmd.pan_x.is_none() && cmd.pan_y.is_none() && cmd.viewport.is_none() {
        return None;
    }
    // Without an explicit viewport, preview at the canvas' own proportions.
    let viewport = cmd.viewport.unwrap_or_else(|| {
        let canvas = canvas_size(print_type, config.paper_size, config.print_dpi, cmd.canvas);
        ViewportSize::new(canvas.width as f32, canvas.height as f32)
    });
    let mut transform = ViewTransform::default();
    let (width, height) = source.dimensions();
    transform.apply_gesture(
        cmd.scale.unwrap_or(1.0),
        Pan::new(cmd.pan_x.unwrap_or(0.0), cmd.pan_y.unwrap_or(0.0)),
        PixelSize::new(width, height),
        viewport,
    );
    Some(PreviewView { viewport, transform })
}

async fn report_progress(mut progress: watch::Receiver<PrintProgress>) {
    while progress.changed().await.is_ok() {
        let snapshot = progress.borrow_and_update().clone();
        info!(stage = ?snapshot.stage, percent = snapshot.percent, "{}", snapshot.message);
        if matches!(
            snapshot.stage,
            PrintStage::Complete | PrintStage::Failed | PrintStage::Cancelled
        ) {
            break;
        }
    }
}

fn cmd_config(services: &AppServices, cmd: ConfigCmd) -> anyhow::Result<()> {
    let mut config = if cmd.reset {
        tsp_core::AppConfig::default()
    } else {
        services.config()
    };
    let before = serde_json::to_value(&config)?;

    if let Some(dpi) = cmd.dpi {
        anyhow::ensure!(dpi > 0, "dpi must be positive");
        config.print_dpi = dpi;
    }
    if let Some(paper) = cmd.paper {
        config.paper_size = paper.into();
    }
    if let Some(ms) = cmd.debounce_ms {
        config.debounce_ms = ms;
    }
    if let Some(max) = cmd.preview_max {
        config.preview_max_dimension = max;
    }
    if let Some(length) = cmd.crop_mark_length {
        config.crop_mark_length_px = length;
    }
    if let Some(thickness) = cmd.crop_mark_thickness {
        config.crop_mark_thickness_px = thickness;
    }
    if let Some(grain) = cmd.grain {
        config.grain_texture = Some(grain);
    }
    if let Some(prefix) = cmd.job_prefix {
        config.job_name_prefix = prefix;
    }

    if cmd.reset || serde_json::to_value(&config)? != before {
        services.save_config(&config).context("save config")?;
        info!("Config saved");
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_jobs(services: &AppServices, cmd: JobsCmd) -> anyhow::Result<()> {
    let jobs = services.recent_jobs(cmd.limit);
    if jobs.is_empty() {
        eprintln!("no print jobs recorded");
        return Ok(());
    }
    for job in jobs {
        let status = format!("{:?}", job.status);
        println!(
            "{}  {:<9}  {:<6}  {:>2} pages  {}{}",
            job.created_at.format("%Y-%m-%d %H:%M"),
            status,
            job.print_type.label(),
            job.page_count,
            job.job_name,
            job.error_message
                .map(|e| format!("  ({e})"))
                .unwrap_or_default(),
        );
    }
    Ok(())
}
