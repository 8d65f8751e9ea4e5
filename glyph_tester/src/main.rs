use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gaze_glyph::{
    DataType, DisplaySize, EngineConfig, GlyphError, GlyphPayload, GlyphSession, ImageData,
    Outcome, OverlayKind, Rect, ViewAction, ViewState, compute_glyph_model,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Renders eye-tracking overlays and radial glyph summaries from exported records.
#[derive(Debug, Parser)]
#[command(name = "glyph_tester", version, about)]
struct Cli {
    /// TOML file overriding the engine defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a heatmap PNG for an image export.
    Heatmap {
        #[command(flatten)]
        view: ViewArgs,
        /// Where to write the PNG.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print density contours for an image export as JSON.
    Contours {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Analyze a data-space rectangle of an image export and print the glyph as JSON.
    Select {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
    },
    /// Compute the glyph for a selection payload and print it as JSON.
    Glyph {
        /// Payload with `data_for_analysis` / `fixations` and `participant_scores`.
        #[arg(short, long)]
        input: PathBuf,
    },
    /// List the participants of an image export.
    Participants {
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Image export with `gaze`, `fixations` and `participant_scores`.
    #[arg(short, long)]
    input: PathBuf,
    #[arg(long, default_value_t = 800.0)]
    display_width: f64,
    #[arg(long, default_value_t = 600.0)]
    display_height: f64,
    #[arg(long, value_enum, default_value_t = DataKind::Gaze)]
    data_type: DataKind,
    /// Restrict the overlay to one participant.
    #[arg(long)]
    participant: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DataKind {
    Gaze,
    Fixations,
}

impl From<DataKind> for DataType {
    fn from(kind: DataKind) -> Self {
        match kind {
            DataKind::Gaze => DataType::Gaze,
            DataKind::Fixations => DataType::Fixations,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Logging & Argument Parsing ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    // --- 2. Engine Configuration ---
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let session = GlyphSession::new(config)?;

    // --- 3. Command Dispatch ---
    match cli.command {
        Command::Heatmap { view, output } => {
            let state = open_view(&session, &view).await?;
            let state = state.apply(ViewAction::ToggleOverlay(OverlayKind::Heatmap));
            let rendered = session.render(&state).await?;
            let heatmap = rendered.heatmap.context("heatmap layer was not rendered")?;
            if heatmap.is_empty() {
                warn!("no in-bounds points; writing a transparent heatmap");
            }
            heatmap
                .save_png(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(
                "wrote {}x{} heatmap to {}",
                heatmap.raster.width(),
                heatmap.raster.height(),
                output.display()
            );
            info!(
                "saliency coverage {:.2}%, stationary entropy {:.3} bits",
                heatmap.metrics.saliency_coverage, heatmap.metrics.stationary_entropy
            );
        }
        Command::Contours { view } => {
            let state = open_view(&session, &view).await?;
            let state = state.apply(ViewAction::ToggleOverlay(OverlayKind::Contours));
            let rendered = session.render(&state).await?;
            let contours = rendered.contours.context("contour layer was not rendered")?;
            println!("{}", serde_json::to_string_pretty(&contours)?);
        }
        Command::Select {
            view,
            x,
            y,
            width,
            height,
        } => {
            let state = open_view(&session, &view).await?;
            let rect = Rect::new(x, y, width, height);
            let selected = state.apply(ViewAction::SelectArea(rect));
            if selected.area().is_none() {
                bail!(
                    "selection {width}x{height} is below the {}x{} minimum",
                    session.config().glyph.min_selection_width,
                    session.config().glyph.min_selection_height
                );
            }
            let rendered = session.render(&selected).await?;
            let glyph = rendered.glyph.context("no glyph for the selected area")?;
            println!("{}", serde_json::to_string_pretty(&glyph)?);
        }
        Command::Glyph { input } => {
            let text = read(&input)?;
            let payload = GlyphPayload::from_json(&text)?;
            let glyph = compute_glyph_model(&payload, &session.config().glyph);
            info!(
                "sanitized {} -> {} records",
                glyph.sanitize.before, glyph.sanitize.after
            );
            println!("{}", serde_json::to_string_pretty(&glyph)?);
        }
        Command::Participants { input } => {
            let data = ImageData::from_json(&read(&input)?)?;
            for id in data.participants() {
                let score = data
                    .scores
                    .get(&id)
                    .and_then(|info| info.valid_score())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{id}\t{score}");
            }
        }
    }
    Ok(())
}

/// Loads the export into the session and builds the initial view for it.
async fn open_view(session: &GlyphSession, args: &ViewArgs) -> Result<ViewState> {
    let data = ImageData::from_json(&read(&args.input)?)?;
    if data.report.gaze_dropped + data.report.fixations_dropped > 0 {
        warn!("dropped incomplete records: {:?}", data.report);
    }
    let ImageData {
        gaze,
        fixations,
        scores,
        ..
    } = data;
    let outcome = session
        .load_image(
            async { Ok::<_, GlyphError>(gaze) },
            async { Ok::<_, GlyphError>(fixations) },
            async { Ok::<_, GlyphError>(scores) },
        )
        .await?;
    if !matches!(outcome, Outcome::Applied(_)) {
        bail!("image load was superseded");
    }

    let display = DisplaySize::new(args.display_width, args.display_height)?;
    let state = ViewState::new(display, session.config())
        .apply(ViewAction::SetDataType(args.data_type.into()))
        .apply(ViewAction::SelectParticipant(args.participant.clone()));
    Ok(state)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
