//! paper-anchor CLI: run the alignment pipeline on image files.

use clap::{Args, Parser, Subcommand};
use nalgebra::Point3;
use paper_anchor::aruco::builtins::builtin_dictionary;
use paper_anchor::board::{render_board, BoardPainter};
use paper_anchor::core::{level_from_verbosity, WorldPose};
use paper_anchor::imageio::{gray_to_image, load_frame, save_frame};
use paper_anchor::pose::EulerDegrees;
use paper_anchor::{AnchorConfig, AnchorMode, PaperAnchor, TickOutput};
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "paper-anchor")]
#[command(about = "Locate a four-marker paper page in camera images")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the page's world pose in an image and print the tick report.
    Pose(PoseArgs),

    /// Warp a reference image onto the page seen in an image.
    Project(ProjectArgs),

    /// Render the printable four-marker page.
    RenderBoard(RenderArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// JSON configuration; defaults apply to every missing field.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> CliResult<AnchorConfig> {
        Ok(match &self.config {
            Some(path) => AnchorConfig::load_json(path)?,
            None => AnchorConfig::default(),
        })
    }
}

#[derive(Debug, Clone, Args)]
struct PoseArgs {
    /// Camera frame to process.
    #[arg(long)]
    image: PathBuf,

    /// Where to write the JSON report (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Eye position in world coordinates (meters).
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [0.0, 0.0, 0.0],
        allow_hyphen_values = true
    )]
    eye_position: Vec<f64>,

    /// Eye orientation as Euler degrees x,y,z (applied z, x, y).
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [0.0, 0.0, 0.0],
        allow_hyphen_values = true
    )]
    eye_euler: Vec<f64>,

    #[command(flatten)]
    config: ConfigArgs,
}

impl PoseArgs {
    fn eye(&self) -> CliResult<WorldPose> {
        let [px, py, pz] = triple(&self.eye_position, "--eye-position")?;
        let [ex, ey, ez] = triple(&self.eye_euler, "--eye-euler")?;
        Ok(WorldPose::new(
            Point3::new(px, py, pz),
            EulerDegrees::new(ex, ey, ez).to_quaternion(),
        ))
    }
}

fn triple(values: &[f64], flag: &str) -> CliResult<[f64; 3]> {
    <[f64; 3]>::try_from(values).map_err(|_| format!("{flag} takes three values").into())
}

#[derive(Debug, Clone, Args)]
struct ProjectArgs {
    /// Camera frame to process.
    #[arg(long)]
    image: PathBuf,

    /// Image warped onto the page.
    #[arg(long)]
    reference: PathBuf,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Optional JSON report path.
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Debug, Clone, Args)]
struct RenderArgs {
    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Resolution of the printed page.
    #[arg(long, default_value_t = 2000.0)]
    px_per_meter: f64,

    /// Blank margin around the page, pixels.
    #[arg(long, default_value_t = 0)]
    margin: usize,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = level_from_verbosity(verbose);
    // A logger may already be installed; keep the first one.
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init_with_filter(level);
        paper_anchor::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = paper_anchor::core::init_with_level(level);
    }
}

fn run(command: Commands) -> CliResult<()> {
    match command {
        Commands::Pose(args) => run_pose(&args),
        Commands::Project(args) => run_project(&args),
        Commands::RenderBoard(args) => run_render(&args),
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&AnchorConfig::default())?);
            Ok(())
        }
    }
}

fn run_pose(args: &PoseArgs) -> CliResult<()> {
    let mut cfg = args.config.load()?;
    cfg.mode = AnchorMode::Pose;
    let anchor = PaperAnchor::new(cfg)?;
    let frame = load_frame(&args.image)?;
    let eye = args.eye()?;

    let (report, result) = anchor.tick_report(&frame.view(), &eye);
    match &args.out {
        Some(path) => {
            report.write_json(path)?;
            log::info!("wrote report to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    result?;
    Ok(())
}

fn run_project(args: &ProjectArgs) -> CliResult<()> {
    let mut cfg = args.config.load()?;
    cfg.mode = AnchorMode::Project;
    let mut anchor = PaperAnchor::new(cfg)?;
    anchor.set_reference(load_frame(&args.reference)?);
    let frame = load_frame(&args.image)?;

    let (report, result) = anchor.tick_report(&frame.view(), &WorldPose::identity());
    if let Some(path) = &args.report {
        report.write_json(path)?;
    }
    let TickOutput::Image(warped) = result? else {
        return Err("projection produced no image".into());
    };
    save_frame(&warped, &args.out)?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn run_render(args: &RenderArgs) -> CliResult<()> {
    let cfg = args.config.load()?;
    let dict = builtin_dictionary(&cfg.detector.dictionary)
        .ok_or_else(|| format!("unknown dictionary {}", cfg.detector.dictionary))?;
    let painter = BoardPainter::new(&cfg.board, &cfg.role_map, &dict);
    let page = render_board(&painter, args.px_per_meter, args.margin)?;
    let img = gray_to_image(&page).ok_or("rendered page has inconsistent size")?;
    img.save(&args.out)?;
    println!(
        "wrote {}x{} page to {}",
        page.width,
        page.height,
        args.out.display()
    );
    Ok(())
}
