use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::{de::DeserializeOwned, Serialize};
use spat_control_core::{
    ControllerConfig, ElevationSourceLink, ElevationTrajectoryType, OriginOfChange, PlayheadInfo, Point,
    PositionSourceLink, PositionTrajectoryType, PresetBank, SourceIndex, SpatController, SpatError, SpatMode,
};
use tracing_subscriber::EnvFilter;

fn main() -> spat_control_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::Presets { bank, command } => run_presets(&bank, command),
    }
}

fn run_simulate(args: &SimulateArgs) -> spat_control_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    config.number_of_sources = args.sources;
    config.spat_mode = args.mode.into();
    config.position_trajectory.cycle_duration = args.cycle_duration;
    config.elevation_trajectory.cycle_duration = args.cycle_duration;
    config.validate()?;

    let bank = match &args.presets {
        Some(path) => PresetBank::load(path)?,
        None => PresetBank::new(),
    };
    let mut controller = SpatController::with_presets(config, bank)?;
    match args.preset {
        Some(slot) => {
            if !controller.force_load_preset(slot) {
                return Err(SpatError::MissingPreset(slot));
            }
        }
        None => {
            controller.set_source_position(
                SourceIndex::PRIMARY,
                Point::new(args.start_x, args.start_y),
                OriginOfChange::UserAnchorMove,
            );
        }
    }
    let link = controller.set_position_link(args.link);
    controller.set_elevation_link(args.elevation_link);
    controller.set_position_trajectory_type(args.trajectory);
    controller.set_elevation_trajectory_type(args.elevation_trajectory);
    let position = controller.position_trajectory_mut();
    position.set_back_and_forth(args.back_and_forth);
    position.set_dampening_cycles(args.dampening);
    position.set_deviation_per_cycle(args.deviation);
    let elevation = controller.elevation_trajectory_mut();
    elevation.set_back_and_forth(args.back_and_forth);
    elevation.set_dampening_cycles(args.dampening);
    controller.set_position_activate_state(true);
    controller.set_elevation_activate_state(true);

    let rate = args.rate.max(1.0);
    let steps = (args.seconds * rate).round() as u64;
    tracing::info!(%link, trajectory = %args.trajectory, steps, "running simulation");

    for step in 0..=steps {
        let time = step as f64 / rate;
        controller.process_block(PlayheadInfo::playing(time));
        controller.timer_callback();
        let frame = Frame {
            time,
            sources: controller
                .sources()
                .iter()
                .map(|source| FrameSource {
                    id: source.id().get(),
                    x: source.x(),
                    y: source.y(),
                    elevation: source.elevation().as_degrees(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string(&frame)?);
    }

    controller.process_block(PlayheadInfo::stopped(args.seconds));
    let messages = controller.drain_host_messages();
    tracing::info!(host_messages = messages.len(), "simulation finished");
    Ok(())
}

fn run_presets(bank_path: &Path, command: PresetCommand) -> spat_control_core::Result<()> {
    let mut bank = if bank_path.exists() {
        PresetBank::load(bank_path)?
    } else {
        PresetBank::new()
    };

    match command {
        PresetCommand::List => {
            for record in bank.presets() {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        PresetCommand::Delete { slot } => {
            if bank.remove(slot) {
                bank.save(bank_path)?;
                tracing::info!(slot, "preset removed from bank");
            } else {
                tracing::warn!(slot, "no preset in slot");
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses the kebab-case name a core enum serializes to.
fn parse_kebab<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_owned())).map_err(|error| error.to_string())
}

#[derive(Serialize)]
struct Frame {
    time: f64,
    sources: Vec<FrameSource>,
}

#[derive(Serialize)]
struct FrameSource {
    id: i32,
    x: f32,
    y: f32,
    elevation: f32,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-source spatialization controller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play trajectories against a simulated host and print one JSON line per tick.
    Simulate(SimulateArgs),
    /// Inspect or edit a preset bank file.
    Presets {
        /// Path to the JSON preset bank.
        #[arg(short, long)]
        bank: PathBuf,
        #[command(subcommand)]
        command: PresetCommand,
    },
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Optional controller configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of active sources.
    #[arg(short, long, default_value_t = 2)]
    sources: usize,
    #[arg(long, value_enum, default_value_t = ModeArg::Dome)]
    mode: ModeArg,
    /// Position link, e.g. `circular` or `delta-lock`.
    #[arg(long, value_parser = parse_kebab::<PositionSourceLink>, default_value = "independent")]
    link: PositionSourceLink,
    #[arg(long, value_parser = parse_kebab::<ElevationSourceLink>, default_value = "independent")]
    elevation_link: ElevationSourceLink,
    /// Position trajectory, e.g. `circle-clockwise`.
    #[arg(long, value_parser = parse_kebab::<PositionTrajectoryType>, default_value = "circle-clockwise")]
    trajectory: PositionTrajectoryType,
    #[arg(long, value_parser = parse_kebab::<ElevationTrajectoryType>, default_value = "realtime")]
    elevation_trajectory: ElevationTrajectoryType,
    /// Starting position of the primary source when no preset is recalled.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    start_x: f32,
    #[arg(long, default_value_t = -0.7, allow_hyphen_values = true)]
    start_y: f32,
    /// Seconds per trajectory cycle.
    #[arg(long, default_value_t = 5.0)]
    cycle_duration: f64,
    /// Reverse the trajectory every other cycle.
    #[arg(long)]
    back_and_forth: bool,
    /// Cycles over which the trajectory decays onto its anchor, 0 for none.
    #[arg(long, default_value_t = 0)]
    dampening: u32,
    /// Degrees the position trajectory turns after each cycle.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    deviation: f32,
    /// Simulated playback length in seconds.
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,
    /// Control ticks per second.
    #[arg(long, default_value_t = 50.0)]
    rate: f64,
    /// Preset bank to recall from.
    #[arg(long)]
    presets: Option<PathBuf>,
    /// Preset slot recalled before playback.
    #[arg(long, requires = "presets")]
    preset: Option<i32>,
}

#[derive(Subcommand, Debug)]
enum PresetCommand {
    /// Print every saved preset as a JSON line.
    List,
    /// Remove one slot from the bank.
    Delete { slot: i32 },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Dome,
    Cube,
}

impl From<ModeArg> for SpatMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Dome => SpatMode::Dome,
            ModeArg::Cube => SpatMode::Cube,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spat_control_core::{PresetRecord, PresetSource};

    #[test]
    fn parses_kebab_case_names() {
        assert_eq!(
            parse_kebab::<PositionSourceLink>("circular-fixed-radius").unwrap(),
            PositionSourceLink::CircularFixedRadius
        );
        assert_eq!(
            parse_kebab::<PositionTrajectoryType>("spiral-clockwise-in-out").unwrap(),
            PositionTrajectoryType::SpiralClockwiseInOut
        );
        assert!(parse_kebab::<PositionSourceLink>("orbit").is_err());
    }

    #[test]
    fn cli_accepts_simulation_arguments() {
        let cli = Cli::try_parse_from([
            "spat-control",
            "simulate",
            "--sources",
            "4",
            "--link",
            "circular",
            "--mode",
            "cube",
            "--dampening",
            "2",
            "--deviation",
            "-15",
            "--back-and-forth",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.sources, 4);
        assert_eq!(args.link, PositionSourceLink::Circular);
        assert!(matches!(args.mode, ModeArg::Cube));
        assert_eq!(args.dampening, 2);
        assert_eq!(args.deviation, -15.0);
        assert!(args.back_and_forth);
    }

    #[test]
    fn simulate_fails_on_a_missing_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        PresetBank::new().save(&path).unwrap();

        let cli = Cli::try_parse_from([
            "spat-control",
            "simulate",
            "--presets",
            path.to_str().unwrap(),
            "--preset",
            "9",
            "--seconds",
            "0",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };

        assert!(matches!(run_simulate(&args), Err(SpatError::MissingPreset(9))));
    }

    #[test]
    fn delete_rewrites_the_bank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let mut bank = PresetBank::new();
        for id in [2, 7] {
            bank.insert(PresetRecord {
                id,
                sources: vec![PresetSource { x: 0.0, y: 0.0, z: None }],
                terminal: PresetSource { x: 0.0, y: 0.0, z: None },
            });
        }
        bank.save(&path).unwrap();

        run_presets(&path, PresetCommand::Delete { slot: 2 }).unwrap();

        let ids: Vec<i32> = PresetBank::load(&path).unwrap().presets().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7]);
    }
}
