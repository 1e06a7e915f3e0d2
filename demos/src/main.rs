//! Quadcopter DDPG command-line interface.
//!
//! ```text
//! quad-ddpg print-config > train.toml
//! quad-ddpg train --config train.toml --csv episodes.csv
//! quad-ddpg evaluate --config train.toml --episodes 5
//! quad-ddpg hover --speed 404
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::Autodiff;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quad_ddpg::{
    evaluate, train, CSVLogger, Checkpointer, ConsoleLogger, DDPGAgent, MultiLogger, Task,
    TrainingConfig,
};
use quadcopter_sim::{PhysicsSim, Simulator, HOVER_ROTOR_SPEED, NUM_ROTORS};

#[cfg(not(feature = "wgpu"))]
type B = Autodiff<burn::backend::NdArray<f32>>;
#[cfg(feature = "wgpu")]
type B = Autodiff<burn::backend::Wgpu>;

#[derive(Parser)]
#[command(name = "quad-ddpg")]
#[command(version, about = "DDPG quadcopter control", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an agent and write checkpoints
    Train {
        /// TOML training config (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of episodes
        #[arg(long)]
        episodes: Option<usize>,

        /// Override the checkpoint directory
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Write one CSV row per episode
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Override the agent seed
        #[arg(long)]
        seed: Option<u64>,

        /// Console summary every N episodes
        #[arg(long, default_value = "10")]
        log_interval: usize,
    },

    /// Run greedy episodes with checkpointed networks
    Evaluate {
        /// TOML training config the checkpoints were trained with
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the checkpoint directory
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Use the latest checkpoint instead of the best one
        #[arg(long)]
        latest: bool,

        /// Number of episodes
        #[arg(long, default_value = "5")]
        episodes: usize,
    },

    /// Fly the bare simulator at a constant rotor speed
    Hover {
        /// Rotor speed (rev/s) for all rotors
        #[arg(long)]
        speed: Option<f32>,

        /// Print the pose every N steps
        #[arg(long, default_value = "25")]
        every: usize,
    },

    /// Print the default training config as TOML
    PrintConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            episodes,
            checkpoint_dir,
            csv,
            seed,
            log_interval,
        } => {
            let mut config = load_config(config)?;
            if let Some(n) = episodes {
                config.runner.num_episodes = n;
            }
            if let Some(dir) = checkpoint_dir {
                config.checkpoint.checkpoint_dir = dir;
            }
            if let Some(seed) = seed {
                config.agent.seed = seed;
            }
            run_train(config, csv, log_interval)?;
        }
        Commands::Evaluate {
            config,
            checkpoint_dir,
            latest,
            episodes,
        } => {
            let mut config = load_config(config)?;
            if let Some(dir) = checkpoint_dir {
                config.checkpoint.checkpoint_dir = dir;
            }
            run_evaluate(config, latest, episodes)?;
        }
        Commands::Hover { speed, every } => {
            hover(speed.unwrap_or(HOVER_ROTOR_SPEED), every.max(1))?;
        }
        Commands::PrintConfig => {
            print!("{}", TrainingConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<TrainingConfig> {
    match path {
        Some(path) => TrainingConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let config = TrainingConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run_train(config: TrainingConfig, csv: Option<PathBuf>, log_interval: usize) -> Result<()> {
    let device = Default::default();
    let mut task = Task::from_config(config.task.clone()).context("failed to build task")?;
    let mut agent = DDPGAgent::<B>::from_training_config(&config, &device)?;
    let mut checkpointer = Checkpointer::new(config.checkpoint.clone())
        .context("failed to create checkpoint directory")?;

    let mut logger = MultiLogger::new().add(ConsoleLogger::new(log_interval));
    if let Some(path) = csv {
        let csv_logger = CSVLogger::new(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        logger = logger.add(csv_logger);
    }

    let summary = train(
        &mut agent,
        &mut task,
        &config.runner,
        &mut logger,
        Some(&mut checkpointer),
    )?;

    log::info!(
        "{} episodes, best score {:.2}, final average {:.2}{}",
        summary.episodes,
        summary.best_score,
        summary.final_avg_score,
        if summary.solved { " (target reached)" } else { "" }
    );
    Ok(())
}

fn run_evaluate(config: TrainingConfig, latest: bool, episodes: usize) -> Result<()> {
    let device = Default::default();
    let mut task = Task::from_config(config.task.clone()).context("failed to build task")?;
    let mut agent = DDPGAgent::<B>::from_training_config(&config, &device)?;
    let checkpointer = Checkpointer::new(config.checkpoint.clone())?;

    let actor = config.actor_config().init::<B>(&device);
    let critic = config.critic_config().init::<B>(&device);
    let (actor, critic) = if latest {
        let (actor, critic, episode) = checkpointer
            .load_latest::<B, _, _>(actor, critic, &device)
            .context("no checkpoint to evaluate")?;
        log::info!("loaded checkpoint from episode {}", episode);
        (actor, critic)
    } else {
        checkpointer
            .load_best::<B, _, _>(actor, critic, &device)
            .context("no best checkpoint to evaluate")?
    };
    agent.load_models(actor, critic);

    let reports = evaluate(
        &mut agent,
        &mut task,
        episodes,
        config.runner.max_steps_per_episode,
    )?;
    let mean = reports.iter().map(|r| r.score).sum::<f32>() / reports.len().max(1) as f32;
    log::info!("mean score over {} episodes: {:.2}", reports.len(), mean);
    Ok(())
}

fn hover(speed: f32, every: usize) -> Result<()> {
    let config = TrainingConfig::default();
    let mut sim = PhysicsSim::new(config.task.sim).context("failed to build simulator")?;
    let speeds = [speed; NUM_ROTORS];

    let mut step = 0;
    loop {
        let done = sim.next_timestep(&speeds)?;
        step += 1;
        if step % every == 0 || done {
            let [x, y, z, roll, pitch, yaw] = sim.pose();
            log::info!(
                "t={:.2}s pos=({:.2}, {:.2}, {:.2}) att=({:.3}, {:.3}, {:.3})",
                sim.time(),
                x,
                y,
                z,
                roll,
                pitch,
                yaw
            );
        }
        if done {
            break;
        }
    }
    Ok(())
}
