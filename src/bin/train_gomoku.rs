/// Train the Gomoku policy/value network with AlphaZero self-play.
///
/// Usage:
///   cargo run --release --bin train_gomoku -- --config config.toml --iterations 1500
///
/// Checkpoints (`current_policy`, `best_policy` and `training_state.json`) are written to
/// the checkpoint directory every `check_freq` batches.
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use rlgt::config::AppConfig;
use rlgt::training::Trainer;

#[derive(Parser)]
#[command(name = "train_gomoku", about = "Train a Gomoku AlphaZero agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the number of self-play training batches
    #[arg(long)]
    iterations: Option<usize>,

    /// Start from these weights
    #[arg(long, conflicts_with = "resume")]
    init_model: Option<PathBuf>,

    /// Continue the run saved in the checkpoint directory
    #[arg(long)]
    resume: bool,

    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml()?);
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(iterations) = cli.iterations {
        config.training.game_batch_num = iterations;
    }
    if let Some(dir) = cli.checkpoint_dir {
        config.training.checkpoint_dir = dir;
    }
    if cli.seed.is_some() {
        config.training.seed = cli.seed;
    }
    config.validate()?;

    let board = config.gomoku;
    let training = &config.training;
    println!("⚫ Training Gomoku via AlphaZero self-play");
    println!("════════════════════════════════════");
    println!("  Board: {}x{}, {} in a row", board.width, board.height, board.n_in_row);
    println!("  Batches: {}", training.game_batch_num);
    println!("  Playouts per move: {}", config.alphazero.n_playout);
    println!("  Batch size: {}, buffer: {}", training.batch_size, training.buffer_size);
    println!("  Checkpoints: {}", training.checkpoint_dir.display());
    println!("════════════════════════════════════\n");

    let checkpoint_dir = training.checkpoint_dir.clone();
    let mut trainer = Trainer::new(board, config.alphazero.clone(), training.clone())?;
    if let Some(path) = &cli.init_model {
        trainer = trainer.with_model(path)?;
    } else if cli.resume {
        trainer = trainer.resume(&checkpoint_dir)?;
    }

    let best = trainer.run()?;
    let state = trainer.state();
    println!(
        "✅ Training complete after {} batches. Best win ratio {:.2} against pure MCTS with {} playouts",
        state.batches, best, state.pure_mcts_playouts
    );
    println!("   Models saved in {}", checkpoint_dir.display());
    Ok(())
}
