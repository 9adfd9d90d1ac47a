/// Temporal-difference control on the cliff walk.
///
/// Usage:
///   cargo run --release --bin cliffwalk -- --algorithm sarsa --algorithm q-learning --episodes 500
///
/// Without `--algorithm` every algorithm runs: SARSA, Expected SARSA, n-step SARSA and Q-learning.
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rlgt::config::AppConfig;
use rlgt::grid::layout::presets;
use rlgt::grid::{CliffWalkEnv, GridEnv, Layout};
use rlgt::planning::follow_policy;
use rlgt::report::{render_learning_curves, render_policy, render_values, write_json, RunReport};
use rlgt::td::{q_to_v, TdAlgorithm};

#[derive(Parser)]
#[command(name = "cliffwalk", about = "Run TD control algorithms on the cliff walk")]
struct Cli {
    /// Built-in layout name
    #[arg(long, default_value = presets::DEFAULT_CLIFFWALK, conflicts_with = "layout_file")]
    layout: String,

    /// Layout file with one row of cell codes per line
    #[arg(long)]
    layout_file: Option<PathBuf>,

    /// Algorithms to run (repeatable)
    #[arg(long, value_enum)]
    algorithm: Vec<TdAlgorithm>,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(long)]
    seed: Option<u64>,

    /// Write the results as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(episodes) = cli.episodes {
        config.td.episodes = episodes;
        config.validate()?;
    }
    let layout = match &cli.layout_file {
        Some(path) => Layout::load(path)?,
        None => Layout::preset(&cli.layout)?,
    };
    let algorithms = if cli.algorithm.is_empty() { TdAlgorithm::ALL.to_vec() } else { cli.algorithm.clone() };
    let env = CliffWalkEnv::new(layout, config.rewards.cliff);

    println!("🧗 Cliff walk {}x{}", env.layout().height(), env.layout().width());
    println!("{}", env.layout());
    let td = &config.td;
    println!(
        "  episodes = {}, α = {}, γ = {}, ε = {}, n = {}\n",
        td.episodes, td.alpha, td.gamma, td.epsilon, td.n_steps
    );

    let mut outcomes = Vec::with_capacity(algorithms.len());
    for (i, algorithm) in algorithms.iter().enumerate() {
        // every algorithm gets its own stream so results do not depend on the run order
        let mut rng = match cli.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
            None => StdRng::from_os_rng(),
        };
        let outcome = algorithm.run(&env, td, &mut rng);

        println!("── {} ──", algorithm);
        println!("Greedy policy:");
        print!("{}", render_policy(env.layout(), &outcome.policy));
        println!("State values max_a Q(s, a):");
        print!("{}", render_values(env.layout(), &q_to_v(&outcome.q_table)));
        let rollout = follow_policy(&env, &outcome.policy, td.max_steps_per_episode);
        match (rollout.reached_goal, rollout.falls) {
            (true, 0) => println!("✅ Greedy path reaches the goal in {} steps\n", rollout.path.len() - 1),
            (true, falls) => println!("⚠️ Greedy path reaches the goal after {} falls\n", falls),
            (false, _) => println!("⚠️ Greedy path does not reach the goal\n"),
        }
        outcomes.push(outcome);
    }

    let curves: Vec<(&str, &[f64])> = outcomes.iter().map(|o| (o.algorithm.name(), o.history.as_slice())).collect();
    println!("📈 Learning curves");
    print!("{}", render_learning_curves(&curves, td.smoothing_window));

    if let Some(path) = &cli.json {
        let reports: Vec<RunReport> = outcomes.iter().map(|o| RunReport::from_td(env.layout(), o)).collect();
        write_json(path, &reports)?;
        println!("💾 Results written to {}", path.display());
    }
    Ok(())
}
