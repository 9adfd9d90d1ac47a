/// Solve a grid maze with dynamic programming and graph search.
///
/// Usage:
///   cargo run --release --bin maze -- --layout maze3 --seed 7 --json maze.json
///
/// Runs value iteration, policy iteration and truncated policy iteration on the layout,
/// then checks the shortest path with BFS and A*.
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rlgt::config::AppConfig;
use rlgt::grid::layout::presets;
use rlgt::grid::{GridEnv, Layout, MazeEnv};
use rlgt::planning::{astar, bfs, follow_policy, policy_iteration, truncated_policy_iteration, value_iteration, Solution};
use rlgt::report::{
    render_convergence, render_policy, render_values, start_value_curve, value_snapshots, write_json, RunReport,
};

#[derive(Parser)]
#[command(name = "maze", about = "Solve a grid maze with DP and graph search")]
struct Cli {
    /// Built-in layout name
    #[arg(long, default_value = presets::DEFAULT_MAZE, conflicts_with = "layout_file")]
    layout: String,

    /// Layout file with one row of cell codes per line
    #[arg(long)]
    layout_file: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Seed for the random initial policies
    #[arg(long)]
    seed: Option<u64>,

    /// Write the results as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Value-table snapshots to print per solver
    #[arg(long, default_value_t = 3)]
    snapshots: usize,
}

fn print_solution(name: &str, env: &MazeEnv, solution: &Solution, snapshots: usize) {
    println!("── {} ({} iterations) ──", name, solution.iterations);
    for (i, values) in value_snapshots(&solution.history, snapshots) {
        println!("Values after iteration {}:", i);
        print!("{}", render_values(env.layout(), values));
    }
    println!("Policy:");
    print!("{}", render_policy(env.layout(), &solution.policy));
    let rollout = follow_policy(env, &solution.policy, env.states().len());
    if rollout.reached_goal {
        println!("✅ Reaches the goal in {} steps, return {:.1}\n", rollout.path.len() - 1, rollout.total_reward);
    } else {
        println!("⚠️ Policy does not reach the goal\n");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)?;
    let layout = match &cli.layout_file {
        Some(path) => Layout::load(path)?,
        None => Layout::preset(&cli.layout)?,
    };
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let env = MazeEnv::new(layout, config.rewards.maze);

    println!("🧭 Maze {}x{}", env.layout().height(), env.layout().width());
    println!("{}", env.layout());
    println!("  γ = {}, θ = {:e}, truncation = {}\n", config.maze.gamma, config.maze.theta, config.maze.truncation);

    let vi = value_iteration(&env, &config.maze)?;
    let pi = policy_iteration(&env, &config.maze, &mut rng)?;
    let tpi = truncated_policy_iteration(&env, &config.maze, &mut rng)?;
    let solvers = [("Value iteration", &vi), ("Policy iteration", &pi), ("Truncated policy iteration", &tpi)];
    for (name, solution) in solvers {
        print_solution(name, &env, solution, cli.snapshots);
    }

    let start = env.start();
    let v_star = vi.values.get(&start).copied().unwrap_or(0.0);
    let curves: Vec<(&str, Vec<f64>)> =
        solvers.iter().map(|(name, s)| (*name, start_value_curve(&s.history, start))).collect();
    println!("📈 Convergence of the start value");
    print!("{}", render_convergence(&curves, v_star));

    let shortest = bfs(env.layout());
    let astar_path = astar(env.layout());
    println!();
    for (name, path) in [("BFS", &shortest), ("A*", &astar_path)] {
        match path {
            Some(p) => println!("🔎 {}: shortest path has {} moves: {:?}", name, p.len() - 1, p),
            None => println!("🔎 {}: goal unreachable", name),
        }
    }

    if let Some(path) = &cli.json {
        let mut reports: Vec<RunReport> =
            solvers.iter().map(|(name, s)| RunReport::from_solution(name, env.layout(), s)).collect();
        reports.push(RunReport::from_path("BFS", env.layout(), shortest));
        reports.push(RunReport::from_path("A*", env.layout(), astar_path));
        write_json(path, &reports)?;
        println!("💾 Results written to {}", path.display());
    }
    Ok(())
}
