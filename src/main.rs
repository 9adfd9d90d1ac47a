use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use rand::Rng;

use rlgt::config::AppConfig;
use rlgt::games::Gomoku;
use rlgt::mcts::{pure_mcts_player, Agent, MctsPlayer};
use rlgt::neural::NetworkEvaluator;
use rlgt::utils::{Action, Game, Player};

/// Play Gomoku against the computer.
#[derive(Parser)]
#[command(name = "rlgt", about = "Play Gomoku against an MCTS or AlphaZero opponent")]
struct Cli {
    /// Trained network weights; pure MCTS is used without one
    #[arg(long)]
    model: Option<PathBuf>,

    /// Take the first move
    #[arg(long)]
    human_first: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the playouts per computer move
    #[arg(long)]
    playouts: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

/// Ask for "row col" until a legal move is entered; `None` when the human quits
fn read_move(game: &Gomoku, input: &mut impl BufRead) -> io::Result<Option<Action>> {
    loop {
        print!("Your move (row col, q to quit): ");
        io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        let coords: Vec<usize> =
            line.split(|c: char| c == ',' || c.is_whitespace()).filter_map(|s| s.parse().ok()).collect();
        let &[row, col] = coords.as_slice() else {
            println!("Please enter two numbers, e.g. `3 4`");
            continue;
        };
        match game.location_to_move(row, col) {
            Some(mv) if game.available_actions().contains(&mv) => return Ok(Some(mv)),
            _ => println!("({}, {}) is not a free cell", row, col),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if let Some(playouts) = cli.playouts {
        config.alphazero.n_playout = playouts;
    }
    config.validate()?;
    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());

    let mut game = Gomoku::new(config.gomoku)?;
    let mut computer: Box<dyn Agent<Gomoku>> = match &cli.model {
        Some(path) => {
            let evaluator = NetworkEvaluator::from_file(path, game.width(), game.height())?;
            println!("🧠 Loaded network from {}", path.display());
            Box::new(MctsPlayer::new(evaluator, config.alphazero.clone(), false, seed))
        }
        None => Box::new(pure_mcts_player(config.alphazero.c_puct, config.alphazero.n_playout, seed)),
    };
    let human = if cli.human_first { Player::P1 } else { Player::P2 };
    let stone = if human == Player::P1 { 'X' } else { 'O' };
    println!("⚫ Gomoku {}x{}, {} in a row. You are {} ({})", game.width(), game.height(), game.n_in_row(), human, stone);
    println!("   Opponent: {}\n", computer.name());

    computer.reset();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    while !game.is_over() {
        println!("{}\n", game);
        let action = if game.active_player() == human {
            match read_move(&game, &mut input)? {
                Some(mv) => mv,
                None => {
                    println!("Bye!");
                    return Ok(());
                }
            }
        } else {
            let mv = computer.choose_action(&game)?;
            let (row, col) = game.move_to_location(mv);
            println!("Computer plays: {} {}", row, col);
            mv
        };
        game.try_play(action)?;
    }

    println!("{}\n", game);
    match game.winner() {
        Some(p) if p == human => println!("🎉 You win!"),
        Some(_) => println!("🤖 The computer wins."),
        None => println!("🤝 Draw."),
    }
    Ok(())
}
