//! Plain-text reports for the grid homeworks: value tables, policies, convergence of the
//! DP solvers and smoothed TD learning curves. Results can also be exported as JSON.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::grid::{Action, Cell, Layout, Policy, Position, ValueTable};
use crate::planning::Solution;
use crate::td::{q_to_v, TdOutcome};
use crate::utils::Reward;

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Value table as a grid; walls print as blocks, unvisited cells as dots
pub fn render_values(layout: &Layout, values: &ValueTable) -> String {
    let mut out = String::new();
    for r in 0..layout.height() {
        for c in 0..layout.width() {
            let cell = match (layout.get((r, c)), values.get(&(r, c))) {
                (Some(Cell::Wall), _) => format!("{:>8}", "████"),
                (_, Some(v)) => format!("{:>8.2}", v),
                (_, None) => format!("{:>8}", "·"),
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

/// Policy as a grid of arrows
pub fn render_policy(layout: &Layout, policy: &Policy) -> String {
    let mut out = String::new();
    for r in 0..layout.height() {
        for c in 0..layout.width() {
            let symbol = match (layout.get((r, c)), policy.get(&(r, c))) {
                (Some(Cell::Goal), _) => 'G',
                (Some(Cell::Wall), _) => '█',
                (_, Some(a)) => a.arrow(),
                (Some(cell), None) => cell.symbol(),
                (None, None) => ' ',
            };
            out.push(symbol);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// `n` evenly spaced entries of a history, always including the first and the last
pub fn value_snapshots(history: &[ValueTable], n: usize) -> Vec<(usize, &ValueTable)> {
    if history.is_empty() || n == 0 {
        return vec![];
    }
    let last = history.len() - 1;
    let mut picks: Vec<usize> = if n == 1 {
        vec![last]
    } else {
        (0..n).map(|k| ((k * last) as f64 / (n - 1) as f64).round() as usize).collect()
    };
    picks.dedup();
    picks.into_iter().map(|i| (i, &history[i])).collect()
}

/// Value of the start state after every iteration
pub fn start_value_curve(history: &[ValueTable], start: Position) -> Vec<Reward> {
    history.iter().map(|v| v.get(&start).copied().unwrap_or(0.0)).collect()
}

fn sparkline(values: &[Reward]) -> String {
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    values
        .iter()
        .map(|&v| {
            if span <= f64::EPSILON {
                SPARKS[SPARKS.len() - 1]
            } else {
                SPARKS[(((v - lo) / span) * (SPARKS.len() - 1) as f64).round() as usize]
            }
        })
        .collect()
}

/// Start-state value per iteration of each solver, compared to the optimum
pub fn render_convergence(curves: &[(&str, Vec<Reward>)], v_star: Reward) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "V*(start) = {:.4}", v_star);
    for (name, curve) in curves {
        let Some(&last) = curve.last() else { continue };
        let _ = writeln!(
            out,
            "{:<28} {:>5} iterations  final {:>9.4}  gap {:.2e}  {}",
            name,
            curve.len().saturating_sub(1),
            last,
            (last - v_star).abs(),
            sparkline(curve)
        );
    }
    out
}

/// "Valid" moving average; histories shorter than the window are returned unchanged
pub fn moving_average(history: &[Reward], window: usize) -> Vec<Reward> {
    if window <= 1 || history.len() < window {
        return history.to_vec();
    }
    history.windows(window).map(|w| w.iter().sum::<Reward>() / window as f64).collect()
}

/// One line per algorithm: first, last and best smoothed episode reward
pub fn render_learning_curves(curves: &[(&str, &[Reward])], window: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Episode reward, moving average over {} episodes", window);
    for (name, history) in curves {
        let smooth = moving_average(history, window);
        let (Some(&first), Some(&last)) = (smooth.first(), smooth.last()) else { continue };
        let best = smooth.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        // keep the sparkline readable on long runs
        let stride = smooth.len().div_ceil(60).max(1);
        let sampled: Vec<Reward> = smooth.iter().step_by(stride).copied().collect();
        let _ = writeln!(
            out,
            "{:<16} first {:>9.2}  last {:>9.2}  best {:>9.2}  {}",
            name,
            first,
            last,
            best,
            sparkline(&sampled)
        );
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellValue {
    pub row: usize,
    pub col: usize,
    pub value: Reward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellAction {
    pub row: usize,
    pub col: usize,
    pub action: Action,
}

/// Serializable summary of one solver or learner run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub algorithm: String,
    pub layout: Vec<Vec<u8>>,
    pub values: Vec<CellValue>,
    pub policy: Vec<CellAction>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub iterations: Option<usize>,
    /// Start-state value per sweep (DP) or reward per episode (TD)
    pub history: Vec<Reward>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<Vec<Position>>,
}

fn cell_values(values: &ValueTable) -> Vec<CellValue> {
    values.iter().map(|(&(row, col), &value)| CellValue { row, col, value }).collect()
}

fn cell_actions(policy: &Policy) -> Vec<CellAction> {
    policy.iter().map(|(&(row, col), &action)| CellAction { row, col, action }).collect()
}

impl RunReport {
    pub fn from_solution(algorithm: &str, layout: &Layout, solution: &Solution) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            layout: layout.rows(),
            values: cell_values(&solution.values),
            policy: cell_actions(&solution.policy),
            iterations: Some(solution.iterations),
            history: start_value_curve(&solution.history, layout.start()),
            path: None,
        }
    }

    pub fn from_td(layout: &Layout, outcome: &TdOutcome) -> Self {
        Self {
            algorithm: outcome.algorithm.name().to_string(),
            layout: layout.rows(),
            values: cell_values(&q_to_v(&outcome.q_table)),
            policy: cell_actions(&outcome.policy),
            iterations: None,
            history: outcome.history.clone(),
            path: None,
        }
    }

    pub fn from_path(algorithm: &str, layout: &Layout, path: Option<Vec<Position>>) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            layout: layout.rows(),
            values: vec![],
            policy: vec![],
            iterations: None,
            history: vec![],
            path,
        }
    }
}

pub fn write_json(path: &Path, reports: &[RunReport]) -> Result<(), ReportError> {
    std::fs::write(path, serde_json::to_string_pretty(reports)?)?;
    Ok(())
}
