//! The four TD control algorithms. Each runs `cfg.episodes` episodes from the start cell
//! with an epsilon-greedy behaviour policy and returns the learned Q-table.

use std::collections::VecDeque;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::Rng;

use super::{QTable, TdAlgorithm, TdConfig, TdOutcome};
use crate::grid::{Action, GridEnv, Position};
use crate::utils::Reward;

fn episode_bar(cfg: &TdConfig, algorithm: TdAlgorithm) -> ProgressBar {
    if !cfg.progress {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(cfg.episodes as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg:>15} [{bar:40.cyan/blue}] {pos}/{len} episodes") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(algorithm.name());
    bar
}

fn finish<E: GridEnv>(
    env: &E,
    algorithm: TdAlgorithm,
    cfg: &TdConfig,
    q_table: QTable,
    history: Vec<Reward>,
    bar: ProgressBar,
) -> TdOutcome {
    bar.finish_and_clear();
    let tail = history.len().min(cfg.smoothing_window.max(1));
    if tail > 0 {
        let mean = history[history.len() - tail..].iter().sum::<Reward>() / tail as f64;
        info!("{} finished {} episodes, mean reward of the last {}: {:.2}", algorithm, history.len(), tail, mean);
    }
    let policy = q_table.greedy_policy(env);
    TdOutcome { algorithm, q_table, policy, history }
}

/// On-policy one-step SARSA: target `r + gamma * Q(s', a')` with `a'` drawn from the behaviour policy
pub fn sarsa<E: GridEnv, R: Rng + ?Sized>(env: &E, cfg: &TdConfig, rng: &mut R) -> TdOutcome {
    let mut q = QTable::new();
    let mut history = Vec::with_capacity(cfg.episodes);
    let bar = episode_bar(cfg, TdAlgorithm::Sarsa);

    for episode in 0..cfg.episodes {
        let mut state = env.start();
        let mut action = q.choose_action_epsilon_greedy(state, cfg.epsilon, rng);
        let mut total = 0.0;
        for _ in 0..cfg.max_steps_per_episode {
            let t = env.step(state, action);
            total += t.reward;
            if t.done {
                q.update(state, action, t.reward, cfg.alpha);
                break;
            }
            let next_action = q.choose_action_epsilon_greedy(t.next, cfg.epsilon, rng);
            let target = t.reward + cfg.gamma * q.get(t.next, next_action);
            q.update(state, action, target, cfg.alpha);
            state = t.next;
            action = next_action;
        }
        debug!("SARSA episode {}: reward {}", episode, total);
        history.push(total);
        bar.inc(1);
    }
    finish(env, TdAlgorithm::Sarsa, cfg, q, history, bar)
}

/// Expected SARSA: target `r + gamma * sum_a pi(a|s') Q(s', a)`
pub fn expected_sarsa<E: GridEnv, R: Rng + ?Sized>(env: &E, cfg: &TdConfig, rng: &mut R) -> TdOutcome {
    let mut q = QTable::new();
    let mut history = Vec::with_capacity(cfg.episodes);
    let bar = episode_bar(cfg, TdAlgorithm::ExpectedSarsa);

    for episode in 0..cfg.episodes {
        let mut state = env.start();
        let mut total = 0.0;
        for _ in 0..cfg.max_steps_per_episode {
            let action = q.choose_action_epsilon_greedy(state, cfg.epsilon, rng);
            let t = env.step(state, action);
            total += t.reward;
            if t.done {
                q.update(state, action, t.reward, cfg.alpha);
                break;
            }
            let probs = q.epsilon_greedy_probs(t.next, cfg.epsilon);
            let expected: Reward = q.row(t.next).iter().zip(probs).map(|(v, p)| v * p).sum();
            q.update(state, action, t.reward + cfg.gamma * expected, cfg.alpha);
            state = t.next;
        }
        debug!("Expected SARSA episode {}: reward {}", episode, total);
        history.push(total);
        bar.inc(1);
    }
    finish(env, TdAlgorithm::ExpectedSarsa, cfg, q, history, bar)
}

/// A transition waiting for its n-step return
type Pending = (Position, Action, Reward);

/// Update the oldest pending transition with the discounted sum of the buffered rewards,
/// plus `gamma^len * bootstrap` when the episode continues past the buffer
fn update_oldest(q: &mut QTable, buffer: &mut VecDeque<Pending>, bootstrap: Option<Reward>, alpha: f64, gamma: f64) {
    let mut ret = 0.0;
    let mut discount = 1.0;
    for &(_, _, r) in buffer.iter() {
        ret += discount * r;
        discount *= gamma;
    }
    if let Some(tail) = bootstrap {
        ret += discount * tail;
    }
    if let Some((state, action, _)) = buffer.pop_front() {
        q.update(state, action, ret, alpha);
    }
}

/// n-step SARSA. Once `n_steps` transitions are buffered the oldest is updated with the
/// n-step return bootstrapped on `Q(s_{t+n}, a_{t+n})`; whatever is left when the
/// episode ends is flushed without bootstrapping.
pub fn n_step_sarsa<E: GridEnv, R: Rng + ?Sized>(env: &E, cfg: &TdConfig, rng: &mut R) -> TdOutcome {
    let n = cfg.n_steps.max(1);
    let mut q = QTable::new();
    let mut history = Vec::with_capacity(cfg.episodes);
    let bar = episode_bar(cfg, TdAlgorithm::NStepSarsa);

    for episode in 0..cfg.episodes {
        let mut buffer: VecDeque<Pending> = VecDeque::with_capacity(n);
        let mut state = env.start();
        let mut action = q.choose_action_epsilon_greedy(state, cfg.epsilon, rng);
        let mut total = 0.0;
        for _ in 0..cfg.max_steps_per_episode {
            let t = env.step(state, action);
            total += t.reward;
            buffer.push_back((state, action, t.reward));
            if t.done {
                break;
            }
            let next_action = q.choose_action_epsilon_greedy(t.next, cfg.epsilon, rng);
            if buffer.len() == n {
                let tail = q.get(t.next, next_action);
                update_oldest(&mut q, &mut buffer, Some(tail), cfg.alpha, cfg.gamma);
            }
            state = t.next;
            action = next_action;
        }
        while !buffer.is_empty() {
            update_oldest(&mut q, &mut buffer, None, cfg.alpha, cfg.gamma);
        }
        debug!("n-step SARSA episode {}: reward {}", episode, total);
        history.push(total);
        bar.inc(1);
    }
    finish(env, TdAlgorithm::NStepSarsa, cfg, q, history, bar)
}

/// Off-policy Q-learning: target `r + gamma * max_a Q(s', a)`
pub fn q_learning<E: GridEnv, R: Rng + ?Sized>(env: &E, cfg: &TdConfig, rng: &mut R) -> TdOutcome {
    let mut q = QTable::new();
    let mut history = Vec::with_capacity(cfg.episodes);
    let bar = episode_bar(cfg, TdAlgorithm::QLearning);

    for episode in 0..cfg.episodes {
        let mut state = env.start();
        let mut total = 0.0;
        for _ in 0..cfg.max_steps_per_episode {
            let action = q.choose_action_epsilon_greedy(state, cfg.epsilon, rng);
            let t = env.step(state, action);
            total += t.reward;
            let target = if t.done { t.reward } else { t.reward + cfg.gamma * q.max_value(t.next) };
            q.update(state, action, target, cfg.alpha);
            if t.done {
                break;
            }
            state = t.next;
        }
        debug!("Q-learning episode {}: reward {}", episode, total);
        history.push(total);
        bar.inc(1);
    }
    finish(env, TdAlgorithm::QLearning, cfg, q, history, bar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, CliffWalkEnv, GridRewards, Layout};
    use crate::planning::follow_policy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cliff_walk() -> CliffWalkEnv {
        CliffWalkEnv::new(Layout::preset("cliffwalk3").unwrap(), GridRewards::cliff_walk())
    }

    fn quiet() -> TdConfig {
        TdConfig { progress: false, ..Default::default() }
    }

    #[test]
    fn q_learning_walks_the_cliff_edge() {
        let env = cliff_walk();
        let mut rng = StdRng::seed_from_u64(42);
        let out = q_learning(&env, &quiet(), &mut rng);
        let rollout = follow_policy(&env, &out.policy, 100);
        assert!(rollout.reached_goal);
        assert_eq!(rollout.falls, 0);
        // straight along the row above the cliff
        assert_eq!(rollout.path.len(), 14);
        assert!(rollout.path[1..rollout.path.len() - 1].iter().all(|&(r, _)| r == 2));
    }

    #[test]
    fn sarsa_reaches_the_goal_without_falling() {
        // after 500 episodes the greedy SARSA policy still loops on some seeds,
        // so require most runs to succeed rather than a single lucky one
        let env = cliff_walk();
        let clean = (0..10)
            .filter(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let out = sarsa(&env, &quiet(), &mut rng);
                let rollout = follow_policy(&env, &out.policy, 200);
                rollout.reached_goal
                    && rollout.falls == 0
                    && rollout.path.iter().all(|&p| env.layout().get(p) != Some(Cell::Cliff))
            })
            .count();
        assert!(clean >= 6, "only {clean}/10 seeds reached the goal cleanly");
    }

    #[test]
    fn every_algorithm_learns_a_corridor() {
        let env = CliffWalkEnv::new(Layout::parse("2 0 0 0 3").unwrap(), GridRewards::cliff_walk());
        let cfg = TdConfig { episodes: 200, ..quiet() };
        for algorithm in TdAlgorithm::ALL {
            let mut rng = StdRng::seed_from_u64(1);
            let out = algorithm.run(&env, &cfg, &mut rng);
            assert_eq!(out.algorithm, algorithm);
            assert_eq!(out.history.len(), 200);
            assert!(out.history.iter().all(|&r| r <= -3.0), "{algorithm}");
            let rollout = follow_policy(&env, &out.policy, 20);
            assert_eq!(rollout.path.len(), 5, "{algorithm}");
            assert!(!out.policy.contains_key(&env.goal()));
        }
    }

    #[test]
    fn episodes_are_capped() {
        // the goal is walled off, so every episode runs into the cap
        let env = CliffWalkEnv::new(Layout::parse("2 0 1 3").unwrap(), GridRewards::cliff_walk());
        let cfg = TdConfig { episodes: 3, max_steps_per_episode: 50, ..quiet() };
        let mut rng = StdRng::seed_from_u64(9);
        let out = sarsa(&env, &cfg, &mut rng);
        assert_eq!(out.history, vec![-50.0; 3]);
    }

    #[test]
    fn n_step_flush_uses_truncated_returns() {
        let mut q = QTable::new();
        let mut buffer: VecDeque<Pending> =
            VecDeque::from([((0, 0), Action::E, -1.0), ((0, 1), Action::E, -1.0), ((0, 2), Action::E, -1.0)]);
        let gamma = 0.5;
        while !buffer.is_empty() {
            update_oldest(&mut q, &mut buffer, None, 1.0, gamma);
        }
        assert_eq!(q.get((0, 0), Action::E), -1.0 - 0.5 - 0.25);
        assert_eq!(q.get((0, 1), Action::E), -1.0 - 0.5);
        assert_eq!(q.get((0, 2), Action::E), -1.0);
    }

    #[test]
    fn n_step_bootstrap_is_discounted_by_buffer_length() {
        let mut q = QTable::new();
        q.set((0, 3), Action::E, 8.0);
        let mut buffer: VecDeque<Pending> = VecDeque::from([((0, 1), Action::E, 1.0), ((0, 2), Action::E, 1.0)]);
        let tail = q.get((0, 3), Action::E);
        update_oldest(&mut q, &mut buffer, Some(tail), 1.0, 0.5);
        assert_eq!(q.get((0, 1), Action::E), 1.0 + 0.5 + 0.25 * 8.0);
        assert_eq!(buffer.len(), 1);
    }
}
