use std::io::Write;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

use super::errors::DriverError;
use super::evaluator::argmax;
use crate::env::{Env, EnvMetadata};
use crate::neat::Activate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub reward: f64,
}

fn frame_timer(metadata: EnvMetadata, frame_interval: Option<Duration>) -> Option<Interval> {
    let period = match frame_interval {
        Some(period) => period,
        None if metadata.render_fps > 0 => {
            Duration::from_secs_f64(1.0 / f64::from(metadata.render_fps))
        }
        None => Duration::ZERO,
    };
    if period.is_zero() {
        return None;
    }
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(timer)
}

/// Plays one episode with the network choosing actions, writing each
/// rendered frame to `out` at the environment's frame rate. The
/// environment is closed when the episode ends.
pub async fn replay<E, N, W>(
    mut env: E,
    network: &mut N,
    frame_interval: Option<Duration>,
    out: &mut W,
) -> Result<ReplaySummary, DriverError>
where
    E: Env<Obs = Vec<f64>, Act = usize>,
    N: Activate + ?Sized,
    W: Write,
{
    let mut timer = frame_timer(env.metadata(), frame_interval);
    let mut obs = env.reset()?;
    let mut summary = ReplaySummary {
        steps: 0,
        reward: 0.0,
    };

    loop {
        if let Some(frame) = env.render()? {
            writeln!(out, "{frame}").map_err(DriverError::Replay)?;
        }
        if let Some(timer) = timer.as_mut() {
            timer.tick().await;
        }

        let action = argmax(&network.activate(&obs)?).ok_or(DriverError::EmptyNetworkOutput)?;
        let transition = env.step(action)?;
        summary.steps += 1;
        summary.reward += transition.reward;
        if transition.done() {
            break;
        }
        obs = transition.obs;
    }
    out.flush().map_err(DriverError::Replay)?;
    env.close()?;

    debug!(steps = summary.steps, reward = summary.reward, "replay finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::env::{MakeOptions, RenderMode, make};
    use crate::evolution::evaluator::tests::{Fixed, Scripted};

    #[tokio::test]
    async fn test_replay_writes_a_frame_per_step() {
        let env = Scripted::new(vec![4]);
        let closed = env.closed.clone();
        let mut out = Vec::new();

        let summary = replay(
            env,
            &mut Fixed(vec![1.0, 0.0]),
            Some(Duration::from_millis(1)),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(summary, ReplaySummary { steps: 4, reward: 4.0 });
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("step 0"));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replay_cart_pole_in_human_mode() {
        let env = make(
            "CartPole-v1",
            MakeOptions::default()
                .render_mode(RenderMode::Human)
                .seed(Some(11)),
        )
        .unwrap();
        let mut out = Vec::new();

        let summary = replay(env, &mut Fixed(vec![0.0, 1.0]), None, &mut out)
            .await
            .unwrap();

        assert!(summary.steps > 0 && summary.steps <= 500);
        assert_eq!(summary.reward, summary.steps as f64);
        assert!(!out.is_empty());
    }
}
