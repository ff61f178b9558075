//! Timed waves of concurrent sessions.

use crate::config::WaveDelay;
use crate::context::SessionId;
use crate::profile::{BehaviorProfile, ProfileMix};
use crate::report::Reporter;
use crate::session::SessionRunner;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// What the scheduler did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub waves: u64,
    pub sessions: usize,
    /// Wall time from the first wave's launch to the last wave's drain.
    pub elapsed: Duration,
}

/// Launches waves of sessions until the run duration has passed.
///
/// A wave is never cut short: the last one may finish well after the bound.
pub struct WaveScheduler<S: SessionRunner> {
    runner: Arc<S>,
    reporter: Arc<dyn Reporter>,
    profile: BehaviorProfile,
    wave_delay: WaveDelay,
    rng: StdRng,
}

impl<S: SessionRunner> WaveScheduler<S> {
    pub fn new(runner: Arc<S>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            runner,
            reporter,
            profile: BehaviorProfile::default(),
            wave_delay: WaveDelay::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Profile for every session when no mix is given.
    pub fn profile(mut self, profile: BehaviorProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn wave_delay(mut self, delay: WaveDelay) -> Self {
        self.wave_delay = delay;
        self
    }

    /// Make profile shuffling and random delays reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run waves of `sessions_per_wave` sessions while less than
    /// `total_duration` has elapsed.
    pub async fn run(
        &mut self,
        total_duration: Duration,
        sessions_per_wave: usize,
        mix: Option<&ProfileMix>,
    ) -> RunSummary {
        let start = Instant::now();
        let mut waves = 0u64;
        let mut sessions = 0usize;

        while start.elapsed() < total_duration {
            waves += 1;
            let profiles = match mix {
                Some(mix) => mix.pool(sessions_per_wave, &mut self.rng),
                None => vec![self.profile; sessions_per_wave],
            };
            tracing::info!(wave = waves, sessions = profiles.len(), "starting wave");
            self.reporter.wave_start(waves, &profiles);

            sessions += self.run_wave(waves, profiles).await;

            if start.elapsed() >= total_duration {
                break;
            }
            let pause = self.wave_delay.sample(&mut self.rng);
            tracing::debug!(wave = waves, pause_ms = pause.as_millis() as u64, "wave done");
            tokio::time::sleep(pause).await;
        }

        let summary = RunSummary {
            waves,
            sessions,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            waves = summary.waves,
            sessions = summary.sessions,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run finished"
        );
        summary
    }

    /// Spawn one session per profile and wait for all of them.
    async fn run_wave(&self, wave: u64, profiles: Vec<BehaviorProfile>) -> usize {
        let mut set = JoinSet::new();
        for (i, profile) in profiles.into_iter().enumerate() {
            let runner = Arc::clone(&self.runner);
            let id = SessionId {
                wave,
                ordinal: i + 1,
            };
            set.spawn(async move { runner.run(id, profile).await });
        }

        let mut finished = 0;
        while let Some(joined) = set.join_next().await {
            finished += 1;
            if let Err(e) = joined {
                tracing::warn!(wave, error = %e, "session task did not complete");
            }
        }
        finished
    }
}
