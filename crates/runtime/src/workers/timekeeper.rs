//! Time-keeping worker.
//!
//! Publishes a [`ClockTickEvent`] every interval. The stage clock and the
//! time-driven rule systems (cooling, revival, income, power) react to it.
//! With auto-advance enabled, the worker also moves the clock to the next
//! stage once the current one has expired.

use std::sync::Arc;

use judge_core::{ClockTickEvent, JudgeSystemStage};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::cancel::Cancellation;
use crate::stage::{StageClock, StageControl, StageView};

/// Background task driving match time.
pub struct Timekeeper {
    clock: Arc<StageClock>,
    bus: EventBus,
    interval: Duration,
    auto_advance: bool,
    cancel: Cancellation,
}

impl Timekeeper {
    pub fn new(
        clock: Arc<StageClock>,
        bus: EventBus,
        interval: Duration,
        auto_advance: bool,
        cancel: Cancellation,
    ) -> Self {
        Self {
            clock,
            bus,
            interval: interval.max(Duration::from_millis(1)),
            auto_advance,
            cancel,
        }
    }

    /// Main worker loop. Returns once cancelled.
    ///
    /// Each tick carries the wall time since the previous one, so delayed
    /// ticks do not let match time fall behind.
    pub async fn run(self) {
        let origin = Instant::now();
        let mut ticker = time::interval_at(origin + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = 0u64;
        let mut published_ms = 0u64;

        info!(
            target: "runtime::timekeeper",
            interval_ms = self.interval.as_millis() as u64,
            auto_advance = self.auto_advance,
            "Timekeeper started"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let elapsed_ms = u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let delta_ms = u32::try_from(elapsed_ms.saturating_sub(published_ms))
                        .unwrap_or(u32::MAX);
                    published_ms = published_ms.saturating_add(u64::from(delta_ms));
                    self.on_tick(tick, delta_ms).await;
                    tick += 1;
                }
            }
        }

        info!(target: "runtime::timekeeper", ticks = tick, "Timekeeper stopped");
    }

    async fn on_tick(&self, tick: u64, delta_ms: u32) {
        if let Err(err) = self.bus.publish(ClockTickEvent { tick, delta_ms }).await {
            warn!(target: "runtime::timekeeper", tick, error = %err, "Tick not delivered");
            return;
        }
        if self.auto_advance {
            self.advance_if_expired().await;
        }
    }

    async fn advance_if_expired(&self) {
        let stage = self.clock.stage();
        // A settled match waits for the referee to start the next one.
        if matches!(stage, JudgeSystemStage::OutOfMatch | JudgeSystemStage::Settlement) {
            return;
        }
        match self.clock.is_expired() {
            Ok(false) => {}
            Ok(true) => {
                let next = stage.next();
                debug!(target: "runtime::timekeeper", prev = %stage, %next, "Stage expired");
                if let Err(err) = self.clock.set_stage(next, &self.bus.context()).await {
                    warn!(target: "runtime::timekeeper", %next, error = %err, "Auto-advance failed");
                }
            }
            Err(err) => warn!(target: "runtime::timekeeper", %stage, error = %err, "Stage limit unavailable"),
        }
    }
}
