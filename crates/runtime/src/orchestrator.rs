//! Match lifecycle across all rule systems.
//!
//! Reset runs in three phases: the stage clock first (so every later reset
//! observes `OutOfMatch`), experience second (levels feed the profile lookups
//! of the other systems), then the remaining systems concurrently.

use std::sync::Arc;

use judge_core::JudgeSystemStage;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::api::Result;
use crate::bus::{AdmissionGate, EventBus};
use crate::cancel::Cancellation;
use crate::stage::StageControl;
use crate::systems::{RuleSystem, SystemError};

const NAME: &str = "orchestrator";

pub struct SystemOrchestrator {
    clock: Arc<dyn StageControl>,
    experience: Arc<dyn RuleSystem>,
    systems: Vec<Arc<dyn RuleSystem>>,
    gate: Arc<AdmissionGate>,
    bus: EventBus,
    initial_stage: JudgeSystemStage,
}

impl SystemOrchestrator {
    pub fn new(
        clock: Arc<dyn StageControl>,
        experience: Arc<dyn RuleSystem>,
        systems: Vec<Arc<dyn RuleSystem>>,
        gate: Arc<AdmissionGate>,
        bus: EventBus,
    ) -> Self {
        Self {
            clock,
            experience,
            systems,
            gate,
            bus,
            initial_stage: JudgeSystemStage::Repair,
        }
    }

    /// Stage entered by [`start`](Self::start).
    pub fn with_initial_stage(mut self, stage: JudgeSystemStage) -> Self {
        self.initial_stage = stage;
        self
    }

    /// Returns every system to its match-start values.
    ///
    /// External commands are refused from the first phase on. The first
    /// failing system aborts the resets still running.
    pub async fn reset(&self, cancel: &Cancellation) -> std::result::Result<(), SystemError> {
        self.gate.close();
        info!(target: "runtime::orchestrator", systems = self.systems.len() + 2, "Reset started");

        self.clock.reset(cancel).await?;
        cancel.check(NAME)?;
        self.experience.reset(cancel).await?;
        cancel.check(NAME)?;

        let mut resets = JoinSet::new();
        for system in &self.systems {
            let system = Arc::clone(system);
            let cancel = cancel.clone();
            resets.spawn(async move {
                let name = system.name();
                system.reset(&cancel).await?;
                debug!(target: "runtime::orchestrator", system = name, "System reset");
                Ok::<_, SystemError>(())
            });
        }

        while let Some(joined) = resets.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(err) => SystemError::Join(err),
            };
            resets.abort_all();
            warn!(target: "runtime::orchestrator", error = %failure, "Reset aborted");
            return Err(failure);
        }

        info!(target: "runtime::orchestrator", "Reset complete");
        Ok(())
    }

    /// Resets, enters the initial stage and admits external commands.
    pub async fn start(&self, cancel: &Cancellation) -> Result<()> {
        self.reset(cancel).await?;
        cancel.check(NAME)?;
        self.clock
            .set_stage(self.initial_stage, &self.bus.context())
            .await?;
        self.gate.open();
        info!(
            target: "runtime::orchestrator",
            stage = %self.initial_stage,
            "Match started"
        );
        Ok(())
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}
