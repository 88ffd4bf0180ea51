//! Composition root of the judge system.
//!
//! [`JudgeBuilder`] wires the attribute store, the bus and its interceptor
//! chain, the stage clock and every rule system into a [`Judge`]. The judge
//! owns the timekeeper worker and exposes a builder-based API for clients to
//! drive matches.

use std::sync::Arc;
use std::time::Duration;

use judge_core::{
    AttributeStore, JudgeSystemStage, Properties, PropertyTable, Roster, RosterEntry, RuleTables,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{JudgeHandle, Result, RuntimeError};
use crate::bus::{AdmissionGate, EventBus, Interceptor, JudgeEventFilter, TracingInterceptor};
use crate::cancel::Cancellation;
use crate::orchestrator::SystemOrchestrator;
use crate::stage::StageClock;
use crate::systems::{
    BattleSystem, BuffSystem, EconomySystem, ExperienceSystem, LifeSystem, OperatorSystem,
    PowerSystem, RuleSystem, ScoreSystem, SettlementSystem, SupplySystem, SystemContext,
    ZoneSystem,
};
use crate::workers::Timekeeper;

/// Judge configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Capacity of each topic's broadcast channel.
    pub event_buffer_size: usize,
    /// Period of the timekeeper's clock ticks. A tick reports the wall time
    /// since the previous one, which exceeds the period when ticks run late.
    pub tick_interval: Duration,
    /// Move to the next stage when the current one expires.
    pub auto_advance: bool,
    /// Stage entered by [`Judge::start`].
    pub initial_stage: JudgeSystemStage,
    /// Run the timekeeper worker (default: true). Disable to drive time by
    /// publishing `ClockTickEvent`s yourself.
    pub enable_timekeeper: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            tick_interval: Duration::from_millis(100),
            auto_advance: true,
            initial_stage: JudgeSystemStage::Repair,
            enable_timekeeper: true,
        }
    }
}

/// A wired judge system: one container per match field.
///
/// [`JudgeHandle`] provides a cloneable façade for clients.
pub struct Judge {
    config: JudgeConfig,
    handle: JudgeHandle,
    orchestrator: SystemOrchestrator,
    clock: Arc<StageClock>,
    table: PropertyTable,

    // Background worker
    timekeeper: Option<(Cancellation, JoinHandle<()>)>,
}

impl Judge {
    /// Create a new judge builder
    pub fn builder() -> JudgeBuilder {
        JudgeBuilder::new()
    }

    /// Get a cloneable handle to this judge
    pub fn handle(&self) -> JudgeHandle {
        self.handle.clone()
    }

    /// Every registered property, for audits and tooling.
    pub fn property_table(&self) -> &PropertyTable {
        &self.table
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Resets all systems, enters the initial stage and opens the gate for
    /// external commands. Spawns the timekeeper on first start.
    pub async fn start(&mut self) -> Result<()> {
        self.orchestrator.start(&Cancellation::new()).await?;
        self.spawn_timekeeper();
        Ok(())
    }

    /// Returns every system to its match-start values and the clock to
    /// `OutOfMatch`. External commands stay refused until the next start.
    pub async fn reset(&self, cancel: &Cancellation) -> Result<()> {
        self.orchestrator.reset(cancel).await?;
        Ok(())
    }

    fn spawn_timekeeper(&mut self) {
        if !self.config.enable_timekeeper || self.timekeeper.is_some() {
            return;
        }
        let cancel = Cancellation::new();
        let worker = Timekeeper::new(
            self.clock.clone(),
            self.handle.event_bus().clone(),
            self.config.tick_interval,
            self.config.auto_advance,
            cancel.clone(),
        );
        let join = tokio::spawn(async move {
            worker.run().await;
        });
        self.timekeeper = Some((cancel, join));
    }

    /// Shutdown the judge gracefully
    pub async fn shutdown(self) -> Result<()> {
        if let Some((cancel, join)) = self.timekeeper {
            cancel.cancel();
            join.await.map_err(RuntimeError::WorkerJoin)?;
        }
        info!(target: "runtime::judge", "Judge shut down");
        Ok(())
    }
}

/// Builder for [`Judge`] with flexible configuration.
pub struct JudgeBuilder {
    config: JudgeConfig,
    tables: Option<Arc<dyn RuleTables>>,
    roster: Vec<RosterEntry>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl JudgeBuilder {
    fn new() -> Self {
        Self {
            config: JudgeConfig::default(),
            tables: None,
            roster: RosterEntry::standard(),
            interceptors: Vec::new(),
        }
    }

    /// Override judge configuration
    pub fn config(mut self, config: JudgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set required rule tables
    pub fn tables(mut self, tables: impl RuleTables + 'static) -> Self {
        self.tables = Some(Arc::new(tables));
        self
    }

    /// Replace the standard lineup of both camps.
    pub fn roster(mut self, roster: Vec<RosterEntry>) -> Self {
        self.roster = roster;
        self
    }

    /// Appends an interceptor after the built-in chain
    /// (tracing, judge-event filter, admission gate).
    pub fn add_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Disable the timekeeper worker
    pub fn manual_time(mut self) -> Self {
        self.config.enable_timekeeper = false;
        self
    }

    /// Build the judge
    pub fn build(self) -> Result<Judge> {
        let tables = self.tables.ok_or(RuntimeError::MissingTables)?;
        tables.validate()?;

        let (props, table) = Properties::build()?;
        let props = Arc::new(props);
        let store = Arc::new(AttributeStore::new());
        let roster = Arc::new(Roster::build(&self.roster, store.clone(), props.clone())?);

        let bus = EventBus::with_capacity(self.config.event_buffer_size);
        let gate = Arc::new(AdmissionGate::new());
        bus.add_interceptor(Arc::new(TracingInterceptor));
        bus.add_interceptor(Arc::new(JudgeEventFilter));
        bus.add_interceptor(gate.clone());
        for interceptor in self.interceptors {
            bus.add_interceptor(interceptor);
        }

        let clock = Arc::new(StageClock::new(tables.clone(), store.clone(), props.clone()));
        clock.clone().attach(&bus);

        let ctx = SystemContext {
            store: store.clone(),
            props: props.clone(),
            roster: roster.clone(),
            tables: tables.clone(),
            clock: clock.clone(),
        };

        let experience = Arc::new(ExperienceSystem::new(ctx.clone()));
        experience.clone().attach(&bus);

        let systems: Vec<Arc<dyn RuleSystem>> = vec![
            attach(LifeSystem::new(ctx.clone()), &bus),
            attach(BattleSystem::new(ctx.clone()), &bus),
            attach(BuffSystem::new(ctx.clone()), &bus),
            attach(ZoneSystem::new(ctx.clone()), &bus),
            attach(SupplySystem::new(ctx.clone()), &bus),
            attach(EconomySystem::new(ctx.clone()), &bus),
            attach(PowerSystem::new(ctx.clone()), &bus),
            attach(ScoreSystem::new(ctx.clone()), &bus),
            attach(SettlementSystem::new(ctx.clone()), &bus),
            attach(OperatorSystem::new(ctx), &bus),
        ];

        info!(
            target: "runtime::judge",
            robots = roster.len(),
            properties = table.len(),
            systems = systems.len() + 2,
            interceptors = ?bus.interceptor_names(),
            "Judge wired"
        );

        let orchestrator = SystemOrchestrator::new(
            clock.clone(),
            experience,
            systems,
            gate,
            bus.clone(),
        )
        .with_initial_stage(self.config.initial_stage);

        let handle = JudgeHandle::new(bus, clock.clone(), store, props, roster, tables);

        Ok(Judge {
            config: self.config,
            handle,
            orchestrator,
            clock,
            table,
            timekeeper: None,
        })
    }
}

fn attach<S: RuleSystem + 'static>(system: S, bus: &EventBus) -> Arc<dyn RuleSystem> {
    let system = Arc::new(system);
    system.clone().attach(bus);
    system
}
