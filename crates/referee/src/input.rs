//! Referee input lines.
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"start"}
//! {"type":"damage","shooter":{"camp":"red","role":1},"victim":{"camp":"blue","role":3},
//!  "damage":50,"ammo_type":"small","armor_type":"small","armor_id":0}
//! {"type":"penalty","penalty_type":"yellow_card","target_id":{"camp":"red","role":4},
//!  "judge_id":2,"reason":"pushing"}
//! {"type":"chassis_mode","operator":{"camp":"red","role":3},"mode":"power_first"}
//! {"type":"stage","stage":"match"}
//! ```
use anyhow::{Context, Result};
use judge_core::{
    ChassisModeCommand, ChassisPowerCommand, DamageCommand, EnterZoneEvent, ExitZoneEvent,
    JudgePenaltyEvent, JudgeSystemStage, OperatorLoginEvent, OperatorLogoutEvent, ShootCommand,
    SupplyCommand, WinPointCommand,
};
use judge_runtime::{Cancellation, Judge, Outcome};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefereeInput {
    /// Reset every system and enter the first running stage.
    Start,
    /// Return to out of match.
    Reset,
    /// Override the current stage.
    Stage { stage: JudgeSystemStage },
    Shoot(ShootCommand),
    Damage(DamageCommand),
    WinPoint(WinPointCommand),
    Supply(SupplyCommand),
    ChassisPower(ChassisPowerCommand),
    ChassisMode(ChassisModeCommand),
    Penalty(JudgePenaltyEvent),
    Login(OperatorLoginEvent),
    Logout(OperatorLogoutEvent),
    EnterZone(EnterZoneEvent),
    ExitZone(ExitZoneEvent),
}

impl RefereeInput {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).with_context(|| format!("invalid referee input: {line}"))
    }

    /// Applies the input to `judge`. Messages enter as external input.
    pub async fn apply(self, judge: &mut Judge) -> Result<()> {
        let handle = judge.handle();
        let outcome = match self {
            RefereeInput::Start => {
                judge.start().await?;
                return Ok(());
            }
            RefereeInput::Reset => {
                judge.reset(&Cancellation::new()).await?;
                return Ok(());
            }
            RefereeInput::Stage { stage } => {
                handle.set_stage(stage).await?;
                return Ok(());
            }
            RefereeInput::Shoot(command) => handle.submit(command).await?,
            RefereeInput::Damage(command) => handle.submit(command).await?,
            RefereeInput::WinPoint(command) => handle.submit(command).await?,
            RefereeInput::Supply(command) => handle.submit(command).await?,
            RefereeInput::ChassisPower(command) => handle.submit(command).await?,
            RefereeInput::ChassisMode(command) => handle.submit(command).await?,
            RefereeInput::Penalty(event) => handle.submit(event).await?,
            RefereeInput::Login(event) => handle.submit(event).await?,
            RefereeInput::Logout(event) => handle.submit(event).await?,
            RefereeInput::EnterZone(event) => handle.submit(event).await?,
            RefereeInput::ExitZone(event) => handle.submit(event).await?,
        };

        match outcome {
            Outcome::Delivered(report) if !report.is_clean() => {
                info!(?report, "Input delivered with handler failures");
            }
            Outcome::Delivered(_) => {}
            Outcome::Dropped { by } => debug!(by, "Input dropped"),
        }
        Ok(())
    }
}
