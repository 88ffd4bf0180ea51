//! End-to-end match scenarios against a fully wired judge.
//!
//! Time is driven by hand: the timekeeper is disabled and ticks are published
//! directly, so every assertion runs after a deterministic sequence of
//! messages.

use std::any::Any;

use judge_content::TablesLoader;
use judge_core::{
    AmmoType, ArmorType, Camp, ChassisMode, ChassisModeCommand, ClockTickEvent, DamageCommand,
    EnterZoneEvent, Identity, JudgeSystemStage, KillEvent, MatchSettleEvent, Message,
    SettleReason, ShootCommand, SupplyCommand, Topic,
};
use judge_runtime::{Cancellation, Judge, JudgeHandle, Outcome};

const RED_HERO: Identity = Identity::new(Camp::Red, 1);
const RED_INFANTRY: Identity = Identity::new(Camp::Red, 3);
const BLUE_INFANTRY: Identity = Identity::new(Camp::Blue, 3);
const BLUE_OUTPOST: Identity = Identity::new(Camp::Blue, 8);
const BLUE_BASE: Identity = Identity::new(Camp::Blue, 9);

async fn started() -> (Judge, JudgeHandle) {
    let mut judge = Judge::builder()
        .tables(TablesLoader::reference().expect("reference tables"))
        .manual_time()
        .build()
        .expect("judge should build");
    judge.start().await.expect("judge should start");
    let handle = judge.handle();
    (judge, handle)
}

async fn in_match() -> (Judge, JudgeHandle) {
    let (judge, handle) = started().await;
    handle.set_stage(JudgeSystemStage::Match).await.unwrap();
    (judge, handle)
}

fn hit(shooter: Identity, victim: Identity, damage: u32) -> DamageCommand {
    DamageCommand {
        shooter,
        victim,
        damage,
        ammo_type: AmmoType::Small,
        armor_type: ArmorType::Small,
        armor_id: 0,
    }
}

fn health(handle: &JudgeHandle, id: Identity) -> u32 {
    handle.roster().healthed(id).unwrap().health()
}

#[tokio::test]
async fn damage_applies_in_match_only() {
    let (_judge, handle) = started().await;
    assert_eq!(handle.stage(), JudgeSystemStage::Repair);

    handle.submit(hit(RED_HERO, BLUE_INFANTRY, 50)).await.unwrap();
    assert_eq!(health(&handle, BLUE_INFANTRY), 200);

    handle.set_stage(JudgeSystemStage::Match).await.unwrap();
    handle.submit(hit(RED_HERO, BLUE_INFANTRY, 50)).await.unwrap();
    assert_eq!(health(&handle, BLUE_INFANTRY), 150);

    let props = handle.props();
    assert_eq!(props.damage_dealt.get_for(handle.store(), RED_HERO), 50);
}

#[tokio::test]
async fn external_commands_wait_for_start() {
    let judge = Judge::builder()
        .tables(TablesLoader::reference().unwrap())
        .manual_time()
        .build()
        .unwrap();
    let handle = judge.handle();

    let outcome = handle
        .submit(ShootCommand { shooter: RED_INFANTRY, amount: 1 })
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Dropped { by: "admission_gate" }));
}

#[tokio::test]
async fn infantry_chassis_profile_applies_from_repair() {
    let (mut judge, handle) = started().await;
    let health_first = ChassisModeCommand {
        operator: RED_INFANTRY,
        mode: ChassisMode::HealthFirst,
    };

    handle.submit(health_first.clone()).await.unwrap();

    let robot = handle.roster().healthed(RED_INFANTRY).unwrap();
    assert_eq!(robot.max_health(), 250);
    assert_eq!(robot.health(), 250);
    let shooter = handle.roster().shooter(RED_INFANTRY).unwrap();
    assert_eq!(shooter.max_heat(), 100.0);
    let chassis = handle.roster().chassis(RED_INFANTRY).unwrap();
    assert_eq!(chassis.power_limit(), 50.0);
    let red_total: u32 = handle
        .roster()
        .camp(Camp::Red)
        .filter_map(|entity| entity.as_healthed())
        .map(|healthed| healthed.health())
        .sum();
    assert_eq!(handle.props().health.get_camp(handle.store(), Camp::Red), red_total);

    // The mode survives a restart; switching mid-match is ignored.
    judge.start().await.unwrap();
    handle.set_stage(JudgeSystemStage::Match).await.unwrap();
    handle
        .submit(ChassisModeCommand {
            operator: RED_INFANTRY,
            mode: ChassisMode::PowerFirst,
        })
        .await
        .unwrap();
    assert_eq!(chassis.chassis_mode(), ChassisMode::HealthFirst);
    assert_eq!(robot.max_health(), 250);
    assert_eq!(chassis.power_limit(), 50.0);
}

#[derive(Debug)]
struct Heartbeat;

impl Message for Heartbeat {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn topic(&self) -> Topic {
        Topic::Event
    }

    fn name(&self) -> &'static str {
        "heartbeat"
    }
}

#[tokio::test]
async fn foreign_messages_are_filtered() {
    let (_judge, handle) = started().await;

    let outcome = handle.publish(Heartbeat).await.unwrap();

    assert!(matches!(outcome, Outcome::Dropped { by: "judge_event_filter" }));
}

#[tokio::test]
async fn destroying_the_base_settles_the_match() {
    let (_judge, handle) = in_match().await;
    let mut events = handle.subscribe(Topic::Event);

    handle.submit(hit(RED_HERO, BLUE_BASE, 5_000)).await.unwrap();

    assert_eq!(handle.stage(), JudgeSystemStage::Settlement);
    let settles: Vec<MatchSettleEvent> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|envelope| envelope.downcast::<MatchSettleEvent>().cloned())
        .collect();
    assert_eq!(
        settles,
        vec![MatchSettleEvent {
            winner: Some(Camp::Red),
            reason: SettleReason::BaseDestroyed,
        }]
    );

    let props = handle.props();
    let store = handle.store();
    assert_eq!(props.win_point.get_camp(store, Camp::Red), 50);
    assert_eq!(props.kills.get_for(store, RED_HERO), 1);
    assert_eq!(props.coins.get_camp(store, Camp::Red), 500);
}

#[tokio::test]
async fn kills_level_up_the_killer() {
    let (_judge, handle) = in_match().await;
    let hero = handle.roster().healthed(RED_HERO).unwrap();
    assert_eq!(hero.max_health(), 350);

    // Structure kills are worth 150 experience; the hero reaches level 2 at 400.
    for time in 0..3 {
        handle
            .publish(KillEvent { time, killer: RED_HERO, victim: BLUE_OUTPOST })
            .await
            .unwrap();
    }

    let hero = handle.roster().get(RED_HERO).unwrap();
    assert_eq!(hero.as_experienced().unwrap().level(), 2);
    assert_eq!(hero.as_healthed().unwrap().max_health(), 450);
    assert_eq!(hero.as_healthed().unwrap().health(), 450);
    assert_eq!(hero.as_shooter().unwrap().max_heat(), 250.0);
    assert_eq!(hero.as_chassis().unwrap().power_limit(), 90.0);
}

#[tokio::test]
async fn overheating_costs_health() {
    let (_judge, handle) = in_match().await;

    handle
        .submit(ShootCommand { shooter: RED_INFANTRY, amount: 11 })
        .await
        .unwrap();

    let shooter = handle.roster().shooter(RED_INFANTRY).unwrap();
    assert_eq!(shooter.ammo(), 89);
    assert_eq!(health(&handle, RED_INFANTRY), 180);
    assert_eq!(handle.props().penalties.get_for(handle.store(), RED_INFANTRY), 1);
}

#[tokio::test]
async fn income_pays_for_ammunition() {
    let (_judge, handle) = in_match().await;
    let coins = || handle.props().coins.get_camp(handle.store(), Camp::Red);
    assert_eq!(coins(), 400);

    handle
        .submit(EnterZoneEvent { zone_id: 1, operator_id: RED_INFANTRY })
        .await
        .unwrap();
    handle
        .submit(SupplyCommand { operator: RED_INFANTRY, amount: 100 })
        .await
        .unwrap();
    assert_eq!(coins(), 300);
    assert_eq!(handle.roster().shooter(RED_INFANTRY).unwrap().ammo(), 200);

    handle
        .publish(ClockTickEvent { tick: 0, delta_ms: 60_000 })
        .await
        .unwrap();
    assert_eq!(coins(), 350);
    assert_eq!(handle.remaining().unwrap(), Some(360_000));
}

#[tokio::test]
async fn reset_restores_match_start_values() {
    let (mut judge, handle) = in_match().await;
    handle.submit(hit(RED_HERO, BLUE_INFANTRY, 120)).await.unwrap();
    assert_eq!(health(&handle, BLUE_INFANTRY), 80);

    judge.reset(&Cancellation::new()).await.unwrap();
    assert_eq!(handle.stage(), JudgeSystemStage::OutOfMatch);
    assert_eq!(health(&handle, BLUE_INFANTRY), 200);
    assert_eq!(handle.props().coins.get_camp(handle.store(), Camp::Blue), 400);

    let refused = handle.submit(hit(RED_HERO, BLUE_INFANTRY, 50)).await.unwrap();
    assert!(!refused.is_delivered());

    judge.start().await.unwrap();
    assert_eq!(handle.stage(), JudgeSystemStage::Repair);
}
