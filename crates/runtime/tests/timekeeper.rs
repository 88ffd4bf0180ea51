//! The timekeeper worker against real time.

use std::time::{Duration, Instant};

use judge_content::TablesLoader;
use judge_core::{ClockTickEvent, JudgeSystemStage, StageChangedEvent, TimeLimit, Topic};
use judge_runtime::{Judge, JudgeConfig};

fn config(auto_advance: bool) -> JudgeConfig {
    JudgeConfig {
        tick_interval: Duration::from_millis(20),
        auto_advance,
        ..JudgeConfig::default()
    }
}

#[tokio::test]
async fn ticks_flow_until_shutdown() {
    let mut judge = Judge::builder()
        .tables(TablesLoader::reference().unwrap())
        .config(config(false))
        .build()
        .unwrap();
    let handle = judge.handle();
    let mut events = handle.subscribe(Topic::Event);

    let started = Instant::now();
    judge.start().await.unwrap();

    let mut ticks = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while ticks.len() < 3 {
            let envelope = events.recv().await.unwrap();
            if let Some(tick) = envelope.downcast::<ClockTickEvent>() {
                ticks.push(tick.clone());
            }
        }
    })
    .await
    .expect("three ticks within five seconds");

    let wall_ms = started.elapsed().as_millis() as u64;

    assert_eq!(ticks.iter().map(|t| t.tick).collect::<Vec<_>>(), [0, 1, 2]);
    // Deltas add up to the wall time of the third tick, never beyond it.
    let total: u64 = ticks.iter().map(|t| u64::from(t.delta_ms)).sum();
    assert!(total >= 60, "three 20 ms periods elapsed, got {total}");
    assert!(total <= wall_ms, "{total} ms reported after {wall_ms} ms");
    assert!(handle.remaining().unwrap().unwrap() < 180_000);
    assert_eq!(handle.stage(), JudgeSystemStage::Repair);

    judge.shutdown().await.unwrap();
}

#[tokio::test]
async fn expired_stage_advances() {
    let tables = TablesLoader::reference()
        .unwrap()
        .with_stage_limit(JudgeSystemStage::Repair, TimeLimit::Seconds(1));
    let mut judge = Judge::builder()
        .tables(tables)
        .config(config(true))
        .build()
        .unwrap();
    let handle = judge.handle();
    let mut events = handle.subscribe(Topic::Event);

    judge.start().await.unwrap();

    let change = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let envelope = events.recv().await.unwrap();
            if let Some(change) = envelope.downcast::<StageChangedEvent>()
                && change.prev == JudgeSystemStage::Repair
            {
                return change.clone();
            }
        }
    })
    .await
    .expect("repair expires within five seconds");

    assert_eq!(change.next, JudgeSystemStage::SelfCheck);
    judge.shutdown().await.unwrap();
}
