//! Typed event bus with an ordered interceptor chain.
//!
//! # Architecture
//!
//! - `publish` wraps the message in an [`Envelope`] and walks the interceptor
//!   chain in registration order
//! - each [`Interceptor`] drops the envelope or forwards it via [`Next::run`]
//! - after the chain, the message is broadcast on its [`Topic`] channel and
//!   the [`Handler`]s subscribed to its concrete type run in order
//! - handlers publish follow-up messages through their [`BusContext`], which
//!   nests them under the message being handled
//!
//! A failing handler never stops its siblings. Failures are logged by
//! [`HandlerCriticality`] and collected in the [`DispatchReport`]; state
//! already committed stays committed.
//!
//! [`Topic`]: judge_core::Topic

mod dispatch;
mod envelope;
mod handler;
mod interceptor;
mod interceptors;
mod report;

pub use dispatch::{BusContext, EventBus, MAX_PUBLISH_DEPTH};
pub use envelope::{Envelope, Origin};
pub use handler::{Handler, HandlerCriticality};
pub use interceptor::{Interceptor, Next};
pub use interceptors::{AdmissionGate, JudgeEventFilter, TracingInterceptor};
pub use report::{DispatchError, DispatchReport, HandlerError, HandlerFailure, Outcome};

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use judge_core::{
        Camp, Identity, JudgePenaltyEvent, Message, PenaltyType, ShootCommand, Topic,
    };

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        drop: bool,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn intercept(
            &self,
            envelope: Envelope,
            next: Next<'_>,
        ) -> Result<Outcome, DispatchError> {
            self.log.lock().unwrap().push(format!("{}:{}", self.name, envelope.name()));
            if self.drop {
                return Ok(Outcome::Dropped { by: self.name });
            }
            next.run(envelope).await
        }
    }

    struct ShotCounter {
        name: &'static str,
        priority: i32,
        log: Log,
        fail: Option<HandlerCriticality>,
    }

    #[async_trait]
    impl Handler<ShootCommand> for ShotCounter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn criticality(&self) -> HandlerCriticality {
            self.fail.unwrap_or(HandlerCriticality::Important)
        }

        async fn handle(&self, message: &ShootCommand, _ctx: &BusContext) -> Result<(), HandlerError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, message.amount));
            match self.fail {
                Some(_) => Err(HandlerError::failed("boom")),
                None => Ok(()),
            }
        }
    }

    #[derive(Debug)]
    struct Foreign;

    impl Message for Foreign {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn topic(&self) -> Topic {
            Topic::Event
        }

        fn name(&self) -> &'static str {
            "foreign"
        }
    }

    fn shot() -> ShootCommand {
        ShootCommand {
            shooter: Identity::new(Camp::Red, 3),
            amount: 2,
        }
    }

    fn counter(name: &'static str, priority: i32, log: &Log) -> Arc<ShotCounter> {
        Arc::new(ShotCounter {
            name,
            priority,
            log: log.clone(),
            fail: None,
        })
    }

    #[tokio::test]
    async fn interceptors_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Log::default();
        for name in ["a", "b"] {
            bus.add_interceptor(Arc::new(Recorder {
                name,
                log: log.clone(),
                drop: false,
            }));
        }
        bus.add_handler::<ShootCommand, _>(counter("h", 0, &log));

        let outcome = bus.publish(shot()).await.unwrap();

        assert!(outcome.is_delivered());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:shoot_command", "b:shoot_command", "h:2"]
        );
    }

    #[tokio::test]
    async fn dropping_interceptor_short_circuits() {
        let bus = EventBus::new();
        let log = Log::default();
        bus.add_interceptor(Arc::new(Recorder {
            name: "a",
            log: log.clone(),
            drop: true,
        }));
        bus.add_interceptor(Arc::new(Recorder {
            name: "b",
            log: log.clone(),
            drop: false,
        }));
        bus.add_handler::<ShootCommand, _>(counter("h", 0, &log));

        let outcome = bus.publish(shot()).await.unwrap();

        assert!(matches!(outcome, Outcome::Dropped { by: "a" }));
        assert_eq!(*log.lock().unwrap(), vec!["a:shoot_command"]);
    }

    #[tokio::test]
    async fn handlers_follow_priority_then_subscription_order() {
        let bus = EventBus::new();
        let log = Log::default();
        bus.add_handler::<ShootCommand, _>(counter("late", 10, &log));
        bus.add_handler::<ShootCommand, _>(counter("first", 0, &log));
        bus.add_handler::<ShootCommand, _>(counter("second", 0, &log));

        bus.publish(shot()).await.unwrap();

        assert_eq!(
            bus.handler_names::<ShootCommand>(),
            vec!["first", "second", "late"]
        );
        assert_eq!(*log.lock().unwrap(), vec!["first:2", "second:2", "late:2"]);
    }

    #[tokio::test]
    async fn handler_failures_are_isolated_and_reported() {
        let bus = EventBus::new();
        let log = Log::default();
        for (name, fail) in [
            ("critical", Some(HandlerCriticality::Critical)),
            ("optional", Some(HandlerCriticality::Optional)),
        ] {
            bus.add_handler::<ShootCommand, _>(Arc::new(ShotCounter {
                name,
                priority: 0,
                log: log.clone(),
                fail,
            }));
        }
        bus.add_handler::<ShootCommand, _>(counter("healthy", 0, &log));

        let outcome = bus.publish(shot()).await.unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.handled, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].handler, "critical");
        assert_eq!(report.suppressed, 1);
        assert!(report.has_critical_failure());
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn judge_filter_drops_foreign_messages() {
        let bus = EventBus::new();
        bus.add_interceptor(Arc::new(JudgeEventFilter));

        let foreign = bus.publish(Foreign).await.unwrap();
        assert!(matches!(foreign, Outcome::Dropped { by: "judge_event_filter" }));

        let penalty = JudgePenaltyEvent {
            penalty_type: PenaltyType::YellowCard,
            target_id: Identity::new(Camp::Blue, 1),
            judge_id: 1,
            reason: "late".into(),
        };
        assert!(bus.publish(penalty).await.unwrap().is_delivered());
    }

    #[tokio::test]
    async fn admission_gate_holds_external_commands() {
        let bus = EventBus::new();
        let gate = Arc::new(AdmissionGate::new());
        bus.add_interceptor(gate.clone());

        let refused = bus.submit(shot()).await.unwrap();
        assert!(matches!(refused, Outcome::Dropped { by: "admission_gate" }));
        assert!(bus.publish(shot()).await.unwrap().is_delivered());

        gate.open();
        assert!(bus.submit(shot()).await.unwrap().is_delivered());
    }

    #[tokio::test]
    async fn buses_share_nothing() {
        let log = Log::default();
        let first = EventBus::new();
        let second = EventBus::new();
        first.add_handler::<ShootCommand, _>(counter("first", 0, &log));

        let report = second.publish(shot()).await.unwrap();

        assert_eq!(report.report().unwrap().handled, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivered_messages_reach_topic_subscribers() {
        let bus = EventBus::new();
        let mut commands = bus.subscribe(Topic::Command);
        let mut events = bus.subscribe(Topic::Event);

        bus.publish(shot()).await.unwrap();

        let envelope = commands.recv().await.unwrap();
        assert_eq!(envelope.downcast::<ShootCommand>(), Some(&shot()));
        assert!(events.try_recv().is_err());
    }

    struct Echo;

    #[async_trait]
    impl Handler<ShootCommand> for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn handle(&self, message: &ShootCommand, ctx: &BusContext) -> Result<(), HandlerError> {
            ctx.publish(message.clone()).await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn runaway_publishing_is_cut_off() {
        let bus = EventBus::new();
        bus.add_handler::<ShootCommand, _>(Arc::new(Echo));

        // Terminates: the innermost echo fails with a depth error and the
        // outer publishes unwind normally.
        assert!(bus.publish(shot()).await.unwrap().is_delivered());

        let err = bus
            .dispatch(Arc::new(shot()), Origin::Internal, MAX_PUBLISH_DEPTH + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DepthExceeded { .. }));
    }
}
