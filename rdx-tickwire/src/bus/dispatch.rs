//! Snapshot-then-iterate dispatch.

use super::{ChannelRegistry, DispatchContext, DispatchReport};
use crate::error::DispatchError;
use crate::events::Message;
use std::sync::TryLockError;
use tracing::{trace, warn};

/// Invokes every subscriber that was on `message.channel` when this call
/// began, in subscription order.
///
/// Each member of the snapshot is re-checked just before its turn, so one
/// that was unsubscribed by an earlier subscriber in the same pass is
/// skipped. Members added during the pass are not in the snapshot. A member
/// that is unsubscribed and subscribed again before its turn still runs, at
/// its snapshot position.
pub(super) fn dispatch(registry: &ChannelRegistry, message: &Message) -> DispatchReport {
    let channel = message.channel.as_str();
    let snapshot = registry.snapshot(channel);
    let mut report = DispatchReport {
        channel: channel.to_string(),
        snapshot: snapshot.len(),
        ..Default::default()
    };
    trace!(channel, subscribers = snapshot.len(), "dispatch started");

    for id in snapshot {
        let Some((label, handler)) = registry.resolve(channel, id) else {
            trace!(channel, ?id, "skipping subscriber removed mid-dispatch");
            report.skipped += 1;
            continue;
        };
        let ctx = DispatchContext {
            bus: registry,
            subscriber: id,
        };

        // A subscriber that is already running further up the stack has
        // published onto a channel it is itself subscribed to.
        let outcome = match handler.try_lock() {
            Ok(mut guard) => guard.handle(&ctx, message),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().handle(&ctx, message),
            Err(TryLockError::WouldBlock) => {
                let error = DispatchError::Reentrant {
                    channel: channel.to_string(),
                    subscriber: label,
                };
                warn!(%error, "subscriber invocation failed");
                report.failures.push(error);
                continue;
            }
        };

        match outcome {
            Ok(()) => report.delivered += 1,
            Err(source) => {
                let error = DispatchError::Handler {
                    channel: channel.to_string(),
                    subscriber: label,
                    source,
                };
                warn!(%error, "subscriber invocation failed");
                report.failures.push(error);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use crate::bus::{ChannelRegistry, DispatchContext};
    use crate::common::SubscriberId;
    use crate::events::{Message, Payload};
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn recorder(bus: &ChannelRegistry, log: &CallLog, name: &'static str) -> SubscriberId {
        let log = Arc::clone(log);
        bus.register_fn(name, move |_: &DispatchContext<'_>, _: &Message| {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        })
    }

    fn drain(log: &CallLog) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    fn ping() -> Payload {
        Payload::Text("ping".into())
    }

    #[test]
    fn test_invokes_in_subscription_order() {
        let bus = ChannelRegistry::new();
        let log = CallLog::default();
        for name in ["a", "b", "c"] {
            let id = recorder(&bus, &log, name);
            bus.subscribe("tick", id);
        }
        let report = bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a", "b", "c"]);
        assert_eq!(report.delivered, 3);
        assert!(report.is_clean());
    }

    #[test]
    fn test_unsubscribe_pending_subscriber_mid_dispatch() {
        let bus = ChannelRegistry::new();
        let log = CallLog::default();
        let a = recorder(&bus, &log, "a");
        let c_slot: Arc<Mutex<Option<SubscriberId>>> = Arc::default();

        let b_log = Arc::clone(&log);
        let b_target = Arc::clone(&c_slot);
        let b = bus.register_fn("b", move |ctx: &DispatchContext<'_>, _: &Message| {
            b_log.lock().unwrap().push("b".to_string());
            if let Some(c) = *b_target.lock().unwrap() {
                ctx.bus.unsubscribe("tick", c);
            }
            Ok(())
        });
        let c = recorder(&bus, &log, "c");
        *c_slot.lock().unwrap() = Some(c);

        for id in [a, b, c] {
            bus.subscribe("tick", id);
        }

        let report = bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a", "b"]);
        assert_eq!(report.skipped, 1);

        bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a", "b"]);
    }

    #[test]
    fn test_resubscribed_member_keeps_snapshot_position() {
        let bus = ChannelRegistry::new();
        let log = CallLog::default();
        let a = recorder(&bus, &log, "a");
        let c = recorder(&bus, &log, "c");
        let d = recorder(&bus, &log, "d");

        let b_log = Arc::clone(&log);
        let b = bus.register_fn("b", move |ctx: &DispatchContext<'_>, _: &Message| {
            b_log.lock().unwrap().push("b".to_string());
            ctx.bus.unsubscribe("tick", c);
            ctx.bus.subscribe("tick", c);
            Ok(())
        });
        for id in [a, b, c, d] {
            bus.subscribe("tick", id);
        }

        let report = bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a", "b", "c", "d"]);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.delivered, 4);

        bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_subscribe_mid_dispatch_waits_for_next_publish() {
        let bus = ChannelRegistry::new();
        let log = CallLog::default();
        let late = recorder(&bus, &log, "late");

        let a_log = Arc::clone(&log);
        let a = bus.register_fn("a", move |ctx: &DispatchContext<'_>, _: &Message| {
            a_log.lock().unwrap().push("a".to_string());
            ctx.bus.subscribe("tick", late);
            Ok(())
        });
        bus.subscribe("tick", a);

        bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a"]);

        bus.publish("tick", ping());
        assert_eq!(drain(&log), vec!["a", "late"]);
    }

    #[test]
    fn test_self_unsubscribe_mid_dispatch() {
        let bus = ChannelRegistry::new();
        let log = CallLog::default();
        let quitter = bus.register_fn("quitter", |ctx: &DispatchContext<'_>, _: &Message| {
            ctx.unsubscribe_self();
            Ok(())
        });
        let after = recorder(&bus, &log, "after");
        bus.subscribe("tick", quitter);
        bus.subscribe("tick", after);

        let report = bus.publish("tick", ping());
        assert_eq!(report.delivered, 2);
        assert_eq!(drain(&log), vec!["after"]);
        assert!(!bus.is_registered(quitter));

        let report = bus.publish("tick", ping());
        assert_eq!(report.snapshot, 1);
    }

    #[test]
    fn test_failing_subscriber_does_not_abort_dispatch() {
        let bus = ChannelRegistry::new();
        let log = CallLog::default();
        let a = recorder(&bus, &log, "a");
        let broken = bus.register_fn("broken", |_: &DispatchContext<'_>, _: &Message| {
            anyhow::bail!("handler blew up")
        });
        let c = recorder(&bus, &log, "c");
        for id in [a, broken, c] {
            bus.subscribe("chat", id);
        }

        let report = bus.publish("chat", ping());
        assert_eq!(drain(&log), vec!["a", "c"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].to_string().contains("broken"));
    }

    #[test]
    fn test_reentrant_publish_is_reported() {
        let bus = ChannelRegistry::new();
        let echo = bus.register_fn("echo", |ctx: &DispatchContext<'_>, message: &Message| {
            if message.text() == Some("ping") {
                let inner = ctx.bus.publish("chat", Payload::Text("pong".into()));
                assert_eq!(inner.failures.len(), 1);
            }
            Ok(())
        });
        bus.subscribe("chat", echo);

        let report = bus.publish("chat", ping());
        assert!(report.is_clean());
        assert_eq!(report.delivered, 1);
    }
}
