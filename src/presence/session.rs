//! Handshake state for one presence subscription.
//!
//! The heartbeat timer lives inside the `Subscribed` phase, so a connection
//! can own at most one and leaving the phase drops it. A hello without an
//! interval still subscribes, just without a timer.

use super::protocol::{encode_heartbeat, encode_subscribe, parse_inbound, Inbound, PresencePayload};
use anyhow::Result;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Heartbeat {
    interval: Duration,
    next_due: Instant,
}

impl Heartbeat {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    #[cfg(test)]
    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            // stalled for more than a period; don't burst
            self.next_due = now + self.interval;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Phase {
    Connecting,
    Subscribed { heartbeat: Option<Heartbeat> },
    Disconnected { retry_at: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// Send this back on the channel; the subscription is now live.
    Subscribe(String),
    Publish(PresencePayload),
    Ignore,
}

#[derive(Debug)]
pub(crate) struct Session {
    user_id: String,
    reconnect_delay: Duration,
    phase: Phase,
    attempts: u64,
}

impl Session {
    /// Starts disconnected with the first attempt due immediately.
    pub(crate) fn new(user_id: impl Into<String>, reconnect_delay: Duration, now: Instant) -> Self {
        Self {
            user_id: user_id.into(),
            reconnect_delay,
            phase: Phase::Disconnected { retry_at: now },
            attempts: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> &Phase {
        &self.phase
    }

    pub(crate) fn attempts(&self) -> u64 {
        self.attempts
    }

    pub(crate) fn begin_connect(&mut self) {
        self.attempts += 1;
        self.phase = Phase::Connecting;
    }

    pub(crate) fn on_text(&mut self, text: &str, now: Instant) -> Result<Outcome> {
        if matches!(self.phase, Phase::Disconnected { .. }) {
            return Ok(Outcome::Ignore);
        }
        match parse_inbound(text)? {
            Inbound::Hello { heartbeat_interval } => {
                let reply = encode_subscribe(&self.user_id)?;
                match heartbeat_interval {
                    Some(every) => log::debug!("hello: heartbeat every {every:?}"),
                    None => log::warn!("hello without a heartbeat interval, subscribing without heartbeats"),
                }
                // replaces any timer from an earlier hello on this connection
                self.phase = Phase::Subscribed {
                    heartbeat: heartbeat_interval.map(|every| Heartbeat::new(every, now)),
                };
                Ok(Outcome::Subscribe(reply))
            }
            Inbound::Event { kind, presence } => {
                log::debug!("presence event {}", kind.as_deref().unwrap_or("-"));
                Ok(Outcome::Publish(presence))
            }
            Inbound::Other(op) => {
                log::trace!("ignoring op {op}");
                Ok(Outcome::Ignore)
            }
        }
    }

    /// Heartbeat text if the timer is due.
    pub(crate) fn poll_heartbeat(&mut self, now: Instant) -> Result<Option<String>> {
        let Phase::Subscribed {
            heartbeat: Some(heartbeat),
        } = &mut self.phase
        else {
            return Ok(None);
        };
        if heartbeat.fire(now) {
            Ok(Some(encode_heartbeat()?))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn until_heartbeat(&self, now: Instant) -> Option<Duration> {
        match &self.phase {
            Phase::Subscribed {
                heartbeat: Some(heartbeat),
            } => Some(heartbeat.next_due.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Any close or failure. Drops the heartbeat and schedules the next attempt.
    pub(crate) fn on_close(&mut self, now: Instant) {
        self.phase = Phase::Disconnected {
            retry_at: now + self.reconnect_delay,
        };
    }

    pub(crate) fn retry_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Disconnected { retry_at } => Some(retry_at),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn ready_to_connect(&self, now: Instant) -> bool {
        self.retry_at().is_some_and(|at| now >= at)
    }

    #[cfg(test)]
    pub(crate) fn active_heartbeats(&self) -> usize {
        usize::from(matches!(
            self.phase,
            Phase::Subscribed {
                heartbeat: Some(_)
            }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = r#"{"op":1,"d":{"heartbeat_interval":30000}}"#;

    fn session(now: Instant) -> Session {
        Session::new("42", Duration::from_secs(5), now)
    }

    #[test]
    fn hello_subscribes_and_arms_one_heartbeat() {
        let t0 = Instant::now();
        let mut s = session(t0);
        assert!(s.ready_to_connect(t0));
        s.begin_connect();
        assert_eq!(s.active_heartbeats(), 0);

        let out = s.on_text(HELLO, t0).unwrap();
        assert_eq!(
            out,
            Outcome::Subscribe(r#"{"op":2,"d":{"subscribe_to_id":"42"}}"#.to_string())
        );
        assert_eq!(s.active_heartbeats(), 1);

        assert_eq!(s.poll_heartbeat(t0 + Duration::from_secs(29)).unwrap(), None);
        assert_eq!(
            s.poll_heartbeat(t0 + Duration::from_secs(30)).unwrap().as_deref(),
            Some(r#"{"op":3}"#)
        );
        assert_eq!(s.poll_heartbeat(t0 + Duration::from_secs(31)).unwrap(), None);
        assert!(s.poll_heartbeat(t0 + Duration::from_secs(60)).unwrap().is_some());
    }

    #[test]
    fn repeated_hello_keeps_a_single_timer() {
        let t0 = Instant::now();
        let mut s = session(t0);
        s.begin_connect();
        s.on_text(HELLO, t0).unwrap();
        s.on_text(r#"{"op":1,"d":{"heartbeat_interval":1000}}"#, t0).unwrap();
        assert_eq!(s.active_heartbeats(), 1);
        match s.phase() {
            Phase::Subscribed {
                heartbeat: Some(heartbeat),
            } => assert_eq!(heartbeat.interval(), Duration::from_secs(1)),
            other => panic!("unexpected phase {other:?}"),
        }
    }

    #[test]
    fn forced_close_reconnects_after_five_seconds_with_one_timer() {
        let t0 = Instant::now();
        let mut s = session(t0);
        s.begin_connect();
        s.on_text(HELLO, t0).unwrap();

        let closed = t0 + Duration::from_secs(10);
        s.on_close(closed);
        assert_eq!(s.active_heartbeats(), 0);
        assert_eq!(s.poll_heartbeat(closed + Duration::from_secs(60)).unwrap(), None);
        assert!(!s.ready_to_connect(closed + Duration::from_millis(4999)));
        assert!(s.ready_to_connect(closed + Duration::from_secs(5)));

        s.begin_connect();
        let again = closed + Duration::from_secs(5);
        s.on_text(HELLO, again).unwrap();
        assert_eq!(s.active_heartbeats(), 1);
        assert_eq!(s.attempts(), 2);
        // the old schedule is gone: nothing fires before a full interval on the new link
        assert_eq!(s.poll_heartbeat(again + Duration::from_secs(29)).unwrap(), None);
    }

    #[test]
    fn events_publish_and_bad_messages_error_without_state_change() {
        let t0 = Instant::now();
        let mut s = session(t0);
        s.begin_connect();
        let out = s
            .on_text(r#"{"op":0,"d":{"discord_status":"idle","spotify":null}}"#, t0)
            .unwrap();
        assert!(matches!(out, Outcome::Publish(p) if p.discord_status.as_deref() == Some("idle")));

        assert!(s.on_text("{", t0).is_err());
        assert!(s.on_text(r#"{"op":"hello"}"#, t0).is_err());
        assert_eq!(s.phase(), &Phase::Connecting);
    }

    #[test]
    fn hello_without_interval_still_subscribes_with_no_timer() {
        let t0 = Instant::now();
        let mut s = session(t0);
        s.begin_connect();
        let out = s.on_text(r#"{"op":1,"d":{}}"#, t0).unwrap();
        assert_eq!(
            out,
            Outcome::Subscribe(r#"{"op":2,"d":{"subscribe_to_id":"42"}}"#.to_string())
        );
        assert_eq!(s.phase(), &Phase::Subscribed { heartbeat: None });
        assert_eq!(s.active_heartbeats(), 0);
        assert_eq!(s.until_heartbeat(t0), None);
        assert_eq!(s.poll_heartbeat(t0 + Duration::from_secs(600)).unwrap(), None);

        // events still flow
        let ev = s.on_text(r#"{"op":0,"d":{"discord_status":"online"}}"#, t0).unwrap();
        assert!(matches!(ev, Outcome::Publish(_)));
    }

    #[test]
    fn disconnected_sessions_ignore_stray_text() {
        let t0 = Instant::now();
        let mut s = session(t0);
        assert_eq!(s.on_text(HELLO, t0).unwrap(), Outcome::Ignore);
        assert_eq!(s.active_heartbeats(), 0);
    }
}
