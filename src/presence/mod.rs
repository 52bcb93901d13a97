//! Live Discord/Spotify presence over the Lanyard socket.
//!
//! A background thread owns the socket and hands events to the render loop
//! through a channel; only the render loop touches [`state::PresenceState`].

pub(crate) mod client;
pub(crate) mod protocol;
pub(crate) mod session;
pub(crate) mod state;

use protocol::PresencePayload;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkState {
    /// No user id configured; the widget stays on its defaults.
    Demo,
    Connecting,
    Live,
    Offline { retry_in: Duration },
}

impl LinkState {
    pub(crate) fn label(self) -> String {
        match self {
            LinkState::Demo => "demo".into(),
            LinkState::Connecting => "connecting".into(),
            LinkState::Live => "live".into(),
            LinkState::Offline { retry_in } => format!("offline, retry {}s", retry_in.as_secs()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PresenceEvent {
    Link(LinkState),
    Presence(PresencePayload),
}
