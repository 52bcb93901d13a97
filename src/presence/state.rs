//! What the overlay shows, derived from the latest presence push.

use super::protocol::{PresencePayload, SpotifyPayload};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Status {
    Online,
    Idle,
    Dnd,
    #[default]
    Offline,
}

impl Status {
    /// Anything other than the three known live values reads as offline.
    pub(crate) fn normalize(raw: Option<&str>) -> Self {
        match raw {
            Some("online") => Status::Online,
            Some("idle") => Status::Idle,
            Some("dnd") => Status::Dnd,
            _ => Status::Offline,
        }
    }

    pub(crate) fn class(self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Idle => "idle",
            Status::Dnd => "dnd",
            Status::Offline => "offline",
        }
    }

    pub(crate) fn tooltip(self) -> String {
        capitalize(self.class())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `m:ss`, minutes unpadded. Negative input reads as zero.
pub(crate) fn format_clock(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TrackWindow {
    pub(crate) start_ms: i64,
    pub(crate) end_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Progress {
    /// Always within [0, 100].
    pub(crate) percent: f64,
    pub(crate) elapsed_ms: i64,
}

impl Progress {
    pub(crate) fn elapsed_label(&self) -> String {
        format_clock(self.elapsed_ms)
    }
}

impl TrackWindow {
    pub(crate) fn total_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub(crate) fn total_label(&self) -> String {
        format_clock(self.total_ms())
    }

    pub(crate) fn progress(&self, now_ms: i64) -> Progress {
        let elapsed = now_ms.saturating_sub(self.start_ms);
        let total = self.total_ms();
        let percent = if total <= 0 {
            100.0
        } else {
            (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        Progress {
            percent,
            elapsed_ms: elapsed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TrackState {
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) artwork_url: Option<String>,
    pub(crate) window: Option<TrackWindow>,
}

impl From<SpotifyPayload> for TrackState {
    fn from(s: SpotifyPayload) -> Self {
        let window = s.timestamps.and_then(|ts| match (ts.start, ts.end) {
            // a window whose length does not fit in i64 is junk; show the track without progress
            (Some(start_ms), Some(end_ms)) if end_ms.checked_sub(start_ms).is_some() => {
                Some(TrackWindow { start_ms, end_ms })
            }
            _ => None,
        });
        TrackState {
            title: s.song,
            artist: s.artist,
            artwork_url: s.album_art_url.filter(|u| !u.is_empty()),
            window,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Section {
    Idle,
    Track,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Applied {
    pub(crate) status_changed: bool,
    pub(crate) section_changed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct PresenceState {
    status: Status,
    track: Option<TrackState>,
    updates: u64,
}

impl PresenceState {
    pub(crate) fn apply(&mut self, payload: PresencePayload) -> Applied {
        let before = (self.status, self.section());
        self.status = Status::normalize(payload.discord_status.as_deref());
        self.track = payload.spotify.map(TrackState::from);
        self.updates += 1;
        Applied {
            status_changed: before.0 != self.status,
            section_changed: before.1 != self.section(),
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn track(&self) -> Option<&TrackState> {
        self.track.as_ref()
    }

    pub(crate) fn section(&self) -> Section {
        if self.track.is_some() {
            Section::Track
        } else {
            Section::Idle
        }
    }

    pub(crate) fn updates(&self) -> u64 {
        self.updates
    }

    /// None without a track or without its time window.
    pub(crate) fn progress_at(&self, now_ms: i64) -> Option<Progress> {
        self.track.as_ref()?.window.map(|w| w.progress(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::protocol::Timestamps;
    use proptest::prelude::*;

    fn payload(status: Option<&str>, track: Option<(i64, i64)>) -> PresencePayload {
        PresencePayload {
            discord_status: status.map(str::to_string),
            spotify: track.map(|(start, end)| SpotifyPayload {
                song: "Nightcall".into(),
                artist: "Kavinsky".into(),
                album_art_url: Some("https://i.scdn.co/image/x".into()),
                timestamps: Some(Timestamps {
                    start: Some(start),
                    end: Some(end),
                }),
            }),
        }
    }

    #[test]
    fn status_normalization() {
        assert_eq!(Status::normalize(Some("online")), Status::Online);
        assert_eq!(Status::normalize(Some("idle")), Status::Idle);
        assert_eq!(Status::normalize(Some("dnd")), Status::Dnd);
        assert_eq!(Status::normalize(Some("busy")), Status::Offline);
        assert_eq!(Status::normalize(Some("Online")), Status::Offline);
        assert_eq!(Status::normalize(None), Status::Offline);
        assert_eq!(Status::Dnd.tooltip(), "Dnd");
        assert_eq!(Status::Offline.tooltip(), "Offline");
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(180_000), "3:00");
        assert_eq!(format_clock(90_000), "1:30");
        assert_eq!(format_clock(9_999), "0:09");
        assert_eq!(format_clock(3_725_000), "62:05");
        assert_eq!(format_clock(-5_000), "0:00");
    }

    #[test]
    fn track_progress_at_half_and_past_the_end() {
        let mut state = PresenceState::default();
        state.apply(payload(Some("online"), Some((0, 180_000))));
        let window = state.track().and_then(|t| t.window).unwrap();
        assert_eq!(window.total_label(), "3:00");

        let half = state.progress_at(90_000).unwrap();
        assert_eq!(half.percent, 50.0);
        assert_eq!(half.elapsed_label(), "1:30");

        let over = state.progress_at(200_000).unwrap();
        assert_eq!(over.percent, 100.0);
        assert_eq!(over.elapsed_label(), "3:20");

        assert_eq!(state.progress_at(-1_000).unwrap().percent, 0.0);
    }

    #[test]
    fn null_track_after_a_track_switches_to_idle() {
        let mut state = PresenceState::default();
        let first = state.apply(payload(Some("online"), Some((0, 1000))));
        assert!(first.section_changed && first.status_changed);
        assert_eq!(state.section(), Section::Track);

        let second = state.apply(payload(Some("online"), None));
        assert!(second.section_changed);
        assert!(!second.status_changed);
        assert_eq!(state.section(), Section::Idle);
        assert!(state.track().is_none());
        assert!(state.progress_at(500).is_none());
        assert_eq!(state.updates(), 2);
    }

    #[test]
    fn unknown_status_is_offline() {
        let mut state = PresenceState::default();
        state.apply(payload(Some("online"), None));
        state.apply(payload(Some("busy"), None));
        assert_eq!(state.status(), Status::Offline);
        assert_eq!(state.status().class(), "offline");
    }

    #[test]
    fn track_without_timestamps_has_no_progress() {
        let mut state = PresenceState::default();
        let mut p = payload(None, Some((0, 1)));
        if let Some(s) = p.spotify.as_mut() {
            s.timestamps = Some(Timestamps {
                start: Some(10),
                end: None,
            });
            s.album_art_url = Some(String::new());
        }
        state.apply(p);
        assert_eq!(state.section(), Section::Track);
        assert!(state.progress_at(100).is_none());
        assert_eq!(state.track().and_then(|t| t.artwork_url.clone()), None);
    }

    #[test]
    fn zero_length_track_reads_as_complete() {
        let w = TrackWindow {
            start_ms: 500,
            end_ms: 500,
        };
        assert_eq!(w.progress(0).percent, 100.0);
        assert_eq!(w.total_label(), "0:00");
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let mut state = PresenceState::default();
        state.apply(payload(Some("online"), Some((i64::MIN, 1))));
        assert_eq!(state.section(), Section::Track);
        assert!(state.progress_at(1_700_000_000_000).is_none());

        let w = TrackWindow {
            start_ms: i64::MIN,
            end_ms: i64::MAX,
        };
        let p = w.progress(1_700_000_000_000);
        assert!((0.0..=100.0).contains(&p.percent));
        assert_eq!(p.elapsed_ms, i64::MAX);
        assert_eq!(w.total_ms(), i64::MAX);

        let late = TrackWindow {
            start_ms: i64::MAX,
            end_ms: i64::MAX,
        };
        assert_eq!(late.progress(i64::MIN).elapsed_label(), "0:00");
    }

    proptest! {
        #[test]
        fn progress_is_always_a_percentage(
            start in -1_000_000i64..1_000_000,
            len in -10_000i64..1_000_000,
            now in -5_000_000i64..5_000_000,
        ) {
            let w = TrackWindow { start_ms: start, end_ms: start + len };
            let p = w.progress(now);
            prop_assert!((0.0..=100.0).contains(&p.percent));
            prop_assert_eq!(p.elapsed_ms, now - start);
        }
    }
}
