//! Text overlay: the status card, the toast, and the key hints.

use crate::presence::state::{PresenceState, Progress, Section, Status};
use crate::presence::LinkState;
use crate::render::{draw_text, draw_text_over, pad_to, CellBuffer};
use crossterm::style::Color;
use std::time::{Duration, Instant};

pub(crate) const TOAST_LIFETIME: Duration = Duration::from_secs(3);

const CARD_X: u16 = 2;
const CARD_Y: u16 = 1;
const CARD_W: usize = 44;
const BAR_W: usize = 20;
const PANEL: Color = Color::Rgb { r: 12, g: 14, b: 30 };
const DIM: Color = Color::Rgb { r: 120, g: 125, b: 150 };

struct Toast {
    message: String,
    until: Instant,
}

/// Per-second and transient UI state that is not part of the presence snapshot.
pub(crate) struct Hud {
    toast: Option<Toast>,
    idle_secs: u64,
    progress: Option<Progress>,
    link: LinkState,
    mono: bool,
}

pub(crate) fn format_counter(secs: u64) -> String {
    format!("{:02}:{:02} elapsed", secs / 60, secs % 60)
}

pub(crate) fn bar(value01: f64, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f64 + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { '·' });
    }
    s.push(']');
    s
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Online => Color::Rgb { r: 67, g: 181, b: 129 },
        Status::Idle => Color::Rgb { r: 250, g: 166, b: 26 },
        Status::Dnd => Color::Rgb { r: 240, g: 71, b: 71 },
        Status::Offline => Color::Rgb { r: 116, g: 127, b: 141 },
    }
}

impl Hud {
    pub(crate) fn new(mono: bool) -> Self {
        Self {
            toast: None,
            idle_secs: 0,
            progress: None,
            link: LinkState::Connecting,
            mono,
        }
    }

    pub(crate) fn show_toast(&mut self, message: impl Into<String>, now: Instant) {
        self.toast = Some(Toast {
            message: message.into(),
            until: now + TOAST_LIFETIME,
        });
    }

    pub(crate) fn toast(&self, now: Instant) -> Option<&str> {
        self.toast
            .as_ref()
            .filter(|t| now < t.until)
            .map(|t| t.message.as_str())
    }

    pub(crate) fn link(&self) -> LinkState {
        self.link
    }

    /// True when the link actually changed.
    pub(crate) fn set_link(&mut self, link: LinkState) -> bool {
        std::mem::replace(&mut self.link, link) != link
    }

    /// Wall-clock second: bump the idle counter and recompute track progress.
    pub(crate) fn tick_second(&mut self, presence: &PresenceState, now_ms: i64) {
        self.idle_secs += 1;
        self.refresh_progress(presence, now_ms);
    }

    pub(crate) fn refresh_progress(&mut self, presence: &PresenceState, now_ms: i64) {
        self.progress = presence.progress_at(now_ms);
    }

    #[cfg(test)]
    pub(crate) fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub(crate) fn idle_counter(&self) -> String {
        format_counter(self.idle_secs)
    }

    fn color(&self, c: Color) -> Color {
        if self.mono {
            Color::White
        } else {
            c
        }
    }

    fn panel(&self) -> Color {
        if self.mono {
            Color::Black
        } else {
            PANEL
        }
    }

    fn card_lines(&self, presence: &PresenceState) -> Vec<String> {
        let status = presence.status();
        let link = self.link.label();
        let head = format!(" ● {}", status.tooltip());
        let gap = CARD_W.saturating_sub(head.chars().count() + link.chars().count() + 1);
        let mut lines = vec![format!("{head}{}{link} ", " ".repeat(gap))];

        match (presence.section(), presence.track()) {
            (Section::Track, Some(track)) => {
                lines.push(format!(" ♪ {}", track.title));
                lines.push(format!("   {}", track.artist));
                if let (Some(p), Some(w)) = (self.progress, track.window) {
                    lines.push(format!(
                        "   {} {} / {}",
                        bar(p.percent / 100.0, BAR_W),
                        p.elapsed_label(),
                        w.total_label()
                    ));
                }
                if let Some(url) = &track.artwork_url {
                    lines.push(format!("   art {url}"));
                }
            }
            _ => {
                lines.push(" ✦ nothing playing".to_string());
                lines.push(format!("   {}", self.idle_counter()));
            }
        }
        lines
    }

    pub(crate) fn draw(&self, buf: &mut CellBuffer, presence: &PresenceState, paused: bool, now: Instant) {
        let fg = self.color(Color::White);
        let panel = self.panel();
        for (i, line) in self.card_lines(presence).iter().enumerate() {
            draw_text(buf, CARD_X, CARD_Y + i as u16, &pad_to(line, CARD_W), fg, panel);
        }
        // status dot
        draw_text(
            buf,
            CARD_X + 1,
            CARD_Y,
            "●",
            self.color(status_color(presence.status())),
            panel,
        );

        let bottom = buf.h.saturating_sub(1);
        let mut hints = String::from("q quit  space pause  r stars  s shoot  t status");
        if paused {
            hints.push_str("  [paused]");
        }
        draw_text_over(buf, 1, bottom, &hints, self.color(DIM));

        if let Some(msg) = self.toast(now) {
            let text = format!(" {msg} ");
            let len = text.chars().count() as u16;
            let x = buf.w.saturating_sub(len) / 2;
            let (tfg, tbg) = if self.mono {
                (Color::Black, Color::White)
            } else {
                (Color::Rgb { r: 10, g: 10, b: 20 }, Color::Rgb { r: 220, g: 220, b: 235 })
            };
            draw_text(buf, x, bottom.saturating_sub(2), &text, tfg, tbg);
        }
    }
}
