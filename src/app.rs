use crate::config::Config;
use crate::input::{collect_input_nonblocking, map_event_to_action, Action};
use crate::presence::client::{self, ClientOptions};
use crate::presence::state::PresenceState;
use crate::presence::{LinkState, PresenceEvent};
use crate::render::{canvas_to_cells, Terminal};
use crate::scene::Scene;
use crate::task::CancelToken;
use crate::ui::Hud;
use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const SECOND: Duration = Duration::from_secs(1);
const CLIENT_POLL: Duration = Duration::from_millis(250);

pub(crate) struct App {
    cfg: Config,
    term: Terminal,
    scene: Scene,
    presence: PresenceState,
    hud: Hud,
    events: Receiver<PresenceEvent>,
    cancel: CancelToken,
    paused: bool,
    next_second: Instant,
    _client: Option<JoinHandle<()>>,
}

fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl App {
    fn init(cfg: Config, cancel: CancelToken) -> anyhow::Result<Self> {
        let (tx, events) = unbounded();
        let client = client::spawn(
            ClientOptions {
                user_id: cfg.user_id.clone(),
                url: cfg.socket_url.clone(),
                reconnect_delay: cfg.reconnect_delay,
                poll: CLIENT_POLL,
            },
            tx,
            cancel.clone(),
        )?;

        let term = Terminal::begin(cfg.px_per_dot)?;
        let scene = Scene::new(cfg.seed);
        let hud = Hud::new(cfg.mono);

        Ok(Self {
            cfg,
            term,
            scene,
            presence: PresenceState::default(),
            hud,
            events,
            cancel,
            paused: false,
            next_second: Instant::now() + SECOND,
            _client: client,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let frame_dt = Duration::from_secs_f32(1.0 / self.cfg.fps as f32);
        self.sync_surface();

        while !self.cancel.is_cancelled() {
            let frame_start = Instant::now();
            if self.term.resize_if_needed()? {
                self.sync_surface();
            }

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event_to_action(&ev) {
                    self.apply(action, frame_start);
                }
            }

            self.drain_presence(frame_start);
            self.tick_clock(frame_start);
            self.render_frame(frame_start)?;

            spin_sleep(frame_dt, frame_start);
        }
        Ok(())
    }

    fn sync_surface(&mut self) {
        let (w, h) = self.term.canvas.surface_size();
        self.scene.resize(w, h);
    }

    fn apply(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => self.cancel.cancel(),
            Action::TogglePause => self.paused = !self.paused,
            Action::RegenerateStars => {
                self.scene.regenerate_stars();
                self.hud.show_toast(format!("{} new stars", self.scene.stars().len()), now);
            }
            Action::LaunchShootingStar => {
                if !self.scene.launch_shooting_star() {
                    self.hud.show_toast("Sky is busy", now);
                }
            }
            Action::ToastStatus => {
                let status = self.presence.status().tooltip();
                let msg = match self.presence.track() {
                    Some(t) => format!("{status}: {} by {}", t.title, t.artist),
                    None => format!("{status} ({})", self.hud.link().label()),
                };
                self.hud.show_toast(msg, now);
            }
        }
    }

    /// Single writer of the presence snapshot.
    fn drain_presence(&mut self, now: Instant) {
        loop {
            match self.events.try_recv() {
                Ok(PresenceEvent::Link(link)) => {
                    if self.hud.set_link(link) {
                        match link {
                            LinkState::Live => self.hud.show_toast("Presence connected", now),
                            LinkState::Offline { retry_in } => self
                                .hud
                                .show_toast(format!("Presence lost, retrying in {}s", retry_in.as_secs()), now),
                            LinkState::Demo => self.hud.show_toast("Demo mode", now),
                            LinkState::Connecting => {}
                        }
                    }
                }
                Ok(PresenceEvent::Presence(payload)) => {
                    let applied = self.presence.apply(payload);
                    log::debug!("presence update #{}", self.presence.updates());
                    self.hud.refresh_progress(&self.presence, wall_clock_ms());
                    if applied.status_changed {
                        log::info!("status now {}", self.presence.status().class());
                    }
                    if applied.section_changed {
                        log::debug!("presence section now {:?}", self.presence.section());
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn tick_clock(&mut self, now: Instant) {
        if now.saturating_duration_since(self.next_second) > SECOND * 5 {
            // suspended or stalled; resync instead of replaying
            self.next_second = now;
        }
        while now >= self.next_second {
            self.hud.tick_second(&self.presence, wall_clock_ms());
            self.next_second += SECOND;
        }
    }

    fn render_frame(&mut self, now: Instant) -> anyhow::Result<()> {
        if self.paused {
            self.scene.redraw(&mut self.term.canvas);
        } else {
            self.scene.frame(&mut self.term.canvas);
        }
        canvas_to_cells(&self.term.canvas, &mut self.term.cur, self.cfg.mono);
        self.hud.draw(&mut self.term.cur, &self.presence, self.paused, now);
        self.term.present()?;
        Ok(())
    }
}

pub(crate) fn run(cfg: Config) -> anyhow::Result<()> {
    if cfg.demo_mode() {
        log::info!("demo mode: presence disabled");
    }
    let cancel = CancelToken::new();
    let mut app = App::init(cfg, cancel.clone()).inspect_err(|_| cancel.cancel())?;
    let result = app.run();
    cancel.cancel();
    let restored = app.term.end();
    log::info!("{} frames drawn", app.scene.frames());
    result.and(restored)
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
