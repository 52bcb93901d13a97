//! Animated backdrop: twinkling stars, drifting planets, rare shooting stars.
//!
//! Everything is measured in logical surface pixels; the canvas decides how
//! many of them share one braille dot.

pub(crate) mod planet;
pub(crate) mod shooting;
pub(crate) mod star;

use crate::canvas::{PixelCanvas, RadialGradient, Rgb};
use planet::{anchor_planets, default_planets, spread_planets, Planet};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shooting::{ShootingStar, MAX_ACTIVE, SPAWN_CHANCE};
use star::Star;

const SPACE_INNER: Rgb = Rgb::new(0x10, 0x12, 0x25);
const SPACE_OUTER: Rgb = Rgb::new(0x05, 0x05, 0x05);

/// Deep-space gradient, brightest below the bottom edge.
pub(crate) fn background(w: f32, h: f32) -> RadialGradient {
    RadialGradient {
        focal: (w / 2.0, h * 2.0),
        center: (w / 2.0, h / 2.0),
        radius: h * 1.5,
        inner: SPACE_INNER,
        outer: SPACE_OUTER,
    }
}

pub(crate) struct Scene {
    width: f32,
    height: f32,
    stars: Vec<Star>,
    planets: Vec<Planet>,
    shooting: Vec<ShootingStar>,
    rng: StdRng,
    spawn_chance: f64,
    frames: u64,
    laid_out: bool,
}

impl Scene {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            stars: Vec::new(),
            planets: default_planets(),
            shooting: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            spawn_chance: SPAWN_CHANCE,
            frames: 0,
            laid_out: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_spawn_chance(mut self, p: f64) -> Self {
        self.spawn_chance = p;
        self
    }

    pub(crate) fn stars(&self) -> &[Star] {
        &self.stars
    }

    #[cfg(test)]
    pub(crate) fn planets(&self) -> &[Planet] {
        &self.planets
    }

    #[cfg(test)]
    pub(crate) fn shooting_stars(&self) -> &[ShootingStar] {
        &self.shooting
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    /// New surface size: re-anchor the planets and rebuild the whole star set.
    pub(crate) fn resize(&mut self, w: f32, h: f32) {
        self.width = w.max(0.0);
        self.height = h.max(0.0);
        if !std::mem::replace(&mut self.laid_out, true) {
            spread_planets(&mut self.planets, self.width);
        }
        anchor_planets(&mut self.planets, self.height);
        self.regenerate_stars();
        log::debug!(
            "scene resized to {:.0}x{:.0}, {} stars",
            self.width,
            self.height,
            self.stars.len()
        );
    }

    pub(crate) fn regenerate_stars(&mut self) {
        self.stars = star::generate(&mut self.rng, self.width, self.height);
    }

    /// Spawns a shooting star unless the cap is reached.
    pub(crate) fn launch_shooting_star(&mut self) -> bool {
        if self.shooting.len() >= MAX_ACTIVE {
            return false;
        }
        let s = ShootingStar::spawn(&mut self.rng, self.width, self.height);
        self.shooting.push(s);
        true
    }

    /// One display frame: clear, backdrop, stars, planets, shooting stars.
    pub(crate) fn frame(&mut self, canvas: &mut PixelCanvas) {
        self.pass(canvas, true);
        self.frames += 1;
    }

    /// Paints the current state without advancing it (paused).
    pub(crate) fn redraw(&mut self, canvas: &mut PixelCanvas) {
        self.pass(canvas, false);
    }

    fn pass(&mut self, canvas: &mut PixelCanvas, advance: bool) {
        let (w, h) = (self.width, self.height);

        canvas.clear();
        canvas.paint_background(background(w, h));

        for s in self.stars.iter_mut() {
            if advance {
                s.update();
            }
            s.draw(canvas);
        }

        for p in self.planets.iter_mut() {
            if advance && p.step(&mut self.rng, w, h) {
                log::trace!("{} wrapped to y={:.0}", p.name, p.y);
            }
            p.draw(canvas);
        }

        if advance && self.rng.gen_bool(self.spawn_chance.clamp(0.0, 1.0)) {
            self.launch_shooting_star();
        }

        self.shooting.retain_mut(|s| {
            if advance {
                s.advance();
            }
            s.draw(canvas);
            !s.is_gone(w, h)
        });
    }
}
