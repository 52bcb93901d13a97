use crate::canvas::{rgba, PixelCanvas};
use rand::Rng;

/// Twinkle turns around when opacity leaves this band.
pub(crate) const OPACITY_FLOOR: f32 = 0.2;
pub(crate) const OPACITY_CEIL: f32 = 1.0;

/// One star per this many square surface pixels.
pub(crate) const AREA_PER_STAR: f64 = 4000.0;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Star {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) radius: f32,
    pub(crate) opacity: f32,
    // signed step per frame
    pub(crate) twinkle: f32,
}

impl Star {
    pub(crate) fn random<R: Rng>(rng: &mut R, w: f32, h: f32) -> Self {
        Self {
            x: rng.gen::<f32>() * w,
            y: rng.gen::<f32>() * h,
            radius: rng.gen::<f32>() * 1.5,
            opacity: OPACITY_FLOOR + rng.gen::<f32>() * (OPACITY_CEIL - OPACITY_FLOOR),
            twinkle: rng.gen::<f32>() * 0.02 + 0.005,
        }
    }

    /// Ping-pong: step, then reverse once the band is crossed. No clamping.
    pub(crate) fn update(&mut self) {
        self.opacity += self.twinkle;
        if self.opacity > OPACITY_CEIL || self.opacity < OPACITY_FLOOR {
            self.twinkle = -self.twinkle;
        }
    }

    pub(crate) fn draw(&self, canvas: &mut PixelCanvas) {
        let a = self.opacity.abs().min(1.0);
        canvas.fill_circle(self.x, self.y, self.radius, |_, _| rgba(255, 255, 255, a));
    }
}

pub(crate) fn star_count(w: f32, h: f32) -> usize {
    if w <= 0.0 || h <= 0.0 {
        return 0;
    }
    ((w as f64 * h as f64) / AREA_PER_STAR).floor() as usize
}

pub(crate) fn generate<R: Rng>(rng: &mut R, w: f32, h: f32) -> Vec<Star> {
    let count = star_count(w, h);
    (0..count).map(|_| Star::random(rng, w, h)).collect()
}
