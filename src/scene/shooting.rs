use crate::canvas::{rgba, PixelCanvas};
use rand::Rng;
use std::f32::consts::FRAC_PI_4;

pub(crate) const MAX_ACTIVE: usize = 2;
pub(crate) const SPAWN_CHANCE: f64 = 0.001;
const LINE_WIDTH: f32 = 2.0;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ShootingStar {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) len: f32,
    pub(crate) speed: f32,
    pub(crate) angle: f32,
}

impl ShootingStar {
    /// Anywhere across the width, top half only, heading down-right.
    pub(crate) fn spawn<R: Rng>(rng: &mut R, w: f32, h: f32) -> Self {
        Self {
            x: rng.gen::<f32>() * w,
            y: rng.gen::<f32>() * (h / 2.0),
            len: rng.gen::<f32>() * 80.0 + 50.0,
            speed: rng.gen::<f32>() * 10.0 + 10.0,
            angle: FRAC_PI_4,
        }
    }

    pub(crate) fn advance(&mut self) {
        let (s, c) = self.angle.sin_cos();
        self.x += self.speed * c;
        self.y += self.speed * s;
    }

    pub(crate) fn tail(&self) -> (f32, f32) {
        let (s, c) = self.angle.sin_cos();
        (self.x - self.len * c, self.y - self.len * s)
    }

    /// Gone once the head is a full tail length past the right or bottom edge.
    pub(crate) fn is_gone(&self, w: f32, h: f32) -> bool {
        self.x > w + self.len || self.y > h + self.len
    }

    pub(crate) fn draw(&self, canvas: &mut PixelCanvas) {
        canvas.line((self.x, self.y), self.tail(), LINE_WIDTH, |t| {
            rgba(255, 255, 255, 1.0 - t)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn at(x: f32, y: f32) -> ShootingStar {
        ShootingStar {
            x,
            y,
            len: 100.0,
            speed: 10.0,
            angle: FRAC_PI_4,
        }
    }

    #[test]
    fn spawns_in_the_top_half_with_bounded_tail_and_speed() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let s = ShootingStar::spawn(&mut rng, 1200.0, 800.0);
            assert!(s.x >= 0.0 && s.x < 1200.0);
            assert!(s.y >= 0.0 && s.y < 400.0);
            assert!(s.len >= 50.0 && s.len < 130.0);
            assert!(s.speed >= 10.0 && s.speed < 20.0);
        }
    }

    #[test]
    fn moves_along_the_diagonal_and_trails_behind() {
        let mut s = at(100.0, 100.0);
        s.advance();
        let step = 10.0 * FRAC_PI_4.cos();
        assert!((s.x - (100.0 + step)).abs() < 1e-4);
        assert!((s.y - (100.0 + step)).abs() < 1e-4);
        let (tx, ty) = s.tail();
        assert!(tx < s.x && ty < s.y);
        assert!((((s.x - tx).powi(2) + (s.y - ty).powi(2)).sqrt() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn removal_happens_exactly_past_width_or_height_plus_tail() {
        let (w, h) = (800.0, 600.0);
        assert!(!at(900.0, 10.0).is_gone(w, h));
        assert!(at(900.01, 10.0).is_gone(w, h));
        assert!(!at(10.0, 700.0).is_gone(w, h));
        assert!(at(10.0, 700.01).is_gone(w, h));
    }
}
