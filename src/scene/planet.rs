use crate::canvas::{rgba, Composite, Frame2, PixelCanvas, Rgb, Rgba};
use rand::Rng;

/// How far past the right edge a planet travels before wrapping, and where it re-enters.
pub(crate) const WRAP_MARGIN: f32 = 150.0;

/// Vertical anchors (fraction of height) applied on every resize, in planet order.
pub(crate) const ANCHORS: [f32; 4] = [0.20, 0.75, 0.50, 0.85];

/// Horizontal starting points (fraction of width) for the first layout.
pub(crate) const START_X: [f32; 4] = [0.05, 0.30, 0.55, 0.80];

const RING_TILT: f32 = 0.4;
const GLOW_STRENGTH: f32 = 0.35;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Variant {
    Solid,
    Ringed,
    Striped,
}

#[derive(Clone, Debug)]
pub(crate) struct Planet {
    pub(crate) name: &'static str,
    pub(crate) variant: Variant,
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) radius: f32,
    pub(crate) vx: f32,
    pub(crate) colors: [Rgb; 2],
}

fn hex(s: &str) -> Rgb {
    Rgb::from_hex(s).unwrap_or(Rgb::WHITE)
}

pub(crate) fn default_planets() -> Vec<Planet> {
    let p = |name, variant, radius, vx, c0, c1| Planet {
        name,
        variant,
        x: -WRAP_MARGIN,
        y: 0.0,
        radius,
        vx,
        colors: [hex(c0), hex(c1)],
    };
    vec![
        p("Saturn", Variant::Ringed, 40.0, 0.20, "#e0c39c", "#a88b68"),
        p("Mars", Variant::Solid, 15.0, 0.35, "#ff4b1f", "#ff9068"),
        p("Jupiter", Variant::Striped, 55.0, 0.15, "#b9935a", "#d4af37"),
        p("Neptune", Variant::Solid, 28.0, 0.18, "#2193b0", "#6dd5ed"),
    ]
}

pub(crate) fn anchor_planets(planets: &mut [Planet], h: f32) {
    for (p, frac) in planets.iter_mut().zip(ANCHORS) {
        p.y = h * frac;
    }
}

/// Staggers the planets across the surface so they do not enter as a group.
pub(crate) fn spread_planets(planets: &mut [Planet], w: f32) {
    for (p, frac) in planets.iter_mut().zip(START_X) {
        p.x = w * frac;
    }
}

impl Planet {
    /// Moves right; past `w + WRAP_MARGIN` it re-enters at `-WRAP_MARGIN` at a fresh height.
    /// Returns true when it wrapped.
    pub(crate) fn step<R: Rng>(&mut self, rng: &mut R, w: f32, h: f32) -> bool {
        self.x += self.vx;
        if self.x > w + WRAP_MARGIN {
            self.x = -WRAP_MARGIN;
            self.y = rng.gen::<f32>() * (h * 0.8) + h * 0.1;
            return true;
        }
        false
    }

    fn body_paint(&self) -> impl Fn(f32, f32) -> Rgba {
        let (cx, cy, r) = (self.x, self.y, self.radius);
        let [c0, c1] = self.colors;
        // linear gradient along the (-r,-r) -> (r,r) diagonal
        move |x, y| {
            let t = ((x - cx) + (y - cy) + 2.0 * r) / (4.0 * r);
            Rgba {
                rgb: c0.lerp(c1, t),
                a: 1.0,
            }
        }
    }

    pub(crate) fn draw(&self, canvas: &mut PixelCanvas) {
        let r = self.radius;
        if r <= 0.0 {
            return;
        }
        canvas.glow(self.x, self.y, r, r * 0.5, self.colors[0], GLOW_STRENGTH);
        canvas.fill_circle(self.x, self.y, r, self.body_paint());

        let frame = Frame2::at(self.x, self.y);
        match self.variant {
            Variant::Solid => {}
            Variant::Ringed => self.draw_rings(canvas, frame.rotated(RING_TILT)),
            Variant::Striped => canvas.with_composite(Composite::SourceAtop, |c| {
                c.fill_rect(frame, -r, -r * 0.4, r * 2.0, r * 0.2, rgba(0, 0, 0, 0.1));
                c.fill_rect(frame, -r, r * 0.1, r * 2.0, r * 0.25, rgba(0, 0, 0, 0.15));
                // storm
                c.fill_ellipse(frame, r * 0.3, r * 0.2, r * 0.2, r * 0.1, rgba(150, 50, 50, 0.2));
            }),
        }
    }

    fn draw_rings(&self, canvas: &mut PixelCanvas, tilted: Frame2) {
        let r = self.radius;
        canvas.stroke_ellipse(tilted, r * 2.2, r * 0.6, r * 0.4, rgba(230, 230, 230, 0.4));
        canvas.stroke_ellipse(tilted, r * 1.8, r * 0.5, 1.0, rgba(100, 100, 100, 0.2));

        let shadow = rgba(0, 0, 0, 0.1);
        let r2 = r * r;
        canvas.fill_where(
            (self.x - r, self.y - r),
            (self.x + r, self.y + r),
            |x, y| {
                let (lx, ly) = tilted.to_local(x, y);
                (ly >= 0.0 && lx * lx + ly * ly <= r2).then_some(shadow)
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Pixel, OPAQUE_ALPHA};
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn default_set_matches_the_four_bodies() {
        let planets = default_planets();
        let names: Vec<_> = planets.iter().map(|p| p.name).collect();
        assert_eq!(names, ["Saturn", "Mars", "Jupiter", "Neptune"]);
        assert_eq!(planets[0].variant, Variant::Ringed);
        assert_eq!(planets[2].variant, Variant::Striped);
        assert_eq!(planets[1].colors[0], Rgb::new(0xff, 0x4b, 0x1f));
    }

    #[test]
    fn anchors_are_fractions_of_height() {
        let mut planets = default_planets();
        anchor_planets(&mut planets, 1000.0);
        let ys: Vec<_> = planets.iter().map(|p| p.y).collect();
        assert_eq!(ys, [200.0, 750.0, 500.0, 850.0]);
    }

    #[test]
    fn planet_does_not_wrap_until_past_the_margin() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = default_planets().remove(1);
        p.vx = 1.0;
        p.x = 800.0 + WRAP_MARGIN - 1.0;
        p.y = 42.0;
        assert!(!p.step(&mut rng, 800.0, 600.0));
        assert_eq!(p.y, 42.0);
        assert!(p.step(&mut rng, 800.0, 600.0));
        assert_eq!(p.x, -WRAP_MARGIN);
    }

    #[test]
    fn stripes_stay_inside_the_disc() {
        let mut p = default_planets().remove(2);
        p.x = 100.0;
        p.y = 100.0;

        let mut plain = PixelCanvas::new(200, 200, 1.0);
        let mut solid = p.clone();
        solid.variant = Variant::Solid;
        solid.draw(&mut plain);

        let mut striped = PixelCanvas::new(200, 200, 1.0);
        p.draw(&mut striped);

        assert_eq!(striped.composite(), Composite::SourceOver);
        for (a, b) in plain.px.iter().zip(&striped.px) {
            if a.a < OPAQUE_ALPHA {
                assert_eq!(a, b);
            }
        }
        // a band row near the middle is darker than the plain disc
        let Pixel { r: pr, .. } = plain.pixel(100, 85);
        let Pixel { r: sr, .. } = striped.pixel(100, 85);
        assert!(sr < pr);
    }

    #[test]
    fn rings_reach_past_the_glow_and_shadow_only_the_lower_half() {
        let mut p = default_planets().remove(0);
        p.x = 100.0;
        p.y = 100.0;

        let mut plain = PixelCanvas::new(250, 200, 1.0);
        let mut solid = p.clone();
        solid.variant = Variant::Solid;
        solid.draw(&mut plain);

        let mut ringed = PixelCanvas::new(250, 200, 1.0);
        p.draw(&mut ringed);
        assert_eq!(ringed.composite(), Composite::SourceOver);

        // the glow stops at 1.5r, the outer ring runs out to about 2.4r
        let ring_only = plain
            .px
            .iter()
            .zip(&ringed.px)
            .filter(|(a, b)| a.a == 0 && b.a > 0)
            .count();
        assert!(ring_only > 0);

        let tilted = Frame2::at(p.x, p.y).rotated(RING_TILT);
        let (mut shaded, mut lit) = (0, 0);
        for iy in 0..ringed.h {
            for ix in 0..ringed.w {
                let (cx, cy) = ringed.dot_center(ix, iy);
                let (lx, ly) = tilted.to_local(cx, cy);
                if lx.abs() >= 3.0 {
                    continue;
                }
                let (a, b) = (plain.pixel(ix, iy), ringed.pixel(ix, iy));
                if ly > 6.0 && ly < 12.0 {
                    assert!(b.r < a.r, "no shadow at local ({lx}, {ly})");
                    shaded += 1;
                } else if ly < -6.0 && ly > -12.0 {
                    assert_eq!(a, b, "upper half touched at local ({lx}, {ly})");
                    lit += 1;
                }
            }
        }
        assert!(shaded > 0 && lit > 0);
    }

    proptest! {
        #[test]
        fn wrapped_planets_reenter_in_the_middle_band(
            seed in any::<u64>(),
            w in 100.0f32..4000.0,
            h in 100.0f32..3000.0,
            idx in 0usize..4,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut p = default_planets().remove(idx);
            p.x = w + WRAP_MARGIN + 0.01;
            prop_assert!(p.step(&mut rng, w, h));
            prop_assert_eq!(p.x, -WRAP_MARGIN);
            prop_assert!(p.y >= 0.1 * h && p.y <= 0.9 * h);
        }
    }
}
