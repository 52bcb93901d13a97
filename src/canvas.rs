use crossterm::style::Color;

/* -----------------------------
   Colors
------------------------------ */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub(crate) const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub(crate) const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`.
    pub(crate) fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let v = u32::from_str_radix(hex, 16).ok()?;
        Some(Self::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }

    pub(crate) fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            let (a, b) = (a as f32, b as f32);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    pub(crate) fn to_color(self) -> Color {
        Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Paint color with straight (non-premultiplied) alpha in 0..1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Rgba {
    pub(crate) rgb: Rgb,
    pub(crate) a: f32,
}

pub(crate) const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Rgba {
    Rgba {
        rgb: Rgb::new(r, g, b),
        a,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Pixels at or above this alpha count as opaque for `SourceAtop`.
pub(crate) const OPAQUE_ALPHA: u8 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Composite {
    SourceOver,
    /// Only paints over pixels that are already opaque; destination alpha is kept.
    SourceAtop,
}

/* -----------------------------
   Radial background gradient
------------------------------ */

/// Two-circle radial gradient: a focal point (radius 0) growing into an end circle.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RadialGradient {
    pub(crate) focal: (f32, f32),
    pub(crate) center: (f32, f32),
    pub(crate) radius: f32,
    pub(crate) inner: Rgb,
    pub(crate) outer: Rgb,
}

impl RadialGradient {
    /// Gradient parameter of a point: the largest t whose interpolated circle passes through it.
    pub(crate) fn t_at(&self, x: f32, y: f32) -> f32 {
        let (qx, qy) = (x - self.focal.0, y - self.focal.1);
        let (dx, dy) = (self.center.0 - self.focal.0, self.center.1 - self.focal.1);

        let a = dx * dx + dy * dy - self.radius * self.radius;
        let b = qx * dx + qy * dy;
        let c = qx * qx + qy * qy;

        let t = if a.abs() < 1e-3 {
            if b <= 0.0 {
                return 1.0;
            }
            c / (2.0 * b)
        } else {
            let disc = b * b - a * c;
            if disc < 0.0 {
                return 1.0;
            }
            let s = disc.sqrt();
            let t0 = (b + s) / a;
            let t1 = (b - s) / a;
            t0.max(t1)
        };
        if t.is_finite() {
            t.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub(crate) fn color_at(&self, x: f32, y: f32) -> Rgb {
        self.inner.lerp(self.outer, self.t_at(x, y))
    }
}

/* -----------------------------
   Local frames (translate + rotate)
------------------------------ */

#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame2 {
    pub(crate) origin: (f32, f32),
    pub(crate) angle: f32,
}

impl Frame2 {
    pub(crate) fn at(x: f32, y: f32) -> Self {
        Self {
            origin: (x, y),
            angle: 0.0,
        }
    }

    pub(crate) fn rotated(self, angle: f32) -> Self {
        Self {
            angle: self.angle + angle,
            ..self
        }
    }

    /// Surface coordinates -> local coordinates.
    pub(crate) fn to_local(&self, x: f32, y: f32) -> (f32, f32) {
        let (dx, dy) = (x - self.origin.0, y - self.origin.1);
        let (s, c) = self.angle.sin_cos();
        (c * dx + s * dy, -s * dx + c * dy)
    }
}

/* -----------------------------
   Pixel canvas
------------------------------ */

/// Ink layer in braille dots, addressed in logical surface pixels.
///
/// One dot covers `scale` logical pixels on each axis. The background gradient is
/// kept separately so it can become the cell background instead of ink.
pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) scale: f32,
    pub(crate) px: Vec<Pixel>,
    composite: Composite,
    background: Option<RadialGradient>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32, scale: f32) -> Self {
        Self {
            w,
            h,
            scale: scale.max(0.25),
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
            composite: Composite::SourceOver,
            background: None,
        }
    }

    /// Logical surface size.
    pub(crate) fn surface_size(&self) -> (f32, f32) {
        (self.w as f32 * self.scale, self.h as f32 * self.scale)
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.px[self.idx(x, y)]
    }

    pub(crate) fn clear(&mut self) {
        self.px.fill(Pixel::default());
        self.background = None;
        self.composite = Composite::SourceOver;
    }

    pub(crate) fn paint_background(&mut self, g: RadialGradient) {
        self.background = Some(g);
    }

    pub(crate) fn background_at(&self, x: f32, y: f32) -> Option<Rgb> {
        self.background.map(|g| g.color_at(x, y))
    }

    #[cfg(test)]
    pub(crate) fn composite(&self) -> Composite {
        self.composite
    }

    /// Runs `f` with `mode` active, restoring the previous mode afterwards.
    pub(crate) fn with_composite(&mut self, mode: Composite, f: impl FnOnce(&mut Self)) {
        let prev = self.composite;
        self.composite = mode;
        f(self);
        self.composite = prev;
    }

    pub(crate) fn dot_center(&self, ix: u32, iy: u32) -> (f32, f32) {
        (
            (ix as f32 + 0.5) * self.scale,
            (iy as f32 + 0.5) * self.scale,
        )
    }

    fn blend(&mut self, x: i32, y: i32, src: Rgba) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let sa = src.a.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        match self.composite {
            Composite::SourceOver => {
                let da = dst.a as f32 / 255.0;
                let out_a = sa + da * (1.0 - sa);
                if out_a <= 1e-6 {
                    self.px[i] = Pixel::default();
                    return;
                }
                let mix = |sc: u8, dc: u8| -> u8 {
                    let sc = sc as f32 / 255.0;
                    let dc = dc as f32 / 255.0;
                    let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
                    (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
                };
                self.px[i] = Pixel {
                    r: mix(src.rgb.r, dst.r),
                    g: mix(src.rgb.g, dst.g),
                    b: mix(src.rgb.b, dst.b),
                    a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
                };
            }
            Composite::SourceAtop => {
                if dst.a < OPAQUE_ALPHA {
                    return;
                }
                let mix = |sc: u8, dc: u8| -> u8 {
                    let out = sc as f32 * sa + dc as f32 * (1.0 - sa);
                    out.round().clamp(0.0, 255.0) as u8
                };
                self.px[i] = Pixel {
                    r: mix(src.rgb.r, dst.r),
                    g: mix(src.rgb.g, dst.g),
                    b: mix(src.rgb.b, dst.b),
                    a: dst.a,
                };
            }
        }
    }

    /// Visits every dot whose center lies in the logical box and paints what `shade` returns.
    pub(crate) fn fill_where(
        &mut self,
        min: (f32, f32),
        max: (f32, f32),
        mut shade: impl FnMut(f32, f32) -> Option<Rgba>,
    ) {
        if self.w == 0 || self.h == 0 {
            return;
        }
        let s = self.scale;
        let x0 = ((min.0 / s).floor() as i64).max(0);
        let y0 = ((min.1 / s).floor() as i64).max(0);
        let x1 = ((max.0 / s).ceil() as i64).min(self.w as i64 - 1);
        let y1 = ((max.1 / s).ceil() as i64).min(self.h as i64 - 1);
        if x1 < x0 || y1 < y0 {
            return;
        }
        for iy in y0..=y1 {
            for ix in x0..=x1 {
                let (cx, cy) = self.dot_center(ix as u32, iy as u32);
                if cx < min.0 || cx > max.0 || cy < min.1 || cy > max.1 {
                    continue;
                }
                if let Some(c) = shade(cx, cy) {
                    self.blend(ix as i32, iy as i32, c);
                }
            }
        }
    }

    /// Paints the single dot containing a logical point.
    pub(crate) fn dot(&mut self, x: f32, y: f32, c: Rgba) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let ix = (x / self.scale).floor() as i32;
        let iy = (y / self.scale).floor() as i32;
        self.blend(ix, iy, c);
    }

    /// Disc filled by `paint(x, y)`. Discs smaller than a dot still mark their center dot.
    pub(crate) fn fill_circle(
        &mut self,
        cx: f32,
        cy: f32,
        r: f32,
        paint: impl Fn(f32, f32) -> Rgba,
    ) {
        if r * 2.0 < self.scale {
            self.dot(cx, cy, paint(cx, cy));
            return;
        }
        let r2 = r * r;
        self.fill_where((cx - r, cy - r), (cx + r, cy + r), |x, y| {
            let (dx, dy) = (x - cx, y - cy);
            (dx * dx + dy * dy <= r2).then(|| paint(x, y))
        });
    }

    /// Soft halo outside a disc, fading from `strength` at the rim to zero at `r + blur`.
    pub(crate) fn glow(&mut self, cx: f32, cy: f32, r: f32, blur: f32, color: Rgb, strength: f32) {
        if blur <= 0.0 {
            return;
        }
        let outer = r + blur;
        self.fill_where((cx - outer, cy - outer), (cx + outer, cy + outer), |x, y| {
            let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            if d <= r || d > outer {
                return None;
            }
            let f = 1.0 - (d - r) / blur;
            Some(Rgba {
                rgb: color,
                a: strength * f * f,
            })
        });
    }

    pub(crate) fn fill_rect(&mut self, frame: Frame2, x: f32, y: f32, w: f32, h: f32, c: Rgba) {
        let reach = (x.abs() + w.abs()).max(y.abs() + h.abs()) * 1.5;
        let (ox, oy) = frame.origin;
        self.fill_where((ox - reach, oy - reach), (ox + reach, oy + reach), |px, py| {
            let (lx, ly) = frame.to_local(px, py);
            (lx >= x && lx <= x + w && ly >= y && ly <= y + h).then_some(c)
        });
    }

    pub(crate) fn fill_ellipse(&mut self, frame: Frame2, cx: f32, cy: f32, a: f32, b: f32, c: Rgba) {
        if a <= 0.0 || b <= 0.0 {
            return;
        }
        let reach = cx.abs().max(cy.abs()) + a.max(b);
        let (ox, oy) = frame.origin;
        self.fill_where((ox - reach, oy - reach), (ox + reach, oy + reach), |px, py| {
            let (lx, ly) = frame.to_local(px, py);
            let (ex, ey) = ((lx - cx) / a, (ly - cy) / b);
            (ex * ex + ey * ey <= 1.0).then_some(c)
        });
    }

    /// Ellipse outline centered on the frame origin. Strokes never get thinner than one dot.
    pub(crate) fn stroke_ellipse(&mut self, frame: Frame2, a: f32, b: f32, width: f32, c: Rgba) {
        if a <= 0.0 || b <= 0.0 {
            return;
        }
        let half = (width * 0.5).max(self.scale * 0.5);
        let reach = a.max(b) + half;
        let (ox, oy) = frame.origin;
        self.fill_where((ox - reach, oy - reach), (ox + reach, oy + reach), |px, py| {
            let (lx, ly) = frame.to_local(px, py);
            // first-order distance to the implicit curve g = (x/a)^2 + (y/b)^2 - 1
            let g = (lx / a).powi(2) + (ly / b).powi(2) - 1.0;
            let gx = 2.0 * lx / (a * a);
            let gy = 2.0 * ly / (b * b);
            let grad = (gx * gx + gy * gy).sqrt().max(1e-6);
            ((g / grad).abs() <= half).then_some(c)
        });
    }

    /// Straight segment; `paint(t)` gets 0 at the start and 1 at the end.
    pub(crate) fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        paint: impl Fn(f32) -> Rgba,
    ) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt();
        if len <= 1e-6 {
            self.dot(from.0, from.1, paint(0.0));
            return;
        }
        let half = (width * 0.5).max(self.scale * 0.5);
        let (minx, maxx) = (from.0.min(to.0) - half, from.0.max(to.0) + half);
        let (miny, maxy) = (from.1.min(to.1) - half, from.1.max(to.1) + half);
        let (ux, uy) = (dx / len, dy / len);
        self.fill_where((minx, miny), (maxx, maxy), |px, py| {
            let (rx, ry) = (px - from.0, py - from.1);
            let along = rx * ux + ry * uy;
            if along < 0.0 || along > len {
                return None;
            }
            let across = (rx * uy - ry * ux).abs();
            (across <= half).then(|| paint(along / len))
        });
    }
}
