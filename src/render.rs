use crate::canvas::{PixelCanvas, Rgb};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    pub(crate) canvas: PixelCanvas,
    scale: f32,
    force_full: bool,
}

impl Terminal {
    pub(crate) fn begin(scale: f32) -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;

        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            // Braille: 2×4 dots per cell
            canvas: PixelCanvas::new(cols as u32 * 2, rows as u32 * 4, scale),
            scale,
            force_full: true,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        self.canvas = PixelCanvas::new(c as u32 * 2, r as u32 * 4, self.scale);
        self.force_full = true;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let diff_only = !std::mem::take(&mut self.force_full);

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Braille encoding: 2×4 dots -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Alpha below this is left as background.
const INK_ALPHA: u32 = 24;

pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, mono: bool) {
    let cols = out.w as u32;
    let rows = out.h as u32;

    for cy in 0..rows {
        for cx in 0..cols {
            let px0 = cx * 2;
            let py0 = cy * 4;

            let mut mask: u8 = 0;
            let mut sum_r: u32 = 0;
            let mut sum_g: u32 = 0;
            let mut sum_b: u32 = 0;
            let mut sum_a: u32 = 0;
            let mut ink_count: u32 = 0;

            for dy in 0..4 {
                for dx in 0..2 {
                    let x = px0 + dx;
                    let y = py0 + dy;
                    if x >= canvas.w || y >= canvas.h {
                        continue;
                    }
                    let p = canvas.px[canvas.idx(x, y)];
                    let a = p.a as u32;
                    if a >= INK_ALPHA {
                        mask |= braille_bit(dx, dy);
                        sum_r += p.r as u32;
                        sum_g += p.g as u32;
                        sum_b += p.b as u32;
                        sum_a += a;
                        ink_count += 1;
                    }
                }
            }

            // sample the backdrop at the middle of the cell
            let (bx, by) = canvas.dot_center(px0 + 1, py0 + 2);
            let bg_rgb = if mono {
                Rgb::BLACK
            } else {
                canvas.background_at(bx, by).unwrap_or(Rgb::BLACK)
            };

            let ch = char::from_u32(0x2800 + (mask as u32)).unwrap_or(' ');
            let fg = if ink_count == 0 {
                Color::White
            } else {
                let alpha = sum_a as f32 / (ink_count as f32 * 255.0);
                let ink = if mono {
                    let l = (sum_r + sum_g + sum_b) / (3 * ink_count);
                    Rgb::new(l as u8, l as u8, l as u8)
                } else {
                    Rgb::new(
                        (sum_r / ink_count) as u8,
                        (sum_g / ink_count) as u8,
                        (sum_b / ink_count) as u8,
                    )
                };
                bg_rgb.lerp(ink, alpha).to_color()
            };

            out.set(
                cx as u16,
                cy as u16,
                Cell {
                    ch: if mask == 0 { ' ' } else { ch },
                    fg,
                    bg: bg_rgb.to_color(),
                },
            );
        }
    }
}

/* -----------------------------
   Text helpers
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg,
            },
        );
    }
}

/// Text over whatever background the cell already has.
pub(crate) fn draw_text_over(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        let Some(under) = buf.get(xx, y) else {
            break;
        };
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg: under.bg,
            },
        );
    }
}

pub(crate) fn pad_to(s: &str, w: usize) -> String {
    let n = s.chars().count();
    if n >= w {
        s.chars().take(w).collect()
    } else {
        let mut out = String::with_capacity(w);
        out.push_str(s);
        out.extend(std::iter::repeat(' ').take(w - n));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::rgba;

    #[test]
    fn ink_becomes_braille_dots() {
        let mut canvas = PixelCanvas::new(4, 4, 1.0);
        canvas.dot(0.5, 0.5, rgba(255, 255, 255, 1.0));
        canvas.dot(1.5, 3.5, rgba(255, 255, 255, 1.0));
        let mut cells = CellBuffer::new(2, 1);
        canvas_to_cells(&canvas, &mut cells, false);

        assert_eq!(cells.cells[0].ch, char::from_u32(0x2800 + 0x01 + 0x80).unwrap());
        assert_eq!(cells.cells[1].ch, ' ');
    }

    #[test]
    fn faint_ink_is_dimmed_towards_the_backdrop() {
        let mut canvas = PixelCanvas::new(2, 4, 1.0);
        canvas.dot(0.5, 0.5, rgba(255, 255, 255, 0.5));
        let mut cells = CellBuffer::new(1, 1);
        canvas_to_cells(&canvas, &mut cells, false);
        match cells.cells[0].fg {
            Color::Rgb { r, .. } => assert!(r > 100 && r < 160),
            other => panic!("unexpected color {other:?}"),
        }
    }

    #[test]
    fn text_is_clipped_to_the_buffer() {
        let mut buf = CellBuffer::new(4, 1);
        draw_text(&mut buf, 2, 0, "hello", Color::White, Color::Black);
        assert_eq!(buf.cells[2].ch, 'h');
        assert_eq!(buf.cells[3].ch, 'e');
        assert_eq!(pad_to("ab", 4), "ab  ");
        assert_eq!(pad_to("abcdef", 3), "abc");
    }
}
