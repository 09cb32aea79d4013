use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rainfield::{archive::MONTHS, color::ShadedGrid, MonthStats, Rgb};
use std::io::{self, Write};

/// Rows kept below the field for the slider and status line.
pub(crate) const HUD_ROWS: u16 = 2;

const BG: Color = Color::Black;
const FG: Color = Color::Rgb {
    r: 200,
    g: 210,
    b: 230,
};
const DIM: Color = Color::Rgb {
    r: 120,
    g: 140,
    b: 170,
};

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
            bg: BG,
        }
    }
}

pub(crate) fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
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
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        // nothing is switched on until the size is known
        let (cols, rows) = terminal::size()?;

        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        ) {
            let _ = execute!(out, cursor::Show, EnableLineWrap, LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
            return Err(e.into());
        }

        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
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
        queue!(self.out, Clear(ClearType::All))?;
        log::debug!("terminal resized to {c}x{r}");
        Ok(true)
    }

    /// Writes changed cells only; the previous frame is kept for diffing.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
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
   Drawing
------------------------------ */

pub(crate) fn draw_field(buf: &mut CellBuffer, grid: &ShadedGrid, x0: u16, y0: u16) {
    for y in 0..grid.rows {
        let yy = y0 as usize + y;
        if yy >= buf.h as usize {
            break;
        }
        for (x, cell) in grid.row(y).iter().enumerate() {
            let xx = x0 as usize + x;
            if xx >= buf.w as usize {
                break;
            }
            buf.set(
                xx as u16,
                yy as u16,
                Cell {
                    ch: cell.glyph,
                    fg: to_color(cell.rgb),
                    bg: BG,
                },
            );
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg: BG });
    }
}

fn slider(value01: f64, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let knob = ((v * width.saturating_sub(1) as f64) + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(match i.cmp(&knob) {
            std::cmp::Ordering::Less => '=',
            std::cmp::Ordering::Equal => '|',
            std::cmp::Ordering::Greater => '-',
        });
    }
    s.push(']');
    s
}

pub(crate) struct Hud<'a> {
    pub(crate) year: i32,
    pub(crate) first_year: i32,
    pub(crate) last_year: i32,
    pub(crate) year_fraction: f64,
    pub(crate) has_record: bool,
    pub(crate) running: bool,
    pub(crate) month: &'a str,
    pub(crate) month_value: f64,
    pub(crate) month_level: f64,
    pub(crate) tuning: String,
}

pub(crate) fn hud(buf: &mut CellBuffer, h: &Hud) {
    if buf.h < HUD_ROWS {
        return;
    }
    let slider_y = buf.h - 2;
    let status_y = buf.h - 1;

    let label_l = format!("{} ", h.first_year);
    let label_r = format!(" {}  Year {}{}", h.last_year, h.year, if h.has_record { "" } else { " (default data)" });
    let width = (buf.w as usize).saturating_sub(label_l.len() + label_r.len() + 4).min(72);
    let line = format!("{label_l}{}{label_r}", slider(h.year_fraction, width));
    draw_text(buf, 1, slider_y, &line, FG);

    let state = if h.running { "> running" } else { "|| stopped" };
    let status = format!(
        "{state} | {} {:>6.1} mm  lvl {:.2} | {} | h help",
        h.month, h.month_value, h.month_level, h.tuning
    );
    draw_text(buf, 1, status_y, &status, DIM);
}

fn draw_frame(buf: &mut CellBuffer, x0: u16, y0: u16, bw: u16, bh: u16) {
    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let edge_x = x == x0 || x == x0 + bw - 1;
            let edge_y = y == y0 || y == y0 + bh - 1;
            let ch = match (edge_x, edge_y) {
                (true, true) => match (x == x0, y == y0) {
                    (true, true) => '┌',
                    (false, true) => '┐',
                    (true, false) => '└',
                    (false, false) => '┘',
                },
                (true, false) => '│',
                (false, true) => '─',
                (false, false) => ' ',
            };
            buf.set(x, y, Cell { ch, fg: Color::White, bg: BG });
        }
    }
}

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let w = buf.w;
    let h = buf.h;
    let bw = 60.min(w.saturating_sub(4));
    let bh = 18.min(h.saturating_sub(4));
    if bw < 4 || bh < 4 {
        return;
    }
    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;
    draw_frame(buf, x0, y0, bw, bh);

    draw_text(buf, x0 + 2, y0 + 1, title, Color::White);
    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, FG);
        yy += 1;
    }
}

/* -----------------------------
   Year chart
------------------------------ */

pub(crate) const CHART_HIGH: Color = Color::Rgb {
    r: 0xea,
    g: 0x80,
    b: 0x1c,
};
pub(crate) const CHART_LOW: Color = Color::Rgb {
    r: 0x1a,
    g: 0x80,
    b: 0xbb,
};
pub(crate) const CHART_OTHER: Color = Color::Rgb {
    r: 0xb8,
    g: 0xb8,
    b: 0xb8,
};

/// The driest month wins when it is also the wettest (a flat year).
pub(crate) fn bar_color(month: usize, stats: &MonthStats) -> Color {
    if month == stats.lowest {
        CHART_LOW
    } else if month == stats.highest {
        CHART_HIGH
    } else {
        CHART_OTHER
    }
}

/// Bar heights in cells, scaled so the wettest month fills `height`.
/// Any rain at all gets at least one cell.
pub(crate) fn bar_heights(values: &[f64], height: u16) -> Vec<u16> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    values
        .iter()
        .map(|&v| {
            if max <= 0.0 || v <= 0.0 {
                return 0;
            }
            let h = (v / max * height as f64).round() as u16;
            h.clamp(1, height)
        })
        .collect()
}

pub(crate) fn draw_chart(buf: &mut CellBuffer, year: i32, values: &[f64], has_record: bool) {
    let w = buf.w;
    let h = buf.h.saturating_sub(HUD_ROWS);
    let bw = 64.min(w.saturating_sub(2));
    let bh = 22.min(h.saturating_sub(2));
    if bw < 28 || bh < 10 {
        return;
    }
    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;
    draw_frame(buf, x0, y0, bw, bh);

    let title = format!(
        "Monthly Rainfall ({year}){}",
        if has_record { "" } else { " default data" }
    );
    draw_text(buf, x0 + 2, y0 + 1, &title, Color::White);

    let Some(stats) = MonthStats::of(values) else {
        draw_text(buf, x0 + 2, y0 + 3, "no monthly values", DIM);
        return;
    };
    draw_text(buf, x0 + 2, y0 + 2, "■", CHART_HIGH);
    draw_text(buf, x0 + 4, y0 + 2, "Highest Month", FG);
    draw_text(buf, x0 + 19, y0 + 2, "■", CHART_LOW);
    draw_text(buf, x0 + 21, y0 + 2, "Lowest Month", FG);

    let slot = ((bw - 4) / MONTHS.len() as u16).max(2);
    let bar_w = slot - 1;
    // title, legend, gap above; month labels, stats, border below
    let base_y = y0 + bh - 4;
    let plot_h = bh - 8;
    let heights = bar_heights(values, plot_h);

    for (i, &bar) in heights.iter().take(MONTHS.len()).enumerate() {
        let bx = x0 + 2 + i as u16 * slot;
        let fg = bar_color(i, &stats);
        for k in 0..bar {
            for dx in 0..bar_w {
                buf.set(bx + dx, base_y - k, Cell { ch: '█', fg, bg: BG });
            }
        }
        draw_text(buf, bx, base_y + 1, &MONTHS[i][..bar_w.min(3) as usize], DIM);
    }

    let line = format!(
        "max {:.1}  min {:.1}  avg {:.1}  range {:.1} mm",
        stats.max,
        stats.min,
        stats.mean,
        stats.range()
    );
    draw_text(buf, x0 + 2, base_y + 2, &line, FG);
}
