use crate::vec2::Vec2;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

// Lightest to darkest; the ink level picks the glyph.
pub(crate) const PALETTE: [char; 7] = ['.', '*', '#', '&', '8', '%', '@'];
pub(crate) const BACKGROUND: char = ' ';
pub(crate) const MAX_INK: u8 = PALETTE.len() as u8;

/// Particle counts per terminal cell, saturating at the darkest glyph.
#[derive(Clone, Debug)]
pub(crate) struct InkGrid {
    pub(crate) w: usize,
    pub(crate) h: usize,
    ink: Vec<u8>,
}

impl InkGrid {
    pub(crate) fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            ink: vec![0; w * h],
        }
    }

    pub(crate) fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    pub(crate) fn level(&self, x: usize, y: usize) -> u8 {
        self.ink[self.idx(x, y)]
    }

    /// Cell under a domain position. x is doubled for the cell aspect.
    /// The far wall folds into the last column/row; anything else outside
    /// the grid is `None`.
    pub(crate) fn cell_of(&self, p: Vec2) -> Option<(usize, usize)> {
        let (wf, hf) = (self.w as f32, self.h as f32);
        let x = p.x * 2.0 + wf / 2.0;
        let y = p.y + hf / 2.0;
        if !(x >= 0.0 && x <= wf && y >= 0.0 && y <= hf) || self.w == 0 || self.h == 0 {
            return None;
        }
        let cx = (x as usize).min(self.w - 1);
        let cy = (y as usize).min(self.h - 1);
        Some((cx, cy))
    }

    pub(crate) fn plot(&mut self, positions: &[Vec2]) {
        self.ink.fill(0);
        for &p in positions {
            if let Some((x, y)) = self.cell_of(p) {
                let i = self.idx(x, y);
                self.ink[i] = (self.ink[i] + 1).min(MAX_INK);
            }
        }
    }

    pub(crate) fn glyph(level: u8) -> char {
        match level {
            0 => BACKGROUND,
            l => PALETTE[(l.min(MAX_INK) - 1) as usize],
        }
    }

    pub(crate) fn write_row(&self, y: usize, buf: &mut String) {
        buf.clear();
        buf.reserve(self.w);
        for x in 0..self.w {
            buf.push(Self::glyph(self.level(x, y)));
        }
    }

    pub(crate) fn to_text(&self) -> String {
        let mut out = String::with_capacity((self.w + 1) * self.h);
        let mut line = String::new();
        for y in 0..self.h {
            self.write_row(y, &mut line);
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Alternate-screen presenter; redraws only the rows that changed.
pub(crate) struct Screen {
    out: io::Stdout,
    prev: Vec<String>,
    line_buf: String,
    needs_full_redraw: bool,
}

impl Screen {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;
        Ok(Self {
            out,
            prev: Vec::new(),
            line_buf: String::new(),
            needs_full_redraw: true,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn invalidate(&mut self) {
        self.needs_full_redraw = true;
        self.prev.clear();
    }

    pub(crate) fn present(&mut self, grid: &InkGrid, status: &str) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            SetForegroundColor(Color::Cyan)
        )?;
        if self.needs_full_redraw {
            queue!(self.out, Clear(ClearType::All))?;
        }
        if self.prev.len() != grid.h {
            self.prev = vec![String::new(); grid.h];
            self.needs_full_redraw = true;
        }

        for y in 0..grid.h {
            grid.write_row(y, &mut self.line_buf);
            if self.needs_full_redraw || self.line_buf != self.prev[y] {
                queue!(self.out, cursor::MoveTo(0, y as u16), Print(&self.line_buf))?;
                std::mem::swap(&mut self.prev[y], &mut self.line_buf);
            }
        }

        queue!(
            self.out,
            ResetColor,
            cursor::MoveTo(0, grid.h as u16),
            Clear(ClearType::CurrentLine),
            Print(status),
            EndSynchronizedUpdate
        )?;
        self.out.flush()?;
        self.needs_full_redraw = false;
        Ok(())
    }
}
