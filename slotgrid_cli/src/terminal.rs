use std::collections::BTreeSet;
use std::io::Write;

use slotgrid_core::{Cell, Grid, HistoryEntry, Payline, Presenter, ReelFrame, Theme, Tone};

const RESET: &str = "\x1b[0m";
const UP_3: &str = "\x1b[3A";

/// Draws the reels, messages and history as plain terminal text.
pub struct TerminalPresenter<W: Write> {
    out: W,
    animate: bool,
    theme: Theme,
    window_drawn: bool,
    grid: Option<Grid>,
    coins: i64,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, animate: bool) -> Self {
        Self {
            out,
            animate,
            theme: Theme::default(),
            window_drawn: false,
            grid: None,
            coins: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn color(&self, tone: Tone) -> &'static str {
        match (self.theme, tone) {
            (Theme::Dark, Tone::Win) => "\x1b[92m",
            (Theme::Dark, Tone::Loss) => "\x1b[91m",
            (Theme::Dark, Tone::Warning) => "\x1b[93m",
            (Theme::Light, Tone::Win) => "\x1b[32m",
            (Theme::Light, Tone::Loss) => "\x1b[31m",
            (Theme::Light, Tone::Warning) => "\x1b[33m",
        }
    }

    fn draw_window(&mut self, cell: impl Fn(Cell) -> String) {
        if self.window_drawn {
            let _ = write!(self.out, "{UP_3}");
        }
        for row in 0..3 {
            let line: Vec<String> = (0..3).map(|col| cell((row, col))).collect();
            let _ = writeln!(self.out, "\r  {}  ", line.join(" "));
        }
        let _ = self.out.flush();
        self.window_drawn = true;
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn render_frame(&mut self, frame: &ReelFrame) {
        if self.animate {
            self.draw_window(|cell| {
                frame
                    .get(cell)
                    .map(|s| format!(" {s} "))
                    .unwrap_or_else(|| " .. ".to_string())
            });
        }
    }

    fn render_grid(&mut self, grid: &Grid) {
        self.grid = Some(*grid);
        let grid = *grid;
        self.draw_window(|cell| format!(" {} ", grid.get(cell)));
    }

    fn highlight_lines(&mut self, lines: &[&Payline]) {
        let Some(grid) = self.grid else { return };
        let marked: BTreeSet<Cell> = lines.iter().flat_map(|l| l.cells).collect();
        self.draw_window(|cell| {
            if marked.contains(&cell) {
                format!("[{}]", grid.get(cell))
            } else {
                format!(" {} ", grid.get(cell))
            }
        });
        for line in lines {
            let _ = writeln!(self.out, "  line: {}", line.name);
        }
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        if entries.is_empty() {
            let _ = writeln!(self.out, "No spins yet.");
        }
        for entry in entries {
            let _ = writeln!(self.out, "  {entry}");
        }
    }

    fn render_ranking(&mut self, wins: u64) {
        let _ = writeln!(self.out, "Coins: {} | Wins: {}", self.coins, wins);
    }

    fn play_win_sound(&mut self) {
        let _ = write!(self.out, "\x07");
    }

    fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    fn set_balance(&mut self, coins: i64) {
        self.coins = coins;
    }

    fn set_result_message(&mut self, text: &str, tone: Tone) {
        if text.is_empty() {
            return;
        }
        let color = self.color(tone);
        let _ = writeln!(self.out, "{color}{text}{RESET}");
    }

    fn set_spin_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.window_drawn = false;
            self.grid = None;
        }
    }
}
