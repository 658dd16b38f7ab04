use std::collections::BTreeSet;

use slotgrid_core::{Cell, Grid, HistoryEntry, Payline, Presenter, ReelFrame, Theme, Tone};
use web_sys::HtmlAudioElement;

/// What the page shows. The round engine writes it through `Presenter`,
/// the component reads it on every render.
pub struct WebView {
    pub cells: [[String; 3]; 3],
    pub highlighted: BTreeSet<Cell>,
    pub history: Vec<String>,
    pub wins: u64,
    pub coins: i64,
    pub message: String,
    pub tone: Tone,
    pub spin_enabled: bool,
    pub theme: Theme,
    spin_sound: Option<HtmlAudioElement>,
    win_sound: Option<HtmlAudioElement>,
}

impl WebView {
    pub fn new() -> Self {
        Self {
            cells: Default::default(),
            highlighted: BTreeSet::new(),
            history: Vec::new(),
            wins: 0,
            coins: 0,
            message: String::new(),
            tone: Tone::Loss,
            spin_enabled: true,
            theme: Theme::Dark,
            spin_sound: HtmlAudioElement::new_with_src("spin.mp3").ok(),
            win_sound: HtmlAudioElement::new_with_src("win.mp3").ok(),
        }
    }

    pub fn message_color(&self) -> &'static str {
        match self.tone {
            Tone::Win => "#00cc00",
            Tone::Loss | Tone::Warning => "#ff4444",
        }
    }

    pub fn page_style(&self) -> &'static str {
        match self.theme {
            Theme::Dark => "background:#1a1a2e;color:#eee;",
            Theme::Light => "background:#f0f0f0;color:#222;",
        }
    }
}

fn restart(audio: &Option<HtmlAudioElement>) {
    if let Some(audio) = audio {
        audio.set_current_time(0.0);
        let _ = audio.play();
    }
}

impl Presenter for WebView {
    fn render_frame(&mut self, frame: &ReelFrame) {
        for (row, cells) in self.cells.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = frame.get((row, col)).map(|s| s.to_string()).unwrap_or_default();
            }
        }
    }

    fn render_grid(&mut self, grid: &Grid) {
        self.render_frame(&ReelFrame::from(*grid));
    }

    fn highlight_lines(&mut self, lines: &[&Payline]) {
        self.highlighted.extend(lines.iter().flat_map(|l| l.cells));
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.history = entries.iter().map(ToString::to_string).collect();
    }

    fn render_ranking(&mut self, wins: u64) {
        self.wins = wins;
    }

    fn play_spin_sound(&mut self) {
        restart(&self.spin_sound);
    }

    fn stop_spin_sound(&mut self) {
        if let Some(audio) = &self.spin_sound {
            let _ = audio.pause();
        }
    }

    fn play_win_sound(&mut self) {
        restart(&self.win_sound);
    }

    fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    fn set_balance(&mut self, coins: i64) {
        self.coins = coins;
    }

    fn set_result_message(&mut self, text: &str, tone: Tone) {
        self.message = text.to_string();
        self.tone = tone;
    }

    fn set_spin_enabled(&mut self, enabled: bool) {
        self.spin_enabled = enabled;
        if !enabled {
            self.highlighted.clear();
        }
    }
}
