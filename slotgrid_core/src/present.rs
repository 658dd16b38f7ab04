//! Presentation gateway: everything the round engine shows or plays.
//!
//! Front ends implement the hooks they support; the rest default to no-ops.

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, ReelFrame};
use crate::paytable::Payline;
use crate::state::HistoryEntry;

/// How a result message should be colored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Win,
    Loss,
    Warning,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

pub trait Presenter {
    /// An intermediate window while the reels turn.
    fn render_frame(&mut self, _frame: &ReelFrame) {}
    /// The window the round is evaluated on.
    fn render_grid(&mut self, _grid: &Grid) {}
    fn highlight_lines(&mut self, _lines: &[&Payline]) {}
    /// Most recent first, already capped for display.
    fn render_history(&mut self, _entries: &[HistoryEntry]) {}
    fn render_ranking(&mut self, _wins: u64) {}
    fn play_spin_sound(&mut self) {}
    fn stop_spin_sound(&mut self) {}
    fn play_win_sound(&mut self) {}
    fn toggle_theme(&mut self) -> Theme {
        Theme::default()
    }
    fn set_balance(&mut self, _coins: i64) {}
    fn set_result_message(&mut self, _text: &str, _tone: Tone) {}
    fn set_spin_enabled(&mut self, _enabled: bool) {}
}

/// Shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
