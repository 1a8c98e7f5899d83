use serde::{Deserialize, Serialize};

use crate::{ChartStyle, Timeframe};

/// Chart settings chosen by the user.
///
/// Defaults to a daily area chart. A timeframe change means new candles must be
/// requested; a style change only affects rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSelection {
    pub timeframe: Timeframe,
    pub style: ChartStyle,
}

impl ChartSelection {
    pub const fn new(timeframe: Timeframe, style: ChartStyle) -> Self {
        Self { timeframe, style }
    }

    /// Returns whether the timeframe changed.
    pub fn select_timeframe(&mut self, timeframe: Timeframe) -> bool {
        let changed = self.timeframe != timeframe;
        self.timeframe = timeframe;
        changed
    }

    /// Returns whether the style changed.
    pub fn select_style(&mut self, style: ChartStyle) -> bool {
        let changed = self.style != style;
        self.style = style;
        changed
    }
}
