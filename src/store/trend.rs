//! Mood trend computation
//!
//! Moving-window comparison: the mean intensity of the last
//! [`MOOD_TREND_WINDOW`] entries against the mean of the window before
//! it. With no older window the older mean defaults to the recent mean,
//! forcing a stable verdict.

use crate::types::{MoodEntry, MoodTrend, TrendDirection, MOOD_TREND_WINDOW};

/// Margin the recent average must clear to count as a move
const TREND_MARGIN: f64 = 0.5;

/// Default returned when fewer than 2 entries exist
const DEFAULT_AVERAGE: f64 = 5.0;

/// Compute the mood trend over a history of entries
pub fn mood_trend(entries: &[MoodEntry]) -> MoodTrend {
    if entries.len() < 2 {
        return MoodTrend {
            average: DEFAULT_AVERAGE,
            trend: TrendDirection::Stable,
        };
    }

    let recent_start = entries.len().saturating_sub(MOOD_TREND_WINDOW);
    let average = mean(&entries[recent_start..]);

    let older_average = if entries.len() > MOOD_TREND_WINDOW {
        let older_start = entries.len().saturating_sub(2 * MOOD_TREND_WINDOW);
        mean(&entries[older_start..recent_start])
    } else {
        average
    };

    let trend = if average > older_average + TREND_MARGIN {
        TrendDirection::Up
    } else if average < older_average - TREND_MARGIN {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    MoodTrend { average, trend }
}

fn mean(entries: &[MoodEntry]) -> f64 {
    if entries.is_empty() {
        return DEFAULT_AVERAGE;
    }
    entries.iter().map(|e| e.intensity as f64).sum::<f64>() / entries.len() as f64
}
