use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Candle interval. Labels are always rendered upper-case ("4H", "1D") and
/// parsed case-insensitively, so "4h" and "4H" name the same interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeFrame {
    Hours1,
    Hours2,
    Hours4,
    Hours6,
    Hours8,
    Hours12,
    Days1,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 7] = [
        TimeFrame::Hours1,
        TimeFrame::Hours2,
        TimeFrame::Hours4,
        TimeFrame::Hours6,
        TimeFrame::Hours8,
        TimeFrame::Hours12,
        TimeFrame::Days1,
    ];

    /// Canonical label used in metadata and anchor column names
    pub fn label(&self) -> &'static str {
        match self {
            TimeFrame::Hours1 => "1H",
            TimeFrame::Hours2 => "2H",
            TimeFrame::Hours4 => "4H",
            TimeFrame::Hours6 => "6H",
            TimeFrame::Hours8 => "8H",
            TimeFrame::Hours12 => "12H",
            TimeFrame::Days1 => "1D",
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            TimeFrame::Hours1 => 1,
            TimeFrame::Hours2 => 2,
            TimeFrame::Hours4 => 4,
            TimeFrame::Hours6 => 6,
            TimeFrame::Hours8 => 8,
            TimeFrame::Hours12 => 12,
            TimeFrame::Days1 => 24,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(self.hours())
    }

    /// Number of candles in one calendar day (6 for 4H candles)
    pub fn intervals_per_day(&self) -> usize {
        (24 / self.hours()) as usize
    }

    /// Length in candles of a trailing window spanning `days` calendar days.
    /// None when the count does not fit in `usize`.
    pub fn window_len(&self, days: usize) -> Option<usize> {
        days.checked_mul(self.intervals_per_day())
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeFrame {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        TimeFrame::ALL
            .into_iter()
            .find(|tf| tf.label() == normalized)
            .ok_or_else(|| anyhow!("Unsupported timeframe: {:?}", s))
    }
}

impl TryFrom<String> for TimeFrame {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeFrame> for String {
    fn from(tf: TimeFrame) -> Self {
        tf.label().to_string()
    }
}

/// Name of the close-price column for an anchor, e.g. `close_ETH_4H`
pub fn close_column_name(symbol: &str, timeframe: TimeFrame) -> String {
    format!("close_{}_{}", symbol, timeframe.label())
}

/// Close prices of the target asset, one row per candle
#[derive(Debug, Clone, PartialEq)]
pub struct TargetCandles {
    timestamps: Vec<DateTime<Utc>>,
    closes: Vec<Option<f64>>,
}

impl TargetCandles {
    pub fn new(timestamps: Vec<DateTime<Utc>>, closes: Vec<Option<f64>>) -> Result<Self> {
        if timestamps.len() != closes.len() {
            bail!(
                "Timestamp count {} does not match close count {}",
                timestamps.len(),
                closes.len()
            );
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            bail!(
                "Timestamps must be strictly increasing: {} followed by {}",
                timestamps[pos],
                timestamps[pos + 1]
            );
        }
        Ok(Self { timestamps, closes })
    }

    /// Build a gap-free series with evenly spaced timestamps
    pub fn from_closes(start: DateTime<Utc>, timeframe: TimeFrame, closes: &[f64]) -> Self {
        let timestamps = (0..closes.len())
            .map(|i| start + timeframe.duration() * i as i32)
            .collect();
        Self {
            timestamps,
            closes: closes.iter().copied().map(Some).collect(),
        }
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn closes(&self) -> &[Option<f64>] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Anchor close prices keyed by column name (`close_<SYMBOL>_<TIMEFRAME>`).
/// Rows are expected to line up with the target candles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorCandles {
    columns: HashMap<String, Vec<Option<f64>>>,
}

impl AnchorCandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_column(&mut self, name: impl Into<String>, closes: Vec<Option<f64>>) {
        self.columns.insert(name.into(), closes);
    }

    /// Add a gap-free close column under the canonical name for `symbol`/`timeframe`
    pub fn with_closes(mut self, symbol: &str, timeframe: TimeFrame, closes: &[f64]) -> Self {
        self.insert_column(
            close_column_name(symbol, timeframe),
            closes.iter().copied().map(Some).collect(),
        );
        self
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>]> {
        if let Some(closes) = self.columns.get(name) {
            return Ok(closes.as_slice());
        }
        match self
            .columns
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
        {
            Some(near) => bail!(
                "Missing required column in anchor data: {} (found {} with non-canonical casing)",
                name,
                near
            ),
            None => bail!("Missing required column in anchor data: {}", name),
        }
    }

    pub fn close(&self, symbol: &str, timeframe: TimeFrame) -> Result<&[Option<f64>]> {
        self.column(&close_column_name(symbol, timeframe))
    }
}
