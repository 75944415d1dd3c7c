//! Bar loading for the runner.
//!
//! Reads a bars CSV (`timestamp,open,high,low,close`, RFC 3339 timestamps with
//! offset; extra columns are ignored), canonicalizes it and applies the
//! optional lookback window:
//! 1. Re-express every timestamp in the exchange offset, when one is given
//! 2. Stable sort by timestamp
//! 3. Drop later rows that repeat an instant already seen (logged)
//! 4. Keep bars at or after `as_of - 30 * months` days
//!
//! The session window and calendar day are read off each bar's own offset,
//! so a UTC feed must be normalized in step 1 to trade the exchange session.
//!
//! Prices are not filtered here. A NaN or non-positive value reaches the
//! engine, which fails the whole run on it.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset};
use intralab_core::domain::Bar;
use intralab_core::fingerprint::{dataset_hash, DatasetHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Days per lookback month.
pub const DAYS_PER_MONTH: i64 = 30;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: invalid timestamp '{value}': {source}")]
    Timestamp {
        row: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Lookback in 30-day months. `None` keeps everything.
    pub months: Option<u32>,
    /// Lookback anchor. Defaults to the last bar.
    pub as_of: Option<DateTime<FixedOffset>>,
    /// Exchange offset to convert timestamps into. `None` keeps the file's offsets.
    pub utc_offset: Option<FixedOffset>,
}

/// Result of loading bars, with provenance and hygiene counters.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: PathBuf,
    pub dataset_hash: DatasetHash,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub outside_lookback: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BarRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Load and canonicalize a bars CSV.
pub fn load_bars_csv(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut raw = read_rows(reader)?;
    let rows_read = raw.len();
    if let Some(offset) = opts.utc_offset {
        raw = normalize_offset(raw, offset);
    }

    let (bars, duplicates_dropped) = canonicalize(raw);
    let mut warnings = Vec::new();
    if duplicates_dropped > 0 {
        let msg = format!("dropped {duplicates_dropped} bars with duplicate timestamps");
        warn!(path = %path.display(), duplicates_dropped, "duplicate bar timestamps");
        warnings.push(msg);
    }

    let before = bars.len();
    let bars = match opts.months {
        Some(months) => apply_lookback(bars, months, opts.as_of),
        None => bars,
    };
    let outside_lookback = before - bars.len();
    if outside_lookback > 0 {
        debug!(outside_lookback, "bars outside lookback window");
    }

    info!(
        path = %path.display(),
        rows = rows_read,
        bars = bars.len(),
        "loaded bars"
    );
    Ok(LoadedData {
        dataset_hash: dataset_hash(&bars),
        bars,
        source: path.to_path_buf(),
        rows_read,
        duplicates_dropped,
        outside_lookback,
        warnings,
    })
}

/// Parse bars from any CSV source, in file order.
pub fn read_bars<R: io::Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    read_rows(csv::Reader::from_reader(reader))
}

fn read_rows<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Bar>, LoadError> {
    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<BarRow>().enumerate() {
        let row = row?;
        let timestamp = DateTime::parse_from_rfc3339(row.timestamp.trim()).map_err(|source| {
            LoadError::Timestamp {
                row: i + 1,
                value: row.timestamp.clone(),
                source,
            }
        })?;
        bars.push(Bar::new(timestamp, row.open, row.high, row.low, row.close));
    }
    Ok(bars)
}

/// Re-express every timestamp in `offset`. Instants are unchanged.
pub fn normalize_offset(bars: Vec<Bar>, offset: FixedOffset) -> Vec<Bar> {
    bars.into_iter()
        .map(|bar| Bar {
            timestamp: bar.timestamp.with_timezone(&offset),
            ..bar
        })
        .collect()
}

/// Stable-sort by instant and keep the first bar of every instant.
///
/// Returns the canonical bars and how many duplicates were dropped.
pub fn canonicalize(mut bars: Vec<Bar>) -> (Vec<Bar>, usize) {
    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
    let dropped = before - bars.len();
    (bars, dropped)
}

/// Keep bars at or after `as_of - 30 * months` days.
///
/// `as_of` defaults to the last bar's timestamp. Expects canonical input.
pub fn apply_lookback(
    bars: Vec<Bar>,
    months: u32,
    as_of: Option<DateTime<FixedOffset>>,
) -> Vec<Bar> {
    let Some(anchor) = as_of.or_else(|| bars.last().map(|b| b.timestamp)) else {
        return bars;
    };
    let cutoff = anchor - Duration::days(DAYS_PER_MONTH * i64::from(months));
    bars.into_iter().filter(|b| b.timestamp >= cutoff).collect()
}

/// Write bars in the same CSV layout `read_bars` accepts.
pub fn write_bars<W: io::Write>(bars: &[Bar], writer: W) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(BarRow {
            timestamp: bar.timestamp.to_rfc3339(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-03-04T09:20:00+05:30,100,106,99,105,1200
2024-03-04T09:15:00+05:30,84,101,83,100,1500
2024-03-04T09:20:00+05:30,1,1,1,1,0
2024-03-04T09:25:00+05:30,105,107,84,85,900
";

    fn ist(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, h, m, 0)
            .unwrap()
    }

    #[test]
    fn reads_rows_in_file_order() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].timestamp, ist(9, 20));
        assert_eq!(bars[1].close, 100.0);
    }

    #[test]
    fn canonicalize_sorts_and_keeps_first_duplicate() {
        let (bars, dropped) = canonicalize(read_bars(SAMPLE.as_bytes()).unwrap());
        assert_eq!(dropped, 1);
        let times: Vec<_> = bars.iter().map(|b| b.timestamp).collect();
        assert_eq!(times, [ist(9, 15), ist(9, 20), ist(9, 25)]);
        assert_eq!(bars[1].close, 105.0);
    }

    #[test]
    fn same_instant_in_other_offset_is_duplicate() {
        let csv = "\
timestamp,open,high,low,close
2024-03-04T09:15:00+05:30,1,2,1,2
2024-03-04T03:45:00Z,5,6,5,6
";
        let (bars, dropped) = canonicalize(read_bars(csv.as_bytes()).unwrap());
        assert_eq!(dropped, 1);
        assert_eq!(bars[0].close, 2.0);
    }

    #[test]
    fn utc_rows_move_to_exchange_offset() {
        let csv = "\
timestamp,open,high,low,close
2024-03-04T03:45:00Z,84,101,83,100
2024-03-04T03:50:00+00:00,100,107,99,106
";
        let tz = FixedOffset::east_opt(19800).unwrap();
        let bars = normalize_offset(read_bars(csv.as_bytes()).unwrap(), tz);
        assert_eq!(bars[0].timestamp, ist(9, 15));
        assert_eq!(bars[0].timestamp.offset(), &tz);
        assert_eq!(bars[1].time_of_day().to_string(), "09:20:00");
        assert_eq!(bars[1].close, 106.0);
    }

    #[test]
    fn load_converts_before_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "timestamp,open,high,low,close\n2024-03-04T03:45:00Z,1,2,1,2\n2024-03-04T09:15:00+05:30,5,6,5,6\n",
        )
        .unwrap();
        let opts = LoadOptions {
            utc_offset: FixedOffset::east_opt(19800),
            ..Default::default()
        };
        let loaded = load_bars_csv(&path, &opts).unwrap();
        assert_eq!(loaded.duplicates_dropped, 1);
        assert_eq!(loaded.bars[0].timestamp.to_rfc3339(), "2024-03-04T09:15:00+05:30");
        assert_eq!(loaded.bars[0].close, 2.0);
    }

    #[test]
    fn nan_prices_are_kept() {
        let csv = "timestamp,open,high,low,close\n2024-03-04T09:15:00+05:30,NaN,2,1,2\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert!(bars[0].open.is_nan());
    }

    #[test]
    fn bad_timestamp_names_row() {
        let csv = "timestamp,open,high,low,close\n2024-03-04 09:15,1,2,1,2\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { row: 1, .. }));
    }

    #[test]
    fn lookback_from_last_bar() {
        let tz = FixedOffset::east_opt(19800).unwrap();
        let bars: Vec<Bar> = (0..100)
            .map(|d| {
                let ts = tz.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::days(d);
                Bar::new(ts, 1.0, 1.0, 1.0, 1.0)
            })
            .collect();
        let kept = apply_lookback(bars.clone(), 1, None);
        // Last bar is day 99; cutoff is day 69 inclusive.
        assert_eq!(kept.len(), 31);
        let anchored = apply_lookback(bars, 2, Some(tz.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()));
        assert_eq!(anchored[0].timestamp.date_naive().to_string(), "2024-01-01");
    }

    #[test]
    fn write_then_read() {
        let bars = canonicalize(read_bars(SAMPLE.as_bytes()).unwrap()).0;
        let mut out = Vec::new();
        write_bars(&bars, &mut out).unwrap();
        assert_eq!(read_bars(out.as_slice()).unwrap(), bars);
    }
}
