//! Derived time-series views over stored history.
//!
//! Pure functions over points in ascending date order. Rendering lives in
//! `adapters::svg_chart`.

use crate::domain::error::StockDataError;
use crate::domain::price_point::PricePoint;
use crate::ports::store_port::PriceStore;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    VolumePrice,
    OpenClose,
    OvernightIntraday,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::VolumePrice,
        AnalysisKind::OpenClose,
        AnalysisKind::OvernightIntraday,
    ];

    /// Menu numbering: 1, 2, 3.
    pub fn from_menu(choice: i64) -> Option<Self> {
        match choice {
            1 => Some(AnalysisKind::VolumePrice),
            2 => Some(AnalysisKind::OpenClose),
            3 => Some(AnalysisKind::OvernightIntraday),
            _ => None,
        }
    }

    pub fn menu_label(&self) -> &'static str {
        match self {
            AnalysisKind::VolumePrice => "Plot volume over time",
            AnalysisKind::OpenClose => "Plot open close variability over time",
            AnalysisKind::OvernightIntraday => "Plot overnight vs intraday movement over time",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            AnalysisKind::VolumePrice => "volume",
            AnalysisKind::OpenClose => "open-close",
            AnalysisKind::OvernightIntraday => "overnight",
        }
    }

    /// Stored rows to read for `num_days` plotted dates. Overnight moves need
    /// the close of the day before the first plotted date.
    pub fn rows_needed(&self, num_days: usize) -> usize {
        match self {
            AnalysisKind::OvernightIntraday => num_days.saturating_add(1),
            _ => num_days,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "volume" => Ok(AnalysisKind::VolumePrice),
            "2" | "open-close" => Ok(AnalysisKind::OpenClose),
            "3" | "overnight" => Ok(AnalysisKind::OvernightIntraday),
            other => Err(format!(
                "unknown analysis {other:?} (expected volume, open-close or overnight)"
            )),
        }
    }
}

/// Which y-axis a series is drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: &'static str,
    pub axis: Axis,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub kind: AnalysisKind,
    pub title: String,
    pub dates: Vec<NaiveDate>,
    pub primary_label: &'static str,
    pub secondary_label: &'static str,
    pub series: Vec<Series>,
}

impl AnalysisView {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

fn closes(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.close).collect()
}

pub fn volume_price(ticker: &str, points: &[PricePoint]) -> AnalysisView {
    AnalysisView {
        kind: AnalysisKind::VolumePrice,
        title: format!("${ticker} Volume and Price By Date"),
        dates: points.iter().map(|p| p.date).collect(),
        primary_label: "Volume in millions",
        secondary_label: "Price ($)",
        series: vec![
            Series {
                label: "Volume",
                axis: Axis::Primary,
                values: points.iter().map(|p| p.volume as f64 / 1_000_000.0).collect(),
            },
            Series {
                label: "Price",
                axis: Axis::Secondary,
                values: closes(points),
            },
        ],
    }
}

pub fn open_close_spread(ticker: &str, points: &[PricePoint]) -> AnalysisView {
    AnalysisView {
        kind: AnalysisKind::OpenClose,
        title: format!("${ticker} Open-Close Variation and Price By Date"),
        dates: points.iter().map(|p| p.date).collect(),
        primary_label: "Closing Price minus Opening Price ($)",
        secondary_label: "Closing Price ($)",
        series: vec![
            Series {
                label: "Closing Minus Opening Price",
                axis: Axis::Primary,
                values: points.iter().map(PricePoint::intraday_move).collect(),
            },
            Series {
                label: "Closing Price",
                axis: Axis::Secondary,
                values: closes(points),
            },
        ],
    }
}

/// One entry per point that has a predecessor in `points`; the first point
/// only supplies the previous close.
pub fn overnight_intraday(ticker: &str, points: &[PricePoint]) -> AnalysisView {
    let pairs: Vec<(&PricePoint, &PricePoint)> =
        points.windows(2).map(|w| (&w[0], &w[1])).collect();

    AnalysisView {
        kind: AnalysisKind::OvernightIntraday,
        title: format!("${ticker} Overnight Change, Intraday Change, and Price By Date"),
        dates: pairs.iter().map(|(_, cur)| cur.date).collect(),
        primary_label: "Change in Price ($)",
        secondary_label: "Closing Price ($)",
        series: vec![
            Series {
                label: "Overnight Move",
                axis: Axis::Primary,
                values: pairs
                    .iter()
                    .map(|(prev, cur)| cur.overnight_move(prev.close))
                    .collect(),
            },
            Series {
                label: "Intraday Move",
                axis: Axis::Primary,
                values: pairs.iter().map(|(_, cur)| cur.intraday_move()).collect(),
            },
            Series {
                label: "Closing Price",
                axis: Axis::Secondary,
                values: pairs.iter().map(|(_, cur)| cur.close).collect(),
            },
        ],
    }
}

pub fn build(kind: AnalysisKind, ticker: &str, points: &[PricePoint]) -> AnalysisView {
    match kind {
        AnalysisKind::VolumePrice => volume_price(ticker, points),
        AnalysisKind::OpenClose => open_close_spread(ticker, points),
        AnalysisKind::OvernightIntraday => overnight_intraday(ticker, points),
    }
}

/// Read what `kind` needs for `num_days` dates of `ticker` and build the view.
pub fn analyze(
    store: &dyn PriceStore,
    kind: AnalysisKind,
    ticker: &str,
    num_days: usize,
) -> Result<AnalysisView, StockDataError> {
    let points = store.query(ticker, kind.rows_needed(num_days))?;
    Ok(build(kind, ticker, &points))
}
