//! Standalone SVG rendering for analysis views.

use crate::domain::analysis::{AnalysisView, Axis, Series};
use crate::domain::error::StockDataError;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const PADDING: f64 = 70.0;
const PRIMARY_COLORS: [&str; 2] = ["blue", "orange"];

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// (min, max) over every value drawn against `axis`, widened when flat.
fn axis_range(series: &[Series], axis: Axis) -> Option<(f64, f64)> {
    let values = series
        .iter()
        .filter(|s| s.axis == axis)
        .flat_map(|s| s.values.iter().copied())
        .filter(|v| v.is_finite());

    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return None;
    }
    if (max - min).abs() < f64::EPSILON {
        Some((min - 1.0, max + 1.0))
    } else {
        Some((min, max))
    }
}

/// Every nth date gets a label once the chart gets crowded.
fn label_step(n: usize) -> usize {
    if n > 30 { 5 } else { 1 }
}

pub fn render(view: &AnalysisView) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.0}" y="30" text-anchor="middle" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape(&view.title)
    );

    if view.is_empty() {
        let _ = writeln!(
            svg,
            r#"<text x="{:.0}" y="{:.0}" text-anchor="middle">No data available.</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        svg.push_str("</svg>\n");
        return svg;
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let bottom = HEIGHT - PADDING;
    let n = view.dates.len();
    let scale_x = if n > 1 {
        plot_width / (n - 1) as f64
    } else {
        0.0
    };
    let x_at = |i: usize| PADDING + i as f64 * scale_x;

    // axes
    let _ = writeln!(
        svg,
        r#"<g stroke="black" stroke-width="1"><line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{bottom:.0}"/><line x1="{PADDING:.0}" y1="{bottom:.0}" x2="{:.0}" y2="{bottom:.0}"/><line x1="{:.0}" y1="{PADDING:.0}" x2="{:.0}" y2="{bottom:.0}"/></g>"#,
        WIDTH - PADDING,
        WIDTH - PADDING,
        WIDTH - PADDING
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{:.0}" transform="rotate(-90 20 {:.0})" text-anchor="middle" fill="blue">{}</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0,
        escape(view.primary_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.0}" y="{:.0}" transform="rotate(90 {:.0} {:.0})" text-anchor="middle">{}</text>"#,
        WIDTH - 20.0,
        HEIGHT / 2.0,
        WIDTH - 20.0,
        HEIGHT / 2.0,
        escape(view.secondary_label)
    );

    // date labels, rotated once there are ten or more
    let rotate = n >= 10;
    for i in (0..n).step_by(label_step(n)) {
        let x = x_at(i);
        let y = bottom + 15.0;
        let transform = if rotate {
            format!(r#" transform="rotate(45 {x:.1} {y:.1})""#)
        } else {
            String::new()
        };
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{y:.1}" font-size="10"{transform}>{}</text>"#,
            view.dates[i]
        );
    }

    let primary = axis_range(&view.series, Axis::Primary);
    let secondary = axis_range(&view.series, Axis::Secondary);
    let mut primary_index = 0;

    for (legend_row, series) in view.series.iter().enumerate() {
        let (range, color, dash) = match series.axis {
            Axis::Primary => {
                let color = PRIMARY_COLORS[primary_index % PRIMARY_COLORS.len()];
                primary_index += 1;
                (primary, color, "")
            }
            Axis::Secondary => (secondary, "black", r#" stroke-dasharray="6 4""#),
        };
        let Some((min, max)) = range else { continue };
        let scale_y = plot_height / (max - min);

        let points: Vec<String> = series
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| format!("{:.1},{:.1}", x_at(i), bottom - (v - min) * scale_y))
            .collect();

        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5"{dash} points="{}"/>"#,
            points.join(" ")
        );

        let legend_y = 50.0 + legend_row as f64 * 16.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{:.0}" y1="{legend_y:.0}" x2="{:.0}" y2="{legend_y:.0}" stroke="{color}" stroke-width="2"{dash}/><text x="{:.0}" y="{:.0}" font-size="12">{}</text>"#,
            PADDING + 10.0,
            PADDING + 40.0,
            PADDING + 46.0,
            legend_y + 4.0,
            escape(series.label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

pub fn write_chart(view: &AnalysisView, path: &Path) -> Result<(), StockDataError> {
    fs::write(path, render(view))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{overnight_intraday, volume_price};
    use crate::domain::price_point::PricePoint;
    use chrono::NaiveDate;

    fn points(count: u32) -> Vec<PricePoint> {
        (1..=count)
            .map(|day| PricePoint {
                ticker: "ABC".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                open: 100.0 + day as f64,
                high: 102.0 + day as f64,
                low: 99.0 + day as f64,
                close: 101.0 + day as f64,
                volume: 1_000_000,
            })
            .collect()
    }

    #[test]
    fn empty_view_renders_placeholder() {
        let svg = render(&volume_price("ABC", &[]));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("No data available."));
        assert!(!svg.contains("<polyline"));
    }

    #[test]
    fn one_polyline_per_series() {
        let svg = render(&overnight_intraday("ABC", &points(5)));
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert!(svg.contains("Overnight Move"));
        assert!(svg.contains("Intraday Move"));
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn title_is_escaped() {
        let mut view = volume_price("ABC", &points(2));
        view.title = "<A&B>".into();
        let svg = render(&view);
        assert!(svg.contains("&lt;A&amp;B&gt;"));
    }

    #[test]
    fn flat_series_still_renders() {
        // constant volume gives a zero-height primary range
        let svg = render(&volume_price("ABC", &points(3)));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn crowded_charts_label_every_fifth_date() {
        let svg = render(&volume_price("ABC", &points(31)));
        assert!(svg.contains("2024-01-01"));
        assert!(svg.contains("2024-01-06"));
        assert!(!svg.contains(">2024-01-02<"));
        assert!(svg.contains("rotate(45"));
    }

    #[test]
    fn write_chart_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chart.svg");
        write_chart(&volume_price("ABC", &points(3)), &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().ends_with("</svg>\n"));
    }
}
