//! Rain probability chart: series preparation and SVG rendering with `plotters`.

use chrono::TimeZone;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use raincast_weather::ForecastPoint;
use std::fmt::Display;

pub const DATASET_LABEL: &str = "Rain Probability (%)";
pub const LABEL_FORMAT: &str = "%b %d, %H:%M";

const MAX_X_LABELS: usize = 12;
const LINE_COLOR: RGBColor = RGBColor(75, 192, 192);

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("No data to chart")]
    NoData,
    #[error("Chart rendering failed: {0}")]
    Render(String),
}

/// Chart-ready view of a forecast: one label and one value per point.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartSeries {
    /// Build the series, formatting each timestamp in `tz`.
    pub fn from_points<Tz>(points: &[ForecastPoint], tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let labels = points
            .iter()
            .map(|p| p.timestamp.with_timezone(tz).format(LABEL_FORMAT).to_string())
            .collect();
        let values = points.iter().map(|p| p.rain_probability).collect();
        Self {
            labels,
            values,
            y_min: 0.0,
            y_max: 100.0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Hover text for the point at `index`.
    pub fn tooltip(&self, index: usize) -> Option<String> {
        self.values
            .get(index)
            .map(|value| format!("{}: {}%", DATASET_LABEL, value))
    }
}

/// Y-axis tick label.
pub fn percent_label(value: f64) -> String {
    format!("{}%", value)
}

/// Render the series as an SVG document: a filled line chart on a 0-100% axis.
pub fn render_svg(series: &ChartSeries, width: u32, height: u32) -> Result<String, ChartError> {
    if series.is_empty() {
        return Err(ChartError::NoData);
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        // A single point still needs a non-empty x range.
        let x_max = series.len().saturating_sub(1).max(1) as f64;
        let mut chart = ChartBuilder::on(&root)
            .caption(DATASET_LABEL, ("sans-serif", 20))
            .margin(16)
            .x_label_area_size(48)
            .y_label_area_size(56)
            .build_cartesian_2d(0f64..x_max, series.y_min..series.y_max)
            .map_err(render_error)?;

        let labels = &series.labels;
        chart
            .configure_mesh()
            .x_labels(labels.len().min(MAX_X_LABELS))
            .x_label_formatter(&|x: &f64| label_at(labels, *x))
            .y_labels(11)
            .y_label_formatter(&|y: &f64| percent_label(y.round()))
            .light_line_style(BLACK.mix(0.08))
            .draw()
            .map_err(render_error)?;

        let points = series
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| (i as f64, *value));
        chart
            .draw_series(
                AreaSeries::new(points, series.y_min, LINE_COLOR.mix(0.2)).border_style(LINE_COLOR),
            )
            .map_err(render_error)?
            .label(DATASET_LABEL)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], LINE_COLOR));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperMiddle)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.2))
            .draw()
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    tracing::debug!(points = series.len(), bytes = svg.len(), "Rendered chart");
    Ok(svg)
}

/// Label for an x position, blank between data points.
fn label_at(labels: &[String], x: f64) -> String {
    let index = x.round();
    if index < 0.0 || (x - index).abs() > 0.01 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

fn render_error<E>(e: DrawingAreaErrorKind<E>) -> ChartError
where
    E: std::error::Error + Send + Sync,
{
    ChartError::Render(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn points() -> Vec<ForecastPoint> {
        vec![
            ForecastPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                rain_probability: 25.0,
            },
            ForecastPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap(),
                rain_probability: 80.0,
            },
        ]
    }

    #[test]
    fn test_series_labels_and_values() {
        let series = ChartSeries::from_points(&points(), &Utc);
        assert_eq!(series.labels, vec!["Mar 01, 00:00", "Mar 01, 03:00"]);
        assert_eq!(series.values, vec![25.0, 80.0]);
        assert_eq!((series.y_min, series.y_max), (0.0, 100.0));
    }

    #[test]
    fn test_labels_use_display_timezone() {
        let dhaka = FixedOffset::east_opt(6 * 3600).unwrap();
        let series = ChartSeries::from_points(&points(), &dhaka);
        assert_eq!(series.labels[0], "Mar 01, 06:00");
        assert_eq!(series.labels[1], "Mar 01, 09:00");
    }

    #[test]
    fn test_tooltip_text() {
        let series = ChartSeries::from_points(&points(), &Utc);
        assert_eq!(series.tooltip(0).as_deref(), Some("Rain Probability (%): 25%"));
        assert_eq!(series.tooltip(2), None);
        assert_eq!(percent_label(40.0), "40%");
    }

    #[test]
    fn test_label_at_positions() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(label_at(&labels, 1.0), "b");
        assert_eq!(label_at(&labels, 0.5), "");
        assert_eq!(label_at(&labels, 3.0), "");
    }

    #[test]
    fn test_render_svg() {
        let series = ChartSeries::from_points(&points(), &Utc);
        let svg = render_svg(&series, 640, 320).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Rain Probability (%)"));
    }

    #[test]
    fn test_render_single_point() {
        let series = ChartSeries::from_points(&points()[..1], &Utc);
        assert!(render_svg(&series, 320, 200).is_ok());
    }

    #[test]
    fn test_render_empty_series() {
        let series = ChartSeries::from_points(&[], &Utc);
        assert!(matches!(render_svg(&series, 320, 200), Err(ChartError::NoData)));
    }
}
