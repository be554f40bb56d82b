//! Plain-text rendering of the dashboard for terminal output.

use chrono::{DateTime, TimeZone};
use std::fmt::{Display, Write};

use crate::chart::ChartSeries;
use crate::models::{ChartArea, DashboardModel};

pub const TITLE: &str = "Rain Probability Forecast";
pub const ATTRIBUTION: &str = "Data provided by OpenWeatherMap";
const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Attribution line with the time of the last successful fetch.
pub fn footer<Tz>(last_updated: Option<&DateTime<Tz>>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = match last_updated {
        Some(t) => t.format(TIMESTAMP_FORMAT).to_string(),
        None => "Loading...".to_string(),
    };
    format!("{} • Last updated: {}", ATTRIBUTION, stamp)
}

/// Render the whole dashboard, with chart labels in `tz`.
pub fn render_text<Tz>(model: &DashboardModel, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "{}", TITLE);

    if let Some(location) = model.location() {
        let _ = writeln!(
            out,
            "Location: {} ({:.4}, {:.4})",
            location.display_name, location.coordinate.latitude, location.coordinate.longitude
        );
    }
    if let Some(notice) = model.notice() {
        let _ = writeln!(out, "! {}", notice);
    }
    if let Some(range) = model.selected_range() {
        let _ = writeln!(out, "Range: {} to {}", range.start, range.end);
    }
    out.push('\n');

    match model.view() {
        ChartArea::Chart(points) => {
            let series = ChartSeries::from_points(points, tz);
            if let Some(badge) = model.badge() {
                let _ = writeln!(out, "Rain Probability [{}]", badge);
            }
            for (index, label) in series.labels.iter().enumerate() {
                if let Some(tooltip) = series.tooltip(index) {
                    let _ = writeln!(out, "  {:<14} {}", label, tooltip);
                }
            }
        }
        area => {
            if let Some(message) = area.message() {
                let _ = writeln!(out, "{}", message);
            }
        }
    }

    out.push('\n');
    let last_updated = model.last_updated().map(|t| t.with_timezone(tz));
    out.push_str(&footer(last_updated.as_ref()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use raincast_weather::{Coordinate, DateRange, ForecastPoint, Location, ResolvedLocation};

    fn located_model() -> DashboardModel {
        let mut model = DashboardModel::new();
        let ticket = model.begin_location_refresh();
        model.apply_location(
            ticket.seq,
            ResolvedLocation {
                location: Location::new(Coordinate::new(23.8103, 90.4125).unwrap(), "Dhaka"),
                notice: Some("Using default location (Dhaka). Location request timed out".into()),
            },
        );
        model
    }

    #[test]
    fn test_footer_format() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 15, 4, 5).unwrap();
        assert_eq!(
            footer(Some(&t)),
            "Data provided by OpenWeatherMap • Last updated: 3/1/2024, 3:04:05 PM"
        );
        assert_eq!(
            footer::<Utc>(None),
            "Data provided by OpenWeatherMap • Last updated: Loading..."
        );
    }

    #[test]
    fn test_render_detecting_location() {
        let mut model = DashboardModel::new();
        model.begin_location_refresh();
        let text = render_text(&model, &Utc);
        assert!(text.starts_with("Rain Probability Forecast"));
        assert!(text.contains("Detecting your location..."));
    }

    #[test]
    fn test_render_chart_rows() {
        let mut model = located_model();
        let range = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        );
        let ticket = model.begin_forecast(range).unwrap();
        model.apply_forecast(
            ticket.seq,
            Ok(vec![ForecastPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(),
                rain_probability: 40.0,
            }]),
        );

        let text = render_text(&model, &Utc);
        assert!(text.contains("Location: Dhaka (23.8103, 90.4125)"));
        assert!(text.contains("! Using default location (Dhaka)."));
        assert!(text.contains("Range: 2024-03-01 to 2024-03-02"));
        assert!(text.contains("Rain Probability [1 data points]"));
        assert!(text.contains("Mar 01, 06:00"));
        assert!(text.contains("Rain Probability (%): 40%"));
        assert!(!text.contains("Loading..."));
    }

    #[test]
    fn test_render_no_data() {
        let model = located_model();
        let text = render_text(&model, &Utc);
        assert!(text.contains("No data available for the selected range"));
        assert!(text.ends_with("Last updated: Loading..."));
    }
}
