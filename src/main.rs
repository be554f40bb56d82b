//! Raincast: rain probability forecast chart for the current location.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use raincast_ui::{
    render_svg, render_text, AppServices, ChartArea, ChartSeries, DashboardModel,
    DateRangeSelector,
};

const SERVICE_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    // Initialize core
    raincast_core::init()?;

    // Create and initialize application
    let mut app = raincast_core::App::new()?;
    app.initialize()?;
    let config = app.shared_config();

    let services = AppServices::from_config(&config)
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
    let mut model = DashboardModel::new();

    services.refresh_location(&mut model);
    if !services.wait_idle(&mut model, SERVICE_TIMEOUT) {
        anyhow::bail!("Timed out detecting location");
    }

    let selector = DateRangeSelector::new(Local::now().date_naive());
    if let Some(range) = selector.range() {
        tracing::info!(start = %range.start, end = %range.end, "Fetching forecast");
        services.fetch_forecast(&mut model, range);
        if !services.wait_idle(&mut model, SERVICE_TIMEOUT) {
            tracing::warn!("Forecast did not arrive in time");
        }
    }

    println!("{}", render_text(&model, &Local));

    if let (ChartArea::Chart(points), Some(path)) = (model.view(), &config.chart.output_path) {
        let series = ChartSeries::from_points(points, &Local);
        let svg = render_svg(&series, config.chart.width, config.chart.height)?;
        std::fs::write(path, svg)
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;
        println!("\nChart written to {}", path.display());
    }

    // Graceful shutdown
    services.shutdown();
    app.shutdown()?;

    Ok(())
}
