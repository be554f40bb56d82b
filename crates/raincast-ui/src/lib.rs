//! Presentation layer for the rain probability dashboard: date-range
//! selection, dashboard state, background services and chart rendering.

pub mod app_services;
pub mod chart;
pub mod date_range;
mod error_mapping;
pub mod models;
pub mod services;
pub mod view;

pub use app_services::{AppServices, Resolver};
pub use chart::{render_svg, ChartError, ChartSeries, DATASET_LABEL};
pub use date_range::DateRangeSelector;
pub use models::{ChartArea, DashboardModel, ForecastTicket, LoadingState, LocationTicket};
pub use services::{DashboardMessage, ForecastFetchError};
pub use view::{footer, render_text};
