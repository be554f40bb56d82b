pub mod dashboard_model;

pub use dashboard_model::{
    ChartArea, DashboardModel, ForecastTicket, LoadingState, LocationTicket, DETECTING_LOCATION,
    LOADING_WEATHER, NO_DATA,
};
