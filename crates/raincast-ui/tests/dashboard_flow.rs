//! End-to-end dashboard flow against mocked Nominatim and OpenWeatherMap servers.

use std::time::Duration;

use chrono::{Local, NaiveDate, TimeZone};
use raincast_core::{Config, LocationSourceKind};
use raincast_ui::{AppServices, ChartArea, ChartSeries, DashboardModel, DateRangeSelector};
use raincast_weather::DateRange;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(10);

struct Servers {
    weather: MockServer,
    geocode: MockServer,
    // Dropped last so the servers shut down first.
    runtime: tokio::runtime::Runtime,
}

impl Servers {
    fn start() -> Self {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (weather, geocode) =
            runtime.block_on(async { (MockServer::start().await, MockServer::start().await) });
        Self {
            weather,
            geocode,
            runtime,
        }
    }

    fn mount(&self, server: &MockServer, mock: Mock) {
        self.runtime.block_on(mock.mount(server));
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.forecast.api_key = Some("test-key".to_string());
        config.forecast.base_url = self.weather.uri();
        config.geocoding.base_url = self.geocode.uri();
        config.location.source = LocationSourceKind::Fixed;
        config.location.fixed_latitude = Some(47.37);
        config.location.fixed_longitude = Some(8.54);
        config
    }
}

fn local_ts(date: NaiveDate, hour: u32) -> i64 {
    Local
        .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
        .earliest()
        .unwrap()
        .timestamp()
}

#[test]
fn test_location_then_forecast() {
    let servers = Servers::start();
    servers.mount(
        &servers.geocode,
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": {"city": "Zurich"}
            }))),
    );

    let today = Local::now().date_naive();
    let tomorrow = today.succ_opt().unwrap();
    let far = today + chrono::Days::new(30);
    servers.mount(
        &servers.weather,
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [
                    {"dt": local_ts(today, 12), "pop": 0.25},
                    {"dt": local_ts(tomorrow, 12), "pop": 0.8},
                    {"dt": local_ts(far, 12), "pop": 1.0}
                ]
            }))),
    );

    let services = AppServices::from_config(&servers.config()).unwrap();
    let mut model = DashboardModel::new();

    services.refresh_location(&mut model);
    assert_eq!(model.view(), ChartArea::DetectingLocation);
    assert!(services.wait_idle(&mut model, WAIT));
    assert_eq!(model.location().unwrap().display_name, "Zurich");
    assert!(model.notice().is_none());

    let mut selector = DateRangeSelector::new(today);
    let range = selector.select(Some(today), Some(tomorrow)).unwrap();
    assert!(services.fetch_forecast(&mut model, range));
    assert!(services.wait_idle(&mut model, WAIT));

    assert_eq!(model.badge().as_deref(), Some("2 data points"));
    let ChartArea::Chart(points) = model.view() else {
        unreachable!("expected chart, got {:?}", model.view());
    };
    let series = ChartSeries::from_points(points, &Local);
    assert_eq!(series.values, vec![25.0, 80.0]);
    assert_eq!(series.labels[0], format!("{}, 12:00", today.format("%b %d")));

    services.shutdown();
}

#[test]
fn test_forecast_failure_shows_blocking_error() {
    let servers = Servers::start();
    servers.mount(
        &servers.weather,
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(500)),
    );

    let services = AppServices::from_config(&servers.config()).unwrap();
    let mut model = DashboardModel::new();
    services.refresh_location(&mut model);
    assert!(services.wait_idle(&mut model, WAIT));
    // Geocoder has no mocks mounted, so the coordinate keeps the generic name.
    assert_eq!(model.location().unwrap().display_name, "Your Location");

    let today = Local::now().date_naive();
    assert!(services.fetch_forecast(&mut model, DateRange::new(today, today)));
    assert!(services.wait_idle(&mut model, WAIT));

    assert_eq!(
        model.view(),
        ChartArea::Error("Failed to fetch weather data. Please try again later.")
    );
    assert!(model.badge().is_none());
    services.shutdown();
}

#[test]
fn test_latest_range_wins() {
    let servers = Servers::start();
    let today = Local::now().date_naive();
    let tomorrow = today.succ_opt().unwrap();
    servers.mount(
        &servers.weather,
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "list": [
                            {"dt": local_ts(today, 9), "pop": 0.1},
                            {"dt": local_ts(tomorrow, 9), "pop": 0.2}
                        ]
                    }))
                    .set_delay(Duration::from_millis(200)),
            ),
    );

    let services = AppServices::from_config(&servers.config()).unwrap();
    let mut model = DashboardModel::new();
    services.refresh_location(&mut model);
    assert!(services.wait_idle(&mut model, WAIT));

    assert!(services.fetch_forecast(&mut model, DateRange::new(today, tomorrow)));
    assert!(services.fetch_forecast(&mut model, DateRange::new(tomorrow, tomorrow)));
    assert!(services.wait_idle(&mut model, WAIT));

    assert_eq!(model.rain_data().len(), 1);
    assert_eq!(model.rain_data()[0].rain_probability, 20.0);
    assert_eq!(model.selected_range(), Some(DateRange::new(tomorrow, tomorrow)));
    services.shutdown();
}
