//! Device location with reverse geocoding and a fixed fallback.
//!
//! A [`PositionSource`] produces raw coordinates; [`LocationResolver`] bounds
//! the request with a timeout, names the place, and reports failures as a
//! [`LocationResolution::Failed`] value the caller can replace with the
//! default location.

use std::future::Future;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::geocode::ReverseGeocoder;
use crate::types::{Coordinate, Location, LocationError, Position, PositionOptions};

/// Source of device coordinates.
pub trait PositionSource: Send + Sync {
    /// Request a single position fix.
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Position, LocationError>> + Send;
}

/// Always reports the configured coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionSource {
    coordinate: Coordinate,
}

impl FixedPositionSource {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl PositionSource for FixedPositionSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, LocationError> {
        Ok(Position {
            coordinate: self.coordinate,
            accuracy_meters: None,
        })
    }
}

/// Platform location service (GeoClue2 over D-Bus on Linux).
#[derive(Debug)]
pub struct SystemPositionSource {
    desktop_id: String,
    last_fix: Mutex<Option<(Instant, Position)>>,
}

impl SystemPositionSource {
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
            last_fix: Mutex::new(None),
        }
    }

    /// Last fix, if it is younger than `options.max_cached_age`.
    fn cached(&self, options: &PositionOptions) -> Option<Position> {
        if options.max_cached_age.is_zero() {
            return None;
        }
        let guard = self.last_fix.lock();
        let (taken_at, position) = guard.as_ref()?;
        (taken_at.elapsed() <= options.max_cached_age).then_some(*position)
    }
}

impl PositionSource for SystemPositionSource {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, LocationError> {
        if let Some(position) = self.cached(options) {
            tracing::debug!("Reusing cached position fix");
            return Ok(position);
        }

        let position = platform::locate(&self.desktop_id, options).await?;
        *self.last_fix.lock() = Some((Instant::now(), position));
        Ok(position)
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::future::Future;
    use std::time::Duration;

    use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
    use zbus::{Connection, Proxy};

    use crate::types::{Coordinate, LocationError, Position, PositionOptions};

    const SERVICE: &str = "org.freedesktop.GeoClue2";
    const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
    const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
    const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
    const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
    const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

    // GClueAccuracyLevel
    const ACCURACY_CITY: u32 = 4;
    const ACCURACY_EXACT: u32 = 8;

    const POLL_INTERVAL: Duration = Duration::from_millis(250);

    fn map_dbus_error(e: zbus::Error) -> LocationError {
        let text = e.to_string();
        if text.contains("AccessDenied") || text.contains("NotAuthorized") {
            LocationError::PermissionDenied
        } else if text.contains("ServiceUnknown") || text.contains("NameHasNoOwner") {
            LocationError::ServiceUnavailable
        } else {
            LocationError::Other(text)
        }
    }

    fn map_value_error(e: zbus::zvariant::Error) -> LocationError {
        LocationError::Other(format!("Unexpected GeoClue value: {}", e))
    }

    async fn get_property(
        conn: &Connection,
        path: &str,
        interface: &str,
        name: &str,
    ) -> Result<OwnedValue, LocationError> {
        let props = Proxy::new(conn, SERVICE, path, PROPERTIES_IFACE)
            .await
            .map_err(map_dbus_error)?;
        props
            .call("Get", &(interface, name))
            .await
            .map_err(map_dbus_error)
    }

    async fn set_property(
        conn: &Connection,
        path: &str,
        name: &str,
        value: Value<'_>,
    ) -> Result<(), LocationError> {
        let props = Proxy::new(conn, SERVICE, path, PROPERTIES_IFACE)
            .await
            .map_err(map_dbus_error)?;
        props
            .call::<_, _, ()>("Set", &(CLIENT_IFACE, name, value))
            .await
            .map_err(map_dbus_error)
    }

    async fn read_f64(
        conn: &Connection,
        path: &str,
        name: &str,
    ) -> Result<f64, LocationError> {
        let value = get_property(conn, path, LOCATION_IFACE, name).await?;
        f64::try_from(value).map_err(map_value_error)
    }

    /// Spawns `stop` on the current runtime when dropped.
    ///
    /// The resolver drops `locate` on timeout or cancel, and the client still
    /// has to be stopped then.
    pub(super) struct StopOnDrop<F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        stop: Option<F>,
    }

    impl<F> StopOnDrop<F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        pub(super) fn new(stop: F) -> Self {
            Self { stop: Some(stop) }
        }
    }

    impl<F> Drop for StopOnDrop<F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        fn drop(&mut self) {
            let Some(stop) = self.stop.take() else {
                return;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(stop);
                }
                Err(_) => tracing::debug!("No runtime left to stop the GeoClue client"),
            }
        }
    }

    async fn stop_client(conn: &Connection, client_path: &str) -> zbus::Result<()> {
        let client = Proxy::new(conn, SERVICE, client_path, CLIENT_IFACE).await?;
        client.call::<_, _, ()>("Stop", &()).await
    }

    /// Start a fresh GeoClue client and wait for its first location.
    ///
    /// The caller bounds the wait with `options.timeout`.
    pub(super) async fn locate(
        desktop_id: &str,
        options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        let conn = Connection::system()
            .await
            .map_err(|_| LocationError::ServiceUnavailable)?;

        let manager = Proxy::new(&conn, SERVICE, MANAGER_PATH, MANAGER_IFACE)
            .await
            .map_err(map_dbus_error)?;
        let client_path: OwnedObjectPath = manager
            .call("GetClient", &())
            .await
            .map_err(map_dbus_error)?;
        let client_path = client_path.as_str();

        let accuracy = if options.high_accuracy {
            ACCURACY_EXACT
        } else {
            ACCURACY_CITY
        };
        set_property(&conn, client_path, "DesktopId", Value::from(desktop_id)).await?;
        set_property(&conn, client_path, "RequestedAccuracyLevel", Value::from(accuracy)).await?;
        // Report on the first fix rather than reusing the service's last one.
        set_property(&conn, client_path, "TimeThreshold", Value::from(0u32)).await?;

        let client = Proxy::new(&conn, SERVICE, client_path, CLIENT_IFACE)
            .await
            .map_err(map_dbus_error)?;
        client
            .call::<_, _, ()>("Start", &())
            .await
            .map_err(map_dbus_error)?;

        let stop_conn = conn.clone();
        let stop_path = client_path.to_string();
        let _stop = StopOnDrop::new(async move {
            if let Err(e) = stop_client(&stop_conn, &stop_path).await {
                tracing::debug!("Failed to stop GeoClue client: {}", e);
            }
        });

        wait_for_location(&conn, client_path).await
    }

    async fn wait_for_location(
        conn: &Connection,
        client_path: &str,
    ) -> Result<Position, LocationError> {
        loop {
            let value = get_property(conn, client_path, CLIENT_IFACE, "Location").await?;
            let location_path = OwnedObjectPath::try_from(value).map_err(map_value_error)?;

            if location_path.as_str() != "/" {
                let path = location_path.as_str();
                let latitude = read_f64(conn, path, "Latitude").await?;
                let longitude = read_f64(conn, path, "Longitude").await?;
                let accuracy = read_f64(conn, path, "Accuracy").await.ok();

                tracing::info!(latitude, longitude, "GeoClue location fix");
                return Ok(Position {
                    coordinate: Coordinate::new(latitude, longitude)?,
                    accuracy_meters: accuracy,
                });
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        #[tokio::test]
        async fn test_abandoned_wait_still_stops() {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let wait = async move {
                let _stop = StopOnDrop::new(async move {
                    let _ = tx.send(());
                });
                std::future::pending::<()>().await;
            };

            let outcome = tokio::time::timeout(Duration::from_millis(20), wait).await;
            assert!(outcome.is_err());
            assert!(tokio::time::timeout(Duration::from_secs(1), rx).await.is_ok());
        }

        #[tokio::test]
        async fn test_completed_wait_stops_once() {
            let stopped = Arc::new(AtomicBool::new(false));
            let flag = stopped.clone();
            {
                let _stop = StopOnDrop::new(async move {
                    assert!(!flag.swap(true, Ordering::SeqCst));
                });
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(stopped.load(Ordering::SeqCst));
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use crate::types::{LocationError, Position, PositionOptions};

    pub(super) async fn locate(
        _desktop_id: &str,
        _options: &PositionOptions,
    ) -> Result<Position, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// The position source selected by configuration.
#[derive(Debug)]
pub enum ConfiguredPositionSource {
    System(SystemPositionSource),
    Fixed(FixedPositionSource),
}

impl PositionSource for ConfiguredPositionSource {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, LocationError> {
        match self {
            Self::System(source) => source.current_position(options).await,
            Self::Fixed(source) => source.current_position(options).await,
        }
    }
}

/// Outcome of a location request before any fallback is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationResolution {
    Resolved(Location),
    Failed(LocationError),
}

/// A usable location, with a user-facing notice when it is the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub location: Location,
    pub notice: Option<String>,
}

impl ResolvedLocation {
    pub fn is_fallback(&self) -> bool {
        self.notice.is_some()
    }
}

impl LocationResolution {
    /// Substitute `default` for a failed request, with a notice naming the reason.
    pub fn or_default(self, default: &Location) -> ResolvedLocation {
        match self {
            Self::Resolved(location) => ResolvedLocation {
                location,
                notice: None,
            },
            Self::Failed(reason) => {
                tracing::warn!("Location detection failed: {}", reason);
                ResolvedLocation {
                    location: default.clone(),
                    notice: Some(format!(
                        "Using default location ({}). {}",
                        default.display_name, reason
                    )),
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub options: PositionOptions,
    pub default_location: Location,
}

/// Resolves the device location to a named [`Location`].
#[derive(Debug)]
pub struct LocationResolver<S> {
    source: S,
    geocoder: ReverseGeocoder,
    settings: ResolverSettings,
}

impl<S: PositionSource> LocationResolver<S> {
    pub fn new(source: S, geocoder: ReverseGeocoder, settings: ResolverSettings) -> Self {
        Self {
            source,
            geocoder,
            settings,
        }
    }

    /// Request a position fix and name it.
    ///
    /// Geocoding failures keep the coordinate with the "Your Location" name.
    pub async fn resolve(&self, cancel: &CancellationToken) -> LocationResolution {
        let options = &self.settings.options;
        let request = tokio::time::timeout(options.timeout, self.source.current_position(options));

        let position = tokio::select! {
            biased;
            _ = cancel.cancelled() => return LocationResolution::Failed(LocationError::Cancelled),
            result = request => match result {
                Ok(Ok(position)) => position,
                Ok(Err(e)) => return LocationResolution::Failed(e),
                Err(_) => return LocationResolution::Failed(LocationError::Timeout),
            },
        };

        let name = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            name = self.geocoder.reverse_geocode(position.coordinate) => name,
        };

        let mut location = Location::unnamed(position);
        if let Some(name) = name {
            location.display_name = name;
        }
        LocationResolution::Resolved(location)
    }

    /// Resolve the location, falling back to the default on any failure.
    pub async fn resolve_location(&self, cancel: &CancellationToken) -> ResolvedLocation {
        self.resolve(cancel)
            .await
            .or_default(&self.settings.default_location)
    }
}
