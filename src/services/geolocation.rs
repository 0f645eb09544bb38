//! One-shot device location acquisition.
//!
//! A session asks for its location exactly once. The answer arrives through a
//! [`GeoLocator`]: either a fixed kiosk position or a [`ReportedLocator`] that
//! waits for the client to post what the browser's geolocation API returned.
//! The wait is bounded; running out of time is reported as
//! [`GeoFailure::Timeout`] and callers disable location-dependent actions.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use crate::models::Coordinate;

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum GeoFailure {
    #[error("location permission was denied")]
    PermissionDenied,
    #[error("location is not supported on this device")]
    Unsupported,
    #[error("timed out waiting for a location")]
    Timeout,
}

#[async_trait::async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinate, GeoFailure>;
}

/// Bounds a single location attempt by `timeout`
pub async fn acquire(locator: &dyn GeoLocator, timeout: Duration) -> Result<Coordinate, GeoFailure> {
    match tokio::time::timeout(timeout, locator.locate()).await {
        Ok(result) => result,
        Err(_) => Err(GeoFailure::Timeout),
    }
}

/// Always answers with the configured position, or `Unsupported` without one
pub struct FixedLocator {
    position: Option<Coordinate>,
}

impl FixedLocator {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

#[async_trait::async_trait]
impl GeoLocator for FixedLocator {
    async fn locate(&self) -> Result<Coordinate, GeoFailure> {
        self.position.ok_or(GeoFailure::Unsupported)
    }
}

/// Locator fed by a client-side geolocation callback
pub struct ReportedLocator {
    rx: Mutex<Option<oneshot::Receiver<Result<Coordinate, GeoFailure>>>>,
}

/// Sending half of a [`ReportedLocator`]; consumed by the single report
pub struct LocationReporter {
    tx: oneshot::Sender<Result<Coordinate, GeoFailure>>,
}

impl ReportedLocator {
    pub fn channel() -> (LocationReporter, ReportedLocator) {
        let (tx, rx) = oneshot::channel();
        (
            LocationReporter { tx },
            ReportedLocator {
                rx: Mutex::new(Some(rx)),
            },
        )
    }
}

impl LocationReporter {
    /// Delivers the client's answer. Returns false if nobody is waiting any more.
    pub fn report(self, result: Result<Coordinate, GeoFailure>) -> bool {
        let result = result.and_then(|c| {
            if c.is_valid() {
                Ok(c)
            } else {
                Err(GeoFailure::Unsupported)
            }
        });
        self.tx.send(result).is_ok()
    }
}

#[async_trait::async_trait]
impl GeoLocator for ReportedLocator {
    async fn locate(&self) -> Result<Coordinate, GeoFailure> {
        let rx = self.rx.lock().ok().and_then(|mut slot| slot.take());
        match rx {
            // A dropped reporter means the client went away without answering
            Some(rx) => rx.await.unwrap_or(Err(GeoFailure::Unsupported)),
            None => {
                tracing::warn!("Location already requested from this locator");
                Err(GeoFailure::Unsupported)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationState {
    Pending,
    Available { coordinate: Coordinate },
    Unavailable { reason: GeoFailure },
}

impl LocationState {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            LocationState::Available { coordinate } => Some(*coordinate),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LocationState::Pending)
    }
}

impl From<Result<Coordinate, GeoFailure>> for LocationState {
    fn from(result: Result<Coordinate, GeoFailure>) -> Self {
        match result {
            Ok(coordinate) => LocationState::Available { coordinate },
            Err(reason) => LocationState::Unavailable { reason },
        }
    }
}

/// Read side of a session's location acquisition
#[derive(Clone)]
pub struct LocationWatch {
    rx: watch::Receiver<LocationState>,
}

impl LocationWatch {
    /// Starts the single location attempt in the background
    pub fn spawn(locator: Box<dyn GeoLocator>, timeout: Duration) -> Self {
        let (tx, rx) = watch::channel(LocationState::Pending);

        tokio::spawn(async move {
            let state = LocationState::from(acquire(locator.as_ref(), timeout).await);
            match state {
                LocationState::Available { .. } => tracing::debug!("Location acquired"),
                LocationState::Unavailable { reason } => {
                    tracing::info!(reason = %reason, "Location unavailable, disabling location features")
                }
                LocationState::Pending => {}
            }
            // Receivers may all be gone if the session was torn down meanwhile
            let _ = tx.send(state);
        });

        Self { rx }
    }

    /// A watch that is already settled, for callers that know the answer upfront
    pub fn settled_with(state: LocationState) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self { rx }
    }

    pub fn current(&self) -> LocationState {
        *self.rx.borrow()
    }

    /// Waits (at most `bound`) for the attempt to finish
    pub async fn settled(&mut self, bound: Duration) -> LocationState {
        let wait = self.rx.wait_for(|state| !state.is_pending());
        let settled = match tokio::time::timeout(bound, wait).await {
            Ok(Ok(state)) => Some(*state),
            Ok(Err(_)) | Err(_) => None,
        };

        match settled.unwrap_or_else(|| self.current()) {
            LocationState::Pending => LocationState::Unavailable {
                reason: GeoFailure::Timeout,
            },
            state => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverLocator;

    #[async_trait::async_trait]
    impl GeoLocator for NeverLocator {
        async fn locate(&self) -> Result<Coordinate, GeoFailure> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_fixed_locator() {
        let here = Coordinate::new(37.5665, 126.9780);
        let locator = FixedLocator::new(Some(here));
        assert_eq!(acquire(&locator, DEFAULT_GEOLOCATION_TIMEOUT).await, Ok(here));

        let locator = FixedLocator::new(None);
        assert_eq!(
            acquire(&locator, DEFAULT_GEOLOCATION_TIMEOUT).await,
            Err(GeoFailure::Unsupported)
        );
    }

    #[tokio::test]
    async fn test_acquire_times_out() {
        let result = acquire(&NeverLocator, Duration::from_millis(20)).await;
        assert_eq!(result, Err(GeoFailure::Timeout));
    }

    #[tokio::test]
    async fn test_reported_locator_waits_for_report() {
        let (reporter, locator) = ReportedLocator::channel();
        let mut pending = tokio_test::task::spawn(locator.locate());
        tokio_test::assert_pending!(pending.poll());

        assert!(reporter.report(Err(GeoFailure::PermissionDenied)));
        let result = tokio_test::assert_ready!(pending.poll());
        assert_eq!(result, Err(GeoFailure::PermissionDenied));
    }

    #[tokio::test]
    async fn test_reported_locator_is_single_shot() {
        let (reporter, locator) = ReportedLocator::channel();
        let here = Coordinate::new(35.1796, 129.0756);
        reporter.report(Ok(here));

        assert_eq!(locator.locate().await, Ok(here));
        assert_eq!(locator.locate().await, Err(GeoFailure::Unsupported));
    }

    #[tokio::test]
    async fn test_dropped_reporter_is_unsupported() {
        let (reporter, locator) = ReportedLocator::channel();
        drop(reporter);
        assert_eq!(locator.locate().await, Err(GeoFailure::Unsupported));
    }

    #[tokio::test]
    async fn test_invalid_report_is_rejected() {
        let (reporter, locator) = ReportedLocator::channel();
        reporter.report(Ok(Coordinate::new(123.0, 0.0)));
        assert_eq!(locator.locate().await, Err(GeoFailure::Unsupported));
    }

    #[tokio::test]
    async fn test_watch_settles_after_report() {
        let (reporter, locator) = ReportedLocator::channel();
        let mut watch = LocationWatch::spawn(Box::new(locator), Duration::from_secs(5));
        assert!(watch.current().is_pending());

        let here = Coordinate::new(37.5, 127.0);
        reporter.report(Ok(here));

        let state = watch.settled(Duration::from_secs(1)).await;
        assert_eq!(state.coordinate(), Some(here));
    }

    #[tokio::test]
    async fn test_watch_bounded_wait() {
        let mut watch = LocationWatch::spawn(Box::new(NeverLocator), Duration::from_secs(60));
        let state = watch.settled(Duration::from_millis(20)).await;
        assert_eq!(
            state,
            LocationState::Unavailable {
                reason: GeoFailure::Timeout
            }
        );
    }
}
