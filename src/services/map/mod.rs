//! Map SDK abstraction and ownership of on-map artifacts.
//!
//! [`MapAdapter`] is the contract consumed from a map SDK (markers,
//! info-windows, polylines, viewport). [`MarkerRegistry`] is the only owner of
//! the artifacts currently attached to a map; everything else describes what it
//! wants drawn with an [`ArtifactSpec`] and hands it to
//! [`MarkerRegistry::replace_all`].

use serde::Serialize;

use crate::models::Coordinate;

mod registry;
mod scene;

pub use registry::{MarkerRegistry, VisualArtifactSet};
pub use scene::{SceneMap, SceneMarker, SceneOverlay, SceneSnapshot};

/// Zoom level used when focusing a single venue
pub const FOCUS_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InfoWindowHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OverlayHandle(pub u64);

/// Operations a map SDK has to offer
///
/// Creation only allocates; nothing is visible until attached (markers,
/// overlays) or opened (info-windows).
pub trait MapAdapter: Send {
    fn create_marker(&mut self, position: Coordinate, title: &str) -> MarkerHandle;
    fn attach_marker(&mut self, marker: MarkerHandle);
    fn detach_marker(&mut self, marker: MarkerHandle);

    fn create_info_window(&mut self, html: &str) -> InfoWindowHandle;
    fn open_info_window(&mut self, window: InfoWindowHandle, anchor: MarkerHandle);
    fn close_info_window(&mut self, window: InfoWindowHandle);

    /// Closes a window that will never be reopened; SDKs that track window
    /// objects can free it here.
    fn release_info_window(&mut self, window: InfoWindowHandle) {
        self.close_info_window(window);
    }

    fn create_polyline(&mut self, path: &[Coordinate]) -> OverlayHandle;
    fn attach_overlay(&mut self, overlay: OverlayHandle);
    fn detach_overlay(&mut self, overlay: OverlayHandle);

    fn set_center(&mut self, center: Coordinate);
    fn set_level(&mut self, level: u8);
    fn fit_bounds(&mut self, points: &[Coordinate]);
}

/// A marker to draw, with its optional popup
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: Coordinate,
    pub title: String,
    pub info_html: Option<String>,
    /// Open the info-window as soon as the marker is attached
    pub open_info: bool,
}

impl MarkerSpec {
    pub fn plain(position: Coordinate, title: impl Into<String>) -> Self {
        Self {
            position,
            title: title.into(),
            info_html: None,
            open_info: false,
        }
    }

    pub fn with_info(mut self, html: String, open: bool) -> Self {
        self.info_html = Some(html);
        self.open_info = open;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Viewport {
    Center { center: Coordinate, level: Option<u8> },
    Fit(Vec<Coordinate>),
}

/// Declarative description of a complete artifact set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactSpec {
    pub markers: Vec<MarkerSpec>,
    pub route: Option<Vec<Coordinate>>,
    pub viewport: Option<Viewport>,
}

/// Escapes text for inclusion in info-window HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
