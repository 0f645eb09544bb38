use serde::Serialize;
use std::collections::HashMap;

use super::{InfoWindowHandle, MapAdapter, MarkerHandle, OverlayHandle};
use crate::models::{Coordinate, DEFAULT_CENTER};

const DEFAULT_LEVEL: u8 = 3;

#[derive(Debug, Clone)]
struct SceneMarkerEntry {
    position: Coordinate,
    title: String,
    attached: bool,
}

#[derive(Debug, Clone)]
struct SceneWindowEntry {
    html: String,
    anchor: Option<MarkerHandle>,
}

#[derive(Debug, Clone)]
struct SceneOverlayEntry {
    path: Vec<Coordinate>,
    attached: bool,
}

/// In-memory map the server renders into
///
/// Holds exactly what a browser map would show; clients read it back with
/// [`SceneMap::snapshot`].
#[derive(Debug)]
pub struct SceneMap {
    next_id: u64,
    markers: HashMap<MarkerHandle, SceneMarkerEntry>,
    windows: HashMap<InfoWindowHandle, SceneWindowEntry>,
    overlays: HashMap<OverlayHandle, SceneOverlayEntry>,
    center: Coordinate,
    level: u8,
    bounds: Option<(Coordinate, Coordinate)>,
}

impl Default for SceneMap {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneMarker {
    pub id: u64,
    pub position: Coordinate,
    pub title: String,
    /// Content of the info-window open on this marker, if any
    pub info_window: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneOverlay {
    pub id: u64,
    pub path: Vec<Coordinate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot {
    pub center: Coordinate,
    pub level: u8,
    /// South-west and north-east corners of the last fitted bounds
    pub bounds: Option<[Coordinate; 2]>,
    pub markers: Vec<SceneMarker>,
    pub overlays: Vec<SceneOverlay>,
}

impl SceneMap {
    pub fn new(center: Coordinate) -> Self {
        Self {
            next_id: 0,
            markers: HashMap::new(),
            windows: HashMap::new(),
            overlays: HashMap::new(),
            center,
            level: DEFAULT_LEVEL,
            bounds: None,
        }
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Number of allocated objects still held, attached or not
    pub fn allocated(&self) -> usize {
        self.markers.len() + self.windows.len() + self.overlays.len()
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        let mut markers: Vec<SceneMarker> = self
            .markers
            .iter()
            .filter(|(_, entry)| entry.attached)
            .map(|(handle, entry)| SceneMarker {
                id: handle.0,
                position: entry.position,
                title: entry.title.clone(),
                info_window: self
                    .windows
                    .values()
                    .find(|w| w.anchor == Some(*handle))
                    .map(|w| w.html.clone()),
            })
            .collect();
        markers.sort_by_key(|m| m.id);

        let mut overlays: Vec<SceneOverlay> = self
            .overlays
            .iter()
            .filter(|(_, entry)| entry.attached)
            .map(|(handle, entry)| SceneOverlay {
                id: handle.0,
                path: entry.path.clone(),
            })
            .collect();
        overlays.sort_by_key(|o| o.id);

        SceneSnapshot {
            center: self.center,
            level: self.level,
            bounds: self.bounds.map(|(sw, ne)| [sw, ne]),
            markers,
            overlays,
        }
    }
}

impl MapAdapter for SceneMap {
    fn create_marker(&mut self, position: Coordinate, title: &str) -> MarkerHandle {
        let handle = MarkerHandle(self.allocate());
        self.markers.insert(
            handle,
            SceneMarkerEntry {
                position,
                title: title.to_string(),
                attached: false,
            },
        );
        handle
    }

    fn attach_marker(&mut self, marker: MarkerHandle) {
        if let Some(entry) = self.markers.get_mut(&marker) {
            entry.attached = true;
        }
    }

    fn detach_marker(&mut self, marker: MarkerHandle) {
        self.markers.remove(&marker);
    }

    fn create_info_window(&mut self, html: &str) -> InfoWindowHandle {
        let handle = InfoWindowHandle(self.allocate());
        self.windows.insert(
            handle,
            SceneWindowEntry {
                html: html.to_string(),
                anchor: None,
            },
        );
        handle
    }

    fn open_info_window(&mut self, window: InfoWindowHandle, anchor: MarkerHandle) {
        if let Some(entry) = self.windows.get_mut(&window) {
            entry.anchor = Some(anchor);
        }
    }

    fn close_info_window(&mut self, window: InfoWindowHandle) {
        if let Some(entry) = self.windows.get_mut(&window) {
            entry.anchor = None;
        }
    }

    fn release_info_window(&mut self, window: InfoWindowHandle) {
        self.windows.remove(&window);
    }

    fn create_polyline(&mut self, path: &[Coordinate]) -> OverlayHandle {
        let handle = OverlayHandle(self.allocate());
        self.overlays.insert(
            handle,
            SceneOverlayEntry {
                path: path.to_vec(),
                attached: false,
            },
        );
        handle
    }

    fn attach_overlay(&mut self, overlay: OverlayHandle) {
        if let Some(entry) = self.overlays.get_mut(&overlay) {
            entry.attached = true;
        }
    }

    fn detach_overlay(&mut self, overlay: OverlayHandle) {
        self.overlays.remove(&overlay);
    }

    fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    fn fit_bounds(&mut self, points: &[Coordinate]) {
        let Some(first) = points.first() else {
            return;
        };
        let (mut sw, mut ne) = (*first, *first);
        for p in &points[1..] {
            sw.lat = sw.lat.min(p.lat);
            sw.lng = sw.lng.min(p.lng);
            ne.lat = ne.lat.max(p.lat);
            ne.lng = ne.lng.max(p.lng);
        }
        self.bounds = Some((sw, ne));
        self.center = Coordinate::new((sw.lat + ne.lat) / 2.0, (sw.lng + ne.lng) / 2.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::map::{ArtifactSpec, MarkerRegistry, MarkerSpec, Viewport};

    #[test]
    fn test_new_scene_is_empty_at_default_center() {
        let snapshot = SceneMap::default().snapshot();
        assert_eq!(snapshot.center, DEFAULT_CENTER);
        assert_eq!(snapshot.level, DEFAULT_LEVEL);
        assert!(snapshot.markers.is_empty());
        assert!(snapshot.overlays.is_empty());
        assert!(snapshot.bounds.is_none());
    }

    #[test]
    fn test_fit_bounds_centers_on_midpoint() {
        let mut scene = SceneMap::default();
        scene.fit_bounds(&[
            Coordinate::new(37.50, 127.00),
            Coordinate::new(37.60, 126.90),
            Coordinate::new(37.55, 127.10),
        ]);
        let snapshot = scene.snapshot();
        let [sw, ne] = snapshot.bounds.unwrap();
        assert_eq!(sw, Coordinate::new(37.50, 126.90));
        assert_eq!(ne, Coordinate::new(37.60, 127.10));
        assert!((snapshot.center.lat - 37.55).abs() < 1e-9);
        assert!((snapshot.center.lng - 127.00).abs() < 1e-9);
    }

    #[test]
    fn test_registry_replacement_frees_scene_objects() {
        let mut registry = MarkerRegistry::new(SceneMap::default());
        let spec = ArtifactSpec {
            markers: vec![
                MarkerSpec::plain(Coordinate::new(37.5, 127.0), "a")
                    .with_info("<div>a</div>".to_string(), true),
                MarkerSpec::plain(Coordinate::new(37.6, 127.1), "b")
                    .with_info("<div>b</div>".to_string(), false),
            ],
            route: Some(vec![Coordinate::new(37.5, 127.0), Coordinate::new(37.6, 127.1)]),
            viewport: Some(Viewport::Center {
                center: Coordinate::new(37.6, 127.1),
                level: Some(5),
            }),
        };

        for _ in 0..3 {
            registry.replace_all(spec.clone());
        }

        // Two markers, two windows and one overlay: nothing from earlier renders
        assert_eq!(registry.map().allocated(), 5);
        let snapshot = registry.map().snapshot();
        assert_eq!(snapshot.markers.len(), 2);
        assert_eq!(snapshot.overlays.len(), 1);
        assert_eq!(snapshot.level, 5);
        assert_eq!(snapshot.markers[0].info_window.as_deref(), Some("<div>a</div>"));
        assert_eq!(snapshot.markers[1].info_window, None);

        registry.teardown();
        assert_eq!(registry.map().allocated(), 0);
    }
}
