use super::{
    ArtifactSpec, InfoWindowHandle, MapAdapter, MarkerHandle, OverlayHandle, Viewport, FOCUS_LEVEL,
};
use crate::models::Coordinate;

#[derive(Debug, Clone, Copy)]
struct MarkerEntry {
    marker: MarkerHandle,
    position: Coordinate,
    info_window: Option<InfoWindowHandle>,
    info_open: bool,
}

/// The artifacts currently attached to a map, addressed by marker index
#[derive(Debug, Default)]
pub struct VisualArtifactSet {
    entries: Vec<MarkerEntry>,
    route_overlay: Option<OverlayHandle>,
}

impl VisualArtifactSet {
    pub fn marker_count(&self) -> usize {
        self.entries.len()
    }

    pub fn open_info_windows(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.info_open)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn route_overlay(&self) -> Option<OverlayHandle> {
        self.route_overlay
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.route_overlay.is_none()
    }
}

/// Sole owner of the live artifact set of one map
///
/// [`replace_all`](Self::replace_all) is the only way artifacts get onto or off
/// the map. Teardown clears the map exactly once, either explicitly or when the
/// registry is dropped.
pub struct MarkerRegistry<M: MapAdapter> {
    map: M,
    live: VisualArtifactSet,
    torn_down: bool,
}

impl<M: MapAdapter> MarkerRegistry<M> {
    pub fn new(map: M) -> Self {
        Self {
            map,
            live: VisualArtifactSet::default(),
            torn_down: false,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn live(&self) -> &VisualArtifactSet {
        &self.live
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Releases every live artifact, then attaches the artifacts described by `next`
    pub fn replace_all(&mut self, next: ArtifactSpec) {
        if self.torn_down {
            tracing::warn!("Ignoring artifact replacement on a torn down map");
            return;
        }

        let previous = std::mem::take(&mut self.live);
        self.release(previous);

        let mut set = VisualArtifactSet::default();
        for spec in next.markers {
            let marker = self.map.create_marker(spec.position, &spec.title);
            self.map.attach_marker(marker);

            let info_window = spec
                .info_html
                .as_deref()
                .map(|html| self.map.create_info_window(html));
            let info_open = match info_window {
                Some(window) if spec.open_info => {
                    self.map.open_info_window(window, marker);
                    true
                }
                _ => false,
            };

            set.entries.push(MarkerEntry {
                marker,
                position: spec.position,
                info_window,
                info_open,
            });
        }

        if let Some(path) = next.route.filter(|path| path.len() >= 2) {
            let overlay = self.map.create_polyline(&path);
            self.map.attach_overlay(overlay);
            set.route_overlay = Some(overlay);
        }

        match next.viewport {
            Some(Viewport::Center { center, level }) => {
                self.map.set_center(center);
                if let Some(level) = level {
                    self.map.set_level(level);
                }
            }
            Some(Viewport::Fit(points)) if !points.is_empty() => self.map.fit_bounds(&points),
            _ => {}
        }

        tracing::debug!(
            markers = set.marker_count(),
            route = set.route_overlay.is_some(),
            "Artifact set replaced"
        );
        self.live = set;
    }

    pub fn clear(&mut self) {
        self.replace_all(ArtifactSpec::default());
    }

    /// Clears the map for good. Returns false if it was already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.clear();
        self.torn_down = true;
        true
    }

    /// List selection: closes every open info-window, then opens the one at `index`
    pub fn focus(&mut self, index: usize) -> bool {
        let Some(target) = self.live.entries.get(index).copied() else {
            return false;
        };

        for entry in self.live.entries.iter_mut().filter(|e| e.info_open) {
            if let Some(window) = entry.info_window {
                self.map.close_info_window(window);
            }
            entry.info_open = false;
        }

        self.map.set_center(target.position);
        self.map.set_level(FOCUS_LEVEL);

        if let Some(window) = target.info_window {
            self.map.open_info_window(window, target.marker);
            self.live.entries[index].info_open = true;
        }
        true
    }

    /// Marker click: opens that marker's info-window and leaves the others alone
    pub fn marker_clicked(&mut self, index: usize) -> bool {
        let Some(entry) = self.live.entries.get_mut(index) else {
            return false;
        };
        if let (Some(window), false) = (entry.info_window, entry.info_open) {
            self.map.open_info_window(window, entry.marker);
            entry.info_open = true;
        }
        true
    }

    fn release(&mut self, set: VisualArtifactSet) {
        for entry in set.entries {
            if let Some(window) = entry.info_window {
                self.map.release_info_window(window);
            }
            self.map.detach_marker(entry.marker);
        }
        if let Some(overlay) = set.route_overlay {
            self.map.detach_overlay(overlay);
        }
    }
}

impl<M: MapAdapter> Drop for MarkerRegistry<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}
