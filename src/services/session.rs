//! One map view and everything drawn on it.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::{
    models::{Candidate, Coordinate, RecommendationMode, RecommendationState, RouteResult, TravelMode},
    services::{
        distance::{distance_meters, estimate_travel_time},
        geolocation::{LocationReporter, LocationWatch},
        map::{escape_html, ArtifactSpec, MapAdapter, MarkerRegistry, MarkerSpec, Viewport},
        recommendation::SavedPick,
    },
};

const ORIGIN_TITLE: &str = "현재 위치";

/// Sequence number handed out when an asynchronous action starts
///
/// Only the most recently issued ticket may render; anything older is a stale
/// response and gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ActionTicket(u64);

/// A map view with its registry, recommendation state and location
///
/// Candidate markers come first in the live set, so marker index `i` is the
/// `i`-th displayed candidate; the origin marker follows them.
pub struct MapSession<M: MapAdapter> {
    id: Uuid,
    registry: MarkerRegistry<M>,
    state: RecommendationState,
    location: LocationWatch,
    reporter: Option<LocationReporter>,
    latest_ticket: u64,
    last_route: Option<RouteResult>,
    created_at: DateTime<Utc>,
    last_used: Instant,
}

impl<M: MapAdapter> MapSession<M> {
    pub fn new(map: M, location: LocationWatch, reporter: Option<LocationReporter>) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry: MarkerRegistry::new(map),
            state: RecommendationState::default(),
            location,
            reporter,
            latest_ticket: 0,
            last_route: None,
            created_at: Utc::now(),
            last_used: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Marks the session as in use by a client request
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Whether nothing has touched the session for at least `idle` before `now`
    pub fn is_idle(&self, idle: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_used) >= idle
    }

    pub fn state(&self) -> &RecommendationState {
        &self.state
    }

    pub fn registry(&self) -> &MarkerRegistry<M> {
        &self.registry
    }

    pub fn map(&self) -> &M {
        self.registry.map()
    }

    pub fn last_route(&self) -> Option<&RouteResult> {
        self.last_route.as_ref()
    }

    pub fn location(&self) -> LocationWatch {
        self.location.clone()
    }

    /// Hands out the reporting end of a client-reported location, once
    pub fn take_reporter(&mut self) -> Option<LocationReporter> {
        self.reporter.take()
    }

    pub fn is_torn_down(&self) -> bool {
        self.registry.is_torn_down()
    }

    /// Starts a new action; every ticket issued before this one becomes stale
    pub fn begin_action(&mut self) -> ActionTicket {
        self.latest_ticket += 1;
        ActionTicket(self.latest_ticket)
    }

    pub fn is_current(&self, ticket: ActionTicket) -> bool {
        ticket.0 == self.latest_ticket && !self.is_torn_down()
    }

    /// Switches mode: the other mode's results are dropped and the map cleared
    pub fn enter_mode(&mut self, mode: RecommendationMode) {
        self.state = RecommendationState::empty(mode);
        self.last_route = None;
        self.registry.clear();
    }

    pub fn apply_saved_pick(&mut self, ticket: ActionTicket, origin: Coordinate, pick: SavedPick) -> bool {
        if !self.accepts(ticket, "saved pick") {
            return false;
        }

        let position = pick.candidate.coordinate;
        self.state = RecommendationState::from_saved(pick.candidate, pick.travel_time);
        let markers = self.base_markers(origin, Some(0));
        self.registry.replace_all(ArtifactSpec {
            markers,
            route: None,
            viewport: Some(Viewport::Center {
                center: position,
                level: None,
            }),
        });
        true
    }

    pub fn apply_nearby(&mut self, ticket: ActionTicket, origin: Coordinate, nearby: Vec<Candidate>) -> bool {
        if !self.accepts(ticket, "nearby results") {
            return false;
        }

        let bounds: Vec<Coordinate> = nearby.iter().map(|c| c.coordinate).collect();
        self.state = RecommendationState::from_location(nearby);
        let markers = self.base_markers(origin, None);
        self.registry.replace_all(ArtifactSpec {
            markers,
            route: None,
            viewport: Some(Viewport::Fit(bounds)),
        });
        true
    }

    /// Draws `route` towards the candidate at `index`, its info-window showing the trip
    pub fn apply_route(
        &mut self,
        ticket: ActionTicket,
        origin: Coordinate,
        index: usize,
        mode: TravelMode,
        route: RouteResult,
    ) -> bool {
        if !self.accepts(ticket, "route") {
            return false;
        }
        let Some(destination) = self.displayed().get(index).map(|c| (*c).clone()) else {
            tracing::warn!(session_id = %self.id, index, "Route destination no longer displayed");
            return false;
        };

        let mut markers = self.base_markers(origin, None);
        if let Some(marker) = markers.get_mut(index) {
            marker.info_html = Some(route_info_html(&destination, mode, &route, origin));
            marker.open_info = true;
        }

        self.registry.replace_all(ArtifactSpec {
            markers,
            route: Some(route.path.clone()),
            viewport: Some(Viewport::Fit(route.path.clone())),
        });
        self.last_route = Some(route);
        true
    }

    /// List selection of the candidate at `index`; the origin marker is not a candidate
    pub fn focus_candidate(&mut self, index: usize) -> bool {
        if index >= self.displayed().len() {
            return false;
        }
        self.registry.focus(index)
    }

    pub fn marker_clicked(&mut self, index: usize) -> bool {
        self.registry.marker_clicked(index)
    }

    /// Clears the map once; later calls are no-ops
    pub fn teardown(&mut self) -> bool {
        // Outstanding tickets can no longer render
        self.latest_ticket += 1;
        let cleared = self.registry.teardown();
        if cleared {
            tracing::info!(session_id = %self.id, "Map session torn down");
        }
        cleared
    }

    /// Candidates in marker order
    pub fn displayed(&self) -> Vec<&Candidate> {
        match self.state.mode {
            RecommendationMode::FromLocation => self.state.nearby.iter().collect(),
            _ => self.state.selected.iter().collect(),
        }
    }

    fn accepts(&self, ticket: ActionTicket, what: &str) -> bool {
        let current = self.is_current(ticket);
        if !current {
            tracing::warn!(
                session_id = %self.id,
                ticket = ticket.0,
                latest = self.latest_ticket,
                "Discarding stale {}",
                what
            );
        }
        current
    }

    fn base_markers(&self, origin: Coordinate, open: Option<usize>) -> Vec<MarkerSpec> {
        let mut markers: Vec<MarkerSpec> = self
            .displayed()
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let html = match self.state.mode {
                    RecommendationMode::FromSavedList => name_html(candidate),
                    _ => venue_html(candidate),
                };
                MarkerSpec::plain(candidate.coordinate, candidate.name.clone())
                    .with_info(html, open == Some(i))
            })
            .collect();
        markers.push(MarkerSpec::plain(origin, ORIGIN_TITLE));
        markers
    }
}

fn name_html(candidate: &Candidate) -> String {
    format!(
        r#"<div style="padding:5px;font-size:12px;">{}</div>"#,
        escape_html(&candidate.name)
    )
}

fn venue_html(candidate: &Candidate) -> String {
    let distance = candidate
        .distance_meters
        .map(|d| format!(r#"<div style="margin-top:5px;">거리: {}m</div>"#, d.round()))
        .unwrap_or_default();
    format!(
        concat!(
            r#"<div style="padding:5px;font-size:12px;width:200px;">"#,
            r#"<div style="font-weight:bold;margin-bottom:5px;">{}</div>"#,
            r#"<div style="font-size:11px;color:#666;"><div>{}</div><div>{}</div><div>{}</div>{}</div>"#,
            "</div>"
        ),
        escape_html(&candidate.name),
        escape_html(&candidate.address),
        escape_html(&candidate.category),
        escape_html(&candidate.phone),
        distance,
    )
}

fn route_info_html(destination: &Candidate, mode: TravelMode, route: &RouteResult, origin: Coordinate) -> String {
    let label = match mode {
        TravelMode::Walking => "도보",
        TravelMode::Driving => "차량",
    };
    let summary = if route.is_fallback {
        let distance = distance_meters(origin, destination.coordinate);
        let eta = estimate_travel_time(distance);
        format!("{} 약 {}분 (직선 {:.1}km)", label, eta.for_mode(mode), distance / 1000.0)
    } else {
        format!(
            "{} {}분 ({:.1}km)",
            label,
            route.duration_minutes(),
            route.distance_meters / 1000.0
        )
    };
    format!(
        r#"<div style="padding:5px;font-size:12px;"><div style="font-weight:bold;">{}</div><div>{}</div></div>"#,
        escape_html(&destination.name),
        summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{geolocation::LocationState, map::SceneMap};

    const ORIGIN: Coordinate = Coordinate::new(37.5665, 126.9780);

    fn candidate(name: &str, lat: f64) -> Candidate {
        Candidate {
            id: None,
            name: name.to_string(),
            address: "서울 중구".to_string(),
            coordinate: Coordinate::new(lat, 126.99),
            category: "음식점".to_string(),
            phone: "02-000-0000".to_string(),
            distance_meters: Some(812.4),
            source_url: None,
        }
    }

    fn session() -> MapSession<SceneMap> {
        MapSession::new(
            SceneMap::default(),
            LocationWatch::settled_with(LocationState::Available { coordinate: ORIGIN }),
            None,
        )
    }

    fn pick(c: Candidate) -> SavedPick {
        SavedPick {
            distance_meters: 1000.0,
            travel_time: estimate_travel_time(1000.0),
            candidate: c,
        }
    }

    #[test]
    fn test_only_latest_ticket_renders() {
        let mut session = session();
        let first = session.begin_action();
        let second = session.begin_action();

        assert!(!session.apply_saved_pick(first, ORIGIN, pick(candidate("old", 37.57))));
        assert!(session.map().snapshot().markers.is_empty());

        assert!(session.apply_saved_pick(second, ORIGIN, pick(candidate("new", 37.58))));
        let snapshot = session.map().snapshot();
        assert_eq!(snapshot.markers.len(), 2);
        assert_eq!(snapshot.markers[0].title, "new");
        assert!(snapshot.markers[0].info_window.as_deref().unwrap().contains("new"));
        assert_eq!(snapshot.center, Coordinate::new(37.58, 126.99));
    }

    #[test]
    fn test_nearby_renders_one_marker_per_candidate_plus_origin() {
        let mut session = session();
        let ticket = session.begin_action();
        let nearby = vec![candidate("a", 37.57), candidate("b", 37.58), candidate("<c>", 37.59)];
        assert!(session.apply_nearby(ticket, ORIGIN, nearby));

        let snapshot = session.map().snapshot();
        assert_eq!(snapshot.markers.len(), 4);
        assert_eq!(snapshot.markers[3].title, ORIGIN_TITLE);
        assert!(snapshot.markers.iter().all(|m| m.info_window.is_none()));
        assert!(snapshot.bounds.is_some());
        assert_eq!(session.displayed().len(), 3);

        session.marker_clicked(2);
        let html = session.map().snapshot().markers[2].info_window.clone().unwrap();
        assert!(html.contains("&lt;c&gt;"));
        assert!(html.contains("거리: 812m"));
    }

    #[test]
    fn test_entering_mode_clears_previous_results() {
        let mut session = session();
        let ticket = session.begin_action();
        session.apply_nearby(ticket, ORIGIN, vec![candidate("a", 37.57)]);

        session.enter_mode(RecommendationMode::FromSavedList);
        assert_eq!(session.state().mode, RecommendationMode::FromSavedList);
        assert!(session.state().nearby.is_empty());
        assert!(session.map().snapshot().markers.is_empty());
    }

    #[test]
    fn test_route_draws_overlay_and_opens_destination() {
        let mut session = session();
        let ticket = session.begin_action();
        session.apply_saved_pick(ticket, ORIGIN, pick(candidate("dest", 37.58)));

        let destination = Coordinate::new(37.58, 126.99);
        let ticket = session.begin_action();
        let route = RouteResult::fallback(ORIGIN, destination);
        assert!(session.apply_route(ticket, ORIGIN, 0, TravelMode::Walking, route));

        let snapshot = session.map().snapshot();
        assert_eq!(snapshot.overlays.len(), 1);
        assert_eq!(snapshot.overlays[0].path, vec![ORIGIN, destination]);
        let info = snapshot.markers[0].info_window.as_deref().unwrap();
        assert!(info.contains("도보 약"));
        assert!(session.last_route().unwrap().is_fallback);
    }

    #[test]
    fn test_focus_rejects_the_origin_marker() {
        let mut session = session();
        let ticket = session.begin_action();
        session.apply_nearby(ticket, ORIGIN, vec![candidate("a", 37.57), candidate("b", 37.58)]);

        // Index 2 is the origin marker
        assert!(!session.focus_candidate(2));
        assert!(session.map().snapshot().markers.iter().all(|m| m.info_window.is_none()));

        assert!(session.focus_candidate(1));
        let snapshot = session.map().snapshot();
        assert!(snapshot.markers[1].info_window.is_some());
        assert!(snapshot.markers[2].info_window.is_none());
    }

    #[test]
    fn test_idle_measured_from_last_touch() {
        let mut session = session();
        let idle = Duration::from_secs(60);
        let now = Instant::now();
        assert!(!session.is_idle(idle, now));
        assert!(session.is_idle(idle, now + idle));

        std::thread::sleep(Duration::from_millis(5));
        session.touch();
        assert!(!session.is_idle(idle, now + idle));
    }

    #[test]
    fn test_teardown_invalidates_outstanding_tickets() {
        let mut session = session();
        let ticket = session.begin_action();
        assert!(session.teardown());
        assert!(!session.teardown());
        assert!(!session.apply_nearby(ticket, ORIGIN, vec![candidate("late", 37.57)]));
        assert!(session.map().snapshot().markers.is_empty());
    }
}
