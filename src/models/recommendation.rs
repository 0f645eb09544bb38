use serde::Serialize;

use super::{Candidate, TravelTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    None,
    FromSavedList,
    FromLocation,
}

/// What the user is currently being shown
///
/// Replaced wholesale on every recommendation request; the constructors are the
/// only way to build a populated state, so a mode never carries data derived by
/// the other mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationState {
    pub mode: RecommendationMode,
    pub selected: Option<Candidate>,
    pub travel_time: Option<TravelTime>,
    pub nearby: Vec<Candidate>,
}

impl Default for RecommendationState {
    fn default() -> Self {
        Self::empty(RecommendationMode::None)
    }
}

impl RecommendationState {
    /// State right after entering `mode`, before any result has arrived
    pub fn empty(mode: RecommendationMode) -> Self {
        Self {
            mode,
            selected: None,
            travel_time: None,
            nearby: Vec::new(),
        }
    }

    pub fn from_saved(selected: Candidate, travel_time: TravelTime) -> Self {
        Self {
            mode: RecommendationMode::FromSavedList,
            selected: Some(selected),
            travel_time: Some(travel_time),
            nearby: Vec::new(),
        }
    }

    pub fn from_location(nearby: Vec<Candidate>) -> Self {
        Self {
            mode: RecommendationMode::FromLocation,
            selected: None,
            travel_time: None,
            nearby,
        }
    }

    /// Route destination: the saved pick, or the `index`-th nearby candidate
    pub fn destination(&self, index: Option<usize>) -> Option<&Candidate> {
        match (self.mode, index) {
            (RecommendationMode::FromLocation, Some(i)) => self.nearby.get(i),
            (RecommendationMode::FromLocation, None) => None,
            _ => self.selected.as_ref(),
        }
    }
}
