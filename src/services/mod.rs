pub mod candidate_search;
pub mod coordinator;
pub mod distance;
pub mod geolocation;
pub mod map;
pub mod providers;
pub mod recommendation;
pub mod routing;
pub mod sdk_loader;
pub mod session;

pub use candidate_search::CandidateSearchService;
pub use coordinator::{Coordinator, RouteOutcome};
pub use recommendation::{NearbyQuery, RecommendationSelector};
pub use routing::RouteResolver;
pub use session::MapSession;
