mod handlers;
mod routes;
mod state;

pub use handlers::{CreateSessionRequest, NearbyRequest, RouteRequest, SessionResponse};
pub use routes::create_router;
pub use state::{AppState, InitialLocation, Providers, SharedSession};
