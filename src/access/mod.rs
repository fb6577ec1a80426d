//! Access resolution — the single decision point between session, profile,
//! preview, and the surface a user may see.

pub mod gate;
pub mod hub;
pub mod resolver;
pub mod routes;

pub use gate::{Gate, RouteFamily, allowed_routes, gate};
pub use hub::{AccessEvent, AccessHub, Resolution};
pub use resolver::{Surface, resolve};
pub use routes::access_routes;
