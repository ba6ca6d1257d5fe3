pub mod host;
pub mod routes;

pub use host::ControlHost;
pub use routes::{get_router, ControlState};
