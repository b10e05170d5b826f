pub mod error;
pub mod gate;
pub mod middleware;
pub mod policy;

pub use error::{Denial, PolicyError};
pub use gate::{authorize, GateDecision, RoleGate};
pub use middleware::{enforce, GateLayerState};
pub use policy::RoutePolicy;
