//! Client core for the rover minefield service: REST access, live rover sessions and
//! the rendered dashboard they keep consistent.

pub mod actions;
pub mod api;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod error;
pub mod pin;
pub mod render;
pub mod session;
pub mod sync;
pub mod transport;

pub use actions::{ActionDispatcher, SimulationReport};
pub use api::{HttpRoverApi, RoverApi};
pub use config::{load_settings, Settings};
pub use console::{RoverConsole, UserAction};
pub use dashboard::{Affordances, Dashboard, SharedDashboard, ViewChange};
pub use error::{ClientError, SessionError};
pub use session::{CommandSession, ConnectionState, SessionPhase};
pub use sync::{RefreshSet, StateSyncClient};
pub use transport::{LinkSignal, LiveLink, SessionConnector, WsConnector};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
