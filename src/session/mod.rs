//! Session orchestration: the state machine that sequences movement,
//! rotation, capture and analysis, plus its shared state, timers, typed
//! errors and record persistence.

pub mod error;
mod orchestrator;
pub mod record;
pub mod shared;
pub mod state;
pub mod timer;
pub mod timing;

pub use error::{RecordError, SessionError};
pub use orchestrator::Orchestrator;
pub use shared::SharedState;
pub use state::SessionPhase;
pub use timing::Timing;
