pub mod actor;
pub mod state;

pub use actor::{ScreeningSession, SessionCommand, SessionHandle, SessionSnapshot};
pub use state::ScreeningState;
