#![forbid(unsafe_code)]

pub mod model;
pub mod pool;
pub mod scoring;
pub mod session;
pub mod time;

pub use session::{QuizSession, SessionError, SessionEvent, SessionState};
pub use time::Clock;
