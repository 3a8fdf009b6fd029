pub mod countdown;
pub mod rewards;
pub mod session;
pub mod submit;

pub use countdown::{Countdown, CountdownSignal};
pub use session::{Discard, FilterChange, Resumption, SessionOutcome, TestSession, WeekOption};
