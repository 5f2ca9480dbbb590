//! Session, attempt and learner records

mod types;

pub use types::{Attempt, Learner, QuizSession, SessionStatus, XpLogEntry};
