//! quizforge-core: Session state machine, answer checking and scoring.
//!
//! This crate defines the question and session data model, the validator and
//! scorer for submitted answers, the timed test-session state machine, the
//! answer persistence facade, and the collaborator traits for storage and
//! question banks that the rest of quizforge builds on.

pub mod assembly;
pub mod bank;
pub mod error;
pub mod memory;
pub mod model;
pub mod parser;
pub mod persistence;
pub mod scorer;
pub mod session;
pub mod statistics;
pub mod timing;
pub mod traits;
pub mod validator;
