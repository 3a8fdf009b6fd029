//! weeklab: a timed weekly-test session engine.
//!
//! The engine drives one student's test attempt end to end: picking a
//! subject and week, fetching the active schedule and its questions,
//! answering under a countdown, and submitting exactly once. Attempts
//! survive restarts through an on-disk snapshot, duplicate submissions
//! resolve to the previously stored result, and finished attempts feed a
//! points/rank/achievement layer.
//!
//! [`engine::TestSession`] is the entry point; the backend is abstracted
//! behind [`api::TestApi`], with [`api::http::HttpApi`] as the HTTP
//! implementation.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;
