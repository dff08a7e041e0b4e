//! PawMeet's time-driven jobs engine: advances meetings through their status
//! lifecycle and drives scheduled-reminder and re-engagement email campaigns.
//! Entry points are invoked on a cadence by an external scheduler; every run
//! takes its `now` from the caller and re-reads current store state, so
//! overlapping runs are safe and retries fall out of re-scanning.

pub mod advance;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod handlers;
pub mod mailer;
pub mod model;
pub mod reengage;
