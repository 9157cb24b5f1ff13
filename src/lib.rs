// toxfilter: language-aware toxicity filtering
//
// This is the library root. The decision service (service.rs) orchestrates
// the other modules: providers score text, the cache remembers scores, the
// language detector picks thresholds, and the policy turns a score into an
// action. Persistence and configuration loading are collaborators that the
// binary wires in.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod language;
pub mod output;
pub mod policy;
pub mod service;
pub mod toxicity;

pub use error::{FilterError, Result};
pub use service::{Decision, ToxicityFilter};
