// Toxicity scoring: trait-based abstraction for swappable providers.
//
// ToxicityProvider is the interface. OpenAI moderation and Google
// Perspective implement it over HTTP; MockProvider implements it offline.
// The registry maps configured names to constructors so the decision
// service can build whichever providers the configuration lists.

pub mod mock;
pub mod openai;
pub mod perspective;
pub mod rate_limiter;
pub mod registry;
pub mod traits;

pub use registry::ProviderRegistry;
pub use traits::{AnalyzeOptions, ToxicityOutcome, ToxicityProvider};
