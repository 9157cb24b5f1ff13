// Provider registry: provider name to constructor.
//
// Adding a provider means registering a constructor here (or on a registry
// handed to the service). The service never matches on provider names.

use std::collections::HashMap;

use super::mock::MockProvider;
use super::openai::OpenAiProvider;
use super::perspective::PerspectiveProvider;
use super::traits::ToxicityProvider;
use crate::config::ProviderConfig;
use crate::error::Result;

pub type ProviderConstructor = fn(&ProviderConfig) -> Result<Box<dyn ToxicityProvider>>;

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// A registry with no providers at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// OpenAI moderation, Perspective, and the offline keyword mock.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("openai", build_openai);
        registry.register("perspective", build_perspective);
        registry.register("mock", build_mock);
        registry
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register(&mut self, name: &str, constructor: ProviderConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Build the provider registered under `name`.
    /// Returns `None` when nothing is registered for that name.
    pub fn build(&self, name: &str, config: &ProviderConfig) -> Option<Result<Box<dyn ToxicityProvider>>> {
        self.constructors.get(name).map(|construct| construct(config))
    }
}

fn build_openai(config: &ProviderConfig) -> Result<Box<dyn ToxicityProvider>> {
    Ok(Box::new(OpenAiProvider::new(config)?))
}

fn build_perspective(config: &ProviderConfig) -> Result<Box<dyn ToxicityProvider>> {
    Ok(Box::new(PerspectiveProvider::new(config)?))
}

fn build_mock(_config: &ProviderConfig) -> Result<Box<dyn ToxicityProvider>> {
    Ok(Box::new(MockProvider::new()))
}
