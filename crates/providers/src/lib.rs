//! Reasoning-engine client implementations.
//!
//! One implementation covers the vast majority of backends: anything that
//! speaks the OpenAI `/v1/chat/completions` protocol with tool calling.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use deepclaw_config::AppConfig;
use deepclaw_core::ProviderError;
use std::sync::Arc;

/// Build the configured provider from application config.
pub fn build_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn deepclaw_core::Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured("no API key set — export DEEPCLAW_API_KEY".into())
    })?;
    Ok(Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.base_url,
        api_key,
    )))
}
