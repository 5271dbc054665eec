use std::sync::Arc;

use crate::config::{AiConfig, AiProvider};
use crate::secrets::resolve_api_key;

use super::{AnthropicGenerator, GenerationError, Generator, OpenAiGenerator, RequestSettings};

/// Builds the single backend selected by `ai.provider`.
pub fn build_generator(ai: &AiConfig) -> Result<Arc<dyn Generator>, GenerationError> {
    let api_key = resolve_api_key(ai).map_err(|e| {
        GenerationError::ProviderConfig(format!("{} API key unavailable: {}", ai.provider, e))
    })?;
    let settings = RequestSettings::from_config(ai);

    let generator: Arc<dyn Generator> = match ai.provider {
        AiProvider::Claude => Arc::new(AnthropicGenerator::new(api_key, settings)?),
        AiProvider::OpenAi => Arc::new(OpenAiGenerator::new(api_key, settings)?),
    };

    tracing::info!(
        provider = generator.name(),
        model = generator.model(),
        "generation backend selected"
    );
    Ok(generator)
}
