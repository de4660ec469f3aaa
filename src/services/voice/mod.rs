pub mod vapi;

use async_trait::async_trait;

/// Seam to the voice-AI vendor's configuration API. The only thing this core
/// pushes outbound is the per-business system prompt.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn register_prompt(&self, business_phone: &str, system_prompt: &str)
        -> anyhow::Result<()>;
}
