use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::VoiceProvider;

pub struct VapiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl VapiProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VoiceProvider for VapiProvider {
    async fn register_prompt(
        &self,
        business_phone: &str,
        system_prompt: &str,
    ) -> anyhow::Result<()> {
        let body = json!({
            "phoneNumber": business_phone,
            "assistant": {
                "model": {
                    "provider": "openai",
                    "model": "gpt-4o-mini",
                    "temperature": 0.5,
                    "systemPrompt": system_prompt,
                },
                "transcriber": {
                    "provider": "deepgram",
                    "model": "nova-2",
                    "language": "en-US",
                },
            },
        });

        let resp = self
            .client
            .post(format!("{}/assistant", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call voice vendor API")?;

        let status = resp.status();
        if !status.is_success() {
            let detail: serde_json::Value = resp.json().await.unwrap_or_default();
            anyhow::bail!("voice vendor API error ({status}): {detail}");
        }

        Ok(())
    }
}
