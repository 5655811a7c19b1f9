use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{
    SourceLang,
    TranslationProvider,
};
use crate::core::VocabotError;

pub const MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";
pub const TARGET_LANG: &str = "hy";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    response_data: Option<ResponseData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    translated_text: Option<String>,
}

/// MyMemory translation API client. Free-tier requests carry an optional
/// contact email in the `de` parameter for a higher quota.
pub struct MyMemoryProvider {
    client: Client,
    endpoint: String,
    contact_email: Option<String>,
}

impl MyMemoryProvider {
    pub fn new(contact_email: Option<String>) -> Result<Self, VocabotError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VocabotError::Custom(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client, endpoint: MYMEMORY_URL.to_string(), contact_email })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl TranslationProvider for MyMemoryProvider {
    async fn fetch(&self, source: SourceLang, text: &str) -> Result<String, VocabotError> {
        let langpair = format!("{}|{}", source.code(), TARGET_LANG);
        let mut query: Vec<(&str, &str)> = vec![("q", text), ("langpair", &langpair)];
        if let Some(email) = &self.contact_email {
            query.push(("de", email));
        }

        let response = self.client.get(&self.endpoint).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(VocabotError::Translation(format!(
                "HTTP {} from translation provider",
                response.status()
            )));
        }

        let body: TranslateResponse = response.json().await?;
        Ok(body.response_data.and_then(|data| data.translated_text).unwrap_or_default())
    }
}
