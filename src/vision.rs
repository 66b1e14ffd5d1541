use crate::circuit_breaker::{create_vision_circuit_breaker, VisionCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;
use crate::invoice::Invoice;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use failsafe::futures::CircuitBreaker;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Extraction prompt sent with every bill. Pins the model to the exact
/// record shape the engine and the report renderer consume; loose numeric
/// fields stay raw strings here and are coerced downstream.
const EXTRACTION_PROMPT: &str = r#"Extract data into JSON.

CRITICAL LAYOUT RULES:
1. **PERSONAL MODE**:
   - If the image is a list, note, or prompt like "Mr Mehta..." -> set "layout": "personal".
   - In personal mode, DO NOT extract taxes.
2. **BUSINESS MODE**:
   - Only use this if "GSTIN" or "Tax Invoice" is present.

CRITICAL EXTRACTION RULES:
1. **CONTACT INFO**:
   - Look for **phone numbers** (10 digits) and **emails**.
   - Extract to 'phone' and 'email' fields.
2. **MATH & DISCOUNTS**:
   - **Item discount**: look for "Disc%" or "Discount". Extract % to 'discount_percent'.
   - **Service goodwill adjustment**: treat as a negative rate.
3. **TAX SUMMARY**:
   - Extract the TAX RATE (e.g. "18%") into 'tax_summary'.

Use null for anything unreadable. Return ONLY the JSON object.

JSON STRUCTURE:
{
  "layout": "business" or "personal",
  "header": {
     "company_name": null, "company_subtext": null, "gstin": null, "msme_no": null,
     "buyer_name": null, "buyer_address": null,
     "date": null, "invoice_no": null, "customer_id": null,
     "challan_no": null, "challan_date": null, "eway_bill_no": null,
     "transport_id": null, "transport_phone": null,
     "bank_details": { "bank_name": null, "acc_no": null, "ifsc": null }
  },
  "items": [
    {
       "sn": "1", "particulars": null, "phone": null, "email": null, "hsn_sac": null,
       "quantity": null, "rate": null, "per": null, "discount_percent": null,
       "amount": null, "tax_rate": null
    }
  ],
  "footer": { "tax_summary": null, "total_amount": null, "amount_in_words": null }
}"#;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for the vision-capable chat-completions upstream.
#[derive(Clone)]
pub struct VisionService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    breaker: VisionCircuitBreaker,
}

impl VisionService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.vision_base_url.clone(),
            api_key: config.vision_api_key.clone(),
            model: config.vision_model.clone(),
            timeout: Duration::from_secs(config.vision_timeout_secs),
            breaker: create_vision_circuit_breaker(),
        }
    }

    /// Runs one extraction call and returns the cleaned JSON payload,
    /// ready for [`parse_extraction`] (and for caching as-is).
    ///
    /// `image` is the uploaded photo; `instruction` is free text from the
    /// user ("this is a grocery bill", "ignore the handwritten part").
    /// Either may be absent, but the caller guarantees at least one.
    pub async fn extract_raw(
        &self,
        image: Option<&[u8]>,
        instruction: &str,
    ) -> Result<String, AppError> {
        let prompt = format!(
            "{}\n\nUSER INSTRUCTION: \"{}\"",
            EXTRACTION_PROMPT, instruction
        );

        let mut content_parts = vec![json!({"type": "text", "text": prompt})];
        if let Some(bytes) = image {
            let encoded = BASE64.encode(bytes);
            content_parts.push(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:image/jpeg;base64,{}", encoded)}
            }));
        }

        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": content_parts}],
            "temperature": 0.0,
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::info!(
            "Calling vision model '{}' (image: {}, instruction: {} chars)",
            self.model,
            image.is_some(),
            instruction.len()
        );

        let response = self
            .breaker
            .call(async {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .timeout(self.timeout)
                    .json(&payload)
                    .send()
                    .await
            })
            .await
            .map_err(|err| match err {
                failsafe::Error::Inner(e) => {
                    AppError::VisionApi(format!("vision request failed: {}", e))
                }
                failsafe::Error::Rejected => {
                    AppError::VisionApi("vision upstream circuit open, failing fast".to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::VisionApi(format!(
                "vision API returned status {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AppError::VisionApi(format!("failed to parse chat completion envelope: {}", e))
        })?;

        let reply = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AppError::ExtractionFailed("empty reply from model".to_string()))?;

        clean_model_reply(reply)
    }

    /// Full extraction: model call plus record parsing.
    pub async fn extract_invoice(
        &self,
        image: Option<&[u8]>,
        instruction: &str,
    ) -> Result<Invoice, AppError> {
        let payload = self.extract_raw(image, instruction).await?;
        parse_extraction(&payload)
    }
}

/// Parses a cleaned extraction payload into an [`Invoice`].
pub fn parse_extraction(payload: &str) -> Result<Invoice, AppError> {
    serde_json::from_str(payload).map_err(|e| {
        AppError::ExtractionFailed(format!("model reply was not a valid invoice record: {}", e))
    })
}

/// Strips the usual model-reply noise down to one parseable JSON object:
/// markdown fences, chatter before/after the object, and every ASCII
/// control character. Newlines included: models leave them unescaped
/// inside quoted values, where strict JSON parsing rejects them, and
/// between tokens they are never required.
fn clean_model_reply(raw: &str) -> Result<String, AppError> {
    let defenced = raw.replace("```json", "").replace("```", "");

    let start = defenced.find('{').ok_or_else(|| {
        AppError::ExtractionFailed("model returned text but no JSON structure".to_string())
    })?;
    let end = defenced.rfind('}').ok_or_else(|| {
        AppError::ExtractionFailed("model returned an unterminated JSON structure".to_string())
    })?;
    if end < start {
        return Err(AppError::ExtractionFailed(
            "model returned a malformed JSON structure".to_string(),
        ));
    }

    let control_chars = Regex::new(r"[\x00-\x1f\x7f]").unwrap();
    Ok(control_chars
        .replace_all(&defenced[start..=end], "")
        .into_owned())
}
