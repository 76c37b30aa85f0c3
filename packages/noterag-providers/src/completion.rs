use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Runs a single chat completion and returns the assistant message text.
pub async fn complete(cfg: &noterag_config::LlmProviderConfig, prompt: &str) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"messages": [
			{ "role": "user", "content": prompt }
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_response(json)
}

fn parse_completion_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Completion response is missing message content."))?;

	Ok(content.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_message_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "The answer is in your notes." } }
			]
		});
		let parsed = parse_completion_response(json).expect("parse failed");

		assert_eq!(parsed, "The answer is in your notes.");
	}

	#[test]
	fn rejects_missing_choices() {
		let json = serde_json::json!({ "error": { "message": "rate limited" } });

		assert!(parse_completion_response(json).is_err());
	}
}
