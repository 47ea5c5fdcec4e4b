use super::*;

/// Bounded retry budget for malformed completions. Retries are immediate;
/// exhausting the budget is fatal.
pub const MAX_PARSE_ATTEMPTS: usize = 20;

/// One completion call's result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

/// Explicit chat-completion session. Everything an operation needs — the
/// HTTP client, endpoint, model, default temperature — travels in this
/// object instead of ambient globals, so retry and failure paths can be
/// exercised in isolation.
pub struct ChatSession {
    client: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
    pub temperature: f32,
}

impl ChatSession {
    pub fn from_env(api_base: &str, model: &str, temperature: f32) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is not set in the environment")?;

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            temperature,
        })
    }

    pub fn complete(&self, prompt: &str) -> Result<Completion> {
        self.complete_with_temperature(prompt, self.temperature)
    }

    pub fn complete_with_temperature(&self, prompt: &str, temperature: f32) -> Result<Completion> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": prompt}
                ],
                "max_tokens": 1000,
                "temperature": temperature,
                "frequency_penalty": 0.0
            }))
            .send()
            .context("chat completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            bail!("chat completion failed with {status}: {body}");
        }

        let value: serde_json::Value = response
            .json()
            .context("chat completion returned unparseable json")?;
        let text = value["choices"][0]["message"]["content"]
            .as_str()
            .context("chat completion has no message content")?
            .trim()
            .to_string();
        let tokens_used = value["usage"]["total_tokens"].as_u64().unwrap_or(0);

        Ok(Completion { text, tokens_used })
    }

    /// Repeats prompt-and-parse until the reply parses, up to
    /// [`MAX_PARSE_ATTEMPTS`]. The prompt builder sees the attempt number
    /// so it can append a format reminder from the second attempt on.
    /// Transport failures count as failed attempts too.
    pub fn complete_parsed<T>(
        &self,
        temperature: f32,
        build_prompt: impl Fn(usize) -> String,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<T> {
        for attempt in 0..MAX_PARSE_ATTEMPTS {
            let prompt = build_prompt(attempt);
            let reply = match self.complete_with_temperature(&prompt, temperature) {
                Ok(completion) => completion.text,
                Err(err) => {
                    warn!(attempt = attempt + 1, error = %err, "completion failed; retrying");
                    continue;
                }
            };

            match parse(&reply) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt = attempt + 1, error = %err, "reply did not parse; retrying");
                }
            }
        }

        bail!("no parseable completion after {MAX_PARSE_ATTEMPTS} attempts")
    }
}
