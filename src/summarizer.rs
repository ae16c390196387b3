use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const TOKEN_TIMEOUT: Duration = Duration::from_secs(5);
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_MODEL: &str = "GigaChat";

const PROMPT_TEMPLATE: &str = "\
You are an experienced games journalist. You receive a link to an article \
and turn it into a short, publish-ready post for a gaming news channel.

If the page is unreachable or the material is too thin, say so honestly in \
the post body instead of inventing details.

Format:

Source: {url}

Headline: up to ten words, clear and punchy

Body: five to ten sentences retelling the story plainly. Name what \
happened, who is involved, why it matters, and how the community reacted. \
No clickbait, no filler words like 'analysis' or 'input data'.

Tags: #game #studio #platform #news
";

/// Turns an article URL into publish-ready copy. The surface is
/// infallible: implementations degrade to placeholder text rather than
/// raising out of the happy path.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, url: &str) -> String;
}

/// Failure taxonomy internal to the client; the public surface degrades
/// every variant to a placeholder.
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("completion request timed out")]
    Timeout,

    #[error("upstream error: {0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for the LLM proxy: one call to obtain a bearer credential, one
/// call to the completion endpoint.
pub struct ProxySummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl ProxySummarizer {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Obtains a short-lived bearer token. Failure here is fatal to the
    /// current call; there is no retry inside this layer.
    async fn request_token(&self) -> Result<String, SummarizerError> {
        debug!("requesting access token from summarizer proxy");

        let response = self
            .client
            .post(format!("{}/oauth/", self.base_url))
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .map_err(|e| SummarizerError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizerError::Auth(format!("HTTP {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::Auth(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(SummarizerError::Auth(
                "proxy did not return an access_token".to_string(),
            ));
        }

        Ok(body.access_token)
    }

    async fn request_completion(&self, token: &str, url: &str) -> Result<String, SummarizerError> {
        let prompt = PROMPT_TEMPLATE.replace("{url}", url);
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            stream: false,
        };

        debug!(
            "sending completion request: {}",
            serde_json::to_string(&payload).unwrap_or_default()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(token)
            .json(&payload)
            .timeout(COMPLETION_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizerError::Timeout
                } else {
                    SummarizerError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizerError::Upstream(format!("HTTP {}", status)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::Upstream(e.to_string()))?;

        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SummarizerError::Upstream("response carried no choices".to_string()))?;

        Ok(reply)
    }
}

#[async_trait]
impl Summarize for ProxySummarizer {
    async fn summarize(&self, url: &str) -> String {
        let token = match self.request_token().await {
            Ok(token) => token,
            Err(err) => {
                error!("token request failed for {}: {}", url, err);
                return error_placeholder(url);
            }
        };

        match self.request_completion(&token, url).await {
            Ok(reply) => {
                info!("received {} chars of generated copy for {}", reply.len(), url);
                reply
            }
            Err(SummarizerError::Timeout) => {
                error!("summarizer timed out for {}", url);
                timeout_placeholder(url)
            }
            Err(err) => {
                error!("summarizer failed for {}: {}", url, err);
                error_placeholder(url)
            }
        }
    }
}

/// Degraded copy for a completion timeout, still naming the source.
pub fn timeout_placeholder(url: &str) -> String {
    format!("The summarization service did not answer in time. Source: {url}")
}

/// Degraded copy for any other upstream failure.
pub fn error_placeholder(url: &str) -> String {
    format!("Could not generate a summary for this story.\n{url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_name_the_failed_url() {
        let url = "https://example.com/story";
        assert!(timeout_placeholder(url).contains(url));
        assert!(error_placeholder(url).contains(url));
    }

    #[test]
    fn prompt_embeds_the_article_url() {
        let prompt = PROMPT_TEMPLATE.replace("{url}", "https://example.com/a");
        assert!(prompt.contains("https://example.com/a"));
        assert!(!prompt.contains("{url}"));
    }
}
