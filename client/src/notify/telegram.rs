use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Notification, Notifier, NotifyError};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "Markdown")]
    Markdown,
}

/// Media can be sent either by public URL or by a Telegram `file_id`; both travel in the same
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramContent {
    Text(String),
    Photo { media: String, caption: Option<String> },
    Document { media: String, caption: Option<String> },
    Sticker(String),
}

impl TelegramContent {
    pub fn method(&self) -> &'static str {
        match self {
            TelegramContent::Text(_) => "sendMessage",
            TelegramContent::Photo { .. } => "sendPhoto",
            TelegramContent::Document { .. } => "sendDocument",
            TelegramContent::Sticker(_) => "sendSticker",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts to a single admin chat through the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: HttpClient,
    api_url: String,
    bot_token: String,
    chat_id: String,
    parse_mode: Option<ParseMode>,
    dev: bool,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, dev: bool) -> Self {
        Self {
            http: HttpClient::new(),
            api_url: TELEGRAM_API_URL.to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            parse_mode: None,
            dev,
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }

    pub fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }

    fn dev_prefix(&self, text: &str) -> String {
        if !self.dev {
            return text.to_string();
        }
        match self.parse_mode {
            Some(ParseMode::Html) => format!("<b>DEV</b>: {}", text),
            _ => format!("DEV: {}", text),
        }
    }

    /// Request body for `content`.
    pub fn payload(&self, content: &TelegramContent) -> Value {
        let mut body = match content {
            TelegramContent::Text(text) => json!({
                "chat_id": self.chat_id,
                "text": self.dev_prefix(text),
                "disable_web_page_preview": true,
            }),
            TelegramContent::Photo { media, caption } => {
                let mut body = json!({ "chat_id": self.chat_id, "photo": media });
                if let Some(caption) = caption {
                    body["caption"] = json!(self.dev_prefix(caption));
                }
                body
            }
            TelegramContent::Document { media, caption } => {
                let mut body = json!({ "chat_id": self.chat_id, "document": media });
                if let Some(caption) = caption {
                    body["caption"] = json!(self.dev_prefix(caption));
                }
                body
            }
            TelegramContent::Sticker(sticker) => json!({ "chat_id": self.chat_id, "sticker": sticker }),
        };

        let captioned = matches!(
            content,
            TelegramContent::Text(_)
                | TelegramContent::Photo { caption: Some(_), .. }
                | TelegramContent::Document { caption: Some(_), .. }
        );
        if let (Some(mode), true) = (self.parse_mode, captioned) {
            body["parse_mode"] = json!(mode);
        }
        body
    }

    pub async fn send(&self, content: &TelegramContent) -> Result<(), NotifyError> {
        let method = content.method();
        let response = self
            .http
            .post(self.endpoint(method))
            .json(&self.payload(content))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<TelegramResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => {
                debug!("Telegram {} delivered", method);
                Ok(())
            }
            Some(TelegramResponse { description: Some(description), .. }) => Err(NotifyError::Rejected {
                channel: "telegram",
                status: status.as_u16(),
                body: description,
            }),
            _ => Err(NotifyError::Rejected { channel: "telegram", status: status.as_u16(), body }),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let text = if notification.urgent {
            format!("[URGENT] {}", notification.text)
        } else {
            notification.text.clone()
        };
        self.send(&TelegramContent::Text(text)).await?;
        info!("Sent Telegram message to chat {}", self.chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let notifier = TelegramNotifier::new("123:abc", "42", false).with_api_url("http://127.0.0.1:9000/");
        assert_eq!(notifier.endpoint("sendMessage"), "http://127.0.0.1:9000/bot123:abc/sendMessage");
    }

    #[test]
    fn test_message_payload() {
        let notifier = TelegramNotifier::new("t", "42", false);
        let body = notifier.payload(&TelegramContent::Text("Won round 3".to_string()));

        assert_eq!(body["chat_id"], "42");
        assert_eq!(body["text"], "Won round 3");
        assert_eq!(body["disable_web_page_preview"], true);
        assert!(body.get("parse_mode").is_none());
    }

    #[test]
    fn test_dev_prefix_follows_parse_mode() {
        let plain = TelegramNotifier::new("t", "42", true);
        let body = plain.payload(&TelegramContent::Text("hi".to_string()));
        assert_eq!(body["text"], "DEV: hi");

        let html = TelegramNotifier::new("t", "42", true).with_parse_mode(ParseMode::Html);
        let body = html.payload(&TelegramContent::Text("hi".to_string()));
        assert_eq!(body["text"], "<b>DEV</b>: hi");
        assert_eq!(body["parse_mode"], "HTML");
    }

    #[test]
    fn test_media_payloads() {
        let notifier = TelegramNotifier::new("t", "42", false).with_parse_mode(ParseMode::Markdown);

        let photo = TelegramContent::Photo { media: "https://x/p.png".to_string(), caption: Some("chart".to_string()) };
        assert_eq!(photo.method(), "sendPhoto");
        let body = notifier.payload(&photo);
        assert_eq!(body["photo"], "https://x/p.png");
        assert_eq!(body["caption"], "chart");
        assert_eq!(body["parse_mode"], "Markdown");

        let document = TelegramContent::Document { media: "BQACAgIAAx".to_string(), caption: None };
        let body = notifier.payload(&document);
        assert_eq!(body["document"], "BQACAgIAAx");
        assert!(body.get("parse_mode").is_none());

        let sticker = TelegramContent::Sticker("CAACAgIAAx".to_string());
        assert_eq!(sticker.method(), "sendSticker");
        assert_eq!(notifier.payload(&sticker)["sticker"], "CAACAgIAAx");
    }
}
