use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client as HttpClient;
use serde::Serialize;

use super::{Notification, Notifier, NotifyError};

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

const CATEGORIES: [&str; 2] = ["ethc-miner", "notify_admins"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub email: String,
    pub name: String,
}

impl EmailAddress {
    pub fn new(email: &str) -> Self {
        Self { email: email.to_string(), name: email.to_string() }
    }
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

/// SendGrid v3 `mail/send` request body.
#[derive(Debug, Serialize)]
pub struct Mail {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
}

impl Mail {
    /// One personalization per recipient, each carrying the shared cc/bcc lists.
    pub fn new(
        sender: EmailAddress,
        recipients: &[EmailAddress],
        subject: &str,
        body_text: &str,
        body_html: &str,
    ) -> Self {
        Self {
            personalizations: recipients
                .iter()
                .map(|r| Personalization { to: vec![r.clone()], cc: vec![], bcc: vec![] })
                .collect(),
            from: sender,
            subject: subject.to_string(),
            content: vec![
                Content { kind: "text/plain", value: body_text.to_string() },
                Content { kind: "text/html", value: body_html.to_string() },
            ],
            categories: vec![],
        }
    }

    pub fn with_copies(mut self, cc: &[EmailAddress], bcc: &[EmailAddress]) -> Self {
        for p in self.personalizations.iter_mut() {
            p.cc = cc.to_vec();
            p.bcc = bcc.to_vec();
        }
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Emails operators through SendGrid. Sender and recipient are both the admin address.
#[derive(Clone)]
pub struct EmailNotifier {
    http: HttpClient,
    api_url: String,
    api_key: String,
    admin: EmailAddress,
    dev: bool,
}

impl EmailNotifier {
    pub fn new(api_key: &str, admin_email: &str, dev: bool) -> Self {
        Self {
            http: HttpClient::new(),
            api_url: SENDGRID_API_URL.to_string(),
            api_key: api_key.to_string(),
            admin: EmailAddress::new(admin_email),
            dev,
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    /// Mail addressed to the admins, subject prefixed with `DEV: ` on development hosts.
    pub fn admin_mail(&self, notification: &Notification) -> Mail {
        let subject = notification.subject_line();
        let subject = if self.dev { format!("DEV: {}", subject) } else { subject };

        Mail::new(
            self.admin.clone(),
            &[self.admin.clone()],
            &subject,
            &notification.text,
            &notification.text,
        )
        .with_categories(&CATEGORIES)
    }

    pub async fn send(&self, mail: &Mail) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(mail)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { channel: "email", status: status.as_u16(), body });
        }

        debug!("SendGrid accepted mail with status {}", status);
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mail = self.admin_mail(notification);
        self.send(&mail).await?;
        info!("Emailed admins: {}", mail.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_mail_shape() {
        let notifier = EmailNotifier::new("key", "ops@example.com", false);
        let mail = notifier.admin_mail(&Notification::new("Won round 12"));
        let json = serde_json::to_value(&mail).unwrap();

        assert_eq!(json["subject"], "Won round 12");
        assert_eq!(json["from"]["email"], "ops@example.com");
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "ops@example.com");
        assert!(json["personalizations"][0].get("cc").is_none());
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][1]["type"], "text/html");
        assert_eq!(json["categories"][1], "notify_admins");
    }

    #[test]
    fn test_dev_subject_prefix() {
        let notifier = EmailNotifier::new("key", "ops@example.com", true);
        let mail = notifier.admin_mail(&Notification::new("body").with_subject("Test Subject"));
        assert_eq!(mail.subject, "DEV: Test Subject");
    }

    #[test]
    fn test_copies_apply_to_every_recipient() {
        let a = EmailAddress::new("a@example.com");
        let b = EmailAddress::new("b@example.com");
        let mail = Mail::new(a.clone(), &[a.clone(), b.clone()], "s", "t", "h")
            .with_copies(&[b.clone()], &[]);
        let json = serde_json::to_value(&mail).unwrap();

        assert_eq!(json["personalizations"].as_array().unwrap().len(), 2);
        assert_eq!(json["personalizations"][1]["cc"][0]["email"], "b@example.com");
    }
}
