//! Transactional e-mail: message templates and delivery backends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

use crate::models::{Inquiry, Property, User};
use crate::sanitize::strip_html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// SMTP delivery over STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        smtp_username: Option<&str>,
        smtp_password: Option<&str>,
        from_email: String,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .context("failed to create SMTP STARTTLS transport")?
            .port(smtp_port);

        if let (Some(user), Some(pass)) = (smtp_username, smtp_password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from_email,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .context("invalid from email address")?,
            )
            .to(message
                .to
                .parse()
                .context("invalid recipient email address")?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .context("failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("failed to send email")?;

        Ok(())
    }
}

const LOG_MAILER_HISTORY: usize = 100;

/// Logs messages instead of delivering them and keeps the most recent ones.
pub struct LogMailer {
    sent: Mutex<VecDeque<EmailMessage>>,
    capacity: usize,
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::with_capacity(LOG_MAILER_HISTORY)
    }
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sent: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Retained messages, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "email (not delivered, SMTP disabled)");
        if self.capacity > 0
            && let Ok(mut sent) = self.sent.lock()
        {
            if sent.len() == self.capacity {
                sent.pop_front();
            }
            sent.push_back(message.clone());
        }
        Ok(())
    }
}

/// Builds every outgoing message. User-supplied text is markup-stripped.
#[derive(Debug, Clone)]
pub struct Templates {
    site_name: String,
    site_url: String,
}

impl Templates {
    pub fn new(site_name: impl Into<String>, site_url: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn listing_url(&self, property: &Property) -> String {
        format!("{}/properties/{}", self.site_url, property.slug)
    }

    pub fn welcome(&self, user: &User) -> EmailMessage {
        let site = &self.site_name;
        EmailMessage {
            to: user.email.clone(),
            subject: format!("Welcome to {site}"),
            body: format!(
                "Hi {name},\n\n\
                 Thanks for joining {site}. Your account type: {role}.\n\
                 Browse listings at {url}.\n\n\
                 The {site} team",
                name = strip_html(&user.name),
                role = user.role,
                url = self.site_url,
            ),
        }
    }

    pub fn inquiry_to_owner(&self, owner: &User, property: &Property, inquiry: &Inquiry) -> EmailMessage {
        EmailMessage {
            to: owner.email.clone(),
            subject: format!("New inquiry: {}", strip_html(&property.title)),
            body: format!(
                "Hi {owner},\n\n\
                 {name} <{email}> asked about \"{title}\" ({url}).\n\
                 Phone: {phone}\n\n\
                 {message}\n\n\
                 Reply directly to the sender to follow up.",
                owner = strip_html(&owner.name),
                name = strip_html(&inquiry.name),
                email = inquiry.email,
                title = strip_html(&property.title),
                url = self.listing_url(property),
                phone = inquiry.phone.as_deref().unwrap_or("not provided"),
                message = strip_html(&inquiry.message),
            ),
        }
    }

    pub fn inquiry_confirmation(&self, property: &Property, inquiry: &Inquiry) -> EmailMessage {
        EmailMessage {
            to: inquiry.email.clone(),
            subject: format!("We received your inquiry about {}", strip_html(&property.title)),
            body: format!(
                "Hi {name},\n\n\
                 Your message about \"{title}\" was sent to the lister.\n\
                 You can view the listing at {url}.\n\n\
                 The {site} team",
                name = strip_html(&inquiry.name),
                title = strip_html(&property.title),
                url = self.listing_url(property),
                site = self.site_name,
            ),
        }
    }

    pub fn newsletter_welcome(&self, email: &str) -> EmailMessage {
        EmailMessage {
            to: email.to_string(),
            subject: format!("You're subscribed to {} updates", self.site_name),
            body: format!(
                "You will now receive new listings and market updates from {site}.\n\n\
                 To unsubscribe, visit {url}/newsletter/unsubscribe.",
                site = self.site_name,
                url = self.site_url,
            ),
        }
    }

    pub fn password_changed(&self, user: &User) -> EmailMessage {
        EmailMessage {
            to: user.email.clone(),
            subject: format!("Your {} password was changed", self.site_name),
            body: format!(
                "Hi {name},\n\n\
                 The password for your account was just changed and all other sessions were signed out.\n\
                 If this wasn't you, reset your password immediately.",
                name = strip_html(&user.name),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingType, PropertyStatus, PropertyType, Role};
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Kiran".into(),
            email: "kiran@example.com".into(),
            phone: None,
            role: Role::Agent,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn property(owner: &User) -> Property {
        Property {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            slug: "lake-house-pune".into(),
            title: "Lake House".into(),
            description: "desc".into(),
            price: 1,
            property_type: PropertyType::House,
            listing_type: ListingType::Rent,
            status: PropertyStatus::Approved,
            address: "addr".into(),
            city: "Pune".into(),
            state: "MH".into(),
            bedrooms: None,
            bathrooms: None,
            area_sqft: 1,
            amenities: vec![],
            images: vec![],
            featured: false,
            views: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inquiry_mail_links_listing_and_strips_markup() {
        let templates = Templates::new("HomeNest", "https://homes.example.com/");
        let owner = user();
        let property = property(&owner);
        let inquiry = Inquiry {
            id: Uuid::new_v4(),
            property_id: property.id,
            owner_id: owner.id,
            sender_id: None,
            name: "<b>Sam</b>".into(),
            email: "sam@example.com".into(),
            phone: None,
            message: "Is parking included?".into(),
            created_at: Utc::now(),
        };

        let message = templates.inquiry_to_owner(&owner, &property, &inquiry);
        assert_eq!(message.to, "kiran@example.com");
        assert_eq!(message.subject, "New inquiry: Lake House");
        assert!(message.body.contains("https://homes.example.com/properties/lake-house-pune"));
        assert!(message.body.contains("Sam <sam@example.com>"));
        assert!(message.body.contains("Phone: not provided"));

        let confirmation = templates.inquiry_confirmation(&property, &inquiry);
        assert_eq!(confirmation.to, "sam@example.com");
    }

    #[test]
    fn welcome_mentions_role() {
        let templates = Templates::new("HomeNest", "https://homes.example.com");
        let message = templates.welcome(&user());
        assert!(message.body.contains("account type: agent"));
        assert_eq!(message.subject, "Welcome to HomeNest");
    }

    #[tokio::test]
    async fn log_mailer_records_messages() {
        let mailer = LogMailer::new();
        let message = Templates::new("HomeNest", "http://localhost").newsletter_welcome("a@b.co");
        mailer.send(&message).await.unwrap();
        assert_eq!(mailer.sent(), vec![message]);
    }

    #[tokio::test]
    async fn log_mailer_keeps_only_recent_messages() {
        let mailer = LogMailer::with_capacity(2);
        let templates = Templates::new("HomeNest", "http://localhost");
        for to in ["a@b.co", "c@d.co", "e@f.co"] {
            mailer.send(&templates.newsletter_welcome(to)).await.unwrap();
        }
        let to: Vec<String> = mailer.sent().into_iter().map(|m| m.to).collect();
        assert_eq!(to, vec!["c@d.co", "e@f.co"]);
    }
}
