use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::metrics::{EMAILS_FAILED, EMAILS_SENT};
use crate::notify::{EmailMessage, Mailer};

// Handle used by request handlers to queue outgoing mail
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<EmailMessage>,
}

pub fn notification_channel(capacity: usize) -> (Notifier, mpsc::Receiver<EmailMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Notifier { tx }, rx)
}

impl Notifier {
    /// Queue a message without waiting. A full or closed queue drops it.
    pub fn enqueue(&self, message: EmailMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                EMAILS_FAILED.inc();
                warn!(to = %message.to, subject = %message.subject, "notification queue full, email dropped");
            }
            Err(TrySendError::Closed(message)) => {
                EMAILS_FAILED.inc();
                warn!(to = %message.to, "notification worker stopped, email dropped");
            }
        }
    }
}

// Background worker -> delivers queued mail one by one
pub async fn notification_worker(mut rx: mpsc::Receiver<EmailMessage>, mailer: Arc<dyn Mailer>) {
    info!("notification worker started");

    while let Some(message) = rx.recv().await {
        match mailer.send(&message).await {
            Ok(()) => {
                EMAILS_SENT.inc();
                debug!(to = %message.to, subject = %message.subject, "email sent");
            }
            // Delivery failures never reach the request that queued the mail
            Err(e) => {
                EMAILS_FAILED.inc();
                warn!(error = %e, to = %message.to, "email delivery failed");
            }
        }
    }

    info!("notification worker stopped");
}
