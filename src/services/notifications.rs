use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::Order;

/// What the buyer is told about a completed purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub reference: String,
    pub product_name: String,
    pub variant: String,
    pub license: String,
    pub price: String,
    pub payment_id: Option<String>,
    pub download_url: Option<String>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            reference: order.reference(),
            product_name: order.product_name.clone(),
            variant: order.variant.describe(),
            license: order.variant.license().to_string(),
            price: format_minor_units(order.amount_minor_units, &order.currency),
            payment_id: order.gateway_payment_id.clone(),
            download_url: order.download_url.clone(),
        }
    }
}

impl OrderSummary {
    pub fn subject(&self) -> String {
        format!("Your purchase of {} (#{})", self.product_name, self.reference)
    }

    pub fn body_text(&self) -> String {
        let mut body = format!(
            "Thanks for your purchase!\n\nOrder: #{}\nProduct: {}\nVariant: {}\nLicense: {}\nPaid: {}\n",
            self.reference, self.product_name, self.variant, self.license, self.price
        );
        if let Some(payment_id) = &self.payment_id {
            body.push_str(&format!("Payment: {}\n", payment_id));
        }
        if let Some(url) = &self.download_url {
            body.push_str(&format!("\nDownload: {}\n", url));
        }
        body
    }
}

/// ISO 4217 currencies whose minor unit exponent is zero.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "UYI", "VND",
    "VUV", "XAF", "XOF", "XPF",
];

/// Formats an integer amount in minor units as `"9.99 USD"`. Three-decimal
/// currencies (BHD, KWD, ...) are not sold and print with two decimals.
pub fn format_minor_units(amount: i64, currency: &str) -> String {
    let currency = currency.to_ascii_uppercase();
    match currency.as_str() {
        code if ZERO_DECIMAL_CURRENCIES.contains(&code) => format!("{} {}", amount, currency),
        _ => {
            let sign = if amount < 0 { "-" } else { "" };
            let abs = amount.unsigned_abs();
            format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
        }
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_purchase_confirmation(
        &self,
        buyer_contact: &str,
        summary: &OrderSummary,
    ) -> Result<(), ServiceError>;
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
}

/// Posts confirmations as JSON to a mail relay.
#[derive(Debug, Clone)]
pub struct HttpNotificationDispatcher {
    client: reqwest::Client,
    relay_url: String,
    sender: String,
}

impl HttpNotificationDispatcher {
    pub fn new(
        relay_url: impl Into<String>,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build relay client: {}", e)))?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
            sender: sender.into(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    #[instrument(skip(self, buyer_contact, summary), fields(reference = %summary.reference))]
    async fn send_purchase_confirmation(
        &self,
        buyer_contact: &str,
        summary: &OrderSummary,
    ) -> Result<(), ServiceError> {
        let message = RelayMessage {
            from: &self.sender,
            to: buyer_contact,
            subject: summary.subject(),
            text: summary.body_text(),
        };

        let response = self
            .client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| ServiceError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::NotificationFailed(format!(
                "relay returned {}",
                response.status()
            )));
        }
        info!("Purchase confirmation relayed");
        Ok(())
    }
}

/// Used when no relay is configured: the confirmation is only logged.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogNotificationDispatcher {
    async fn send_purchase_confirmation(
        &self,
        _buyer_contact: &str,
        summary: &OrderSummary,
    ) -> Result<(), ServiceError> {
        warn!(
            reference = %summary.reference,
            product = %summary.product_name,
            "No notification relay configured; purchase confirmation not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(999, "usd", "9.99 USD")]
    #[case(100000, "INR", "1000.00 INR")]
    #[case(5, "EUR", "0.05 EUR")]
    #[case(1500, "JPY", "1500 JPY")]
    #[case(250000, "vnd", "250000 VND")]
    #[case(9990, "CLP", "9990 CLP")]
    fn formats_minor_units(#[case] amount: i64, #[case] currency: &str, #[case] expected: &str) {
        assert_eq!(format_minor_units(amount, currency), expected);
    }

    #[test]
    fn body_lists_payment_and_download() {
        let summary = OrderSummary {
            reference: "A1B2C3".into(),
            product_name: "Harbor Timelapse".into(),
            variant: "1080p video".into(),
            license: "commercial".into(),
            price: "19.99 USD".into(),
            payment_id: Some("pay_1".into()),
            download_url: Some("https://cdn.example.com/harbor.mp4".into()),
        };
        let body = summary.body_text();
        assert!(body.contains("#A1B2C3"));
        assert!(body.contains("Payment: pay_1"));
        assert!(body.contains("Download: https://cdn.example.com/harbor.mp4"));
        assert_eq!(summary.subject(), "Your purchase of Harbor Timelapse (#A1B2C3)");
    }
}
