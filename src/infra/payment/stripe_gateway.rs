use crate::domain::models::order::PaymentIntent;
use crate::domain::ports::{CreatePaymentIntent, PaymentGateway};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct StripeGateway {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_url: String, secret_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build payment client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    async fn decode(res: Response) -> Result<PaymentIntent, AppError> {
        let status = res.status();
        if status.is_success() {
            return res.json::<PaymentIntent>().await.map_err(|e| {
                AppError::PaymentGateway(format!("Unreadable payment intent: {}", e))
            });
        }

        let body = res.text().await.unwrap_or_default();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%status, "Payment gateway temporarily failing");
            return Err(AppError::PaymentGatewayUnavailable(format!("gateway answered {}", status)));
        }

        let msg = format!("Payment gateway rejected request. Status: {}, Body: {}", status, body);
        error!("{}", msg);
        Err(AppError::PaymentGateway(msg))
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() || e.is_connect() {
        AppError::PaymentGatewayUnavailable(e.to_string())
    } else {
        AppError::PaymentGateway(format!("Payment gateway connection error: {}", e))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, request: &CreatePaymentIntent) -> Result<PaymentIntent, AppError> {
        let amount = request.amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("receipt_email", request.receipt_email.as_str()),
            ("metadata[order_id]", request.order_id.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        debug!(order_id = %request.order_id, amount = request.amount, "Creating payment intent");
        let res = self.client
            .post(format!("{}/v1/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.order_id)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        Self::decode(res).await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        let res = self.client
            .get(format!("{}/v1/payment_intents/{}", self.api_url, id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        Self::decode(res).await
    }
}
