use std::env;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, ServiceError};

const STRIPE_URL: &str = "https://api.stripe.com/v1";

/// Payments collaborator. Only the three calls the product needs.
#[async_trait]
pub trait Billing: Send + Sync + 'static {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Value>>;
    async fn list_plans(&self) -> Result<Vec<Value>>;
    async fn attach_payment_source(&self, customer_id: &str, source: &str) -> Result<()>;
}

pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new() -> Result<Self> {
        let secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| ServiceError::Internal("STRIPE_SECRET_KEY is not set".to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: env::var("STRIPE_URL").unwrap_or_else(|_| STRIPE_URL.to_string()),
            secret_key,
        })
    }

    async fn decode(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Internal(format!("Invalid Stripe response: {}", e)))?;
        if !status.is_success() {
            let msg = body["error"]["message"]
                .as_str()
                .unwrap_or("Unknown Stripe error");
            return Err(ServiceError::RemoteApi(msg.to_string()));
        }
        Ok(body)
    }
}

#[async_trait]
impl Billing for StripeClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Value>> {
        let response = self
            .http
            .get(format!("{}/customers", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("Stripe request failed: {}", e)))?;
        let body = Self::decode(response).await?;
        Ok(body["data"].as_array().and_then(|d| d.first().cloned()))
    }

    async fn list_plans(&self) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(format!("{}/plans", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("active", "true")])
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("Stripe request failed: {}", e)))?;
        let body = Self::decode(response).await?;
        Ok(body["data"].as_array().cloned().unwrap_or_default())
    }

    async fn attach_payment_source(&self, customer_id: &str, source: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/customers/{}/sources", self.base_url, customer_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("source", source)])
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("Stripe request failed: {}", e)))?;
        Self::decode(response).await?;
        Ok(())
    }
}
