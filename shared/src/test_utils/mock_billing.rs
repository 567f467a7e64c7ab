use async_trait::async_trait;
use serde_json::Value;

use crate::billing::Billing;
use crate::error::Result;

/// Canned payments collaborator.
pub struct MockBilling {
    pub plans: Vec<Value>,
    pub customer: Option<Value>,
}

impl MockBilling {
    pub fn new(plans: Vec<Value>) -> Self {
        Self {
            plans,
            customer: None,
        }
    }
}

#[async_trait]
impl Billing for MockBilling {
    async fn find_customer_by_email(&self, _email: &str) -> Result<Option<Value>> {
        Ok(self.customer.clone())
    }

    async fn list_plans(&self) -> Result<Vec<Value>> {
        Ok(self.plans.clone())
    }

    async fn attach_payment_source(&self, _customer_id: &str, _source: &str) -> Result<()> {
        Ok(())
    }
}
