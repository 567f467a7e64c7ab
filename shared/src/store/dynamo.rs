use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};
use serde_json::Value;

use crate::error::{map_dynamo_error, Result, ServiceError};
use crate::models::Attributes;

const TABLE_NAME: &str = "adflow-table";

/// DynamoDB-backed [`super::KvStore`]. One table, generic `pk`/`sk` string
/// keys, flat items.
pub struct DynamoKvStore {
    client: Client,
    table_name: String,
}

impl DynamoKvStore {
    pub async fn new() -> Self {
        // Use the recommended defaults() function with latest behavior version
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let client = Client::new(&config);

        // Use environment variable for table name if available
        let table_name = env::var("DB_TABLE_NAME").unwrap_or_else(|_| TABLE_NAME.to_string());

        Self { client, table_name }
    }

    /// Creates a store with the specified client and table name.
    /// This is mainly useful for testing with a local DynamoDB instance.
    #[allow(dead_code)]
    pub fn with_client_and_table(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    fn key(pk: &str, sk: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("pk".to_string(), AttributeValue::S(pk.to_string())),
            ("sk".to_string(), AttributeValue::S(sk.to_string())),
        ])
    }
}

#[async_trait]
impl super::KvStore for DynamoKvStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Attributes>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, sk)))
            .send()
            .await
            .map_err(|e| map_dynamo_error("get_item", e))?;

        match response.item() {
            Some(item) => {
                let mut attrs: Attributes = from_item(item.clone())?;
                attrs.remove("pk");
                attrs.remove("sk");
                Ok(Some(attrs))
            }
            None => Ok(None),
        }
    }

    async fn query(&self, pk: &str, filter: &Attributes) -> Result<Vec<Attributes>> {
        let mut expr_attr_names = HashMap::from([("#pk".to_string(), "pk".to_string())]);
        let mut expr_attr_values = HashMap::from([(
            ":pk".to_string(),
            AttributeValue::S(pk.to_string()),
        )]);

        let mut filter_parts = Vec::new();
        for (i, (attr, value)) in filter.iter().enumerate() {
            let name = format!("#f{}", i);
            let placeholder = format!(":f{}", i);
            filter_parts.push(format!("{} = {}", name, placeholder));
            expr_attr_names.insert(name, attr.clone());
            expr_attr_values.insert(placeholder, to_attribute_value(value)?);
        }

        let mut items = Vec::new();
        let mut exclusive_start_key = None;
        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk")
                .set_expression_attribute_names(Some(expr_attr_names.clone()))
                .set_expression_attribute_values(Some(expr_attr_values.clone()))
                .set_exclusive_start_key(exclusive_start_key.clone());

            if !filter_parts.is_empty() {
                request = request.filter_expression(filter_parts.join(" AND "));
            }

            let response = request
                .send()
                .await
                .map_err(|e| map_dynamo_error("query", e))?;

            for item in response.items() {
                let mut attrs: Attributes = from_item(item.clone())?;
                attrs.remove("pk");
                attrs.remove("sk");
                items.push(attrs);
            }

            exclusive_start_key = response.last_evaluated_key().cloned();
            if exclusive_start_key.is_none() {
                break;
            }
        }

        Ok(items)
    }

    async fn create(&self, pk: &str, sk: &str, item: Attributes) -> Result<()> {
        let mut full = item;
        full.insert("pk".to_string(), Value::String(pk.to_string()));
        full.insert("sk".to_string(), Value::String(sk.to_string()));

        let item = to_item(&full)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| map_dynamo_error("put_item", e))?;

        Ok(())
    }

    async fn update(&self, pk: &str, sk: &str, changes: Attributes) -> Result<()> {
        if changes.is_empty() {
            return Err(ServiceError::Internal(
                "update parameter can not be empty".to_string(),
            ));
        }

        let mut expr_attr_names = HashMap::new();
        let mut expr_attr_values = HashMap::new();
        let mut sets = Vec::new();
        let mut removes = Vec::new();

        for (i, (attr, value)) in changes.iter().enumerate() {
            let name = format!("#a{}", i);
            expr_attr_names.insert(name.clone(), attr.clone());
            if value.is_null() {
                removes.push(name);
            } else {
                let placeholder = format!(":a{}", i);
                sets.push(format!("{} = {}", name, placeholder));
                expr_attr_values.insert(placeholder, to_attribute_value(value)?);
            }
        }

        let mut expression = String::new();
        if !sets.is_empty() {
            expression.push_str(&format!("SET {}", sets.join(", ")));
        }
        if !removes.is_empty() {
            if !expression.is_empty() {
                expression.push(' ');
            }
            expression.push_str(&format!("REMOVE {}", removes.join(", ")));
        }

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, sk)))
            .update_expression(expression)
            .set_expression_attribute_names(Some(expr_attr_names));

        if !expr_attr_values.is_empty() {
            request = request.set_expression_attribute_values(Some(expr_attr_values));
        }

        request
            .send()
            .await
            .map_err(|e| map_dynamo_error("update_item", e))?;

        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(pk, sk)))
            .send()
            .await
            .map_err(|e| map_dynamo_error("delete_item", e))?;

        Ok(())
    }
}
