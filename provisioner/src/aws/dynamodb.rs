//! DynamoDB backing [`StatusTable`].

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use shared::error::{ProvisionError, ProvisionResult};

use super::error_chain;
use crate::status::{StatusItem, StatusTable, StatusValue};

/// Status table client
pub struct DynamoStatusTable {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoStatusTable {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

fn to_attribute(value: &StatusValue) -> AttributeValue {
    match value {
        StatusValue::Text(s) => AttributeValue::S(s.clone()),
        StatusValue::Number(n) => AttributeValue::N(n.to_string()),
    }
}

fn to_attributes(item: &StatusItem) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), to_attribute(value)))
        .collect()
}

#[async_trait]
impl StatusTable for DynamoStatusTable {
    async fn put_item(&self, table: &str, item: &StatusItem) -> ProvisionResult<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attributes(item)))
            .send()
            .await
            .map_err(|e| ProvisionError::StatusTableError {
                operation: "PutItem",
                reason: error_chain(e),
            })?;
        Ok(())
    }
}
