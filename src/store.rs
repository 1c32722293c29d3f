use crate::types::EventRecord;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;
use uuid::Uuid;

/// Collection every record lands in.
pub const SLACK_KIND: &str = "slack";

/// Environment variable naming the DynamoDB table. Read per request, not at
/// startup, so the deployment can repoint the table without a restart.
pub const EVENTS_TABLE_ENV: &str = "EVENTS_TABLE";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Write error: {0}")]
    Write(String),
}

/// Address of one stored record: a fixed collection plus a random name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKey {
    pub kind: String,
    pub name: String,
}

impl StoreKey {
    /// Mint a new key. Names are UUID v4 strings - unique per call with no
    /// shared counter, safe under concurrent requests.
    pub fn generate(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: Uuid::new_v4().to_string(),
        }
    }
}

/// A connected store that can persist one record under a key.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn put(&self, key: &StoreKey, record: &EventRecord) -> Result<(), StoreError>;
}

/// Opens a store connection. The events handler calls this once per request
/// and drops the store before responding - no pooling, no reuse.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: EventStore;

    async fn connect(&self) -> Result<Self::Store, StoreError>;
}

/// DynamoDB-backed store. One instance serves one request.
#[derive(Debug)]
pub struct DynamoEventStore {
    client: DynamoDbClient,
    table: String,
}

impl DynamoEventStore {
    /// Read the table name and build a fresh client from the ambient AWS
    /// configuration (credentials, region).
    pub async fn connect() -> Result<Self, StoreError> {
        let table = std::env::var(EVENTS_TABLE_ENV)
            .map_err(|_| StoreError::MissingEnvVar(EVENTS_TABLE_ENV.to_string()))?;
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = DynamoDbClient::new(&aws_config);
        Ok(Self { client, table })
    }
}

#[async_trait]
impl EventStore for DynamoEventStore {
    async fn put(&self, key: &StoreKey, record: &EventRecord) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item("kind", AttributeValue::S(key.kind.clone()))
            .item("name", AttributeValue::S(key.name.clone()))
            .item("message", AttributeValue::S(record.message.clone()))
            .item("user", AttributeValue::S(record.user.clone()))
            .send()
            .await
            .map_err(|e| StoreError::Write(e.into_service_error().to_string()))?;
        Ok(())
    }
}

/// Production connector: one fresh [`DynamoEventStore`] per request.
#[derive(Debug, Clone, Default)]
pub struct DynamoConnector;

#[async_trait]
impl StoreConnector for DynamoConnector {
    type Store = DynamoEventStore;

    async fn connect(&self) -> Result<DynamoEventStore, StoreError> {
        DynamoEventStore::connect().await
    }
}
