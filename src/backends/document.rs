//! MongoDB backend
//!
//! Translates a [`TransactionFilter`] into a filter document with the same
//! conjunctive semantics as the SQL backend and drains the whole cursor.

use super::traits::{BackendKind, TransactionBackend};
use crate::config::{DatabaseSettings, ResultOrder};
use crate::error::Result;
use crate::query::{fields, TransactionFilter};
use crate::results::{bytes_value, decimal_value, float_value, timestamp_value, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Translate a filter into a MongoDB filter document
pub fn build_filter(filter: &TransactionFilter) -> Document {
    let mut since = Document::new();
    since.insert(
        "$gte",
        bson::DateTime::from_millis(filter.since_time().timestamp_millis()),
    );

    let mut query = Document::new();
    query.insert(fields::TRANSACTION_DATE, since);

    if let Some(card_type) = filter.card_type() {
        query.insert(fields::CARD_TYPE, card_type);
    }

    if let Some(country) = filter.country_origin() {
        query.insert(fields::COUNTRY_ORIGIN, country);
    }

    if let Some(range) = filter.amount_range() {
        let mut amount = Document::new();
        amount.insert("$gte", range.min);
        amount.insert("$lte", range.max);
        query.insert(fields::AMOUNT, amount);
    }

    query
}

/// Sort document for the configured ordering, if any
pub fn build_sort(order: ResultOrder) -> Option<Document> {
    let direction = match order {
        ResultOrder::Unspecified => return None,
        ResultOrder::Ascending => 1,
        ResultOrder::Descending => -1,
    };
    let mut sort = Document::new();
    sort.insert(fields::TRANSACTION_DATE, direction);
    Some(sort)
}

/// Connection string for the configured server; credentials are percent-encoded
pub fn connection_uri(settings: &DatabaseSettings) -> String {
    let port = settings.port_for(BackendKind::Document);
    if settings.user.is_empty() {
        return format!("mongodb://{}:{}/", settings.host, port);
    }

    format!(
        "mongodb://{}:{}@{}:{}/?authSource={}",
        urlencoding::encode(&settings.user),
        urlencoding::encode(&settings.password),
        settings.host,
        port,
        urlencoding::encode(settings.auth_source.as_deref().unwrap_or("admin")),
    )
}

/// Transactions stored in a MongoDB collection
pub struct DocumentBackend {
    collection: Collection<Document>,
    order: ResultOrder,
    max_time: Duration,
}

impl DocumentBackend {
    /// Create a client from settings. The driver connects on first use.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let mut options = ClientOptions::parse(connection_uri(settings)).await?;
        let connect_timeout = Duration::from_secs_f64(settings.connect_timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(connect_timeout);
        options.server_selection_timeout = Some(connect_timeout);
        options.max_pool_size = Some(settings.max_connections);

        let client = Client::with_options(options)?;
        let collection = client
            .database(&settings.dbname)
            .collection::<Document>(&settings.table);

        info!(
            "MongoDB client configured for {}:{}/{}.{}",
            settings.host,
            settings.port_for(BackendKind::Document),
            settings.dbname,
            settings.table
        );

        Ok(Self {
            collection,
            order: settings.order,
            max_time: Duration::from_secs_f64(settings.query_timeout),
        })
    }
}

#[async_trait]
impl TransactionBackend for DocumentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    async fn fetch(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRecord>> {
        let query = build_filter(filter);
        debug!(filter = ?query.keys().collect::<Vec<_>>(), "Executing document query");

        let mut options = FindOptions::default();
        options.sort = build_sort(self.order);
        options.max_time = Some(self.max_time);

        let start = Instant::now();
        let cursor = self.collection.find(query, options).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        debug!(
            "MongoDB returned {} documents in {:?}",
            documents.len(),
            start.elapsed()
        );

        Ok(documents.into_iter().map(document_to_record).collect())
    }
}

/// Convert a document into a record, keeping field order
pub fn document_to_record(document: Document) -> TransactionRecord {
    document
        .into_iter()
        .map(|(field, value)| (field, bson_to_json(value)))
        .collect()
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => float_value(f),
        Bson::String(s) | Bson::Symbol(s) => Value::String(s),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()) {
            Some(ts) => timestamp_value(ts),
            None => Value::from(dt.timestamp_millis()),
        },
        Bson::Decimal128(decimal) => decimal_value(&decimal.to_string()),
        Bson::Binary(binary) => bytes_value(&binary.bytes),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(field, value)| (field, bson_to_json(value)))
                .collect(),
        ),
        // Timestamps, regexes, code and other rarities keep their extended JSON form
        other => other.into_relaxed_extjson(),
    }
}
