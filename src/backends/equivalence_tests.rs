//! Both translations must select the same transactions from equivalent data.
//!
//! The SQL statement runs against an in-memory SQLite table and the filter
//! document is evaluated by a small matcher over the same rows as BSON.

use super::document::build_filter;
use super::relational::{build_statement, SqlParam};
use crate::config::ResultOrder;
use crate::query::{TransactionFilter, TransactionParams};
use chrono::{DateTime, Duration, TimeZone, Utc};
use mongodb::bson::{self, Bson, Document};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::cmp::Ordering;
use std::collections::BTreeSet;

struct Seed {
    id: i64,
    date: DateTime<Utc>,
    card: &'static str,
    country: &'static str,
    amount: f64,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

/// 100 transactions: 12 VISA within 30 days with Amount in [10, 500],
/// the rest miss on exactly one of card, window or amount
fn seed_transactions() -> Vec<Seed> {
    let countries = ["US", "GB", "DE", "BR"];
    let mut seeds = Vec::new();
    let mut push = |date: DateTime<Utc>, card: &'static str, amount: f64| {
        let id = seeds.len() as i64 + 1;
        seeds.push(Seed {
            id,
            date,
            card,
            country: countries[(id as usize) % countries.len()],
            amount,
        });
    };

    // Qualifying, including both amount bounds and the exact window start
    push(now() - Duration::days(30), "VISA", 120.0);
    push(now() - Duration::days(2), "VISA", 10.0);
    push(now() - Duration::days(3), "VISA", 500.0);
    for i in 0..9 {
        push(
            now() - Duration::days(4 + i * 3) - Duration::hours(5),
            "VISA",
            25.0 + 50.0 * i as f64,
        );
    }

    // VISA inside the window, amount outside the range
    for i in 0..20 {
        let amount = if i % 2 == 0 { 9.99 - i as f64 * 0.1 } else { 500.01 + i as f64 * 40.0 };
        push(now() - Duration::days(1 + i) - Duration::minutes(17), "VISA", amount);
    }

    // VISA in range but older than 30 days
    for i in 0..20 {
        push(
            now() - Duration::days(30) - Duration::seconds(1) - Duration::days(i * 2),
            "VISA",
            100.0 + i as f64,
        );
    }

    // Other cards, otherwise qualifying
    let others = ["MASTERCARD", "AMEX", "DISCOVER"];
    for i in 0..48 {
        push(
            now() - Duration::days(1 + (i % 28)) - Duration::hours(2),
            others[i as usize % others.len()],
            15.0 + i as f64 * 9.5,
        );
    }

    assert_eq!(seeds.len(), 100);
    seeds
}

async fn sqlite_table(seeds: &[Seed]) -> SqlitePool {
    // A single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE transactions (
            id INTEGER PRIMARY KEY,
            transaction_date TEXT NOT NULL,
            CardType TEXT,
            CountryOrigin TEXT,
            Amount REAL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    for seed in seeds {
        sqlx::query(
            "INSERT INTO transactions (id, transaction_date, CardType, CountryOrigin, Amount) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(seed.id)
        .bind(seed.date.naive_utc())
        .bind(seed.card)
        .bind(seed.country)
        .bind(seed.amount)
        .execute(&pool)
        .await
        .unwrap();
    }

    pool
}

async fn relational_ids(pool: &SqlitePool, filter: &TransactionFilter) -> BTreeSet<i64> {
    let statement = build_statement(filter, "transactions", ResultOrder::Unspecified);
    let mut query = sqlx::query(&statement.sql);
    for param in &statement.params {
        query = match param {
            SqlParam::Timestamp(ts) => query.bind(*ts),
            SqlParam::Text(text) => query.bind(text.as_str()),
            SqlParam::Float(value) => query.bind(*value),
        };
    }

    query
        .fetch_all(pool)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get::<i64, _>("id"))
        .collect()
}

fn documents(seeds: &[Seed]) -> Vec<Document> {
    seeds
        .iter()
        .map(|seed| {
            let mut doc = Document::new();
            doc.insert("_id", seed.id);
            doc.insert(
                "transaction_date",
                bson::DateTime::from_millis(seed.date.timestamp_millis()),
            );
            doc.insert("CardType", seed.card);
            doc.insert("CountryOrigin", seed.country);
            doc.insert("Amount", seed.amount);
            doc
        })
        .collect()
}

fn compare(value: &Bson, bound: &Bson) -> Option<Ordering> {
    match (value, bound) {
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.timestamp_millis().cmp(&b.timestamp_millis())),
        (Bson::Double(a), Bson::Double(b)) => a.partial_cmp(b),
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Evaluates the subset of query operators the document backend emits
fn matches(filter: &Document, doc: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let value = doc.get(field);
        match condition {
            Bson::Document(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, bound)| {
                    let Some(ordering) = value.and_then(|v| compare(v, bound)) else {
                        return false;
                    };
                    match op.as_str() {
                        "$gte" => ordering != Ordering::Less,
                        "$lte" => ordering != Ordering::Greater,
                        other => panic!("unsupported operator {}", other),
                    }
                })
            }
            expected => value == Some(expected),
        }
    })
}

fn document_ids(docs: &[Document], filter: &TransactionFilter) -> BTreeSet<i64> {
    let query = build_filter(filter);
    docs.iter()
        .filter(|doc| matches(&query, doc))
        .map(|doc| doc.get_i64("_id").unwrap())
        .collect()
}

fn expected_ids(seeds: &[Seed], filter: &TransactionFilter) -> BTreeSet<i64> {
    seeds
        .iter()
        .filter(|s| s.date >= filter.since_time())
        .filter(|s| filter.card_type().map_or(true, |c| s.card == c))
        .filter(|s| filter.country_origin().map_or(true, |c| s.country == c))
        .filter(|s| {
            filter
                .amount_range()
                .map_or(true, |r| s.amount >= r.min && s.amount <= r.max)
        })
        .map(|s| s.id)
        .collect()
}

fn params(pairs: &[(&str, &str)]) -> TransactionParams {
    let mut p = TransactionParams::default();
    for (key, value) in pairs {
        let value = Some(value.to_string());
        match *key {
            "n_days" => p.n_days = value,
            "card_type" => p.card_type = value,
            "country_origin" => p.country_origin = value,
            "min_amount" => p.min_amount = value,
            "max_amount" => p.max_amount = value,
            other => panic!("unknown param {}", other),
        }
    }
    p
}

#[tokio::test]
async fn test_visa_example_returns_twelve_from_both_backends() {
    let seeds = seed_transactions();
    let pool = sqlite_table(&seeds).await;
    let docs = documents(&seeds);

    let filter = TransactionFilter::from_params(
        &params(&[
            ("n_days", "30"),
            ("card_type", "VISA"),
            ("min_amount", "10"),
            ("max_amount", "500"),
        ]),
        now(),
    )
    .unwrap();

    let expected: BTreeSet<i64> = (1..=12).collect();
    assert_eq!(relational_ids(&pool, &filter).await, expected);
    assert_eq!(document_ids(&docs, &filter), expected);
}

#[tokio::test]
async fn test_no_optional_fields_selects_by_date_only() {
    let seeds = seed_transactions();
    let pool = sqlite_table(&seeds).await;
    let docs = documents(&seeds);

    let filter = TransactionFilter::since(now() - Duration::days(10));
    let expected: BTreeSet<i64> = seeds
        .iter()
        .filter(|s| s.date >= now() - Duration::days(10))
        .map(|s| s.id)
        .collect();

    assert!(!expected.is_empty());
    assert_eq!(relational_ids(&pool, &filter).await, expected);
    assert_eq!(document_ids(&docs, &filter), expected);
}

#[tokio::test]
async fn test_backends_agree_across_filters() {
    let seeds = seed_transactions();
    let pool = sqlite_table(&seeds).await;
    let docs = documents(&seeds);

    let cases: Vec<Vec<(&str, &str)>> = vec![
        vec![],
        vec![("n_days", "60")],
        vec![("n_days", "90"), ("card_type", "AMEX")],
        vec![("n_days", "30"), ("country_origin", "DE")],
        vec![("n_days", "30"), ("card_type", "VISA"), ("country_origin", "US")],
        vec![("n_days", "45"), ("min_amount", "100"), ("max_amount", "200")],
        // One-sided ranges leave Amount unconstrained
        vec![("n_days", "30"), ("min_amount", "400")],
        vec![("n_days", "30"), ("max_amount", "20")],
        // Inverted range matches nothing
        vec![("n_days", "30"), ("min_amount", "500"), ("max_amount", "10")],
        // Future window matches nothing
        vec![("n_days", "-1")],
        vec![("card_type", "visa")],
        vec![("card_type", "VISA' OR '1'='1")],
    ];

    for case in cases {
        let filter = TransactionFilter::from_params(&params(&case), now()).unwrap();
        let expected = expected_ids(&seeds, &filter);

        assert_eq!(relational_ids(&pool, &filter).await, expected, "relational {:?}", case);
        assert_eq!(document_ids(&docs, &filter), expected, "document {:?}", case);
    }
}

#[tokio::test]
async fn test_one_sided_range_matches_unconstrained() {
    let seeds = seed_transactions();
    let pool = sqlite_table(&seeds).await;

    let unconstrained =
        TransactionFilter::from_params(&params(&[("n_days", "30")]), now()).unwrap();
    let only_min = TransactionFilter::from_params(
        &params(&[("n_days", "30"), ("min_amount", "1000000")]),
        now(),
    )
    .unwrap();

    assert_eq!(
        relational_ids(&pool, &only_min).await,
        relational_ids(&pool, &unconstrained).await
    );
}
