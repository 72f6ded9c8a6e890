//! Transaction filter model
//!
//! Turns raw `GET /transactions` query-string values into a
//! [`TransactionFilter`], the engine-neutral description of what to fetch:
//! - `n_days`: look-back window, default 7, negative values allowed
//! - `card_type`, `country_origin`: exact-match tokens
//! - `min_amount` + `max_amount`: closed amount range, only when both are given
//!
//! The filter never carries SQL fragments or document operators; each
//! backend translates it on its own.

use crate::error::{QueryError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Look-back window used when `n_days` is missing or not an integer
pub const DEFAULT_N_DAYS: i64 = 7;

/// Stored field names shared by both backends
pub mod fields {
    pub const TRANSACTION_DATE: &str = "transaction_date";
    pub const CARD_TYPE: &str = "CardType";
    pub const COUNTRY_ORIGIN: &str = "CountryOrigin";
    pub const AMOUNT: &str = "Amount";
}

/// Raw query-string parameters, kept as strings so that malformed values
/// fall back to defaults instead of rejecting the request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionParams {
    pub n_days: Option<String>,
    pub card_type: Option<String>,
    pub country_origin: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
}

impl TransactionParams {
    /// Collect parameters from decoded query-string pairs.
    ///
    /// The first occurrence of a key wins; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "n_days" => &mut params.n_days,
                "card_type" => &mut params.card_type,
                "country_origin" => &mut params.country_origin,
                "min_amount" => &mut params.min_amount,
                "max_amount" => &mut params.max_amount,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// Closed interval on `Amount`.
///
/// `min <= max` is not checked; an inverted range simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

/// Engine-neutral filter for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionFilter {
    since: DateTime<Utc>,
    card_type: Option<String>,
    country_origin: Option<String>,
    amount_range: Option<AmountRange>,
}

impl TransactionFilter {
    /// Build a filter from raw parameters relative to `now`
    pub fn from_params(params: &TransactionParams, now: DateTime<Utc>) -> Result<Self> {
        let n_days = params
            .n_days
            .as_deref()
            .and_then(|v| numeric_text(v)?.parse::<i64>().ok())
            .unwrap_or(DEFAULT_N_DAYS);

        let since = Duration::try_days(n_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                QueryError::InvalidParameter(format!("n_days={} is out of range", n_days))
            })?;

        // Both bounds or nothing; a lone bound is dropped
        let amount_range = match (
            parse_amount(params.min_amount.as_deref()),
            parse_amount(params.max_amount.as_deref()),
        ) {
            (Some(min), Some(max)) => Some(AmountRange { min, max }),
            _ => None,
        };

        Ok(Self {
            since,
            card_type: non_empty(params.card_type.as_deref()),
            country_origin: non_empty(params.country_origin.as_deref()),
            amount_range,
        })
    }

    /// Filter with only the date window set
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since,
            card_type: None,
            country_origin: None,
            amount_range: None,
        }
    }

    /// Lower bound on `transaction_date`
    pub fn since_time(&self) -> DateTime<Utc> {
        self.since
    }

    pub fn card_type(&self) -> Option<&str> {
        self.card_type.as_deref()
    }

    pub fn country_origin(&self) -> Option<&str> {
        self.country_origin.as_deref()
    }

    pub fn amount_range(&self) -> Option<AmountRange> {
        self.amount_range
    }

    /// Number of constraints beyond the date window
    pub fn optional_constraints(&self) -> usize {
        usize::from(self.card_type.is_some())
            + usize::from(self.country_origin.is_some())
            + usize::from(self.amount_range.is_some())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_amount(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| numeric_text(v)?.parse::<f64>().ok())
}

/// Trim and drop digit-group underscores (`1_000`). An underscore that does
/// not sit between two digits makes the value unparsable.
fn numeric_text(value: &str) -> Option<String> {
    let value = value.trim();
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        if c == '_' {
            let before = i.checked_sub(1).and_then(|j| bytes.get(j));
            let after = bytes.get(i + 1);
            match (before, after) {
                (Some(b), Some(a)) if b.is_ascii_digit() && a.is_ascii_digit() => continue,
                _ => return None,
            }
        }
        out.push(c);
    }
    Some(out)
}
