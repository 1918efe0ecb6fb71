// Stay pricing
// nights * nightly rate for a calendar date range, plus a memoized variant for live price display

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Check-out {check_out} must be after check-in {check_in}")]
    InvalidRange { check_in: String, check_out: String },

    #[error("Total price overflows for {nights} nights at {price_per_night} per night")]
    Overflow { nights: u32, price_per_night: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub nights: u32,
    pub total_price: u64,
}

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> Result<u32, PricingError> {
    let days = (check_out - check_in).num_days();
    if days <= 0 {
        return Err(PricingError::InvalidRange {
            check_in: check_in.to_string(),
            check_out: check_out.to_string(),
        });
    }
    u32::try_from(days).map_err(|_| PricingError::InvalidRange {
        check_in: check_in.to_string(),
        check_out: check_out.to_string(),
    })
}

// Any partial day counts as a full extra night
pub fn nights_between_instants(
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> Result<u32, PricingError> {
    let invalid = || PricingError::InvalidRange {
        check_in: check_in.to_rfc3339(),
        check_out: check_out.to_rfc3339(),
    };

    let seconds = (check_out - check_in).num_seconds();
    if seconds <= 0 {
        return Err(invalid());
    }
    let nights = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(nights).map_err(|_| invalid())
}

pub fn total_for(nights: u32, price_per_night: u64) -> Result<u64, PricingError> {
    price_per_night
        .checked_mul(u64::from(nights))
        .ok_or(PricingError::Overflow {
            nights,
            price_per_night,
        })
}

pub struct PriceCalculator;

impl PriceCalculator {
    pub fn quote(
        check_in: NaiveDate,
        check_out: NaiveDate,
        price_per_night: u64,
    ) -> Result<Quote, PricingError> {
        let nights = nights_between(check_in, check_out)?;
        let total_price = total_for(nights, price_per_night)?;
        Ok(Quote {
            nights,
            total_price,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PricingStatsReport {
    pub entries: usize,
    pub hit_count: usize,
    pub miss_count: usize,
}

type QuoteKey = (NaiveDate, NaiveDate, u64);

// Same results as PriceCalculator::quote, computed once per input triple.
// Errors are not memoized.
#[derive(Debug, Default)]
pub struct MemoizedPriceCalculator {
    quotes: DashMap<QuoteKey, Quote>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl MemoizedPriceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quote(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        price_per_night: u64,
    ) -> Result<Quote, PricingError> {
        let key = (check_in, check_out, price_per_night);
        if let Some(quote) = self.quotes.get(&key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(*quote);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let quote = PriceCalculator::quote(check_in, check_out, price_per_night)?;
        self.quotes.insert(key, quote);
        Ok(quote)
    }

    pub fn stats(&self) -> PricingStatsReport {
        PricingStatsReport {
            entries: self.quotes.len(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.quotes.clear();
    }
}
