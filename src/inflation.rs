//! Real-terms salary adjustment.
//!
//! A nominal salary observed in year `Y` is expressed in target-year
//! prices by compounding the annual rate of every year `y` with
//! `Y < y <= target`. Absence propagates: a missing, zero or non-finite
//! salary has no adjusted value.

use std::collections::BTreeMap;

/// Year → annual inflation rate, plus the year whose prices are targeted.
#[derive(Debug, Clone, PartialEq)]
pub struct InflationTable {
    pub target_year: i32,
    pub rates: BTreeMap<i32, f64>,
}

impl InflationTable {
    pub fn new(target_year: i32, rates: BTreeMap<i32, f64>) -> Self {
        Self { target_year, rates }
    }

    /// Cumulative multiplier from `observed_year` prices to target prices.
    pub fn factor(&self, observed_year: i32) -> f64 {
        cumulative_factor(observed_year, self.target_year, &self.rates)
    }

    pub fn adjust(&self, nominal: Option<f64>, observed_year: i32) -> Option<f64> {
        inflate(nominal?, observed_year, self.target_year, &self.rates)
    }
}

fn cumulative_factor(observed_year: i32, target_year: i32, rates: &BTreeMap<i32, f64>) -> f64 {
    if observed_year >= target_year {
        return 1.0;
    }
    rates
        .range(observed_year + 1..=target_year)
        .fold(1.0, |acc, (_, rate)| acc * (1.0 + rate))
}

/// Round to currency precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Inflate `nominal` from `observed_year` prices to `target_year` prices.
pub fn inflate(
    nominal: f64,
    observed_year: i32,
    target_year: i32,
    rates: &BTreeMap<i32, f64>,
) -> Option<f64> {
    if !nominal.is_finite() || nominal == 0.0 {
        return None;
    }
    Some(round2(
        nominal * cumulative_factor(observed_year, target_year, rates),
    ))
}
