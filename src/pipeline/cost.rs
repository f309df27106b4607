//! Execution cost estimate for one render.
//!
//! Pricing follows the serverless-function model: compute is billed per
//! GB-second of configured memory, ephemeral disk above a free allowance is
//! billed per GB-second, each invocation carries a flat request fee, and the
//! artifact upload adds one object-store PUT.
//!
//! ```text
//! compute  = duration_rate × memory_mb × duration_ms / 1000 / 1024
//! storage  = max(0, disk_mb − 512) × storage_rate × duration_ms / 1000 / 1024
//! total    = compute + storage + request_rate + upload_cost
//! ```
//!
//! Money is rounded to 7 decimal places, seconds to 3.

use serde::Serialize;

/// Region used when the requested one has no pricing entry.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Ephemeral storage included free with every function, in MB.
pub const RESERVED_FREE_DISK_MB: u64 = 512;

/// One object-store PUT for the artifact, in USD.
pub const UPLOAD_COST_USD: f64 = 0.000_005;

/// Per-region rates in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionPricing {
    /// Per GB-second of memory.
    pub duration_rate: f64,
    /// Per GB-second of ephemeral storage beyond the free allowance.
    pub storage_rate: f64,
    /// Per invocation.
    pub request_rate: f64,
}

const STANDARD: RegionPricing = RegionPricing {
    duration_rate: 0.000_016_666_7,
    storage_rate: 0.000_000_030_9,
    request_rate: 0.000_000_2,
};

const PRICING: &[(&str, RegionPricing)] = &[
    ("us-east-1", STANDARD),
    ("us-east-2", STANDARD),
    ("us-west-1", STANDARD),
    ("us-west-2", STANDARD),
    ("eu-west-1", STANDARD),
    (
        "eu-west-2",
        RegionPricing {
            storage_rate: 0.000_000_032_4,
            ..STANDARD
        },
    ),
    (
        "eu-central-1",
        RegionPricing {
            storage_rate: 0.000_000_033_2,
            ..STANDARD
        },
    ),
    (
        "ap-southeast-1",
        RegionPricing {
            storage_rate: 0.000_000_034_3,
            ..STANDARD
        },
    ),
    (
        "ap-northeast-1",
        RegionPricing {
            storage_rate: 0.000_000_035_2,
            ..STANDARD
        },
    ),
    (
        "sa-east-1",
        RegionPricing {
            duration_rate: 0.000_026_666_7,
            storage_rate: 0.000_000_049_1,
            request_rate: 0.000_000_3,
        },
    ),
];

/// Rates for `region`, or the default region's rates if unknown.
///
/// Returns the region actually priced alongside the rates.
pub fn pricing_for(region: &str) -> (&'static str, RegionPricing) {
    PRICING
        .iter()
        .find(|(name, _)| *name == region)
        .or_else(|| PRICING.iter().find(|(name, _)| *name == DEFAULT_REGION))
        .map(|(name, pricing)| (*name, *pricing))
        .unwrap_or((DEFAULT_REGION, STANDARD))
}

/// Itemised cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub compute_cost: f64,
    pub storage_cost: f64,
    pub request_cost: f64,
    pub upload_cost: f64,
    pub total_cost: f64,
}

/// Cost estimate for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostMetrics {
    /// Region the rates were taken from.
    pub region: String,
    pub duration_ms: u64,
    pub duration_seconds: f64,
    #[serde(rename = "memoryMB")]
    pub memory_mb: u64,
    #[serde(rename = "diskMB")]
    pub disk_mb: u64,
    #[serde(rename = "estimatedCostUSD")]
    pub estimated_cost_usd: f64,
    pub breakdown: CostBreakdown,
}

/// Estimate the cost of a run. Pure and deterministic.
pub fn estimate(duration_ms: u64, memory_mb: u64, disk_mb: u64, region: &str) -> CostMetrics {
    let (priced_region, rates) = pricing_for(region);
    let gb_seconds_per_mb = duration_ms as f64 / 1000.0 / 1024.0;

    let compute = rates.duration_rate * memory_mb as f64 * gb_seconds_per_mb;
    let charged_disk = disk_mb.saturating_sub(RESERVED_FREE_DISK_MB);
    let storage = charged_disk as f64 * rates.storage_rate * gb_seconds_per_mb;
    let total = compute + storage + rates.request_rate + UPLOAD_COST_USD;

    let breakdown = CostBreakdown {
        compute_cost: round_to(compute, 7),
        storage_cost: round_to(storage, 7),
        request_cost: round_to(rates.request_rate, 7),
        upload_cost: round_to(UPLOAD_COST_USD, 7),
        total_cost: round_to(total, 7),
    };

    CostMetrics {
        region: priced_region.to_string(),
        duration_ms,
        duration_seconds: round_to(duration_ms as f64 / 1000.0, 3),
        memory_mb,
        disk_mb,
        estimated_cost_usd: breakdown.total_cost,
        breakdown,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
