//! Structure snapshot builder (§4.1): derives channel rails and a ranked
//! support/resistance cluster map from the active higher-timeframe range,
//! cached with a TTL and invalidated on mid-price drift or input-epoch
//! change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railgate_core::Price;

use crate::error::{Result, StructureError};

/// The active higher-timeframe bar a rail is derived from (e.g. the 1h
/// range). `ready == false` means the bar has not accumulated enough
/// history to be trusted as a channel boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRange {
    pub high: Price,
    pub low: Price,
    pub ready: bool,
}

/// A raw support/resistance price level observed in the order book or
/// trade history, prior to clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLevel {
    pub price: Price,
    pub notional_usd: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrClusterType {
    Support,
    Resistance,
    ChannelEdge,
    OuterRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStatus {
    Strong,
    Normal,
    Weak,
    None,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrCluster {
    pub center_price: Price,
    pub cluster_type: SrClusterType,
    /// Position rank within the channel, in [0, 1].
    pub rank: Decimal,
    pub score: Decimal,
    pub notional_usd: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrClusterView {
    pub clusters: Vec<SrCluster>,
    pub cluster_count: u32,
    pub path_depth: u32,
    pub map_strength: Decimal,
    pub map_status: MapStatus,
    pub nearest_up: Option<Price>,
    pub nearest_down: Option<Price>,
}

impl SrClusterView {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            clusters: Vec::new(),
            cluster_count: 0,
            path_depth: 0,
            map_strength: Decimal::ZERO,
            map_status: MapStatus::None,
            nearest_up: None,
            nearest_down: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureSource {
    Bar1hRange,
    AdaptiveLookback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rails {
    pub upper: Price,
    pub lower: Price,
}

impl Rails {
    #[must_use]
    pub fn span(&self) -> Decimal {
        self.upper.inner() - self.lower.inner()
    }

    /// channelT = (mid - lower) / span, the normalized position of `mid`
    /// within the channel.
    #[must_use]
    pub fn channel_t(&self, mid: Price) -> Decimal {
        let span = self.span();
        if span.is_zero() {
            return Decimal::ZERO;
        }
        (mid.inner() - self.lower.inner()) / span
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub rails: Rails,
    pub span: Decimal,
    pub source: StructureSource,
    pub quality: Decimal,
    pub hash: u64,
    pub basis: String,
    pub version: u32,
    pub candidates: Vec<RawLevel>,
}

/// Configuration for building and caching structure snapshots.
#[derive(Debug, Clone, Copy)]
pub struct StructureConfig {
    pub cache_ttl_ms: i64,
    pub invalidate_mid_drift_usd: Decimal,
    pub cluster_padding_usd: Decimal,
    pub merge_distance_usd: Decimal,
    pub max_clusters_per_side: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 1_000,
            invalidate_mid_drift_usd: Decimal::new(500, 2), // 5.00
            cluster_padding_usd: Decimal::new(2000, 2),     // 20.00
            merge_distance_usd: Decimal::new(1000, 2),      // 10.00
            max_clusters_per_side: 5,
        }
    }
}

/// Builds rails from the active bar range. Returns `NoLocalChannel` when
/// the bar is not ready — callers surface this as the decision engine's
/// `no_local_channel` reason rather than treating it as a hard error.
pub fn build_rails(bar1h: BarRange) -> Result<(Rails, StructureSource)> {
    if !bar1h.ready {
        return Err(StructureError::NoLocalChannel(
            "1h bar range not ready".into(),
        ));
    }
    if bar1h.high.inner() <= bar1h.low.inner() {
        return Err(StructureError::InvalidInput(
            "bar high must exceed bar low".into(),
        ));
    }
    Ok((
        Rails {
            upper: bar1h.high,
            lower: bar1h.low,
        },
        StructureSource::Bar1hRange,
    ))
}

/// Filters raw levels to those within the padded channel, merges levels
/// within `merge_distance_usd`, weights by notional, sorts nearest-to-mid
/// first, and caps the result per side.
pub fn build_sr_clusters(
    rails: Rails,
    mid: Price,
    raw_levels: &[RawLevel],
    config: &StructureConfig,
) -> SrClusterView {
    let lower_bound = rails.lower.inner() - config.cluster_padding_usd;
    let upper_bound = rails.upper.inner() + config.cluster_padding_usd;

    let mut in_range: Vec<RawLevel> = raw_levels
        .iter()
        .copied()
        .filter(|lvl| lvl.price.inner() >= lower_bound && lvl.price.inner() <= upper_bound)
        .collect();
    in_range.sort_by(|a, b| a.price.inner().cmp(&b.price.inner()));

    let mut merged: Vec<RawLevel> = Vec::new();
    for lvl in in_range {
        match merged.last_mut() {
            Some(prev)
                if (lvl.price.inner() - prev.price.inner()).abs() <= config.merge_distance_usd =>
            {
                // notional-weighted average price, summed notional
                let total = prev.notional_usd + lvl.notional_usd;
                if !total.is_zero() {
                    let weighted = (prev.price.inner() * prev.notional_usd
                        + lvl.price.inner() * lvl.notional_usd)
                        / total;
                    prev.price = Price::new(weighted);
                }
                prev.notional_usd = total;
            }
            _ => merged.push(lvl),
        }
    }

    let span = rails.span();
    let mut clusters: Vec<SrCluster> = merged
        .into_iter()
        .map(|lvl| {
            let cluster_type = if lvl.price.inner() >= rails.upper.inner() {
                SrClusterType::OuterRange
            } else if lvl.price.inner() <= rails.lower.inner() {
                SrClusterType::OuterRange
            } else if lvl.price.inner() < mid.inner() {
                SrClusterType::Support
            } else {
                SrClusterType::Resistance
            };
            let rank = if span.is_zero() {
                Decimal::ZERO
            } else {
                ((lvl.price.inner() - rails.lower.inner()) / span).clamp(Decimal::ZERO, Decimal::ONE)
            };
            SrCluster {
                center_price: lvl.price,
                cluster_type,
                rank,
                score: lvl.notional_usd,
                notional_usd: lvl.notional_usd,
            }
        })
        .collect();

    clusters.sort_by_key(|c| (c.center_price.inner() - mid.inner()).abs());

    let mut support: Vec<SrCluster> = clusters
        .iter()
        .copied()
        .filter(|c| c.center_price.inner() < mid.inner())
        .take(config.max_clusters_per_side)
        .collect();
    let resistance: Vec<SrCluster> = clusters
        .iter()
        .copied()
        .filter(|c| c.center_price.inner() >= mid.inner())
        .take(config.max_clusters_per_side)
        .collect();
    support.extend(resistance);
    support.sort_by_key(|c| (c.center_price.inner() - mid.inner()).abs());

    let cluster_count = support.len() as u32;
    let path_depth = support
        .iter()
        .filter(|c| matches!(c.cluster_type, SrClusterType::Support | SrClusterType::Resistance))
        .count() as u32;

    // map_strength: more nearby, well-notional clusters -> stronger map.
    let total_notional: Decimal = support.iter().map(|c| c.notional_usd).sum();
    let map_strength = if cluster_count == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(cluster_count) / Decimal::from(10)
            + (total_notional / Decimal::from(1_000_000)).min(Decimal::ONE) / Decimal::from(2))
        .clamp(Decimal::ZERO, Decimal::ONE)
    };
    let map_status = if cluster_count == 0 {
        MapStatus::None
    } else if map_strength >= Decimal::new(65, 2) {
        MapStatus::Strong
    } else if map_strength >= Decimal::new(35, 2) {
        MapStatus::Normal
    } else {
        MapStatus::Weak
    };

    let nearest_up = support
        .iter()
        .filter(|c| c.center_price.inner() >= mid.inner())
        .min_by_key(|c| c.center_price.inner() - mid.inner())
        .map(|c| c.center_price);
    let nearest_down = support
        .iter()
        .filter(|c| c.center_price.inner() < mid.inner())
        .max_by_key(|c| c.center_price.inner())
        .map(|c| c.center_price);

    SrClusterView {
        clusters: support,
        cluster_count,
        path_depth,
        map_strength,
        map_status,
        nearest_up,
        nearest_down,
    }
}

/// Cache holding the last built snapshot and the state it was built
/// against, so repeated ticks within the TTL reuse the same snapshot
/// without recomputation.
#[derive(Debug, Default)]
pub struct StructureCache {
    pub snapshot: Option<StructureSnapshot>,
    pub built_at_ms: i64,
    pub mid_at_build: Option<Price>,
    pub epoch_at_build: u64,
}

impl StructureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached snapshot if still fresh under `config`, else
    /// `None` to signal a rebuild is required.
    #[must_use]
    pub fn get_if_fresh(
        &self,
        now_ms: i64,
        mid: Price,
        epoch: u64,
        config: &StructureConfig,
    ) -> Option<&StructureSnapshot> {
        let snapshot = self.snapshot.as_ref()?;
        if now_ms - self.built_at_ms > config.cache_ttl_ms {
            return None;
        }
        if epoch != self.epoch_at_build {
            return None;
        }
        if let Some(mid_at_build) = self.mid_at_build {
            let drift = (mid.inner() - mid_at_build.inner()).abs();
            if drift > config.invalidate_mid_drift_usd {
                return None;
            }
        }
        Some(snapshot)
    }

    pub fn store(&mut self, snapshot: StructureSnapshot, now_ms: i64, mid: Price, epoch: u64) {
        self.snapshot = Some(snapshot);
        self.built_at_ms = now_ms;
        self.mid_at_build = Some(mid);
        self.epoch_at_build = epoch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rails() -> Rails {
        Rails {
            upper: Price::new(dec!(110000)),
            lower: Price::new(dec!(100000)),
        }
    }

    #[test]
    fn channel_t_midpoint_is_half() {
        let r = rails();
        assert_eq!(r.channel_t(Price::new(dec!(105000))), dec!(0.5));
    }

    #[test]
    fn build_rails_rejects_not_ready() {
        let bar = BarRange {
            high: Price::new(dec!(110000)),
            low: Price::new(dec!(100000)),
            ready: false,
        };
        assert!(build_rails(bar).is_err());
    }

    #[test]
    fn build_rails_ok_when_ready() {
        let bar = BarRange {
            high: Price::new(dec!(110000)),
            low: Price::new(dec!(100000)),
            ready: true,
        };
        let (rails, source) = build_rails(bar).unwrap();
        assert_eq!(rails.span(), dec!(10000));
        assert_eq!(source, StructureSource::Bar1hRange);
    }

    #[test]
    fn sr_clusters_merge_nearby_levels_and_sort_by_distance() {
        let rails = rails();
        let mid = Price::new(dec!(100050));
        let levels = vec![
            RawLevel {
                price: Price::new(dec!(102000)),
                notional_usd: dec!(10000),
            },
            RawLevel {
                price: Price::new(dec!(102005)),
                notional_usd: dec!(5000),
            },
            RawLevel {
                price: Price::new(dec!(108000)),
                notional_usd: dec!(1000),
            },
        ];
        let config = StructureConfig::default();
        let view = build_sr_clusters(rails, mid, &levels, &config);

        // the two close levels (102000/102005, within 10 usd) merge into one
        assert_eq!(view.cluster_count, 2);
        assert_eq!(view.clusters[0].notional_usd, dec!(15000));
    }

    #[test]
    fn cache_invalidates_on_mid_drift() {
        let mut cache = StructureCache::new();
        let config = StructureConfig::default();
        let snapshot = StructureSnapshot {
            rails: rails(),
            span: dec!(10000),
            source: StructureSource::Bar1hRange,
            quality: dec!(0.8),
            hash: 1,
            basis: "bar1h_range".into(),
            version: 1,
            candidates: vec![],
        };
        cache.store(snapshot, 1_000, Price::new(dec!(100000)), 1);
        assert!(cache
            .get_if_fresh(1_500, Price::new(dec!(100000)), 1, &config)
            .is_some());
        // drift beyond invalidate_mid_drift_usd invalidates
        assert!(cache
            .get_if_fresh(1_500, Price::new(dec!(100010)), 1, &config)
            .is_none());
    }

    #[test]
    fn cache_invalidates_on_epoch_change() {
        let mut cache = StructureCache::new();
        let config = StructureConfig::default();
        let snapshot = StructureSnapshot {
            rails: rails(),
            span: dec!(10000),
            source: StructureSource::Bar1hRange,
            quality: dec!(0.8),
            hash: 1,
            basis: "bar1h_range".into(),
            version: 1,
            candidates: vec![],
        };
        cache.store(snapshot, 1_000, Price::new(dec!(100000)), 1);
        assert!(cache
            .get_if_fresh(1_500, Price::new(dec!(100000)), 2, &config)
            .is_none());
    }
}
