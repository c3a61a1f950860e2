//! Wires the bar tracker's output into `railgate_structure`'s
//! cache-or-rebuild cycle (§4.1). The cache only ever stores rails and
//! the raw candidate levels — cluster assignment depends on the
//! current mid, so `build_sr_clusters` always reruns against whichever
//! candidates are in hand, cached or freshly built.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;

use railgate_core::{MarketTick, Price};
use railgate_structure::{
    build_rails, build_sr_clusters, BarRange, Rails, RawLevel, SrClusterView, StructureConfig,
    StructureSnapshot,
};

use crate::state::EngineState;

fn snapshot_hash(rails: Rails, candidate_count: usize, version: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    rails.upper.inner().to_string().hash(&mut hasher);
    rails.lower.inner().to_string().hash(&mut hasher);
    candidate_count.hash(&mut hasher);
    version.hash(&mut hasher);
    hasher.finish()
}

/// Returns the rails and cluster view to drive this tick's decision, or
/// `None` when the bar range isn't ready yet (`no_local_channel`).
/// Rebuilds and re-caches the snapshot only when the cache has gone
/// stale by TTL, mid drift, or input epoch (§4.1 invalidation rules).
pub fn ensure_structure(
    state: &mut EngineState,
    tick: &MarketTick,
    bar_range: BarRange,
    raw_levels: &[RawLevel],
    config: &StructureConfig,
) -> Option<(Rails, SrClusterView, Decimal)> {
    if let Some(snapshot) = state
        .structure_cache
        .get_if_fresh(tick.timestamp_ms, tick.mid, tick.epoch, config)
    {
        let rails = snapshot.rails;
        let quality = snapshot.quality;
        let candidates = snapshot.candidates.clone();
        let sr_view = build_sr_clusters(rails, tick.mid, &candidates, config);
        return Some((rails, sr_view, quality));
    }

    let (rails, source) = build_rails(bar_range).ok()?;
    let sr_view = build_sr_clusters(rails, tick.mid, raw_levels, config);
    let version = state.next_structure_version();
    let quality = sr_view.map_strength;

    let snapshot = StructureSnapshot {
        rails,
        span: rails.span(),
        source,
        quality,
        hash: snapshot_hash(rails, raw_levels.len(), version),
        basis: format!("{source:?}"),
        version,
        candidates: raw_levels.to_vec(),
    };
    state
        .structure_cache
        .store(snapshot, tick.timestamp_ms, tick.mid, tick.epoch);

    Some((rails, sr_view, quality))
}

/// Coarse directional read from channel position alone, used only to
/// detect a reverse-side signal while a position is already open —
/// `decide_trade_b2` itself short-circuits on `has_open_position` so it
/// never reaches its own (gate-checked) side pick in that case.
#[must_use]
pub fn regime_side(
    rails: Rails,
    mid: Price,
    central_band_low: Decimal,
    central_band_high: Decimal,
) -> Option<railgate_core::Side> {
    let t = rails.channel_t(mid);
    if (central_band_low..=central_band_high).contains(&t) {
        return None;
    }
    if t < central_band_low {
        Some(railgate_core::Side::Buy)
    } else {
        Some(railgate_core::Side::Sell)
    }
}
