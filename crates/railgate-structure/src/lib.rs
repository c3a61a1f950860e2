//! Structure snapshot builder: derives channel rails and a ranked
//! support/resistance cluster map, cached per tick.

pub mod error;
pub mod snapshot;

pub use error::{Result, StructureError};
pub use snapshot::{
    build_rails, build_sr_clusters, BarRange, MapStatus, Rails, RawLevel, SrCluster,
    SrClusterType, SrClusterView, StructureCache, StructureConfig, StructureSnapshot,
    StructureSource,
};
