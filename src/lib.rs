#![doc = "Gerrymetrics public API"]
mod apportion;
mod config;
mod error;
mod geom;
mod index;
mod layer;
mod metrics;
mod report;
mod types;

pub mod io;

#[doc(inline)]
pub use types::{GeoId, GeoType, Party, Population, Race, VoterTally};

#[doc(inline)]
pub use geom::{overlap_fraction, repair, Crs, OverlapRecord, SnapThresholds};

#[doc(inline)]
pub use layer::{AreaLayer, BlockLayer, DistrictLayer, PrecinctLayer};

#[doc(inline)]
pub use apportion::{apportion, Apportionment, BlockVoteTable, BlockVotes, PrecinctStatus, PrecinctSummary, VoteShare};

#[doc(inline)]
pub use index::{PopulationIndex, WeightedPoint};

#[doc(inline)]
pub use metrics::{
    compute_metrics, compute_opd, compute_udm, shannon_entropy,
    BlockMetrics, Dislocation, DislocationRecord, Fragment, Fragments, GroupCounts, MetricsOutput, UdmRecord,
};

#[doc(inline)]
pub use config::{ApportionConfig, Config, MetricsConfig};

#[doc(inline)]
pub use error::{DislocationError, GeometryError};

#[doc(inline)]
pub use report::{FailureKind, StageReport};
