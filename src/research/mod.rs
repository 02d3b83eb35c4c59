//! Parameter sweeps over force-directed layouts.
//!
//! A research run takes lists of link strengths, charges and graph classes,
//! fetches sample graphs for every class, lays out every combination and
//! scores each settled layout with a set of [`Metric`]s.
//!
//! ```no_run
//! use force_layout_research::research::{GraphSpec, Research, ResearchSettings};
//!
//! # async fn run() -> Result<(), force_layout_research::research::ResearchError> {
//! let settings = ResearchSettings {
//! 	link_strengths: vec![0.1, 0.5],
//! 	charges: vec![-30.0],
//! 	graphs: vec![GraphSpec::new(10, 15)],
//! 	..Default::default()
//! };
//! let results = Research::new(settings)?.run().await?;
//! # let _ = results;
//! # Ok(())
//! # }
//! ```

mod combinations;
mod error;
mod experiment;
mod export;
mod graph;
pub mod metrics;
mod settings;
mod source;
mod time;

pub use combinations::{CartesianProduct, combinations};
pub use error::{MetricError, ResearchError, SimulationError, SourceError};
pub use experiment::{
	Configuration, MetricValue, Research, TestProgress, TestResult, TestSettings, TestStatus,
	build_configurations,
};
pub use export::{results_to_json, results_to_tsv};
pub use graph::{Edge, Graph, Node, Position, Segment};
pub use metrics::{Metric, MetricFn};
pub use settings::{Bounds, GraphSpec, PartialSettings, ResearchSettings, TimeoutPolicy};
pub use source::{
	EdgeList, GraphSource, HttpGraphSource, IndexBase, RandomGraphSource, StaticGraphSource,
	parse_edge_lists,
};
pub use time::{BrowserTime, TimeError, TimeProvider, timeout};
