pub mod describe;
pub mod similarity;
pub mod spatial_index;

pub use describe::{describe_percentile, summary_markdown};
pub use similarity::{ComparisonIndex, Ranked, Series, SimilarityRanker};
pub use spatial_index::{Neighbor, SpatialIndex};
