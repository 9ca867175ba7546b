pub mod checkpoint;
pub mod pipeline;
pub mod report;
pub mod summarizer;

pub use checkpoint::{CheckpointLock, CheckpointState, SkipReason, SkippedStation, SummaryArtifact};
pub use pipeline::{CheckpointedPipeline, PipelineOptions};
pub use report::{ParseFailure, PipelineReport};
pub use summarizer::{nearest_rank_index, quantiles, PercentileSummarizer};
