// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod batch;
pub mod config;
pub mod gateway;
pub mod interpret;
pub mod normalize;
pub mod process;
pub mod rubric;
pub mod sink;

// ---- Re-exports for stable public API ----
pub use crate::batch::{BatchAggregator, BatchSummary, OutputTable};
pub use crate::config::{GatewayConfig, PipelineConfig};
pub use crate::gateway::{build_gateway, MockGateway, ModelGateway, OpenAiGateway, SharedGateway};
pub use crate::interpret::{Interpretation, Verdict};
pub use crate::process::{ArticleProcessor, ProcessedArticle, RawArticle};
pub use crate::rubric::ConfidenceLevel;
pub use crate::sink::{tracing_sink, EventSink, MemorySink, SharedSink, SinkLevel};
