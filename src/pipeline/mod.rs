//! Pipeline components: walk thread, hashing pool, error sink, and the wiring between them.

pub mod context;
pub mod error_sink;
pub mod metadata;
pub mod orchestrator;
pub mod walk;

pub use context::{
    PipelineChannels, PipelineContext, PipelineHandles, PipelineTuning, create_pipeline_channels,
};
pub use error_sink::{ErrorSink, drain_faults, spawn_log_writer};
pub use metadata::{path_to_record, spawn_hashing_workers};
pub use orchestrator::{run_pipeline, setup_pipeline_root_and_tuning, shutdown_pipeline_handles};
pub use walk::{WalkOutcome, run_walk_loop, spawn_walk_thread, to_outcome_walkdir};
