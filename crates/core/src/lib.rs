pub mod compositor;
pub mod config;
pub mod fetcher;
pub mod job;
pub mod metrics;
pub mod partition;
pub mod testing;

pub use compositor::{
    CommandCompositor, CommandCompositorFactory, CompositionError, CompositorFactory,
    CompositorGuard, ProgressCallback, SheetCompositor,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheConfig, CompositorConfig, Config,
    ConfigError, FetcherConfig, JobConfig, SanitizedConfig, ServerConfig,
};
pub use fetcher::{
    CachedImageSource, FetchError, HttpImageSource, ImageBytes, ImageCache, ImageFetcher,
    ImageSource,
};
pub use job::{
    CardRequest, JobError, JobPhase, JobSummary, PrintJobRequest, PrintJobRunner, StatusEvent,
};
pub use partition::{job_size, partition, Partition, Run};
