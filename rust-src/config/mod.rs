//! Configuration for collection runs and the snapshot store.

mod settings;

pub use settings::{
    default_store_path,
    ConfigError,
    RunConfig,
    SourceConfig,
    DEFAULT_MODE,
};
