pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::HttpJokeApi;
pub use config::toml_config::TomlConfig;
pub use self::core::{
    resilience::{PolicyRegistry, ResiliencePolicy},
    CategorySelection, Joke, JokeCategory, JokeGateway, ResilientJokeClient,
};
pub use domain::ports::{FallbackEvent, FallbackReporter, JokeApi, TracingFallbackReporter};
pub use utils::error::{ErrorCategory, JokeError, Result};
