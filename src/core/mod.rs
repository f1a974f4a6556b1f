pub mod joke_client;
pub mod resilience;

pub use crate::domain::model::{Joke, JokeCategory};
pub use crate::domain::ports::{FallbackReporter, JokeApi, JokeGateway};
pub use crate::utils::error::Result;
pub use joke_client::{CategorySelection, ResilientJokeClient};
