// Adapters layer: concrete implementations for external systems.

pub mod dto;
pub mod http;

pub use http::HttpJokeApi;
