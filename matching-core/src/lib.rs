pub mod engine;

pub mod prelude {
    pub use super::engine::book::*;
    pub use super::engine::config::*;
    pub use super::engine::csv::*;
    pub use super::engine::drain::*;
    pub use super::engine::error::*;
    pub use super::engine::matching::*;
    pub use super::engine::ring::*;
    pub use super::engine::trace::*;
    pub use super::engine::types::*;
}
