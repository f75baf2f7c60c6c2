pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod server;
pub mod store;

pub use error::{GraphError, GraphResult};
pub use models::{GraphData, GraphStats, Link, Node};
pub use normalize::{normalize, NormalizeOptions, Scope};
pub use server::AppState;
