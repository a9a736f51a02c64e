pub mod error;
pub mod explorer;
pub mod export;
pub mod http;
pub mod logging;
pub mod memory;
pub mod model;
pub mod search;
pub mod service;
pub mod tree;
pub mod view;

pub use error::{Error, Result, ValidationError};
pub use explorer::*;
pub use model::*;
pub use service::*;
pub use tree::{flatten, DocumentTree};
pub use view::*;
