pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::AppConfig;
pub use error::{FlowError, Result};
pub use event::EventBus;
pub use types::*;
