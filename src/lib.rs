pub mod chat;
pub mod citations;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod http;
pub mod logger;
pub mod matcher;
pub mod pipeline;
pub mod reason;
pub mod respond;
pub mod search;
pub mod stage;
pub mod telegram;
pub mod terminal;
pub mod testrunner;

pub use error::{GamalError, Result};
pub use pipeline::Pipeline;
