pub mod clock;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod ids;
pub mod payload;
pub mod service;
pub mod store;

pub use tempo_common::error;
pub use tempo_common::protocol;
pub use tempo_common::request;
