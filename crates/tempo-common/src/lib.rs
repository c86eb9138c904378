pub mod error;
pub mod protocol;
pub mod request;

pub use error::{DispatchError, ServiceError};
pub use protocol::{Feature, Product, TabHandle};
pub use request::CapturedRequest;
