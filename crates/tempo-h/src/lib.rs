pub mod cdp;
pub mod page;

pub use cdp::CdpClient;
pub use page::CdpPageContext;
