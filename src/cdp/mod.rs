//! Chrome DevTools Protocol client
//!
//! Just enough CDP to launch Chrome, open a page, install the override
//! script on new documents and read values back.

pub mod connection;
pub mod transport;
pub mod types;

pub use connection::{Connection, Session};
pub use transport::{launch_chrome, Transport};
