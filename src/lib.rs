//! SetuLink - framed protocol bridge between a microcontroller and a
//! publish/subscribe host.
//!
//! This library terminates a small checksummed frame protocol on a byte
//! link (UART, USB-CDC, TCP), demultiplexes inbound frames to topic
//! subscribers and the parameter client, and serializes outbound
//! publications, topic negotiation and the periodic time-sync handshake.
//! Everything runs single-threaded and cooperatively: [`Node::spin`] is
//! the one scheduling point.
//!
//! The same engine serves both ends of the link; the device side runs the
//! mirror image over an identical wire format.

pub mod clock;
pub mod config;
pub mod error;
pub mod messages;
pub mod node;
pub mod protocol;
pub mod registry;
mod sync;
pub mod transport;

// Re-export commonly used types
pub use error::{Error, Result};
pub use node::Node;
pub use registry::Publisher;
pub use sync::LinkState;
