//! biolink transport layer
//!
//! Byte sources for the biolink decoder:
//! - Serial (USB dongle or direct board connection)
//! - Any async reader (capture replay, in-memory buffers)
//! - Event channels (simulators, tests)
//!
//! [`PacketStream`] ties a source to a [`biolink_core::PacketDecoder`].

pub mod error;
pub mod reader;
pub mod serial;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use reader::ReaderSource;
pub use serial::{
    start_streaming, SerialConfig, SerialFlowControl, SerialParity, SerialReceiver, SerialSender,
    SerialSource,
};
pub use stream::PacketStream;
pub use traits::{ByteSource, CommandSink, SourceEvent};
