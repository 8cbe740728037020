pub mod framer;
#[cfg(feature = "embedded")]
pub mod jtag;
pub mod link;
pub mod traits;

pub use framer::{FrameDecoder, RequestType, ResponseType, SerialRequest};
pub use link::SerialLink;
pub use traits::{SerialError, SerialPort};
