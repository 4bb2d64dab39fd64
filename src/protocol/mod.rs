//! Line-framed wire protocol
//!
//! ```text
//! publisher  ──► PUB <topic> <len>\n<payload>
//! subscriber ──► SUB <topic>\n
//! subscriber ◄── <payload>                    (DeliveryFraming::Raw)
//! subscriber ◄── <u32 BE len><payload>        (DeliveryFraming::LengthPrefixed)
//! ```
//!
//! Header lines end in `\n`; a trailing `\r` is stripped. Payloads are opaque
//! and carried as `bytes::Bytes` so fan-out to many subscribers shares one
//! allocation.

pub mod codec;
pub mod constants;
pub mod error;
pub mod frame;

pub use codec::{encode_delivery, DeliveryFraming, FrameReader};
pub use error::ProtocolError;
pub use frame::{parse_frame, Frame};
