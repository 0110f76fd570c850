//! Material-distribution router protocol library
//!
//! This crate provides frame construction and parsing for the ASCII-framed
//! serial protocol spoken by a broadcast material-distribution crosspoint
//! router:
//!
//! - **Frames**: `STX + body + checksum`, where the body is a sequence of
//!   fixed-width ASCII fields terminated by ETX
//! - **Checksum**: XOR fold over every body byte (the "BBC" checksum)
//! - **Handshake**: the peer answers each frame with a single ACK or NAK
//!   byte; query frames are additionally answered with a full status frame
//!
//! # Frame layout
//!
//! ```text
//! STX  cmd(2)  flag(1)  "00"  "00"  dest(3)  source(3)  ETX  bbc
//! ```
//!
//! - Set request:      cmd `03`, flag `0`, source = requested source channel
//! - Query request:    cmd `10`, flag `0`, source field padded with `000`
//! - Status response:  cmd `10`, flag `1`, source = currently routed channel
//!
//! # Example
//!
//! ```rust
//! use rtr_protocol::{ChannelId, Frame, FrameKind};
//!
//! let dest = ChannelId::new("127").unwrap();
//! let source = ChannelId::new("128").unwrap();
//!
//! let frame = Frame::set(&dest, &source);
//! let parsed = Frame::parse(frame.as_bytes()).unwrap();
//!
//! assert_eq!(parsed.kind(), FrameKind::Set);
//! assert_eq!(parsed.destination(), dest);
//! assert_eq!(parsed.source(), source);
//! ```

pub mod channel;
pub mod codec;
pub mod control;
pub mod error;
pub mod frame;

pub use channel::ChannelId;
pub use codec::FrameCodec;
pub use control::{classify, ControlByte, WireByte};
pub use error::ParseError;
pub use frame::{checksum, Frame, FrameKind, FRAME_LEN};
