//! HTTP layer: URL construction, the transport seam and response buffering.
//!
//! Only [`transport`] and [`buffer`] types are re-exported from the crate
//! root; the rest are implementation details.

pub mod buffer;
pub(crate) mod common;
pub(crate) mod error_helpers;
pub(crate) mod loud_wire;
pub mod transport;
