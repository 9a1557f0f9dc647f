//! Dash Protocol Error Types

use thiserror::Error;

/// Errors raised while validating or decoding a dash packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer shorter than a full packet
    #[error("Short packet: {len} bytes, need {needed}")]
    ShortPacket { len: usize, needed: usize },

    /// Buffer does not open with the packet header
    #[error("Packet header missing")]
    MissingHeader,

    /// CRC32 over the body does not match the trailer
    #[error("CRC mismatch: expected {expected:08X}, got {actual:08X}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Bus frame longer than 8 bytes
    #[error("Frame payload too long: {0} bytes")]
    OversizedFrame(usize),
}
