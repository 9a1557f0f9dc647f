//! Raw bus frames

use crate::error::ProtocolError;
use crate::layout::FRAME_PAYLOAD;
use serde::{Deserialize, Serialize};

/// One frame as delivered by the bus transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Arbitration id
    pub arbitration_id: u32,
    /// Payload, at most 8 bytes
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Create a frame, rejecting payloads longer than 8 bytes
    pub fn new(arbitration_id: u32, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > FRAME_PAYLOAD {
            return Err(ProtocolError::OversizedFrame(payload.len()));
        }
        Ok(Self {
            arbitration_id,
            payload: payload.to_vec(),
        })
    }

    /// Whether the payload opens with the given header
    pub fn starts_with(&self, header: &[u8]) -> bool {
        self.payload.starts_with(header)
    }
}
