//! Dash Packet Protocol
//!
//! This crate reassembles the engine controller's 176-byte dash packet from a
//! run of 8-byte bus frames, validates the trailing CRC32 and decodes the
//! fixed-offset, big-endian scaled channels.

mod assembler;
mod error;
mod frame;
mod gear;
mod packet;
mod sim;
mod status;

pub use assembler::{AssemblerStats, PacketAssembler};
pub use error::ProtocolError;
pub use frame::RawFrame;
pub use gear::GearPosition;
pub use packet::{
    checksum, decode_packet, encode_packet, split_frames, Channel, DecodedFrame, EngineChannels,
};
pub use sim::SimulatedBus;
pub use status::{
    BatteryStatus, FuelPressStatus, OilPressStatus, OilTempStatus, RpmStatus, WaterTempStatus,
};

/// Packet layout constants
pub mod layout {
    /// Arbitration id the dash packet is transmitted on
    pub const DEFAULT_CAN_ID: u32 = 0xE8;
    /// Fixed header opening every packet
    pub const HEADER: [u8; 3] = [0x82, 0x81, 0x80];
    /// Length byte written at offset 3
    pub const LENGTH_BYTE: u8 = 84;
    /// Total packet size including CRC
    pub const PACKET_SIZE: usize = 176;
    /// Bytes covered by the CRC
    pub const CRC_OFFSET: usize = 172;
    /// Payload bytes per bus frame
    pub const FRAME_PAYLOAD: usize = 8;
    /// Frames per packet
    pub const FRAMES_PER_PACKET: usize = PACKET_SIZE / FRAME_PAYLOAD;
}
