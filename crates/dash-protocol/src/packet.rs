//! Dash Packet Channel Definitions and Decoding
//!
//! Defines the fixed byte offsets and scale factors of the channels carried in
//! the 176-byte packet. Every channel is a big-endian u16.

use crate::error::ProtocolError;
use crate::frame::RawFrame;
use crate::layout::{CRC_OFFSET, FRAME_PAYLOAD, HEADER, LENGTH_BYTE, PACKET_SIZE};
use serde::{Deserialize, Serialize};

/// Channels decoded from the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Engine speed (rpm, x1)
    Rpm,
    /// Throttle position (%, x0.1)
    Throttle,
    /// Engine water temperature (°C, x0.1)
    WaterTemp,
    /// Fuel pressure (kPa, x0.1)
    FuelPressure,
    /// Oil temperature (°C, x0.1)
    OilTemp,
    /// Oil pressure (x0.1)
    OilPressure,
    /// Gear-sense voltage (V, x0.01)
    GearVoltage,
    /// Battery voltage (V, x0.01)
    BatteryVoltage,
    /// Running fuel-used counter (raw counts)
    FuelUsedRaw,
    /// Injector effective pulse width (µs, x0.5)
    EffectivePulseWidth,
}

impl Channel {
    /// All channels in packet order
    pub const ALL: [Channel; 10] = [
        Channel::Rpm,
        Channel::Throttle,
        Channel::WaterTemp,
        Channel::FuelPressure,
        Channel::OilTemp,
        Channel::OilPressure,
        Channel::GearVoltage,
        Channel::BatteryVoltage,
        Channel::FuelUsedRaw,
        Channel::EffectivePulseWidth,
    ];

    /// Byte offset of the channel's u16
    pub fn offset(&self) -> usize {
        match self {
            Channel::Rpm => 4,
            Channel::Throttle => 6,
            Channel::WaterTemp => 12,
            Channel::FuelPressure => 24,
            Channel::OilTemp => 26,
            Channel::OilPressure => 28,
            Channel::GearVoltage => 30,
            Channel::BatteryVoltage => 48,
            Channel::FuelUsedRaw => 92,
            Channel::EffectivePulseWidth => 112,
        }
    }

    /// Raw counts per physical unit
    pub fn divisor(&self) -> f64 {
        match self {
            Channel::Rpm | Channel::FuelUsedRaw => 1.0,
            Channel::EffectivePulseWidth => 2.0,
            Channel::GearVoltage | Channel::BatteryVoltage => 100.0,
            _ => 10.0,
        }
    }

    /// Read the raw u16 for this channel
    pub fn read_raw(&self, packet: &[u8]) -> Option<u16> {
        let at = self.offset();
        let bytes = packet.get(at..at + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read and scale to physical units
    pub fn read(&self, packet: &[u8]) -> Option<f64> {
        self.read_raw(packet).map(|raw| raw as f64 / self.divisor())
    }

    /// Scale a physical value back to the raw u16, saturating at the type bounds
    pub fn to_raw(&self, value: f64) -> u16 {
        (value * self.divisor()).round().clamp(0.0, u16::MAX as f64) as u16
    }
}

/// Physical channel values carried by one packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineChannels {
    /// Engine speed (rpm)
    pub rpm: u16,
    /// Throttle position (%)
    pub throttle: f64,
    /// Water temperature (°C)
    pub water_temp: f64,
    /// Oil temperature (°C)
    pub oil_temp: f64,
    /// Oil pressure
    pub oil_press: f64,
    /// Fuel pressure
    pub fuel_pressure: f64,
    /// Gear-sense voltage (V)
    pub gear_voltage: f64,
    /// Battery voltage (V)
    pub battery_voltage: f64,
    /// Fuel-used counter, unscaled
    pub fuel_used_raw: u16,
    /// Injector effective pulse width (µs)
    pub effective_pulse_width_us: f64,
}

impl EngineChannels {
    fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Rpm => self.rpm as f64,
            Channel::Throttle => self.throttle,
            Channel::WaterTemp => self.water_temp,
            Channel::FuelPressure => self.fuel_pressure,
            Channel::OilTemp => self.oil_temp,
            Channel::OilPressure => self.oil_press,
            Channel::GearVoltage => self.gear_voltage,
            Channel::BatteryVoltage => self.battery_voltage,
            Channel::FuelUsedRaw => self.fuel_used_raw as f64,
            Channel::EffectivePulseWidth => self.effective_pulse_width_us,
        }
    }
}

/// A validated packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// Decoded channels
    pub channels: EngineChannels,
    /// Seconds since the previous validated packet (0 for the first)
    pub delta_t: f64,
}

/// CRC32 (IEEE) over the given bytes
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Validate and decode a full packet. `delta_t` is left at 0.
pub fn decode_packet(packet: &[u8]) -> Result<DecodedFrame, ProtocolError> {
    if packet.len() < PACKET_SIZE {
        return Err(ProtocolError::ShortPacket {
            len: packet.len(),
            needed: PACKET_SIZE,
        });
    }
    if !packet.starts_with(&HEADER) {
        return Err(ProtocolError::MissingHeader);
    }

    let trailer = &packet[CRC_OFFSET..PACKET_SIZE];
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = checksum(&packet[..CRC_OFFSET]);
    if expected != actual {
        return Err(ProtocolError::CrcMismatch { expected, actual });
    }

    let read = |channel: Channel| channel.read(packet).unwrap_or_default();
    let channels = EngineChannels {
        rpm: Channel::Rpm.read_raw(packet).unwrap_or_default(),
        throttle: read(Channel::Throttle),
        water_temp: read(Channel::WaterTemp),
        oil_temp: read(Channel::OilTemp),
        oil_press: read(Channel::OilPressure),
        fuel_pressure: read(Channel::FuelPressure),
        gear_voltage: read(Channel::GearVoltage),
        battery_voltage: read(Channel::BatteryVoltage),
        fuel_used_raw: Channel::FuelUsedRaw.read_raw(packet).unwrap_or_default(),
        effective_pulse_width_us: read(Channel::EffectivePulseWidth),
    };

    Ok(DecodedFrame {
        channels,
        delta_t: 0.0,
    })
}

/// Build a complete packet, CRC included
pub fn encode_packet(channels: &EngineChannels) -> [u8; PACKET_SIZE] {
    let mut packet = [0u8; PACKET_SIZE];
    packet[..HEADER.len()].copy_from_slice(&HEADER);
    packet[HEADER.len()] = LENGTH_BYTE;

    for channel in Channel::ALL {
        let at = channel.offset();
        let raw = channel.to_raw(channels.get(channel));
        packet[at..at + 2].copy_from_slice(&raw.to_be_bytes());
    }

    let crc = checksum(&packet[..CRC_OFFSET]);
    packet[CRC_OFFSET..].copy_from_slice(&crc.to_be_bytes());
    packet
}

/// Split a packet into 8-byte bus frames
pub fn split_frames(packet: &[u8], arbitration_id: u32) -> Vec<RawFrame> {
    packet
        .chunks(FRAME_PAYLOAD)
        .map(|chunk| RawFrame {
            arbitration_id,
            payload: chunk.to_vec(),
        })
        .collect()
}
