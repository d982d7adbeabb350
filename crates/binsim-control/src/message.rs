//! OSC message decoding

use std::net::SocketAddr;

use rosc::{OscMessage, OscPacket, OscType};

use binsim_core::{FilterKey, KeyComponent};

use crate::{ControlError, ControlResult};

pub const FILTER_ADDRESS: &str = "/binsim/filter";
pub const SOUNDFILE_ADDRESS: &str = "/binsim/soundfile";
pub const STOP_ADDRESS: &str = "/binsim/stop";

/// A decoded control request
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Select the filter `key` for input channel `channel`
    SetFilter { channel: usize, key: FilterKey },
    /// Play a new `#`-separated list of sound files
    LoadSoundFiles(String),
    /// Stop rendering after the current block
    Stop,
}

/// Decode one UDP datagram
///
/// Messages inside the packet that fail to decode are logged and skipped;
/// only an undecodable packet is an error.
pub fn decode_datagram(data: &[u8], from: SocketAddr) -> ControlResult<Vec<ControlMessage>> {
    let (_, packet) = rosc::decoder::decode_udp(data).map_err(|e| ControlError::Packet {
        from,
        reason: format!("{e:?}"),
    })?;

    let mut messages = Vec::new();
    decode_packet(packet, &mut messages);
    Ok(messages)
}

/// Flatten a packet, recursing into bundles
pub fn decode_packet(packet: OscPacket, out: &mut Vec<ControlMessage>) {
    match packet {
        OscPacket::Message(msg) => match decode_message(&msg) {
            Ok(message) => out.push(message),
            Err(e) => log::warn!("Dropping OSC message: {}", e),
        },
        OscPacket::Bundle(bundle) => {
            for content in bundle.content {
                decode_packet(content, out);
            }
        }
    }
}

/// Decode a single OSC message
pub fn decode_message(msg: &OscMessage) -> ControlResult<ControlMessage> {
    log::debug!("OSC message: {} with {} args", msg.addr, msg.args.len());

    match msg.addr.as_str() {
        FILTER_ADDRESS => decode_filter(msg),
        SOUNDFILE_ADDRESS => match msg.args.as_slice() {
            [OscType::String(list)] => Ok(ControlMessage::LoadSoundFiles(list.clone())),
            _ => Err(malformed(msg, "expects a single string argument")),
        },
        STOP_ADDRESS => Ok(ControlMessage::Stop),
        _ => Err(ControlError::UnknownAddress(msg.addr.clone())),
    }
}

fn decode_filter(msg: &OscMessage) -> ControlResult<ControlMessage> {
    let Some((first, values)) = msg.args.split_first() else {
        return Err(malformed(msg, "missing channel argument"));
    };

    let channel = match first {
        OscType::Int(v) if *v >= 0 => *v as usize,
        OscType::Long(v) if *v >= 0 => *v as usize,
        other => return Err(malformed(msg, &format!("invalid channel {other:?}"))),
    };
    if values.is_empty() {
        return Err(malformed(msg, "missing filter key values"));
    }

    let key = values
        .iter()
        .map(|arg| {
            key_component(arg)
                .ok_or_else(|| malformed(msg, &format!("unsupported key value {arg:?}")))
        })
        .collect::<ControlResult<FilterKey>>()?;

    Ok(ControlMessage::SetFilter { channel, key })
}

fn key_component(arg: &OscType) -> Option<KeyComponent> {
    match arg {
        OscType::Int(v) => Some(KeyComponent::Int(*v as i64)),
        OscType::Long(v) => Some(KeyComponent::Int(*v)),
        OscType::Float(v) => Some(KeyComponent::from_f64(*v as f64)),
        OscType::Double(v) => Some(KeyComponent::from_f64(*v)),
        OscType::String(s) => Some(KeyComponent::parse(s)),
        _ => None,
    }
}

fn malformed(msg: &OscMessage, reason: &str) -> ControlError {
    ControlError::Malformed {
        addr: msg.addr.clone(),
        reason: reason.to_string(),
    }
}
