//! binsim-control: OSC control for BinSim
//!
//! A UDP listener thread decodes OSC packets and forwards them to the
//! engine's control-thread handles:
//!
//! | Address            | Arguments                 | Effect                          |
//! |--------------------|---------------------------|---------------------------------|
//! | `/binsim/filter`   | `i` channel, key values…  | select a filter for a channel   |
//! | `/binsim/soundfile`| `s` `#`-separated paths   | decode and play a new playlist  |
//! | `/binsim/stop`     |                           | stop rendering                  |
//!
//! Bundles are unpacked recursively.

mod error;
mod listener;
mod message;

pub use error::{ControlError, ControlResult};
pub use listener::{ControlListener, ControlTargets};
pub use message::{
    ControlMessage, FILTER_ADDRESS, SOUNDFILE_ADDRESS, STOP_ADDRESS, decode_datagram,
    decode_message, decode_packet,
};
