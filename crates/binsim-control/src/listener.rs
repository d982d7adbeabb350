//! UDP listener thread

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use binsim_engine::{FilterSelectionTable, SoundLoader, StopHandle};

use crate::message::{ControlMessage, decode_datagram};
use crate::{ControlError, ControlResult};

/// How often the listener wakes up to check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Largest datagram accepted
const MAX_PACKET_SIZE: usize = 65536;

/// Engine handles the listener writes to
pub struct ControlTargets {
    pub selection: Arc<FilterSelectionTable>,
    /// `None` when the source cannot change sound files
    pub loader: Option<SoundLoader>,
    pub stop: StopHandle,
}

impl ControlTargets {
    /// Apply one decoded message
    pub fn apply(&mut self, message: ControlMessage) -> ControlResult<()> {
        match message {
            ControlMessage::SetFilter { channel, key } => {
                log::debug!("Channel {}: filter {}", channel, key);
                self.selection.set(channel, key)?;
            }
            ControlMessage::LoadSoundFiles(list) => match self.loader.as_mut() {
                Some(loader) => {
                    log::info!("Loading sound files: {}", list);
                    loader.load(&list)?;
                }
                None => log::warn!("Sound file change not supported, ignoring {}", list),
            },
            ControlMessage::Stop => {
                log::info!("Stop requested over OSC");
                self.stop.request_stop();
            }
        }
        Ok(())
    }
}

/// OSC listener running on its own thread
///
/// The thread stops when the listener is dropped.
pub struct ControlListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ControlListener {
    /// Bind `host:port` and start listening
    pub fn spawn(host: &str, port: u16, targets: ControlTargets) -> ControlResult<Self> {
        let addr = format!("{host}:{port}");
        let socket = UdpSocket::bind(&addr).map_err(|source| ControlError::Bind {
            addr: addr.clone(),
            source,
        })?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let handle = thread::Builder::new()
            .name("binsim-osc".into())
            .spawn({
                let running = Arc::clone(&running);
                move || listen(socket, running, targets)
            })?;

        log::info!("OSC listener on {}", local_addr);
        Ok(Self {
            local_addr,
            running,
            handle: Some(handle),
        })
    }

    /// Address actually bound (resolves port 0)
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("OSC listener thread panicked");
            }
            log::info!("OSC listener stopped");
        }
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listen(socket: UdpSocket, running: Arc<AtomicBool>, mut targets: ControlTargets) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    while running.load(Ordering::Acquire) {
        let (size, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                if let Some(loader) = targets.loader.as_mut() {
                    loader.collect_garbage();
                }
                continue;
            }
            Err(e) => {
                log::error!("OSC socket error: {}", e);
                break;
            }
        };

        let messages = match decode_datagram(&buf[..size], from) {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("{}", e);
                continue;
            }
        };

        for message in messages {
            if let Err(e) = targets.apply(message) {
                log::warn!("Control message from {} failed: {}", from, e);
            }
        }
    }

    running.store(false, Ordering::Release);
}
