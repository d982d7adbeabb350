//! Sound sources feeding the render loop
//!
//! A [`SoundFilePlayer`] plays a [`Playlist`] of decoded files. New playlists
//! are decoded on the control thread by a [`SoundLoader`] and handed over
//! through a lock-free ring; the playlist they replace travels back through a
//! second ring so its buffers are freed off the render thread.

use std::path::{Path, PathBuf};

use rtrb::{Consumer, Producer, RingBuffer};

use binsim_core::{InputBlock, split_playlist};
use binsim_file::{AudioData, read_audio};

use crate::{EngineError, EngineResult};

// ═══════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════

/// Playlists waiting to be picked up by the render thread
const INCOMING_CAPACITY: usize = 4;

/// Replaced playlists waiting to be freed by the control thread
const OUTGOING_CAPACITY: usize = 8;

// ═══════════════════════════════════════════════════════════════════════════
// SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Multichannel input for the render loop
pub trait SoundSource: Send {
    /// Channels of the material currently playing
    fn channels(&self) -> usize;

    /// Fill `block` from the current position
    ///
    /// Returns the number of frames written. Anything short of
    /// `block.block_size()` means the source has ended.
    fn read_block(&mut self, block: &mut InputBlock) -> usize;

    /// Pick up pending source changes; called once per block before reading
    fn poll_swaps(&mut self) {}
}

impl<S: SoundSource + ?Sized> SoundSource for Box<S> {
    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn read_block(&mut self, block: &mut InputBlock) -> usize {
        (**self).read_block(block)
    }

    fn poll_swaps(&mut self) {
        (**self).poll_swaps()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PLAYLIST
// ═══════════════════════════════════════════════════════════════════════════

/// Decoded files played back to back
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<AudioData>,
}

impl Playlist {
    /// Playlist that plays nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode every file in order
    ///
    /// Tracks with more than `max_channels` channels are truncated. Files at
    /// a different sample rate are played unconverted.
    pub fn load<P: AsRef<Path>>(
        paths: &[P],
        max_channels: usize,
        sample_rate: u32,
    ) -> EngineResult<Self> {
        let mut tracks = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let audio = read_audio(path)?;
            if audio.sample_rate != sample_rate {
                log::warn!(
                    "{} is {} Hz, session runs at {} Hz",
                    path.display(),
                    audio.sample_rate,
                    sample_rate
                );
            }
            log::info!(
                "Loaded sound file {} ({} ch, {:.2} s)",
                path.display(),
                audio.num_channels(),
                audio.duration()
            );
            tracks.push(audio);
        }
        Ok(Self::from_audio(tracks, max_channels))
    }

    /// Build from decoded audio
    pub fn from_audio(tracks: Vec<AudioData>, max_channels: usize) -> Self {
        let tracks = tracks
            .into_iter()
            .filter(|track| track.num_frames() > 0)
            .map(|mut track| {
                if track.num_channels() > max_channels {
                    log::warn!(
                        "Sound file has {} channels, only the first {} are rendered",
                        track.num_channels(),
                        max_channels
                    );
                    track.channels.truncate(max_channels);
                }
                track
            })
            .collect();
        Self { tracks }
    }

    /// True when there is nothing to play
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn tracks(&self) -> &[AudioData] {
        &self.tracks
    }

    /// Total frames across all tracks
    pub fn total_frames(&self) -> usize {
        self.tracks.iter().map(AudioData::num_frames).sum()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PLAYER (render thread)
// ═══════════════════════════════════════════════════════════════════════════

/// Plays a playlist block by block
///
/// An empty playlist is idle: it reports zero channels and delivers full
/// silent blocks until a new playlist arrives. A non-looping playlist ends
/// with a short read after its last frame.
pub struct SoundFilePlayer {
    playlist: Playlist,
    track: usize,
    frame: usize,
    looping: bool,
    finished: bool,
    incoming: Option<Consumer<Playlist>>,
    outgoing: Option<Producer<Playlist>>,
}

impl SoundFilePlayer {
    pub fn new(playlist: Playlist, looping: bool) -> Self {
        Self {
            playlist,
            track: 0,
            frame: 0,
            looping,
            finished: false,
            incoming: None,
            outgoing: None,
        }
    }

    /// Player plus the handle that feeds it new playlists
    pub fn with_loader(
        playlist: Playlist,
        looping: bool,
        max_channels: usize,
        sample_rate: u32,
    ) -> (Self, SoundLoader) {
        let (to_player, incoming) = RingBuffer::new(INCOMING_CAPACITY);
        let (outgoing, returned) = RingBuffer::new(OUTGOING_CAPACITY);

        let mut player = Self::new(playlist, looping);
        player.incoming = Some(incoming);
        player.outgoing = Some(outgoing);

        let loader = SoundLoader {
            to_player,
            returned,
            max_channels,
            sample_rate,
        };
        (player, loader)
    }

    #[inline]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// True once a non-looping playlist has played its last frame
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn current(&self) -> Option<&AudioData> {
        self.playlist.tracks.get(self.track)
    }
}

impl SoundSource for SoundFilePlayer {
    fn channels(&self) -> usize {
        self.current().map_or(0, AudioData::num_channels)
    }

    fn read_block(&mut self, block: &mut InputBlock) -> usize {
        let block_size = block.block_size();
        block.clear();

        if self.playlist.is_empty() {
            return block_size;
        }
        if self.finished {
            return 0;
        }

        let mut written = 0;
        while written < block_size {
            let Some(track) = self.playlist.tracks.get(self.track) else {
                break;
            };

            let count = (track.num_frames() - self.frame).min(block_size - written);
            let channels = track.num_channels().min(block.channels());
            for (ch, samples) in track.channels.iter().enumerate().take(channels) {
                block.channel_mut(ch)[written..written + count]
                    .copy_from_slice(&samples[self.frame..self.frame + count]);
            }
            written += count;
            self.frame += count;

            if self.frame >= track.num_frames() {
                self.frame = 0;
                self.track += 1;
                if self.track >= self.playlist.tracks.len() {
                    if self.looping {
                        self.track = 0;
                    } else {
                        self.finished = true;
                        break;
                    }
                }
            }
        }
        written
    }

    fn poll_swaps(&mut self) {
        let (Some(incoming), Some(outgoing)) = (self.incoming.as_mut(), self.outgoing.as_mut())
        else {
            return;
        };

        // Only take a new playlist when the old one has somewhere to go
        while outgoing.slots() > 0 {
            let Ok(next) = incoming.pop() else {
                break;
            };
            let previous = std::mem::replace(&mut self.playlist, next);
            if outgoing.push(previous).is_err() {
                break;
            }
            self.track = 0;
            self.frame = 0;
            self.finished = false;
            log::debug!("Sound source switched playlist");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADER (control thread)
// ═══════════════════════════════════════════════════════════════════════════

/// Control-thread handle that decodes playlists for a [`SoundFilePlayer`]
pub struct SoundLoader {
    to_player: Producer<Playlist>,
    returned: Consumer<Playlist>,
    max_channels: usize,
    sample_rate: u32,
}

impl SoundLoader {
    /// Decode a `#`-separated list of files and queue it for playback
    pub fn load(&mut self, list: &str) -> EngineResult<()> {
        let paths: Vec<PathBuf> = split_playlist(list);
        if paths.is_empty() {
            return Err(EngineError::EmptyPlaylist);
        }
        let playlist = Playlist::load(&paths, self.max_channels, self.sample_rate)?;
        self.send(playlist)
    }

    /// Queue an already decoded playlist
    pub fn send(&mut self, playlist: Playlist) -> EngineResult<()> {
        self.collect_garbage();
        self.to_player
            .push(playlist)
            .map_err(|_| EngineError::SourceBusy)
    }

    /// Free playlists the player has replaced; returns how many
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while self.returned.pop().is_ok() {
            freed += 1;
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(channels: usize, frames: usize, offset: f64) -> AudioData {
        AudioData {
            channels: (0..channels)
                .map(|ch| {
                    (0..frames)
                        .map(|i| offset + (ch * 1000 + i) as f64)
                        .collect()
                })
                .collect(),
            sample_rate: 44100,
        }
    }

    #[test]
    fn test_reads_tracks_back_to_back() {
        let playlist = Playlist::from_audio(vec![ramp(1, 5, 0.0), ramp(1, 4, 100.0)], 2);
        let mut player = SoundFilePlayer::new(playlist, false);
        let mut block = InputBlock::new(2, 4);

        assert_eq!(player.read_block(&mut block), 4);
        assert_eq!(block.channel(0), &[0.0, 1.0, 2.0, 3.0]);

        assert_eq!(player.read_block(&mut block), 4);
        assert_eq!(block.channel(0), &[4.0, 100.0, 101.0, 102.0]);

        assert_eq!(player.read_block(&mut block), 1);
        assert_eq!(block.channel(0), &[103.0, 0.0, 0.0, 0.0]);
        assert!(player.is_finished());
        assert_eq!(player.read_block(&mut block), 0);
    }

    #[test]
    fn test_looping_wraps_around() {
        let playlist = Playlist::from_audio(vec![ramp(1, 3, 0.0)], 1);
        let mut player = SoundFilePlayer::new(playlist, true);
        let mut block = InputBlock::new(1, 4);

        assert_eq!(player.read_block(&mut block), 4);
        assert_eq!(block.channel(0), &[0.0, 1.0, 2.0, 0.0]);
        assert_eq!(player.read_block(&mut block), 4);
        assert_eq!(block.channel(0), &[1.0, 2.0, 0.0, 1.0]);
        assert!(!player.is_finished());
    }

    #[test]
    fn test_channels_clamped_to_maximum() {
        let playlist = Playlist::from_audio(vec![ramp(4, 8, 0.0)], 2);
        let player = SoundFilePlayer::new(playlist, false);
        assert_eq!(player.channels(), 2);
    }

    #[test]
    fn test_extra_block_channels_are_silent() {
        let playlist = Playlist::from_audio(vec![ramp(1, 8, 1.0)], 3);
        let mut player = SoundFilePlayer::new(playlist, false);
        let mut block = InputBlock::new(3, 4);
        block.channel_mut(2).fill(9.0);

        player.read_block(&mut block);
        assert!(block.channel(2).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_empty_playlist_is_idle() {
        let mut player = SoundFilePlayer::new(Playlist::empty(), false);
        let mut block = InputBlock::new(2, 8);
        assert_eq!(player.channels(), 0);
        assert_eq!(player.read_block(&mut block), 8);
        assert!(!player.is_finished());
    }

    #[test]
    fn test_loader_swaps_and_returns_old_playlist() {
        let (mut player, mut loader) =
            SoundFilePlayer::with_loader(Playlist::empty(), false, 2, 44100);
        let mut block = InputBlock::new(2, 2);

        loader
            .send(Playlist::from_audio(vec![ramp(2, 4, 10.0)], 2))
            .unwrap();
        assert_eq!(player.channels(), 0);

        player.poll_swaps();
        assert_eq!(player.channels(), 2);
        assert_eq!(player.read_block(&mut block), 2);
        assert_eq!(block.channel(1), &[1010.0, 1011.0]);

        assert_eq!(loader.collect_garbage(), 1);
    }

    #[test]
    fn test_swap_restarts_finished_player() {
        let (mut player, mut loader) = SoundFilePlayer::with_loader(
            Playlist::from_audio(vec![ramp(1, 1, 0.0)], 1),
            false,
            1,
            44100,
        );
        let mut block = InputBlock::new(1, 4);
        assert_eq!(player.read_block(&mut block), 1);
        assert!(player.is_finished());

        loader
            .send(Playlist::from_audio(vec![ramp(1, 8, 0.0)], 1))
            .unwrap();
        player.poll_swaps();
        assert!(!player.is_finished());
        assert_eq!(player.read_block(&mut block), 4);
    }

    #[test]
    fn test_loader_reports_full_ring() {
        let (_player, mut loader) =
            SoundFilePlayer::with_loader(Playlist::empty(), false, 1, 44100);
        for _ in 0..INCOMING_CAPACITY {
            loader.send(Playlist::empty()).unwrap();
        }
        assert!(matches!(
            loader.send(Playlist::empty()),
            Err(EngineError::SourceBusy)
        ));
    }

    #[test]
    fn test_loader_rejects_empty_list() {
        let (_player, mut loader) =
            SoundFilePlayer::with_loader(Playlist::empty(), false, 1, 44100);
        assert!(matches!(loader.load(" # "), Err(EngineError::EmptyPlaylist)));
    }

    #[test]
    fn test_loader_missing_file() {
        let (_player, mut loader) =
            SoundFilePlayer::with_loader(Playlist::empty(), false, 1, 44100);
        assert!(matches!(
            loader.load("does/not/exist.wav"),
            Err(EngineError::File(_))
        ));
    }
}
