//! Session: everything built once at startup from the configuration

use std::sync::Arc;

use binsim_core::BinSimConfig;
use binsim_filter::FilterRepository;

use crate::render::{RenderLoop, StopHandle};
use crate::selection::FilterSelectionTable;
use crate::source::{Playlist, SoundFilePlayer, SoundLoader, SoundSource};
use crate::{EngineError, EngineResult};

/// A loaded BinSim session
///
/// Owns the filter repository and the selection table. Render loops and
/// control handles built from it share both through `Arc`s.
pub struct BinSim {
    config: BinSimConfig,
    repository: Arc<FilterRepository>,
    selection: Arc<FilterSelectionTable>,
    stop: StopHandle,
}

impl BinSim {
    /// Validate the configuration and load the filter list
    pub fn new(config: BinSimConfig) -> EngineResult<Self> {
        config.validate()?;
        let repository = FilterRepository::load(
            &config.filter_list,
            config.filter_size,
            config.block_size,
            config.sampling_rate,
        )?;
        Self::with_repository(config, repository)
    }

    /// Session around an already loaded repository
    ///
    /// Every channel starts on the repository's default key.
    pub fn with_repository(
        config: BinSimConfig,
        repository: FilterRepository,
    ) -> EngineResult<Self> {
        config.validate()?;
        if repository.block_size() != config.block_size {
            return Err(EngineError::BlockSizeMismatch {
                filters: repository.block_size(),
                session: config.block_size,
            });
        }
        if config.use_headphone_filter && repository.headphone_filter().is_none() {
            return Err(EngineError::MissingHeadphoneFilter);
        }

        let selection = match repository.default_key() {
            Some(key) => FilterSelectionTable::with_default(config.max_channels, key),
            None => FilterSelectionTable::new(config.max_channels),
        };

        log::info!(
            "Session ready: {} channels, block {} @ {} Hz ({:.2} ms budget), crossfading {}",
            config.max_channels,
            config.block_size,
            config.sampling_rate,
            config.block_duration().as_secs_f64() * 1000.0,
            if config.enable_crossfading { "on" } else { "off" }
        );

        Ok(Self {
            config,
            repository: Arc::new(repository),
            selection: Arc::new(selection),
            stop: StopHandle::new(),
        })
    }

    /// Player for the configured sound file(s) and its loader handle
    pub fn sound_player(&self) -> EngineResult<(SoundFilePlayer, SoundLoader)> {
        let paths = self.config.sound_files();
        let playlist = if paths.is_empty() {
            log::info!("No sound file configured, waiting for one");
            Playlist::empty()
        } else {
            Playlist::load(&paths, self.config.max_channels, self.config.sampling_rate)?
        };

        Ok(SoundFilePlayer::with_loader(
            playlist,
            self.config.loop_sound,
            self.config.max_channels,
            self.config.sampling_rate,
        ))
    }

    /// Render loop for `source`, sharing this session's state
    pub fn render_loop<S: SoundSource>(&self, source: S) -> EngineResult<RenderLoop<S>> {
        RenderLoop::new(
            &self.config,
            Arc::clone(&self.repository),
            Arc::clone(&self.selection),
            source,
            self.stop.clone(),
        )
    }

    #[inline]
    pub fn config(&self) -> &BinSimConfig {
        &self.config
    }

    #[inline]
    pub fn repository(&self) -> &Arc<FilterRepository> {
        &self.repository
    }

    #[inline]
    pub fn selection(&self) -> &Arc<FilterSelectionTable> {
        &self.selection
    }

    #[inline]
    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binsim_core::{FilterKey, KeyComponent};

    fn repository(block_size: usize) -> FilterRepository {
        let mut repository = FilterRepository::new(64, block_size);
        let key = FilterKey::new(vec![KeyComponent::Int(0), KeyComponent::Int(90)]);
        repository.insert(key, &[1.0], &[0.5]).unwrap();
        repository
    }

    fn config() -> BinSimConfig {
        BinSimConfig {
            block_size: 32,
            filter_size: 64,
            max_channels: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_selection_seeded_with_default_key() {
        let session = BinSim::with_repository(config(), repository(32)).unwrap();
        assert_eq!(
            session.selection().snapshot(),
            vec![Some(FilterKey::zeros(2)), Some(FilterKey::zeros(2))]
        );
    }

    #[test]
    fn test_rejects_block_size_mismatch() {
        assert!(matches!(
            BinSim::with_repository(config(), repository(16)),
            Err(EngineError::BlockSizeMismatch {
                filters: 16,
                session: 32
            })
        ));
    }

    #[test]
    fn test_rejects_missing_headphone_filter() {
        let config = BinSimConfig {
            use_headphone_filter: true,
            ..config()
        };
        assert!(matches!(
            BinSim::with_repository(config, repository(32)),
            Err(EngineError::MissingHeadphoneFilter)
        ));
    }

    #[test]
    fn test_no_sound_file_gives_idle_player() {
        let session = BinSim::with_repository(config(), repository(32)).unwrap();
        let (player, _loader) = session.sound_player().unwrap();
        assert!(player.playlist().is_empty());
    }

    #[test]
    fn test_render_loops_share_stop_handle() {
        let session = BinSim::with_repository(config(), repository(32)).unwrap();
        let (player, _loader) = session.sound_player().unwrap();
        let render = session.render_loop(player).unwrap();

        session.stop_handle().request_stop();
        assert!(render.stop_handle().is_stop_requested());
    }

    #[test]
    fn test_missing_filter_list_is_fatal() {
        let config = BinSimConfig {
            filter_list: "does/not/exist.txt".into(),
            ..config()
        };
        assert!(matches!(BinSim::new(config), Err(EngineError::Filter(_))));
    }
}
