//! Offline rendering to a WAV file

use std::path::Path;

use binsim_file::WavStreamWriter;

use crate::renderer::{BlockRenderer, RenderStatus};
use crate::AudioResult;

/// Summary of an offline render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineReport {
    pub blocks: usize,
    pub frames: u64,
    /// False when the block limit cut the render short
    pub completed: bool,
}

/// Drive `renderer` as fast as possible, writing a 32-bit float stereo WAV
///
/// Stops when the renderer completes or after `max_blocks` blocks.
pub fn render_to_wav<R, P>(
    renderer: &mut R,
    path: P,
    sample_rate: u32,
    max_blocks: Option<usize>,
) -> AudioResult<OfflineReport>
where
    R: BlockRenderer + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = WavStreamWriter::create(path, 2, sample_rate)?;
    let mut block = vec![0.0_f32; renderer.block_size() * 2];

    let mut blocks = 0;
    let mut completed = false;
    while max_blocks.is_none_or(|max| blocks < max) {
        let status = renderer.render(&mut block);
        writer.write_interleaved(&block)?;
        blocks += 1;
        if status == RenderStatus::Complete {
            completed = true;
            break;
        }
    }

    let frames = writer.finalize()?;
    log::info!(
        "Rendered {} blocks ({} frames) to {}{}",
        blocks,
        frames,
        path.display(),
        if completed { "" } else { " (block limit reached)" }
    );

    Ok(OfflineReport {
        blocks,
        frames,
        completed,
    })
}
