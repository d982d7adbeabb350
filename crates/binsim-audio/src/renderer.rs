//! Renderer seam between the engine and the audio hosts

/// Result of rendering one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// More blocks follow
    Continue,
    /// This was the last block; the host should wind down
    Complete,
}

/// Produces fixed-size blocks of interleaved stereo `f32`
pub trait BlockRenderer: Send {
    /// Frames per block
    fn block_size(&self) -> usize;

    /// Fill `output` (`2 * block_size` samples, interleaved L/R)
    fn render(&mut self, output: &mut [f32]) -> RenderStatus;
}

impl<R: BlockRenderer + ?Sized> BlockRenderer for Box<R> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn render(&mut self, output: &mut [f32]) -> RenderStatus {
        (**self).render(output)
    }
}

/// Re-chunks fixed renderer blocks into device periods of any length
///
/// Once the renderer reports [`RenderStatus::Complete`] its last block is
/// still played out, then the adapter emits silence.
pub struct BlockAdapter<R> {
    renderer: R,
    block: Vec<f32>,
    /// Next frame of `block` to emit
    position: usize,
    block_frames: usize,
    complete: bool,
}

impl<R: BlockRenderer> BlockAdapter<R> {
    pub fn new(renderer: R) -> Self {
        let block_frames = renderer.block_size();
        Self {
            renderer,
            block: vec![0.0; block_frames * 2],
            position: block_frames,
            block_frames,
            complete: false,
        }
    }

    /// Fill an interleaved device buffer with `channels` channels
    ///
    /// Mono devices get the average of both ears; extra channels are zeroed.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in data.chunks_mut(channels) {
            if self.position >= self.block_frames {
                if self.complete {
                    frame.fill(0.0);
                    continue;
                }
                if self.renderer.render(&mut self.block) == RenderStatus::Complete {
                    self.complete = true;
                }
                self.position = 0;
            }

            let left = self.block[self.position * 2];
            let right = self.block[self.position * 2 + 1];
            match frame {
                [mono] => *mono = 0.5 * (left + right),
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
            self.position += 1;
        }
    }

    /// True once the final block has been played out completely
    pub fn is_finished(&self) -> bool {
        self.complete && self.position >= self.block_frames
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_inner(self) -> R {
        self.renderer
    }
}
