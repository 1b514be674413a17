// SPDX-License-Identifier: CEPL-1.0
use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use prism_render::{FramebufferSource, RenderSize};

/// Framebuffer size shared between the event loop (writer) and the renderer (reader).
#[derive(Debug, Default)]
pub struct WindowMetrics {
    width: AtomicU32,
    height: AtomicU32,
    resized: AtomicBool,
}

impl WindowMetrics {
    pub fn new(size: RenderSize) -> Self {
        Self {
            width: AtomicU32::new(size.width),
            height: AtomicU32::new(size.height),
            resized: AtomicBool::new(false),
        }
    }

    /// Records a new size and raises the resize flag, even if the size is unchanged.
    pub fn set_size(&self, size: RenderSize) {
        self.width.store(size.width, Ordering::Relaxed);
        self.height.store(size.height, Ordering::Relaxed);
        self.resized.store(true, Ordering::Release);
        tracing::debug!("framebuffer {}x{}", size.width, size.height);
    }
}

impl FramebufferSource for WindowMetrics {
    fn framebuffer_size(&self) -> RenderSize {
        RenderSize {
            width: self.width.load(Ordering::Relaxed),
            height: self.height.load(Ordering::Relaxed),
        }
    }

    fn take_resized(&self) -> bool {
        self.resized.swap(false, Ordering::AcqRel)
    }
}
