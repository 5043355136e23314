use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::config::{ConfigError, Viewport};

static SURFACE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_surface_lock_poison_once(operation: &'static str) {
    if SURFACE_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "surface lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    viewport: Option<Viewport>,
    back: Vec<u8>,
    front: Vec<u8>,
    presented_frames: u64,
}

/// Double-buffered RGBA drawing surface shared between the simulation thread
/// (draws into the back buffer) and the UI thread (reads the front buffer).
#[derive(Clone, Debug, Default)]
pub struct SharedSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl SharedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self, operation: &'static str) -> MutexGuard<'_, SurfaceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_surface_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }

    /// Allocates both buffers for `viewport` and marks the surface valid.
    pub fn create(&self, viewport: Viewport) -> Result<(), ConfigError> {
        let viewport = viewport.validate()?;
        let mut state = self.acquire("create");
        state.viewport = Some(viewport);
        state.back = vec![0; viewport.frame_len()];
        state.front = vec![0; viewport.frame_len()];
        Ok(())
    }

    /// Invalidates the surface and frees its buffers. Later `lock()` calls
    /// return `None` until the surface is created again.
    pub fn destroy(&self) {
        let mut state = self.acquire("destroy");
        state.viewport = None;
        state.back = Vec::new();
        state.front = Vec::new();
    }

    pub fn is_valid(&self) -> bool {
        self.acquire("is_valid").viewport.is_some()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.acquire("viewport").viewport
    }

    pub fn presented_frames(&self) -> u64 {
        self.acquire("presented_frames").presented_frames
    }

    /// Locks the back buffer for drawing, or `None` when the surface is not
    /// currently valid.
    pub fn lock(&self) -> Option<FrameLock<'_>> {
        let guard = self.acquire("lock");
        let viewport = guard.viewport?;
        Some(FrameLock { guard, viewport })
    }

    /// Copies the most recently presented frame into `target`. Returns the
    /// presented frame count, or `None` if the surface is invalid or the
    /// target length does not match.
    pub fn copy_front_into(&self, target: &mut [u8]) -> Option<u64> {
        let state = self.acquire("copy_front_into");
        state.viewport?;
        if target.len() != state.front.len() {
            return None;
        }
        target.copy_from_slice(&state.front);
        Some(state.presented_frames)
    }
}

/// Exclusive access to the back buffer. The lock is released when this value
/// is dropped, whether or not the frame was presented; an unpresented frame
/// is simply discarded.
pub struct FrameLock<'a> {
    guard: MutexGuard<'a, SurfaceState>,
    viewport: Viewport,
}

impl FrameLock<'_> {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.guard.back
    }

    /// Publishes the back buffer as the new front buffer and releases the lock.
    pub fn present(mut self) {
        let state = &mut *self.guard;
        std::mem::swap(&mut state.back, &mut state.front);
        state.presented_frames = state.presented_frames.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    fn small() -> Viewport {
        Viewport {
            width: 4,
            height: 2,
        }
    }

    #[test]
    fn lock_is_none_until_created() {
        let surface = SharedSurface::new();
        assert!(surface.lock().is_none());
        surface.create(small()).expect("create");
        assert!(surface.lock().is_some());
    }

    #[test]
    fn create_rejects_empty_viewport() {
        let surface = SharedSurface::new();
        let result = surface.create(Viewport {
            width: 0,
            height: 10,
        });
        assert!(result.is_err());
        assert!(!surface.is_valid());
    }

    #[test]
    fn present_swaps_back_into_front() {
        let surface = SharedSurface::new();
        surface.create(small()).expect("create");
        {
            let mut frame = surface.lock().expect("lock");
            frame.frame_mut().fill(7);
            frame.present();
        }

        let mut target = vec![0u8; small().frame_len()];
        assert_eq!(surface.copy_front_into(&mut target), Some(1));
        assert!(target.iter().all(|byte| *byte == 7));
    }

    #[test]
    fn dropping_without_present_releases_and_discards() {
        let surface = SharedSurface::new();
        surface.create(small()).expect("create");
        {
            let mut frame = surface.lock().expect("lock");
            frame.frame_mut().fill(9);
        }

        assert_eq!(surface.presented_frames(), 0);
        let mut target = vec![1u8; small().frame_len()];
        assert_eq!(surface.copy_front_into(&mut target), Some(0));
        assert!(target.iter().all(|byte| *byte == 0));
        assert!(surface.lock().is_some());
    }

    #[test]
    fn panic_while_drawing_still_releases_surface() {
        let surface = SharedSurface::new();
        surface.create(small()).expect("create");
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut frame = surface.lock().expect("lock");
            frame.frame_mut()[0] = 1;
            panic!("draw failed");
        }));
        assert!(result.is_err());

        let frame = surface.lock().expect("lock after panic");
        frame.present();
        assert_eq!(surface.presented_frames(), 1);
    }

    #[test]
    fn destroy_invalidates_and_rejects_copy() {
        let surface = SharedSurface::new();
        surface.create(small()).expect("create");
        surface.destroy();

        assert!(!surface.is_valid());
        assert!(surface.lock().is_none());
        let mut target = vec![0u8; small().frame_len()];
        assert_eq!(surface.copy_front_into(&mut target), None);
    }

    #[test]
    fn copy_rejects_mismatched_target() {
        let surface = SharedSurface::new();
        surface.create(small()).expect("create");
        let mut target = vec![0u8; 3];
        assert_eq!(surface.copy_front_into(&mut target), None);
    }
}
