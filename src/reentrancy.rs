//! Debug-only sanity guard.
//!
//! Neither container locks. Callers serialize access themselves, either by
//! confining an instance to one thread or by wrapping it in a mutex. The
//! guard catches the case where they forgot: every public entry-point marks
//! the instance busy, and a second entry while busy panics. In release builds
//! the guard is a zero-sized no-op.

#[cfg(debug_assertions)]
use core::cell::Cell;
#[cfg(not(debug_assertions))]
use core::marker::PhantomData;

/// Per-instance busy flag. Embed it in a container and open every public
/// entry-point with `let _busy = self.guard.enter();`.
#[derive(Debug)]
pub struct SanityGuard {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    #[cfg(debug_assertions)]
    owner: &'static str,
}

impl SanityGuard {
    /// `owner` names the container in the panic message.
    pub const fn new(owner: &'static str) -> Self {
        #[cfg(not(debug_assertions))]
        let _ = owner;
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            #[cfg(debug_assertions)]
            owner,
        }
    }

    /// Mark the instance busy until the returned token drops.
    ///
    /// Panics in debug builds if the instance is already busy.
    #[inline]
    #[track_caller]
    pub fn enter(&self) -> Busy<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "sanity guard: overlapping call into {} (missing external serialization?)",
                self.owner
            );
            Busy { guard: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Busy { _z: PhantomData }
        }
    }

    /// Whether a guarded section is currently open. Always `false` in release builds.
    #[inline]
    pub fn is_busy(&self) -> bool {
        #[cfg(debug_assertions)]
        {
            self.busy.get()
        }

        #[cfg(not(debug_assertions))]
        {
            false
        }
    }
}

impl Default for SanityGuard {
    fn default() -> Self {
        Self::new("container")
    }
}

/// RAII token returned by [`SanityGuard::enter`].
pub struct Busy<'a> {
    #[cfg(debug_assertions)]
    guard: &'a SanityGuard,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.guard.busy.get());
            self.guard.busy.set(false);
        }
    }
}
