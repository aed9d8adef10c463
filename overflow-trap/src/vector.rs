//! The overflow trap slot and its install/restore protocol.
//!
//! A [`TrapVector`] names the handler run when an overflow trap fires. Only a
//! [`TrapVectorManager`] writes it, and at most one manager holds a vector at
//! a time. [`TrapGuard`] ties install and restore to a scope.

use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, Ordering};

use log::{debug, error};

use crate::arith::CheckedArithmetic;
use crate::handler::{HandlerState, TrapFrame, TrapHandler, DEFAULT_HANDLER, OVERFLOW_HANDLER};
use crate::signal::TrapSignal;
use crate::{TrapError, TrapMode};

/// The process-wide overflow trap slot.
pub static OVERFLOW_VECTOR: TrapVector = TrapVector::new();

/// A single trap slot.
pub struct TrapVector {
    slot: AtomicPtr<TrapHandler>,
    claimed: AtomicBool,
    mode: AtomicU8,
    state: HandlerState,
}

impl TrapVector {
    /// A slot holding [`DEFAULT_HANDLER`].
    pub const fn new() -> Self {
        Self::with_handler(&DEFAULT_HANDLER)
    }

    /// A slot already occupied by `handler`.
    pub const fn with_handler(handler: &'static TrapHandler) -> Self {
        Self {
            slot: AtomicPtr::new(handler as *const TrapHandler as *mut TrapHandler),
            claimed: AtomicBool::new(false),
            mode: AtomicU8::new(0),
            state: HandlerState::new(),
        }
    }

    /// Handler currently in the slot.
    pub fn current(&self) -> &'static TrapHandler {
        // SAFETY: the slot is only ever written from `&'static TrapHandler`.
        unsafe { &*self.slot.load(Ordering::Acquire) }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Mode of the [`TrapGuard`] currently holding this vector, if any.
    pub fn active_mode(&self) -> Option<TrapMode> {
        TrapMode::from_code(self.mode.load(Ordering::Acquire))
    }

    fn set_active_mode(&self, mode: Option<TrapMode>) {
        self.mode
            .store(mode.map_or(0, TrapMode::code), Ordering::Release);
    }

    pub fn state(&self) -> &HandlerState {
        &self.state
    }

    /// Runs the slot's handler for `frame`. Nested traps are dropped.
    pub(crate) fn raise(&self, frame: &TrapFrame<'_>) {
        let Some(_handling) = self.state.enter() else {
            return;
        };
        self.current().invoke(frame);
    }

    fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn unclaim(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    fn swap(&self, handler: &'static TrapHandler) -> &'static TrapHandler {
        let old = self.slot.swap(as_slot_ptr(handler), Ordering::AcqRel);
        // SAFETY: see `current`.
        unsafe { &*old }
    }

    /// Writes `new` only if the slot still holds `expected`.
    fn replace(
        &self,
        expected: &'static TrapHandler,
        new: &'static TrapHandler,
    ) -> Result<(), &'static TrapHandler> {
        self.slot
            .compare_exchange(
                as_slot_ptr(expected),
                as_slot_ptr(new),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            // SAFETY: see `current`.
            .map_err(|found| unsafe { &*found })
    }
}

fn as_slot_ptr(handler: &'static TrapHandler) -> *mut TrapHandler {
    handler as *const TrapHandler as *mut TrapHandler
}

impl Default for TrapVector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapVector")
            .field("current", &self.current().name())
            .field("claimed", &self.is_claimed())
            .field("mode", &self.active_mode())
            .field("handling", &self.state.is_handling())
            .finish()
    }
}

/// Installs a handler into a [`TrapVector`] and puts the previous one back.
///
/// Lifecycle: uninstalled -> installed -> uninstalled. Installing twice is
/// [`TrapError::DoubleInstall`]; restoring while uninstalled does nothing.
pub struct TrapVectorManager<'v> {
    vector: &'v TrapVector,
    handler: &'static TrapHandler,
    saved: Option<&'static TrapHandler>,
}

impl<'v> TrapVectorManager<'v> {
    /// Manager that installs [`OVERFLOW_HANDLER`].
    pub fn new(vector: &'v TrapVector) -> Self {
        Self::with_handler(vector, &OVERFLOW_HANDLER)
    }

    pub fn with_handler(vector: &'v TrapVector, handler: &'static TrapHandler) -> Self {
        Self {
            vector,
            handler,
            saved: None,
        }
    }

    pub fn vector(&self) -> &'v TrapVector {
        self.vector
    }

    pub fn is_installed(&self) -> bool {
        self.saved.is_some()
    }

    /// The handler that occupied the slot before [`install`](Self::install).
    pub fn saved_handler(&self) -> Option<&'static TrapHandler> {
        self.saved
    }

    /// Saves the slot's current handler and writes ours.
    pub fn install(&mut self) -> Result<(), TrapError> {
        if self.saved.is_some() || !self.vector.claim() {
            return Err(TrapError::DoubleInstall {
                active: self.vector.current().name(),
            });
        }

        let previous = self.vector.swap(self.handler);
        self.saved = Some(previous);
        debug!(
            "installed trap handler `{}` (saved `{}`)",
            self.handler.name(),
            previous.name()
        );
        Ok(())
    }

    /// Writes the saved handler back. Returns `Ok(false)` when nothing was
    /// installed.
    ///
    /// If the slot no longer holds our handler it is left untouched and the
    /// manager stays installed.
    pub fn restore(&mut self) -> Result<bool, TrapError> {
        let Some(saved) = self.saved else {
            return Ok(false);
        };

        if let Err(found) = self.vector.replace(self.handler, saved) {
            error!(
                "cannot restore `{}`: trap vector holds `{}`",
                saved.name(),
                found.name()
            );
            return Err(TrapError::VectorClobbered {
                expected: self.handler.name(),
                found: found.name(),
            });
        }

        self.saved = None;
        self.vector.unclaim();
        debug!("restored trap handler `{}`", saved.name());
        Ok(true)
    }
}

impl fmt::Debug for TrapVectorManager<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapVectorManager")
            .field("handler", &self.handler.name())
            .field("saved", &self.saved.map(TrapHandler::name))
            .finish()
    }
}

/// Scoped installation: installs on acquire, restores on drop.
///
/// Use [`release`](Self::release) to observe a failed restore; on drop it
/// can only be logged.
#[derive(Debug)]
pub struct TrapGuard<'v> {
    manager: TrapVectorManager<'v>,
    mode: TrapMode,
}

impl<'v> TrapGuard<'v> {
    /// Checks that `mode` runs on this target, then installs the overflow
    /// handler into `vector`.
    pub fn acquire(vector: &'v TrapVector, mode: TrapMode) -> Result<Self, TrapError> {
        Self::acquire_on(vector, mode, std::env::consts::ARCH)
    }

    pub(crate) fn acquire_on(
        vector: &'v TrapVector,
        mode: TrapMode,
        arch: &'static str,
    ) -> Result<Self, TrapError> {
        let mode = mode.ensure_supported_on(arch)?;
        let mut manager = TrapVectorManager::new(vector);
        manager.install()?;
        vector.set_active_mode(Some(mode));
        Ok(Self { manager, mode })
    }

    /// [`acquire`](Self::acquire) on [`OVERFLOW_VECTOR`].
    pub fn acquire_process(mode: TrapMode) -> Result<TrapGuard<'static>, TrapError> {
        TrapGuard::acquire(&OVERFLOW_VECTOR, mode)
    }

    pub fn mode(&self) -> TrapMode {
        self.mode
    }

    pub fn vector(&self) -> &'v TrapVector {
        self.manager.vector()
    }

    /// Checked arithmetic dispatching through this guard's vector.
    pub fn arithmetic<'a>(&'a self, signal: &'a TrapSignal) -> CheckedArithmetic<'a> {
        CheckedArithmetic::unchecked(self.manager.vector(), signal, self.mode)
    }

    /// Restores the saved handler and reports failure. The restore is
    /// attempted once; drop does not retry it.
    pub fn release(self) -> Result<(), TrapError> {
        let mut guard = ManuallyDrop::new(self);
        guard.restore()
    }

    fn restore(&mut self) -> Result<(), TrapError> {
        if self.manager.restore()? {
            self.manager.vector().set_active_mode(None);
        }
        Ok(())
    }
}

impl Drop for TrapGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!("trap vector left inconsistent on scope exit: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::ArithOp;

    fn noop(_frame: &TrapFrame<'_>) {}

    static PREVIOUS: TrapHandler = TrapHandler::new("previous", noop);
    static ROGUE: TrapHandler = TrapHandler::new("rogue", noop);

    fn overflow_frame(signal: &TrapSignal) -> TrapFrame<'_> {
        TrapFrame::new(ArithOp::Add, i32::MAX, 1, i32::MIN, signal)
    }

    #[test]
    fn test_install_restore_round_trip() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let mut manager = TrapVectorManager::new(&vector);

        manager.install().unwrap();
        assert!(vector.current().is(&OVERFLOW_HANDLER));
        assert!(manager.saved_handler().unwrap().is(&PREVIOUS));

        assert_eq!(manager.restore(), Ok(true));
        assert!(vector.current().is(&PREVIOUS));
        assert!(!manager.is_installed());
        assert!(!vector.is_claimed());
    }

    #[test]
    fn test_double_install_keeps_saved_handler() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let mut manager = TrapVectorManager::new(&vector);
        manager.install().unwrap();

        assert_eq!(
            manager.install(),
            Err(TrapError::DoubleInstall { active: "overflow" })
        );
        assert!(manager.saved_handler().unwrap().is(&PREVIOUS));

        manager.restore().unwrap();
        assert!(vector.current().is(&PREVIOUS));
    }

    #[test]
    fn test_second_manager_cannot_install() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let mut first = TrapVectorManager::new(&vector);
        let mut second = TrapVectorManager::new(&vector);
        first.install().unwrap();

        assert!(matches!(second.install(), Err(TrapError::DoubleInstall { .. })));
        assert!(!second.is_installed());

        first.restore().unwrap();
        assert!(vector.current().is(&PREVIOUS));
        second.install().unwrap();
        second.restore().unwrap();
    }

    #[test]
    fn test_restore_without_install_is_noop() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let mut manager = TrapVectorManager::new(&vector);

        assert_eq!(manager.restore(), Ok(false));
        assert!(vector.current().is(&PREVIOUS));
        assert!(!vector.is_claimed());
    }

    #[test]
    fn test_restore_twice_second_is_noop() {
        let vector = TrapVector::new();
        let mut manager = TrapVectorManager::new(&vector);
        manager.install().unwrap();

        assert_eq!(manager.restore(), Ok(true));
        assert_eq!(manager.restore(), Ok(false));
        assert!(vector.current().is(&DEFAULT_HANDLER));
    }

    #[test]
    fn test_clobbered_vector_is_reported() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let mut manager = TrapVectorManager::new(&vector);
        manager.install().unwrap();
        vector.swap(&ROGUE);

        assert_eq!(
            manager.restore(),
            Err(TrapError::VectorClobbered {
                expected: "overflow",
                found: "rogue",
            })
        );
        assert!(vector.current().is(&ROGUE));
        assert!(manager.is_installed());
    }

    #[test]
    fn test_raise_dispatches_to_current_handler() {
        let vector = TrapVector::new();
        let signal = TrapSignal::new();

        vector.raise(&overflow_frame(&signal));
        assert!(!signal.overflowed());

        let mut manager = TrapVectorManager::new(&vector);
        manager.install().unwrap();
        vector.raise(&overflow_frame(&signal));
        assert!(signal.overflowed());
        assert!(!vector.state().is_handling());
        manager.restore().unwrap();
    }

    #[test]
    fn test_raise_while_handling_is_dropped() {
        let vector = TrapVector::with_handler(&OVERFLOW_HANDLER);
        let signal = TrapSignal::new();

        let _handling = vector.state.enter().unwrap();
        vector.raise(&overflow_frame(&signal));
        assert!(!signal.overflowed());
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        {
            let guard = TrapGuard::acquire(&vector, TrapMode::Emulated).unwrap();
            assert!(guard.vector().current().is(&OVERFLOW_HANDLER));
        }
        assert!(vector.current().is(&PREVIOUS));
        assert!(!vector.is_claimed());
    }

    #[test]
    fn test_guard_restores_on_early_error_return() {
        fn fails_midway(vector: &TrapVector) -> Result<(), TrapError> {
            let _guard = TrapGuard::acquire(vector, TrapMode::Emulated)?;
            Err(TrapError::UnknownMode("bail".to_string()))
        }

        let vector = TrapVector::with_handler(&PREVIOUS);
        assert!(fails_midway(&vector).is_err());
        assert!(vector.current().is(&PREVIOUS));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let result = std::panic::catch_unwind(|| {
            let _guard = TrapGuard::acquire(&vector, TrapMode::Emulated).unwrap();
            panic!("driver crashed");
        });
        assert!(result.is_err());
        assert!(vector.current().is(&PREVIOUS));
    }

    #[test]
    fn test_second_guard_is_double_install() {
        let vector = TrapVector::new();
        let _guard = TrapGuard::acquire(&vector, TrapMode::Emulated).unwrap();
        assert!(matches!(
            TrapGuard::acquire(&vector, TrapMode::Emulated),
            Err(TrapError::DoubleInstall { .. })
        ));
        assert!(vector.current().is(&OVERFLOW_HANDLER));
    }

    #[test]
    fn test_guard_release_reports_clobber() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        let guard = TrapGuard::acquire(&vector, TrapMode::Emulated).unwrap();
        vector.swap(&ROGUE);

        assert!(matches!(
            guard.release(),
            Err(TrapError::VectorClobbered { found: "rogue", .. })
        ));
        assert!(vector.current().is(&ROGUE));
    }

    #[test]
    fn test_unsupported_mode_fails_before_install() {
        let vector = TrapVector::with_handler(&PREVIOUS);
        assert_eq!(
            TrapGuard::acquire_on(&vector, TrapMode::Hardware, "riscv64").err(),
            Some(TrapError::PlatformUnsupported {
                mode: TrapMode::Hardware,
                arch: "riscv64",
            })
        );
        assert!(vector.current().is(&PREVIOUS));
        assert!(!vector.is_claimed());
        assert_eq!(vector.active_mode(), None);
    }

    #[test]
    fn test_guard_publishes_mode_while_held() {
        let vector = TrapVector::new();
        assert_eq!(vector.active_mode(), None);
        {
            let _guard = TrapGuard::acquire(&vector, TrapMode::Emulated).unwrap();
            assert_eq!(vector.active_mode(), Some(TrapMode::Emulated));
        }
        assert_eq!(vector.active_mode(), None);

        let guard = TrapGuard::acquire(&vector, TrapMode::detect()).unwrap();
        assert_eq!(vector.active_mode(), Some(TrapMode::detect()));
        guard.release().unwrap();
        assert_eq!(vector.active_mode(), None);
    }

    thread_local! {
        static ERRORS_LOGGED: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
    }

    /// Counts error records per test thread.
    struct ErrorCounter;

    impl log::Log for ErrorCounter {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() == log::Level::Error
        }

        fn log(&self, record: &log::Record<'_>) {
            if record.level() == log::Level::Error {
                ERRORS_LOGGED.with(|n| n.set(n.get() + 1));
            }
        }

        fn flush(&self) {}
    }

    static ERROR_COUNTER: ErrorCounter = ErrorCounter;

    #[test]
    fn test_failed_release_is_not_retried_on_drop() {
        let _ = log::set_logger(&ERROR_COUNTER);
        log::set_max_level(log::LevelFilter::Error);

        let vector = TrapVector::with_handler(&PREVIOUS);
        let guard = TrapGuard::acquire(&vector, TrapMode::Emulated).unwrap();
        vector.swap(&ROGUE);
        let before = ERRORS_LOGGED.with(|n| n.get());

        assert!(matches!(
            guard.release(),
            Err(TrapError::VectorClobbered { found: "rogue", .. })
        ));

        // One error from the single restore attempt, none from a drop retry.
        assert_eq!(ERRORS_LOGGED.with(|n| n.get()) - before, 1);
        assert!(vector.current().is(&ROGUE));
        assert_eq!(vector.active_mode(), Some(TrapMode::Emulated));
    }
}
