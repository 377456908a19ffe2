use std::io;
use std::io::ErrorKind;
use std::sync::{Arc, Weak};

#[cfg(test)]
use mockall::automock;
use parking_lot::MutexGuard;

/// Readiness hints a shared buffer gives to the reactor driving its connection.
///
/// The hints are edge triggered requests, the reactor decides when to act on
/// them. They may be issued from any thread and are always issued with the
/// buffer unlocked, so an implementation may call straight back into the
/// buffer.
#[cfg_attr(test, automock)]
pub trait IoControl {
    /// Asks to be told when the channel can be read
    fn request_input(&self);

    /// Stops read notifications until the next request
    fn suspend_input(&self);

    /// Asks to be told when the channel can be written
    fn request_output(&self);

    /// Stops write notifications until the next request
    fn suspend_output(&self);
}

/// Non-owning handle to the [`IoControl`] of a connection.
///
/// The reactor owns the connection, the buffer only borrows the capability
/// for as long as it is alive.
#[derive(Debug, Clone)]
pub(crate) struct ControlHandle {
    control: Weak<dyn IoControl + Send + Sync>,
}

impl ControlHandle {
    pub(crate) fn new<C: IoControl + Send + Sync + 'static>(control: &Arc<C>) -> Self {
        let control: Weak<C> = Arc::downgrade(control);
        Self { control }
    }

    fn upgrade(&self) -> io::Result<Arc<dyn IoControl + Send + Sync>> {
        self.control.upgrade().ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "i/o control of the connection is gone"))
    }

    /// Runs `hint` against the control with `guard` unlocked.
    pub(crate) fn hint<T>(&self, guard: &mut MutexGuard<'_, T>, hint: impl FnOnce(&dyn IoControl)) -> io::Result<()> {
        let control = self.upgrade()?;
        MutexGuard::unlocked(guard, || hint(&*control));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn hint_reaches_live_control() {
        let mut control = MockIoControl::new();
        control.expect_request_output().times(1).return_const(());
        let control = Arc::new(control);

        let handle = ControlHandle::new(&control);
        let state = Mutex::new(());
        handle.hint(&mut state.lock(), |c| c.request_output()).unwrap();
    }

    #[test]
    fn dropped_control_is_not_connected() {
        let control = Arc::new(MockIoControl::new());
        let handle = ControlHandle::new(&control);
        drop(control);

        let state = Mutex::new(());
        let error = handle.hint(&mut state.lock(), |c| c.request_input()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn handle_accepts_any_concrete_control() {
        #[derive(Default)]
        struct Counter(std::sync::atomic::AtomicUsize);

        impl IoControl for Counter {
            fn request_input(&self) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            fn suspend_input(&self) {}
            fn request_output(&self) {}
            fn suspend_output(&self) {}
        }

        let control = Arc::new(Counter::default());
        let handle = ControlHandle::new(&control);
        let cloned = handle.clone();

        let state = Mutex::new(());
        handle.hint(&mut state.lock(), |c| c.request_input()).unwrap();
        cloned.hint(&mut state.lock(), |c| c.request_input()).unwrap();
        assert_eq!(control.0.load(std::sync::atomic::Ordering::Relaxed), 2);
    }
}
