use std::fmt;

/// Notifications the store delivers to the driving engine.
///
/// `finished` and `failed` are required; `status` and `data_flunked` default
/// to no-ops. All hooks are invoked synchronously from whatever call mutated
/// the store, so they should return quickly.
pub struct Hooks {
    pub(crate) finished: Box<dyn FnMut()>,
    pub(crate) failed: Box<dyn FnMut(&str)>,
    pub(crate) status: Box<dyn FnMut(Option<f64>, Option<&str>)>,
    pub(crate) data_flunked: Box<dyn FnMut(u32)>,
}

impl Hooks {
    /// `finished` fires exactly once, when the last piece verifies. `failed`
    /// fires on every storage I/O error the store swallows.
    pub fn new(finished: impl FnMut() + 'static, failed: impl FnMut(&str) + 'static) -> Self {
        Self {
            finished: Box::new(finished),
            failed: Box::new(failed),
            status: Box::new(|_, _| {}),
            data_flunked: Box::new(|_| {}),
        }
    }

    /// Progress reporting during the initial integrity scan: fraction of
    /// pieces checked so far, plus an activity label on the first call.
    pub fn with_status(
        mut self,
        status: impl FnMut(Option<f64>, Option<&str>) + 'static,
    ) -> Self {
        self.status = Box::new(status);
        self
    }

    /// Called with the byte length of a piece that failed verification after
    /// the initial scan, i.e. bytes that must be fetched again.
    pub fn with_data_flunked(mut self, data_flunked: impl FnMut(u32) + 'static) -> Self {
        self.data_flunked = Box::new(data_flunked);
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
