use core::error::Error;
use core::fmt;
use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;

/// A catch-all error for the MERC crates.
///
/// Any type that converts into `Box<dyn Error + Send + Sync>` converts into a
/// [`MercError`], which includes plain `&str` and `String` messages. A
/// backtrace is captured on construction, it is only printed by the [`Debug`](fmt::Debug)
/// implementation when `RUST_BACKTRACE` enabled the capture.
pub struct MercError {
    inner: Box<InnerMercError>,
}

/// Boxed so that `Result<T, MercError>` stays a single pointer wide.
struct InnerMercError {
    error: Box<dyn Error + Send + Sync + 'static>,
    backtrace: Backtrace,
}

impl MercError {
    /// Returns the underlying error if it has type `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.inner.error.downcast_ref::<E>()
    }

    /// Returns the backtrace captured when the error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl<E> From<E> for MercError
where
    Box<dyn Error + Send + Sync + 'static>: From<E>,
{
    #[cold]
    fn from(error: E) -> Self {
        MercError {
            inner: Box::new(InnerMercError {
                error: error.into(),
                backtrace: Backtrace::capture(),
            }),
        }
    }
}

impl fmt::Display for MercError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.error)
    }
}

impl fmt::Debug for MercError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", self.inner.error)?;

        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            writeln!(f, "{}", self.inner.backtrace)?;
        }

        Ok(())
    }
}
