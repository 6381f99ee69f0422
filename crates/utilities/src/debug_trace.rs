//! Tracing that is only compiled in with the `merc_debug-trace` feature, used
//! for messages on hot paths such as the creation of every single term.

/// Forwards to [log::trace] when the `merc_debug-trace` feature is enabled and
/// expands to nothing otherwise, so the arguments are not even evaluated.
///
/// ```
/// let index = 42;
/// merc_utilities::debug_trace!("Created term {index}");
/// ```
#[macro_export]
#[cfg(feature = "merc_debug-trace")]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        {
            log::trace!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "merc_debug-trace"))]
macro_rules! debug_trace {
    ($($arg:tt)*) => {{}};
}
