//! Fatal kernel invariant checks.

/// Report a broken kernel invariant and stop.
///
/// Used where continuing would corrupt shared state: a reference count used
/// after it reached zero, an unpopulated file reaching the dispatcher, a
/// short write inside one log transaction. The message is logged at error
/// level before panicking so it reaches the console backend even when the
/// panic handler cannot print.
#[macro_export]
macro_rules! kernel_bug {
    ($($arg:tt)*) => {
        match ::core::format_args!($($arg)*) {
            args => {
                $crate::klog_error!("{}", args);
                ::core::panic!("{}", args)
            }
        }
    };
}
