/// Prints a diagnostic line to stderr when the `debug` option is enabled.
macro_rules! transport_debug {
    ($options:expr, $($arg:tt)*) => {
        if $options.debug {
            eprint!("[sentry-log-transport] ");
            eprintln!($($arg)*);
        }
    };
}
