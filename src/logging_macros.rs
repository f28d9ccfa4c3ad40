#![warn(clippy::all, rust_2018_idioms)]

/// Tracing macros that prefix every event with file, module and line.
#[macro_export]
macro_rules! qs_trace {
    ($($arg:tt)*) => {
        tracing::trace!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! qs_debug {
    ($($arg:tt)*) => {
        tracing::debug!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! qs_info {
    ($($arg:tt)*) => {
        tracing::info!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! qs_warn {
    ($($arg:tt)*) => {
        tracing::warn!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! qs_error {
    ($($arg:tt)*) => {
        tracing::error!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*))
    };
}

/// One asset operation's outcome, with `stage` and `asset` as fields.
#[macro_export]
macro_rules! qs_outcome {
    ($stage:expr, $asset:expr, ok) => {
        tracing::info!(stage = %$stage, asset = %$asset, "[{}:{}] succeeded", file!(), line!())
    };
    ($stage:expr, $asset:expr, err = $err:expr) => {
        tracing::warn!(stage = %$stage, asset = %$asset, error = %$err, "[{}:{}] failed", file!(), line!())
    };
}
