use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:tt)*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg)*)
    }};
}

/// Events about resolving identity and transport settings
#[macro_export]
macro_rules! resolver {
    (level = $level:ident, $($msg:tt)*) => {
        $crate::log!($crate::tracing::Level::$level, "resolver", $($msg)*)
    };

    ($($msg:tt)*) => {
        $crate::resolver!(level = TRACE, $($msg)*)
    };
}

/// Events about settings submissions and store maintenance
#[macro_export]
macro_rules! admin {
    (level = $level:ident, $($msg:tt)*) => {
        $crate::log!($crate::tracing::Level::$level, "admin", $($msg)*)
    };

    ($($msg:tt)*) => {
        $crate::admin!(level = TRACE, $($msg)*)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:tt)*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg)*)
    };

    ($($msg:tt)*) => {
        $crate::internal!(level = TRACE, $($msg)*)
    };
}

/// Install the global subscriber. Level comes from `LOG_LEVEL`, defaulting to
/// TRACE in debug builds and INFO otherwise. If a global subscriber is
/// already installed, the failure is reported on stderr and the existing one
/// stays.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let level = std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    });

    let installed = tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("ownomail")
                })),
        )
        .try_init();

    if let Err(err) = installed {
        eprintln!("Failed to install log subscriber: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_reports_instead_of_panicking() {
        init();
        init();
        internal!(level = INFO, "Logging initialised twice");
    }
}
