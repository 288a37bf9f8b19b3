/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::options::Verbosity;

/// Log to stderr. RUST_LOG wins over the verbosity flags when set.
pub fn init_logger(verbosity: Verbosity)
{
    let level = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Verbose => "info",
        Verbosity::Debug => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("logging at {}", level);
}
