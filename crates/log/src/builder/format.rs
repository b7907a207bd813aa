//! Format layer creation macros

/// Text layer (`pretty` or `compact`) writing to stderr.
macro_rules! create_fmt_layer {
    ($format:ident, $config:expr) => {{
        tracing_subscriber::fmt::layer()
            .$format()
            .with_writer(std::io::stderr)
            .with_ansi($config.ansi)
            .with_target($config.with_target)
            .with_file($config.with_source)
            .with_line_number($config.with_source)
    }};
}

/// JSON layer writing to stderr, with the current span on each event.
macro_rules! create_json_layer {
    ($config:expr) => {{
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_ansi(false)
            .with_target($config.with_target)
            .with_file($config.with_source)
            .with_line_number($config.with_source)
    }};
}
