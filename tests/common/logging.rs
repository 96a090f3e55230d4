use std::sync::Once;

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

static INIT: Once = Once::new();

/// Logs everything at debug level to stdout, as `[module:line] message`.
/// Safe to call from several tests of the same binary.
pub fn init_default_logging() {
    INIT.call_once(|| {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{h({l})} [{M}:{L}] {m}{n}")))
            .build();

        let config = Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Debug))
            .expect("valid logging config");

        // Another harness may have installed a logger already.
        let _ = log4rs::init_config(config);
    });
}
