//! Panic reporting.
//!
//! A panic mid-session would garble the interactive prompt and leave the user unsure whether
//! their mods directory was restored, so panics go through the logger like everything else.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::PanicHookInfo;

/// Replace the default panic printer with one that logs instead.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(report_panic));
}

fn report_panic(info: &PanicHookInfo) {
    let payload = info.payload();
    let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
        *text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "<non-string panic payload>"
    };

    let location = info
        .location()
        .map(|location| format!("{}:{}", location.file(), location.line()))
        .unwrap_or_else(|| "an unknown location".to_string());

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        log::error!(
            target: "panic",
            "mod-bisect panicked at {location}: {message}. This is a bug in mod-bisect.\n{backtrace}"
        );
    } else {
        log::error!(
            target: "panic",
            "mod-bisect panicked at {location}: {message}. This is a bug in mod-bisect; rerun with \
             RUST_BACKTRACE=1 for a backtrace."
        );
    }
}
