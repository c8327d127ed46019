//! Error reporting for the demo CLI.
//!
//! The allocator itself never touches stderr or exits the process; this
//! module exists only for `bin/rustiny.rs` to report a failed allocation the
//! way the rest of this lineage reports fatal errors.

use std::env;
use std::io::{self, Write};
use std::process;
use ansi_term::Colour::Red;
use term;

fn colors_enabled() -> bool {
    if env::var_os("COLORED_OUTPUT").and_then(|s| s.into_string().ok()) == Some("off".into()) {
        return false;
    }

    term::stderr().map_or(false, |t| {
        t.supports_attr(term::Attr::ForegroundColor(term::color::RED))
    })
}

/// Abort the process with a failure status.
pub fn abort() -> ! {
    process::exit(1)
}

fn print_error(stderr: &mut io::Stderr) {
    if colors_enabled() {
        write!(stderr, "{}", Red.paint("Error")).ok();
    } else {
        write!(stderr, "Error").ok();
    }
}

/// Report a fatal error on stderr.
pub fn fatal<S: AsRef<str>>(msg: S) {
    let mut stderr = io::stderr();

    print_error(&mut stderr);
    writeln!(&mut stderr, ": {}", msg.as_ref()).ok();
}
