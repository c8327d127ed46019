//! File I/O related helpers

use crate::driver;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write `contents` to `output_path`, aborting the process on failure.
///
/// Used by the demo binary to dump allocator traces (interval lists,
/// assigned locations) the way earlier phases of this lineage dumped
/// `.debug.asm` / `.debug.lifetimes` snapshots.
pub fn write_file(output_path: &str, contents: &str) {
    let mut file = match File::create(&Path::new(output_path)) {
        Ok(f) => f,
        Err(err) => {
            driver::fatal(format!("Can't open {}: {}", output_path, err));
            driver::abort()
        }
    };

    if let Err(_) = file.write_all(contents.as_bytes()) {
        driver::fatal(format!("Can't write {}", output_path));
        driver::abort()
    }
}
