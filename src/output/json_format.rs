//! JSON output formatting.

use crate::scanner::ScanResult;
use std::io;

/// Print result records as a JSON array.
pub fn print_json(results: &[&ScanResult]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    println!("{}", json);
    Ok(())
}
