//! Plain terminal reporter used by both binaries.

use offpkg_schema::{LibraryName, Reporter, Warning};

/// Prints progress to stdout and warnings to stderr.
///
/// Per-library lines are only printed when `verbose` is set; sections,
/// warnings and summaries always are.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a reporter.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!("==> {title}");
    }

    fn info(&self, msg: &str) {
        println!("    {msg}");
    }

    fn warning(&self, warning: &Warning) {
        eprintln!("warning: {warning}");
    }

    fn installing(&self, name: &LibraryName, current: usize, total: usize) {
        if self.verbose {
            println!("    [{current}/{total}] {name}");
        }
    }

    fn skipped(&self, name: &LibraryName, reason: &str) {
        if self.verbose {
            println!("    {name}: {reason}");
        }
    }

    fn done(&self, name: &LibraryName, detail: &str) {
        if self.verbose {
            println!("    {name}: {detail}");
        }
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        println!("{count} package(s) {action} in {elapsed_secs:.1}s");
    }
}
