//! User-facing output for the CLI: colored diffs, status lines and
//! diagnostics. Keeping it here gives every command the same look.

use difference::{Changeset, Difference};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::{print_warning, Warning};

/// Prints a colored line diff from `before` to `after`.
pub fn print_expansion_diff(before: &str, after: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let changeset = Changeset::new(before, after, "\n");
    print_diff(&mut stdout, &changeset.diffs);
    let _ = stdout.reset();
}

/// A bold green label followed by a message, on stderr.
pub fn print_status(label: &str, message: &str) {
    print_labeled(label, message, Color::Green);
}

/// A bold yellow label followed by a message, on stderr.
pub fn print_notice(label: &str, message: &str) {
    print_labeled(label, message, Color::Yellow);
}

pub fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        print_warning(warning);
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_labeled(label: &str, message: &str, color: Color) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stderr, "{label:>12}");
    let _ = stderr.reset();
    let _ = writeln!(stderr, " {message}");
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stdout.reset();
                for line in x.lines() {
                    let _ = writeln!(stdout, " {line}");
                }
            }
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                for line in x.lines() {
                    let _ = writeln!(stdout, "+{line}");
                }
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                for line in x.lines() {
                    let _ = writeln!(stdout, "-{line}");
                }
            }
        }
    }
}
