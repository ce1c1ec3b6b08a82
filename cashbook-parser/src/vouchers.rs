//! Materializes postings from the filenames of an evidence directory.
//!
//! A file named `2017-01-04b f 12.60 buch-bar Accounting for Dummies.pdf`
//! becomes an `f` posting; files whose name contains the configured skip
//! marker are ignored; anything else is a top-level error.

use std::fs;
use std::path::Path;

use cashbook_core::{Config, Entry, Journal, LedgerError, Verb};

use crate::{parse_line, ParsedLine};

/// Materializes voucher postings from an iterator of filenames.
pub fn materialize_files<I>(config: &Config, journal: &mut Journal, filenames: I)
where
    I: IntoIterator<Item = String>,
{
    for filename in filenames {
        if filename == "thumbs.db" {
            continue;
        }
        if filename.contains(&config.skip_marker) {
            continue;
        }
        let stem = strip_extension(&filename);
        match parse_line(stem) {
            Ok(ParsedLine::Posting(posting)) if posting.verb == Verb::Voucher => {
                match config.period.parse_valuta(posting.date) {
                    Ok(valuta) => {
                        let entry = Entry::from_instruction(
                            config,
                            Verb::Voucher,
                            posting.reference.to_string(),
                            valuta,
                            posting.amount,
                            posting.instruction,
                            posting.free_text.trim().to_string(),
                            stem.to_string(),
                        );
                        if let Err(error) = journal.add_entry(config, entry) {
                            journal.push_error_line(&filename, error.to_string(), true);
                        }
                    }
                    Err(error) => journal.push_error_line(&filename, error.to_string(), true),
                }
            }
            Ok(ParsedLine::Posting(posting)) => {
                let message = format!(
                    "{}: only '{}' is allowed.",
                    filename,
                    Verb::Voucher.keyword()
                );
                let attached = config
                    .period
                    .parse_valuta(posting.date)
                    .and_then(|valuta| journal.push_day_error(valuta, message));
                if let Err(error) = attached {
                    journal.push_error_line(&filename, error.to_string(), true);
                }
            }
            Ok(ParsedLine::Diagnostic) | Err(_) => {
                journal.push_top_error(format!(
                    "file '{}' cannot be matched! Use '{}' in the filename to ignore it.",
                    filename, config.skip_marker
                ));
            }
        }
    }
}

/// Reads a voucher directory; filenames are processed in sorted order so
/// reruns are deterministic.
pub fn materialize_dir(
    config: &Config,
    journal: &mut Journal,
    directory: &Path,
) -> Result<(), LedgerError> {
    let mut names = Vec::new();
    for dir_entry in fs::read_dir(directory)? {
        names.push(dir_entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    materialize_files(config, journal, names);
    Ok(())
}

/// Strips a trailing `.pdf`-style extension (a dot plus lowercase ascii
/// letters) from a voucher filename.
fn strip_extension(name: &str) -> &str {
    if let Some(index) = name.rfind('.') {
        let extension = &name[index + 1..];
        if !extension.is_empty() && extension.bytes().all(|b| b.is_ascii_lowercase()) {
            return &name[..index];
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::strip_extension;

    #[test]
    fn strips_lowercase_extensions_only() {
        assert_eq!(strip_extension("2017-01-04b f 12.60 buch Dummies.pdf"), "2017-01-04b f 12.60 buch Dummies");
        assert_eq!(strip_extension("2017-01-04b f 12.60 buch"), "2017-01-04b f 12.60 buch");
        assert_eq!(strip_extension("name.PDF"), "name.PDF");
        assert_eq!(strip_extension("name."), "name.");
    }
}
