//! Parser for the journal text format: one posting or diagnostic per
//! line.
//!
//! [`parse`] consumes the whole journal text and produces a
//! [`cashbook_core::Journal`].  Data problems never abort the parse: an
//! unparsable line becomes a top-level error echoed (commented out) into
//! the regenerated journal, an unresolvable instruction token becomes an
//! error attached to its entry.

use std::str::FromStr;

use log::info;
use pest::Parser;
use pest_derive::Parser as PestParser;
use rust_decimal::Decimal;

use cashbook_core::{Config, Entry, Journal, Verb};

use error::{ParseError, ParseResult};

pub mod error;
pub mod vouchers;

#[derive(PestParser)]
#[grammar = "journal.pest"]
pub struct JournalParser;

/// A single parsed journal line.
#[derive(Debug)]
pub enum ParsedLine<'i> {
    /// `#` comment, `todo` or `fehler` line: emitted by a previous run,
    /// dropped on re-read and regenerated from current state.
    Diagnostic,
    Posting(ParsedPosting<'i>),
}

/// The pieces of a posting line, still borrowed from the input.
#[derive(Debug)]
pub struct ParsedPosting<'i> {
    pub reference: &'i str,
    /// The `yyyy-MM-dd` part of the reference.
    pub date: &'i str,
    pub verb: Verb,
    pub amount: Decimal,
    pub instruction: &'i str,
    pub free_text: &'i str,
}

/// Parses one journal line (or voucher filename).
pub fn parse_line(input: &str) -> ParseResult<ParsedLine<'_>> {
    let mut pairs = JournalParser::parse(Rule::line, input)?;
    let line = pairs
        .next()
        .ok_or_else(|| ParseError::invalid_state("non-empty parse result"))?;
    let inner = line
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::invalid_state("line content"))?;
    match inner.as_rule() {
        Rule::comment | Rule::todo_marker | Rule::error_marker => Ok(ParsedLine::Diagnostic),
        Rule::posting => {
            let span = inner.as_span();
            let mut parts = inner.into_inner();
            let reference = parts
                .next()
                .ok_or_else(|| ParseError::invalid_state("reference"))?
                .as_str();
            let verb_text = parts
                .next()
                .ok_or_else(|| ParseError::invalid_state("verb"))?
                .as_str();
            let verb = match verb_text {
                "b" => Verb::Booking,
                "f" => Verb::Voucher,
                "vorschlag" => Verb::Proposal,
                other => {
                    return Err(ParseError::invalid_input_with_span(
                        format!(
                            "'{}' is invalid. Expected 'f' (voucher posting) or 'b' (posting)!",
                            other
                        ),
                        span,
                    ))
                }
            };
            let amount_pair = parts
                .next()
                .ok_or_else(|| ParseError::invalid_state("amount"))?;
            let amount = Decimal::from_str(amount_pair.as_str()).map_err(|_| {
                ParseError::invalid_input_with_span(
                    format!("'{}' is not an amount!", amount_pair.as_str()),
                    amount_pair.as_span(),
                )
            })?;
            let instruction = parts
                .next()
                .ok_or_else(|| ParseError::invalid_state("instruction"))?
                .as_str();
            let free_text = parts.next().map(|pair| pair.as_str()).unwrap_or("");
            Ok(ParsedLine::Posting(ParsedPosting {
                reference,
                date: &reference[..10],
                verb,
                amount,
                instruction,
                free_text,
            }))
        }
        other => Err(ParseError::invalid_state(format!("{:?}", other))),
    }
}

/// Parses the whole journal text.
///
/// `b` lines become entries; `vorschlag` lines are dropped (they are
/// regenerated by the reconciliation), `f` lines are dropped (they are
/// re-materialized from the voucher directory).  Lines matching nothing
/// are echoed back, commented out, with an error.
pub fn parse(config: &Config, input: &str) -> Journal {
    let mut journal = Journal::new(config);
    let mut bookings = 0usize;
    for raw in input.lines() {
        match parse_line(raw) {
            Ok(ParsedLine::Diagnostic) => {}
            Ok(ParsedLine::Posting(posting)) => match posting.verb {
                Verb::Booking => match config.period.parse_valuta(posting.date) {
                    Ok(valuta) => {
                        let entry = Entry::from_instruction(
                            config,
                            Verb::Booking,
                            posting.reference.to_string(),
                            valuta,
                            posting.amount,
                            posting.instruction,
                            posting.free_text.trim().to_string(),
                            raw.to_string(),
                        );
                        match journal.add_entry(config, entry) {
                            Ok(_) => bookings += 1,
                            Err(error) => {
                                journal.push_error_line(raw, error.to_string(), false)
                            }
                        }
                    }
                    Err(error) => journal.push_error_line(raw, error.to_string(), false),
                },
                Verb::Voucher | Verb::Proposal => {}
            },
            Err(error) => journal.push_error_line(raw, error.to_string(), true),
        }
    }
    info!("parsed {} postings", bookings);
    journal
}
