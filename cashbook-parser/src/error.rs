use std::error::Error;
use std::fmt;

use pest::Span;

use super::Rule;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Clone, Debug, PartialEq)]
pub enum ParseErrorKind {
    /// Input is invalid in some way.
    InvalidInput { message: String },
    /// Parser has reached an invalid state (most likely a bug in the parser).
    InvalidParserState { message: String },
}

#[derive(Debug)]
pub struct ParseError {
    /// The type of error.
    pub kind: ParseErrorKind,
    /// The (line, column) location of the error in the input.
    pub location: (usize, usize),
    source: Option<Box<dyn Error + 'static + Send + Sync>>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::InvalidInput { message } => {
                write!(f, "invalid: {}", message)
            }
            ParseErrorKind::InvalidParserState { message } => write!(
                f,
                "parser has reached an invalid state (please report this as a bug): expected {}",
                message
            ),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl ParseError {
    pub(crate) fn invalid_state<T: ToString>(msg: T) -> ParseError {
        ParseError {
            kind: ParseErrorKind::InvalidParserState {
                message: msg.to_string(),
            },
            location: (0, 0),
            source: None,
        }
    }

    pub(crate) fn invalid_input_with_span<T: ToString>(msg: T, span: Span) -> ParseError {
        ParseError {
            kind: ParseErrorKind::InvalidInput {
                message: msg.to_string(),
            },
            location: span.start_pos().line_col(),
            source: None,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let message = match &err.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } => {
                let expected: Vec<&str> = positives.iter().map(rule_name).collect();
                format!("expected {}", expected.join(" or "))
            }
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };
        let location = match &err.line_col {
            pest::error::LineColLocation::Pos(p) => *p,
            pest::error::LineColLocation::Span(p, _) => *p,
        };
        ParseError {
            kind: ParseErrorKind::InvalidInput { message },
            location,
            source: Some(Box::new(err)),
        }
    }
}

fn rule_name(rule: &Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of line",
        Rule::sep => "whitespace",
        Rule::date => "a date",
        Rule::suffix => "a reference suffix",
        Rule::reference => "a reference (yyyy-MM-dd plus letters)",
        Rule::verb => "a verb",
        Rule::amount => "an amount",
        Rule::token => "an instruction token",
        Rule::instruction => "an instruction",
        Rule::free_text => "free text",
        Rule::posting => "a posting",
        Rule::comment => "a comment",
        Rule::todo_marker => "a todo line",
        Rule::error_marker => "an error line",
        Rule::line => "a journal line",
    }
}
