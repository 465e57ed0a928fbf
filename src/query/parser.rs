use super::ast::{Operator, Value};
use super::filter::Filter;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unmatched quote {quote} opened at position {pos}")]
    UnterminatedQuote { quote: char, pos: usize },

    #[error("unexpected end of string after escape at position {pos}")]
    DanglingEscape { pos: usize },

    #[error("invalid filter '{token}': expected key:OPvalue")]
    MissingColon { token: String },

    #[error("invalid filter '{token}': empty key")]
    EmptyKey { token: String },

    #[error("invalid filter '{token}': expected operator (=, !=, <, <=, >, >=, %)")]
    UnknownOperator { token: String },

    #[error("invalid filter '{token}': missing value")]
    MissingValue { token: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Bare,
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    /// After a backslash; resumes the given quoting once a character is taken.
    Escaped(Quoting),
}

impl State {
    fn resume(quoting: Quoting) -> State {
        match quoting {
            Quoting::Bare => State::Normal,
            Quoting::Single => State::InSingleQuote,
            Quoting::Double => State::InDoubleQuote,
        }
    }
}

/// One whitespace-separated clause with quotes and escapes resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    /// Byte offset in `text` where the most recent quoted section began.
    quoted_from: Option<usize>,
}

struct Tokenizer {
    state: State,
    tokens: Vec<Token>,
    current: String,
    quoted_from: Option<usize>,
    /// Input position of the open quote or pending escape, for errors.
    mark: usize,
}

impl Tokenizer {
    fn new() -> Self {
        Self {
            state: State::Normal,
            tokens: Vec::new(),
            current: String::new(),
            quoted_from: None,
            mark: 0,
        }
    }

    fn run(mut self, input: &str) -> Result<Vec<Token>, ParseError> {
        for (pos, c) in input.char_indices() {
            self.state = match (self.state, c) {
                (State::Escaped(quoting), c) => {
                    self.current.push(c);
                    State::resume(quoting)
                }
                (State::Normal, c) if c.is_whitespace() => {
                    self.finish_token();
                    State::Normal
                }
                (State::Normal, '\\') => self.escape(pos, Quoting::Bare),
                (State::Normal, '\'') => self.open_quote(pos, State::InSingleQuote),
                (State::Normal, '"') => self.open_quote(pos, State::InDoubleQuote),
                (State::InSingleQuote, '\\') => self.escape(pos, Quoting::Single),
                (State::InDoubleQuote, '\\') => self.escape(pos, Quoting::Double),
                (State::InSingleQuote, '\'') | (State::InDoubleQuote, '"') => State::Normal,
                (state, c) => {
                    self.current.push(c);
                    state
                }
            };
        }

        match self.state {
            State::Normal => {
                self.finish_token();
                Ok(self.tokens)
            }
            State::InSingleQuote => Err(ParseError::UnterminatedQuote {
                quote: '\'',
                pos: self.mark,
            }),
            State::InDoubleQuote => Err(ParseError::UnterminatedQuote {
                quote: '"',
                pos: self.mark,
            }),
            State::Escaped(_) => Err(ParseError::DanglingEscape { pos: self.mark }),
        }
    }

    fn escape(&mut self, pos: usize, quoting: Quoting) -> State {
        self.mark = pos;
        State::Escaped(quoting)
    }

    fn open_quote(&mut self, pos: usize, state: State) -> State {
        self.mark = pos;
        self.quoted_from = Some(self.current.len());
        state
    }

    fn finish_token(&mut self) {
        // Whitespace runs and a lone `""` leave nothing to parse.
        if self.current.is_empty() {
            self.quoted_from = None;
            return;
        }
        self.tokens.push(Token {
            text: std::mem::take(&mut self.current),
            quoted_from: self.quoted_from.take(),
        });
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer::new().run(input)
}

fn parse_clause(token: &Token) -> Result<(String, Operator, Value), ParseError> {
    let Some((key, rest)) = token.text.split_once(':') else {
        return Err(ParseError::MissingColon {
            token: token.text.clone(),
        });
    };

    if key.is_empty() {
        return Err(ParseError::EmptyKey {
            token: token.text.clone(),
        });
    }

    let Some((op, operand)) = Operator::split_prefix(rest) else {
        return Err(ParseError::UnknownOperator {
            token: token.text.clone(),
        });
    };

    let operand_start = key.len() + 1;
    let quoted = token.quoted_from.is_some_and(|at| at >= operand_start);

    let value = if quoted {
        Value::Text(operand.to_string())
    } else if operand.is_empty() {
        return Err(ParseError::MissingValue {
            token: token.text.clone(),
        });
    } else {
        Value::infer(operand)
    };

    Ok((key.to_string(), op, value))
}

/// Parses filter text. Every clause is appended, so repeated keys and
/// operators all survive.
pub fn parse(input: &str) -> Result<Filter, ParseError> {
    tokenize(input)?
        .iter()
        .try_fold(Filter::new(), |filter, token| {
            let (key, op, value) = parse_clause(token)?;
            Ok(filter.add(key, op, value))
        })
}
