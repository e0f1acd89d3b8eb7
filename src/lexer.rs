//! A module implementing lexical analysis (tokenization) of command lines.
//!
//! Words are separated by whitespace. Double quotes make whitespace literal, and a
//! backslash escapes the next character: `\ `, `\\`, `\"`, `\n`, `\t`, and `\0` which
//! stands for an explicit null parameter.

use crate::error::{LexingError, SyntaxError};
use std::fmt;

/// A word of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    /// Literal text with quotes and escapes already resolved.
    Text(String),
    /// The `\0` word.
    Null,
}

impl Word {
    pub fn text(s: impl Into<String>) -> Self {
        Word::Text(s.into())
    }

    /// The text of the word, or `None` for the null word.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Word::Text(s) => Some(s),
            Word::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Word::Null)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Text(s) => f.write_str(s),
            Word::Null => f.write_str("\\0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingDoubleQuote,
    Escaping { quoted: bool },
}

struct LexingFSM<'a> {
    command: &'a str,
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl<'a> LexingFSM<'a> {
    fn new(command: &'a str) -> Self {
        LexingFSM {
            command,
            input: command.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole command and returns the words found.
    fn make_words(&mut self) -> Result<Vec<Word>, SyntaxError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
                LexingState::Escaping { quoted } => self.handle_escape(ch, quoted, &mut out)?,
            }
        }

        // An open quote wins over a dangling backslash inside it
        match self.state {
            LexingState::ReadingDoubleQuote | LexingState::Escaping { quoted: true } => {
                return Err(self.error_at(LexingError::DoubleQuoteExpected, self.input.len()));
            }
            LexingState::Escaping { quoted: false } => {
                return Err(self.error_at(LexingError::EscapeSequenceExpected, self.input.len()));
            }
            _ => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => self.state = LexingState::Escaping { quoted: false },
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Word>) {
        match ch {
            c if c.is_whitespace() => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => self.state = LexingState::Escaping { quoted: false },
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => self.state = LexingState::Escaping { quoted: true },
            c => self.buffer.push(c),
        }
    }

    fn handle_escape(&mut self, ch: char, quoted: bool, out: &mut Vec<Word>) -> Result<(), SyntaxError> {
        let unescaped = match ch {
            ' ' => ' ',
            '\\' => '\\',
            '"' => '"',
            'n' => '\n',
            't' => '\t',
            '0' => {
                if !self.buffer.is_empty() {
                    return Err(self.error_at(LexingError::NullNotAllowedHere, self.pos - 1));
                }
                out.push(Word::Null);
                self.state = self.after_escape(quoted);
                return Ok(());
            }
            _ => return Err(self.error_at(LexingError::EscapeSequenceExpected, self.pos - 1)),
        };
        self.buffer.push(unescaped);
        self.state = self.after_escape(quoted);
        Ok(())
    }

    fn after_escape(&self, quoted: bool) -> LexingState {
        if quoted {
            LexingState::ReadingDoubleQuote
        } else {
            LexingState::ReadingWord
        }
    }

    /// Emits the buffered text as a word. Empty buffers (e.g. `""`) produce nothing.
    fn finish_word(&mut self, out: &mut Vec<Word>) {
        if !self.buffer.is_empty() {
            out.push(Word::Text(std::mem::take(&mut self.buffer)));
        }
    }

    fn error_at(&self, reason: LexingError, position: usize) -> SyntaxError {
        SyntaxError::new(self.command, reason, position)
    }
}

/// Splits a command line into words.
///
/// Words are separated by whitespace. See the module docs for quoting and escapes.
///
/// # Arguments
/// * `command` - The command line to be split.
///
/// # Returns
/// `Result<Vec<Word>, SyntaxError>`: The words in order, empty for a blank command, or a
/// `SyntaxError` pointing at the offending character offset.
pub fn split_into_words(command: &str) -> Result<Vec<Word>, SyntaxError> {
    let mut lexer = LexingFSM::new(command);
    let words = lexer.make_words()?;
    tracing::trace!(?words, "tokenized command");
    Ok(words)
}
