//! Turns a tokenized command into candidate calls.
//!
//! Every non-empty prefix of the words is a possible operation name and the rest of the
//! words are its arguments. `method one more` can therefore mean `methodOneMore()`,
//! `methodOne("more")` or `method("one", "more")`; the matcher decides which exist.

use crate::lexer::Word;
use regex::Regex;
use std::sync::LazyLock;

/// How the words of a multi-word command are joined into an operation name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingConvention {
    /// `method one more` becomes `methodOneMore`.
    #[default]
    CamelCase,
    /// `method one more` becomes `method_one_more`.
    SnakeCase,
}

impl NamingConvention {
    /// Joins plain words into an operation name, e.g. to name catalog entries.
    pub fn name_of(self, words: &[&str]) -> String {
        let words: Vec<Word> = words.iter().map(|w| Word::text(*w)).collect();
        self.join(&words).unwrap_or_default()
    }

    fn join(self, words: &[Word]) -> Option<String> {
        let mut name = String::new();
        for (i, word) in words.iter().enumerate() {
            // a null word can never be part of a name
            let text = word.as_text()?;
            match self {
                _ if i == 0 => name.push_str(text),
                NamingConvention::CamelCase => name.push_str(&capitalize(text)),
                NamingConvention::SnakeCase => {
                    name.push('_');
                    name.push_str(text);
                }
            }
        }
        Some(name)
    }
}

impl std::str::FromStr for NamingConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camel" | "camelCase" => Ok(NamingConvention::CamelCase),
            "snake" | "snake_case" => Ok(NamingConvention::SnakeCase),
            other => Err(format!("unknown naming convention: {}", other)),
        }
    }
}

/// One way of reading a command: an operation name and the words left for its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub arguments: Vec<Word>,
}

struct CandidateBuilder<'a> {
    words: &'a [Word],
    naming: NamingConvention,
}

impl<'a> CandidateBuilder<'a> {
    fn new(words: &'a [Word], naming: NamingConvention) -> Self {
        CandidateBuilder { words, naming }
    }

    fn build(self) -> Vec<Candidate> {
        (1..=self.words.len())
            .rev()
            .filter_map(|split| self.candidate_at(split))
            .collect()
    }

    fn candidate_at(&self, split: usize) -> Option<Candidate> {
        let name = method_name_from(&self.words[..split], self.naming)?;
        Some(Candidate {
            name,
            arguments: self.words[split..].to_vec(),
        })
    }
}

/// Lists every plausible (name, arguments) split, longest name first.
///
/// The order matters: the resolver prefers the longer name when two candidates match.
pub fn candidates_for(words: &[Word], naming: NamingConvention) -> Vec<Candidate> {
    let candidates = CandidateBuilder::new(words, naming).build();
    tracing::trace!(count = candidates.len(), "generated candidates");
    candidates
}

/// Joins `words` into an operation name, or `None` if the result is not an identifier.
pub fn method_name_from(words: &[Word], naming: NamingConvention) -> Option<String> {
    naming.join(words).filter(|name| is_identifier(name))
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{Alphabetic}_][\p{Alphabetic}\p{Nd}_]*$").unwrap());

const KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
    "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Whether `name` can be used as an operation name.
pub fn is_identifier(name: &str) -> bool {
    name != "_" && IDENTIFIER.is_match(name) && !KEYWORDS.contains(&name)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
