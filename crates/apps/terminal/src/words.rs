//! Vocabulary book and the `words` sub-context that edits it.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use rand::{seq::IndexedRandom, Rng};
use serde::{Deserialize, Serialize};
use shell_engine::{Command, Context, ParamKind, Parameter, ResolvedArgs, ShellError};
use thiserror::Error;

/// Prompt of the words context.
pub const WORDS_PROMPT: &str = "words> ";
/// Page size of `list` when none is given.
pub const DEFAULT_PER_PAGE: usize = 10;

/// One vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub id: u64,
    pub word: String,
    pub language: String,
    pub strength: u32,
    pub synonyms: Vec<String>,
}

impl WordRecord {
    /// Multi-line description used by `find` and `random`.
    pub fn pretty(&self) -> String {
        format!(
            "Word: {}\nLanguage: {}\nID: {}\nStrength: {}\nSynonyms: {}",
            self.word,
            self.language,
            self.id,
            self.strength,
            self.synonyms.join(", ")
        )
    }
}

/// One page of [`WordBook::page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPage {
    /// 1-based page number.
    pub page: usize,
    /// Total number of pages; at least 1.
    pub pages: usize,
    pub items: Vec<WordRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordBookError {
    #[error("Word '{word}' already exists in {language}.")]
    Duplicate { word: String, language: String },
    #[error("Word '{0}' not found.")]
    NotFound(String),
    #[error("No words found for language '{0}'.")]
    EmptyLanguage(String),
    #[error("Page must be a positive number.")]
    InvalidPage,
    #[error("Results per page must be a positive number.")]
    InvalidPerPage,
    #[error("No synonyms given.")]
    NoSynonyms,
}

/// In-memory vocabulary keyed by (word, language).
#[derive(Debug, Clone, Default)]
pub struct WordBook {
    words: BTreeMap<(String, String), WordRecord>,
    next_id: u64,
}

impl WordBook {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Adds a new word.
    pub fn add(&mut self, word: &str, language: &str) -> Result<&WordRecord, WordBookError> {
        let key = (word.to_string(), language.to_string());
        if self.words.contains_key(&key) {
            return Err(WordBookError::Duplicate {
                word: key.0,
                language: key.1,
            });
        }
        self.next_id += 1;
        let record = WordRecord {
            id: self.next_id,
            word: key.0.clone(),
            language: key.1.clone(),
            strength: 0,
            synonyms: Vec::new(),
        };
        Ok(self.words.entry(key).or_insert(record))
    }

    /// Looks up `word`, optionally restricted to one language.
    pub fn find(&self, word: &str, language: Option<&str>) -> Option<&WordRecord> {
        self.words
            .values()
            .find(|record| record.word == word && language.map_or(true, |lang| record.language == lang))
    }

    /// Removes `word` from `language`, or from every language when none is given.
    ///
    /// Returns the number of removed records.
    pub fn delete(&mut self, word: &str, language: Option<&str>) -> Result<usize, WordBookError> {
        let before = self.words.len();
        self.words.retain(|(stored_word, stored_language), _| {
            stored_word != word || language.is_some_and(|lang| lang != stored_language)
        });
        match before - self.words.len() {
            0 => Err(WordBookError::NotFound(word.to_string())),
            removed => Ok(removed),
        }
    }

    /// Returns a 1-based page of words, optionally filtered by language.
    ///
    /// Pages past the end are empty.
    pub fn page(
        &self,
        language: Option<&str>,
        page: usize,
        per_page: usize,
    ) -> Result<WordPage, WordBookError> {
        if page == 0 {
            return Err(WordBookError::InvalidPage);
        }
        if per_page == 0 {
            return Err(WordBookError::InvalidPerPage);
        }
        let matching: Vec<&WordRecord> = self
            .words
            .values()
            .filter(|record| language.map_or(true, |lang| record.language == lang))
            .collect();
        let pages = matching.len().div_ceil(per_page).max(1);
        let items = match (page - 1).checked_mul(per_page) {
            Some(skip) => matching
                .into_iter()
                .skip(skip)
                .take(per_page)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(WordPage { page, pages, items })
    }

    /// Picks a uniformly random word of `language`.
    pub fn random<R: Rng + ?Sized>(
        &self,
        language: &str,
        rng: &mut R,
    ) -> Result<&WordRecord, WordBookError> {
        let candidates: Vec<&WordRecord> = self
            .words
            .values()
            .filter(|record| record.language == language)
            .collect();
        candidates
            .choose(rng)
            .copied()
            .ok_or_else(|| WordBookError::EmptyLanguage(language.to_string()))
    }

    /// Replaces the synonyms of a word with a comma-separated list in `synonym_language`.
    pub fn set_synonyms(
        &mut self,
        word: &str,
        language: &str,
        synonym_list: &str,
        synonym_language: &str,
    ) -> Result<&WordRecord, WordBookError> {
        let synonyms: Vec<String> = synonym_list
            .split(',')
            .map(str::trim)
            .filter(|synonym| !synonym.is_empty())
            .map(|synonym| format!("{synonym} ({synonym_language})"))
            .collect();
        if synonyms.is_empty() {
            return Err(WordBookError::NoSynonyms);
        }
        let record = self
            .words
            .get_mut(&(word.to_string(), language.to_string()))
            .ok_or_else(|| WordBookError::NotFound(word.to_string()))?;
        record.synonyms = synonyms;
        Ok(record)
    }
}

/// Shared handle to a [`WordBook`] captured by the words commands.
pub type SharedWordBook = Rc<RefCell<WordBook>>;

fn required<'a>(args: &'a ResolvedArgs, name: &str) -> Result<&'a str, ShellError> {
    args.text(name)
        .ok_or_else(|| ShellError::missing_positional(name))
}

fn count(args: &ResolvedArgs, name: &str, default: usize, invalid: WordBookError) -> Result<usize, ShellError> {
    match args.integer(name) {
        None => Ok(default),
        Some(value) => usize::try_from(value)
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| book_error(invalid)),
    }
}

fn book_error(err: WordBookError) -> ShellError {
    ShellError::handler(err.to_string())
}

fn text_param(name: &str, description: &str) -> Parameter {
    Parameter::positional(name, ParamKind::Text, description)
}

/// Builds the `words` context over `book`.
///
/// # Errors
///
/// Fails only if a command schema is malformed.
pub fn words_context(book: SharedWordBook) -> Result<Context, ShellError> {
    let commands = vec![
        find_command(book.clone())?,
        list_command(book.clone())?,
        add_command(book.clone())?,
        delete_command(book.clone())?,
        random_command(book.clone())?,
        synonyms_command(book)?,
    ];
    Ok(Context::with_commands("words", WORDS_PROMPT, commands))
}

fn find_command(book: SharedWordBook) -> Result<Command, ShellError> {
    Command::from_fn(
        "find",
        "Find a word in the database.",
        vec![
            text_param("word", "word to find").required(),
            text_param("language", "language"),
        ],
        move |context, args| {
            let book = book.clone();
            async move {
                let word = required(&args, "word")?;
                let book = book.borrow();
                let record = book
                    .find(word, args.text("language"))
                    .ok_or_else(|| book_error(WordBookError::NotFound(word.to_string())))?;
                context.out(&record.pretty());
                context.br();
                Ok(())
            }
        },
    )
}

fn list_command(book: SharedWordBook) -> Result<Command, ShellError> {
    Command::from_fn(
        "list",
        "Get a paginated list of words",
        vec![
            Parameter::named("language", ParamKind::Text, "language to filter by").alias("l"),
            Parameter::named("page", ParamKind::Integer, "page of words").alias("p"),
            Parameter::named("per_page", ParamKind::Integer, "results per page").alias("n"),
        ],
        move |context, args| {
            let book = book.clone();
            async move {
                let page = count(&args, "page", 1, WordBookError::InvalidPage)?;
                let per_page = count(&args, "per_page", DEFAULT_PER_PAGE, WordBookError::InvalidPerPage)?;
                let listing = book
                    .borrow()
                    .page(args.text("language"), page, per_page)
                    .map_err(book_error)?;

                let mut out = format!("Showing page {} of {}.\n", listing.page, listing.pages);
                for item in &listing.items {
                    out.push_str(&format!("{}, {}, {}\n", item.word, item.language, item.strength));
                }
                context.out(&out);
                Ok(())
            }
        },
    )
}

fn add_command(book: SharedWordBook) -> Result<Command, ShellError> {
    Command::from_fn(
        "add",
        "Add a new word to the database.",
        vec![
            text_param("word", "word to add").required(),
            text_param("language", "language").required(),
        ],
        move |context, args| {
            let book = book.clone();
            async move {
                let word = required(&args, "word")?;
                let language = required(&args, "language")?;
                book.borrow_mut().add(word, language).map_err(book_error)?;
                context.out(&format!("Word '{word}' added to {language}."));
                context.br();
                Ok(())
            }
        },
    )
}

fn delete_command(book: SharedWordBook) -> Result<Command, ShellError> {
    Command::from_fn(
        "delete",
        "Delete a word from the database.",
        vec![
            text_param("word", "word to delete").required(),
            Parameter::named("language", ParamKind::Text, "language"),
        ],
        move |context, args| {
            let book = book.clone();
            async move {
                let word = required(&args, "word")?;
                let removed = book
                    .borrow_mut()
                    .delete(word, args.text("language"))
                    .map_err(book_error)?;
                context.out(&format!("Deleted {removed} record(s) for '{word}'."));
                context.br();
                Ok(())
            }
        },
    )
}

fn random_command(book: SharedWordBook) -> Result<Command, ShellError> {
    Command::from_fn(
        "random",
        "Get a random word from the database.",
        vec![text_param("language", "language").required()],
        move |context, args| {
            let book = book.clone();
            async move {
                let language = required(&args, "language")?;
                let book = book.borrow();
                let record = book
                    .random(language, &mut rand::rng())
                    .map_err(book_error)?;
                context.out(&record.pretty());
                context.br();
                Ok(())
            }
        },
    )
}

fn synonyms_command(book: SharedWordBook) -> Result<Command, ShellError> {
    Command::from_fn(
        "synonyms",
        "Update the synonyms for a word.",
        vec![
            text_param("word", "word to update").required(),
            text_param("language", "language").required(),
            text_param("synonym_list", "comma-separated list of synonyms").required(),
            text_param("synonym_language", "language of synonyms").required(),
        ],
        move |context, args| {
            let book = book.clone();
            async move {
                let word = required(&args, "word")?;
                book.borrow_mut()
                    .set_synonyms(
                        word,
                        required(&args, "language")?,
                        required(&args, "synonym_list")?,
                        required(&args, "synonym_language")?,
                    )
                    .map_err(book_error)?;
                context.out(&format!("Synonyms updated for '{word}'."));
                context.br();
                Ok(())
            }
        },
    )
}
