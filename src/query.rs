//! Query language engine.
//!
//! A query is a non-empty list of tokens. Tokens matching an operator select
//! the verb; everything before the first operator is the path, everything
//! after it the payload. With no operator the query is a pure index.
//!
//! The [`Engine`] borrows a [`Document`] and evaluates one parsed [`Query`]
//! at a time, producing output lines and a `mutated` flag. Mutating verbs
//! follow a validate-before-mutate discipline: every precondition is checked
//! against the read walk before the tree is touched, so a failing query
//! leaves the document unchanged.
//!
//! # Operators
//! | verb | tokens | |
//! |------|--------|---|
//! | index | *(none)* | render the value at the path |
//! | assign | `=` | store a string (one value) or list (several) |
//! | append | `+` | extend a list, promoting a string leaf |
//! | remove | `-` | delete values from a list, or a matching string leaf |
//! | search | `@` | keys whose value holds the target, anywhere in the tree |
//! | keys | `--keys`, `-k` | keys of a mapping leaf |
//! | set | `--set`, `-s` | replace the leaf with a JSON value |
//! | edit | `--edit`, `-e` | the leaf as compact JSON |
//! | delete | `--del`, `-d` | remove the leaf, pruning empty ancestors |
//! | pop | `--pop`, `-p` | render the leaf's tail value and remove it |

use crate::datum::{Datum, Mapping};
use crate::document::Document;
use crate::error::{ApocryphaError, Result};

/// The verb selected by a query's operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Index,
    Assign,
    Append,
    Remove,
    Search,
    Keys,
    Set,
    Edit,
    Delete,
    Pop,
}

impl Verb {
    fn from_token(token: &str) -> Option<Verb> {
        match token {
            "=" => Some(Verb::Assign),
            "+" => Some(Verb::Append),
            "-" => Some(Verb::Remove),
            "@" => Some(Verb::Search),
            "--keys" => Some(Verb::Keys),
            "--set" => Some(Verb::Set),
            "--edit" => Some(Verb::Edit),
            "--del" => Some(Verb::Delete),
            "--pop" => Some(Verb::Pop),
            _ => None,
        }
    }
    /// Pure reads never touch the document and are eligible for caching.
    pub fn is_pure_read(self) -> bool {
        matches!(self, Verb::Index | Verb::Search | Verb::Keys | Verb::Edit)
    }
}

/// Expands the short operator aliases to their long forms. This runs before
/// dispatch and before the cache key is formed, so `a -k` and `a --keys`
/// share one cache entry.
pub fn canonicalize(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            match token.as_str() {
                "-k" => "--keys",
                "-s" => "--set",
                "-e" => "--edit",
                "-d" => "--del",
                "-p" => "--pop",
                other => other,
            }
            .to_owned()
        })
        .collect()
}

/// A parsed query: one verb, the path to its left, the payload to its right.
#[derive(Debug, Clone)]
pub struct Query {
    pub verb: Verb,
    pub path: Vec<String>,
    pub values: Vec<String>,
}

impl Query {
    /// Splits canonical tokens into verb, path and payload, rejecting
    /// queries with more than one operator or the wrong payload arity.
    pub fn parse(tokens: &[String]) -> Result<Query> {
        let mut verb = None;
        let mut split = tokens.len();
        for (position, token) in tokens.iter().enumerate() {
            if let Some(found) = Verb::from_token(token) {
                if verb.is_some() {
                    return Err(client("multiple operators in query"));
                }
                verb = Some(found);
                split = position;
            } else if token.starts_with("--") {
                return Err(ApocryphaError::Client(format!("unknown operator '{token}'")));
            }
        }
        let Some(verb) = verb else {
            return Ok(Query {
                verb: Verb::Index,
                path: tokens.to_vec(),
                values: Vec::new(),
            });
        };
        let path = tokens[..split].to_vec();
        let values = tokens[split + 1..].to_vec();
        match verb {
            Verb::Index => (),
            Verb::Assign => {
                if path.is_empty() {
                    return Err(client("assignment requires a path"));
                }
            }
            Verb::Append => {
                if path.is_empty() {
                    return Err(client("append requires a path"));
                }
                if values.is_empty() {
                    return Err(client("append requires at least one value"));
                }
            }
            Verb::Remove => {
                if path.is_empty() {
                    return Err(client("subtraction requires a path"));
                }
                if values.is_empty() {
                    return Err(client("subtraction requires at least one value"));
                }
            }
            Verb::Search => {
                if !path.is_empty() {
                    return Err(client("search does not take a path"));
                }
                if values.len() != 1 {
                    return Err(client("search takes a single value"));
                }
            }
            Verb::Keys | Verb::Edit => {
                if !values.is_empty() {
                    return Err(client("this operator takes no values"));
                }
            }
            Verb::Set => {
                if values.len() != 1 {
                    return Err(client("set takes a single json value"));
                }
            }
            Verb::Delete | Verb::Pop => {
                if path.is_empty() {
                    return Err(client("this operator requires a path"));
                }
                if !values.is_empty() {
                    return Err(client("this operator takes no values"));
                }
            }
        }
        Ok(Query { verb, path, values })
    }
}

fn client(message: &str) -> ApocryphaError {
    ApocryphaError::Client(message.to_owned())
}

/// The result of evaluating one query.
#[derive(Debug)]
pub struct Evaluation {
    pub lines: Vec<String>,
    pub mutated: bool,
}

/// Evaluates parsed queries against a borrowed document.
pub struct Engine<'db> {
    document: &'db mut Document,
}

impl<'db> Engine<'db> {
    pub fn new(document: &'db mut Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, query: &Query) -> Result<Evaluation> {
        match query.verb {
            Verb::Index => self.index(&query.path),
            Verb::Assign => self.assign(&query.path, &query.values),
            Verb::Append => self.append(&query.path, &query.values),
            Verb::Remove => self.remove(&query.path, &query.values),
            Verb::Search => self.search(&query.values[0]),
            Verb::Keys => self.keys(&query.path),
            Verb::Set => self.set_json(&query.path, &query.values[0]),
            Verb::Edit => self.edit(&query.path),
            Verb::Delete => self.delete(&query.path),
            Verb::Pop => self.pop(&query.path),
        }
    }

    fn index(&self, path: &[String]) -> Result<Evaluation> {
        if path.is_empty() {
            return read(render_mapping(self.document.root()));
        }
        match self.document.resolve(path)? {
            None => read(Vec::new()),
            Some(datum) => read(render_lines(datum)),
        }
    }

    fn assign(&mut self, path: &[String], values: &[String]) -> Result<Evaluation> {
        let (key, prefix) = split_leaf(path)?;
        let parent = self.document.descend_mut(prefix)?;
        let mutated = match values.len() {
            0 => parent.remove(key).is_some(),
            1 => {
                parent.insert(key.to_owned(), Datum::Text(values[0].clone()));
                true
            }
            _ => {
                parent.insert(key.to_owned(), Datum::List(values.to_vec()));
                true
            }
        };
        self.finish_mutation(Vec::new(), mutated)
    }

    fn append(&mut self, path: &[String], values: &[String]) -> Result<Evaluation> {
        match self.document.resolve(path)? {
            // absent leaf: behaves as assignment
            None => return self.assign(path, values),
            Some(Datum::Map(_)) => return Err(client("cannot append to dict")),
            Some(_) => (),
        }
        let (key, prefix) = split_leaf(path)?;
        let parent = self.document.descend_mut(prefix)?;
        if let Some(slot) = parent.get_mut(key) {
            match slot {
                Datum::Text(head) => {
                    let mut items = Vec::with_capacity(values.len() + 1);
                    items.push(std::mem::take(head));
                    items.extend(values.iter().cloned());
                    *slot = Datum::List(items);
                }
                Datum::List(items) => items.extend(values.iter().cloned()),
                Datum::Map(_) => return Err(client("cannot append to dict")),
            }
        }
        self.finish_mutation(Vec::new(), true)
    }

    fn remove(&mut self, path: &[String], values: &[String]) -> Result<Evaluation> {
        match self.document.resolve(path)? {
            None => return Err(client("cannot subtract from an absent key")),
            Some(Datum::Map(_)) => return Err(client("cannot subtract from dict")),
            Some(Datum::List(items)) => {
                for value in values {
                    if !items.contains(value) {
                        return Err(client("value not found"));
                    }
                }
            }
            Some(Datum::Text(text)) => {
                if values.len() != 1 || values[0] != *text {
                    return Err(client("value not found"));
                }
            }
        }
        let (key, prefix) = split_leaf(path)?;
        let parent = self.document.descend_mut(prefix)?;
        let mut remove_entry = false;
        if let Some(slot) = parent.get_mut(key) {
            match slot {
                Datum::List(items) => items.retain(|item| !values.contains(item)),
                Datum::Text(_) => remove_entry = true,
                Datum::Map(_) => (),
            }
        }
        if remove_entry {
            parent.remove(key);
        }
        self.finish_mutation(Vec::new(), true)
    }

    fn search(&self, target: &str) -> Result<Evaluation> {
        let mut lines = Vec::new();
        search_mapping(self.document.root(), target, &mut lines);
        read(lines)
    }

    fn keys(&self, path: &[String]) -> Result<Evaluation> {
        let mapping = if path.is_empty() {
            self.document.root()
        } else {
            match self.document.resolve(path)? {
                Some(Datum::Map(mapping)) => mapping,
                Some(other) => {
                    return Err(ApocryphaError::Client(format!(
                        "cannot retrieve keys of {}",
                        other.kind()
                    )))
                }
                None => return Err(client("cannot retrieve keys of an absent key")),
            }
        };
        read(mapping.keys().map(str::to_owned).collect())
    }

    fn set_json(&mut self, path: &[String], text: &str) -> Result<Evaluation> {
        let value: Datum = serde_json::from_str(text).map_err(|_| client("malformed json"))?;
        if path.is_empty() {
            // bare `--set` replaces the whole database
            match value {
                Datum::Map(root) => self.document.replace_root(root),
                other => {
                    return Err(ApocryphaError::Client(format!(
                        "the root must be a dict, not a {}",
                        other.kind()
                    )))
                }
            }
        } else {
            let (key, prefix) = split_leaf(path)?;
            let parent = self.document.descend_mut(prefix)?;
            parent.insert(key.to_owned(), value);
        }
        self.finish_mutation(Vec::new(), true)
    }

    fn edit(&self, path: &[String]) -> Result<Evaluation> {
        let line = if path.is_empty() {
            to_json_text(self.document.root())?
        } else {
            match self.document.resolve(path)? {
                Some(datum) => to_json_text(datum)?,
                None => "{}".to_owned(),
            }
        };
        read(vec![line])
    }

    fn delete(&mut self, path: &[String]) -> Result<Evaluation> {
        if self.document.resolve(path)?.is_none() {
            // deleting nothing is a no-op, not an error
            return Ok(Evaluation {
                lines: Vec::new(),
                mutated: false,
            });
        }
        let (key, prefix) = split_leaf(path)?;
        let parent = self.document.descend_mut(prefix)?;
        parent.remove(key);
        self.finish_mutation(Vec::new(), true)
    }

    fn pop(&mut self, path: &[String]) -> Result<Evaluation> {
        if self.document.resolve(path)?.is_none() {
            return Ok(Evaluation {
                lines: Vec::new(),
                mutated: false,
            });
        }
        let (key, prefix) = split_leaf(path)?;
        let parent = self.document.descend_mut(prefix)?;
        let is_list = matches!(parent.get(key), Some(Datum::List(_)));
        let lines = if is_list {
            match parent.get_mut(key) {
                Some(Datum::List(items)) => items.pop().map(|tail| vec![tail]).unwrap_or_default(),
                _ => Vec::new(),
            }
        } else {
            parent
                .remove(key)
                .map(|gone| render_lines(&gone))
                .unwrap_or_default()
        };
        self.finish_mutation(lines, true)
    }

    fn finish_mutation(&mut self, lines: Vec<String>, mutated: bool) -> Result<Evaluation> {
        // also prunes ancestors autovivified by a no-op write
        self.document.normalize();
        if mutated {
            self.document.mark_changed();
        }
        Ok(Evaluation { lines, mutated })
    }
}

fn split_leaf(path: &[String]) -> Result<(&str, &[String])> {
    match path.split_last() {
        Some((key, prefix)) => Ok((key.as_str(), prefix)),
        None => Err(ApocryphaError::Internal("empty path in mutation".to_owned())),
    }
}

fn read(lines: Vec<String>) -> Result<Evaluation> {
    Ok(Evaluation {
        lines,
        mutated: false,
    })
}

/// The textual rendering of an indexed value: strings on one line, lists one
/// element per line, mappings as their single-line dict form.
fn render_lines(datum: &Datum) -> Vec<String> {
    match datum {
        Datum::Text(text) => vec![text.clone()],
        Datum::List(items) => items.clone(),
        Datum::Map(mapping) => render_mapping(mapping),
    }
}

fn render_mapping(mapping: &Mapping) -> Vec<String> {
    if mapping.is_empty() {
        Vec::new()
    } else {
        vec![mapping.to_string()]
    }
}

/// Depth-first over mappings in insertion order, emitting the key of every
/// entry whose string value equals the target or whose list value contains
/// it. One line per matching entry.
fn search_mapping(mapping: &Mapping, target: &str, lines: &mut Vec<String>) {
    for (key, value) in mapping.iter() {
        match value {
            Datum::Text(text) => {
                if text == target {
                    lines.push(key.to_owned());
                }
            }
            Datum::List(items) => {
                if items.iter().any(|item| item == target) {
                    lines.push(key.to_owned());
                }
            }
            Datum::Map(inner) => search_mapping(inner, target, lines),
        }
    }
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ApocryphaError::Internal(e.to_string()))
}
