//! The owning document tree.
//!
//! A [`Document`] holds the root mapping together with the *dirty* flag and
//! the write generation counter. It provides the two path walks the query
//! engine is built on:
//!
//! * [`Document::resolve`] – the read walk; missing keys are reported as
//!   absent without touching the tree.
//! * [`Document::descend_mut`] – the write walk; missing ancestors are
//!   created as empty mappings on the way down (autovivification).
//!
//! The walks are deliberately separate so that reads never mutate.
//!
//! After every successful mutation [`Document::normalize`] restores the two
//! structural invariants: no stored list has fewer than two elements (a
//! singleton collapses to its element, an empty list is removed), and no
//! stored mapping is empty except the root.

use crate::datum::{Datum, Mapping};
use crate::error::{ApocryphaError, Result};

pub struct Document {
    root: Mapping,
    dirty: bool,
    generation: u64,
}

impl Document {
    /// Wraps a root mapping, normalizing it so that restored state satisfies
    /// the structural invariants regardless of what was on disk.
    pub fn new(root: Mapping) -> Self {
        let mut document = Self {
            root,
            dirty: false,
            generation: 0,
        };
        document.normalize();
        document
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }
    pub fn replace_root(&mut self, root: Mapping) {
        self.root = root;
    }
    pub fn dirty(&self) -> bool {
        self.dirty
    }
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }
    /// Records a successful mutation: bumps the generation and sets *dirty*.
    pub fn mark_changed(&mut self) {
        self.generation += 1;
        self.dirty = true;
    }

    /// Follows `path` by successive key lookup without mutating anything.
    ///
    /// Returns `Ok(None)` when any key along the way is missing, and an
    /// error when the walk would have to pass through a non-mapping.
    pub fn resolve(&self, path: &[String]) -> Result<Option<&Datum>> {
        let mut current = &self.root;
        for (depth, key) in path.iter().enumerate() {
            match current.get(key.as_str()) {
                None => return Ok(None),
                Some(datum) => {
                    if depth + 1 == path.len() {
                        return Ok(Some(datum));
                    }
                    match datum {
                        Datum::Map(inner) => current = inner,
                        other => {
                            return Err(ApocryphaError::Client(format!(
                                "cannot index through {} at '{}'",
                                other.kind(),
                                key
                            )))
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Follows `prefix`, creating missing ancestors as empty mappings, and
    /// returns the mapping at the end of the walk.
    ///
    /// An existing non-mapping on the way is an error; since such an entry
    /// can only precede the first created ancestor, a failed walk has
    /// created nothing.
    pub fn descend_mut(&mut self, prefix: &[String]) -> Result<&mut Mapping> {
        let mut current = &mut self.root;
        for key in prefix {
            if current.get(key.as_str()).is_none() {
                current.insert(key.clone(), Datum::Map(Mapping::new()));
            }
            match current.get_mut(key.as_str()) {
                Some(Datum::Map(inner)) => current = inner,
                Some(other) => {
                    return Err(ApocryphaError::Client(format!(
                        "cannot index through {} at '{}'",
                        other.kind(),
                        key
                    )))
                }
                None => {
                    return Err(ApocryphaError::Internal(format!(
                        "key '{key}' vanished during descent"
                    )))
                }
            }
        }
        Ok(current)
    }

    /// Restores the structural invariants over the whole tree: singleton
    /// lists collapse to strings, empty lists and empty mappings are removed
    /// from their parent. The root itself is never removed.
    pub fn normalize(&mut self) {
        normalize_mapping(&mut self.root);
    }
}

fn normalize_mapping(map: &mut Mapping) {
    let keys: Vec<String> = map.keys().map(str::to_owned).collect();
    for key in keys {
        let mut remove_entry = false;
        if let Some(slot) = map.get_mut(&key) {
            match slot {
                Datum::Map(inner) => {
                    normalize_mapping(inner);
                    remove_entry = inner.is_empty();
                }
                Datum::List(items) => {
                    if items.is_empty() {
                        remove_entry = true;
                    } else if items.len() == 1 {
                        *slot = Datum::Text(items.remove(0));
                    }
                }
                Datum::Text(_) => (),
            }
        }
        if remove_entry {
            map.remove(&key);
        }
    }
}
