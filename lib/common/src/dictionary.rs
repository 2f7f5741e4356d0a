use crate::error::{EngineResult, NotFoundError};
use dashmap::DashMap;
use rdf_bucket_model::Atom;
use rustc_hash::FxHasher;
use std::fmt::Debug;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Maps the textual representation of atoms to their internal ids and back.
///
/// The engine only calls [AtomDictionary::intern] while bulk loading. Queries exclusively use the
/// two lookup functions and fail with a [NotFoundError] on a miss.
pub trait AtomDictionary: Debug + Send + Sync {
    /// Returns the id of `text`.
    fn internal_of(&self, text: &str) -> EngineResult<Atom>;

    /// Returns the text of `atom`.
    fn text_of(&self, atom: Atom) -> EngineResult<String>;

    /// Returns the id of `text`, allocating a new one if necessary.
    fn intern(&self, text: &str) -> Atom;

    /// Returns the number of atoms in the dictionary.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maintains the atom dictionary in memory.
///
/// Ids are allocated by a counter that starts at 1.
#[derive(Debug)]
pub struct MemAtomDictionary {
    /// Contains the next free atom id.
    next_id: AtomicI64,
    /// Maps atoms to their text.
    id2text: DashMap<Atom, Arc<str>, BuildHasherDefault<FxHasher>>,
    /// Maps texts to their atom.
    text2id: DashMap<Arc<str>, Atom, BuildHasherDefault<FxHasher>>,
}

impl Default for MemAtomDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl MemAtomDictionary {
    /// Creates a new empty [MemAtomDictionary].
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            id2text: DashMap::with_hasher(BuildHasherDefault::default()),
            text2id: DashMap::with_hasher(BuildHasherDefault::default()),
        }
    }
}

impl AtomDictionary for MemAtomDictionary {
    fn internal_of(&self, text: &str) -> EngineResult<Atom> {
        self.text2id
            .get(text)
            .map(|entry| *entry.value())
            .ok_or_else(|| NotFoundError::AtomText(text.to_owned()).into())
    }

    fn text_of(&self, atom: Atom) -> EngineResult<String> {
        self.id2text
            .get(&atom)
            .map(|entry| entry.value().to_string())
            .ok_or_else(|| NotFoundError::AtomId(atom).into())
    }

    fn intern(&self, text: &str) -> Atom {
        if let Some(atom) = self.text2id.get(text) {
            return *atom.value();
        }

        let text: Arc<str> = Arc::from(text);
        *self
            .text2id
            .entry(Arc::clone(&text))
            .or_insert_with(|| {
                let atom = Atom(self.next_id.fetch_add(1, Ordering::Relaxed));
                self.id2text.insert(atom, Arc::clone(&text));
                atom
            })
            .value()
    }

    fn len(&self) -> usize {
        self.text2id.len()
    }
}
