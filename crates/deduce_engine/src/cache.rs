//! Per-resolution memoization of atomic query answers.
//!
//! Entries are keyed by the [`Fingerprint`] of an atomic query, so queries
//! that differ only in variable names share one entry. Answers are stored
//! in the fingerprint's canonical variable space and renamed on the way in
//! and out.
//!
//! Every reader of an entry replays the recorded answers and, past the end,
//! drives the shared producer to record more. A reader that needs the
//! producer while an outer reader is already driving it (a recursive rule
//! re-entering its own query) gets no further answers: the cycle is cut and
//! the cut is noted, so the resolver knows to iterate again.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use deduce_foundation::Result;
use tracing::trace;

use crate::answer::{Answer, ConceptMap};
use crate::concludable::{Concludable, Fingerprint, Renaming, invert};
use crate::observer::{Observer, ResolutionEvent};

/// A boxed stream of answers.
pub type AnswerIter = Box<dyn Iterator<Item = Result<Answer>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryState {
    /// Answers are kept from an earlier iteration; no producer is installed.
    Pending,
    /// A producer is installed (or checked out by a reader).
    Producing,
    /// The producer has finished.
    Exhausted,
}

struct Entry {
    answers: Vec<Answer>,
    seen: HashSet<ConceptMap>,
    producer: Option<AnswerIter>,
    /// Renames the producer's answers into canonical space.
    to_canonical: Renaming,
    state: EntryState,
}

impl Entry {
    fn new() -> Self {
        Self {
            answers: Vec::new(),
            seen: HashSet::new(),
            producer: None,
            to_canonical: Renaming::new(),
            state: EntryState::Pending,
        }
    }
}

/// Flags shared between the cache and its streams.
#[derive(Clone)]
struct Shared {
    cut: Rc<Cell<bool>>,
    grew: Rc<Cell<bool>>,
    observer: Option<Rc<dyn Observer>>,
}

impl Shared {
    fn notify(&self, event: impl FnOnce() -> ResolutionEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event());
        }
    }
}

// =============================================================================
// Answer Cache
// =============================================================================

/// Memoized answer streams for the atomic queries of one resolution.
pub struct AnswerCache {
    entries: HashMap<Fingerprint, Rc<RefCell<Entry>>>,
    shared: Shared,
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            shared: Shared {
                cut: Rc::new(Cell::new(false)),
                grew: Rc::new(Cell::new(false)),
                observer: None,
            },
        }
    }

    /// Creates an empty cache reporting to `observer`.
    #[must_use]
    pub fn with_observer(observer: Rc<dyn Observer>) -> Self {
        let mut cache = Self::new();
        cache.shared.observer = Some(observer);
        cache
    }

    /// Installs `producer` as the source of answers for `query` and returns
    /// a stream over the entry. `producer` yields answers in `query`'s
    /// variables.
    pub fn record(&mut self, query: &Concludable, producer: AnswerIter) -> AnswerStream {
        let (fingerprint, renaming) = Fingerprint::of(query);
        let entry = Rc::clone(
            self.entries
                .entry(fingerprint.clone())
                .or_insert_with(|| Rc::new(RefCell::new(Entry::new()))),
        );
        {
            let mut entry = entry.borrow_mut();
            entry.producer = Some(producer);
            entry.to_canonical = renaming.clone();
            entry.state = EntryState::Producing;
        }
        trace!(query = %fingerprint, "recorded producer");
        AnswerStream::new(entry, fingerprint, &renaming, self.shared.clone())
    }

    /// Returns a stream over the entry for `query`, renamed into `query`'s
    /// variables, or `None` if there is no entry or it needs a new producer.
    #[must_use]
    pub fn get_answer_stream(&self, query: &Concludable) -> Option<AnswerStream> {
        let (fingerprint, renaming) = Fingerprint::of(query);
        let entry = self.entries.get(&fingerprint)?;
        if entry.borrow().state == EntryState::Pending {
            return None;
        }
        Some(AnswerStream::new(
            Rc::clone(entry),
            fingerprint,
            &renaming,
            self.shared.clone(),
        ))
    }

    /// Joins each answer of `left` with the answers `right` produces for
    /// it. Pairs that disagree on a shared variable are dropped, and so is
    /// any join result already produced.
    pub fn join<L, F, R>(left: L, right: F) -> JoinStream<L, F, R>
    where
        L: Iterator<Item = Result<Answer>>,
        F: FnMut(&Answer) -> Result<R>,
        R: Iterator<Item = Result<Answer>>,
    {
        JoinStream {
            left,
            right,
            current: None,
            known: HashSet::new(),
        }
    }

    /// Starts a new fixpoint iteration. Recorded answers are kept, producers
    /// are dropped, and every entry will be re-produced on next use.
    pub fn begin_iteration(&mut self) {
        for entry in self.entries.values() {
            let mut entry = entry.borrow_mut();
            entry.producer = None;
            entry.state = EntryState::Pending;
        }
        self.shared.cut.set(false);
        self.shared.grew.set(false);
    }

    /// Returns true if this iteration cut a cycle and recorded new answers,
    /// so a further iteration may find more.
    #[must_use]
    pub fn needs_reiteration(&self) -> bool {
        self.shared.cut.get() && self.shared.grew.get()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of answers recorded for `query`.
    #[must_use]
    pub fn entry_size(&self, query: &Concludable) -> usize {
        let (fingerprint, _) = Fingerprint::of(query);
        self.entries
            .get(&fingerprint)
            .map_or(0, |entry| entry.borrow().answers.len())
    }

    /// Returns true if the producer for `query` has run to completion.
    #[must_use]
    pub fn is_complete(&self, query: &Concludable) -> bool {
        let (fingerprint, _) = Fingerprint::of(query);
        self.entries
            .get(&fingerprint)
            .is_some_and(|entry| entry.borrow().state == EntryState::Exhausted)
    }
}

// =============================================================================
// Answer Stream
// =============================================================================

/// A replaying reader of one cache entry.
pub struct AnswerStream {
    entry: Rc<RefCell<Entry>>,
    fingerprint: Fingerprint,
    from_canonical: Renaming,
    index: usize,
    shared: Shared,
}

impl AnswerStream {
    fn new(entry: Rc<RefCell<Entry>>, fingerprint: Fingerprint, renaming: &Renaming, shared: Shared) -> Self {
        Self {
            entry,
            fingerprint,
            from_canonical: invert(renaming),
            index: 0,
            shared,
        }
    }

    /// Pulls one answer from the producer into the entry. Returns false
    /// when nothing more can be produced now.
    fn produce(&mut self) -> Result<bool> {
        let producer = self.entry.borrow_mut().producer.take();
        let Some(mut producer) = producer else {
            // Checked out by an outer reader of the same entry
            self.shared.cut.set(true);
            trace!(query = %self.fingerprint, "cycle cut");
            self.shared.notify(|| ResolutionEvent::CycleCut {
                fingerprint: self.fingerprint.clone(),
            });
            return Ok(false);
        };

        let next = producer.next();
        let mut entry = self.entry.borrow_mut();
        match next {
            None => {
                entry.state = EntryState::Exhausted;
                Ok(false)
            }
            Some(Err(e)) => {
                entry.producer = Some(producer);
                Err(e)
            }
            Some(Ok(answer)) => {
                entry.producer = Some(producer);
                let canonical = answer.rename(&entry.to_canonical);
                if entry.seen.insert(canonical.concepts.clone()) {
                    entry.answers.push(canonical);
                    self.shared.grew.set(true);
                    let total = entry.answers.len();
                    self.shared.notify(|| ResolutionEvent::AnswerRecorded {
                        fingerprint: self.fingerprint.clone(),
                        total,
                    });
                }
                Ok(true)
            }
        }
    }
}

impl Iterator for AnswerStream {
    type Item = Result<Answer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            {
                let entry = self.entry.borrow();
                if let Some(answer) = entry.answers.get(self.index) {
                    self.index += 1;
                    return Some(Ok(answer.rename(&self.from_canonical)));
                }
                if entry.state != EntryState::Producing {
                    return None;
                }
            }
            match self.produce() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

// =============================================================================
// Join Stream
// =============================================================================

/// Stream produced by [`AnswerCache::join`].
pub struct JoinStream<L, F, R> {
    left: L,
    right: F,
    current: Option<(Answer, R)>,
    known: HashSet<ConceptMap>,
}

impl<L, F, R> Iterator for JoinStream<L, F, R>
where
    L: Iterator<Item = Result<Answer>>,
    F: FnMut(&Answer) -> Result<R>,
    R: Iterator<Item = Result<Answer>>,
{
    type Item = Result<Answer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((left, right)) = &mut self.current {
                match right.next() {
                    Some(Ok(candidate)) => {
                        if let Some(joined) = Answer::join(left, &candidate)
                            && self.known.insert(joined.concepts.clone())
                        {
                            return Some(Ok(joined));
                        }
                        continue;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
            }
            let left = match self.left.next()? {
                Ok(left) => left,
                Err(e) => return Some(Err(e)),
            };
            match (self.right)(&left) {
                Ok(right) => self.current = Some((left, right)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
