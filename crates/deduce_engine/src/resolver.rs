//! Query resolution.
//!
//! A query conjunction is split into concludables, each resolved as an
//! atomic query and joined back together. An atomic query is answered by a
//! lookup over stored facts followed by every rule whose head unifies with
//! it: the rule body is resolved recursively, each body answer concludes a
//! fact, and the fact is mapped back through the unifier.
//!
//! Recursive rules re-enter atomic queries that are still being answered.
//! Such readers stop at the answers recorded so far, and the whole query is
//! re-run until an iteration records nothing new.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeSet, HashSet};
use std::iter;
use std::rc::Rc;
use std::sync::Arc;

use deduce_foundation::{Error, ErrorContext, Result, SemanticLimit};
use tracing::{debug, trace};

use crate::answer::{Answer, ConceptMap, Explanation};
use crate::cache::{AnswerCache, AnswerIter};
use crate::concludable::{Concludable, ConjunctionConcludable, Fingerprint, extract};
use crate::conclusion::ConclusionBuilder;
use crate::config::ReasonerConfig;
use crate::observer::{Observer, ResolutionEvent};
use crate::pattern::{Conjunction, Constraint, Negation, Operand, Reference};
use crate::rule::Rule;
use crate::storage::Storage;
use crate::typing::TypeHinter;
use crate::unify::Unifier;

// =============================================================================
// Reasoner
// =============================================================================

/// Answers queries over a [`Storage`] using its rules.
///
/// ```
/// use deduce_engine::{GraphStorage, Reasoner, pattern::Conjunction};
/// use deduce_storage::{Graph, Schema};
///
/// let mut schema = Schema::new();
/// schema.define_entity("person", None).unwrap();
/// let mut graph = Graph::new(schema);
/// graph.insert_entity("person").unwrap();
///
/// let reasoner = Reasoner::new(GraphStorage::new(graph));
/// let query = Conjunction::builder().isa("x", "person").build();
/// let answers: Vec<_> = reasoner.resolve(&query).unwrap().collect();
/// assert_eq!(answers.len(), 1);
/// ```
pub struct Reasoner<S> {
    storage: Rc<RefCell<S>>,
    config: ReasonerConfig,
    observer: Option<Rc<dyn Observer>>,
}

impl<S: Storage + Clone + 'static> Reasoner<S> {
    /// Creates a reasoner with the default configuration.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage: Rc::new(RefCell::new(storage)),
            config: ReasonerConfig::default(),
            observer: None,
        }
    }

    /// Builder method to replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReasonerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method to attach an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Rc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The storage. Holds a borrow; drop it before resolving with
    /// [`ReasonerConfig::persist_conclusions`] set.
    #[must_use]
    pub fn storage(&self) -> Ref<'_, S> {
        self.storage.borrow()
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Resolves `query` and returns a lazy stream of its answers, bound on
    /// the query's named variables. Each answer is returned once.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedNegationShape` for negations with several
    /// branches or nested negations, and `UnresolvedType` for labels the
    /// schema does not define. Errors found while streaming are returned by
    /// the stream, after which it ends.
    pub fn resolve(&self, query: &Conjunction) -> Result<Answers> {
        check_negations(query)?;
        let rules = self.storage.borrow().rules();
        for rule in &rules {
            check_negations(rule.when())
                .map_err(|e| e.with_context(ErrorContext::new().with_rule(rule.label().to_string())))?;
        }
        let query = TypeHinter::new(self.storage.borrow().schema()).hint(query)?;
        let connected = is_connected(&connected_order(extract(&query)?));

        let storage = if self.config.persist_conclusions {
            Rc::clone(&self.storage)
        } else {
            Rc::new(RefCell::new(self.storage.borrow().clone()))
        };
        let cache = match &self.observer {
            Some(observer) => AnswerCache::with_observer(Rc::clone(observer)),
            None => AnswerCache::new(),
        };
        let tree = Rc::new(ResolutionTree {
            storage,
            rules,
            cache: RefCell::new(cache),
            config: self.config.clone(),
            observer: self.observer.clone(),
        });

        debug!(query = %query, rules = tree.rules.len(), "resolving");
        tree.notify(|| ResolutionEvent::Started {
            query: query.to_string(),
        });
        Ok(Answers {
            inner: Box::new(Fixpoint {
                projection: query.named_references(),
                connected,
                tree,
                query,
                current: None,
                yielded: HashSet::new(),
                iteration: 0,
                done: false,
            }),
        })
    }

    /// The explanation of an answer this reasoner produced.
    #[must_use]
    pub fn explain(&self, answer: &Answer) -> Arc<Explanation> {
        Arc::clone(&answer.explanation)
    }
}

/// Rejects negations with more than one branch and negations inside
/// negations.
fn check_negations(conjunction: &Conjunction) -> Result<()> {
    for Negation { disjunction } in conjunction.negations() {
        let [branch] = disjunction.as_slice() else {
            return Err(Error::unsupported_negation(format!(
                "negation with {} branches",
                disjunction.len()
            ))
            .with_context(ErrorContext::new().with_pattern(conjunction.to_string())));
        };
        if !branch.negations().is_empty() {
            return Err(Error::unsupported_negation("nested negation")
                .with_context(ErrorContext::new().with_pattern(conjunction.to_string())));
        }
    }
    Ok(())
}

// =============================================================================
// Answers
// =============================================================================

/// Lazy stream of query answers.
pub struct Answers {
    inner: Box<dyn Iterator<Item = Result<Answer>>>,
}

impl Iterator for Answers {
    type Item = Result<Answer>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

// =============================================================================
// Resolution Tree
// =============================================================================

/// State shared by every stream of one resolution.
struct ResolutionTree<S> {
    storage: Rc<RefCell<S>>,
    rules: Vec<Arc<Rule>>,
    cache: RefCell<AnswerCache>,
    config: ReasonerConfig,
    observer: Option<Rc<dyn Observer>>,
}

impl<S: Storage + 'static> ResolutionTree<S> {
    fn notify(&self, event: impl FnOnce() -> ResolutionEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event());
        }
    }

    /// Answers of an atomic query, from the cache if it has them.
    fn atomic(self: &Rc<Self>, query: &Concludable) -> Result<AnswerIter> {
        let cached = self.cache.borrow().get_answer_stream(query);
        if let Some(stream) = cached {
            self.notify(|| ResolutionEvent::CacheHit {
                fingerprint: Fingerprint::of(query).0,
            });
            return Ok(Box::new(stream));
        }
        self.notify(|| ResolutionEvent::CacheMiss {
            fingerprint: Fingerprint::of(query).0,
        });
        trace!(query = %query, "cache miss");

        let producer = self.produce(query)?;
        Ok(Box::new(self.cache.borrow_mut().record(query, producer)))
    }

    /// Lookup answers followed by the conclusions of every unifying rule.
    fn produce(self: &Rc<Self>, query: &Concludable) -> Result<AnswerIter> {
        let bindable: BTreeSet<Reference> = query
            .variables()
            .keys()
            .filter(|r| r.is_name() || r.is_anonymous())
            .cloned()
            .collect();
        let lookups = self
            .storage
            .borrow()
            .lookup(&query.to_conjunction())?
            .map(|concepts| concepts.map(Answer::lookup));

        let tree = Rc::clone(self);
        let unified_query = query.clone();
        let unified = self.rules.clone().into_iter().flat_map(move |rule| {
            let unifiers = rule.unifiers(&unified_query);
            if !unifiers.is_empty() {
                trace!(rule = %rule.label(), query = %unified_query, unifiers = unifiers.len(), "unified");
                tree.notify(|| ResolutionEvent::Unified {
                    rule: Arc::clone(rule.label()),
                    query: unified_query.to_string(),
                    unifiers: unifiers.len(),
                });
            }
            unifiers.into_iter().map(move |unifier| (Arc::clone(&rule), unifier))
        });

        let tree = Rc::clone(self);
        let derived = unified.flat_map(move |(rule, unifier)| tree.fire(rule, unifier, bindable.clone()));
        Ok(Box::new(lookups.chain(derived)))
    }

    /// Resolves the rule body and concludes a fact from each body answer.
    fn fire(self: &Rc<Self>, rule: Arc<Rule>, unifier: Unifier, bindable: BTreeSet<Reference>) -> AnswerIter {
        let body = match self.conjunction(rule.when()) {
            Ok(body) => body,
            Err(e) => return Box::new(iter::once(Err(e))),
        };
        let tree = Rc::clone(self);
        Box::new(body.filter_map(move |premise| {
            premise
                .and_then(|premise| tree.conclude(&rule, &unifier, premise, &bindable))
                .transpose()
        }))
    }

    fn conclude(
        &self,
        rule: &Arc<Rule>,
        unifier: &Unifier,
        premise: Answer,
        bindable: &BTreeSet<Reference>,
    ) -> Result<Option<Answer>> {
        let context = || ErrorContext::new().with_rule(rule.label().to_string());
        let fact = ConclusionBuilder::build(rule, &premise.concepts, self.storage.borrow().schema())
            .map_err(|e| e.with_context(context()))?;
        let head = ConclusionBuilder::materialize(rule, &fact, &premise.concepts, &mut *self.storage.borrow_mut())
            .map_err(|e| e.with_context(context()))?;
        trace!(rule = %rule.label(), fact = %fact, "concluded");
        self.notify(|| ResolutionEvent::Concluded {
            rule: Arc::clone(rule.label()),
            fact,
        });

        let Some(concepts) = unifier.ununify(&head) else {
            trace!(rule = %rule.label(), "conclusion does not answer the query");
            return Ok(None);
        };
        Ok(Some(Answer::derived(
            concepts.project(bindable),
            Arc::clone(rule.label()),
            unifier.clone(),
            premise,
        )))
    }

    /// Answers of a conjunction, bound on its named variables.
    fn conjunction(self: &Rc<Self>, conjunction: &Conjunction) -> Result<AnswerIter> {
        let concludables = connected_order(extract(conjunction)?);

        let mut answers: AnswerIter = Box::new(iter::once(Ok(Answer::lookup(ConceptMap::new()))));
        for (i, concludable) in concludables.into_iter().enumerate() {
            answers = if i == 0 {
                self.atomic(&concludable)?
            } else {
                let tree = Rc::clone(self);
                Box::new(AnswerCache::join(answers, move |_| tree.atomic(&concludable)))
            };
        }

        let comparisons: Vec<Constraint> = conjunction
            .constraints()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Constraint::Value {
                        operand: Operand::Variable(_),
                        ..
                    }
                )
            })
            .cloned()
            .collect();
        if !comparisons.is_empty() {
            answers = Box::new(answers.filter(move |answer| match answer {
                Ok(answer) => compares(&comparisons, &answer.concepts),
                Err(_) => true,
            }));
        }

        for negation in conjunction.negations() {
            if let [negated] = negation.disjunction.as_slice() {
                let tree = Rc::clone(self);
                let negated = negated.clone();
                let mut excluded: Option<Vec<ConceptMap>> = None;
                answers = Box::new(answers.filter_map(move |answer| {
                    let answer = match answer {
                        Ok(answer) => answer,
                        Err(e) => return Some(Err(e)),
                    };
                    if excluded.is_none() {
                        match tree.collect_negated(&negated) {
                            Ok(found) => excluded = Some(found),
                            Err(e) => return Some(Err(e)),
                        }
                    }
                    let blocked = excluded
                        .iter()
                        .flatten()
                        .any(|found| found.agrees_with(&answer.concepts));
                    (!blocked).then_some(Ok(answer))
                }));
            }
        }

        let named = conjunction.named_references();
        Ok(Box::new(answers.map(move |answer| answer.map(|answer| answer.project(&named)))))
    }

    fn collect_negated(self: &Rc<Self>, negated: &Conjunction) -> Result<Vec<ConceptMap>> {
        let found = self
            .conjunction(negated)?
            .map(|answer| answer.map(|answer| answer.concepts))
            .collect::<Result<Vec<_>>>()?;
        trace!(negation = %negated, answers = found.len(), "collected negated answers");
        Ok(found)
    }
}

/// Returns true if every concludable after the first shares a thing
/// variable with an earlier one.
fn is_connected(ordered: &[Concludable]) -> bool {
    let mut bound: BTreeSet<&Reference> = BTreeSet::new();
    for (i, concludable) in ordered.iter().enumerate() {
        if i > 0 && !things(concludable).any(|r| bound.contains(r)) {
            return false;
        }
        bound.extend(things(concludable));
    }
    true
}

/// Orders concludables so each one after the first shares a thing variable
/// with an earlier one, where possible.
fn connected_order(concludables: Vec<ConjunctionConcludable>) -> Vec<Concludable> {
    let mut remaining: Vec<Concludable> = concludables
        .into_iter()
        .map(ConjunctionConcludable::into_inner)
        .collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut bound: BTreeSet<Reference> = BTreeSet::new();
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .position(|c| things(c).any(|r| bound.contains(r)))
            .unwrap_or(0);
        let concludable = remaining.remove(next);
        bound.extend(things(&concludable).cloned());
        ordered.push(concludable);
    }
    ordered
}

fn things(concludable: &Concludable) -> impl Iterator<Item = &Reference> {
    concludable
        .variables()
        .keys()
        .filter(|r| r.is_name() || r.is_anonymous())
}

/// Checks comparisons between two variables whose values are both bound.
fn compares(comparisons: &[Constraint], concepts: &ConceptMap) -> bool {
    comparisons.iter().all(|comparison| {
        let Constraint::Value {
            owner,
            predicate,
            operand: Operand::Variable(other),
        } = comparison
        else {
            return true;
        };
        match (
            concepts.get(owner).and_then(|c| c.value()),
            concepts.get(other).and_then(|c| c.value()),
        ) {
            (Some(left), Some(right)) => predicate.evaluate(left, right),
            _ => true,
        }
    })
}

// =============================================================================
// Fixpoint
// =============================================================================

/// Re-runs the query until an iteration that cut a cycle records nothing
/// new.
struct Fixpoint<S> {
    tree: Rc<ResolutionTree<S>>,
    query: Conjunction,
    projection: BTreeSet<Reference>,
    connected: bool,
    current: Option<AnswerIter>,
    yielded: HashSet<ConceptMap>,
    iteration: u32,
    done: bool,
}

impl<S: Storage + 'static> Fixpoint<S> {
    fn start_iteration(&mut self) -> Result<AnswerIter> {
        self.iteration += 1;
        if self.iteration > self.tree.config.max_iterations {
            return Err(Error::limit_exceeded(SemanticLimit::MaxIterations {
                limit: self.tree.config.max_iterations,
            })
            .with_context(ErrorContext::new().with_pattern(self.query.to_string())));
        }
        if self.iteration > 1 {
            self.tree.cache.borrow_mut().begin_iteration();
        }
        debug!(iteration = self.iteration, "fixpoint iteration");
        let iteration = self.iteration;
        self.tree
            .notify(|| ResolutionEvent::IterationStarted { iteration });
        self.tree.conjunction(&self.query)
    }

    fn finish(&mut self) {
        self.done = true;
        debug!(
            answers = self.yielded.len(),
            iterations = self.iteration,
            "resolution finished"
        );
        let (answers, iterations) = (self.yielded.len(), self.iteration);
        self.tree
            .notify(|| ResolutionEvent::Finished { answers, iterations });
    }

    /// Checks that `answer`'s explanation is complete and, for connected
    /// queries, that every join in it shares a variable.
    fn validate(&self, answer: &Answer) -> Result<()> {
        answer.check_complete(self.tree.config.max_explanation_depth)?;
        if self.connected && !answer.explanation.check_connected() {
            return Err(Error::internal(format!(
                "explanation of {} joins answers without a shared variable",
                answer.concepts
            ))
            .with_context(ErrorContext::new().with_pattern(self.query.to_string())));
        }
        Ok(())
    }

    fn fail(&mut self, error: Error) -> Option<Result<Answer>> {
        self.done = true;
        debug!(error = %error, "resolution failed");
        Some(Err(error))
    }
}

impl<S: Storage + 'static> Iterator for Fixpoint<S> {
    type Item = Result<Answer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let current = match self.current.take() {
                Some(current) => current,
                None => match self.start_iteration() {
                    Ok(current) => current,
                    Err(e) => return self.fail(e),
                },
            };
            let current = self.current.insert(current);

            match current.next() {
                Some(Ok(answer)) => {
                    let answer = answer.project(&self.projection);
                    if !self.yielded.insert(answer.concepts.clone()) {
                        continue;
                    }
                    if self.tree.config.validate_explanations
                        && let Err(e) = self.validate(&answer)
                    {
                        return self.fail(e);
                    }
                    return Some(Ok(answer));
                }
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.current = None;
                    if !self.tree.cache.borrow().needs_reiteration() {
                        self.finish();
                        return None;
                    }
                }
            }
        }
    }
}
