use {
    crate::{CorrelationPolicy, Error, History, RecordParser, Replayer},
    chronicle_core::{Event, EventId},
    colorful::Colorful,
    consistency_model::{ConsistencyTester, LinearizabilityTester, SequentialSpec},
    std::{
        fmt::Debug,
        hash::Hash,
        path::Path,
        time::{Duration, Instant},
    },
    tracing::{info, warn},
};

/// Decides whether a sequence of call/return events is consistent with a reference object.
///
/// The decision procedure is pluggable so that the recorder and replayer never depend on a
/// particular consistency model or search strategy.
pub trait Oracle<M>
where
    M: SequentialSpec,
{
    fn check(&self, model: &M, events: &[Event<M::Op, M::Ret>]) -> bool;

    /// Like [`Oracle::check`], but may give up once `deadline` passes, returning `None`.
    fn check_until(
        &self,
        model: &M,
        events: &[Event<M::Op, M::Ret>],
        deadline: Instant,
    ) -> Option<bool> {
        let _ = deadline;
        Some(self.check(model, events))
    }
}

/// An [`Oracle`] for linearizability, backed by [`LinearizabilityTester`]. Each operation is
/// tracked as its own thread (keyed by [`EventId`]), so real-time order is the only constraint
/// between operations. The model must be `Eq + Hash` so that explored states can be skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct Linearizability;

impl Linearizability {
    fn tester<M>(
        model: &M,
        events: &[Event<M::Op, M::Ret>],
    ) -> Option<LinearizabilityTester<EventId, M>>
    where
        M: Clone + Eq + Hash + SequentialSpec,
        M::Op: Clone,
        M::Ret: Clone,
    {
        let mut tester = LinearizabilityTester::new(model.clone());
        for event in events {
            let result = match event {
                Event::Call { id, op } => tester.on_invoke(*id, op.clone()).map(|_| ()),
                Event::Return { id, ret } => tester.on_return(*id, ret.clone()).map(|_| ()),
            };
            if let Err(msg) = result {
                warn!(%msg, "Event sequence is not well formed.");
                return None;
            }
        }
        Some(tester)
    }
}

impl<M> Oracle<M> for Linearizability
where
    M: Clone + Eq + Hash + SequentialSpec,
    M::Op: Clone,
    M::Ret: Clone,
{
    fn check(&self, model: &M, events: &[Event<M::Op, M::Ret>]) -> bool {
        Self::tester(model, events).map_or(false, |tester| tester.is_consistent())
    }

    fn check_until(
        &self,
        model: &M,
        events: &[Event<M::Op, M::Ret>],
        deadline: Instant,
    ) -> Option<bool> {
        match Self::tester(model, events) {
            None => Some(false),
            Some(tester) => tester.is_consistent_until(deadline),
        }
    }
}

/// The outcome of verifying a history.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    Consistent,
    /// The history violates the consistency model, which typically fails the test run.
    Inconsistent,
    /// The time budget ran out before the oracle reached a decision.
    Inconclusive,
}

impl Verdict {
    pub fn is_consistent(self) -> bool {
        self == Verdict::Consistent
    }
}

/// Replays a history log and hands the events to an [`Oracle`].
///
/// ```no_run
/// use {
///     chronicle::{SerdeJsonParser, Verdict, Verifier},
///     consistency_model::{Register, RegisterOp, RegisterRet},
///     std::time::Duration,
/// };
///
/// let parser = SerdeJsonParser::<RegisterOp<String>, RegisterRet<String>>::new(|| {
///     RegisterRet::WriteOk
/// });
/// let verdict = Verifier::new(Register(String::new()), parser)
///     .time_budget(Duration::from_secs(30))
///     .verify("/tmp/history.jsonl")
///     .unwrap();
/// assert_ne!(verdict, Verdict::Inconsistent);
/// ```
///
/// Set the `CHRONICLE_DEBUG` environment variable to print histories that are found
/// inconsistent.
pub struct Verifier<M, P, O = Linearizability> {
    model: M,
    parser: P,
    oracle: O,
    policy: CorrelationPolicy,
    time_budget: Option<Duration>,
}

impl<M, P> Verifier<M, P, Linearizability> {
    pub fn new(model: M, parser: P) -> Self {
        Verifier {
            model,
            parser,
            oracle: Linearizability,
            policy: CorrelationPolicy::default(),
            time_budget: None,
        }
    }
}

impl<M, P, O> Verifier<M, P, O>
where
    M: SequentialSpec,
    M::Op: Debug,
    M::Ret: Debug,
    P: RecordParser<Op = M::Op, Ret = M::Ret>,
    O: Oracle<M>,
{
    pub fn oracle<O2: Oracle<M>>(self, oracle: O2) -> Verifier<M, P, O2> {
        Verifier {
            model: self.model,
            parser: self.parser,
            oracle,
            policy: self.policy,
            time_budget: self.time_budget,
        }
    }

    pub fn correlation(mut self, policy: CorrelationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bounds how long the oracle may search. Running out yields [`Verdict::Inconclusive`].
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn verify(&self, path: impl AsRef<Path>) -> Result<Verdict, Error> {
        let history = Replayer::new(&self.parser)
            .correlation(self.policy)
            .replay_file(path)?;
        Ok(self.check(&history))
    }

    pub fn check(&self, history: &History<M::Op, M::Ret>) -> Verdict {
        let started = Instant::now();
        let result = match self.time_budget {
            None => Some(self.oracle.check(&self.model, history.events())),
            Some(budget) => {
                self.oracle
                    .check_until(&self.model, history.events(), started + budget)
            }
        };
        let verdict = match result {
            Some(true) => Verdict::Consistent,
            Some(false) => Verdict::Inconsistent,
            None => Verdict::Inconclusive,
        };
        info!(?verdict, elapsed = ?started.elapsed(), events = history.len(), "Checked history.");
        if verdict == Verdict::Inconsistent && std::env::var("CHRONICLE_DEBUG").is_ok() {
            print_history(history);
        }
        verdict
    }
}

fn print_history<Op: Debug, Ret: Debug>(history: &History<Op, Ret>) {
    println!("History violating the consistency model:");
    let first_synthesized = history.len() - history.synthesized();
    for (k, event) in history.events().iter().enumerate() {
        if k >= first_synthesized {
            let msg = format!("{k: >3}. {event} (synthesized)");
            println!("{}", msg.color(colorful::Color::Yellow));
        } else {
            println!("{k: >3}. {event}");
        }
    }
}

/// Checks whether the history log at `path` is linearizable with respect to `model`.
///
/// `Ok(false)` is a normal outcome indicating the history violates the model. Errors come from
/// reading or replaying the log, with [`CorrelationPolicy::Strict`] in effect.
pub fn verify_history<M, P>(path: impl AsRef<Path>, model: &M, parser: &P) -> Result<bool, Error>
where
    M: Clone + Eq + Hash + SequentialSpec,
    M::Op: Clone,
    M::Ret: Clone,
    P: RecordParser<Op = M::Op, Ret = M::Ret>,
{
    let history = Replayer::new(parser).replay_file(path)?;
    let linearizable = Linearizability.check(model, history.events());
    info!(linearizable, events = history.len(), "Verified history.");
    Ok(linearizable)
}
