use {
    crate::{record::decode_line, Anomaly, Error, RecordParser},
    chronicle_core::{Action, Completion, Event, EventId, EventKind, ProcId},
    std::{
        collections::BTreeMap,
        fmt::{self, Debug, Display, Formatter},
        fs::File,
        io::{BufRead, BufReader},
        path::Path,
    },
    tracing::{debug, info, warn},
};

/// How the [`Replayer`] treats records that break the "one outstanding operation per process"
/// discipline.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CorrelationPolicy {
    /// Abort the replay with [`Error::Correlation`].
    #[default]
    Strict,
    /// Log a warning and carry on: an overlapping call replaces the pending one (whose return
    /// can then no longer be matched), and an orphaned return is dropped.
    Lenient,
}

/// The ordered call/return events reconstructed from a history log.
#[derive(Clone, Debug, PartialEq)]
pub struct History<Op, Ret> {
    events: Vec<Event<Op, Ret>>,
    synthesized: usize,
}

impl<Op, Ret> History<Op, Ret> {
    pub fn events(&self) -> &[Event<Op, Ret>] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event<Op, Ret>> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn calls(&self) -> usize {
        self.count(EventKind::Call)
    }

    pub fn returns(&self) -> usize {
        self.count(EventKind::Return)
    }

    /// Number of returns synthesized for operations still open when the log ended. These are
    /// always the trailing events.
    pub fn synthesized(&self) -> usize {
        self.synthesized
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}

impl<Op, Ret> Display for History<Op, Ret>
where
    Op: Debug,
    Ret: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, event) in self.events.iter().enumerate() {
            writeln!(f, "{i: >3}. {event}")?;
        }
        Ok(())
    }
}

/// Reconstructs a [`History`] from a log written by a [`Recorder`](crate::Recorder).
///
/// The order of lines in the log is the only ordering used. Each call is assigned the next
/// [`EventId`], and the matching return (the next resolved return for the same process) echoes
/// it. Operations without a resolved return by the end of the log receive a return synthesized by
/// the [`RecordParser`], in ascending process order.
///
/// Any I/O, syntax, or parser failure aborts the replay, as later events cannot be trusted.
pub struct Replayer<'p, P> {
    parser: &'p P,
    policy: CorrelationPolicy,
}

impl<'p, P> Replayer<'p, P>
where
    P: RecordParser,
{
    pub fn new(parser: &'p P) -> Self {
        Replayer {
            parser,
            policy: CorrelationPolicy::default(),
        }
    }

    pub fn correlation(mut self, policy: CorrelationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn replay_file(&self, path: impl AsRef<Path>) -> Result<History<P::Op, P::Ret>, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!(?path, "Replaying history log.");
        self.replay(BufReader::new(file))
    }

    pub fn replay(&self, reader: impl BufRead) -> Result<History<P::Op, P::Ret>, Error> {
        let mut pending: BTreeMap<ProcId, EventId> = BTreeMap::new();
        let mut next_id = EventId::default();
        let mut events = Vec::with_capacity(1024);

        for (i, line) in reader.lines().enumerate() {
            let line_number = i + 1;
            let record = decode_line(line_number, &line?)?;
            let proc = record.proc;
            match record.action {
                Action::Invoke => {
                    let op = self
                        .parser
                        .decode_invocation(&record.data)
                        .map_err(|e| decode_error(line_number, Action::Invoke, e))?;
                    let id = next_id.next();
                    if let Some(overwritten) = pending.insert(proc, id) {
                        self.on_anomaly(line_number, proc, Anomaly::OverlappingCall)?;
                        warn!(%proc, %overwritten, %id, "Replacing pending call.");
                    }
                    debug!(%proc, %id, "Call");
                    events.push(Event::Call { id, op });
                }
                Action::Complete => {
                    let completion = self
                        .parser
                        .decode_completion(&record.data)
                        .map_err(|e| decode_error(line_number, Action::Complete, e))?;
                    let ret = match completion {
                        Completion::Unresolved => {
                            debug!(%proc, "Unresolved return; operation remains open.");
                            continue;
                        }
                        Completion::Resolved(ret) => ret,
                    };
                    let id = match pending.remove(&proc) {
                        None => {
                            self.on_anomaly(line_number, proc, Anomaly::OrphanedReturn)?;
                            warn!(
                                %proc,
                                line = line_number,
                                "Dropping return with no pending call."
                            );
                            continue;
                        }
                        Some(id) => id,
                    };
                    debug!(%proc, %id, "Return");
                    events.push(Event::Return { id, ret });
                }
            }
        }

        let synthesized = pending.len();
        for (proc, id) in pending {
            debug!(%proc, %id, "Synthesized return for open operation.");
            events.push(Event::Return {
                id,
                ret: self.parser.synthesize_unresolved_completion(),
            });
        }
        info!(
            events = events.len(),
            operations = usize::from(next_id),
            synthesized,
            "Replayed history log."
        );
        Ok(History {
            events,
            synthesized,
        })
    }

    fn on_anomaly(&self, line: usize, proc: ProcId, anomaly: Anomaly) -> Result<(), Error> {
        match self.policy {
            CorrelationPolicy::Strict => Err(Error::Correlation {
                line,
                proc,
                anomaly,
            }),
            CorrelationPolicy::Lenient => Ok(()),
        }
    }
}

fn decode_error(
    line: usize,
    action: Action,
    source: impl std::error::Error + Send + Sync + 'static,
) -> Error {
    Error::Decode {
        line,
        action,
        source: Box::new(source),
    }
}
