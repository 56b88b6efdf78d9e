use {
    crate::{Error, Recorder},
    chronicle_core::ProcId,
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display, Formatter},
    tracing::warn,
};

/// The control surface of a cluster under test: provisioning databases and injecting faults
/// ("nemeses"). Implementations typically issue synchronous RPCs to an agent on each node and own
/// their timeout/retry policy.
pub trait ClusterClient {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set_up_database(&mut self, name: &str) -> Result<(), Self::Error>;
    fn tear_down_database(&mut self, name: &str) -> Result<(), Self::Error>;
    fn set_up_nemesis(&mut self, name: &str) -> Result<(), Self::Error>;
    fn invoke_nemesis(&mut self, name: &str, args: &[String]) -> Result<(), Self::Error>;
    fn tear_down_nemesis(&mut self, name: &str) -> Result<(), Self::Error>;
}

/// Payload recorded when a cluster operation is invoked.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClusterOp {
    SetUpDatabase { name: String },
    TearDownDatabase { name: String },
    SetUpNemesis { name: String },
    InvokeNemesis { name: String, args: Vec<String> },
    TearDownNemesis { name: String },
}

impl Display for ClusterOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClusterOp::SetUpDatabase { name } => write!(f, "set_up_database({name})"),
            ClusterOp::TearDownDatabase { name } => write!(f, "tear_down_database({name})"),
            ClusterOp::SetUpNemesis { name } => write!(f, "set_up_nemesis({name})"),
            ClusterOp::InvokeNemesis { name, args } => {
                write!(f, "invoke_nemesis({name}, {args:?})")
            }
            ClusterOp::TearDownNemesis { name } => write!(f, "tear_down_nemesis({name})"),
        }
    }
}

/// Payload recorded when a cluster operation completes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ClusterOutcome {
    Ok,
    Err(String),
}

/// Wraps a [`ClusterClient`] so that each call is recorded as an invocation/completion pair
/// under a single process ID.
///
/// Cluster operations say nothing about the data model, so they are best recorded to their own
/// log rather than the one verified for consistency.
pub struct RecordedCluster<'r, C> {
    client: C,
    recorder: &'r Recorder,
    proc: ProcId,
}

impl<'r, C> RecordedCluster<'r, C>
where
    C: ClusterClient,
{
    pub fn new(client: C, recorder: &'r Recorder, proc: ProcId) -> Self {
        RecordedCluster {
            client,
            recorder,
            proc,
        }
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    pub fn set_up_database(&mut self, name: &str) -> Result<(), Error> {
        let op = ClusterOp::SetUpDatabase {
            name: name.to_string(),
        };
        self.call(op, |client| client.set_up_database(name))
    }

    pub fn tear_down_database(&mut self, name: &str) -> Result<(), Error> {
        let op = ClusterOp::TearDownDatabase {
            name: name.to_string(),
        };
        self.call(op, |client| client.tear_down_database(name))
    }

    pub fn set_up_nemesis(&mut self, name: &str) -> Result<(), Error> {
        let op = ClusterOp::SetUpNemesis {
            name: name.to_string(),
        };
        self.call(op, |client| client.set_up_nemesis(name))
    }

    pub fn invoke_nemesis(&mut self, name: &str, args: &[String]) -> Result<(), Error> {
        let op = ClusterOp::InvokeNemesis {
            name: name.to_string(),
            args: args.to_vec(),
        };
        self.call(op, |client| client.invoke_nemesis(name, args))
    }

    pub fn tear_down_nemesis(&mut self, name: &str) -> Result<(), Error> {
        let op = ClusterOp::TearDownNemesis {
            name: name.to_string(),
        };
        self.call(op, |client| client.tear_down_nemesis(name))
    }

    fn call(
        &mut self,
        op: ClusterOp,
        f: impl FnOnce(&mut C) -> Result<(), C::Error>,
    ) -> Result<(), Error> {
        self.recorder.record_invocation(self.proc, &op)?;
        let result = f(&mut self.client);
        let outcome = match &result {
            Ok(()) => ClusterOutcome::Ok,
            Err(e) => ClusterOutcome::Err(e.to_string()),
        };
        let recorded = self.recorder.record_completion(self.proc, &outcome);
        settle(&op, result, recorded)
    }
}

/// Combines the client's result with the result of recording its outcome. A client failure
/// takes precedence, and a failure to record it is logged instead.
fn settle<E>(
    op: &ClusterOp,
    result: Result<(), E>,
    recorded: Result<(), Error>,
) -> Result<(), Error>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match result {
        Ok(()) => recorded,
        Err(source) => {
            if let Err(e) = recorded {
                warn!(%op, error = %e, "Unable to record failed cluster operation.");
            }
            Err(Error::Cluster {
                op: op.to_string(),
                source: Box::new(source),
            })
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{Replayer, SerdeJsonParser},
    };

    #[derive(Debug, thiserror::Error)]
    #[error("no such nemesis: {0}")]
    struct UnknownNemesis(String);

    /// Accepts the "noop" database and nemesis only.
    #[derive(Default)]
    struct NoopCluster {
        invocations: Vec<String>,
    }

    impl NoopCluster {
        fn accept(&mut self, name: &str, call: &str) -> Result<(), UnknownNemesis> {
            self.invocations.push(format!("{call}({name})"));
            if name == "noop" {
                Ok(())
            } else {
                Err(UnknownNemesis(name.to_string()))
            }
        }
    }

    impl ClusterClient for NoopCluster {
        type Error = UnknownNemesis;

        fn set_up_database(&mut self, name: &str) -> Result<(), UnknownNemesis> {
            self.accept(name, "set_up_database")
        }
        fn tear_down_database(&mut self, name: &str) -> Result<(), UnknownNemesis> {
            self.accept(name, "tear_down_database")
        }
        fn set_up_nemesis(&mut self, name: &str) -> Result<(), UnknownNemesis> {
            self.accept(name, "set_up_nemesis")
        }
        fn invoke_nemesis(&mut self, name: &str, _args: &[String]) -> Result<(), UnknownNemesis> {
            self.accept(name, "invoke_nemesis")
        }
        fn tear_down_nemesis(&mut self, name: &str) -> Result<(), UnknownNemesis> {
            self.accept(name, "tear_down_nemesis")
        }
    }

    #[test]
    fn records_each_cluster_operation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.jsonl");
        let recorder = Recorder::open(&path).unwrap();

        let mut cluster = RecordedCluster::new(NoopCluster::default(), &recorder, 0.into());
        cluster.set_up_database("noop").unwrap();
        cluster.tear_down_database("noop").unwrap();
        cluster.set_up_nemesis("noop").unwrap();
        cluster.invoke_nemesis("noop", &[]).unwrap();
        let args: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        cluster.invoke_nemesis("noop", &args).unwrap();
        cluster.tear_down_nemesis("noop").unwrap();
        assert_eq!(cluster.into_inner().invocations.len(), 6);
        recorder.close().unwrap();

        let parser = SerdeJsonParser::<ClusterOp, ClusterOutcome>::new(|| {
            ClusterOutcome::Err("unknown".to_string())
        });
        let history = Replayer::new(&parser).replay_file(&path).unwrap();
        assert_eq!(history.calls(), 6);
        assert_eq!(history.returns(), 6);
        assert_eq!(history.synthesized(), 0);
        assert_eq!(
            history.events()[8].to_string(),
            "Call(#4, InvokeNemesis { name: \"noop\", args: [\"a\", \"b\", \"c\"] })"
        );
    }

    #[test]
    fn keeps_client_failure_when_recording_also_fails() {
        let op = ClusterOp::SetUpNemesis {
            name: "kill".to_string(),
        };
        let unwritable = || Err(Error::Io(std::io::Error::other("disk full")));

        match settle(&op, Err(UnknownNemesis("kill".to_string())), unwritable()) {
            Err(Error::Cluster { op, source }) => {
                assert_eq!(op, "set_up_nemesis(kill)");
                assert_eq!(source.to_string(), "no such nemesis: kill");
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        assert!(matches!(
            settle::<UnknownNemesis>(&op, Ok(()), unwritable()),
            Err(Error::Io(_))
        ));
        assert!(settle::<UnknownNemesis>(&op, Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn records_failure_before_surfacing_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.jsonl");
        let recorder = Recorder::open(&path).unwrap();

        let mut cluster = RecordedCluster::new(NoopCluster::default(), &recorder, 3.into());
        match cluster.invoke_nemesis("partition", &[]) {
            Err(Error::Cluster { op, source }) => {
                assert_eq!(op, "invoke_nemesis(partition, [])");
                assert_eq!(source.to_string(), "no such nemesis: partition");
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        drop(cluster);
        drop(recorder);

        let log = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            log,
            "{\"action\":\"call\",\"proc\":3,\"data\":{\"op\":\"invoke_nemesis\",\"name\":\"partition\",\"args\":[]}}\n\
             {\"action\":\"return\",\"proc\":3,\"data\":{\"Err\":\"no such nemesis: partition\"}}\n"
        );
    }
}
