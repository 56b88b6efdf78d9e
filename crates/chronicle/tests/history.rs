use {
    chronicle::{
        assert_history, verify_history, Error, Event, EventId, History, Oracle, Recorder,
        Replayer, SerdeJsonParser, Verdict, Verifier,
    },
    consistency_model::{Register, RegisterOp, RegisterRet, SequentialSpec},
    std::{
        collections::BTreeSet,
        path::Path,
        sync::{Arc, Mutex},
        time::Duration,
    },
};

/// Replies to every request with the request suffixed by "-resp".
#[derive(Clone, Default, Eq, Hash, PartialEq)]
struct Echo;

impl SequentialSpec for Echo {
    type Op = String;
    type Ret = String;

    fn invoke(&mut self, op: &String) -> String {
        format!("{op}-resp")
    }
}

type EchoEvents = Vec<Event<String, String>>;

/// Accepts every history and remembers the events it was shown.
struct RecordingOracle(Arc<Mutex<Vec<EchoEvents>>>);

impl RecordingOracle {
    fn new_with_replay() -> (Self, impl Fn() -> Vec<EchoEvents>) {
        let oracle = RecordingOracle(Arc::new(Mutex::new(Vec::new())));
        let checked = Arc::clone(&oracle.0);
        let replay = move || checked.lock().unwrap().clone();
        (oracle, replay)
    }
}

impl Oracle<Echo> for RecordingOracle {
    fn check(&self, _model: &Echo, events: &[Event<String, String>]) -> bool {
        self.0.lock().unwrap().push(events.to_vec());
        true
    }
}

fn echo_parser() -> SerdeJsonParser<String, String> {
    SerdeJsonParser::new(|| "unknown".to_string())
}

fn write_log(path: &Path, records: &[(&str, i64, Option<&str>)]) {
    let recorder = Recorder::open(path).unwrap();
    for (action, proc, data) in records {
        match *action {
            "call" => recorder.record_invocation((*proc).into(), data).unwrap(),
            "return" => recorder.record_completion((*proc).into(), data).unwrap(),
            _ => unreachable!(),
        }
    }
    recorder.close().unwrap();
}

fn replay_echo(path: &Path) -> History<String, String> {
    Replayer::new(&echo_parser()).replay_file(path).unwrap()
}

#[test]
fn replays_clean_pairs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    write_log(
        &path,
        &[
            ("call", 1, Some("foo")),
            ("call", 2, Some("bar")),
            ("return", 1, Some("foo-resp")),
            ("return", 2, Some("bar-resp")),
        ],
    );

    let (oracle, replay) = RecordingOracle::new_with_replay();
    let verdict = Verifier::new(Echo, echo_parser())
        .oracle(oracle)
        .verify(&path)
        .unwrap();
    assert_eq!(verdict, Verdict::Consistent);

    let checked = replay();
    assert_eq!(checked.len(), 1);
    assert_eq!(checked[0].len(), 4);
    assert_history![
        checked[0],
        "Call(#0, \"foo\")",
        "Call(#1, \"bar\")",
        "Return(#0, \"foo-resp\")",
        "Return(#1, \"bar-resp\")",
    ];
    assert_eq!(replay_echo(&path).synthesized(), 0);
    assert!(verify_history(&path, &Echo, &echo_parser()).unwrap());
}

#[test]
fn synthesizes_return_for_dangling_operation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    write_log(&path, &[("call", 1, Some("foo"))]);

    let history = replay_echo(&path);
    assert_history![
        history.events(),
        "Call(#0, \"foo\")",
        "Return(#0, \"unknown\")",
    ];
    assert_eq!(history.synthesized(), 1);
}

#[test]
fn keeps_unresolved_operation_pending_until_end_of_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    write_log(
        &path,
        &[
            ("call", 1, Some("foo")),
            ("call", 2, Some("bar")),
            ("return", 1, None),
            ("return", 2, Some("bar-resp")),
        ],
    );

    let history = replay_echo(&path);
    assert_history![
        history.events(),
        "Call(#0, \"foo\")",
        "Call(#1, \"bar\")",
        "Return(#1, \"bar-resp\")",
        "Return(#0, \"unknown\")",
    ];
}

#[test]
fn resolves_operation_after_earlier_unresolved_return() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    write_log(
        &path,
        &[
            ("call", 1, Some("foo")),
            ("return", 1, None),
            ("return", 1, Some("foo-resp")),
        ],
    );

    let history = replay_echo(&path);
    assert_history![
        history.events(),
        "Call(#0, \"foo\")",
        "Return(#0, \"foo-resp\")",
    ];
}

#[test]
fn balances_calls_and_returns_with_monotonic_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");

    // Five processes taking turns. Some operations time out once before they resolve.
    let ops: Vec<String> = (0..40).map(|i| format!("op{i}")).collect();
    let mut records = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        let proc = (i % 5) as i64;
        records.push(("call", proc, Some(op.as_str())));
        if i % 3 != 0 {
            records.push(("return", proc, None));
        }
        records.push(("return", proc, Some("ok")));
    }
    records.push(("call", 7, Some("last")));
    write_log(&path, &records);

    let history = replay_echo(&path);
    assert_eq!(history.calls(), 41);
    assert_eq!(history.returns(), 41);
    assert_eq!(history.synthesized(), 1);

    let mut called = BTreeSet::new();
    let mut last_call: Option<EventId> = None;
    let mut recorded_ops = Vec::new();
    for event in history.events() {
        match event {
            Event::Call { id, op } => {
                assert!(last_call.map_or(true, |last| last < *id));
                last_call = Some(*id);
                called.insert(*id);
                recorded_ops.push(op.clone());
            }
            Event::Return { id, .. } => assert!(called.remove(id), "{id} returned twice"),
        }
    }
    assert!(called.is_empty());
    assert_eq!(recorded_ops[..40], ops[..]);
}

#[test]
fn reports_missing_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.jsonl");
    assert!(matches!(
        verify_history(&path, &Echo, &echo_parser()),
        Err(Error::Open { .. })
    ));
}

#[test]
fn distinguishes_linearizable_and_unlinearizable_logs() {
    type Op = RegisterOp<String>;
    type Ret = RegisterRet<String>;
    let parser = SerdeJsonParser::<Op, Ret>::new(|| RegisterRet::WriteOk);
    let model = Register("init".to_string());
    let dir = tempfile::tempdir().unwrap();

    let linearizable = dir.path().join("linearizable.jsonl");
    let recorder = Recorder::open(&linearizable).unwrap();
    recorder
        .record_invocation(1.into(), &Op::Write("A".into()))
        .unwrap();
    recorder.record_invocation(2.into(), &Op::Read).unwrap();
    recorder
        .record_completion(2.into(), &Ret::ReadOk("A".into()))
        .unwrap();
    recorder.record_completion(1.into(), &Ret::WriteOk).unwrap();
    recorder.record_invocation(2.into(), &Op::Read).unwrap();
    recorder
        .record_completion(2.into(), &Ret::ReadOk("A".into()))
        .unwrap();
    recorder.close().unwrap();
    assert_eq!(verify_history(&linearizable, &model, &parser).unwrap(), true);

    // The second read observes the initial value after the first observed the write.
    let stale = dir.path().join("stale.jsonl");
    let recorder = Recorder::open(&stale).unwrap();
    recorder
        .record_invocation(1.into(), &Op::Write("A".into()))
        .unwrap();
    recorder.record_invocation(2.into(), &Op::Read).unwrap();
    recorder
        .record_completion(2.into(), &Ret::ReadOk("A".into()))
        .unwrap();
    recorder.record_invocation(3.into(), &Op::Read).unwrap();
    recorder
        .record_completion(3.into(), &Ret::ReadOk("init".into()))
        .unwrap();
    recorder.close().unwrap();
    assert_eq!(verify_history(&stale, &model, &parser).unwrap(), false);
    assert_eq!(
        Verifier::new(model, parser).verify(&stale).unwrap(),
        Verdict::Inconsistent
    );
}

#[test]
fn verifies_long_sequential_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let recorder = Recorder::open(&path).unwrap();
    for i in 0..20_000 {
        recorder
            .record_invocation(1.into(), &RegisterOp::Write(i))
            .unwrap();
        recorder
            .record_completion(1.into(), &RegisterRet::<i32>::WriteOk)
            .unwrap();
    }
    recorder.close().unwrap();

    let parser = SerdeJsonParser::<RegisterOp<i32>, RegisterRet<i32>>::new(|| RegisterRet::WriteOk);
    assert!(verify_history(&path, &Register(-1), &parser).unwrap());
}

#[test]
fn decides_violation_after_many_concurrent_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let recorder = Recorder::open(&path).unwrap();
    for _ in 0..12 {
        for proc in 1..=3 {
            recorder
                .record_invocation(proc.into(), &RegisterOp::Write(1))
                .unwrap();
        }
        for proc in 1..=3 {
            recorder
                .record_completion(proc.into(), &RegisterRet::<i32>::WriteOk)
                .unwrap();
        }
    }
    recorder
        .record_invocation(4.into(), &RegisterOp::<i32>::Read)
        .unwrap();
    recorder
        .record_completion(4.into(), &RegisterRet::ReadOk(7))
        .unwrap();
    recorder.close().unwrap();

    let parser = SerdeJsonParser::<RegisterOp<i32>, RegisterRet<i32>>::new(|| RegisterRet::WriteOk);
    let verdict = Verifier::new(Register(0), parser)
        .time_budget(Duration::from_secs(20))
        .verify(&path)
        .unwrap();
    assert_eq!(verdict, Verdict::Inconsistent);
}
