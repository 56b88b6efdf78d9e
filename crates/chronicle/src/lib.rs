//! Chronicle records the operation history of a distributed system under test and verifies it
//! against a consistency model such as [linearizability].
//!
//! A test driver issues concurrent operations against a cluster (possibly while injecting faults)
//! and records each invocation and completion with a [`Recorder`]. After the run, a [`Replayer`]
//! reconstructs the ordered call/return events, and a [`Verifier`] hands them to an [`Oracle`].
//!
//! # Example
//!
//! ```rust
//! use {
//!     chronicle::{verify_history, Recorder, SerdeJsonParser},
//!     consistency_model::{Register, RegisterOp, RegisterRet},
//! };
//!
//! # fn main() -> Result<(), chronicle::Error> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("history.jsonl");
//! let recorder = Recorder::open(&path)?;
//! recorder.record_invocation(1.into(), &RegisterOp::Write("A"))?;
//! recorder.record_invocation(2.into(), &RegisterOp::<&str>::Read)?;
//! recorder.record_completion(1.into(), &RegisterRet::<&str>::WriteOk)?;
//! recorder.record_completion(2.into(), &RegisterRet::ReadOk("A"))?;
//! recorder.close()?;
//!
//! // `null` marks a return whose outcome is unknown, such as a timeout. Operations that never
//! // resolve are closed with a write acknowledgement (which a read would reject).
//! let parser = SerdeJsonParser::<RegisterOp<String>, RegisterRet<String>>::new(|| {
//!     RegisterRet::WriteOk
//! });
//! assert!(verify_history(&path, &Register(String::new()), &parser)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Log Format
//!
//! One JSON object per line, appended in the order observed by the recorder:
//!
//! ```text
//! {"action":"call","proc":1,"data":{"Write":"A"}}
//! {"action":"call","proc":2,"data":"Read"}
//! {"action":"return","proc":1,"data":"WriteOk"}
//! {"action":"return","proc":2,"data":{"ReadOk":"A"}}
//! ```
//!
//! # Features
//!
//! - `rt`: Include [`AsyncRecorder`], which funnels records from async tasks through a single
//!   writer.
//!
//! [linearizability]: https://en.wikipedia.org/wiki/Linearizability

#![cfg_attr(all(doc, CHANNEL_NIGHTLY), feature(doc_auto_cfg))]
#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod cluster;
mod error;
mod parser;
mod record;
mod recorder;
mod replayer;
#[cfg(feature = "rt")]
mod rt;
mod verifier;

/// Asserts that a sequence of events renders as the expected strings, printing any unexpected
/// trailing events in a form that can be pasted back into the assertion.
#[macro_export]
macro_rules! assert_history {
    // Case 1: No expected events specified.
    [$events:expr $(,)?] => {
        if !$events.is_empty() {
            println!("Missing some events:");
            for e in $events.iter() {
                println!("\"{}\",", format!("{}", e).escape_debug().to_string());
            }
            panic!("^");
        }
    };
    // Case 2: Expected event(s) specified. Requires recursion.
    [$events:expr, $str:tt, $($rest:tt)*] => {
        $crate::assert_history_![0 => $events, $str, $($rest)*];
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! assert_history_ {
    // Base case: only one string to assert.
    ($i:expr => $events:expr, $str:tt $(,)?) => (
        assert!($i < $events.len(), "expected more than {} events", $i);
        assert_eq!($events[$i].to_string().as_str(), $str, "at [{}]", $i);
        if $i + 1 < $events.len() {
            println!("Missing some events:");
            for e in $events.iter().skip($i + 1) {
                println!("\"{}\",", format!("{}", e).escape_debug().to_string());
            }
            panic!("^");
        }
    );
    // Inductive case: assert and recurse.
    ($i:expr => $events:expr, $str:tt, $($rest:tt)*) => (
        assert!($i < $events.len(), "expected more than {} events", $i);
        assert_eq!($events[$i].to_string().as_str(), $str, "at [{}]", $i);
        $crate::assert_history_!($i + 1 => $events, $($rest)*);
    );
}

pub use chronicle_core::{Action, Completion, Event, EventId, EventKind, ProcId};

pub use cluster::{ClusterClient, ClusterOp, ClusterOutcome, RecordedCluster};

pub use error::{Anomaly, BoxError, Error};

pub use parser::{RecordParser, SerdeJsonParser};

pub use record::OperationRecord;

pub use recorder::Recorder;

pub use replayer::{CorrelationPolicy, History, Replayer};

#[cfg(feature = "rt")]
pub use rt::{AsyncRecorder, RecorderHandle};

pub use verifier::{verify_history, Linearizability, Oracle, Verdict, Verifier};
