use {
    chronicle_core::{Action, ProcId},
    std::{fmt, io, path::PathBuf},
    thiserror::Error,
};

/// A boxed error from a pluggable collaborator such as a
/// [`RecordParser`](crate::RecordParser) or [`ClusterClient`](crate::ClusterClient).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors arising while recording, replaying, or verifying a history.
///
/// None of these are retried internally. A history that merely violates the consistency model is
/// not an error; see [`Verdict`](crate::Verdict).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unable to open history log {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history log I/O failed")]
    Io(#[from] io::Error),

    #[error("unable to encode operation for {proc}")]
    Encode {
        proc: ProcId,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed record at line {line}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to decode {action} payload at line {line}")]
    Decode {
        line: usize,
        action: Action,
        #[source]
        source: BoxError,
    },

    #[error("{anomaly} for {proc} at line {line}")]
    Correlation {
        line: usize,
        proc: ProcId,
        anomaly: Anomaly,
    },

    #[error("cluster operation {op} failed")]
    Cluster {
        op: String,
        #[source]
        source: BoxError,
    },

    #[error("recorder is closed")]
    RecorderClosed,
}

/// A record that contradicts the "one outstanding operation per process" discipline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Anomaly {
    /// A call while the process still had an earlier call pending.
    OverlappingCall,
    /// A resolved return while the process had no call pending.
    OrphanedReturn,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Anomaly::OverlappingCall => "call overlaps a pending call",
            Anomaly::OrphanedReturn => "return has no pending call",
        })
    }
}
