use {
    crate::{record::encode_line, Error},
    chronicle_core::{Action, ProcId},
    parking_lot::Mutex,
    serde::Serialize,
    std::{
        fs::{File, OpenOptions},
        io::Write,
        path::{Path, PathBuf},
    },
    tracing::{debug, trace},
};

/// Appends the invocation and completion of every operation to a newline-delimited JSON log,
/// which a [`Replayer`](crate::Replayer) later turns back into events.
///
/// A `Recorder` can be shared across threads: each record is encoded up front and appended with a
/// single write while holding an internal lock, so concurrent processes never interleave partial
/// lines. The file handle is released when the recorder is [closed](Recorder::close) or dropped.
///
/// No flush/sync is issued per record, so a hard crash may lose the tail of the log.
///
/// ```no_run
/// # fn main() -> Result<(), chronicle::Error> {
/// let recorder = chronicle::Recorder::open("/tmp/history.jsonl")?;
/// recorder.record_invocation(1.into(), &("put", "k", "v"))?;
/// recorder.record_completion(1.into(), &"ok")?;
/// recorder.close()
/// # }
/// ```
pub struct Recorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl Recorder {
    /// Opens `path` for appending, creating it (mode `0644` on Unix) if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        debug!(?path, "Opened history log for recording.");
        Ok(Recorder {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that `proc` invoked `op`.
    pub fn record_invocation<T>(&self, proc: ProcId, op: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.record(proc, Action::Invoke, op)
    }

    /// Records that the operation outstanding for `proc` completed with `op`.
    pub fn record_completion<T>(&self, proc: ProcId, op: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.record(proc, Action::Complete, op)
    }

    fn record<T>(&self, proc: ProcId, action: Action, op: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let line = encode_line(action, proc, op)?;
        self.append(&line)?;
        trace!(%proc, %action, "Recorded operation.");
        Ok(())
    }

    /// Appends an already encoded, newline-terminated record.
    pub(crate) fn append(&self, line: &[u8]) -> Result<(), Error> {
        self.file.lock().write_all(line)?;
        Ok(())
    }

    /// Flushes and releases the log file.
    pub fn close(self) -> Result<(), Error> {
        let mut file = self.file.into_inner();
        file.flush()?;
        debug!(path = ?self.path, "Closed history log.");
        Ok(())
    }
}
