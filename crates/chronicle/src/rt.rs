use {
    crate::{record::encode_line, Error, Recorder},
    chronicle_core::{Action, ProcId},
    serde::Serialize,
    tokio::{
        sync::{mpsc, oneshot},
        task::JoinHandle,
    },
    tracing::{error, info},
};

enum Request {
    Append {
        line: Vec<u8>,
        ack: oneshot::Sender<Result<(), Error>>,
    },
    Close,
}

/// Funnels records from any number of async tasks through a single writer.
///
/// The [`Recorder`] is moved onto a blocking task that drains a channel, so file I/O never
/// stalls the async runtime. Callers encode their own records and await the write through a
/// cloneable [`RecorderHandle`].
pub struct AsyncRecorder {
    tx: mpsc::Sender<Request>,
    writer: JoinHandle<Result<(), Error>>,
}

/// Cloneable sender side of an [`AsyncRecorder`].
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<Request>,
}

impl AsyncRecorder {
    /// Spawns the writer. Must be called from within a tokio runtime.
    pub fn spawn(recorder: Recorder) -> Self {
        let (tx, mut rx) = mpsc::channel::<Request>(64);
        let writer = tokio::task::spawn_blocking(move || {
            loop {
                match rx.blocking_recv() {
                    None => break,
                    Some(Request::Append { line, ack }) => {
                        let result = recorder.append(&line);
                        if ack.send(result).is_err() {
                            info!("Caller stopped waiting for record acknowledgement.");
                        }
                    }
                    // Rejects new records but still drains the ones already queued.
                    Some(Request::Close) => rx.close(),
                }
            }
            info!(path = ?recorder.path(), "Cleanly shut down history writer.");
            recorder.close()
        });
        AsyncRecorder { tx, writer }
    }

    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle {
            tx: self.tx.clone(),
        }
    }

    /// Stops accepting records, waits for queued records to be written, and closes the log.
    /// Records sent through outstanding handles afterwards fail with
    /// [`Error::RecorderClosed`].
    pub async fn close(self) -> Result<(), Error> {
        let AsyncRecorder { tx, writer } = self;
        if tx.send(Request::Close).await.is_err() {
            error!("History writer stopped before close was requested.");
        }
        drop(tx);
        match writer.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                error!("History writer exited due to panic.");
                std::panic::resume_unwind(e.into_panic());
            }
            Err(_) => Err(Error::RecorderClosed),
        }
    }
}

impl RecorderHandle {
    pub async fn record_invocation<T>(&self, proc: ProcId, op: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.record(proc, Action::Invoke, op).await
    }

    pub async fn record_completion<T>(&self, proc: ProcId, op: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.record(proc, Action::Complete, op).await
    }

    async fn record<T>(&self, proc: ProcId, action: Action, op: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let line = encode_line(action, proc, op)?;
        let (ack, acked) = oneshot::channel();
        self.tx
            .send(Request::Append { line, ack })
            .await
            .map_err(|_| Error::RecorderClosed)?;
        acked.await.map_err(|_| Error::RecorderClosed)?
    }
}
