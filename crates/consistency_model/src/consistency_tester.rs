use {crate::SequentialSpec, std::time::Instant};

/// Implemented by testers that decide whether a partially ordered collection of operations is
/// consistent with a [`SequentialSpec`] under some [consistency model].
///
/// Operations are attributed to "threads": each thread has at most one operation in flight, so
/// [`ConsistencyTester::on_invoke`] and [`ConsistencyTester::on_return`] must alternate per
/// thread. Violating that renders the history invalid.
///
/// [consistency model]: https://en.wikipedia.org/wiki/Consistency_model
pub trait ConsistencyTester<T, RefObj>: Sized
where
    RefObj: SequentialSpec,
{
    /// Indicates that a thread invoked an operation.
    fn on_invoke(&mut self, thread_id: T, op: RefObj::Op) -> Result<&mut Self, String>;

    /// Indicates that a thread's earlier operation returned.
    fn on_return(&mut self, thread_id: T, ret: RefObj::Ret) -> Result<&mut Self, String>;

    /// A convenience for an operation whose invocation and return were not interleaved with any
    /// other operation.
    fn on_invret(
        &mut self,
        thread_id: T,
        op: RefObj::Op,
        ret: RefObj::Ret,
    ) -> Result<&mut Self, String>
    where
        T: Copy,
    {
        self.on_invoke(thread_id, op)?.on_return(thread_id, ret)
    }

    /// Indicates whether the recorded history is consistent.
    fn is_consistent(&self) -> bool;

    /// Like [`ConsistencyTester::is_consistent`] but gives up once `deadline` passes, returning
    /// `None` since the answer is unknown. Testers that cannot be interrupted simply ignore the
    /// deadline.
    fn is_consistent_until(&self, deadline: Instant) -> Option<bool> {
        let _ = deadline;
        Some(self.is_consistent())
    }
}
