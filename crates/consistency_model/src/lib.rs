//! Reference objects and consistency testers for judging how a concurrent system responded to a
//! partially ordered collection of operations.
//!
//! # Reference Objects
//!
//! A [`SequentialSpec`] describes what a system *should* do when operations run one at a time:
//! "behave like a register", "behave like a stack", and so on. [`Register`] and [`Vec`] are
//! provided. A new reference object needs an operation type, a return type, and an
//! [`invoke`](SequentialSpec::invoke) that applies one to the other.
//!
//! # Testers
//!
//! A [`ConsistencyTester`] is fed the invocations and returns observed from a concurrent system,
//! keyed by the caller that issued them, and decides whether some sequential execution of the
//! reference object explains them. Each caller issues one operation at a time.
//! [`LinearizabilityTester`] additionally requires that explanation to respect real time: an
//! operation that returned before another was invoked must be ordered first.
//!
//! Testers work equally well on live systems and on histories recorded earlier and replayed.
//! Searches over long histories can be bounded with
//! [`ConsistencyTester::is_consistent_until`], which gives up with `None` once its deadline
//! passes.
//!
//! # Features
//!
//! - `serde`: Implement `Serialize` and `Deserialize` for the provided operation and return
//!   types, so that they can be written to and read from history logs.
//!
//! # Further Reading
//!
//! - ["Linearizability: A Correctness Condition for Concurrent
//!   Objects"](https://cs.brown.edu/~mph/HerlihyW90/p463-herlihy.pdf) by Herlihy and Wing
//! - ["Consistency in Non-Transactional Distributed Storage
//!   Systems"](http://vukolic.com/consistency-survey.pdf) by Viotti and Vukolić

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod consistency_tester;
mod linearizability;
mod register;
mod vec;

pub use consistency_tester::ConsistencyTester;
pub use linearizability::LinearizabilityTester;
pub use register::{Register, RegisterOp, RegisterRet};
pub use vec::{VecOp, VecRet};

/// A sequential "reference object" whose behavior defines correctness for a more complex,
/// possibly distributed, system.
///
/// Implementations must be deterministic: invoking the same operations from the same state
/// always yields the same returns.
pub trait SequentialSpec: Sized {
    /// Operations accepted by the object, often an enum.
    type Op;

    /// Values produced by operations, often an enum or [`Option`].
    type Ret: PartialEq;

    /// Applies `op`, returning what the object responds with.
    fn invoke(&mut self, op: &Self::Op) -> Self::Ret;

    /// Whether applying `op` could have produced `ret`, applying it if so.
    ///
    /// Override this to accept more than one return for an operation (such as an "unknown"
    /// outcome for a request that timed out) or to avoid the cost of building a return just to
    /// compare it.
    fn is_valid_step(&mut self, op: &Self::Op, ret: &Self::Ret) -> bool {
        &self.invoke(op) == ret
    }

    /// Whether a sequence of completed operations is valid when applied in order.
    fn is_valid_history(&mut self, ops: impl IntoIterator<Item = (Self::Op, Self::Ret)>) -> bool {
        ops.into_iter()
            .all(|(op, ret)| self.is_valid_step(&op, &ret))
    }
}
