//! This module specifies the core types for the [Chronicle](https://docs.rs/chronicle/) history
//! recorder: the actions written to a history log and the call/return events reconstructed from
//! it.
//!
//! # Usage
//!
//! Please see [the `chronicle` docs](https://docs.rs/chronicle/).
//!
//! # Features
//!
//! - `serde`: Implement `Serialize` and `Deserialize` where applicable.

#![cfg_attr(all(doc, CHANNEL_NIGHTLY), feature(doc_auto_cfg))]
#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod id;

use core::fmt::{Debug, Display, Formatter};

pub use id::{EventId, ProcId};

/// Whether a history record marks the start or the end of an operation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Action {
    #[cfg_attr(feature = "serde", serde(rename = "call"))]
    Invoke,
    #[cfg_attr(feature = "serde", serde(rename = "return"))]
    Complete,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Action::Invoke => "call",
            Action::Complete => "return",
        })
    }
}

/// The outcome of decoding a completion record.
///
/// `Unresolved` is not a failure: it indicates that the true outcome of the operation is unknown
/// (for instance the client timed out), so the operation must remain open.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Completion<Ret> {
    Resolved(Ret),
    Unresolved,
}

impl<Ret> Completion<Ret> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Completion::Resolved(_))
    }

    pub fn map<T>(self, f: impl FnOnce(Ret) -> T) -> Completion<T> {
        match self {
            Completion::Resolved(ret) => Completion::Resolved(f(ret)),
            Completion::Unresolved => Completion::Unresolved,
        }
    }
}

impl<Ret> From<Option<Ret>> for Completion<Ret> {
    fn from(option: Option<Ret>) -> Self {
        match option {
            Some(ret) => Completion::Resolved(ret),
            None => Completion::Unresolved,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventKind {
    Call,
    Return,
}

/// An abstract invocation or completion, as consumed by a consistency checker.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Event<Op, Ret> {
    Call { id: EventId, op: Op },
    Return { id: EventId, ret: Ret },
}

impl<Op, Ret> Event<Op, Ret> {
    pub fn id(&self) -> EventId {
        match self {
            Event::Call { id, .. } | Event::Return { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Call { .. } => EventKind::Call,
            Event::Return { .. } => EventKind::Return,
        }
    }
}

impl<Op, Ret> Display for Event<Op, Ret>
where
    Op: Debug,
    Ret: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Event::Call { id, op } => write!(f, "Call({id}, {op:?})"),
            Event::Return { id, ret } => write!(f, "Return({id}, {ret:?})"),
        }
    }
}
