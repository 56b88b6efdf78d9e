use {
    chronicle_core::Completion,
    serde::de::DeserializeOwned,
    serde_json::value::RawValue,
    std::marker::PhantomData,
};

/// Interprets the payloads of a history log for a particular system under test.
///
/// The [`Replayer`](crate::Replayer) only correlates calls with returns; what an operation
/// *means* is up to the parser, which typically maps payloads onto the
/// [`SequentialSpec`](consistency_model::SequentialSpec) used for verification.
pub trait RecordParser {
    type Op;
    type Ret;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Decodes the payload of a call record. An error aborts the replay.
    fn decode_invocation(&self, raw: &RawValue) -> Result<Self::Op, Self::Error>;

    /// Decodes the payload of a return record. [`Completion::Unresolved`] indicates that the
    /// outcome of the operation is unknown (e.g. the client timed out), in which case the
    /// operation stays open. An error aborts the replay.
    fn decode_completion(&self, raw: &RawValue) -> Result<Completion<Self::Ret>, Self::Error>;

    /// The return value for an operation that was still open when the log ended. It should
    /// be one the reference object accepts for any outcome of the operation.
    fn synthesize_unresolved_completion(&self) -> Self::Ret;
}

/// A [`RecordParser`] for payloads that are the serde JSON encodings of `Op` and `Ret`. A `null`
/// return payload is unresolved.
///
/// ```
/// use {chronicle::{RecordParser, SerdeJsonParser}, chronicle_core::Completion};
///
/// let parser = SerdeJsonParser::<String, Option<String>>::new(|| None);
/// let raw = serde_json::value::RawValue::from_string("null".into()).unwrap();
/// assert_eq!(parser.decode_completion(&raw).unwrap(), Completion::Unresolved);
/// ```
pub struct SerdeJsonParser<Op, Ret> {
    unresolved: Box<dyn Fn() -> Ret + Send + Sync>,
    _op: PhantomData<fn() -> Op>,
}

impl<Op, Ret> SerdeJsonParser<Op, Ret> {
    pub fn new(unresolved: impl Fn() -> Ret + Send + Sync + 'static) -> Self {
        SerdeJsonParser {
            unresolved: Box::new(unresolved),
            _op: PhantomData,
        }
    }
}

impl<Op, Ret> RecordParser for SerdeJsonParser<Op, Ret>
where
    Op: DeserializeOwned,
    Ret: DeserializeOwned,
{
    type Op = Op;
    type Ret = Ret;
    type Error = serde_json::Error;

    fn decode_invocation(&self, raw: &RawValue) -> Result<Op, serde_json::Error> {
        serde_json::from_str(raw.get())
    }

    fn decode_completion(&self, raw: &RawValue) -> Result<Completion<Ret>, serde_json::Error> {
        if raw.get().trim() == "null" {
            return Ok(Completion::Unresolved);
        }
        serde_json::from_str(raw.get()).map(Completion::Resolved)
    }

    fn synthesize_unresolved_completion(&self) -> Ret {
        (self.unresolved)()
    }
}
