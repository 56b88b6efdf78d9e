use {
    crate::Error,
    chronicle_core::{Action, ProcId},
    serde::{Deserialize, Serialize},
    serde_json::value::RawValue,
};

/// One line of a history log, as read back from disk.
///
/// ```text
/// {"action":"call","proc":1,"data":{"Write":"foo"}}
/// {"action":"return","proc":1,"data":"WriteOk"}
/// ```
///
/// `data` is kept as raw JSON so that only the [`RecordParser`](crate::RecordParser) interprets
/// it.
#[derive(Debug, Deserialize, Serialize)]
pub struct OperationRecord {
    pub action: Action,
    pub proc: ProcId,
    pub data: Box<RawValue>,
}

/// Borrowed counterpart of [`OperationRecord`] that serializes the payload inline.
#[derive(Serialize)]
struct RecordRef<'a, T: ?Sized> {
    action: Action,
    proc: ProcId,
    data: &'a T,
}

/// Encodes a newline-terminated record so it can be appended with a single write.
pub(crate) fn encode_line<T>(action: Action, proc: ProcId, op: &T) -> Result<Vec<u8>, Error>
where
    T: Serialize + ?Sized,
{
    let record = RecordRef {
        action,
        proc,
        data: op,
    };
    let mut line =
        serde_json::to_vec(&record).map_err(|source| Error::Encode { proc, source })?;
    line.push(b'\n');
    Ok(line)
}

pub(crate) fn decode_line(line_number: usize, line: &str) -> Result<OperationRecord, Error> {
    serde_json::from_str(line).map_err(|source| Error::Malformed {
        line: line_number,
        source,
    })
}
