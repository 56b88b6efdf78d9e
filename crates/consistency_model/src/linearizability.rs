use {
    crate::{ConsistencyTester, SequentialSpec},
    std::{
        collections::{BTreeMap, HashSet},
        fmt::Debug,
        hash::Hash,
        time::Instant,
    },
};

/// How often the search consults the clock when a deadline is set.
const STEPS_PER_DEADLINE_CHECK: u64 = 256;

/// Marks the end of an [`EntryList`].
const NIL: usize = usize::MAX;

/// Tests whether a history of operations is [linearizable] with respect to a [`SequentialSpec`].
///
/// Linearizability requires every operation to appear to take effect atomically at some point
/// between its invocation and its return, so unlike sequential consistency it respects the
/// real-time order of non-overlapping operations. Operations that are still in flight may have
/// taken effect or not, so the tester considers both.
///
/// The search remembers each combination of linearized operations and reference object state
/// it has explored, so the reference object must be `Eq + Hash`.
///
/// ```
/// use consistency_model::*;
///
/// let mut tester = LinearizabilityTester::new(Register('A'));
/// tester.on_invoke(0, RegisterOp::Write('B')).unwrap();
/// tester.on_invret(1, RegisterOp::Read, RegisterRet::ReadOk('B')).unwrap();
/// assert!(tester.is_consistent()); // the write took effect before the read
///
/// tester.on_invret(1, RegisterOp::Read, RegisterRet::ReadOk('A')).unwrap();
/// assert!(!tester.is_consistent()); // but a later read cannot observe the old value
/// ```
///
/// [linearizable]: https://en.wikipedia.org/wiki/Linearizability
pub struct LinearizabilityTester<T, RefObj>
where
    RefObj: SequentialSpec,
{
    init_ref_obj: RefObj,
    operations: Vec<Operation<RefObj::Op, RefObj::Ret>>,
    entries: Vec<Entry>,
    in_flight_by_thread: BTreeMap<T, usize>,
    is_valid_history: bool,
}

/// An invoked operation. `ret` is `None` while the operation is in flight.
struct Operation<Op, Ret> {
    op: Op,
    ret: Option<Ret>,
}

/// An invocation or return, indexing into the tester's operations. Entries are kept in the
/// order they were observed.
#[derive(Clone, Copy, Debug)]
enum Entry {
    Call(usize),
    Return(usize),
}

impl<T, RefObj> LinearizabilityTester<T, RefObj>
where
    T: Copy + Debug + Ord,
    RefObj: SequentialSpec,
{
    /// Constructs a tester whose reference object starts in the specified state.
    pub fn new(init_ref_obj: RefObj) -> Self {
        Self {
            init_ref_obj,
            operations: Vec::new(),
            entries: Vec::new(),
            in_flight_by_thread: BTreeMap::new(),
            is_valid_history: true,
        }
    }

    /// Number of operations that have been invoked, whether or not they returned.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns a sequential history witnessing linearizability, if one exists. Operations still
    /// in flight are included only if the witness needs them, paired with the value the
    /// reference object returned for them.
    pub fn serialized_history(&self) -> Option<Vec<(RefObj::Op, RefObj::Ret)>>
    where
        RefObj: Clone + Eq + Hash,
        RefObj::Op: Clone,
        RefObj::Ret: Clone,
    {
        let mut witness = Vec::new();
        match self.search(None, &mut witness) {
            Outcome::Found => Some(witness),
            Outcome::NotFound | Outcome::Exhausted => None,
        }
    }

    /// Iterative depth-first search over the entry list. At each step the search tries to
    /// linearize a call that precedes the first remaining return. Reaching a return instead
    /// means an earlier choice was wrong, so the most recent one is undone.
    fn search(
        &self,
        deadline: Option<Instant>,
        witness: &mut Vec<(RefObj::Op, RefObj::Ret)>,
    ) -> Outcome
    where
        RefObj: Clone + Eq + Hash,
        RefObj::Op: Clone,
        RefObj::Ret: Clone,
    {
        if !self.is_valid_history {
            return Outcome::NotFound;
        }

        let mut list = EntryList::new(self.entries.len());
        let mut return_node = vec![NIL; self.operations.len()];
        for (k, entry) in self.entries.iter().enumerate() {
            if let Entry::Return(i) = entry {
                return_node[*i] = EntryList::node(k);
            }
        }
        let mut unreturned = return_node.iter().filter(|n| **n != NIL).count();

        let mut linearized = vec![0u64; self.operations.len().div_ceil(64)];
        let mut visited = HashSet::new();
        // Each linearized operation with its call node and the reference object before it.
        let mut chosen: Vec<(usize, usize, RefObj)> = Vec::new();
        let mut ref_obj = self.init_ref_obj.clone();
        let mut node = list.first();
        let mut steps = 0u64;

        loop {
            if unreturned == 0 {
                for (_, i, prior) in &chosen {
                    let operation = &self.operations[*i];
                    let ret = match &operation.ret {
                        Some(ret) => ret.clone(),
                        None => prior.clone().invoke(&operation.op),
                    };
                    witness.push((operation.op.clone(), ret));
                }
                return Outcome::Found;
            }

            steps += 1;
            if let Some(deadline) = deadline {
                if steps % STEPS_PER_DEADLINE_CHECK == 0 && Instant::now() >= deadline {
                    return Outcome::Exhausted;
                }
            }

            match list.entry(&self.entries, node) {
                Some(Entry::Call(i)) => {
                    let operation = &self.operations[i];
                    let mut next_ref_obj = ref_obj.clone();
                    let is_valid = match &operation.ret {
                        Some(ret) => next_ref_obj.is_valid_step(&operation.op, ret),
                        None => {
                            next_ref_obj.invoke(&operation.op);
                            true
                        }
                    };
                    if is_valid {
                        toggle(&mut linearized, i);
                        if visited.insert((linearized.clone(), next_ref_obj.clone())) {
                            list.unlink(node);
                            if return_node[i] != NIL {
                                list.unlink(return_node[i]);
                                unreturned -= 1;
                            }
                            chosen.push((node, i, std::mem::replace(&mut ref_obj, next_ref_obj)));
                            node = list.first();
                            continue;
                        }
                        toggle(&mut linearized, i);
                    }
                    node = list.next(node);
                }
                Some(Entry::Return(_)) | None => {
                    let (call, i, prior) = match chosen.pop() {
                        None => return Outcome::NotFound,
                        Some(choice) => choice,
                    };
                    toggle(&mut linearized, i);
                    if return_node[i] != NIL {
                        list.relink(return_node[i]);
                        unreturned += 1;
                    }
                    list.relink(call);
                    ref_obj = prior;
                    node = list.next(call);
                }
            }
        }
    }
}

impl<T, RefObj> ConsistencyTester<T, RefObj> for LinearizabilityTester<T, RefObj>
where
    T: Copy + Debug + Ord,
    RefObj: Clone + Eq + Hash + SequentialSpec,
    RefObj::Op: Clone,
    RefObj::Ret: Clone,
{
    fn on_invoke(&mut self, thread_id: T, op: RefObj::Op) -> Result<&mut Self, String> {
        if !self.is_valid_history {
            return Err("Earlier history was invalid.".to_string());
        }
        if self.in_flight_by_thread.contains_key(&thread_id) {
            self.is_valid_history = false;
            return Err(format!(
                "Thread already has an operation in flight. thread_id={thread_id:?}"
            ));
        }
        let i = self.operations.len();
        self.operations.push(Operation { op, ret: None });
        self.entries.push(Entry::Call(i));
        self.in_flight_by_thread.insert(thread_id, i);
        Ok(self)
    }

    fn on_return(&mut self, thread_id: T, ret: RefObj::Ret) -> Result<&mut Self, String> {
        if !self.is_valid_history {
            return Err("Earlier history was invalid.".to_string());
        }
        let i = match self.in_flight_by_thread.remove(&thread_id) {
            None => {
                self.is_valid_history = false;
                return Err(format!(
                    "There is no in-flight invocation for this thread ID. thread_id={thread_id:?}"
                ));
            }
            Some(i) => i,
        };
        self.operations[i].ret = Some(ret);
        self.entries.push(Entry::Return(i));
        Ok(self)
    }

    fn is_consistent(&self) -> bool {
        matches!(self.search(None, &mut Vec::new()), Outcome::Found)
    }

    fn is_consistent_until(&self, deadline: Instant) -> Option<bool> {
        match self.search(Some(deadline), &mut Vec::new()) {
            Outcome::Found => Some(true),
            Outcome::NotFound => Some(false),
            Outcome::Exhausted => None,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Found,
    NotFound,
    Exhausted,
}

/// A doubly linked list over the entries. Node 0 is the head; entry `k` lives at node `k + 1`.
/// Unlinked nodes keep their own links, so they can be relinked in reverse order of removal.
struct EntryList {
    prev: Vec<usize>,
    next: Vec<usize>,
}

impl EntryList {
    fn new(len: usize) -> Self {
        EntryList {
            prev: (0..=len).map(|n| n.wrapping_sub(1)).collect(),
            next: (0..=len).map(|n| if n == len { NIL } else { n + 1 }).collect(),
        }
    }

    fn node(k: usize) -> usize {
        k + 1
    }

    fn first(&self) -> usize {
        self.next[0]
    }

    fn next(&self, node: usize) -> usize {
        self.next[node]
    }

    fn entry(&self, entries: &[Entry], node: usize) -> Option<Entry> {
        if node == NIL {
            None
        } else {
            Some(entries[node - 1])
        }
    }

    fn unlink(&mut self, node: usize) {
        let (prev, next) = (self.prev[node], self.next[node]);
        self.next[prev] = next;
        if next != NIL {
            self.prev[next] = prev;
        }
    }

    fn relink(&mut self, node: usize) {
        let (prev, next) = (self.prev[node], self.next[node]);
        self.next[prev] = node;
        if next != NIL {
            self.prev[next] = node;
        }
    }
}

fn toggle(bits: &mut [u64], i: usize) {
    bits[i / 64] ^= 1 << (i % 64);
}
