use crate::SequentialSpec;

/// An operation that can be invoked upon a [`Vec`], resulting in a [`VecRet`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VecOp<T> {
    Push(T),
    Pop,
    Len,
}

/// A return value for a [`VecOp`] invoked upon a [`Vec`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VecRet<T> {
    PushOk,
    PopOk(Option<T>),
    LenOk(usize),
}

/// Stack-like semantics.
impl<T: Clone + PartialEq> SequentialSpec for Vec<T> {
    type Op = VecOp<T>;
    type Ret = VecRet<T>;

    fn invoke(&mut self, op: &Self::Op) -> Self::Ret {
        match op {
            VecOp::Push(v) => {
                self.push(v.clone());
                VecRet::PushOk
            }
            VecOp::Pop => VecRet::PopOk(self.pop()),
            VecOp::Len => VecRet::LenOk(self.len()),
        }
    }

    fn is_valid_step(&mut self, op: &Self::Op, ret: &Self::Ret) -> bool {
        // Override to avoid cloning the value on pushes.
        match (op, ret) {
            (VecOp::Push(v), VecRet::PushOk) => {
                self.push(v.clone());
                true
            }
            (VecOp::Pop, VecRet::PopOk(v)) => &self.pop() == v,
            (VecOp::Len, VecRet::LenOk(l)) => &self.len() == l,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn models_expected_semantics() {
        let mut v = vec!['A'];
        assert_eq!(v.invoke(&VecOp::Len), VecRet::LenOk(1));
        assert_eq!(v.invoke(&VecOp::Push('B')), VecRet::PushOk);
        assert_eq!(v.invoke(&VecOp::Len), VecRet::LenOk(2));
        assert_eq!(v.invoke(&VecOp::Pop), VecRet::PopOk(Some('B')));
        assert_eq!(v.invoke(&VecOp::Pop), VecRet::PopOk(Some('A')));
        assert_eq!(v.invoke(&VecOp::Pop), VecRet::PopOk(None));
    }

    #[test]
    fn rejects_invalid_histories() {
        assert!(!Vec::<char>::new().is_valid_history(vec![
            (VecOp::Push('A'), VecRet::PushOk),
            (VecOp::Pop, VecRet::PopOk(None)),
        ]));
        assert!(vec!['A'].is_valid_history(vec![
            (VecOp::Len, VecRet::LenOk(1)),
            (VecOp::Pop, VecRet::PopOk(Some('A'))),
        ]));
    }
}
