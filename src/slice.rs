//! Slicing arguments for subview derivation.

use std::ops::RangeFull;

use smallvec::SmallVec;

/// Specifies what a subview takes from one spatial dimension of its source.
///
/// Can be constructed from an index or `..` using `arg.into()`. Dimensions
/// with no corresponding argument keep their full range, and the derivative
/// dimension always keeps its full range — it cannot be sliced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SliceArg {
    /// Extract a specific index from a dimension. The dimension is collapsed
    /// out of the subview, reducing its rank by one.
    Index(usize),

    /// Keep the full range of a dimension.
    All,
}

impl From<usize> for SliceArg {
    #[inline]
    fn from(value: usize) -> Self {
        SliceArg::Index(value)
    }
}

// This conversion exists to avoid ambiguity when slicing with a numeric
// literal of unspecified type (eg. `view.subview((0, ..))`).
impl From<i32> for SliceArg {
    #[inline]
    fn from(value: i32) -> Self {
        assert!(value >= 0, "slice index is negative");
        SliceArg::Index(value as usize)
    }
}

impl From<RangeFull> for SliceArg {
    #[inline]
    fn from(_: RangeFull) -> Self {
        SliceArg::All
    }
}

/// Dynamically sized array of [`SliceArg`]s, which avoids allocating in the
/// common case where the length is small.
pub type DynSliceArgs = SmallVec<[SliceArg; 7]>;

/// Used to convert sequences of indices and/or full ranges into a uniform
/// `[SliceArg]` array for [`subview`](crate::TensorBase::subview).
///
/// This trait is implemented for:
///
///  - Individual indices and `..` (types satisfying `Into<SliceArg>`)
///  - Arrays of indices or ranges
///  - Tuples of indices and/or ranges
///  - `[SliceArg]` slices
pub trait IntoSliceArgs {
    type Array: AsRef<[SliceArg]>;

    fn into_slice_args(self) -> Self::Array;
}

impl<'a> IntoSliceArgs for &'a [SliceArg] {
    type Array = &'a [SliceArg];

    fn into_slice_args(self) -> &'a [SliceArg] {
        self
    }
}

impl<const N: usize, T: Into<SliceArg>> IntoSliceArgs for [T; N] {
    type Array = [SliceArg; N];

    fn into_slice_args(self) -> [SliceArg; N] {
        self.map(|x| x.into())
    }
}

impl<T: Into<SliceArg>> IntoSliceArgs for T {
    type Array = [SliceArg; 1];

    fn into_slice_args(self) -> [SliceArg; 1] {
        [self.into()]
    }
}

impl<T1: Into<SliceArg>> IntoSliceArgs for (T1,) {
    type Array = [SliceArg; 1];

    fn into_slice_args(self) -> [SliceArg; 1] {
        [self.0.into()]
    }
}

impl<T1: Into<SliceArg>, T2: Into<SliceArg>> IntoSliceArgs for (T1, T2) {
    type Array = [SliceArg; 2];

    fn into_slice_args(self) -> [SliceArg; 2] {
        [self.0.into(), self.1.into()]
    }
}

impl<T1: Into<SliceArg>, T2: Into<SliceArg>, T3: Into<SliceArg>> IntoSliceArgs for (T1, T2, T3) {
    type Array = [SliceArg; 3];

    fn into_slice_args(self) -> [SliceArg; 3] {
        [self.0.into(), self.1.into(), self.2.into()]
    }
}

impl<T1: Into<SliceArg>, T2: Into<SliceArg>, T3: Into<SliceArg>, T4: Into<SliceArg>> IntoSliceArgs
    for (T1, T2, T3, T4)
{
    type Array = [SliceArg; 4];

    fn into_slice_args(self) -> [SliceArg; 4] {
        [self.0.into(), self.1.into(), self.2.into(), self.3.into()]
    }
}

/// Convert a slice of indices or ranges into [`SliceArg`]s when the length
/// is not statically known.
pub fn to_slice_args<T: Clone + Into<SliceArg>>(args: &[T]) -> DynSliceArgs {
    args.iter().map(|x| x.clone().into()).collect()
}
