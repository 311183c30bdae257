//! Error types that are reported by view and copy operations.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors that can occur when constructing a view from existing data.
#[derive(Debug, PartialEq)]
pub enum FromDataError {
    /// Some indices will map to offsets that are beyond the end of the storage.
    StorageTooShort,

    /// Some indices will map to the same offset within the storage.
    ///
    /// This error can only occur when the storage is mutable.
    MayOverlap,

    /// The derivative extent does not match the static width of the view's
    /// kind.
    GradWidthMismatch,
}

impl Display for FromDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FromDataError::StorageTooShort => write!(f, "data too short"),
            FromDataError::MayOverlap => write!(f, "may have internal overlap"),
            FromDataError::GradWidthMismatch => {
                write!(f, "derivative extent does not match static width")
            }
        }
    }
}

impl Error for FromDataError {}

/// Errors that can occur when taking a subview of a view.
#[derive(Clone, Debug, PartialEq)]
pub enum SliceError {
    /// The slice spec has more dimensions than the view's spatial rank.
    TooManyDims,

    /// An index in the slice spec is out of bounds for the corresponding
    /// dimension.
    InvalidIndex,
}

impl Display for SliceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceError::TooManyDims => write!(f, "slice spec has too many dims"),
            SliceError::InvalidIndex => write!(f, "slice index is invalid"),
        }
    }
}

impl Error for SliceError {}

/// Errors that can occur when deep-copying one view into another.
#[derive(Clone, Debug, PartialEq)]
pub enum CopyError {
    /// Neither view's execution context can access the other's memory, and
    /// deep copy does not allocate a staging buffer on the caller's behalf.
    Inaccessible,

    /// The views occupy distinct but overlapping storage regions. A parallel
    /// element-wise copy over overlapping regions is erroneous, so the
    /// operation is rejected before any bytes are touched.
    MayOverlap,
}

impl Display for CopyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyError::Inaccessible => {
                write!(f, "deep copy would require a temporary allocation")
            }
            CopyError::MayOverlap => write!(f, "source and destination overlap"),
        }
    }
}

impl Error for CopyError {}
