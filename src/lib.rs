//! gradview provides dynamic-rank multi-dimensional array views whose
//! elements carry an automatic-differentiation payload: alongside each
//! logical element the view stores a vector of derivative components.
//!
//! # Layout model
//!
//! A view has up to 7 spatial dimensions plus one derivative dimension,
//! held in a fixed descriptor of 8 slots. Construction starts from a
//! [`LayoutRequest`] in which only the leading slots are specified; the
//! last specified slot carries the derivative extent. Canonicalization
//! (see [`layout::canonicalize`]) relocates that extent into the final
//! slot, so every descriptor in the system agrees on where the derivative
//! dimension lives regardless of the view's rank. Subview derivation and
//! cross-kind assignment rebuild descriptors with the rank-indexed
//! [`TransferRule`], which preserves this invariant.
//!
//! # Storage and spaces
//!
//! A view combines a descriptor with data storage, which may be owned
//! (like `Vec<T>`) or borrowed (like `&[T]` / `&mut [T]`), and a
//! [`MemorySpace`] locating that storage. Subviews and assigned views
//! borrow their source's storage; nothing at this layer allocates.
//!
//! | Kind | Owned | Borrowed | Mutably borrowed |
//! | ---- | ----- | -------- | ---------------- |
//! | Derivative-aware | [`GradTensor`] | [`GradView`] | [`GradViewMut`] |
//! | Ordinary | — | [`PlainView`] | [`PlainViewMut`] |
//!
//! # Deep copy
//!
//! [`deep_copy`] moves elements between views of any layouts, ranks and
//! kinds, picking the cheapest safe strategy: a bulk byte copy when the
//! layouts agree byte-for-byte, an element-wise remap otherwise, with
//! memory-space accessibility deciding which side drives the remap.
//!
//! ```
//! use gradview::{deep_copy, GradTensor, HostSpace};
//!
//! // A 4x4 array of elements with 3 derivative components each.
//! let mut x = GradTensor::from_extents(vec![0.0f32; 48], &[4, 4, 3], HostSpace);
//! x.fill(2.0);
//!
//! let row = x.subview((1, ..));
//! assert_eq!(row.rank(), 1);
//! assert_eq!(row.grad_size(), 3);
//!
//! let mut y = GradTensor::from_extents(vec![0.0f32; 48], &[4, 4, 3], HostSpace);
//! deep_copy(&mut y, &x.view());
//! assert_eq!(y.to_vec(), x.to_vec());
//! ```

mod copy;
pub mod errors;
pub mod layout;
mod offset;
mod overlap;
pub mod slice;
pub mod space;
pub mod storage;
mod transfer;
mod view;

// Re-exports for convenience.
pub use copy::{deep_copy, select_copy_path, try_deep_copy, CopyContext, CopyPath};
pub use layout::{canonicalize, specified_rank, CanonicalLayout, LayoutKind, LayoutRequest};
pub use offset::ViewOffset;
pub use slice::{IntoSliceArgs, SliceArg};
pub use space::{HostSpace, MemorySpace};
pub use storage::Storage;
pub use transfer::TransferRule;
pub use view::{
    Grad, GradTensor, GradView, GradViewMut, Plain, PlainView, PlainViewMut, StaticGrad,
    StaticGradView, TensorBase, ViewKind,
};

/// This module provides a convenient way to import the most common traits
/// from this library via a glob import.
pub mod prelude {
    pub use super::{IntoSliceArgs, MemorySpace, Storage, ViewKind};
}
