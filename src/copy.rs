//! Deep-copy dispatch between views.

use rayon::prelude::*;

use crate::errors::CopyError;
use crate::layout::{LayoutKind, GRAD_SLOT, SLOTS};
use crate::offset::{SpatialIndices, ViewOffset};
use crate::overlap::regions_overlap;
use crate::space::MemorySpace;
use crate::storage::{Storage, StorageMut};
use crate::view::{TensorBase, ViewKind};

/// Minimum scalar count before the element-wise remap parallelizes over the
/// outermost spatial dimension.
const PARALLEL_REMAP_MIN_LEN: usize = 4096;

/// Which side's execution context drives an element-wise remap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyContext {
    Dst,
    Src,
}

/// The copy strategy selected for a pair of views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyPath {
    /// Both views are rank 0: copy one logical element's worth of bytes,
    /// derivative components included.
    ScalarBytes,

    /// Matching layouts and shape: copy the flattened region in one go,
    /// derivative components included.
    ContiguousBytes,

    /// Matching explicit-stride layouts, shape and strides: copy the
    /// flattened region in one go.
    StridedBytes,

    /// Shape or layout mismatch: element-wise remap driven by the given
    /// side's execution context.
    Remap(CopyContext),
}

/// Return true if `T` is a type that is known to be `Copy`.
///
/// The bulk byte paths duplicate element bits, which is only sound for
/// plain scalar types; other `Clone` elements take the remap paths, which
/// clone element-wise.
fn is_known_copy_type<T>() -> bool {
    [
        typeid::of::<f32>(),
        typeid::of::<f64>(),
        typeid::of::<i32>(),
        typeid::of::<i64>(),
        typeid::of::<i16>(),
        typeid::of::<u16>(),
        typeid::of::<u8>(),
        typeid::of::<i8>(),
    ]
    .contains(&typeid::of::<T>())
}

/// Select the copy strategy for copying `src` into `dst`.
///
/// Branches are evaluated in order and the first match wins:
///
/// 1. both rank 0 → [`CopyPath::ScalarBytes`];
/// 2. matching row-/column-major layouts (or rank-1 views with identical
///    strides), equal dimensions and spans → [`CopyPath::ContiguousBytes`];
/// 3. matching explicit-stride layouts, equal dimensions, spans and strides
///    → [`CopyPath::StridedBytes`];
/// 4. the destination's context can access the source's memory → remap
///    driven by the destination;
/// 5. the source's context can access the destination's memory → remap
///    driven by the source;
/// 6. neither → [`CopyError::Inaccessible`].
///
/// The byte paths additionally require a known bit-copyable element type.
pub fn select_copy_path<T, SD, SS, M, KD, KS>(
    dst: &TensorBase<SD, M, KD>,
    src: &TensorBase<SS, M, KS>,
) -> Result<CopyPath, CopyError>
where
    SD: Storage<Elem = T>,
    SS: Storage<Elem = T>,
    M: MemorySpace,
    KD: ViewKind,
    KS: ViewKind,
{
    let byte_compatible = is_known_copy_type::<T>();

    if byte_compatible && dst.rank() == 0 && src.rank() == 0 {
        return Ok(CopyPath::ScalarBytes);
    }

    let dims_equal = dst.view_offset().dims() == src.view_offset().dims();
    let spans_equal = dst.span() == src.span();
    let strides_equal = dst.view_offset().strides() == src.view_offset().strides();
    let both_rank_1 = dst.rank() == 1 && src.rank() == 1;

    if byte_compatible && dims_equal && spans_equal {
        let contiguous_kinds_match = dst.layout_kind() == src.layout_kind()
            && matches!(
                dst.layout_kind(),
                LayoutKind::RowMajor | LayoutKind::ColMajor
            );
        if contiguous_kinds_match || (both_rank_1 && strides_equal) {
            return Ok(CopyPath::ContiguousBytes);
        }

        if dst.layout_kind() == LayoutKind::Strided
            && src.layout_kind() == LayoutKind::Strided
            && strides_equal
        {
            return Ok(CopyPath::StridedBytes);
        }
    }

    if dst.space().can_access(src.space()) {
        Ok(CopyPath::Remap(CopyContext::Dst))
    } else if src.space().can_access(dst.space()) {
        Ok(CopyPath::Remap(CopyContext::Src))
    } else {
        Err(CopyError::Inaccessible)
    }
}

/// Copy the elements of `src` into `dst`.
///
/// Chooses a strategy with [`select_copy_path`] and executes it. When the
/// views' shapes differ, the remap paths copy the per-dimension
/// intersection of the two index spaces.
///
/// If the views refer to the same base address the operation returns
/// immediately without touching any bytes. Distinct but overlapping regions
/// are rejected with [`CopyError::MayOverlap`], and views in mutually
/// inaccessible memory with [`CopyError::Inaccessible`] — this operation
/// does not allocate a staging buffer on the caller's behalf.
pub fn try_deep_copy<T, SD, SS, M, KD, KS>(
    dst: &mut TensorBase<SD, M, KD>,
    src: &TensorBase<SS, M, KS>,
) -> Result<(), CopyError>
where
    SD: StorageMut<Elem = T>,
    SS: Storage<Elem = T>,
    M: MemorySpace,
    KD: ViewKind,
    KS: ViewKind,
    T: Clone + Send + Sync,
{
    if dst.data_ptr() == src.data_ptr() {
        return Ok(());
    }

    if regions_overlap(dst.data_ptr(), dst.span(), src.data_ptr(), src.span()) {
        return Err(CopyError::MayOverlap);
    }

    match select_copy_path(dst, src)? {
        CopyPath::ScalarBytes => {
            // One logical element, bounded by both regions.
            let count = dst.span().min(src.span());
            // Safety: `T` is a known `Copy` type, both regions cover
            // `count` elements and were checked disjoint above.
            unsafe {
                std::ptr::copy_nonoverlapping(src.data_ptr(), dst.data_mut_ptr(), count);
            }
        }
        CopyPath::ContiguousBytes | CopyPath::StridedBytes => {
            let count = dst.span();
            // Safety: `T` is a known `Copy` type, the selector checked that
            // both spans equal `count`, both storages cover their span, and
            // the regions were checked disjoint above.
            unsafe {
                std::ptr::copy_nonoverlapping(src.data_ptr(), dst.data_mut_ptr(), count);
            }
        }
        // Host execution contexts are interchangeable; the selector still
        // records which side drives for spaces where it matters.
        CopyPath::Remap(_context) => remap_elements(dst, src),
    }

    Ok(())
}

/// Variant of [`try_deep_copy`] which panics on error.
pub fn deep_copy<T, SD, SS, M, KD, KS>(dst: &mut TensorBase<SD, M, KD>, src: &TensorBase<SS, M, KS>)
where
    SD: StorageMut<Elem = T>,
    SS: Storage<Elem = T>,
    M: MemorySpace,
    KD: ViewKind,
    KS: ViewKind,
    T: Clone + Send + Sync,
{
    if let Err(err) = try_deep_copy(dst, src) {
        panic!("deep copy failed: {}", err);
    }
}

/// Wrapper to move raw pointers into rayon tasks.
#[derive(Clone, Copy)]
struct SendPtr<T>(T);

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

/// Element-wise copy of the intersection of the two views' index spaces,
/// honoring both descriptors' strides.
fn remap_elements<T, SD, SS, M, KD, KS>(dst: &mut TensorBase<SD, M, KD>, src: &TensorBase<SS, M, KS>)
where
    SD: StorageMut<Elem = T>,
    SS: Storage<Elem = T>,
    M: MemorySpace,
    KD: ViewKind,
    KS: ViewKind,
    T: Clone + Send + Sync,
{
    let dst_offset = *dst.view_offset();
    let src_offset = *src.view_offset();

    let mut mins = [0; SLOTS];
    for slot in 0..SLOTS {
        mins[slot] = dst_offset.extent(slot).min(src_offset.extent(slot));
    }
    let len: usize = mins.iter().product();
    if len == 0 {
        return;
    }

    let src_ptr = src.data_ptr();
    let dst_ptr = dst.data_mut_ptr();

    if len >= PARALLEL_REMAP_MIN_LEN && mins[0] > 1 {
        let dst_send = SendPtr(dst_ptr);
        let src_send = SendPtr(src_ptr);
        (0..mins[0]).into_par_iter().for_each(|i0| {
            // Capture the whole `SendPtr` wrappers (which are `Send + Sync`)
            // rather than letting edition-2021 disjoint closure captures grab
            // the bare `*mut T`/`*const T` fields, which are not `Sync`.
            let dst_send = dst_send;
            let src_send = src_send;
            // Safety: tasks write disjoint regions. Distinct values of `i0`
            // reach distinct offsets because a mutable view's layout maps
            // every index to a unique offset (enforced at construction).
            remap_slab(
                dst_send.0,
                &dst_offset,
                src_send.0,
                &src_offset,
                i0,
                &mins,
            );
        });
    } else {
        for i0 in 0..mins[0] {
            remap_slab(dst_ptr, &dst_offset, src_ptr, &src_offset, i0, &mins);
        }
    }
}

/// Copy one outermost-index slab of the intersection region.
fn remap_slab<T: Clone>(
    dst_ptr: *mut T,
    dst_offset: &ViewOffset,
    src_ptr: *const T,
    src_offset: &ViewOffset,
    i0: usize,
    mins: &[usize; SLOTS],
) {
    let mut inner = [0; GRAD_SLOT];
    inner.copy_from_slice(&mins[..GRAD_SLOT]);
    inner[0] = 1;

    let components = mins[GRAD_SLOT];

    for mut index in SpatialIndices::new(inner) {
        index[0] = i0;

        let mut dst_base = 0;
        let mut src_base = 0;
        for slot in 0..GRAD_SLOT {
            dst_base += index[slot] * dst_offset.stride(slot);
            src_base += index[slot] * src_offset.stride(slot);
        }

        for component in 0..components {
            // Safety: every index is below both descriptors' extents, so
            // the offsets are within both storage regions, and the regions
            // are disjoint.
            unsafe {
                let value = (*src_ptr.add(src_base + component * src_offset.stride(GRAD_SLOT)))
                    .clone();
                *dst_ptr.add(dst_base + component * dst_offset.stride(GRAD_SLOT)) = value;
            }
        }
    }
}
