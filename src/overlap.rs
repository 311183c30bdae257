//! Overlap predicates for layouts and storage regions.

use smallvec::SmallVec;

use crate::layout::SLOTS;

/// Return true if a given shape and strides describe a contiguous layout in
/// row-major order.
pub fn is_contiguous(dims: &[usize], strides: &[usize]) -> bool {
    let mut product = 1;
    for (&dim, &stride) in dims.iter().zip(strides.iter()).rev() {
        // Dimensions of size 1 cannot affect whether the layout is
        // contiguous, since the only valid index is 0 and `0 * stride = 0`
        // for any stride.
        if dim == 1 {
            continue;
        }

        if stride != product {
            return false;
        }
        product *= dim;
    }
    true
}

/// Return true if multiple indices may map to the same offset.
///
/// Determining whether arbitrary shapes and strides overlap is difficult
/// (see the internal-overlap notes in NumPy's `mem_overlap.c`), so this
/// check is conservative: after sorting dimensions by increasing stride,
/// each dimension's stride must step over the maximum offset reachable by
/// indexing the previous dimensions. Contiguous layouts and layouts sliced
/// from non-overlapping layouts pass; some exotic but non-overlapping
/// stride patterns are rejected.
pub fn may_have_internal_overlap(dims: &[usize; SLOTS], strides: &[usize; SLOTS]) -> bool {
    // If the view is empty there are no valid indices, hence no overlap.
    if dims.iter().any(|&dim| dim == 0) {
        return false;
    }

    // Fast path for the common contiguous case.
    if is_contiguous(dims, strides) {
        return false;
    }

    // Trivial dimensions admit only index 0 and cannot collide. Collapsed
    // subview slots carry stride 0, which would otherwise read as overlap.
    let mut stride_dims: SmallVec<[(usize, usize); SLOTS]> = strides
        .iter()
        .copied()
        .zip(dims.iter().copied())
        .filter(|&(_, dim)| dim > 1)
        .collect();
    stride_dims.sort_unstable();

    let mut max_offset = 0;
    for (stride, dim) in stride_dims {
        if stride <= max_offset {
            return true;
        }
        max_offset += (dim - 1) * stride;
    }
    false
}

/// Return true if two storage regions, given as (base pointer, span in
/// elements), intersect without being identical.
///
/// Identical bases are reported as non-overlapping: a copy between views of
/// the same base is a self-copy, which the copy layer short-circuits.
pub fn regions_overlap<T>(a_ptr: *const T, a_span: usize, b_ptr: *const T, b_span: usize) -> bool {
    if a_ptr == b_ptr || a_span == 0 || b_span == 0 {
        return false;
    }
    let a_start = a_ptr as usize;
    let a_end = a_start + a_span * std::mem::size_of::<T>();
    let b_start = b_ptr as usize;
    let b_end = b_start + b_span * std::mem::size_of::<T>();
    a_start < b_end && b_start < a_end
}
