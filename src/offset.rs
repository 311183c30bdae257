//! The runtime offset descriptor attached to every view.

use crate::layout::{CanonicalLayout, GRAD_SLOT, SLOTS};

/// Maps indices to storage offsets for one view.
///
/// A descriptor always carries all [`SLOTS`] dimension and stride slots in
/// canonical form (derivative extent last, unused dimensions 1, unused
/// strides 0). The derivative extent and stride are duplicated in scalar
/// fields so that hot paths do not have to reach into the arrays.
///
/// Descriptors are only created — at view construction, subview derivation
/// or assignment — and never mutated afterwards; every derivation produces
/// a fresh value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewOffset {
    pub(crate) dims: [usize; SLOTS],
    pub(crate) strides: [usize; SLOTS],
    pub(crate) grad_size: usize,
    pub(crate) grad_stride: usize,
}

impl ViewOffset {
    /// Build a descriptor from a canonicalized layout.
    pub fn from_canonical(layout: &CanonicalLayout) -> ViewOffset {
        let dims = *layout.dims();
        let strides = *layout.strides();
        ViewOffset {
            dims,
            strides,
            grad_size: dims[GRAD_SLOT],
            grad_stride: strides[GRAD_SLOT],
        }
    }

    /// Build a descriptor directly from slot arrays and derivative scalars.
    ///
    /// Used for raw (not yet canonical) descriptors produced by slicing,
    /// where the derivative dimension still sits at the slot indexed by the
    /// subview's rank.
    pub(crate) fn raw(
        dims: [usize; SLOTS],
        strides: [usize; SLOTS],
        grad_size: usize,
        grad_stride: usize,
    ) -> ViewOffset {
        ViewOffset {
            dims,
            strides,
            grad_size,
            grad_stride,
        }
    }

    pub fn dims(&self) -> &[usize; SLOTS] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize; SLOTS] {
        &self.strides
    }

    /// Size of the dimension at `slot`.
    #[inline]
    pub fn extent(&self, slot: usize) -> usize {
        self.dims[slot]
    }

    /// Offset gap between adjacent indices along `slot`.
    #[inline]
    pub fn stride(&self, slot: usize) -> usize {
        self.strides[slot]
    }

    /// The derivative extent: number of scalar components per logical
    /// element.
    #[inline]
    pub fn grad_size(&self) -> usize {
        self.grad_size
    }

    /// Offset gap between adjacent derivative components of one logical
    /// element.
    #[inline]
    pub fn grad_stride(&self) -> usize {
        self.grad_stride
    }

    /// Total number of scalar elements addressable within the view's
    /// region, including the derivative extent: the offset one past the
    /// highest reachable element, or 0 for an empty view.
    pub fn span(&self) -> usize {
        if self.dims.iter().any(|&dim| dim == 0) {
            return 0;
        }
        let max_offset: usize = self
            .dims
            .iter()
            .zip(self.strides.iter())
            .map(|(&dim, &stride)| (dim - 1) * stride)
            .sum();
        max_offset + 1
    }

    /// Number of scalar elements a dense traversal of all slots visits.
    /// Equal to [`span`](Self::span) when the layout has no gaps.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a full 8-slot index to a storage offset.
    ///
    /// The last slot indexes the derivative component.
    #[inline]
    pub fn offset(&self, index: [usize; SLOTS]) -> usize {
        let mut offset = 0;
        for slot in 0..SLOTS {
            debug_assert!(index[slot] < self.dims[slot]);
            offset += index[slot] * self.strides[slot];
        }
        offset
    }
}

/// Iterator over the spatial index space of a descriptor: all combinations
/// of indices for slots `0..GRAD_SLOT`, last slot varying fastest.
pub(crate) struct SpatialIndices {
    dims: [usize; GRAD_SLOT],
    next: Option<[usize; GRAD_SLOT]>,
}

impl SpatialIndices {
    pub(crate) fn new(dims: [usize; GRAD_SLOT]) -> SpatialIndices {
        let next = dims.iter().all(|&dim| dim > 0).then_some([0; GRAD_SLOT]);
        SpatialIndices { dims, next }
    }
}

impl Iterator for SpatialIndices {
    type Item = [usize; GRAD_SLOT];

    fn next(&mut self) -> Option<[usize; GRAD_SLOT]> {
        let current = self.next?;
        let mut index = current;
        let mut slot = GRAD_SLOT;
        self.next = loop {
            if slot == 0 {
                break None;
            }
            slot -= 1;
            index[slot] += 1;
            if index[slot] < self.dims[slot] {
                break Some(index);
            }
            index[slot] = 0;
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::layout::LayoutRequest;

    use super::{SpatialIndices, ViewOffset};

    #[test]
    fn test_from_canonical_duplicates_grad_scalars() {
        let layout = LayoutRequest::row_major(&[4, 4, 3]).canonicalize();
        let offset = ViewOffset::from_canonical(&layout);

        assert_eq!(offset.grad_size(), 3);
        assert_eq!(offset.grad_stride(), 1);
        assert_eq!(offset.span(), 48);
        assert_eq!(offset.len(), 48);
    }

    #[test]
    fn test_span_of_gappy_layout_exceeds_len() {
        // Rank-1 spatial view of 4 elements spaced 6 apart, derivative
        // extent 3 with unit stride.
        let layout = LayoutRequest::strided(&[(4, 6), (3, 1)]).canonicalize();
        let offset = ViewOffset::from_canonical(&layout);

        assert_eq!(offset.len(), 12);
        assert_eq!(offset.span(), 3 * 6 + 2 + 1);
    }

    #[test]
    fn test_span_of_empty_view_is_zero() {
        let layout = LayoutRequest::row_major(&[0, 3]).canonicalize();
        let offset = ViewOffset::from_canonical(&layout);
        assert_eq!(offset.span(), 0);
        assert!(offset.is_empty());
    }

    #[test]
    fn test_offset_maps_row_major_indices() {
        let layout = LayoutRequest::row_major(&[4, 4, 3]).canonicalize();
        let offset = ViewOffset::from_canonical(&layout);

        assert_eq!(offset.offset([0; 8]), 0);
        assert_eq!(offset.offset([1, 2, 0, 0, 0, 0, 0, 1]), 12 + 6 + 1);
    }

    #[test]
    fn test_spatial_indices_visits_every_index_once() {
        let indices: Vec<_> = SpatialIndices::new([2, 3, 1, 1, 1, 1, 1]).collect();
        assert_eq!(indices.len(), 6);
        assert_eq!(indices[0], [0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(indices[1], [0, 1, 0, 0, 0, 0, 0]);
        assert_eq!(indices[5], [1, 2, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_spatial_indices_empty_dim() {
        assert_eq!(SpatialIndices::new([2, 0, 1, 1, 1, 1, 1]).count(), 0);
    }
}
