//! Rank-indexed dimension and stride transfer between offset descriptors.
//!
//! Subview derivation and cross-kind assignment both reduce to the same
//! structural copy: take the spatial slots of a source descriptor, collapse
//! everything between the spatial rank and the derivative slot to a trivial
//! dimension, and route the derivative extent and stride into the final
//! slot. There is one rule per spatial rank 0..=7, selected at runtime.

use crate::layout::{GRAD_SLOT, MAX_SPATIAL_RANK};
use crate::offset::ViewOffset;

/// The transfer rule for one spatial rank.
///
/// Applying the rule at rank R copies source slots `0..R` verbatim,
/// backfills destination dimensions `R..7` with 1 (strides with 0), and
/// writes the source's derivative extent and stride into slot 7. A source
/// descriptor locates its derivative pair via its `grad_size` /
/// `grad_stride` scalars, so the rule accepts both raw sliced descriptors
/// (derivative pair at slot R) and canonical ones (derivative pair already
/// at slot 7); for the latter the rule is the identity.
#[derive(Clone, Copy, Debug)]
pub struct TransferRule {
    rank: usize,
    static_grad_width: bool,
}

impl TransferRule {
    /// Create the rule for a view with a runtime-sized derivative extent.
    ///
    /// Panics if `rank` exceeds [`MAX_SPATIAL_RANK`].
    pub fn new(rank: usize) -> TransferRule {
        assert!(rank <= MAX_SPATIAL_RANK, "rank {} out of range", rank);
        TransferRule {
            rank,
            static_grad_width: false,
        }
    }

    /// Create the rule for a view whose derivative extent is a compile-time
    /// constant of its type.
    ///
    /// The dimension-slot-7 assignment becomes a no-op: the destination
    /// already knows its extent. The stride-slot-7 assignment still runs,
    /// since the stride is runtime information regardless of the width.
    pub fn with_static_width(rank: usize) -> TransferRule {
        assert!(rank <= MAX_SPATIAL_RANK, "rank {} out of range", rank);
        TransferRule {
            rank,
            static_grad_width: true,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Transfer dimension slots from `src` into `dst`.
    pub fn apply_dims(&self, dst: &mut ViewOffset, src: &ViewOffset) {
        for slot in 0..self.rank {
            dst.dims[slot] = src.dims[slot];
        }
        for slot in self.rank..GRAD_SLOT {
            dst.dims[slot] = 1;
        }
        if !self.static_grad_width {
            dst.dims[GRAD_SLOT] = src.grad_size;
        }
    }

    /// Transfer stride slots from `src` into `dst`. Strides of collapsed
    /// dimensions are conventionally 0.
    pub fn apply_strides(&self, dst: &mut ViewOffset, src: &ViewOffset) {
        for slot in 0..self.rank {
            dst.strides[slot] = src.strides[slot];
        }
        for slot in self.rank..GRAD_SLOT {
            dst.strides[slot] = 0;
        }
        dst.strides[GRAD_SLOT] = src.grad_stride;
    }

    /// Transfer both dimension and stride slots and the derivative scalars.
    pub fn apply(&self, dst: &mut ViewOffset, src: &ViewOffset) {
        self.apply_dims(dst, src);
        self.apply_strides(dst, src);
        dst.grad_size = src.grad_size;
        dst.grad_stride = src.grad_stride;
    }
}

#[cfg(test)]
mod tests {
    use gradview_testing::TestCases;

    use crate::layout::{GRAD_SLOT, SLOTS};
    use crate::offset::ViewOffset;

    use super::TransferRule;

    /// Build a raw descriptor of the given spatial rank: spatial extents
    /// `2, 3, 4, ...` with strides `100, 90, 80, ...`, and the derivative
    /// pair (extent 5, stride 7) at the first slot past the rank.
    fn raw_descriptor(rank: usize) -> ViewOffset {
        let mut dims = [0; SLOTS];
        let mut strides = [0; SLOTS];
        for slot in 0..rank {
            dims[slot] = slot + 2;
            strides[slot] = 100 - slot * 10;
        }
        if rank < SLOTS {
            dims[rank] = 5;
            strides[rank] = 7;
        }
        ViewOffset::raw(dims, strides, 5, 7)
    }

    #[test]
    fn test_transfer_routes_grad_pair_to_last_slot() {
        for rank in 0..=GRAD_SLOT {
            let src = raw_descriptor(rank);
            let mut dst = ViewOffset::raw([0; SLOTS], [0; SLOTS], 0, 0);
            TransferRule::new(rank).apply(&mut dst, &src);

            for slot in 0..rank {
                assert_eq!(dst.extent(slot), src.extent(slot));
                assert_eq!(dst.stride(slot), src.stride(slot));
            }
            for slot in rank..GRAD_SLOT {
                assert_eq!(dst.extent(slot), 1);
                assert_eq!(dst.stride(slot), 0);
            }
            assert_eq!(dst.extent(GRAD_SLOT), 5);
            assert_eq!(dst.stride(GRAD_SLOT), 7);
            assert_eq!(dst.grad_size(), 5);
            assert_eq!(dst.grad_stride(), 7);
        }
    }

    #[test]
    fn test_transfer_is_idempotent() {
        #[derive(Debug)]
        struct Case {
            rank: usize,
            static_width: bool,
        }

        let cases = (0..=GRAD_SLOT).flat_map(|rank| {
            [false, true].map(|static_width| Case { rank, static_width })
        });

        cases.test_each(|case| {
            let rule = if case.static_width {
                TransferRule::with_static_width(case.rank)
            } else {
                TransferRule::new(case.rank)
            };

            let src = raw_descriptor(case.rank);
            let mut first = ViewOffset::raw([1; SLOTS], [0; SLOTS], 5, 7);
            rule.apply(&mut first, &src);

            let mut second = first;
            rule.apply(&mut second, &first);
            assert_eq!(second, first);
        })
    }

    #[test]
    fn test_static_width_skips_dim_slot_but_not_stride_slot() {
        let src = raw_descriptor(2);
        // Destination whose type fixes the derivative extent at 9.
        let mut dims = [1; SLOTS];
        dims[GRAD_SLOT] = 9;
        let mut dst = ViewOffset::raw(dims, [0; SLOTS], 9, 0);

        let rule = TransferRule::with_static_width(2);
        rule.apply_dims(&mut dst, &src);
        rule.apply_strides(&mut dst, &src);

        assert_eq!(dst.extent(GRAD_SLOT), 9);
        assert_eq!(dst.stride(GRAD_SLOT), 7);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_rank_out_of_range() {
        TransferRule::new(SLOTS);
    }
}
