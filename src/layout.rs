//! Layout requests and their canonical form.
//!
//! A view is requested with up to [`SLOTS`] extents, of which the leading
//! slots are specified and the rest are left unspecified. The last specified
//! slot carries the derivative extent; canonicalization relocates it to the
//! final slot so that every descriptor in the system agrees on where the
//! derivative dimension lives.

/// Number of dimension slots in a layout. One slot is always reserved for
/// the derivative extent, so the maximum spatial rank is `SLOTS - 1`.
pub const SLOTS: usize = 8;

/// Canonical position of the derivative extent: always the last slot.
pub const GRAD_SLOT: usize = SLOTS - 1;

/// Maximum spatial rank of a view.
pub const MAX_SPATIAL_RANK: usize = SLOTS - 1;

/// Memory ordering of a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    /// The last slot varies fastest ("C" order).
    RowMajor,

    /// The first slot varies fastest (Fortran order).
    ColMajor,

    /// Strides are supplied explicitly, one per slot.
    Strided,
}

/// Return the number of leading specified slots in a dimension vector,
/// capped at [`MAX_SPATIAL_RANK`].
///
/// Counting stops at the first unspecified slot, so the function is total
/// over non-contiguous specification patterns as well. The cap reflects the
/// reserved derivative slot: even with all eight slots specified, the
/// addressable spatial rank is 7.
pub fn specified_rank(dims: &[Option<usize>; SLOTS]) -> usize {
    leading_specified(dims).min(MAX_SPATIAL_RANK)
}

/// Number of leading specified slots, uncapped (0..=8).
fn leading_specified(dims: &[Option<usize>; SLOTS]) -> usize {
    dims.iter().take_while(|dim| dim.is_some()).count()
}

/// A requested layout: up to [`SLOTS`] extents, with explicit strides for
/// [`LayoutKind::Strided`] requests.
///
/// The request is the only place where extents can be unspecified. Once
/// canonicalized (see [`CanonicalLayout`]) every slot holds a concrete
/// extent.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutRequest {
    kind: LayoutKind,
    dims: [Option<usize>; SLOTS],
    strides: [usize; SLOTS],
}

impl LayoutRequest {
    /// Create a row-major request from leading extents. The last extent is
    /// the derivative extent.
    ///
    /// Panics if more than [`SLOTS`] extents are given.
    pub fn row_major(extents: &[usize]) -> LayoutRequest {
        Self::from_extents(LayoutKind::RowMajor, extents)
    }

    /// Create a column-major request from leading extents. The last extent
    /// is the derivative extent.
    ///
    /// Panics if more than [`SLOTS`] extents are given.
    pub fn col_major(extents: &[usize]) -> LayoutRequest {
        Self::from_extents(LayoutKind::ColMajor, extents)
    }

    /// Create an explicit-stride request from leading (extent, stride)
    /// pairs. The last pair describes the derivative dimension.
    ///
    /// Panics if more than [`SLOTS`] pairs are given.
    pub fn strided(extents_strides: &[(usize, usize)]) -> LayoutRequest {
        assert!(extents_strides.len() <= SLOTS, "too many extents");
        let mut dims = [None; SLOTS];
        let mut strides = [0; SLOTS];
        for (slot, &(extent, stride)) in extents_strides.iter().enumerate() {
            dims[slot] = Some(extent);
            strides[slot] = stride;
        }
        LayoutRequest {
            kind: LayoutKind::Strided,
            dims,
            strides,
        }
    }

    /// Create a request from raw dimension slots, for callers that build the
    /// slot vector themselves.
    pub fn from_slots(kind: LayoutKind, dims: [Option<usize>; SLOTS]) -> LayoutRequest {
        LayoutRequest {
            kind,
            dims,
            strides: [0; SLOTS],
        }
    }

    fn from_extents(kind: LayoutKind, extents: &[usize]) -> LayoutRequest {
        assert!(extents.len() <= SLOTS, "too many extents");
        let mut dims = [None; SLOTS];
        for (slot, &extent) in extents.iter().enumerate() {
            dims[slot] = Some(extent);
        }
        LayoutRequest {
            kind,
            dims,
            strides: [0; SLOTS],
        }
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn dims(&self) -> &[Option<usize>; SLOTS] {
        &self.dims
    }

    /// Canonicalize this request: default unspecified extents to 1 and move
    /// the derivative extent into the last slot.
    pub fn canonicalize(&self) -> CanonicalLayout {
        canonicalize(self)
    }
}

/// A layout in canonical form: every slot holds a concrete extent, the
/// derivative extent occupies [`GRAD_SLOT`], and strides are resolved for
/// every kind.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalLayout {
    kind: LayoutKind,
    dims: [usize; SLOTS],
    strides: [usize; SLOTS],
    spatial_rank: usize,
}

/// Canonicalize a layout request.
///
/// Unspecified extents default to 1. The derivative slot — the last
/// specified slot, whose index equals the spatial rank — swaps places with
/// the final slot; for explicit-stride requests the stride array is swapped
/// identically, with all stride values taken verbatim from the request.
pub fn canonicalize(request: &LayoutRequest) -> CanonicalLayout {
    let count = leading_specified(&request.dims);
    let grad_dim = count.saturating_sub(1);
    let spatial_rank = grad_dim;

    let mut dims = request.dims.map(|dim| dim.unwrap_or(1));
    dims.swap(grad_dim, GRAD_SLOT);

    let strides = match request.kind {
        LayoutKind::RowMajor => row_major_strides(&dims),
        LayoutKind::ColMajor => col_major_strides(&dims),
        LayoutKind::Strided => {
            let mut strides = request.strides;
            strides.swap(grad_dim, GRAD_SLOT);
            strides
        }
    };

    CanonicalLayout {
        kind: request.kind,
        dims,
        strides,
        spatial_rank,
    }
}

/// Return the strides of a contiguous row-major layout with the given
/// extents: the last slot varies fastest.
pub fn row_major_strides(dims: &[usize; SLOTS]) -> [usize; SLOTS] {
    let mut strides = [0; SLOTS];
    let mut stride = 1;
    for slot in (0..SLOTS).rev() {
        strides[slot] = stride;
        stride *= dims[slot];
    }
    strides
}

/// Return the strides of a contiguous column-major layout with the given
/// extents: the first slot varies fastest and the derivative slot is
/// outermost.
pub fn col_major_strides(dims: &[usize; SLOTS]) -> [usize; SLOTS] {
    let mut strides = [0; SLOTS];
    let mut stride = 1;
    for slot in 0..SLOTS {
        strides[slot] = stride;
        stride *= dims[slot];
    }
    strides
}

impl CanonicalLayout {
    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn dims(&self) -> &[usize; SLOTS] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize; SLOTS] {
        &self.strides
    }

    /// The spatial rank the layout was requested with. This is also the
    /// pre-canonicalization index of the derivative slot.
    pub fn spatial_rank(&self) -> usize {
        self.spatial_rank
    }

    /// The derivative extent.
    pub fn grad_size(&self) -> usize {
        self.dims[GRAD_SLOT]
    }
}

#[cfg(test)]
mod tests {
    use gradview_testing::TestCases;

    use super::{
        canonicalize, specified_rank, LayoutKind, LayoutRequest, GRAD_SLOT, SLOTS,
    };

    #[test]
    fn test_specified_rank_counts_leading_slots() {
        // k leading specified slots -> rank k, for every k in 0..=7.
        for k in 0..SLOTS {
            let mut dims = [None; SLOTS];
            for slot in 0..k {
                dims[slot] = Some(slot + 2);
            }
            assert_eq!(specified_rank(&dims), k);
        }

        // All 8 slots specified: the trailing slot is reserved for the
        // derivative extent, so the rank is capped at 7.
        assert_eq!(specified_rank(&[Some(2); SLOTS]), 7);
    }

    #[test]
    fn test_specified_rank_stops_at_first_gap() {
        let mut dims = [None; SLOTS];
        dims[0] = Some(4);
        dims[2] = Some(5);
        assert_eq!(specified_rank(&dims), 1);
    }

    #[test]
    fn test_canonicalize_relocates_grad_slot() {
        #[derive(Debug)]
        struct Case {
            kind: LayoutKind,
            extents: Vec<usize>,
        }

        let cases = [
            Case {
                kind: LayoutKind::RowMajor,
                extents: vec![3],
            },
            Case {
                kind: LayoutKind::RowMajor,
                extents: vec![4, 3],
            },
            Case {
                kind: LayoutKind::ColMajor,
                extents: vec![4, 5, 3],
            },
            Case {
                kind: LayoutKind::RowMajor,
                extents: vec![2, 2, 2, 2, 2, 2, 2, 3],
            },
        ];

        cases.test_each(|case| {
            let request = match case.kind {
                LayoutKind::ColMajor => LayoutRequest::col_major(&case.extents),
                _ => LayoutRequest::row_major(&case.extents),
            };
            let layout = canonicalize(&request);

            // The derivative slot was at position p = extents.len() - 1; its
            // extent must land in the last slot, a 1 must land at p, and
            // every other originally-unspecified slot must be 1.
            let p = case.extents.len() - 1;
            assert_eq!(layout.grad_size(), case.extents[p]);
            assert_eq!(layout.spatial_rank(), p);
            for slot in 0..SLOTS - 1 {
                if slot < p {
                    assert_eq!(layout.dims()[slot], case.extents[slot]);
                } else {
                    assert_eq!(layout.dims()[slot], 1);
                }
            }
        })
    }

    #[test]
    fn test_canonicalize_strided_swaps_strides() {
        // Rank-2 spatial view with derivative extent 3 at slot 2.
        let request = LayoutRequest::strided(&[(4, 30), (5, 6), (3, 1)]);
        let layout = canonicalize(&request);

        assert_eq!(layout.dims(), &[4, 5, 1, 1, 1, 1, 1, 3]);
        assert_eq!(layout.strides(), &[30, 6, 0, 0, 0, 0, 0, 1]);
        assert_eq!(layout.spatial_rank(), 2);
    }

    #[test]
    fn test_canonicalize_all_slots_specified() {
        // With all 8 slots specified the derivative slot is already last.
        let extents = [2, 2, 2, 2, 2, 2, 2, 5];
        let layout = canonicalize(&LayoutRequest::row_major(&extents));
        assert_eq!(layout.dims(), &extents);
        assert_eq!(layout.grad_size(), 5);
        assert_eq!(layout.spatial_rank(), 7);
    }

    #[test]
    fn test_canonicalize_empty_request() {
        // Degenerate request with nothing specified: every slot defaults
        // to 1, including the derivative extent.
        let layout = canonicalize(&LayoutRequest::row_major(&[]));
        assert_eq!(layout.dims(), &[1; SLOTS]);
        assert_eq!(layout.spatial_rank(), 0);
        assert_eq!(layout.grad_size(), 1);
    }

    #[test]
    fn test_row_major_grad_components_contiguous() {
        let layout = canonicalize(&LayoutRequest::row_major(&[4, 4, 3]));
        assert_eq!(layout.strides()[GRAD_SLOT], 1);
        assert_eq!(layout.dims()[GRAD_SLOT], 3);
    }

    #[test]
    fn test_col_major_grad_components_outermost() {
        let layout = canonicalize(&LayoutRequest::col_major(&[4, 4, 3]));
        // Slot 0 varies fastest; the derivative components are strided by
        // the full spatial span.
        assert_eq!(layout.strides()[0], 1);
        assert_eq!(layout.strides()[GRAD_SLOT], 16);
    }
}
