//! Dynamic-rank views with a derivative dimension.

use std::marker::PhantomData;

use crate::errors::{FromDataError, SliceError};
use crate::layout::{LayoutKind, LayoutRequest, GRAD_SLOT, SLOTS};
use crate::offset::{SpatialIndices, ViewOffset};
use crate::overlap::may_have_internal_overlap;
use crate::slice::{IntoSliceArgs, SliceArg};
use crate::space::{HostSpace, MemorySpace};
use crate::storage::{IntoStorage, Storage, StorageMut, ViewData, ViewMutData};
use crate::transfer::TransferRule;

/// Marker trait selecting a view's derivative-awareness at compile time.
pub trait ViewKind {
    /// True if views of this kind interpret the final dimension slot as a
    /// derivative extent.
    const TRACKS_GRAD: bool;

    /// Compile-time derivative width, or 0 if the width is runtime-sized.
    const STATIC_GRAD_WIDTH: usize = 0;

    /// The transfer rule for a descriptor of this kind at a given rank.
    fn transfer_rule(rank: usize) -> TransferRule {
        if Self::STATIC_GRAD_WIDTH != 0 {
            TransferRule::with_static_width(rank)
        } else {
            TransferRule::new(rank)
        }
    }
}

/// Derivative-aware kind with a runtime-sized derivative extent.
#[derive(Clone, Copy, Debug)]
pub struct Grad;

impl ViewKind for Grad {
    const TRACKS_GRAD: bool = true;
}

/// Derivative-aware kind whose derivative extent is the compile-time
/// constant `W`.
#[derive(Clone, Copy, Debug)]
pub struct StaticGrad<const W: usize>;

impl<const W: usize> ViewKind for StaticGrad<W> {
    const TRACKS_GRAD: bool = true;
    const STATIC_GRAD_WIDTH: usize = W;
}

/// Ordinary kind: the derivative dimension is just a trailing extent.
#[derive(Clone, Copy, Debug)]
pub struct Plain;

impl ViewKind for Plain {
    const TRACKS_GRAD: bool = false;
}

/// The base type for all views.
///
/// A view combines storage (owned or borrowed, see [`Storage`]), a memory
/// space, an offset descriptor in canonical form and the spatial rank it
/// was constructed or sliced with. The type aliases [`GradTensor`],
/// [`GradView`], [`GradViewMut`] etc. select the storage and kind.
pub struct TensorBase<S: Storage, M: MemorySpace, K: ViewKind> {
    data: S,
    space: M,
    offset: ViewOffset,
    layout_kind: LayoutKind,
    rank: usize,
    _kind: PhantomData<K>,
}

/// Owned derivative-aware tensor with dynamic rank and derivative width.
pub type GradTensor<T, M = HostSpace> = TensorBase<Vec<T>, M, Grad>;

/// Borrowed derivative-aware view.
pub type GradView<'a, T, M = HostSpace> = TensorBase<ViewData<'a, T>, M, Grad>;

/// Mutably borrowed derivative-aware view.
pub type GradViewMut<'a, T, M = HostSpace> = TensorBase<ViewMutData<'a, T>, M, Grad>;

/// Borrowed derivative-aware view with compile-time derivative width `W`.
pub type StaticGradView<'a, T, const W: usize, M = HostSpace> =
    TensorBase<ViewData<'a, T>, M, StaticGrad<W>>;

/// Borrowed ordinary view: the derivative dimension is an ordinary trailing
/// extent.
pub type PlainView<'a, T, M = HostSpace> = TensorBase<ViewData<'a, T>, M, Plain>;

/// Mutably borrowed ordinary view.
pub type PlainViewMut<'a, T, M = HostSpace> = TensorBase<ViewMutData<'a, T>, M, Plain>;

impl<S: Storage, M: MemorySpace, K: ViewKind> TensorBase<S, M, K> {
    /// Construct a view over `data` described by `request`.
    ///
    /// The request is canonicalized (see [`LayoutRequest::canonicalize`]);
    /// the storage must cover the canonical layout's span, explicit-stride
    /// requests must not map two indices to one offset, and for
    /// [`StaticGrad`] kinds the derivative extent must equal the static
    /// width.
    pub fn try_from_data<D: IntoStorage<Output = S>>(
        data: D,
        request: &LayoutRequest,
        space: M,
    ) -> Result<TensorBase<S, M, K>, FromDataError> {
        let layout = request.canonicalize();
        let offset = ViewOffset::from_canonical(&layout);

        if K::STATIC_GRAD_WIDTH != 0 && offset.grad_size() != K::STATIC_GRAD_WIDTH {
            return Err(FromDataError::GradWidthMismatch);
        }

        let data = data.into_storage();
        if data.len() < offset.span() {
            return Err(FromDataError::StorageTooShort);
        }

        if request.kind() == LayoutKind::Strided
            && may_have_internal_overlap(offset.dims(), offset.strides())
        {
            return Err(FromDataError::MayOverlap);
        }

        Ok(TensorBase {
            data,
            space,
            offset,
            layout_kind: request.kind(),
            rank: layout.spatial_rank(),
            _kind: PhantomData,
        })
    }

    /// Variant of [`try_from_data`](Self::try_from_data) which panics on
    /// error.
    pub fn from_data<D: IntoStorage<Output = S>>(
        data: D,
        request: &LayoutRequest,
        space: M,
    ) -> TensorBase<S, M, K> {
        match Self::try_from_data(data, request, space) {
            Ok(view) => view,
            Err(err) => panic!("invalid view: {}", err),
        }
    }

    /// Construct a row-major view from bare extents, the last of which is
    /// the derivative extent.
    pub fn from_extents<D: IntoStorage<Output = S>>(
        data: D,
        extents: &[usize],
        space: M,
    ) -> TensorBase<S, M, K> {
        Self::from_data(data, &LayoutRequest::row_major(extents), space)
    }

    /// The spatial rank of the view. The derivative dimension is not
    /// counted.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Size of spatial dimension `dim`.
    ///
    /// Panics if `dim >= self.rank()`.
    pub fn extent(&self, dim: usize) -> usize {
        assert!(dim < self.rank, "dim {} out of range", dim);
        self.offset.extent(dim)
    }

    /// Number of scalar components per logical element. For ordinary views
    /// this is simply the trailing extent.
    pub fn grad_size(&self) -> usize {
        self.offset.grad_size()
    }

    /// Offset gap between adjacent components of one logical element.
    pub fn grad_stride(&self) -> usize {
        self.offset.grad_stride()
    }

    /// Total scalars addressable within the view's region, including the
    /// derivative extent.
    pub fn span(&self) -> usize {
        self.offset.span()
    }

    /// Number of scalars a dense traversal visits.
    pub fn len(&self) -> usize {
        self.offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_empty()
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.layout_kind
    }

    pub fn view_offset(&self) -> &ViewOffset {
        &self.offset
    }

    pub fn space(&self) -> &M {
        &self.space
    }

    /// Return a pointer to the first element of the view's region.
    pub fn data_ptr(&self) -> *const S::Elem {
        self.data.as_ptr()
    }

    /// Reference to the scalar at a spatial index and derivative component.
    ///
    /// Panics if the index or component is out of bounds.
    pub fn at(&self, index: &[usize], component: usize) -> &S::Elem {
        let offset = self.element_offset(index, component);
        // Safety: `element_offset` bounds-checked the index, and shared
        // access to elements of an immutable or uniquely-borrowed view
        // cannot alias a mutable reference.
        unsafe { self.data.get_unchecked(offset) }
    }

    fn element_offset(&self, index: &[usize], component: usize) -> usize {
        assert!(index.len() == self.rank, "index has wrong rank");
        assert!(component < self.offset.grad_size(), "component out of range");
        let mut full = [0; SLOTS];
        for (dim, &idx) in index.iter().enumerate() {
            assert!(idx < self.offset.extent(dim), "index out of bounds");
            full[dim] = idx;
        }
        full[GRAD_SLOT] = component;
        self.offset.offset(full)
    }

    /// Return an immutable view of this view's region.
    pub fn view(&self) -> TensorBase<ViewData<'_, S::Elem>, M, K> {
        TensorBase {
            data: self.data.view(),
            space: self.space.clone(),
            offset: self.offset,
            layout_kind: self.layout_kind,
            rank: self.rank,
            _kind: PhantomData,
        }
    }

    /// Reinterpret this view as an ordinary view: the derivative dimension
    /// becomes an ordinary trailing extent.
    ///
    /// The storage is shared by reference; the descriptor is rebuilt by the
    /// transfer rule at this view's rank.
    pub fn as_plain(&self) -> TensorBase<ViewData<'_, S::Elem>, M, Plain> {
        TensorBase {
            data: self.data.view(),
            space: self.space.clone(),
            offset: self.assigned_offset(),
            layout_kind: self.layout_kind,
            rank: self.rank,
            _kind: PhantomData,
        }
    }

    /// Descriptor for assigning this view into a view of another kind. The
    /// transfer rule is selected by the source's rank and width.
    fn assigned_offset(&self) -> ViewOffset {
        let mut offset = self.offset;
        K::transfer_rule(self.rank).apply(&mut offset, &self.offset);
        offset
    }

    /// Flatten the view into a `Vec` in row-major spatial order with the
    /// derivative components of each element adjacent.
    pub fn to_vec(&self) -> Vec<S::Elem>
    where
        S::Elem: Clone,
    {
        let mut spatial = [0; GRAD_SLOT];
        spatial.copy_from_slice(&self.offset.dims()[..GRAD_SLOT]);

        let mut out = Vec::with_capacity(self.len());
        for index in SpatialIndices::new(spatial) {
            let mut full = [0; SLOTS];
            full[..GRAD_SLOT].copy_from_slice(&index);
            for component in 0..self.offset.grad_size() {
                full[GRAD_SLOT] = component;
                let offset = self.offset.offset(full);
                // Safety: the index iterator stays within the descriptor's
                // extents, which the storage covers.
                out.push(unsafe { self.data.get_unchecked(offset) }.clone());
            }
        }
        out
    }

    /// Return a subview selecting parts of this view's spatial dimensions.
    ///
    /// `args` contains at most `self.rank()` entries: an index collapses a
    /// dimension out of the subview, `..` keeps it, and trailing dimensions
    /// with no entry keep their full range. The derivative dimension always
    /// keeps its full range. The subview shares storage with this view and
    /// always has an explicit-stride layout.
    ///
    /// Panics if the args are invalid for the view's shape.
    pub fn subview<A: IntoSliceArgs>(&self, args: A) -> TensorBase<ViewData<'_, S::Elem>, M, K> {
        match self.try_subview(args) {
            Ok(view) => view,
            Err(err) => panic!("invalid subview: {}", err),
        }
    }

    /// Fallible variant of [`subview`](Self::subview).
    pub fn try_subview<A: IntoSliceArgs>(
        &self,
        args: A,
    ) -> Result<TensorBase<ViewData<'_, S::Elem>, M, K>, SliceError> {
        let (offset, base, rank) = self.subview_offset(args.into_slice_args().as_ref())?;
        Ok(TensorBase {
            data: self.data.slice(base..base + offset.span()),
            space: self.space.clone(),
            offset,
            layout_kind: LayoutKind::Strided,
            rank,
            _kind: PhantomData,
        })
    }

    /// Compute a subview's descriptor, base offset and rank.
    ///
    /// Builds the raw sliced descriptor — kept dimensions first, the
    /// derivative pair at the slot indexed by the new rank — and then
    /// canonicalizes it with the transfer rule for that rank.
    fn subview_offset(&self, args: &[SliceArg]) -> Result<(ViewOffset, usize, usize), SliceError> {
        if args.len() > self.rank {
            return Err(SliceError::TooManyDims);
        }

        let mut raw_dims = [1; SLOTS];
        let mut raw_strides = [0; SLOTS];
        let mut base = 0;
        let mut rank = 0;

        for dim in 0..self.rank {
            match args.get(dim).copied().unwrap_or(SliceArg::All) {
                SliceArg::Index(idx) => {
                    if idx >= self.offset.extent(dim) {
                        return Err(SliceError::InvalidIndex);
                    }
                    base += idx * self.offset.stride(dim);
                }
                SliceArg::All => {
                    raw_dims[rank] = self.offset.extent(dim);
                    raw_strides[rank] = self.offset.stride(dim);
                    rank += 1;
                }
            }
        }

        // Derivative pair at the first slot past the new rank.
        raw_dims[rank] = self.offset.grad_size();
        raw_strides[rank] = self.offset.grad_stride();
        let raw = ViewOffset::raw(
            raw_dims,
            raw_strides,
            self.offset.grad_size(),
            self.offset.grad_stride(),
        );

        let mut offset = raw;
        // A static-width rule leaves the destination's derivative extent
        // alone; seed it before the transfer so both rule variants agree.
        offset.dims[GRAD_SLOT] = self.offset.grad_size();
        K::transfer_rule(rank).apply(&mut offset, &raw);

        // An empty subview addresses nothing; pin its region to the start
        // of the source's storage, which may itself be empty.
        if offset.span() == 0 {
            base = 0;
        }
        Ok((offset, base, rank))
    }
}

impl<S: Storage, M: MemorySpace, const W: usize> TensorBase<S, M, StaticGrad<W>> {
    /// Reinterpret a static-width view as one with a runtime-sized
    /// derivative extent. The storage is shared by reference.
    pub fn as_grad(&self) -> TensorBase<ViewData<'_, S::Elem>, M, Grad> {
        TensorBase {
            data: self.data.view(),
            space: self.space.clone(),
            offset: self.assigned_offset(),
            layout_kind: self.layout_kind,
            rank: self.rank,
            _kind: PhantomData,
        }
    }
}

impl<S: StorageMut, M: MemorySpace, K: ViewKind> TensorBase<S, M, K> {
    /// Return a mutable pointer to the first element of the view's region.
    pub fn data_mut_ptr(&mut self) -> *mut S::Elem {
        self.data.as_mut_ptr()
    }

    /// Return a mutable view of this view's region.
    pub fn view_mut(&mut self) -> TensorBase<ViewMutData<'_, S::Elem>, M, K> {
        TensorBase {
            data: self.data.view_mut(),
            space: self.space.clone(),
            offset: self.offset,
            layout_kind: self.layout_kind,
            rank: self.rank,
            _kind: PhantomData,
        }
    }

    /// Mutable variant of [`as_plain`](Self::as_plain).
    pub fn as_plain_mut(&mut self) -> TensorBase<ViewMutData<'_, S::Elem>, M, Plain> {
        let offset = self.assigned_offset();
        TensorBase {
            data: self.data.view_mut(),
            space: self.space.clone(),
            offset,
            layout_kind: self.layout_kind,
            rank: self.rank,
            _kind: PhantomData,
        }
    }

    /// Mutable variant of [`subview`](Self::subview).
    ///
    /// Panics if the args are invalid for the view's shape.
    pub fn subview_mut<A: IntoSliceArgs>(
        &mut self,
        args: A,
    ) -> TensorBase<ViewMutData<'_, S::Elem>, M, K> {
        match self.try_subview_mut(args) {
            Ok(view) => view,
            Err(err) => panic!("invalid subview: {}", err),
        }
    }

    /// Fallible variant of [`subview_mut`](Self::subview_mut).
    pub fn try_subview_mut<A: IntoSliceArgs>(
        &mut self,
        args: A,
    ) -> Result<TensorBase<ViewMutData<'_, S::Elem>, M, K>, SliceError> {
        let (offset, base, rank) = self.subview_offset(args.into_slice_args().as_ref())?;
        Ok(TensorBase {
            data: self.data.slice_mut(base..base + offset.span()),
            space: self.space.clone(),
            offset,
            layout_kind: LayoutKind::Strided,
            rank,
            _kind: PhantomData,
        })
    }

    /// Mutable reference to the scalar at a spatial index and derivative
    /// component.
    ///
    /// Panics if the index or component is out of bounds.
    pub fn at_mut(&mut self, index: &[usize], component: usize) -> &mut S::Elem {
        let offset = self.element_offset(index, component);
        // Safety: `element_offset` bounds-checked the index; mutable views
        // reject internally-overlapping layouts at construction, so the
        // offset is not aliased.
        unsafe { self.data.get_unchecked_mut(offset) }
    }

    /// Set component 0 of every logical element to `value` and every other
    /// derivative component to the default value.
    pub fn fill(&mut self, value: S::Elem)
    where
        S::Elem: Clone + Default,
    {
        self.fill_with(|component| {
            if component == 0 {
                value.clone()
            } else {
                S::Elem::default()
            }
        });
    }

    /// Set every logical element to the given component vector.
    ///
    /// Panics if `components.len() != self.grad_size()`.
    pub fn fill_components(&mut self, components: &[S::Elem])
    where
        S::Elem: Clone,
    {
        assert!(
            components.len() == self.offset.grad_size(),
            "component count does not match derivative extent"
        );
        self.fill_with(|component| components[component].clone());
    }

    fn fill_with<F: Fn(usize) -> S::Elem>(&mut self, f: F) {
        let mut spatial = [0; GRAD_SLOT];
        spatial.copy_from_slice(&self.offset.dims()[..GRAD_SLOT]);

        for index in SpatialIndices::new(spatial) {
            let mut full = [0; SLOTS];
            full[..GRAD_SLOT].copy_from_slice(&index);
            for component in 0..self.offset.grad_size() {
                full[GRAD_SLOT] = component;
                let offset = self.offset.offset(full);
                // Safety: the index iterator stays within the descriptor's
                // extents, which the storage covers, and mutable views
                // reject internally-overlapping layouts at construction.
                unsafe {
                    *self.data.get_unchecked_mut(offset) = f(component);
                }
            }
        }
    }
}
