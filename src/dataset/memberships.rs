use std::collections::TryReserveError;

use ndarray::{Array1, ArrayBase, Data, Ix1};

/// Marker for a slot no block has written yet
const UNASSIGNED: usize = usize::MAX;

/// Global cluster assignment of every observation of a dataset.
///
/// Slots start out unassigned and are filled block by block. Writes are bounds checked against
/// the block's offset so two blocks can never overlap, and [`Memberships::finish`] refuses to hand
/// out the assignment while any slot is still unassigned.
#[derive(Clone, Debug, PartialEq)]
pub struct Memberships {
    slots: Vec<usize>,
}

impl Memberships {
    /// Allocates `n_objs` unassigned slots, reporting allocation failure instead of aborting.
    pub fn unassigned(n_objs: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(n_objs)?;
        slots.resize(n_objs, UNASSIGNED);
        Ok(Memberships { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copies the memberships of a block starting at global index `offset`.
    ///
    /// # Panics
    ///
    /// If the block does not fit inside the dataset.
    pub fn write_block(&mut self, offset: usize, block: &ArrayBase<impl Data<Elem = usize>, Ix1>) {
        let end = offset + block.len();
        assert!(
            end <= self.slots.len(),
            "block [{}, {}) exceeds the {} observations of the dataset",
            offset,
            end,
            self.slots.len()
        );
        self.slots[offset..end]
            .iter_mut()
            .zip(block.iter())
            .for_each(|(slot, &m)| *slot = m);
    }

    /// Membership of observation `index`, `None` while unassigned
    pub fn get(&self, index: usize) -> Option<usize> {
        match self.slots.get(index) {
            Some(&UNASSIGNED) | None => None,
            Some(&m) => Some(m),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.slots
            .iter()
            .map(|&m| if m == UNASSIGNED { None } else { Some(m) })
    }

    /// Index of the first slot nobody wrote to
    pub fn first_unassigned(&self) -> Option<usize> {
        self.slots.iter().position(|&m| m == UNASSIGNED)
    }

    /// Converts into a plain membership array once every slot has been assigned.
    ///
    /// On failure the index of the first unassigned observation is returned.
    pub fn finish(self) -> Result<Array1<usize>, usize> {
        match self.first_unassigned() {
            Some(index) => Err(index),
            None => Ok(Array1::from(self.slots)),
        }
    }
}
