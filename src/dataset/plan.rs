#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// How a dataset of `n_objs` observations is cut into blocks.
///
/// The nominal block size is `n_objs / split`. Blocks are emitted at the nominal size for as long
/// as another full-size block remains behind the current one; the final block then takes whatever
/// is left, which can be smaller (or, when `split` does not divide `n_objs`, a short tail after
/// `split` full blocks).
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPlan {
    n_objs: usize,
    block_size: usize,
}

/// Position of one block inside the dataset
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSpan {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
    pub is_final: bool,
}

impl BlockPlan {
    /// Returns `None` when the split would produce empty blocks (`split == 0` or
    /// `split > n_objs`).
    pub fn new(n_objs: usize, split: usize) -> Option<Self> {
        if split == 0 || split > n_objs {
            return None;
        }
        Some(BlockPlan {
            n_objs,
            block_size: n_objs / split,
        })
    }

    pub fn n_objs(&self) -> usize {
        self.n_objs
    }

    /// Nominal size of every block but the last
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks, final one included
    pub fn n_blocks(&self) -> usize {
        self.spans().count()
    }

    pub fn spans(&self) -> Spans {
        Spans {
            plan: *self,
            index: 0,
            done: false,
        }
    }
}

/// Iterator over the [`BlockSpan`]s of a [`BlockPlan`], in file order
#[derive(Clone, Debug)]
pub struct Spans {
    plan: BlockPlan,
    index: usize,
    done: bool,
}

impl Iterator for Spans {
    type Item = BlockSpan;

    fn next(&mut self) -> Option<BlockSpan> {
        if self.done {
            return None;
        }
        let BlockPlan { n_objs, block_size } = self.plan;
        let offset = self.index * block_size;
        let full = offset + block_size < n_objs;
        let span = BlockSpan {
            index: self.index,
            offset,
            len: if full { block_size } else { n_objs - offset },
            is_final: !full,
        };
        self.done = !full;
        self.index += 1;
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(n_objs: usize, split: usize) -> Vec<usize> {
        BlockPlan::new(n_objs, split)
            .unwrap()
            .spans()
            .map(|s| s.len)
            .collect()
    }

    #[test]
    fn single_block_covers_everything() {
        assert_eq!(sizes(10, 1), vec![10]);
    }

    #[test]
    fn even_split() {
        assert_eq!(sizes(10, 2), vec![5, 5]);
        assert_eq!(sizes(12, 4), vec![3, 3, 3, 3]);
    }

    #[test]
    fn remainder_goes_to_an_extra_tail() {
        // 10 / 3 = 3, three full blocks leave one observation behind
        assert_eq!(sizes(10, 3), vec![3, 3, 3, 1]);
        assert_eq!(sizes(11, 2), vec![5, 5, 1]);
    }

    #[test]
    fn block_sizes_sum_to_the_dataset() {
        for n_objs in 1..60 {
            for split in 1..=n_objs {
                let plan = BlockPlan::new(n_objs, split).unwrap();
                let spans: Vec<_> = plan.spans().collect();
                assert_eq!(spans.iter().map(|s| s.len).sum::<usize>(), n_objs);
                assert!(spans.last().unwrap().is_final);
                assert_eq!(spans.iter().filter(|s| s.is_final).count(), 1);
                for pair in spans.windows(2) {
                    assert_eq!(pair[0].offset + pair[0].len, pair[1].offset);
                }
            }
        }
    }

    #[test]
    fn degenerate_splits_are_rejected() {
        assert!(BlockPlan::new(10, 0).is_none());
        assert!(BlockPlan::new(10, 11).is_none());
        assert_eq!(BlockPlan::new(10, 10).unwrap().n_blocks(), 10);
    }
}
