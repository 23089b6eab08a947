//! Huffman decode trees.
//!
//! A channel transmits only its leaf-weight table; the tree is rebuilt with the
//! greedy merge below. Both the encoder and this decoder must pick the same
//! children at every step, so the selection order is part of the format:
//!
//! - the lightest parentless node becomes the left child, the next lightest
//!   the right child;
//! - weights are compared with plain `<` on `f32`;
//! - equal weights are resolved in favour of the node created first.
//!
//! Nodes live in a flat arena and refer to each other by index. Leaves occupy
//! the first `leaf_count` slots in table order; internal nodes follow in
//! creation order, so the root is always the last node.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use anyhow::{Result, bail};
use log::trace;

use crate::structs::channel::Leaf;
use crate::utils::errors::ChannelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { value: u8 },
    Internal { left: usize, right: usize },
}

/// One arena slot of a [`HuffmanTree`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuffmanNode {
    /// Transmitted frequency for leaves, sum of both children otherwise.
    pub weight: f32,
    pub parent: Option<usize>,
    pub kind: NodeKind,
}

impl HuffmanNode {
    pub fn value(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Leaf { value } => Some(value),
            NodeKind::Internal { .. } => None,
        }
    }
}

/// Heap key. Ordered by weight, then by arena index.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    weight: f32,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Weights are finite, so partial_cmp always answers.
        self.weight
            .partial_cmp(&other.weight)
            .unwrap_or(Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

#[derive(Debug, Clone, PartialEq)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    root: usize,
    leaf_count: usize,
}

impl HuffmanTree {
    /// Rebuilds the decode tree for a leaf-weight table.
    ///
    /// Fails with [`ChannelError::ZeroLeafCount`] for an empty table and
    /// [`ChannelError::InvalidWeight`] for a weight that is NaN or infinite.
    pub fn build(leaves: &[Leaf]) -> Result<Self> {
        if leaves.is_empty() {
            bail!(ChannelError::ZeroLeafCount);
        }

        let mut nodes = Vec::with_capacity(leaves.len() * 2);
        let mut parentless = BinaryHeap::with_capacity(leaves.len());

        for (index, leaf) in leaves.iter().enumerate() {
            if !leaf.weight.is_finite() {
                bail!(ChannelError::InvalidWeight {
                    index,
                    bits: leaf.weight.to_bits(),
                });
            }

            nodes.push(HuffmanNode {
                weight: leaf.weight,
                parent: None,
                kind: NodeKind::Leaf {
                    value: leaf.value(),
                },
            });
            parentless.push(Reverse(Candidate {
                weight: leaf.weight,
                index,
            }));
        }

        let mut root = 0;
        while let Some(Reverse(left)) = parentless.pop() {
            let Some(Reverse(right)) = parentless.pop() else {
                root = left.index;
                break;
            };

            let index = nodes.len();
            let weight = nodes[left.index].weight + nodes[right.index].weight;

            nodes[left.index].parent = Some(index);
            nodes[right.index].parent = Some(index);
            nodes.push(HuffmanNode {
                weight,
                parent: None,
                kind: NodeKind::Internal {
                    left: left.index,
                    right: right.index,
                },
            });
            parentless.push(Reverse(Candidate { weight, index }));
        }

        let tree = Self {
            nodes,
            root,
            leaf_count: leaves.len(),
        };

        trace!("Huffman tree:\n{tree}");

        Ok(tree)
    }

    #[inline(always)]
    pub fn root(&self) -> usize {
        self.root
    }

    pub fn nodes(&self) -> &[HuffmanNode] {
        &self.nodes
    }

    #[inline(always)]
    pub fn node(&self, index: usize) -> &HuffmanNode {
        &self.nodes[index]
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn internal_count(&self) -> usize {
        self.nodes.len() - self.leaf_count
    }

    /// Moves one bit down from `index`: `false` goes left, `true` right.
    ///
    /// A leaf has nowhere to go and yields itself, which is what makes a
    /// single-leaf tree emit its symbol once per bit.
    #[inline(always)]
    pub fn step(&self, index: usize, bit: bool) -> usize {
        match self.nodes[index].kind {
            NodeKind::Internal { left, right } => {
                if bit {
                    right
                } else {
                    left
                }
            }
            NodeKind::Leaf { .. } => index,
        }
    }

    /// Number of edges between `index` and the root.
    pub fn depth(&self, mut index: usize) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.nodes[index].parent {
            index = parent;
            depth += 1;
        }
        depth
    }

    /// Depth of every node, indexed like [`nodes`](Self::nodes).
    ///
    /// A parent is always created after its children, so a single pass from
    /// the last node down sees each parent before its children.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0usize; self.nodes.len()];
        for index in (0..self.nodes.len()).rev() {
            if let Some(parent) = self.nodes[index].parent {
                depths[index] = depths[parent] + 1;
            }
        }
        depths
    }

    /// Length of the longest code.
    pub fn max_depth(&self) -> usize {
        self.depths()[..self.leaf_count]
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Bit path from the root to leaf `leaf`, recovered through the parent
    /// links. Returns `None` if `leaf` is not a leaf index.
    pub fn code(&self, leaf: usize) -> Option<Vec<bool>> {
        if leaf >= self.leaf_count {
            return None;
        }

        let mut bits = Vec::new();
        let mut index = leaf;
        while let Some(parent) = self.nodes[index].parent {
            if let NodeKind::Internal { right, .. } = self.nodes[parent].kind {
                bits.push(right == index);
            }
            index = parent;
        }
        bits.reverse();

        Some(bits)
    }
}

impl fmt::Display for HuffmanTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Skewed trees can be as deep as they are wide; walk without recursion.
        let mut pending = vec![(self.root, 0usize)];

        while let Some((index, indent)) = pending.pop() {
            let node = &self.nodes[index];
            write!(
                f,
                "{:indent$}-id: {index}, weight: {:.6}",
                "", node.weight
            )?;
            match node.kind {
                NodeKind::Leaf { value } => writeln!(f, " value: {value:02x}")?,
                NodeKind::Internal { left, right } => {
                    writeln!(f)?;
                    pending.push((right, indent + 2));
                    pending.push((left, indent + 2));
                }
            }
        }

        Ok(())
    }
}
