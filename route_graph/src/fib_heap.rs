//! A textbook Fibonacci heap (Cormen, Leiserson, Rivest & Stein), giving
//! the A* frontier amortized O(1) `decrease_key` — something a
//! `BinaryHeap` cannot offer without a linear workaround. Nodes live in an
//! arena; a `Handle` is a stable index into it, valid until that node is
//! popped.

use crate::errors::{GraphError, GraphResult};

/// Degree bound: `log_phi(u32::MAX) ~= 45`, where `phi` is the golden
/// ratio. No node in an n-node Fibonacci heap has degree above this for any
/// `n` that fits in a `u32` priority-queue size, so the consolidation
/// buffer is a fixed-size array of this length rather than a `Vec`.
const MAX_DEGREE: usize = 46;

/// A stable handle to a node in a `FibonacciHeap`, returned by `push` and
/// consumed by `decrease_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug, Clone)]
struct FibNode<T> {
    key: f64,
    payload: Option<T>,
    parent: Option<usize>,
    child: Option<usize>,
    left: usize,
    right: usize,
    degree: usize,
    mark: bool,
}

/// A Fibonacci heap keyed by `f64`, smallest key first.
#[derive(Debug, Clone)]
pub struct FibonacciHeap<T> {
    nodes: Vec<FibNode<T>>,
    min: Option<usize>,
    len: usize,
}

impl<T> Default for FibonacciHeap<T> {
    fn default() -> Self {
        FibonacciHeap::new()
    }
}

impl<T> FibonacciHeap<T> {
    pub fn new() -> Self {
        FibonacciHeap {
            nodes: Vec::new(),
            min: None,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Inserts `payload` with priority `key`, returning a handle usable
    /// with `decrease_key`.
    pub fn push(&mut self, payload: T, key: f64) -> Handle {
        let index = self.nodes.len();
        self.nodes.push(FibNode {
            key,
            payload: Some(payload),
            parent: None,
            child: None,
            left: index,
            right: index,
            degree: 0,
            mark: false,
        });
        self.splice_into_root_list(index);
        match self.min {
            None => self.min = Some(index),
            Some(min_index) => {
                if key < self.nodes[min_index].key {
                    self.min = Some(index);
                }
            }
        }
        self.len += 1;
        Handle(index)
    }

    /// The smallest key currently in the heap, without removing it.
    pub fn peek_key(&self) -> Option<f64> {
        self.min.map(|i| self.nodes[i].key)
    }

    /// Removes and returns the `(payload, key)` pair with the smallest key.
    pub fn pop(&mut self) -> Option<(T, f64)> {
        let min_index = self.min?;

        // Promote the min's children to the root list.
        if let Some(child) = self.nodes[min_index].child {
            let mut current = child;
            loop {
                let next = self.nodes[current].right;
                self.nodes[current].parent = None;
                self.splice_into_root_list(current);
                if next == child {
                    break;
                }
                current = next;
            }
        }

        self.remove_from_root_list(min_index);

        let root_after_removal = if self.nodes[min_index].right == min_index {
            None
        } else {
            Some(self.nodes[min_index].right)
        };

        self.len -= 1;
        if self.len == 0 {
            self.min = None;
        } else {
            self.min = root_after_removal;
            self.consolidate();
        }

        let node = &mut self.nodes[min_index];
        node.child = None;
        node.left = min_index;
        node.right = min_index;
        let key = node.key;
        node.payload.take().map(|payload| (payload, key))
    }

    fn consolidate(&mut self) {
        let mut degree_table: [Option<usize>; MAX_DEGREE] = [None; MAX_DEGREE];

        let start = match self.min {
            Some(m) => m,
            None => return,
        };
        let mut roots = Vec::new();
        let mut current = start;
        loop {
            roots.push(current);
            current = self.nodes[current].right;
            if current == start {
                break;
            }
        }

        for root in roots {
            let mut x = root;
            let mut degree = self.nodes[x].degree;
            while let Some(y) = degree_table[degree] {
                let (mut winner, mut loser) = (x, y);
                if self.nodes[loser].key < self.nodes[winner].key {
                    std::mem::swap(&mut winner, &mut loser);
                }
                self.link(loser, winner);
                degree_table[degree] = None;
                x = winner;
                degree = self.nodes[x].degree;
            }
            degree_table[degree] = Some(x);
        }

        self.min = None;
        for slot in degree_table.iter() {
            if let Some(index) = slot {
                match self.min {
                    None => self.min = Some(*index),
                    Some(min_index) => {
                        if self.nodes[*index].key < self.nodes[min_index].key {
                            self.min = Some(*index);
                        }
                    }
                }
            }
        }
    }

    /// Makes `child` a child of `parent`, removing it from the root list.
    fn link(&mut self, child: usize, parent: usize) {
        self.remove_from_root_list(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[child].mark = false;
        match self.nodes[parent].child {
            None => {
                self.nodes[child].left = child;
                self.nodes[child].right = child;
                self.nodes[parent].child = Some(child);
            }
            Some(existing) => {
                self.insert_sibling(existing, child);
            }
        }
        self.nodes[parent].degree += 1;
    }

    fn splice_into_root_list(&mut self, index: usize) {
        match self.min {
            None => {
                self.nodes[index].left = index;
                self.nodes[index].right = index;
            }
            Some(min_index) => self.insert_sibling(min_index, index),
        }
    }

    fn insert_sibling(&mut self, existing: usize, index: usize) {
        let right = self.nodes[existing].right;
        self.nodes[index].left = existing;
        self.nodes[index].right = right;
        self.nodes[existing].right = index;
        self.nodes[right].left = index;
    }

    fn remove_from_root_list(&mut self, index: usize) {
        let left = self.nodes[index].left;
        let right = self.nodes[index].right;
        self.nodes[left].right = right;
        self.nodes[right].left = left;
        if let Some(parent) = self.nodes[index].parent {
            if self.nodes[parent].child == Some(index) {
                self.nodes[parent].child = if right == index { None } else { Some(right) };
            }
        }
    }

    /// Lowers the key of the node behind `handle` to `new_key`. Returns
    /// `IllegalState` if `new_key` is larger than the current key.
    pub fn decrease_key(&mut self, handle: Handle, new_key: f64) -> GraphResult<()> {
        let index = handle.0;
        if new_key > self.nodes[index].key {
            return Err(GraphError::IllegalState(
                "decrease_key given a key larger than the current one".to_string(),
            ));
        }
        self.nodes[index].key = new_key;
        if let Some(parent) = self.nodes[index].parent {
            if new_key < self.nodes[parent].key {
                self.cut(index, parent);
                self.cascading_cut(parent);
            }
        }
        if let Some(min_index) = self.min {
            if new_key < self.nodes[min_index].key {
                self.min = Some(index);
            }
        } else {
            self.min = Some(index);
        }
        Ok(())
    }

    fn cut(&mut self, child: usize, parent: usize) {
        let right = self.nodes[child].right;
        if self.nodes[parent].child == Some(child) {
            self.nodes[parent].child = if right == child { None } else { Some(right) };
        }
        let left = self.nodes[child].left;
        self.nodes[left].right = right;
        self.nodes[right].left = left;
        self.nodes[parent].degree -= 1;

        self.nodes[child].parent = None;
        self.nodes[child].mark = false;
        self.splice_into_root_list(child);
    }

    fn cascading_cut(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent {
            if !self.nodes[node].mark {
                self.nodes[node].mark = true;
            } else {
                self.cut(node, parent);
                self.cascading_cut(parent);
            }
        }
    }

    /// Merges `other` into `self`, consuming it. `O(1)`: splices the two
    /// root lists together.
    pub fn union(&mut self, mut other: FibonacciHeap<T>) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            std::mem::swap(self, &mut other);
            return;
        }
        let offset = self.nodes.len();
        for node in other.nodes.iter_mut() {
            node.left += offset;
            node.right += offset;
            node.parent = node.parent.map(|p| p + offset);
            node.child = node.child.map(|c| c + offset);
        }
        let other_min = other.min.unwrap() + offset;
        self.nodes.append(&mut other.nodes);

        let self_min = self.min.unwrap();
        let self_right = self.nodes[self_min].right;
        let other_left = self.nodes[other_min].left;
        self.nodes[self_min].right = other_min;
        self.nodes[other_min].left = self_min;
        self.nodes[other_left].right = self_right;
        self.nodes[self_right].left = other_left;

        if self.nodes[other_min].key < self.nodes[self_min].key {
            self.min = Some(other_min);
        }
        self.len += other.len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_ascending_keys() {
        let mut heap = FibonacciHeap::new();
        heap.push("c", 3.0);
        heap.push("a", 1.0);
        heap.push("b", 2.0);
        let mut popped = Vec::new();
        while let Some((payload, _)) = heap.pop() {
            popped.push(payload);
        }
        assert_eq!(popped, vec!["a", "b", "c"]);
    }

    #[test]
    fn decrease_key_promotes_a_node() {
        let mut heap = FibonacciHeap::new();
        let handle_a = heap.push("a", 10.0);
        heap.push("b", 5.0);
        heap.decrease_key(handle_a, 1.0).unwrap();
        assert_eq!(heap.pop().map(|(p, _)| p), Some("a"));
    }

    #[test]
    fn decrease_key_rejects_an_increase() {
        let mut heap = FibonacciHeap::new();
        let handle = heap.push("a", 1.0);
        assert!(heap.decrease_key(handle, 5.0).is_err());
    }

    #[test]
    fn union_merges_two_heaps() {
        let mut a = FibonacciHeap::new();
        a.push("a1", 3.0);
        a.push("a2", 4.0);
        let mut b = FibonacciHeap::new();
        b.push("b1", 1.0);
        b.push("b2", 2.0);
        a.union(b);
        assert_eq!(a.len(), 4);
        let mut out = Vec::new();
        while let Some((p, _)) = a.pop() {
            out.push(p);
        }
        assert_eq!(out, vec!["b1", "b2", "a1", "a2"]);
    }

    #[test]
    fn survives_many_pushes_and_pops_in_order() {
        let mut heap = FibonacciHeap::new();
        for i in (0..200).rev() {
            heap.push(i, i as f64);
        }
        let mut out = Vec::new();
        while let Some((p, _)) = heap.pop() {
            out.push(p);
        }
        assert_eq!(out, (0..200).collect::<Vec<_>>());
    }
}
