//! Disjoint-set forest over integer-indexed nodes.

/// Union-find with path halving.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self { parent: Vec::new() }
    }

    /// Add a singleton set and return its node.
    pub fn add(&mut self) -> usize {
        let n = self.parent.len();
        self.parent.push(n);
        n
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`. The smaller root survives, so node 0
    /// stays the representative of its set.
    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}
