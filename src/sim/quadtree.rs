//! Quadtree over opaque payloads with rectangular bounds
//!
//! Used for the collision broad phase and area-of-effect lookups. The root
//! covers a fixed region chosen at construction; anything inserted outside it
//! is dropped. Entries that straddle a split line stay at the parent.

use super::bounds::Bounds;

/// Reference capacity (entries per node before it splits)
pub const DEFAULT_CAPACITY: usize = 12;
/// Reference maximum depth
pub const DEFAULT_MAX_DEPTH: u32 = 15;

#[derive(Debug, Clone)]
struct Node<T> {
    bounds: Bounds,
    depth: u32,
    entries: Vec<(T, Bounds)>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T: Copy> Node<T> {
    fn new(bounds: Bounds, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn child_index_for(&self, bounds: &Bounds) -> Option<usize> {
        let children = self.children.as_ref()?;
        children.iter().position(|c| c.bounds.contains(bounds))
    }

    fn insert(&mut self, payload: T, bounds: Bounds, capacity: usize, max_depth: u32) {
        if let Some(i) = self.child_index_for(&bounds) {
            if let Some(children) = self.children.as_mut() {
                children[i].insert(payload, bounds, capacity, max_depth);
                return;
            }
        }

        self.entries.push((payload, bounds));

        if self.children.is_none() && self.entries.len() > capacity && self.depth < max_depth {
            self.subdivide(capacity, max_depth);
        }
    }

    fn subdivide(&mut self, capacity: usize, max_depth: u32) {
        let [nw, ne, sw, se] = self.bounds.quadrants();
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            Node::new(nw, depth),
            Node::new(ne, depth),
            Node::new(sw, depth),
            Node::new(se, depth),
        ]));

        // Push down whatever fits cleanly in a child; straddlers stay here
        let entries = std::mem::take(&mut self.entries);
        for (payload, bounds) in entries {
            match self.child_index_for(&bounds) {
                Some(i) => {
                    if let Some(children) = self.children.as_mut() {
                        children[i].insert(payload, bounds, capacity, max_depth);
                    }
                }
                None => self.entries.push((payload, bounds)),
            }
        }
    }

    fn query(&self, area: &Bounds, out: &mut Vec<T>) {
        out.extend(
            self.entries
                .iter()
                .filter(|(_, b)| b.intersects(area))
                .map(|(payload, _)| *payload),
        );

        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.intersects(area) {
                    child.query(area, out);
                }
            }
        }
    }

    fn count(&self) -> usize {
        self.entries.len()
            + self
                .children
                .as_ref()
                .map(|c| c.iter().map(Node::count).sum())
                .unwrap_or(0)
    }

    fn max_depth_reached(&self) -> u32 {
        self.children
            .as_ref()
            .map(|c| c.iter().map(Node::max_depth_reached).max().unwrap_or(self.depth))
            .unwrap_or(self.depth)
    }
}

/// Region quadtree. Not thread-safe by itself; the world owns and mutates it
/// from the simulation thread only.
#[derive(Debug, Clone)]
pub struct Quadtree<T> {
    root: Node<T>,
    capacity: usize,
    max_depth: u32,
}

impl<T: Copy> Quadtree<T> {
    pub fn new(bounds: Bounds, capacity: usize, max_depth: u32) -> Self {
        Self {
            root: Node::new(bounds, 0),
            capacity: capacity.max(1),
            max_depth,
        }
    }

    /// Root region
    pub fn bounds(&self) -> Bounds {
        self.root.bounds
    }

    /// Record `payload` at the deepest node fully containing `bounds`.
    ///
    /// Returns false (and stores nothing) if `bounds` is not inside the root.
    pub fn insert(&mut self, payload: T, bounds: Bounds) -> bool {
        if !self.root.bounds.contains(&bounds) {
            log::trace!("quadtree: dropping entry outside root {:?}", bounds);
            return false;
        }
        self.root.insert(payload, bounds, self.capacity, self.max_depth);
        true
    }

    /// Every payload whose stored bounds intersect `area`
    pub fn query(&self, area: &Bounds) -> Vec<T> {
        let mut out = Vec::new();
        self.query_into(area, &mut out);
        out
    }

    /// Same as [`Quadtree::query`] but appends into a caller-owned buffer
    pub fn query_into(&self, area: &Bounds, out: &mut Vec<T>) {
        if self.root.bounds.intersects(area) {
            self.root.query(area, out);
        }
    }

    /// Drop all entries and children
    pub fn clear(&mut self) {
        self.root = Node::new(self.root.bounds, 0);
    }

    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest level currently subdivided to (0 = only the root)
    pub fn depth(&self) -> u32 {
        self.root.max_depth_reached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sorted(mut v: Vec<char>) -> Vec<char> {
        v.sort();
        v
    }

    #[test]
    fn test_subdivision_query() {
        let mut qt = Quadtree::new(Bounds::new(-100.0, -100.0, 200.0, 200.0), 2, 5);
        assert!(qt.insert('A', Bounds::new(-50.0, -50.0, 10.0, 10.0)));
        assert!(qt.insert('B', Bounds::new(50.0, 50.0, 10.0, 10.0)));
        assert!(qt.insert('C', Bounds::new(-40.0, -40.0, 10.0, 10.0)));
        assert_eq!(qt.depth(), 1);

        let found = qt.query(&Bounds::new(-60.0, -60.0, 40.0, 40.0));
        assert_eq!(sorted(found), vec!['A', 'C']);

        let found = qt.query(&Bounds::new(40.0, 40.0, 20.0, 20.0));
        assert_eq!(found, vec!['B']);
    }

    #[test]
    fn test_straddling_entry_stays_at_parent() {
        let mut qt = Quadtree::new(Bounds::new(0.0, 0.0, 100.0, 100.0), 1, 4);
        qt.insert(1, Bounds::new(45.0, 45.0, 10.0, 10.0)); // crosses both split lines
        qt.insert(2, Bounds::new(10.0, 10.0, 5.0, 5.0));
        assert_eq!(qt.len(), 2);
        assert_eq!(qt.query(&Bounds::new(90.0, 90.0, 5.0, 5.0)), Vec::<i32>::new());
        assert_eq!(qt.query(&Bounds::new(52.0, 52.0, 1.0, 1.0)), vec![1]);
    }

    #[test]
    fn test_outside_root_is_dropped() {
        let mut qt = Quadtree::new(Bounds::new(0.0, 0.0, 10.0, 10.0), 4, 4);
        assert!(!qt.insert(7, Bounds::new(20.0, 20.0, 1.0, 1.0)));
        assert!(qt.is_empty());
        assert!(qt.query(&Bounds::new(-50.0, -50.0, 5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_clear_empties_tree() {
        let mut qt = Quadtree::new(Bounds::new(0.0, 0.0, 100.0, 100.0), 1, 6);
        for i in 0..20 {
            qt.insert(i, Bounds::new(i as f32 * 4.0, i as f32 * 4.0, 2.0, 2.0));
        }
        assert!(qt.depth() > 0);
        qt.clear();
        assert!(qt.is_empty());
        assert_eq!(qt.depth(), 0);
        assert!(qt.query(&Bounds::new(0.0, 0.0, 100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_depth_limit_respected() {
        let mut qt = Quadtree::new(Bounds::new(0.0, 0.0, 64.0, 64.0), 1, 3);
        for i in 0..50 {
            qt.insert(i, Bounds::new(0.1, 0.1, 0.5, 0.5));
        }
        assert_eq!(qt.depth(), 3);
        assert_eq!(qt.query(&Bounds::new(0.0, 0.0, 1.0, 1.0)).len(), 50);
    }

    proptest! {
        #[test]
        fn prop_no_false_negatives(
            boxes in prop::collection::vec((-95.0f32..90.0, -95.0f32..90.0, 0.5f32..5.0, 0.5f32..5.0), 1..80),
            q in (-100.0f32..80.0, -100.0f32..80.0, 1.0f32..40.0, 1.0f32..40.0),
        ) {
            let mut qt = Quadtree::new(Bounds::new(-100.0, -100.0, 200.0, 200.0), 3, 8);
            for (i, &(x, y, w, h)) in boxes.iter().enumerate() {
                qt.insert(i, Bounds::new(x, y, w, h));
            }
            let area = Bounds::new(q.0, q.1, q.2, q.3);
            let found = qt.query(&area);
            for (i, &(x, y, w, h)) in boxes.iter().enumerate() {
                if Bounds::new(x, y, w, h).intersects(&area) {
                    prop_assert!(found.contains(&i));
                }
            }
        }
    }
}
