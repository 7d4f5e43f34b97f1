//! Clustering of pairwise results into duplicate groups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{DuplicateGroup, DuplicatePairResult, GroupId, ImageId, ResultKind};

/// How pairs are merged into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupingStrategy {
    /// Disjoint-set merge; full transitive closure regardless of input order
    #[default]
    UnionFind,

    /// A pair joins the first existing group that holds either of its images.
    /// Depending on input order this can under-merge, and an image may then
    /// appear in more than one group.
    FirstMatch,
}

/// Builds [`DuplicateGroup`]s from a flat result list
#[derive(Debug, Clone, Default)]
pub struct GroupBuilder {
    strategy: GroupingStrategy,
}

impl GroupBuilder {
    pub fn new(strategy: GroupingStrategy) -> Self {
        Self { strategy }
    }

    /// Group duplicate pairs; defect results are ignored
    pub fn build_groups(&self, results: &[DuplicatePairResult]) -> Vec<DuplicateGroup> {
        let pairs = results
            .iter()
            .filter(|result| result.kind == ResultKind::DuplicatePair);

        let groups = match self.strategy {
            GroupingStrategy::UnionFind => union_find_groups(pairs),
            GroupingStrategy::FirstMatch => first_match_groups(pairs),
        };
        log::debug!(
            "Built {} groups from {} results ({:?})",
            groups.len(),
            results.len(),
            self.strategy
        );
        groups
    }
}

fn first_match_groups<'a>(
    pairs: impl Iterator<Item = &'a DuplicatePairResult>,
) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for pair in pairs {
        match groups
            .iter_mut()
            .find(|group| group.contains(pair.first) || group.contains(pair.second))
        {
            Some(group) => group.add_result(pair),
            None => {
                let mut group = DuplicateGroup::new(GroupId(groups.len()));
                group.add_result(pair);
                groups.push(group);
            }
        }
    }
    groups
}

fn union_find_groups<'a>(
    pairs: impl Iterator<Item = &'a DuplicatePairResult> + Clone,
) -> Vec<DuplicateGroup> {
    let mut sets = DisjointSet::default();
    for pair in pairs.clone() {
        sets.union(pair.first, pair.second);
    }

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for pair in pairs {
        let root = sets.find_image(pair.first);
        let index = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(DuplicateGroup::new(GroupId(groups.len())));
            groups.len() - 1
        });
        groups[index].add_result(pair);
    }
    groups
}

/// Disjoint-set forest over image handles with path compression
#[derive(Debug, Default)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    slot: HashMap<ImageId, usize>,
}

impl DisjointSet {
    fn slot(&mut self, image: ImageId) -> usize {
        if let Some(slot) = self.slot.get(&image) {
            return *slot;
        }
        let slot = self.parent.len();
        self.parent.push(slot);
        self.rank.push(0);
        self.slot.insert(image, slot);
        slot
    }

    fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn find_image(&mut self, image: ImageId) -> usize {
        let slot = self.slot(image);
        self.find(slot)
    }

    fn union(&mut self, a: ImageId, b: ImageId) {
        let root_a = self.find_image(a);
        let root_b = self.find_image(b);
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ImageStore, ResultList};
    use crate::types::{ImageRecord, TransformType};
    use std::collections::HashSet;

    fn images(store: &mut ImageStore, names: &[&str]) -> Vec<ImageId> {
        names
            .iter()
            .map(|name| store.intern(ImageRecord::new(*name)))
            .collect()
    }

    fn results(pairs: &[(ImageId, ImageId)]) -> ResultList {
        let mut list = ResultList::new();
        for (a, b) in pairs {
            list.push(*a, *b, 0.0, TransformType::None, ResultKind::DuplicatePair);
        }
        list
    }

    fn membership(groups: &[DuplicateGroup]) -> Vec<HashSet<ImageId>> {
        groups
            .iter()
            .map(|group| group.files.iter().copied().collect())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let builder = GroupBuilder::default();
        assert!(builder.build_groups(&[]).is_empty());
    }

    #[test]
    fn test_union_find_merges_out_of_order_links() {
        let mut store = ImageStore::new();
        let ids = images(&mut store, &["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let list = results(&[(a, b), (c, d), (b, c)]);

        let groups = GroupBuilder::new(GroupingStrategy::UnionFind).build_groups(list.as_slice());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files, vec![a, b, c, d]);
        assert_eq!(groups[0].results.len(), 3);
    }

    #[test]
    fn test_first_match_under_merges() {
        let mut store = ImageStore::new();
        let ids = images(&mut store, &["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let list = results(&[(a, b), (c, d), (b, c)]);

        let groups = GroupBuilder::new(GroupingStrategy::FirstMatch).build_groups(list.as_slice());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].files, vec![a, b, c]);
        assert_eq!(groups[1].files, vec![c, d]);
    }

    #[test]
    fn test_grouping_is_idempotent_and_disjoint() {
        let mut store = ImageStore::new();
        let ids = images(&mut store, &["a", "b", "c", "d", "e", "f", "g"]);
        let list = results(&[
            (ids[0], ids[1]),
            (ids[2], ids[3]),
            (ids[4], ids[5]),
            (ids[3], ids[4]),
            (ids[6], ids[0]),
        ]);

        let builder = GroupBuilder::default();
        let first = builder.build_groups(list.as_slice());
        let second = builder.build_groups(list.as_slice());
        assert_eq!(membership(&first), membership(&second));

        for (i, g1) in first.iter().enumerate() {
            for g2 in first.iter().skip(i + 1) {
                assert!(g1.files.iter().all(|image| !g2.contains(*image)));
            }
        }

        // Every member participates in a result of its group
        for group in &first {
            for image in &group.files {
                assert!(group
                    .results
                    .iter()
                    .any(|id| list.get(*id).unwrap().involves(*image)));
            }
        }
    }

    #[test]
    fn test_defects_are_ignored() {
        let mut store = ImageStore::new();
        let ids = images(&mut store, &["a", "b"]);
        let mut list = ResultList::new();
        list.push(ids[0], ids[0], 0.0, TransformType::None, ResultKind::Defect);
        list.push(ids[0], ids[1], 1.5, TransformType::None, ResultKind::DuplicatePair);

        let groups = GroupBuilder::default().build_groups(list.as_slice());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].results.len(), 1);
    }
}
