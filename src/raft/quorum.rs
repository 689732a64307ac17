/// Majority rule over the whole cluster, candidate included.
///
/// Integer division on purpose: a cluster of four needs only two votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quorum {
    cluster_size: usize,
}

impl Quorum {
    pub fn new(cluster_size: usize) -> Self {
        Self { cluster_size }
    }

    pub fn cluster_size(&self) -> usize {
        self.cluster_size
    }

    pub fn votes_needed(&self) -> u64 {
        (self.cluster_size as u64 + 1) / 2
    }

    pub fn is_reached(&self, votes: u64) -> bool {
        votes >= self.votes_needed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_nodes_need_three_votes() {
        let q = Quorum::new(5);
        assert!(!q.is_reached(2));
        assert!(q.is_reached(3));
        assert!(q.is_reached(5));
    }

    #[test]
    fn four_nodes_need_two_votes() {
        let q = Quorum::new(4);
        assert_eq!(q.votes_needed(), 2);
        assert!(!q.is_reached(1));
        assert!(q.is_reached(2));
    }

    #[test]
    fn matches_integer_division_formula() {
        for n in 1..=12usize {
            let q = Quorum::new(n);
            for v in 0..=n as u64 {
                assert_eq!(q.is_reached(v), v >= (n as u64 + 1) / 2, "n={n} v={v}");
            }
        }
    }

    #[test]
    fn single_node_is_its_own_majority() {
        assert!(Quorum::new(1).is_reached(1));
    }
}
