//! Plurality voting shared by k-NN, forests and tree leaves.

/// Vote counts kept in the order each candidate was first seen.
#[derive(Clone, Debug)]
pub struct VoteTally<K> {
    counts: Vec<(K, usize)>,
}

impl<K: PartialEq> VoteTally<K> {
    pub fn new() -> Self {
        Self { counts: Vec::new() }
    }

    pub fn add(&mut self, candidate: K) {
        match self.counts.iter_mut().find(|(k, _)| *k == candidate) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((candidate, 1)),
        }
    }

    /// Candidate with the most votes. Ties go to whichever entered the tally
    /// first.
    pub fn winner(&self) -> Option<&K> {
        self.winner_index().map(|i| &self.counts[i].0)
    }

    fn winner_index(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, (_, count)) in self.counts.iter().enumerate() {
            if best.is_none_or(|b| *count > self.counts[b].1) {
                best = Some(i);
            }
        }
        best
    }

    /// Consume the tally and return the winner.
    pub fn into_winner(mut self) -> Option<K> {
        let index = self.winner_index()?;
        Some(self.counts.swap_remove(index).0)
    }

    pub fn counts(&self) -> &[(K, usize)] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }
}

impl<K: PartialEq> Default for VoteTally<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq> FromIterator<K> for VoteTally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Self::new();
        for candidate in iter {
            tally.add(candidate);
        }
        tally
    }
}

/// Plurality winner of `votes`, or `None` when there are no votes.
pub fn majority_vote<K, I>(votes: I) -> Option<K>
where
    K: PartialEq,
    I: IntoIterator<Item = K>,
{
    votes.into_iter().collect::<VoteTally<K>>().into_winner()
}
