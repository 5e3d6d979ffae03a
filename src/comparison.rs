// ⚖️ Pairwise Comparison - Random head-to-head votes over a filtered pool

use crate::csv_reader::write_csv;
use crate::lists::LegacySong;
use crate::model::{Song, Tier};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which list a candidate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Standing {
    Main,
    Legacy,
    Unranked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub song: Song,
    pub standing: Standing,
}

/// Pool filter
#[derive(Debug, Clone, PartialEq)]
pub struct PoolFilter {
    /// Main-list songs must have one of these tiers
    pub tiers: HashSet<Tier>,
    pub include_legacy: bool,
    pub include_unranked: bool,
}

impl Default for PoolFilter {
    fn default() -> Self {
        PoolFilter {
            tiers: Tier::ALL.into_iter().collect(),
            include_legacy: false,
            include_unranked: false,
        }
    }
}

impl PoolFilter {
    /// Legacy and unranked candidates bypass the tier set
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        match candidate.standing {
            Standing::Legacy => self.include_legacy,
            Standing::Unranked => self.include_unranked,
            Standing::Main => candidate.song.tier.is_some_and(|t| self.tiers.contains(&t)),
        }
    }
}

/// Every song the dashboard knows: main list, then legacy, then unranked
pub fn candidates(main: &[&Song], legacy: &[LegacySong], unranked: &[&Song]) -> Vec<Candidate> {
    let main = main.iter().map(|s| Candidate { song: (*s).clone(), standing: Standing::Main });
    let legacy = legacy.iter().map(|l| Candidate { song: l.song.clone(), standing: Standing::Legacy });
    let unranked = unranked.iter().map(|s| Candidate { song: (*s).clone(), standing: Standing::Unranked });
    main.chain(legacy).chain(unranked).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub winner: String,
    pub loser: String,
}

/// ComparisonSession - Current pair plus the vote history, newest first
#[derive(Debug, Clone, Default)]
pub struct ComparisonSession {
    pool: Vec<Candidate>,
    pair: Option<(usize, usize)>,
    votes: Vec<Vote>,
}

impl ComparisonSession {
    pub fn new(candidates: Vec<Candidate>, filter: &PoolFilter) -> Self {
        let pool = candidates.into_iter().filter(|c| filter.accepts(c)).collect();
        ComparisonSession { pool, pair: None, votes: Vec::new() }
    }

    pub fn pool(&self) -> &[Candidate] {
        &self.pool
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn current_pair(&self) -> Option<(&Candidate, &Candidate)> {
        self.pair.map(|(a, b)| (&self.pool[a], &self.pool[b]))
    }

    /// Draw two distinct candidates; none when the pool has fewer than two
    pub fn next_pair<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(&Candidate, &Candidate)> {
        let n = self.pool.len();
        self.pair = if n < 2 {
            None
        } else {
            let first = rng.gen_range(0..n);
            let second = (first + rng.gen_range(1..n)) % n;
            Some((first, second))
        };
        self.current_pair()
    }

    /// Record a vote for one side of the current pair (0 or 1) and draw again
    pub fn record_vote<R: Rng + ?Sized>(&mut self, side: usize, rng: &mut R) -> Option<&Vote> {
        let (a, b) = self.pair?;
        let (winner, loser) = match side {
            0 => (a, b),
            1 => (b, a),
            _ => return None,
        };

        self.votes.insert(
            0,
            Vote {
                winner: self.pool[winner].song.title.clone(),
                loser: self.pool[loser].song.title.clone(),
            },
        );
        self.next_pair(rng);
        self.votes.first()
    }

    /// Vote history as `Winner,Loser` CSV, newest first
    pub fn export_votes_csv(&self) -> String {
        let mut rows = vec![vec!["Winner".to_string(), "Loser".to_string()]];
        rows.extend(self.votes.iter().map(|v| vec![v.winner.clone(), v.loser.clone()]));
        write_csv(&rows)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::parse_csv;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidate(title: &str, tier: Option<Tier>, standing: Standing) -> Candidate {
        let mut song = Song::new(title, "someone");
        song.tier = tier;
        Candidate { song, standing }
    }

    fn pool() -> Vec<Candidate> {
        vec![
            candidate("S Song", Some(Tier::S), Standing::Main),
            candidate("B Song", Some(Tier::B), Standing::Main),
            candidate("Old", None, Standing::Legacy),
            candidate("New", None, Standing::Unranked),
        ]
    }

    #[test]
    fn test_pool_filter() {
        let session = ComparisonSession::new(pool(), &PoolFilter::default());
        assert_eq!(session.pool().len(), 2);

        let filter = PoolFilter {
            tiers: [Tier::S].into_iter().collect(),
            include_legacy: true,
            include_unranked: true,
        };
        let titles: Vec<String> = ComparisonSession::new(pool(), &filter)
            .pool()
            .iter()
            .map(|c| c.song.title.clone())
            .collect();
        assert_eq!(titles, vec!["S Song", "Old", "New"]);
    }

    #[test]
    fn test_pairs_are_distinct() {
        let filter = PoolFilter { include_legacy: true, include_unranked: true, ..Default::default() };
        let mut session = ComparisonSession::new(pool(), &filter);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let (a, b) = session.next_pair(&mut rng).unwrap();
            assert_ne!(a.song.title, b.song.title);
        }
    }

    #[test]
    fn test_small_pool_has_no_pair() {
        let filter = PoolFilter { tiers: HashSet::new(), include_legacy: true, ..Default::default() };
        let mut session = ComparisonSession::new(pool(), &filter);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(session.next_pair(&mut rng).is_none());
        assert!(session.record_vote(0, &mut rng).is_none());
    }

    #[test]
    fn test_votes_are_prepended_and_exported() {
        let mut session = ComparisonSession::new(pool(), &PoolFilter::default());
        let mut rng = StdRng::seed_from_u64(3);

        let (a, b) = session.next_pair(&mut rng).map(|(a, b)| (a.song.title.clone(), b.song.title.clone())).unwrap();
        let first = session.record_vote(1, &mut rng).cloned().unwrap();
        assert_eq!(first, Vote { winner: b.clone(), loser: a.clone() });

        session.record_vote(0, &mut rng);
        assert_eq!(session.votes().len(), 2);
        assert_eq!(session.votes()[1], first);

        let rows = parse_csv(&session.export_votes_csv());
        assert_eq!(rows[0], vec!["Winner", "Loser"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![b, a]);
    }
}
