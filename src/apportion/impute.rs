use ahash::AHashMap;
use rayon::prelude::*;

use crate::{layer::PrecinctLayer, types::{Population, VoterTally}};
use super::engine::{PrecinctBlocks, VoteShare};

/// Substitute shares for precincts that overlap blocks but have no tally.
/// Voters and overlap-weighted populations of every touching precinct with a tally
/// are pooled before dividing, so large neighbors weigh more than small ones.
pub(super) fn substitute_shares(precincts: &PrecinctLayer, gathered: &[PrecinctBlocks]) -> AHashMap<usize, VoteShare> {
    (0..precincts.len()).into_par_iter()
        .filter(|&p| precincts.data()[p].is_none() && !gathered[p].is_empty())
        .filter_map(|p| {
            let mut voters = VoterTally::default();
            let mut population = Population::default();
            let mut donors = 0;

            for n in precincts.geoms().neighbors(p) {
                // A neighbor that reaches no block has no population to weigh its voters.
                if gathered[n].is_empty() { continue }
                if let Some(tally) = &precincts.data()[n] {
                    voters += tally;
                    population += &gathered[n].total;
                    donors += 1;
                }
            }

            if donors == 0 {
                tracing::warn!(precinct = %precincts.geo_id(p), "no touching precinct has a tally to impute from");
                return None
            }
            tracing::debug!(precinct = %precincts.geo_id(p), donors, "imputed vote share");
            Some((p, VoteShare::from_totals(&voters, &population)))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::{geom::Crs, layer::AreaLayer, types::{GeoId, GeoType, Party, Race}};

    fn rect(x0: f64, x1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![(x: x0, y: 0.0), (x: x1, y: 0.0), (x: x1, y: 1.0), (x: x0, y: 1.0)]])
    }

    fn blocks_with(population: f64) -> PrecinctBlocks {
        let population = Population::from_components(population, 0.0, 0.0, 0.0, 0.0, 0.0);
        PrecinctBlocks { members: vec![(0, population)], total: population }
    }

    #[test]
    fn isolated_missing_precinct_gets_no_share() {
        let mut tally = VoterTally::default();
        tally.set(Race::All, Party::Rep, 10);
        let precincts = AreaLayer::new(GeoType::Precinct, Crs::EqualArea, [
            (GeoId::precinct("A", "1"), rect(0.0, 1.0), None),
            (GeoId::precinct("A", "2"), rect(5.0, 6.0), Some(tally)),
            (GeoId::precinct("A", "3"), rect(6.0, 7.0), None),
        ]).unwrap();
        let gathered = [blocks_with(10.0), blocks_with(20.0), blocks_with(30.0)];

        let shares = substitute_shares(&precincts, &gathered);

        assert!(!shares.contains_key(&0));
        assert_eq!(shares[&2].get(Race::All, Party::Rep), 0.5);
        assert_eq!(shares.len(), 1);
    }
}
