use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::config::{GenomeConfig, NeatConfig};
use super::genome::DefaultGenome;
use super::{GenomeKey, Genomes, SpeciesKey};

#[derive(Debug, Clone)]
pub struct Species {
    pub key: SpeciesKey,
    pub created: usize,
    pub last_improved: usize,
    pub representative: DefaultGenome,
    pub members: Vec<GenomeKey>,
    pub fitness: Option<f64>,
    pub adjusted_fitness: Option<f64>,
    pub fitness_history: Vec<f64>,
}

impl Species {
    pub fn new(key: SpeciesKey, generation: usize, representative: DefaultGenome) -> Self {
        Self {
            key,
            created: generation,
            last_improved: generation,
            representative,
            members: Vec::new(),
            fitness: None,
            adjusted_fitness: None,
            fitness_history: Vec::new(),
        }
    }

    /// Fitness of every evaluated member.
    pub fn member_fitnesses(&self, population: &Genomes) -> Vec<f64> {
        self.members
            .iter()
            .filter_map(|k| population.get(k).and_then(|g| g.fitness))
            .collect()
    }
}

/// Memoizes genome distances for one speciation pass.
pub struct DistanceCache<'a> {
    config: &'a GenomeConfig,
    distances: HashMap<(GenomeKey, GenomeKey), f64>,
}

impl<'a> DistanceCache<'a> {
    pub fn new(config: &'a GenomeConfig) -> Self {
        Self {
            config,
            distances: HashMap::new(),
        }
    }

    pub fn distance(&mut self, a: &DefaultGenome, b: &DefaultGenome) -> f64 {
        if let Some(d) = self.distances.get(&(a.key, b.key)) {
            return *d;
        }
        let d = a.distance(b, self.config);
        self.distances.insert((a.key, b.key), d);
        self.distances.insert((b.key, a.key), d);
        d
    }
}

/// Partition of the population into species of mutually compatible genomes.
#[derive(Debug, Clone)]
pub struct SpeciesSet {
    pub species: BTreeMap<SpeciesKey, Species>,
    genome_to_species: HashMap<GenomeKey, SpeciesKey>,
    next_key: SpeciesKey,
}

impl Default for SpeciesSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeciesSet {
    pub fn new() -> Self {
        Self {
            species: BTreeMap::new(),
            genome_to_species: HashMap::new(),
            next_key: 1,
        }
    }

    pub fn species_id(&self, genome: GenomeKey) -> Option<SpeciesKey> {
        self.genome_to_species.get(&genome).copied()
    }

    /// Each existing species first claims the genome closest to its old
    /// representative; remaining genomes join the closest species within the
    /// compatibility threshold or found a new one.
    pub fn speciate(&mut self, config: &NeatConfig, population: &Genomes, generation: usize) {
        let threshold = config.species_set.compatibility_threshold;
        let mut distances = DistanceCache::new(&config.genome);
        let mut unspeciated: BTreeSet<GenomeKey> = population.keys().copied().collect();

        let mut representatives: BTreeMap<SpeciesKey, GenomeKey> = BTreeMap::new();
        let mut members: BTreeMap<SpeciesKey, Vec<GenomeKey>> = BTreeMap::new();

        for (sid, s) in &self.species {
            let closest = unspeciated
                .iter()
                .map(|gid| (distances.distance(&s.representative, &population[gid]), *gid))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            let Some((_, rid)) = closest else {
                break;
            };
            representatives.insert(*sid, rid);
            members.insert(*sid, vec![rid]);
            unspeciated.remove(&rid);
        }

        while let Some(gid) = unspeciated.pop_first() {
            let genome = &population[&gid];
            let closest = representatives
                .iter()
                .map(|(sid, rid)| (distances.distance(&population[rid], genome), *sid))
                .filter(|(d, _)| *d < threshold)
                .min_by(|a, b| a.0.total_cmp(&b.0));
            match closest {
                Some((_, sid)) => members.entry(sid).or_default().push(gid),
                None => {
                    let sid = self.next_key;
                    self.next_key += 1;
                    representatives.insert(sid, gid);
                    members.insert(sid, vec![gid]);
                }
            }
        }

        self.species.retain(|sid, _| representatives.contains_key(sid));
        self.genome_to_species.clear();
        for (sid, rid) in representatives {
            let representative = population[&rid].clone();
            let species = self
                .species
                .entry(sid)
                .or_insert_with(|| Species::new(sid, generation, representative.clone()));
            let species_members = members.remove(&sid).unwrap_or_default();
            for gid in &species_members {
                self.genome_to_species.insert(*gid, sid);
            }
            species.representative = representative;
            species.members = species_members;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::config::tests::pole_config;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn population(n: u64, rng: &mut StdRng) -> Genomes {
        let config = pole_config();
        (1..=n)
            .map(|key| {
                let mut g = DefaultGenome::new(key);
                g.configure_new(&config.genome, rng);
                (key, g)
            })
            .collect()
    }

    #[test]
    fn test_every_genome_gets_a_species() {
        let config = pole_config();
        let mut rng = StdRng::seed_from_u64(1);
        let pop = population(30, &mut rng);
        let mut set = SpeciesSet::new();

        set.speciate(&config, &pop, 0);

        let total: usize = set.species.values().map(|s| s.members.len()).sum();
        assert_eq!(total, 30);
        for key in pop.keys() {
            let sid = set.species_id(*key).unwrap();
            assert!(set.species[&sid].members.contains(key));
        }
    }

    #[test]
    fn test_tight_threshold_splits_loose_threshold_merges() {
        let mut config = pole_config();
        let mut rng = StdRng::seed_from_u64(2);
        let pop = population(10, &mut rng);

        config.species_set.compatibility_threshold = 1e-9;
        let mut tight = SpeciesSet::new();
        tight.speciate(&config, &pop, 0);
        assert_eq!(tight.species.len(), 10);

        config.species_set.compatibility_threshold = 1e9;
        let mut loose = SpeciesSet::new();
        loose.speciate(&config, &pop, 0);
        assert_eq!(loose.species.len(), 1);
        assert_eq!(loose.species.keys().next(), Some(&1));
    }

    #[test]
    fn test_species_persist_across_generations() {
        let mut config = pole_config();
        config.species_set.compatibility_threshold = 1e9;
        let mut rng = StdRng::seed_from_u64(3);
        let mut set = SpeciesSet::new();

        set.speciate(&config, &population(5, &mut rng), 0);
        let next: Genomes = population(5, &mut rng)
            .into_iter()
            .map(|(k, mut g)| {
                g.key = k + 100;
                (k + 100, g)
            })
            .collect();
        set.speciate(&config, &next, 1);

        assert_eq!(set.species.len(), 1);
        let species = &set.species[&1];
        assert_eq!(species.created, 0);
        assert!(species.members.iter().all(|k| *k > 100));
    }
}
