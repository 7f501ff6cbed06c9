use super::config::StagnationConfig;
use super::species::SpeciesSet;
use super::{Genomes, SpeciesKey};

/// Refreshes each species' fitness and history, then flags the species that
/// have not improved for `max_stagnation` generations. The `species_elitism`
/// best species are never flagged. Results are ordered by ascending fitness.
pub fn update(
    config: &StagnationConfig,
    species_set: &mut SpeciesSet,
    population: &Genomes,
    generation: usize,
) -> Vec<(SpeciesKey, bool)> {
    let mut ranked: Vec<(SpeciesKey, f64)> = Vec::new();
    for (sid, s) in species_set.species.iter_mut() {
        let previous = s
            .fitness_history
            .iter()
            .copied()
            .fold(f64::MIN, f64::max);
        let fitness = config
            .species_fitness_func
            .apply(&s.member_fitnesses(population));
        s.fitness = Some(fitness);
        s.fitness_history.push(fitness);
        s.adjusted_fitness = None;
        if fitness > previous {
            s.last_improved = generation;
        }
        ranked.push((*sid, fitness));
    }
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let total = ranked.len();
    let mut non_stagnant = total;
    let mut result = Vec::with_capacity(total);
    for (idx, (sid, _)) in ranked.into_iter().enumerate() {
        let last_improved = species_set.species[&sid].last_improved;
        let stagnant_time = generation.saturating_sub(last_improved);

        let mut is_stagnant = false;
        if non_stagnant > config.species_elitism {
            is_stagnant = stagnant_time >= config.max_stagnation;
        }
        if total - idx <= config.species_elitism {
            is_stagnant = false;
        }
        if is_stagnant {
            non_stagnant -= 1;
        }
        result.push((sid, is_stagnant));
    }
    result
}
