use crate::config::EvolutionConfig;
use crate::engines::generation::{
    diversity_validator::DiversityValidator,
    genome::{mutate_genes, uniform_crossover, GeneSpec, Genome},
    operators::{rank_by_fitness, tournament_selection},
};
use crate::error::{AetraderError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One generation's individuals. Replaced whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub generation: usize,
    pub genomes: Vec<Genome>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

/// Selection, elitism, reproduction and the diversity floor
pub struct PopulationManager {
    config: EvolutionConfig,
    spec: GeneSpec,
    diversity: DiversityValidator,
}

impl PopulationManager {
    /// `config` must already be validated.
    pub fn new(config: EvolutionConfig, spec: GeneSpec) -> Self {
        let diversity = DiversityValidator::new(&config.diversity);
        Self { config, spec, diversity }
    }

    pub fn spec(&self) -> &GeneSpec {
        &self.spec
    }

    pub fn initialize<R: Rng>(&self, rng: &mut R) -> Population {
        let genomes = (0..self.config.population_size)
            .map(|_| Genome::create_random(rng, &self.spec, 0))
            .collect();
        Population { generation: 0, genomes }
    }

    /// `k` tournament winners, drawn with replacement
    pub fn select<R: Rng>(
        &self,
        population: &Population,
        scores: &[f64],
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<Genome>> {
        self.check_scores(population, scores)?;
        Ok((0..k)
            .map(|_| population.genomes[tournament_selection(scores, self.config.tournament_size, rng)].clone())
            .collect())
    }

    /// Builds the next generation: the top `elite_count` unchanged (same ids), the rest
    /// from tournament-selected parents by crossover or mutation-only reproduction.
    pub fn next_generation<R: Rng>(
        &self,
        population: &Population,
        scores: &[f64],
        rng: &mut R,
    ) -> Result<Population> {
        self.check_scores(population, scores)?;
        let size = self.config.population_size;
        let generation = population.generation + 1;
        let rate = self.config.mutation_rate;

        let mut next: Vec<Genome> = rank_by_fitness(scores)
            .into_iter()
            .take(self.config.elite_count.min(size))
            .map(|i| population.genomes[i].clone())
            .collect();
        let elites = next.len();

        while next.len() < size {
            let a = &population.genomes[tournament_selection(scores, self.config.tournament_size, rng)];

            if rng.gen::<f64>() < self.config.crossover_rate {
                let b = &population.genomes[tournament_selection(scores, self.config.tournament_size, rng)];
                let parents = if a.id() == b.id() { vec![a.id()] } else { vec![a.id(), b.id()] };

                let (genes_a, genes_b) = uniform_crossover(a.genes(), b.genes(), rng);
                let genes_a = mutate_genes(&genes_a, &self.spec, rate, rng);
                let genes_b = mutate_genes(&genes_b, &self.spec, rate, rng);

                next.push(Genome::offspring(rng, genes_a, generation, parents.clone()));
                if next.len() < size {
                    next.push(Genome::offspring(rng, genes_b, generation, parents));
                }
            } else {
                next.push(a.mutate(rng, &self.spec, rate, generation)?);
            }
        }

        if self.config.diversity.enabled && self.diversity.is_collapsed(&self.spec, &next) {
            let offspring = size - elites;
            let replace = ((offspring as f64) * self.config.diversity.replace_fraction).ceil() as usize;
            log::info!(
                "Generation {}: population collapsed, replacing {} offspring with random genomes",
                generation,
                replace
            );
            for slot in next.iter_mut().skip(size - replace.min(offspring)) {
                *slot = Genome::create_random(rng, &self.spec, generation);
            }
        }

        Ok(Population { generation, genomes: next })
    }

    fn check_scores(&self, population: &Population, scores: &[f64]) -> Result<()> {
        if population.is_empty() || population.len() != scores.len() {
            return Err(AetraderError::InvalidGenome(format!(
                "{} genomes scored with {} fitness values",
                population.len(),
                scores.len()
            )));
        }
        Ok(())
    }
}
