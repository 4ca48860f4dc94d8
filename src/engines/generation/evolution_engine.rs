use crate::config::{AppConfig, EvolutionConfig, RiskLimits};
use crate::data::{DataRequest, MarketDataSource, PriceSeries};
use crate::engines::evaluation::Backtester;
use crate::engines::fitness::{FitnessEvaluator, FitnessScore};
use crate::engines::generation::{
    genome::{GeneSpec, Genome},
    hall_of_fame::{EliteStrategy, HallOfFame},
    operators::compare_fitness,
    population::{Population, PopulationManager},
};
use crate::engines::metrics::{MetricsEngine, PerformanceMetrics};
use crate::error::{AetraderError, Result};
use crate::persistence::{GenerationRecord, GenomeStore};
use crate::types::GenomeId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Initializing,
    Evaluating,
    Selecting,
    Reproducing,
    Converged,
    Exhausted,
    Cancelled,
    Finalized,
}

/// Fitness of one genome in one generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub genome: Genome,
    pub fitness: FitnessScore,
    /// `None` when the backtest failed
    pub metrics: Option<PerformanceMetrics>,
    pub error: Option<String>,
}

impl Evaluation {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub best_genome: GenomeId,
    pub failed_evaluations: usize,
    pub hall_of_fame_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// `Converged`, `Exhausted` or `Cancelled`
    pub termination: ControllerState,
    pub best: Evaluation,
    /// Every evaluation of the last generation, in population order
    pub final_evaluations: Vec<Evaluation>,
    pub history: Vec<GenerationSummary>,
    pub hall_of_fame: Vec<EliteStrategy>,
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, summary: &GenerationSummary);
    fn on_state_change(&mut self, _state: ControllerState) {}
}

/// Backtest plus fitness for a single genome. Shared read-only by the worker threads.
pub struct GenomeEvaluator {
    backtester: Backtester,
    fitness: FitnessEvaluator,
    limits: RiskLimits,
    starting_capital: f64,
}

impl GenomeEvaluator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backtester: Backtester::new(config.backtesting.clone()),
            fitness: FitnessEvaluator::new(config.fitness.clone()),
            limits: config.risk.clone(),
            starting_capital: config.backtesting.starting_capital,
        }
    }

    /// Never fails: a backtest error becomes the fixed low score.
    pub fn evaluate(&self, genome: &Genome, series: &PriceSeries) -> Evaluation {
        match self.backtester.run(genome, series, &self.limits, self.starting_capital) {
            Ok(report) => {
                let metrics = MetricsEngine::calculate_all(&report);
                Evaluation {
                    genome: genome.clone(),
                    fitness: self.fitness.score(&metrics),
                    metrics: Some(metrics),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("Evaluation of genome {} failed: {}", genome.id(), e);
                Evaluation {
                    genome: genome.clone(),
                    fitness: self.fitness.failed(),
                    metrics: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    evaluator: GenomeEvaluator,
    population_manager: PopulationManager,
    hall_of_fame: HallOfFame,
    rng: StdRng,
    cancel: Arc<AtomicBool>,
    store: Option<Box<dyn GenomeStore>>,
    state: ControllerState,
}

impl EvolutionEngine {
    pub fn new(config: &AppConfig, spec: GeneSpec) -> Result<Self> {
        config.validate()?;

        let rng = match config.evolution.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config: config.evolution.clone(),
            evaluator: GenomeEvaluator::new(config),
            population_manager: PopulationManager::new(config.evolution.clone(), spec),
            hall_of_fame: HallOfFame::new(config.evolution.hall_of_fame_size),
            rng,
            cancel: Arc::new(AtomicBool::new(false)),
            store: None,
            state: ControllerState::Initializing,
        })
    }

    /// Persist the best genome of every generation
    pub fn with_store(mut self, store: Box<dyn GenomeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Setting the flag stops the run after the generation in progress
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn get_hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    pub fn run_with_source<C: ProgressCallback>(
        &mut self,
        source: &dyn MarketDataSource,
        request: &DataRequest,
        callback: C,
    ) -> Result<EvolutionResult> {
        let series = source.fetch(request)?;
        log::info!("Loaded {} bars of {} from {}", series.len(), series.symbol(), source.name());
        self.run(&series, callback)
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(&mut self, series: &PriceSeries, mut callback: C) -> Result<EvolutionResult> {
        if series.is_empty() {
            return Err(AetraderError::MarketDataUnavailable(format!("{}: empty series", series.symbol())));
        }

        self.set_state(ControllerState::Initializing, &mut callback);
        let mut population = self.population_manager.initialize(&mut self.rng);
        let mut history: Vec<GenerationSummary> = Vec::new();
        let mut best_so_far = f64::NEG_INFINITY;
        let mut stale = 0;
        let mut previous: Vec<Evaluation> = Vec::new();

        let (termination, evaluations) = loop {
            callback.on_generation_start(population.generation);
            self.set_state(ControllerState::Evaluating, &mut callback);

            population = self.sanitize(population);
            let evaluations = self.evaluate_generation(&population, series, &previous);
            let scores: Vec<f64> = evaluations.iter().map(|e| e.fitness.value).collect();

            for evaluation in &evaluations {
                if let Some(metrics) = &evaluation.metrics {
                    self.hall_of_fame.try_add(EliteStrategy {
                        genome: evaluation.genome.clone(),
                        fitness: evaluation.fitness.value,
                        metrics: metrics.clone(),
                        generation: population.generation,
                    });
                }
            }

            let best = Self::best_of(&evaluations)?;
            let summary = GenerationSummary {
                generation: population.generation,
                best_fitness: best.fitness.value,
                mean_fitness: scores.iter().sum::<f64>() / scores.len() as f64,
                best_genome: best.genome.id(),
                failed_evaluations: evaluations.iter().filter(|e| e.failed()).count(),
                hall_of_fame_size: self.hall_of_fame.len(),
            };
            self.persist(population.generation, best);
            callback.on_generation_complete(&summary);
            history.push(summary);

            let best_fitness = best.fitness.value;
            if best_fitness - best_so_far > self.config.convergence_epsilon {
                best_so_far = best_fitness;
                stale = 0;
            } else {
                stale += 1;
            }

            if stale >= self.config.patience {
                break (ControllerState::Converged, evaluations);
            }
            if population.generation + 1 >= self.config.max_generations {
                break (ControllerState::Exhausted, evaluations);
            }
            if self.cancel.load(Ordering::SeqCst) {
                break (ControllerState::Cancelled, evaluations);
            }

            self.set_state(ControllerState::Selecting, &mut callback);
            self.set_state(ControllerState::Reproducing, &mut callback);
            population = self.population_manager.next_generation(&population, &scores, &mut self.rng)?;
            previous = evaluations;
        };

        self.set_state(termination, &mut callback);
        log::info!(
            "Evolution finished after {} generations: {:?}, best fitness {:.4}",
            history.len(),
            termination,
            history.last().map(|s| s.best_fitness).unwrap_or(f64::NAN)
        );

        let best = Self::best_of(&evaluations)?.clone();
        self.set_state(ControllerState::Finalized, &mut callback);

        Ok(EvolutionResult {
            termination,
            best,
            final_evaluations: evaluations,
            history,
            hall_of_fame: self.hall_of_fame.get_all().to_vec(),
        })
    }

    /// Evaluates every genome on the rayon pool; returns once all are done, in
    /// population order.
    pub fn evaluate_population(&self, population: &Population, series: &PriceSeries) -> Vec<Evaluation> {
        let evaluator = &self.evaluator;
        population
            .genomes
            .par_iter()
            .map(|genome| evaluator.evaluate(genome, series))
            .collect()
    }

    /// Like `evaluate_population`, but genomes carried over unchanged from the last
    /// generation (the elites) keep their previous evaluation instead of being re-run.
    fn evaluate_generation(
        &self,
        population: &Population,
        series: &PriceSeries,
        previous: &[Evaluation],
    ) -> Vec<Evaluation> {
        let known: HashMap<GenomeId, &Evaluation> = previous.iter().map(|e| (e.genome.id(), e)).collect();
        let evaluator = &self.evaluator;
        population
            .genomes
            .par_iter()
            .map(|genome| match known.get(&genome.id()) {
                Some(evaluation) if evaluation.genome == *genome => (*evaluation).clone(),
                _ => evaluator.evaluate(genome, series),
            })
            .collect()
    }

    /// Repairs out-of-range genomes in place of the originals; genomes that cannot be
    /// repaired are replaced by fresh random ones.
    fn sanitize(&mut self, population: Population) -> Population {
        let spec = self.population_manager.spec().clone();
        let generation = population.generation;
        let genomes = population
            .genomes
            .into_iter()
            .map(|genome| match genome.validate(&spec) {
                Ok(()) => genome,
                Err(e) => match genome.repair(&spec) {
                    Ok(repaired) => {
                        log::warn!("Repaired genome {}: {}", genome.id(), e);
                        repaired
                    }
                    Err(_) => {
                        log::warn!("Replacing unrepairable genome {}: {}", genome.id(), e);
                        Genome::create_random(&mut self.rng, &spec, generation)
                    }
                },
            })
            .collect();
        Population { generation, genomes }
    }

    fn persist(&mut self, generation: usize, best: &Evaluation) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let record = GenerationRecord {
            generation,
            genome: best.genome.clone(),
            fitness: best.fitness.value,
            metrics: best.metrics.clone(),
            recorded_at: chrono::Utc::now(),
        };
        if let Err(e) = store.save(&record) {
            log::warn!("Failed to persist best genome of generation {}: {}", generation, e);
        }
    }

    fn best_of(evaluations: &[Evaluation]) -> Result<&Evaluation> {
        champion(evaluations).ok_or_else(|| AetraderError::InvalidGenome("no genomes were evaluated".to_string()))
    }

    fn set_state<C: ProgressCallback>(&mut self, state: ControllerState, callback: &mut C) {
        self.state = state;
        callback.on_state_change(state);
    }
}

/// Best evaluation by fitness; ties keep population order
pub fn champion(evaluations: &[Evaluation]) -> Option<&Evaluation> {
    evaluations
        .iter()
        .reduce(|best, e| if compare_fitness(e.fitness.value, best.fitness.value).is_gt() { e } else { best })
}
