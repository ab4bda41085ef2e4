//! Pose refinement trainer.

use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use rand::rngs::StdRng;
use rand::SeedableRng;
use refine_core::GateDecision;

use crate::config::TrainingConfig;
use crate::data::{epoch_order, DatasetSplit, PointCloudStore, SampleRecord, SampleSource};
use crate::error::{NeuralRefineError, Result};
use crate::loss::MatchingLoss;
use crate::nn::PoseRefinerNet;
use crate::pose::{compose_refined_pose, PoseTensor, RotationGradient};

use super::checkpoint::{save_checkpoint, save_training_config, CheckpointMetadata};
use super::metrics::{EpochAccumulator, EpochSummary, TrainingSession};

/// Trains a pose refiner one sample at a time.
///
/// Every epoch runs a training pass over a fresh permutation of the train
/// split (backpropagating kept losses) and a validation pass over a fresh
/// permutation of the validation split on the inner backend. Losses at or
/// above the outlier threshold are skipped in both passes. The model is saved
/// whenever the validation loss matches or beats the best so far.
#[derive(Debug)]
pub struct PoseRefinerTrainer<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + PoseRefinerNet<B>,
{
    model: M,
    config: TrainingConfig,
    device: B::Device,
    loss: MatchingLoss,
    clouds: PointCloudStore,
    rng: StdRng,
    session: TrainingSession,
}

impl<B, M> PoseRefinerTrainer<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + PoseRefinerNet<B>,
    M::InnerModule: PoseRefinerNet<B::InnerBackend>,
{
    /// Create a trainer. The configuration is validated here.
    pub fn new(model: M, config: TrainingConfig, device: &B::Device) -> Result<Self> {
        config
            .validate()
            .map_err(|message| NeuralRefineError::InvalidConfig { message })?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Ok(Self {
            model,
            loss: MatchingLoss::new(config.num_points),
            clouds: PointCloudStore::new(&config.root_dir, config.cache_point_clouds),
            session: TrainingSession::new(config.outlier_threshold),
            device: device.clone(),
            config,
            rng,
        })
    }

    /// Get the training configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// The model in its current state.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the trainer and return the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Run state so far.
    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Train for `config.epochs` epochs on `source`.
    ///
    /// Fails before the first epoch if either split would be empty. Any data,
    /// composition or checkpoint error aborts the run.
    pub fn fit<S: SampleSource + ?Sized>(&mut self, source: &S) -> Result<TrainingSession> {
        let split = DatasetSplit::random(&mut self.rng, source.len(), self.config.valid_fraction)?;
        log::info!(
            "Training on {} samples, validating on {} ({} epochs)",
            split.train.len(),
            split.valid.len(),
            self.config.epochs
        );

        let checkpoint = PathBuf::from(&self.config.checkpoint_path);
        save_training_config(&self.config, &checkpoint)?;

        let weight_decay = (self.config.weight_decay > 0.0)
            .then(|| WeightDecayConfig::new(self.config.weight_decay as f32));
        let mut optim = AdamConfig::new()
            .with_weight_decay(weight_decay)
            .init::<B, M>();

        for epoch in 1..=self.config.epochs {
            let train = self.train_epoch(source, &split.train, &mut optim)?;
            let valid = self.validate_epoch(source, &split.valid)?;

            log::info!(
                "Epoch: {} \tTraining Loss: {:.6} \tValidation Loss: {:.6}",
                epoch,
                train.average(),
                valid.average()
            );

            let improvement = self.session.checkpoint.observe(valid.average());
            if let Some(improvement) = improvement {
                log::info!(
                    "Validation loss decreased ({:.6} --> {:.6}).  Saving model ...",
                    improvement.previous,
                    improvement.current
                );
                let metadata = CheckpointMetadata::new(epoch, train.average(), valid.average())
                    .with_previous_best(improvement.previous)
                    .with_outliers(self.session.outlier_count());
                save_checkpoint(&self.model, &checkpoint, &metadata)?;
            }

            self.session.history.push(EpochSummary {
                epoch,
                train,
                valid,
                improvement,
            });
        }

        log::info!("Number of outliers: {}", self.session.outlier_count());
        Ok(self.session.clone())
    }

    /// One training pass over `indices` in a fresh random order.
    ///
    /// Each kept sample takes one optimizer step (batch size 1).
    pub fn train_epoch<S, O>(
        &mut self,
        source: &S,
        indices: &[usize],
        optim: &mut O,
    ) -> Result<EpochAccumulator>
    where
        S: SampleSource + ?Sized,
        O: Optimizer<M, B>,
    {
        let mut acc = EpochAccumulator::new(indices.len());

        for index in epoch_order(&mut self.rng, indices) {
            let record = source.get(index)?;
            let loss = sample_loss(
                &self.model,
                &record,
                &mut self.clouds,
                &mut self.rng,
                self.loss,
                self.config.rotation_gradient,
                &self.device,
            )?;
            let value: f64 = loss.clone().into_scalar().elem();

            match self.session.gate.admit(value) {
                GateDecision::Keep => {
                    let grads = GradientsParams::from_grads(loss.backward(), &self.model);
                    self.model = optim.step(self.config.learning_rate, self.model.clone(), grads);
                    acc.keep(value);
                }
                GateDecision::Outlier => {
                    log::debug!("Skipping training sample {index} ({}): loss {value}", record.label);
                    acc.reject();
                }
            }
        }

        Ok(acc)
    }

    /// One validation pass over `indices` on the inner backend, no gradients.
    pub fn validate_epoch<S: SampleSource + ?Sized>(
        &mut self,
        source: &S,
        indices: &[usize],
    ) -> Result<EpochAccumulator> {
        let model = self.model.valid();
        let mut acc = EpochAccumulator::new(indices.len());

        for index in epoch_order(&mut self.rng, indices) {
            let record = source.get(index)?;
            let loss = sample_loss(
                &model,
                &record,
                &mut self.clouds,
                &mut self.rng,
                self.loss,
                RotationGradient::Detached,
                &self.device,
            )?;
            let value: f64 = loss.into_scalar().elem();

            match self.session.gate.admit(value) {
                GateDecision::Keep => acc.keep(value),
                GateDecision::Outlier => {
                    log::debug!("Skipping validation sample {index} ({}): loss {value}", record.label);
                    acc.reject();
                }
            }
        }

        Ok(acc)
    }
}

/// Forward one sample and return its matching loss.
fn sample_loss<BB, N>(
    model: &N,
    record: &SampleRecord,
    clouds: &mut PointCloudStore,
    rng: &mut StdRng,
    loss: MatchingLoss,
    gradient: RotationGradient,
    device: &BB::Device,
) -> Result<Tensor<BB, 1>>
where
    BB: Backend,
    N: PoseRefinerNet<BB>,
{
    let sample = record.to_device::<BB>(device);
    let output = model.refine(sample.observed, sample.rendered, sample.pose_input);
    let refined = compose_refined_pose(output, gradient)?;
    let truth = PoseTensor::from_pose(&sample.true_pose, device);

    let cloud = clouds.load(&sample.label)?;
    loss.forward(rng, &cloud, &truth, &refined)
}
