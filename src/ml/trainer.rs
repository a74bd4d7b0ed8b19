// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Per epoch:
//   train  — batches of padded images, teacher-forcing
//            corruption of y_in, cross-entropy ignoring <PAD>,
//            backward pass, Adam step
//   valid  — model.valid() (no autodiff, dropout off), one image
//            at a time through greedy decoding, metrics closed
//            with end_epoch("val")
//   record — metrics.csv row, checkpoint, best epoch by val SER
//
// Backends:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - Validation tensors are therefore built on the inner backend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::Img2SeqBatcher,
    dataset::{EvalSample, Img2SeqDataset, TrainSample},
};
use crate::domain::{metrics::EditDistanceMetrics, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    encoder::{grid_size, ENCODER_CHANNELS},
    evaluator::Evaluator,
    model::Img2SeqModel,
    teacher_forcing::apply_teacher_forcing,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub epochs_run:   usize,
    pub best_epoch:   usize,
    pub best_val_ser: f64,
}

pub fn run_training(
    cfg:           &TrainConfig,
    vocab:         &Vocabulary,
    truth_vocab:   Option<&Vocabulary>,
    train_dataset: Img2SeqDataset<TrainSample>,
    val_samples:   Vec<EvalSample>,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainingReport> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, vocab, truth_vocab, train_dataset, val_samples, ckpt_manager, device)
}

pub(crate) fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    vocab:         &Vocabulary,
    truth_vocab:   Option<&Vocabulary>,
    train_dataset: Img2SeqDataset<TrainSample>,
    val_samples:   Vec<EvalSample>,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainingReport> {

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Img2SeqModel<B> = cfg.model_config(vocab).init(&device);
    log_model_summary(&model, cfg);

    let mut optim = AdamConfig::new().init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = Img2SeqBatcher::<B>::new(device.clone(), vocab.pad_index());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    // Corruption draws and displayed samples share one seeded stream
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let mut evaluator = Evaluator::new(vocab, truth_vocab);
    let logger = MetricsLogger::new(ckpt_manager.dir().to_string_lossy())?;

    if val_samples.is_empty() {
        tracing::warn!("No validation samples; the latest epoch is kept as the best one");
    }

    let mut best_epoch   = 0usize;
    let mut best_val_ser = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let y_in = apply_teacher_forcing(
                batch.y_in,
                cfg.teacher_forcing_prob,
                vocab.len(),
                vocab.pad_index(),
                &mut rng,
            );
            let (loss, _) = model.forward_loss(
                batch.images,
                Some(batch.memory_lens.as_slice()),
                y_in,
                batch.y_out,
            );

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        for sample in &val_samples {
            let image = sample.image.to_tensor::<B::InnerBackend>(&device);
            evaluator.evaluation_step(&model_valid, image, &sample.truth)?;
        }
        let summary = evaluator.end_epoch("val", false, &EditDistanceMetrics, &mut rng);

        let row = EpochMetrics::new(epoch, avg_train_loss, summary.metrics);
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_ser={:.2}% | val_cer={:.2}% | val_seq_acc={:.1}%",
            epoch, cfg.epochs, avg_train_loss, row.val_ser(),
            row.values.get("cer").copied().unwrap_or_default(),
            row.values.get("seq_acc").copied().unwrap_or_default(),
        );
        logger.log(&row)?;

        ckpt_manager.save_model(&model, epoch)?;
        if val_samples.is_empty() || row.is_improvement(best_val_ser) {
            best_epoch   = epoch;
            best_val_ser = row.val_ser();
            ckpt_manager.mark_best(epoch)?;
            tracing::info!("New best checkpoint: epoch {} (val_ser={:.2})", epoch, best_val_ser);
        }
    }

    tracing::info!("Training complete!");
    Ok(TrainingReport { epochs_run: cfg.epochs, best_epoch, best_val_ser })
}

fn log_model_summary<B: Backend>(model: &Img2SeqModel<B>, cfg: &TrainConfig) {
    let (rows, cols) = grid_size(cfg.max_input_height, cfg.max_input_width);
    tracing::info!(
        "Model ready: {} parameters, {} decoder layers, vocab={}",
        model.num_params(), cfg.num_layers, model.vocab_size,
    );
    tracing::info!(
        "Largest input {}x{} → grid {}x{}x{} → memory length {}",
        cfg.max_input_height, cfg.max_input_width,
        ENCODER_CHANNELS, rows, cols, rows * cols,
    );
}
