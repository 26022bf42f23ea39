//! Round orchestration: generate with several models, judge, rank.

use crate::ai::evaluation::{evaluation_from_completion, evaluation_schema};
use crate::ai::{image_data, ProviderAdapters};
use crate::config::Config;
use crate::game::{GameState, RankedImage};
use crate::models::{EvaluationRequest, EvaluationResult, GeneratedImage, GenerationRequest, Provider};
use crate::registry::{ensure_generation_model, ensure_vision_model, is_flux_model};
use crate::{prompts, Error, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What to play with in one round.
#[derive(Debug, Clone)]
pub struct RoundOptions {
    pub provider: Provider,
    pub models: Vec<String>,
    /// Vision model that scores every image.
    pub judge_model: String,
}

/// Drives a round of the game against the configured providers.
pub struct App {
    adapters: ProviderAdapters,
    output_dir: PathBuf,
}

impl App {
    /// Build an app from concrete adapters.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(adapters: ProviderAdapters, output_dir: PathBuf) -> Self {
        Self {
            adapters,
            output_dir,
        }
    }

    pub async fn from_config(config: &Config, output_dir: PathBuf) -> Result<Self> {
        let adapters = ProviderAdapters::from_config(config).await?;
        Ok(Self::with_services(adapters, output_dir))
    }

    pub fn adapters(&self) -> &ProviderAdapters {
        &self.adapters
    }

    /// Play the generation and judging half of a round.
    ///
    /// `state` must be in the generation step, i.e. the prompt has been
    /// submitted. Models that fail to generate are logged and left out.
    pub async fn play_round(
        &self,
        state: &mut GameState,
        options: &RoundOptions,
    ) -> Result<Vec<RankedImage>> {
        if options.models.is_empty() {
            return Err(Error::Validation("At least one model is required".to_string()));
        }
        for model in &options.models {
            ensure_generation_model(options.provider, model)?;
        }
        ensure_vision_model(options.provider, &options.judge_model)?;

        let generator = self.adapters.image_generator(options.provider)?;
        let evaluator = self.adapters.image_evaluator(options.provider)?;

        state.begin_generation()?;
        let prompt = state.user_prompt.clone();
        info!(
            "Generating {} images with {} for prompt: {}",
            options.models.len(),
            options.provider,
            prompt
        );

        let mut generations = JoinSet::new();
        for (index, model) in options.models.iter().enumerate() {
            let mut request =
                GenerationRequest::new(options.provider, model.clone(), prompt.clone());
            let reference = state
                .selected_image
                .as_deref()
                .filter(|r| is_flux_model(model) && image_data::is_image_reference(r));
            if let Some(reference) = reference {
                request = request.with_reference_image(reference);
            }
            let generator = generator.clone();
            generations.spawn(async move {
                let result = generator.generate_image(&request).await;
                (index, request.model, result)
            });
        }

        let mut generated: Vec<(usize, String, GeneratedImage)> = Vec::new();
        while let Some(joined) = generations.join_next().await {
            let (index, model, result) = joined
                .map_err(|e| Error::Invariant(format!("Generation task failed: {}", e)))?;
            match result {
                Ok(image) => {
                    info!("[{}] Image generated", model);
                    generated.push((index, model, image));
                }
                Err(e) => error!("[{}] Image generation failed: {}", model, e),
            }
        }
        generated.sort_by_key(|(index, _, _)| *index);

        for (_, model, image) in &generated {
            state.record_image(model.clone(), image.clone())?;
        }

        let instruction = prompts::evaluation_instruction(&prompt);
        let schema = evaluation_schema();
        let mut evaluations = JoinSet::new();
        for (card, (_, model, image)) in generated.into_iter().enumerate() {
            let request = EvaluationRequest {
                image: image.to_image_input(),
                prompt: instruction.clone(),
                model: options.judge_model.clone(),
                provider: options.provider,
            };
            let evaluator = evaluator.clone();
            let schema = schema.clone();
            evaluations.spawn(async move {
                let result = evaluator.evaluate_image(&request, &schema).await;
                (card, model, result)
            });
        }

        while let Some(joined) = evaluations.join_next().await {
            let (card, model, result) = joined
                .map_err(|e| Error::Invariant(format!("Evaluation task failed: {}", e)))?;
            let evaluation = match result {
                Ok(completion) => evaluation_from_completion(&completion),
                Err(e) => {
                    warn!("[{}] Evaluation failed, scoring 0: {}", model, e);
                    EvaluationResult::default()
                }
            };
            info!("[{}] Scored {}/100", model, evaluation.score);
            state.apply_evaluation(card, evaluation)?;
        }

        state.show_results()?;
        let ranking = state.ranked();
        if let Some(winner) = ranking.first() {
            info!("Winner: {} with {}/100", winner.model, winner.score);
        } else {
            warn!("No model produced an image this round");
        }
        Ok(ranking)
    }

    /// Write each base64 image of the round into a fresh directory under the
    /// output dir. URL images are skipped.
    pub fn save_images(&self, state: &GameState) -> Result<Vec<PathBuf>> {
        let round_dir = self.output_dir.join(format!(
            "round_{}_{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        ));
        fs::create_dir_all(&round_dir)?;

        let mut saved = Vec::new();
        for ranked in state.ranked() {
            let GeneratedImage::Base64(data) = &ranked.image else {
                warn!("[{}] Skipping URL image: not stored locally", ranked.model);
                continue;
            };

            let bytes = image_data::decode_base64(data)?;
            let path = image_path(&round_dir, ranked.rank, &ranked.model, &bytes);
            fs::write(&path, &bytes)?;
            info!("Saved {} image to {}", ranked.model, path.display());
            saved.push(path);
        }

        Ok(saved)
    }
}

fn image_path(dir: &Path, rank: usize, model: &str, bytes: &[u8]) -> PathBuf {
    let model_slug: String = model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    dir.join(format!(
        "{:02}_{}.{}",
        rank,
        model_slug,
        image_data::detect_extension(bytes)
    ))
}
