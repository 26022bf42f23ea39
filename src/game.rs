//! Single-player round state
//!
//! A round walks `Selection → Prompt → Generation → Results`. Each operation
//! checks the current step and fails with [`Error::InvalidTransition`] when it
//! is called out of order.

use crate::models::{EvaluationResult, GeneratedImage};
use crate::{prompts, Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fmt;

pub const MAX_PROMPT_CHARS: usize = 512;

const INSPIRATION_TITLES: &[&str] = &[
    "The Midnight Library",
    "Ocean's Whisper",
    "Neon Dreams",
    "The Last Garden",
    "Starlight Express",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStep {
    Selection,
    Prompt,
    Generation,
    Results,
}

impl GameStep {
    pub fn progress(&self) -> u8 {
        match self {
            GameStep::Selection => 25,
            GameStep::Prompt => 50,
            GameStep::Generation => 75,
            GameStep::Results => 100,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameStep::Selection => "Choose Your Inspiration",
            GameStep::Prompt => "Craft Your Story",
            GameStep::Generation => "AI Creates Your Vision",
            GameStep::Results => "Discover Your Results",
        }
    }

    /// 1-based position among the four steps.
    pub fn number(&self) -> u8 {
        self.progress() / 25
    }
}

impl fmt::Display for GameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameStep::Selection => "selection",
            GameStep::Prompt => "prompt",
            GameStep::Generation => "generation",
            GameStep::Results => "results",
        };
        f.write_str(name)
    }
}

/// An image produced during the round, with its score once evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCard {
    pub image: GeneratedImage,
    pub model: String,
    pub score: Option<u8>,
    pub reasoning: Option<String>,
}

/// A card's position in the final ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedImage {
    pub rank: usize,
    pub model: String,
    pub score: u8,
    pub reasoning: String,
    pub image: GeneratedImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    pub step: GameStep,
    pub selected_image: Option<String>,
    pub user_prompt: String,
    pub generated_images: Vec<GeneratedCard>,
    pub is_loading: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            step: GameStep::Selection,
            selected_image: None,
            user_prompt: prompts::DEFAULT_PROMPT.trim_end().to_string(),
            generated_images: Vec::new(),
            is_loading: false,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    fn expect_step(&self, expected: GameStep, action: &str) -> Result<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.step.to_string(),
                action: action.to_string(),
            })
        }
    }

    pub fn select_image(&mut self, image: impl Into<String>) -> Result<()> {
        self.expect_step(GameStep::Selection, "select an image")?;
        self.selected_image = Some(image.into());
        self.step = GameStep::Prompt;
        Ok(())
    }

    pub fn back_to_selection(&mut self) -> Result<()> {
        self.expect_step(GameStep::Prompt, "go back to selection")?;
        self.step = GameStep::Selection;
        Ok(())
    }

    pub fn submit_prompt(&mut self, text: &str) -> Result<()> {
        self.expect_step(GameStep::Prompt, "submit a prompt")?;
        let prompt = validate_prompt(text)?;
        self.user_prompt = prompt.to_string();
        self.step = GameStep::Generation;
        Ok(())
    }

    pub fn begin_generation(&mut self) -> Result<()> {
        self.expect_step(GameStep::Generation, "start generating")?;
        self.generated_images.clear();
        self.is_loading = true;
        Ok(())
    }

    pub fn record_image(&mut self, model: impl Into<String>, image: GeneratedImage) -> Result<()> {
        self.expect_step(GameStep::Generation, "record an image")?;
        self.generated_images.push(GeneratedCard {
            image,
            model: model.into(),
            score: None,
            reasoning: None,
        });
        Ok(())
    }

    /// Attach a score to the card at `index`, in recording order. The same
    /// model may appear more than once in a round.
    pub fn apply_evaluation(&mut self, index: usize, result: EvaluationResult) -> Result<()> {
        self.expect_step(GameStep::Generation, "apply an evaluation")?;
        let card = self
            .generated_images
            .get_mut(index)
            .ok_or_else(|| Error::Invariant(format!("No generated image at index {}", index)))?;
        card.score = Some(result.score);
        card.reasoning = Some(result.reasoning);
        Ok(())
    }

    pub fn finish_generation(&mut self) -> Result<()> {
        self.expect_step(GameStep::Generation, "finish generating")?;
        self.is_loading = false;
        Ok(())
    }

    pub fn show_results(&mut self) -> Result<()> {
        self.expect_step(GameStep::Generation, "show results")?;
        self.is_loading = false;
        self.step = GameStep::Results;
        Ok(())
    }

    /// Cards by score, highest first. Unscored cards count as 0 and ties keep
    /// generation order.
    pub fn ranked(&self) -> Vec<RankedImage> {
        let mut cards: Vec<&GeneratedCard> = self.generated_images.iter().collect();
        cards.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)));

        cards
            .into_iter()
            .enumerate()
            .map(|(index, card)| RankedImage {
                rank: index + 1,
                model: card.model.clone(),
                score: card.score.unwrap_or(0),
                reasoning: card.reasoning.clone().unwrap_or_default(),
                image: card.image.clone(),
            })
            .collect()
    }

    pub fn winner(&self) -> Option<RankedImage> {
        self.ranked().into_iter().next()
    }

    /// Start over from the initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Trimmed prompt, 1..=512 characters. Whitespace-only prompts are rejected.
pub fn validate_prompt(text: &str) -> Result<&str> {
    let prompt = text.trim();
    let chars = prompt.chars().count();
    if chars == 0 || chars > MAX_PROMPT_CHARS {
        return Err(Error::Validation(
            "Prompt is required and must be less than 512 characters".to_string(),
        ));
    }
    Ok(prompt)
}

pub fn inspiration_titles() -> &'static [&'static str] {
    INSPIRATION_TITLES
}

/// A random inspiration title with its image description.
pub fn random_inspiration<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, String) {
    let title = INSPIRATION_TITLES
        .choose(rng)
        .copied()
        .unwrap_or(INSPIRATION_TITLES[0]);
    (title, prompts::inspiration_description(title))
}
