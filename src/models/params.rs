use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Range of the "steps" slider.
pub const STEPS_RANGE: RangeInclusive<u32> = 10..=80;
/// Range of the "CFG scale" slider.
pub const CFG_SCALE_RANGE: RangeInclusive<f32> = 1.0..=20.0;
/// Range of the "LoRA scale" slider.
pub const LORA_SCALE_RANGE: RangeInclusive<f32> = 0.0..=2.0;

/// Seed value asking the backend for a random seed.
pub const RANDOM_SEED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Sampler {
    #[default]
    #[serde(rename = "DPM++ 2M")]
    DpmPlusPlus2M,
    #[serde(rename = "Euler")]
    Euler,
    #[serde(rename = "Euler a")]
    EulerAncestral,
    #[serde(rename = "DDIM")]
    Ddim,
}

impl Sampler {
    pub const ALL: [Sampler; 4] = [
        Sampler::DpmPlusPlus2M,
        Sampler::Euler,
        Sampler::EulerAncestral,
        Sampler::Ddim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sampler::DpmPlusPlus2M => "DPM++ 2M",
            Sampler::Euler => "Euler",
            Sampler::EulerAncestral => "Euler a",
            Sampler::Ddim => "DDIM",
        }
    }
}

impl fmt::Display for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sampler {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Sampler::ALL
            .into_iter()
            .find(|sampler| sampler.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CompareError::InvalidParam(format!(
                    "unknown sampler '{}', expected one of: DPM++ 2M, Euler, Euler a, DDIM",
                    wanted
                ))
            })
    }
}

/// Parameters forwarded to the trained model.
///
/// The base model only ever receives the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub seed: i64,
    pub sampler: Sampler,
    pub width: u32,
    pub height: u32,
    pub lora_scale: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            negative_prompt: String::new(),
            steps: 30,
            cfg_scale: 7.0,
            seed: RANDOM_SEED,
            sampler: Sampler::default(),
            width: 512,
            height: 512,
            lora_scale: 1.0,
        }
    }
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the single field named by `update` replaced.
    pub fn with(mut self, update: ParamUpdate) -> Self {
        match update {
            ParamUpdate::NegativePrompt(value) => self.negative_prompt = value,
            ParamUpdate::Steps(value) => self.steps = value,
            ParamUpdate::CfgScale(value) => self.cfg_scale = value,
            ParamUpdate::Seed(value) => self.seed = value,
            ParamUpdate::Sampler(value) => self.sampler = value,
            ParamUpdate::Width(value) => self.width = value,
            ParamUpdate::Height(value) => self.height = value,
            ParamUpdate::LoraScale(value) => self.lora_scale = value,
        }
        self
    }

    pub fn with_all(self, updates: impl IntoIterator<Item = ParamUpdate>) -> Self {
        updates.into_iter().fold(self, GenerationParams::with)
    }

    pub fn is_random_seed(&self) -> bool {
        self.seed < 0
    }
}

/// A single "set field X to V" edit of [`GenerationParams`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamUpdate {
    NegativePrompt(String),
    Steps(u32),
    CfgScale(f32),
    Seed(i64),
    Sampler(Sampler),
    Width(u32),
    Height(u32),
    LoraScale(f32),
}

impl ParamUpdate {
    pub const KEYS: [&'static str; 8] = [
        "negative_prompt",
        "steps",
        "cfg_scale",
        "seed",
        "sampler",
        "width",
        "height",
        "lora_scale",
    ];

    /// Builds an update from a field name and its textual value.
    ///
    /// Wire aliases (`num_inference_steps`, `guidance_scale`) are accepted as
    /// well. Only the type is checked, never the range. Text values are kept
    /// verbatim; surrounding whitespace is ignored for everything else.
    pub fn parse(key: &str, raw: &str) -> Result<Self> {
        let value = raw.trim();
        let update = match key.trim() {
            "negative_prompt" => ParamUpdate::NegativePrompt(raw.to_string()),
            "steps" | "num_inference_steps" => ParamUpdate::Steps(parse_number(key, value)?),
            "cfg_scale" | "guidance_scale" => ParamUpdate::CfgScale(parse_number(key, value)?),
            "seed" => ParamUpdate::Seed(parse_number(key, value)?),
            "sampler" => ParamUpdate::Sampler(value.parse()?),
            "width" => ParamUpdate::Width(parse_number(key, value)?),
            "height" => ParamUpdate::Height(parse_number(key, value)?),
            "lora_scale" => ParamUpdate::LoraScale(parse_number(key, value)?),
            other => {
                return Err(CompareError::InvalidParam(format!(
                    "unknown parameter '{}', expected one of: {}",
                    other,
                    Self::KEYS.join(", ")
                )))
            }
        };
        Ok(update)
    }

    pub fn key(&self) -> &'static str {
        match self {
            ParamUpdate::NegativePrompt(_) => "negative_prompt",
            ParamUpdate::Steps(_) => "steps",
            ParamUpdate::CfgScale(_) => "cfg_scale",
            ParamUpdate::Seed(_) => "seed",
            ParamUpdate::Sampler(_) => "sampler",
            ParamUpdate::Width(_) => "width",
            ParamUpdate::Height(_) => "height",
            ParamUpdate::LoraScale(_) => "lora_scale",
        }
    }
}

/// Parses `key=value`, as given on the command line.
impl FromStr for ParamUpdate {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s.split_once('=').ok_or_else(|| {
            CompareError::InvalidParam(format!("expected key=value, got '{}'", s))
        })?;
        ParamUpdate::parse(key, value)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        CompareError::InvalidParam(format!("'{}' is not a valid value for {}", value, key))
    })
}
