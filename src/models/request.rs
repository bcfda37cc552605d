use crate::error::{CompareError, Result};
use crate::models::GenerationParams;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Which of the two compared models a request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTarget {
    Base,
    Trained,
}

impl ModelTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTarget::Base => "base",
            ModelTarget::Trained => "trained",
        }
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field naming used for the trained model payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `steps`, `cfg_scale` and `sampler`, as the web form names them.
    #[default]
    Ui,
    /// `num_inference_steps` and `guidance_scale`, as diffusers pipelines
    /// name them, plus the `trained` switch. No sampler.
    Diffusers,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Ui => "ui",
            WireFormat::Diffusers => "diffusers",
        }
    }

    pub fn base_payload(&self, prompt: &str) -> Value {
        json!({ "prompt": prompt })
    }

    pub fn trained_payload(&self, prompt: &str, params: &GenerationParams) -> Value {
        match self {
            WireFormat::Ui => json!({
                "prompt": prompt,
                "negative_prompt": params.negative_prompt,
                "steps": params.steps,
                "cfg_scale": params.cfg_scale,
                "seed": params.seed,
                "sampler": params.sampler,
                "width": params.width,
                "height": params.height,
                "lora_scale": params.lora_scale
            }),
            WireFormat::Diffusers => json!({
                "prompt": prompt,
                "negative_prompt": params.negative_prompt,
                "num_inference_steps": params.steps,
                "guidance_scale": params.cfg_scale,
                "seed": params.seed,
                "width": params.width,
                "height": params.height,
                "lora_scale": params.lora_scale,
                "trained": true
            }),
        }
    }

    pub fn payload(&self, target: ModelTarget, prompt: &str, params: &GenerationParams) -> Value {
        match target {
            ModelTarget::Base => self.base_payload(prompt),
            ModelTarget::Trained => self.trained_payload(prompt, params),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ui" => Ok(WireFormat::Ui),
            "diffusers" => Ok(WireFormat::Diffusers),
            other => Err(CompareError::Config(format!(
                "unknown wire format '{}', expected 'ui' or 'diffusers'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamUpdate, Sampler};

    #[test]
    fn test_base_payload_is_prompt_only() {
        let payload = WireFormat::Ui.payload(
            ModelTarget::Base,
            "a red fox",
            &GenerationParams::default().with(ParamUpdate::Steps(70)),
        );
        assert_eq!(payload, json!({ "prompt": "a red fox" }));
        assert_eq!(
            WireFormat::Diffusers.base_payload("a red fox"),
            json!({ "prompt": "a red fox" })
        );
    }

    #[test]
    fn test_ui_trained_payload_defaults() {
        let payload = WireFormat::Ui.trained_payload("a red fox", &GenerationParams::default());
        assert_eq!(
            payload,
            json!({
                "prompt": "a red fox",
                "negative_prompt": "",
                "steps": 30,
                "cfg_scale": 7.0,
                "seed": -1,
                "sampler": "DPM++ 2M",
                "width": 512,
                "height": 512,
                "lora_scale": 1.0
            })
        );
    }

    #[test]
    fn test_diffusers_trained_payload_defaults() {
        let payload =
            WireFormat::Diffusers.trained_payload("a red fox", &GenerationParams::default());
        assert_eq!(payload["num_inference_steps"], 30);
        assert_eq!(payload["guidance_scale"], 7.0);
        assert_eq!(payload["seed"], -1);
        assert_eq!(payload["width"], 512);
        assert_eq!(payload["height"], 512);
        assert_eq!(payload["lora_scale"], 1.0);
        assert_eq!(payload["trained"], true);
        assert!(payload.get("steps").is_none());
        assert!(payload.get("cfg_scale").is_none());
        assert!(payload.get("sampler").is_none());
    }

    #[test]
    fn test_trained_payload_follows_params() {
        let params = GenerationParams::default().with_all([
            ParamUpdate::NegativePrompt("blurry".into()),
            ParamUpdate::CfgScale(7.5),
            ParamUpdate::Seed(1234),
            ParamUpdate::Sampler(Sampler::Euler),
            ParamUpdate::LoraScale(0.75),
        ]);
        let payload = WireFormat::Ui.trained_payload("maze", &params);
        assert_eq!(payload["negative_prompt"], "blurry");
        assert_eq!(payload["cfg_scale"], 7.5);
        assert_eq!(payload["seed"], 1234);
        assert_eq!(payload["sampler"], "Euler");
        assert_eq!(payload["lora_scale"], 0.75);
    }

    #[test]
    fn test_wire_format_from_str() {
        assert_eq!("UI".parse::<WireFormat>().unwrap(), WireFormat::Ui);
        assert_eq!(
            " diffusers ".parse::<WireFormat>().unwrap(),
            WireFormat::Diffusers
        );
        assert!(matches!(
            "snake".parse::<WireFormat>(),
            Err(CompareError::Config(_))
        ));
    }
}
