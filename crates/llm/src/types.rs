//! Sampling parameter types.
//!
//! Hosts hand sampling parameters through from end users, so values are
//! clamped into the backend's accepted ranges instead of being rejected.

use serde::{Deserialize, Serialize};

/// Sentinel used by hosts for "unset" integer parameters.
pub const UNSET: i64 = -1;

pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 2.0);
pub const TOP_P_RANGE: (f32, f32) = (0.0, 1.0);
pub const TOP_K_RANGE: (u32, u32) = (1, 100);
pub const REPEAT_PENALTY_RANGE: (f32, f32) = (0.5, 2.0);

/// Sampling parameters as supplied by the host.
///
/// `seed` and `num_predict` use `-1` to mean "let the backend decide".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Temperature for sampling (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-p nucleus sampling (0.0 - 1.0)
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Top-k sampling (1 - 100)
    #[serde(default = "default_top_k")]
    pub top_k: i64,

    /// Repetition penalty (0.5 - 2.0)
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    /// RNG seed, -1 for random
    #[serde(default = "default_unset")]
    pub seed: i64,

    /// Maximum tokens to generate, -1 for unbounded
    #[serde(default = "default_unset")]
    pub num_predict: i64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> i64 {
    40
}

fn default_repeat_penalty() -> f32 {
    1.1
}

fn default_unset() -> i64 {
    UNSET
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            repeat_penalty: default_repeat_penalty(),
            seed: UNSET,
            num_predict: UNSET,
        }
    }
}

impl SamplingParams {
    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the generation budget.
    pub fn with_num_predict(mut self, num_predict: i64) -> Self {
        self.num_predict = num_predict;
        self
    }

    /// Clamp every field into its valid range.
    ///
    /// Non-finite floats fall back to the defaults. `seed == -1` and
    /// `num_predict < 1` become `None`.
    pub fn resolve(&self) -> ResolvedSampling {
        let defaults = Self::default();

        ResolvedSampling {
            temperature: clamp_f32(self.temperature, TEMPERATURE_RANGE, defaults.temperature),
            top_p: clamp_f32(self.top_p, TOP_P_RANGE, defaults.top_p),
            top_k: self
                .top_k
                .clamp(TOP_K_RANGE.0 as i64, TOP_K_RANGE.1 as i64) as u32,
            repeat_penalty: clamp_f32(
                self.repeat_penalty,
                REPEAT_PENALTY_RANGE,
                defaults.repeat_penalty,
            ),
            seed: (self.seed != UNSET).then_some(self.seed),
            num_predict: (self.num_predict >= 1).then_some(self.num_predict),
        }
    }
}

fn clamp_f32(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Sampling parameters after clamping, ready for a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedSampling {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_through() {
        let resolved = SamplingParams::default().resolve();
        assert_eq!(resolved.temperature, 0.7);
        assert_eq!(resolved.top_p, 0.9);
        assert_eq!(resolved.top_k, 40);
        assert_eq!(resolved.repeat_penalty, 1.1);
        assert_eq!(resolved.seed, None);
        assert_eq!(resolved.num_predict, None);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = SamplingParams {
            temperature: 5.0,
            top_p: -0.3,
            top_k: 0,
            repeat_penalty: 9.0,
            seed: 42,
            num_predict: 256,
        };

        let resolved = params.resolve();
        assert_eq!(resolved.temperature, 2.0);
        assert_eq!(resolved.top_p, 0.0);
        assert_eq!(resolved.top_k, 1);
        assert_eq!(resolved.repeat_penalty, 2.0);
        assert_eq!(resolved.seed, Some(42));
        assert_eq!(resolved.num_predict, Some(256));
    }

    #[test]
    fn test_top_k_upper_bound() {
        let params = SamplingParams {
            top_k: 5000,
            ..Default::default()
        };
        assert_eq!(params.resolve().top_k, 100);
    }

    #[test]
    fn test_non_finite_falls_back_to_default() {
        let params = SamplingParams {
            temperature: f32::NAN,
            repeat_penalty: f32::INFINITY,
            ..Default::default()
        };
        let resolved = params.resolve();
        assert_eq!(resolved.temperature, 0.7);
        assert_eq!(resolved.repeat_penalty, 1.1);
    }

    #[test]
    fn test_non_positive_num_predict_is_unset() {
        let params = SamplingParams::default().with_num_predict(0);
        assert_eq!(params.resolve().num_predict, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: SamplingParams = serde_json::from_str(r#"{"temperature": 0.2}"#).unwrap();
        assert_eq!(params.temperature, 0.2);
        assert_eq!(params.top_k, 40);
        assert_eq!(params.seed, UNSET);
    }

    #[test]
    fn test_resolved_skips_unset_fields() {
        let json = serde_json::to_value(SamplingParams::default().resolve()).unwrap();
        assert!(json.get("seed").is_none());
        assert!(json.get("num_predict").is_none());
        assert_eq!(json["top_k"], 40);
    }
}
