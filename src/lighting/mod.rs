pub mod prompt;
pub mod types;

pub use prompt::prompt_for;
pub use types::{EffectRequest, LightingEffect, SunlightDirection, SunlightIntensity};
