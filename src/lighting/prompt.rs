use super::types::{EffectRequest, LightingEffect, SunlightDirection, SunlightIntensity};

const FALLBACK_PROMPT: &str = "Apply a subtle photorealistic lighting improvement to the image.";

fn direction_phrase(direction: SunlightDirection) -> &'static str {
    match direction {
        SunlightDirection::Top => "from the top",
        SunlightDirection::Left => "from the left",
        SunlightDirection::Right => "from the right",
        SunlightDirection::Bottom => "from the bottom",
        SunlightDirection::Center => "emanating from the center, like a spotlight",
    }
}

fn intensity_phrase(intensity: SunlightIntensity) -> &'static str {
    match intensity {
        SunlightIntensity::Natural => "natural, realistic sunlight",
        SunlightIntensity::Bright => "bright, vibrant sunlight",
        SunlightIntensity::Intense => "intense, dramatic sunlight with strong highlights",
    }
}

pub fn build_lighting_prompt(
    effect: LightingEffect,
    intensity: SunlightIntensity,
    direction: SunlightDirection,
) -> String {
    match effect {
        LightingEffect::Sunlight => format!(
            "Add photorealistic, {} to this image. The light source should be coming {}. \
             Ensure the highlights and shadows are consistent with this light direction.",
            intensity_phrase(intensity),
            direction_phrase(direction)
        ),
        LightingEffect::Shadows => "Add deep, natural-looking photorealistic shadows to this image. \
             The shadows should add a sense of drama and depth to the scene."
            .to_string(),
        LightingEffect::SunlightAndShadows => format!(
            "Add both photorealistic, {} and deep, natural-looking shadows to this image. \
             The light source should be coming {}.",
            intensity_phrase(intensity),
            direction_phrase(direction)
        ),
        LightingEffect::RemoveSunlight => "Recreate the image with neutral, diffuse lighting, \
             removing harsh highlights of direct sunlight."
            .to_string(),
        LightingEffect::RemoveShadows => "Recreate the image by filling in and softening deep shadows, \
             making lighting balanced across the scene."
            .to_string(),
        LightingEffect::RemoveSunlightAndShadows => "Neutralize lighting: remove strong highlights \
             and deep shadows, produce a flat, diffuse-lit image."
            .to_string(),
        LightingEffect::Unrecognized => FALLBACK_PROMPT.to_string(),
    }
}

pub fn prompt_for(request: &EffectRequest) -> String {
    build_lighting_prompt(request.effect, request.intensity, request.direction)
}
