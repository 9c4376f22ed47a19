use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightingEffect {
    Sunlight,
    Shadows,
    SunlightAndShadows,
    RemoveSunlight,
    RemoveShadows,
    RemoveSunlightAndShadows,
    Unrecognized,
}

impl LightingEffect {
    #[cfg(test)]
    pub const ALL: [LightingEffect; 6] = [
        LightingEffect::Sunlight,
        LightingEffect::Shadows,
        LightingEffect::SunlightAndShadows,
        LightingEffect::RemoveSunlight,
        LightingEffect::RemoveShadows,
        LightingEffect::RemoveSunlightAndShadows,
    ];

    pub fn from_wire(value: &str) -> Self {
        match value {
            "sunlight" => LightingEffect::Sunlight,
            "shadows" => LightingEffect::Shadows,
            "sunlight-and-shadows" => LightingEffect::SunlightAndShadows,
            "remove-sunlight" => LightingEffect::RemoveSunlight,
            "remove-shadows" => LightingEffect::RemoveShadows,
            "remove-sunlight-and-shadows" => LightingEffect::RemoveSunlightAndShadows,
            _ => LightingEffect::Unrecognized,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LightingEffect::Sunlight => "sunlight",
            LightingEffect::Shadows => "shadows",
            LightingEffect::SunlightAndShadows => "sunlight-and-shadows",
            LightingEffect::RemoveSunlight => "remove-sunlight",
            LightingEffect::RemoveShadows => "remove-shadows",
            LightingEffect::RemoveSunlightAndShadows => "remove-sunlight-and-shadows",
            LightingEffect::Unrecognized => "unrecognized",
        }
    }

    /// Whether intensity and direction feed into the prompt.
    pub const fn uses_sunlight(self) -> bool {
        matches!(
            self,
            LightingEffect::Sunlight | LightingEffect::SunlightAndShadows
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SunlightIntensity {
    Natural,
    #[default]
    Bright,
    Intense,
}

impl SunlightIntensity {
    #[cfg(test)]
    pub const ALL: [SunlightIntensity; 3] = [
        SunlightIntensity::Natural,
        SunlightIntensity::Bright,
        SunlightIntensity::Intense,
    ];

    pub fn from_level(level: i64) -> Self {
        match level {
            1 => SunlightIntensity::Natural,
            2 => SunlightIntensity::Bright,
            3 => SunlightIntensity::Intense,
            _ => SunlightIntensity::default(),
        }
    }

    /// Accepts `2`, `2.0` and `"2"`; anything else is the default level.
    pub fn from_json(value: Option<&Value>) -> Self {
        let level = match value {
            Some(Value::Number(number)) => number.as_i64().or_else(|| {
                number
                    .as_f64()
                    .filter(|level| level.fract() == 0.0)
                    .map(|level| level as i64)
            }),
            Some(Value::String(text)) => text.parse::<i64>().ok(),
            _ => None,
        };
        level.map(Self::from_level).unwrap_or_default()
    }

    pub const fn level(self) -> u8 {
        match self {
            SunlightIntensity::Natural => 1,
            SunlightIntensity::Bright => 2,
            SunlightIntensity::Intense => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SunlightDirection {
    #[default]
    Top,
    Left,
    Right,
    Bottom,
    Center,
}

impl SunlightDirection {
    #[cfg(test)]
    pub const ALL: [SunlightDirection; 5] = [
        SunlightDirection::Top,
        SunlightDirection::Left,
        SunlightDirection::Right,
        SunlightDirection::Bottom,
        SunlightDirection::Center,
    ];

    pub fn from_wire(value: &str) -> Self {
        match value {
            "top" => SunlightDirection::Top,
            "left" => SunlightDirection::Left,
            "right" => SunlightDirection::Right,
            "bottom" => SunlightDirection::Bottom,
            "center" => SunlightDirection::Center,
            _ => SunlightDirection::default(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SunlightDirection::Top => "top",
            SunlightDirection::Left => "left",
            SunlightDirection::Right => "right",
            SunlightDirection::Bottom => "bottom",
            SunlightDirection::Center => "center",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectRequest {
    pub effect: LightingEffect,
    pub intensity: SunlightIntensity,
    pub direction: SunlightDirection,
}

impl EffectRequest {
    pub fn new(
        effect: LightingEffect,
        intensity: SunlightIntensity,
        direction: SunlightDirection,
    ) -> Self {
        Self {
            effect,
            intensity,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_effects_and_falls_back_for_unknown_ones() {
        for effect in LightingEffect::ALL {
            assert_eq!(LightingEffect::from_wire(effect.as_str()), effect);
        }
        for value in ["SUNLIGHT", " remove-shadows ", "Remove-Shadows"] {
            assert_eq!(
                LightingEffect::from_wire(value),
                LightingEffect::Unrecognized,
                "value {value:?}"
            );
        }
        assert_eq!(
            LightingEffect::from_wire("moonlight"),
            LightingEffect::Unrecognized
        );
    }

    #[test]
    fn intensity_accepts_numbers_and_numeric_strings() {
        assert_eq!(
            SunlightIntensity::from_json(Some(&json!(3))),
            SunlightIntensity::Intense
        );
        assert_eq!(
            SunlightIntensity::from_json(Some(&json!("1"))),
            SunlightIntensity::Natural
        );
        assert_eq!(
            SunlightIntensity::from_json(Some(&json!(1.0))),
            SunlightIntensity::Natural
        );
        assert_eq!(
            SunlightIntensity::from_json(Some(&json!(3.0))),
            SunlightIntensity::Intense
        );
    }

    #[test]
    fn intensity_out_of_range_is_bright() {
        for value in [
            json!(0),
            json!(4),
            json!(-1),
            json!(2.5),
            json!(" 1 "),
            json!("1.0"),
            json!("high"),
            json!(null),
        ] {
            assert_eq!(
                SunlightIntensity::from_json(Some(&value)),
                SunlightIntensity::Bright,
                "value {value}"
            );
        }
        assert_eq!(SunlightIntensity::from_json(None), SunlightIntensity::Bright);
    }

    #[test]
    fn unknown_direction_is_top() {
        assert_eq!(SunlightDirection::from_wire("diagonal"), SunlightDirection::Top);
        assert_eq!(SunlightDirection::from_wire(""), SunlightDirection::Top);
        assert_eq!(SunlightDirection::from_wire("CENTER"), SunlightDirection::Top);
        assert_eq!(SunlightDirection::from_wire("Center"), SunlightDirection::Top);
        assert_eq!(SunlightDirection::from_wire(" left"), SunlightDirection::Top);
        assert_eq!(SunlightDirection::from_wire("center"), SunlightDirection::Center);
    }
}
