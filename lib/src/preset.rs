//! Preset snapshots and their JSON documents
//!
//! Loading is lenient per field: a document only fails as a whole when it is
//! not JSON or not an object. A missing, `null` or malformed field reads as
//! absent and leaves the live setting untouched on [`PresetStore::apply`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;

use crate::color::Rgb;
use crate::error::{Result, StreamError};
use crate::render::FontMetrics;
use crate::settings::{
    BRIGHTNESS_RANGE, CONTRAST_RANGE, DESATURATION_RANGE, GradientInfo, POSITION_RANGE, Settings,
};

/// Flat record of every style parameter; field names match the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse_ele: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desaturate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_ele: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast_ele: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desaturation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient_info: Option<GradientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_width: Option<f32>,
}

impl PresetInfo {
    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        *self == PresetInfo::default()
    }
}

/// Serializes a preset; absent fields are omitted
pub fn serialize(preset: &PresetInfo) -> Result<String> {
    Ok(serde_json::to_string_pretty(preset)?)
}

/// Parses a preset document
///
/// # Errors
/// `StreamError::Serialization` if the text is not JSON or not an object.
pub fn deserialize(text: &str) -> Result<PresetInfo> {
    let fields = parse_object(text, "preset")?;

    Ok(PresetInfo {
        inverse_ele: read_bool(&fields, "inverseEle"),
        desaturate: read_bool(&fields, "desaturate"),
        brightness_ele: read_ranged(&fields, "brightnessEle", &BRIGHTNESS_RANGE),
        contrast_ele: read_ranged(&fields, "contrastEle", &CONTRAST_RANGE),
        desaturation: read_ranged(&fields, "desaturation", &DESATURATION_RANGE),
        gradient_info: match fields.get("gradientInfo") {
            None | Some(Value::Null) => None,
            Some(Value::Object(inner)) => Some(read_gradient(inner)),
            Some(other) => {
                log::warn!("skipping preset field `gradientInfo`: expected an object, got {other}");
                None
            }
        },
        font_size: positive("fontSize", read_number(&fields, "fontSize")),
        font_family: read_string(&fields, "fontFamily"),
        line_height: positive("lineHeight", read_number(&fields, "lineHeight")),
        char_width: positive("charWidth", read_number(&fields, "charWidth")),
    })
}

pub fn serialize_gradient(gradient: &GradientInfo) -> Result<String> {
    Ok(serde_json::to_string_pretty(gradient)?)
}

/// Parses a gradient document with the same per-field leniency as presets
pub fn deserialize_gradient(text: &str) -> Result<GradientInfo> {
    let fields = parse_object(text, "gradient")?;
    Ok(read_gradient(&fields))
}

fn parse_object(text: &str, what: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StreamError::Serialization(format!(
            "{what} document must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn read_gradient(fields: &Map<String, Value>) -> GradientInfo {
    checked_gradient(&GradientInfo {
        color1: read_color(fields, "color1"),
        color2: read_color(fields, "color2"),
        color3: read_color(fields, "color3"),
        color_position1: read_number(fields, "colorPosition1"),
        color_position2: read_number(fields, "colorPosition2"),
        color_position3: read_number(fields, "colorPosition3"),
    })
}

/// Copy with out-of-range positions dropped to absent
fn checked_gradient(info: &GradientInfo) -> GradientInfo {
    GradientInfo {
        color_position1: within("colorPosition1", info.color_position1, &POSITION_RANGE),
        color_position2: within("colorPosition2", info.color_position2, &POSITION_RANGE),
        color_position3: within("colorPosition3", info.color_position3, &POSITION_RANGE),
        ..info.clone()
    }
}

/// Drops a value outside its slider range, logging it
fn within(key: &str, value: Option<f32>, range: &RangeInclusive<f32>) -> Option<f32> {
    value.filter(|v| {
        let accepted = range.contains(v);
        if !accepted {
            log::warn!("skipping out-of-range field `{key}`: {v} not in {range:?}");
        }
        accepted
    })
}

fn positive(key: &str, value: Option<f32>) -> Option<f32> {
    value.filter(|v| {
        if *v <= 0.0 {
            log::warn!("skipping non-positive field `{key}`: {v}");
        }
        *v > 0.0
    })
}

fn read_ranged(fields: &Map<String, Value>, key: &str, range: &RangeInclusive<f32>) -> Option<f32> {
    within(key, read_number(fields, key), range)
}

/// Reads an optional field, logging and dropping values `parse` rejects
fn read_field<T>(
    fields: &Map<String, Value>,
    key: &str,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let parsed = parse(value);
            if parsed.is_none() {
                log::warn!("skipping malformed field `{key}`: {value}");
            }
            parsed
        }
    }
}

// Slider values were historically saved as strings ("42"), so both forms load.
fn read_number(fields: &Map<String, Value>, key: &str) -> Option<f32> {
    read_field(fields, key, |value| {
        let number = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        let number = number as f32;
        number.is_finite().then_some(number)
    })
}

fn read_bool(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    read_field(fields, key, |value| match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn read_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    read_field(fields, key, |value| value.as_str().map(str::to_string))
}

fn read_color(fields: &Map<String, Value>, key: &str) -> Option<Rgb> {
    read_field(fields, key, |value| value.as_str()?.parse().ok())
}

/// Owns the live settings and moves them in and out of presets
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    settings: Settings,
}

impl PresetStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Reads every setting into a preset with all fields present
    pub fn snapshot(&self) -> PresetInfo {
        let s = &self.settings;
        PresetInfo {
            inverse_ele: Some(s.inverse),
            desaturate: Some(s.desaturate),
            brightness_ele: Some(s.brightness),
            contrast_ele: Some(s.contrast),
            desaturation: Some(s.desaturation),
            gradient_info: Some(s.gradient.clone()),
            font_size: Some(s.font.size),
            font_family: Some(s.font.family.clone()),
            line_height: Some(s.font.line_height),
            char_width: Some(s.font.char_width),
        }
    }

    /// Writes every present field back; absent fields stay as they are.
    /// Values outside their slider range are skipped the same way.
    pub fn apply(&mut self, preset: &PresetInfo) {
        let s = &mut self.settings;
        if let Some(v) = preset.inverse_ele {
            s.inverse = v;
        }
        if let Some(v) = preset.desaturate {
            s.desaturate = v;
        }
        if let Some(v) = within("brightnessEle", preset.brightness_ele, &BRIGHTNESS_RANGE) {
            s.brightness = v;
        }
        if let Some(v) = within("contrastEle", preset.contrast_ele, &CONTRAST_RANGE) {
            s.contrast = v;
        }
        if let Some(v) = within("desaturation", preset.desaturation, &DESATURATION_RANGE) {
            s.desaturation = v;
        }
        if let Some(gradient) = &preset.gradient_info {
            s.gradient.merge(&checked_gradient(gradient));
        }

        let font: &mut FontMetrics = &mut s.font;
        if let Some(v) = positive("fontSize", preset.font_size) {
            font.size = v;
        }
        if let Some(v) = &preset.font_family {
            font.family = v.clone();
        }
        if let Some(v) = positive("lineHeight", preset.line_height) {
            font.line_height = v;
        }
        if let Some(v) = positive("charWidth", preset.char_width) {
            font.char_width = v;
        }
        log::debug!("applied preset {preset:?}");
    }

    /// Snapshot serialized as a preset document
    pub fn save_json(&self) -> Result<String> {
        serialize(&self.snapshot())
    }

    /// Parses a preset document and applies it
    pub fn load_json(&mut self, text: &str) -> Result<PresetInfo> {
        let preset = deserialize(text)?;
        self.apply(&preset);
        Ok(preset)
    }
}
