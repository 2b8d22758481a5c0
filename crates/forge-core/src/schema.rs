//! Response schema for the text model and validation of what comes back.
//!
//! Validation walks the raw JSON value so every failure names the exact
//! path that was missing or malformed. Typed entities are only built once
//! the whole document checks out.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::invention::{
    ChartData, Component, EnergyRequirement, InventionOutput, ModelParams, PropulsionPhase, Shape,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Payload was not JSON at all.
    InvalidJson(String),
    /// Required field absent, null, or an empty string.
    MissingField(String),
    WrongShape { path: String, expected: &'static str },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::InvalidJson(e) => write!(f, "response is not valid JSON: {e}"),
            SchemaError::MissingField(path) => write!(f, "missing required field `{path}`"),
            SchemaError::WrongShape { path, expected } => {
                write!(f, "field `{path}` should be {expected}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> Self {
        SchemaError::InvalidJson(e.to_string())
    }
}

/// A validated text-model response.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedResponse {
    pub invention_text: String,
    pub chart_data: ChartData,
    pub image_prompt: String,
    pub model_params: ModelParams,
    /// Clamped to [0, 100].
    pub stability_percentage: Option<f64>,
}

impl ParsedResponse {
    pub fn into_output(self, image_url: Option<String>) -> InventionOutput {
        InventionOutput {
            text: self.invention_text,
            image_url,
            chart_data: Some(self.chart_data),
            model_params: Some(self.model_params),
            stability_percentage: self.stability_percentage,
        }
    }
}

/// Drop a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => return rest.trim_end_matches('`').trim(),
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_response(raw: &str) -> Result<ParsedResponse, SchemaError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let root = object(&value, "$")?;

    let invention_text = non_empty_string(root, "inventionText", "inventionText")?;
    let chart_data = chart_data(required(root, "chartData", "chartData")?)?;
    let image_prompt = non_empty_string(root, "imagePrompt", "imagePrompt")?;
    let model_params = model_params(required(root, "modelParams", "modelParams")?)?;
    let stability_percentage = match root.get("stabilityPercentage") {
        None | Some(Value::Null) => None,
        Some(v) => Some(number(v, "stabilityPercentage")?.clamp(0.0, 100.0)),
    };

    Ok(ParsedResponse {
        invention_text,
        chart_data,
        image_prompt,
        model_params,
        stability_percentage,
    })
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value, SchemaError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(SchemaError::MissingField(path.to_string())),
        Some(v) => Ok(v),
    }
}

fn object<'a>(v: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    v.as_object().ok_or_else(|| SchemaError::WrongShape {
        path: path.to_string(),
        expected: "an object",
    })
}

fn array<'a>(v: &'a Value, path: &str) -> Result<&'a Vec<Value>, SchemaError> {
    v.as_array().ok_or_else(|| SchemaError::WrongShape {
        path: path.to_string(),
        expected: "an array",
    })
}

fn number(v: &Value, path: &str) -> Result<f64, SchemaError> {
    v.as_f64().ok_or_else(|| SchemaError::WrongShape {
        path: path.to_string(),
        expected: "a number",
    })
}

fn string(v: &Value, path: &str) -> Result<String, SchemaError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::WrongShape {
            path: path.to_string(),
            expected: "a string",
        })
}

fn non_empty_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, SchemaError> {
    let s = string(required(obj, key, path)?, path)?;
    if s.trim().is_empty() {
        return Err(SchemaError::MissingField(path.to_string()));
    }
    Ok(s)
}

fn vec3(v: &Value, path: &str) -> Result<[f64; 3], SchemaError> {
    let items = array(v, path)?;
    if items.len() != 3 {
        return Err(SchemaError::WrongShape {
            path: path.to_string(),
            expected: "an array of 3 numbers",
        });
    }
    Ok([
        number(&items[0], &format!("{path}[0]"))?,
        number(&items[1], &format!("{path}[1]"))?,
        number(&items[2], &format!("{path}[2]"))?,
    ])
}

fn number_at(obj: &Map<String, Value>, key: &str, parent: &str) -> Result<f64, SchemaError> {
    let path = format!("{parent}.{key}");
    number(required(obj, key, &path)?, &path)
}

fn string_at(obj: &Map<String, Value>, key: &str, parent: &str) -> Result<String, SchemaError> {
    let path = format!("{parent}.{key}");
    string(required(obj, key, &path)?, &path)
}

fn vec3_at(obj: &Map<String, Value>, key: &str, parent: &str) -> Result<[f64; 3], SchemaError> {
    let path = format!("{parent}.{key}");
    vec3(required(obj, key, &path)?, &path)
}

/// Each element of the array at `obj[key]` must be an object.
fn objects_at<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    parent: &str,
) -> Result<Vec<(String, &'a Map<String, Value>)>, SchemaError> {
    let path = format!("{parent}.{key}");
    array(required(obj, key, &path)?, &path)?
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<_, SchemaError> {
            let item_path = format!("{path}[{i}]");
            let o = object(item, &item_path)?;
            Ok((item_path, o))
        })
        .collect()
}

fn chart_data(v: &Value) -> Result<ChartData, SchemaError> {
    let obj = object(v, "chartData")?;

    let mut propulsion_phases = Vec::new();
    for (path, o) in objects_at(obj, "propulsionPhases", "chartData")? {
        propulsion_phases.push(PropulsionPhase {
            phase: string_at(o, "phase", &path)?,
            time_days: number_at(o, "time_days", &path)?,
            speed_c: number_at(o, "speed_c", &path)?,
        });
    }

    let mut energy_requirements = Vec::new();
    for (path, o) in objects_at(obj, "energyRequirements", "chartData")? {
        energy_requirements.push(EnergyRequirement {
            speed_c: number_at(o, "speed_c", &path)?,
            energy_j: number_at(o, "energy_j", &path)?,
        });
    }

    Ok(ChartData {
        propulsion_phases,
        energy_requirements,
    })
}

fn model_params(v: &Value) -> Result<ModelParams, SchemaError> {
    let obj = object(v, "modelParams")?;

    let mut components = Vec::new();
    for (path, o) in objects_at(obj, "components", "modelParams")? {
        components.push(Component {
            shape: Shape::from_tag(&string_at(o, "shape", &path)?),
            scale: vec3_at(o, "scale", &path)?,
            position: vec3_at(o, "position", &path)?,
            rotation: vec3_at(o, "rotation", &path)?,
        });
    }

    Ok(ModelParams {
        components,
        primary_color: string_at(obj, "primaryColor", "modelParams")?,
        secondary_color: string_at(obj, "secondaryColor", "modelParams")?,
    })
}

/// `responseSchema` for the text call, in the REST API's OpenAPI subset.
pub fn response_schema() -> Value {
    let number = || json!({ "type": "NUMBER" });
    let triple = |description: &str| {
        json!({ "type": "ARRAY", "items": { "type": "NUMBER" }, "description": description })
    };
    json!({
        "type": "OBJECT",
        "properties": {
            "inventionText": {
                "type": "STRING",
                "description": "The full markdown text for the invention, following the specified structure."
            },
            "chartData": {
                "type": "OBJECT",
                "properties": {
                    "propulsionPhases": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "phase": { "type": "STRING" },
                                "time_days": number(),
                                "speed_c": number()
                            },
                            "required": ["phase", "time_days", "speed_c"]
                        }
                    },
                    "energyRequirements": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "speed_c": number(),
                                "energy_j": number()
                            },
                            "required": ["speed_c", "energy_j"]
                        }
                    }
                },
                "required": ["propulsionPhases", "energyRequirements"]
            },
            "imagePrompt": {
                "type": "STRING",
                "description": "A highly descriptive prompt for the image generation model, based on the invention text."
            },
            "modelParams": {
                "type": "OBJECT",
                "description": "Parameters for a procedural 3D model of the invention.",
                "properties": {
                    "components": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "shape": {
                                    "type": "STRING",
                                    "description": "Primitive shape: 'box', 'sphere', 'cylinder', or 'cone'."
                                },
                                "scale": triple("[x, y, z] scale."),
                                "position": triple("[x, y, z] position."),
                                "rotation": triple("[x, y, z] Euler rotation in radians.")
                            },
                            "required": ["shape", "scale", "position", "rotation"]
                        }
                    },
                    "primaryColor": {
                        "type": "STRING",
                        "description": "Primary hex color code, e.g., '#888888'."
                    },
                    "secondaryColor": {
                        "type": "STRING",
                        "description": "Secondary hex color code, e.g., '#00ffff'."
                    }
                },
                "required": ["components", "primaryColor", "secondaryColor"]
            },
            "stabilityPercentage": {
                "type": "NUMBER",
                "description": "Estimated design stability from 0 to 100."
            }
        },
        "required": ["inventionText", "chartData", "imagePrompt", "modelParams"]
    })
}
