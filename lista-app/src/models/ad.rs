//! Ad definition models
//!
//! [`AdDefinition`] is the file consumed by the external publisher. Field
//! order is preserved on serialization. Metadata arriving from the UI is
//! loosely typed JSON, so conversion is lenient: unparsable optional values
//! are omitted instead of failing the submit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Image glob written into every ad definition
pub const CROPPED_IMAGES_GLOB: &str = "cropped_*.jpg";

/// Contact block of an ad definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub street: String,
    pub zipcode: String,
    pub phone: String,
}

/// Ad definition file contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdDefinition {
    pub active: bool,
    #[serde(rename = "type")]
    pub ad_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    pub price_type: String,
    pub shipping_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_costs: Option<f64>,
    pub shipping_options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_directly: Option<bool>,
    pub contact: Contact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_attributes: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub republication_interval: Option<i64>,
    pub images: Vec<String>,
}

impl AdDefinition {
    /// Build an ad definition from UI metadata
    pub fn from_metadata(md: &Map<String, Value>) -> Self {
        let contact = match md.get("contact") {
            Some(Value::Object(c)) => Contact {
                name: text(c.get("name")),
                street: text(c.get("street")),
                zipcode: text(c.get("zipcode")),
                phone: text(c.get("phone")),
            },
            _ => Contact::default(),
        };

        let shipping_options = match md.get("shipping_options") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| text(Some(v)))
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let special_attributes = match md.get("special_attributes") {
            Some(Value::Object(map)) => Some(map.clone()),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                match serde_json::from_str::<Value>(s) {
                    Ok(Value::Object(map)) => Some(map),
                    _ => None,
                }
            }
            _ => None,
        };

        Self {
            active: true,
            ad_type: upper_or(md.get("type"), "OFFER"),
            title: text(md.get("title")),
            description: text(md.get("description")),
            category: text(md.get("category")),
            price: safe_int(md.get("price")),
            price_type: upper_or(md.get("price_type"), "NEGOTIABLE"),
            shipping_type: upper_or(md.get("shipping_type"), "SHIPPING"),
            shipping_costs: safe_float(md.get("shipping_costs")),
            shipping_options,
            sell_directly: md.get("sell_directly").and_then(truthy),
            contact,
            special_attributes,
            republication_interval: safe_int(md.get("republication_interval")),
            images: vec![CROPPED_IMAGES_GLOB.to_string()],
        }
    }
}

/// Trimmed string form of a scalar; empty for null, missing or composite values
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn upper_or(value: Option<&Value>, default: &str) -> String {
    let s = text(value);
    if s.is_empty() {
        default.to_string()
    } else {
        s.to_uppercase()
    }
}

/// Integer parse accepting numbers and numeric strings
pub fn safe_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn safe_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Some(matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )),
        Value::Array(a) => Some(!a.is_empty()),
        Value::Object(o) => Some(!o.is_empty()),
    }
}

/// Pending ad summary listed in the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAd {
    /// Ad directory relative to the pending root
    pub dir: String,
    /// Ad definition file name
    pub file: String,
    pub title: String,
    pub category: String,
    pub price: Option<i64>,
}

/// Listing draft produced from a voice memo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(rename = "type")]
    pub ad_type: String,
    pub price_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: i64,
    pub shipping_type: String,
    pub sell_directly: bool,
}
