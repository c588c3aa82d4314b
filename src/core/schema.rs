//! Book schema: addressing scheme, section names and offset markers.

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::adapters::{encode_title, fetch_json, Fetcher};
use crate::domain::BookSchema;
use crate::error::IngestError;

/// Marker of cumulative verse numbering on a schema node
const OFFSET_MARKER: &str = "index_offsets_by_depth";

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}

fn strings<'a>(node: &'a Value, key: &str) -> impl Iterator<Item = String> + 'a {
    node.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
}

fn children(node: &Value) -> impl Iterator<Item = &Value> {
    node.get("nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|child| child.is_object())
}

/// Walk a schema node and its `nodes` depth first
fn visit(node: &Value, schema: &mut BookSchema) {
    for address_type in strings(node, "addressTypes") {
        push_unique(&mut schema.address_types, &address_type);
    }
    for section in strings(node, "sectionNames") {
        push_unique(&mut schema.section_names, &section);
    }
    if node.get(OFFSET_MARKER).is_some() {
        schema.offsetting = true;
    }
    for child in children(node) {
        visit(child, schema);
    }
}

/// Decode a `/v2/raw/index/{title}` payload
pub fn parse_schema(title: &str, payload: &Value) -> Result<BookSchema, IngestError> {
    let node = payload
        .get("schema")
        .filter(|schema| schema.is_object())
        .ok_or_else(|| IngestError::Schema {
            title: title.to_string(),
            message: "missing 'schema' object".to_string(),
        })?;

    let mut schema = BookSchema {
        categories: strings(payload, "categories").collect(),
        ..Default::default()
    };
    visit(node, &mut schema);

    if schema.address_types.is_empty() {
        debug!(title, "Schema has no addressTypes");
    }
    if schema.section_names.is_empty() {
        debug!(title, "Schema has no sectionNames");
    }

    Ok(schema)
}

/// Fetch the schema of a book.
///
/// Any failure falls back to the default schema (not Talmud, no offsets).
#[instrument(skip(fetcher))]
pub async fn load_schema(fetcher: &dyn Fetcher, title: &str) -> BookSchema {
    let path = format!("/v2/raw/index/{}", encode_title(title));
    let result = match fetch_json(fetcher, &path).await {
        Ok(payload) => parse_schema(title, &payload),
        Err(e) => Err(e),
    };

    match result {
        Ok(schema) => {
            debug!(
                talmud = schema.is_talmud(),
                offsetting = schema.offsetting,
                "Loaded schema"
            );
            schema
        }
        Err(e) => {
            warn!(error = %e, "Schema unavailable, assuming defaults");
            BookSchema::default()
        }
    }
}

/// Hebrew name of a schema section, unknown names unchanged
pub fn translate_section(name: &str) -> String {
    match name.trim() {
        "Chapter" => "פרק",
        "Verse" | "Pasuk" => "פסוק",
        "Daf" => "דף",
        "Line" => "שורה",
        "Paragraph" | "Seif" => "סעיף",
        "Siman" => "סימן",
        other => other,
    }
    .to_string()
}

pub fn translate_sections(names: &[String]) -> Vec<String> {
    names.iter().map(|name| translate_section(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_talmud_schema() {
        let payload = json!({
            "title": "Berakhot",
            "categories": ["Talmud", "Bavli", "Seder Zeraim"],
            "schema": {
                "addressTypes": ["Talmud", "Integer"],
                "sectionNames": ["Daf", "Line"]
            }
        });

        let schema = parse_schema("Berakhot", &payload).unwrap();
        assert!(schema.is_talmud());
        assert!(!schema.offsetting);
        assert_eq!(schema.section_names, vec!["Daf", "Line"]);
        assert_eq!(schema.categories, vec!["Talmud", "Bavli", "Seder Zeraim"]);
    }

    #[test]
    fn test_nested_nodes_and_offsets() {
        let payload = json!({
            "schema": {
                "nodes": [
                    {"addressTypes": ["Integer"], "sectionNames": ["Chapter", "Paragraph"]},
                    {
                        "nodes": [{
                            "addressTypes": ["Integer", "Integer"],
                            "sectionNames": ["Chapter", "Paragraph"],
                            "index_offsets_by_depth": {"1": [0, 10, 15]}
                        }]
                    },
                    "ignored"
                ]
            }
        });

        let schema = parse_schema("Kuzari", &payload).unwrap();
        assert!(schema.offsetting);
        assert!(!schema.is_talmud());
        assert_eq!(schema.address_types, vec!["Integer"]);
        assert_eq!(schema.section_names, vec!["Chapter", "Paragraph"]);
    }

    #[test]
    fn test_missing_schema_is_error() {
        let err = parse_schema("Nothing", &json!({"error": "x"})).unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
    }

    #[test]
    fn test_translate_sections() {
        let names = vec![
            "Chapter".to_string(),
            "Verse".to_string(),
            "Daf".to_string(),
            "Volume".to_string(),
        ];
        assert_eq!(translate_sections(&names), vec!["פרק", "פסוק", "דף", "Volume"]);
    }
}
