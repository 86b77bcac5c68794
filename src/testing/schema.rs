//! JSON Schema validation of response bodies

use jsonschema::{draft201909, draft202012, draft4, draft6, draft7, Validator};
use serde_json::Value;

use crate::common::{Error, Result};

const DRAFT4: &str = "http://json-schema.org/draft-04/schema";
const DRAFT6: &str = "http://json-schema.org/draft-06/schema";
const DRAFT7: &str = "http://json-schema.org/draft-07/schema";
const DRAFT201909: &str = "https://json-schema.org/draft/2019-09/schema";
const DRAFT202012: &str = "https://json-schema.org/draft/2020-12/schema";

/// Compile a schema, picking the draft from `$schema` (2020-12 when absent)
pub fn compile(schema: &Value) -> Result<Validator> {
    let dialect = schema
        .get("$schema")
        .and_then(Value::as_str)
        .map(normalize_dialect)
        .unwrap_or_else(|| DRAFT202012.to_string());

    let compiled = match dialect.as_str() {
        DRAFT4 => draft4::new(schema),
        DRAFT6 => draft6::new(schema),
        DRAFT7 => draft7::new(schema),
        DRAFT201909 => draft201909::new(schema),
        DRAFT202012 => draft202012::new(schema),
        other => {
            return Err(Error::InvalidSchema(format!(
                "unknown schema dialect: {}",
                other
            )))
        }
    };
    compiled.map_err(|e| Error::InvalidSchema(e.to_string()))
}

/// Validate `instance`, collecting every violation
///
/// Returns `Ok(Err(violations))` when the body does not conform, and `Err`
/// only when the schema itself is unusable.
pub fn validate(schema: &Value, instance: &Value) -> Result<std::result::Result<(), Vec<String>>> {
    let validator = compile(schema)?;
    let violations: Vec<String> = validator
        .iter_errors(instance)
        .map(|error| error.to_string())
        .collect();
    if violations.is_empty() {
        Ok(Ok(()))
    } else {
        Ok(Err(violations))
    }
}

/// Drop a trailing `#` and move http/https variants onto the canonical form
fn normalize_dialect(id: &str) -> String {
    let id = id.trim_end_matches('#');
    let modern = id.contains("/draft/");
    let rest = id
        .strip_prefix("https://")
        .or_else(|| id.strip_prefix("http://"))
        .unwrap_or(id);
    if modern {
        format!("https://{}", rest)
    } else {
        format!("http://{}", rest)
    }
}
