//! Partial (subset) JSON matching
//!
//! `expected` matches `actual` when every field it names is present in
//! `actual` with a matching value. Extra fields in `actual` are ignored.
//! Arrays match when each expected element matches some actual element.

use std::fmt;

use serde_json::Value;

/// Where and why a partial match failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// JSON pointer to the failing location (empty for the root)
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "at body root: {}", self.reason)
        } else {
            write!(f, "at '{}': {}", self.path, self.reason)
        }
    }
}

/// Check that `actual` comprises `expected`
pub fn partial_match(expected: &Value, actual: &Value) -> Result<(), Mismatch> {
    match_at(expected, actual, &mut String::new())
}

fn match_at(expected: &Value, actual: &Value, path: &mut String) -> Result<(), Mismatch> {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => {
            for (key, expected_value) in expected {
                let len = path.len();
                path.push('/');
                path.push_str(&escape_token(key));
                match actual.get(key) {
                    Some(actual_value) => match_at(expected_value, actual_value, path)?,
                    None => {
                        return Err(Mismatch {
                            path: path.clone(),
                            reason: format!("missing field, expected {}", expected_value),
                        })
                    }
                }
                path.truncate(len);
            }
            Ok(())
        }
        (Value::Array(expected), Value::Array(actual)) => {
            for (idx, expected_item) in expected.iter().enumerate() {
                let found = actual
                    .iter()
                    .any(|actual_item| match_at(expected_item, actual_item, &mut path.clone()).is_ok());
                if !found {
                    return Err(Mismatch {
                        path: format!("{}/{}", path, idx),
                        reason: format!("no element matching {}", expected_item),
                    });
                }
            }
            Ok(())
        }
        (Value::Number(e), Value::Number(a)) => {
            let equal = match (e.as_i64(), a.as_i64()) {
                (Some(e), Some(a)) => e == a,
                _ => e.as_f64() == a.as_f64(),
            };
            if equal {
                Ok(())
            } else {
                Err(mismatch(path, expected, actual))
            }
        }
        _ if expected == actual => Ok(()),
        _ => Err(mismatch(path, expected, actual)),
    }
}

fn mismatch(path: &str, expected: &Value, actual: &Value) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        reason: format!("expected {}, got {}", expected, actual),
    }
}

/// RFC 6901 escaping for a pointer token
fn escape_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
