//! Decoding of the compact query-string form clients send for searches.
//!
//! A query string is a `&`-separated list of segments. A segment holding a JSON
//! object is merged into the result as-is; a `key=value` segment adds a string
//! value. Later segments overwrite earlier keys. Percent-decoding is expected to
//! have happened in the HTTP layer.

use serde_json::Value;

use crate::value::RawQuery;

pub fn decode_query(encoded: &str) -> RawQuery {
    let mut decoded = RawQuery::new();

    for segment in encoded.split('&').filter(|segment| !segment.is_empty()) {
        match serde_json::from_str::<Value>(segment) {
            Ok(Value::Object(object)) => decoded.extend(object),
            Ok(_) => {}
            Err(_) => {
                if let Some((key, value)) = segment.split_once('=') {
                    decoded.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
        }
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_key_value_pairs_as_strings() {
        let decoded = decode_query("name=A&grade=1");

        assert_eq!(Value::Object(decoded), json!({ "name": "A", "grade": "1" }));
    }

    #[test]
    fn merges_json_segments() {
        let decoded = decode_query(r#"{"grade": 1, "type": ["lab"]}&name=A"#);

        assert_eq!(
            Value::Object(decoded),
            json!({ "grade": 1, "type": ["lab"], "name": "A" })
        );
    }

    #[test]
    fn ignores_segments_without_a_key() {
        let decoded = decode_query("lonely&42&&name=A=B");

        assert_eq!(Value::Object(decoded), json!({ "name": "A=B" }));
    }
}
