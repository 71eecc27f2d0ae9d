//! Strict schema variant.
//!
//! Rejects additional properties at the document root and on each entry of
//! the root `definitions` map. Nested definitions and inline sub-schemas are
//! left untouched; only those two levels are tightened.

use serde_json::{Map, Value};

const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

/// Apply the strict transform in place. Applying it again is a no-op.
pub fn apply_strict(schema: &mut Value) {
    let Some(root) = schema.as_object_mut() else {
        return;
    };

    forbid_additional(root);

    if let Some(Value::Object(definitions)) = root.get_mut("definitions") {
        for definition in definitions.values_mut() {
            if let Value::Object(definition) = definition {
                forbid_additional(definition);
            }
        }
    }
}

fn forbid_additional(object: &mut Map<String, Value>) {
    object.insert(ADDITIONAL_PROPERTIES.to_string(), Value::Bool(false));
}
