//! Construction of the provider-native input payload.
//!
//! Pure so the merge rules are unit-testable without a live provider.

use serde_json::{json, Map, Value};

use crate::GenerationRequest;

/// Build the `input` object sent to the provider.
///
/// Named parameters are written first; `extra` entries are merged in
/// afterwards and never override a key that is already set. The seed is
/// included only when present, already coerced to an integer.
pub fn build_input_payload(request: &GenerationRequest) -> Value {
    let mut input = Map::new();
    input.insert("prompt".into(), json!(request.prompt));
    input.insert("width".into(), json!(request.width));
    input.insert("height".into(), json!(request.height));
    input.insert("num_inference_steps".into(), json!(request.steps));
    input.insert("num_outputs".into(), json!(request.batch));

    if let Some(seed) = request.seed {
        input.insert("seed".into(), json!(seed));
    }

    if let Some(Value::Object(extra)) = &request.extra {
        for (key, value) in extra {
            if !input.contains_key(key) {
                input.insert(key.clone(), value.clone());
            }
        }
    }

    Value::Object(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "a cat".into(),
            seed: None,
            width: 256,
            height: 256,
            steps: 10,
            batch: 1,
            model: None,
            extra: None,
        }
    }

    #[test]
    fn named_parameters_present() {
        let input = build_input_payload(&request());
        assert_eq!(input["prompt"], "a cat");
        assert_eq!(input["width"], 256);
        assert_eq!(input["height"], 256);
        assert_eq!(input["num_inference_steps"], 10);
        assert_eq!(input["num_outputs"], 1);
        assert!(input.get("seed").is_none());
    }

    #[test]
    fn seed_included_when_present() {
        let mut req = request();
        req.seed = Some(42);
        let input = build_input_payload(&req);
        assert_eq!(input["seed"], 42);
    }

    #[test]
    fn extra_merged_without_overriding_named_parameters() {
        let mut req = request();
        req.extra = Some(serde_json::json!({
            "guidance_scale": 7.5,
            "negative_prompt": "blurry",
            "width": 9999,
            "prompt": "a dog"
        }));
        let input = build_input_payload(&req);
        // Extras that do not collide are carried through.
        assert_eq!(input["guidance_scale"], 7.5);
        assert_eq!(input["negative_prompt"], "blurry");
        // Named parameters win on collision.
        assert_eq!(input["width"], 256);
        assert_eq!(input["prompt"], "a cat");
    }

    #[test]
    fn extra_seed_does_not_override_explicit_seed() {
        let mut req = request();
        req.seed = Some(7);
        req.extra = Some(serde_json::json!({ "seed": 1234 }));
        let input = build_input_payload(&req);
        assert_eq!(input["seed"], 7);
    }

    #[test]
    fn non_object_extra_is_ignored() {
        let mut req = request();
        req.extra = Some(serde_json::json!(["not", "a", "map"]));
        let input = build_input_payload(&req);
        assert_eq!(input.as_object().unwrap().len(), 5);
    }
}
