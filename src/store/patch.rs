//! Partial context updates.

use serde_json::{Map, Value};

/// Dynamically typed context: a field-name to value map.
pub type JsonContext = Map<String, Value>;

/// A partial update merged into a context value.
///
/// Implement this for a dedicated patch type to get `set(partial)`
/// semantics on a typed context:
///
/// ```rust
/// use stagehand::store::Patch;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Profile {
///     name: String,
///     visits: u32,
/// }
///
/// #[derive(Default)]
/// struct ProfilePatch {
///     name: Option<String>,
///     visits: Option<u32>,
/// }
///
/// impl Patch<Profile> for ProfilePatch {
///     fn apply(self, target: &mut Profile) {
///         if let Some(name) = self.name {
///             target.name = name;
///         }
///         if let Some(visits) = self.visits {
///             target.visits = visits;
///         }
///     }
/// }
///
/// let mut profile = Profile { name: "ada".into(), visits: 1 };
/// ProfilePatch { visits: Some(2), ..Default::default() }.apply(&mut profile);
/// assert_eq!(profile, Profile { name: "ada".into(), visits: 2 });
/// ```
pub trait Patch<C> {
    fn apply(self, target: &mut C);
}

/// Shallow merge: every top-level key of the patch overwrites the target's.
impl Patch<JsonContext> for JsonContext {
    fn apply(self, target: &mut JsonContext) {
        for (key, value) in self {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonContext {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn merge_overwrites_only_patched_keys() {
        let mut context = object(json!({ "count": 1, "label": "x" }));
        object(json!({ "count": 2 })).apply(&mut context);

        assert_eq!(Value::Object(context), json!({ "count": 2, "label": "x" }));
    }

    #[test]
    fn merge_is_shallow() {
        let mut context = object(json!({ "user": { "name": "ada", "age": 36 } }));
        object(json!({ "user": { "name": "grace" } })).apply(&mut context);

        assert_eq!(
            Value::Object(context),
            json!({ "user": { "name": "grace" } })
        );
    }

    #[test]
    fn merge_adds_new_keys() {
        let mut context = JsonContext::new();
        object(json!({ "ready": true })).apply(&mut context);

        assert_eq!(context.get("ready"), Some(&json!(true)));
    }
}
