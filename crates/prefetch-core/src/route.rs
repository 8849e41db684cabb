//! Route metadata and shared-data values.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sync::{read, write};

/// Path key reserved for the not-found route.
pub const NOT_FOUND_PATH: &str = "404";

/// A content-addressed payload, shared between every route that references it.
pub type SharedValue = Arc<Value>;

/// Resolved shared data of a route: prop name to value.
///
/// A `None` value means the prop's fetch failed; the prop stays unresolved
/// until the caches are invalidated.
pub type SharedData = HashMap<String, Option<SharedValue>>;

/// Errors raised while interpreting a route-info payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteInfoError {
    #[error("route info payload is not an object")]
    NotAnObject,

    #[error("route info payload has no path")]
    MissingPath,

    #[error("malformed route info payload: {0}")]
    Malformed(String),
}

/// Wire shape of `routeInfo.json` and of the dev-server route endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteInfoPayload {
    path: String,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    shared_hashes_by_prop: HashMap<String, String>,
    #[serde(default)]
    shared_data: Option<HashMap<String, Value>>,
    #[serde(default)]
    data: Option<Value>,
}

/// Metadata for a single route.
///
/// Immutable after creation except for the two hydration fields:
/// `shared_data` (populated by the data prefetcher) and `template_loaded`
/// (set once the bound template's preload finished).
#[derive(Debug)]
pub struct RouteInfo {
    path: String,
    template: Option<String>,
    shared_hashes_by_prop: HashMap<String, String>,
    data: Option<Value>,
    shared_data: RwLock<Option<SharedData>>,
    template_loaded: AtomicBool,
}

impl RouteInfo {
    /// Create route info with no shared data attached yet.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            template: None,
            shared_hashes_by_prop: HashMap::new(),
            data: None,
            shared_data: RwLock::new(None),
            template_loaded: AtomicBool::new(false),
        }
    }

    /// Set the bound template id.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Reference a shared payload by hash under a prop name.
    pub fn with_shared_hash(mut self, prop: impl Into<String>, hash: impl Into<String>) -> Self {
        self.shared_hashes_by_prop.insert(prop.into(), hash.into());
        self
    }

    /// Validate and convert a raw payload.
    ///
    /// The payload must be a JSON object with a non-empty string `path`.
    pub fn from_payload(payload: &Value) -> Result<Self, RouteInfoError> {
        let object = payload.as_object().ok_or(RouteInfoError::NotAnObject)?;

        match object.get("path").and_then(Value::as_str) {
            Some(path) if !path.is_empty() => {}
            _ => return Err(RouteInfoError::MissingPath),
        }

        let payload: RouteInfoPayload = serde_json::from_value(payload.clone())
            .map_err(|e| RouteInfoError::Malformed(e.to_string()))?;

        let shared_data = payload.shared_data.map(|props| {
            props
                .into_iter()
                .map(|(prop, value)| (prop, Some(Arc::new(value))))
                .collect::<SharedData>()
        });

        Ok(Self {
            path: payload.path,
            template: payload.template,
            shared_hashes_by_prop: payload.shared_hashes_by_prop,
            data: payload.data,
            shared_data: RwLock::new(shared_data),
            template_loaded: AtomicBool::new(false),
        })
    }

    /// Route path as declared by the payload.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bound template id, if any.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Prop name to content hash.
    pub fn shared_hashes_by_prop(&self) -> &HashMap<String, String> {
        &self.shared_hashes_by_prop
    }

    /// Route-local (non-shared) data.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Whether a hydration attempt has started for this route.
    ///
    /// Presence, not completeness: props whose fetch failed stay `None`.
    pub fn is_hydrated(&self) -> bool {
        read(&self.shared_data).is_some()
    }

    /// Snapshot of the shared data, `None` when never hydrated.
    pub fn shared_data(&self) -> Option<SharedData> {
        read(&self.shared_data).clone()
    }

    /// Resolved value of a single prop.
    pub fn shared_prop(&self, prop: &str) -> Option<SharedValue> {
        read(&self.shared_data)
            .as_ref()
            .and_then(|props| props.get(prop).cloned().flatten())
    }

    /// Claim hydration of this route.
    ///
    /// Installs an empty mapping and returns `true` when no attempt was made
    /// before; returns `false` when shared data is already present.
    pub fn begin_hydration(&self) -> bool {
        let mut shared = write(&self.shared_data);
        if shared.is_some() {
            return false;
        }
        *shared = Some(SharedData::new());
        true
    }

    /// Record the outcome for one prop.
    pub fn set_shared_prop(&self, prop: impl Into<String>, value: Option<SharedValue>) {
        write(&self.shared_data)
            .get_or_insert_with(SharedData::new)
            .insert(prop.into(), value);
    }

    /// Whether the bound template's preload has completed.
    pub fn template_loaded(&self) -> bool {
        self.template_loaded.load(Ordering::Acquire)
    }

    /// Mark the bound template's preload as completed.
    pub fn mark_template_loaded(&self) {
        self.template_loaded.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_valid() {
        let info = RouteInfo::from_payload(&json!({
            "path": "/about",
            "template": "t1",
            "sharedHashesByProp": { "title": "h1" }
        }))
        .unwrap();

        assert_eq!(info.path(), "/about");
        assert_eq!(info.template(), Some("t1"));
        assert_eq!(info.shared_hashes_by_prop().get("title").unwrap(), "h1");
        assert!(!info.is_hydrated());
        assert!(!info.template_loaded());
    }

    #[test]
    fn test_from_payload_rejects_non_object() {
        assert_eq!(
            RouteInfo::from_payload(&json!("<html>")).unwrap_err(),
            RouteInfoError::NotAnObject
        );
    }

    #[test]
    fn test_from_payload_rejects_missing_or_empty_path() {
        assert_eq!(
            RouteInfo::from_payload(&json!({ "template": "t1" })).unwrap_err(),
            RouteInfoError::MissingPath
        );
        assert_eq!(
            RouteInfo::from_payload(&json!({ "path": "" })).unwrap_err(),
            RouteInfoError::MissingPath
        );
    }

    #[test]
    fn test_from_payload_with_inline_shared_data() {
        let info = RouteInfo::from_payload(&json!({
            "path": "blog",
            "sharedHashesByProp": { "posts": "h9" },
            "sharedData": { "posts": [1, 2, 3] }
        }))
        .unwrap();

        assert!(info.is_hydrated());
        assert_eq!(*info.shared_prop("posts").unwrap(), json!([1, 2, 3]));
        assert!(!info.begin_hydration());
    }

    #[test]
    fn test_hydration_is_claimed_once() {
        let info = RouteInfo::new("about").with_shared_hash("title", "h1");

        assert!(info.begin_hydration());
        assert!(!info.begin_hydration());

        info.set_shared_prop("title", Some(Arc::new(json!("About"))));
        info.set_shared_prop("body", None);

        let data = info.shared_data().unwrap();
        assert_eq!(data.len(), 2);
        assert!(data["body"].is_none());
        assert!(info.shared_prop("body").is_none());
    }

    #[test]
    fn test_template_loaded_flag() {
        let info = RouteInfo::new("about").with_template("t1");
        info.mark_template_loaded();
        assert!(info.template_loaded());
    }
}
