//! Property collector request and response types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::counter::CounterDescriptor;

/// Reference to a server-side managed object, e.g. `PerformanceManager:PerfMgr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.value)
    }
}

/// Opaque handle to the monitored entity. Never interpreted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHandle(pub ManagedObjectRef);

impl EntityHandle {
    pub fn mo_ref(&self) -> &ManagedObjectRef {
        &self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which properties to read from objects of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub path_set: Vec<String>,
}

/// Starting object for a property traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub obj: ManagedObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilterSpec {
    pub prop_set: Vec<PropertySpec>,
    pub object_set: Vec<ObjectSpec>,
}

impl PropertyFilterSpec {
    /// Filter reading the given paths from a single object, without traversal.
    pub fn for_object(obj: &ManagedObjectRef, paths: &[&str]) -> Self {
        Self {
            prop_set: vec![PropertySpec {
                type_name: obj.type_name.clone(),
                all: false,
                path_set: paths.iter().map(|p| p.to_string()).collect(),
            }],
            object_set: vec![ObjectSpec { obj: obj.clone() }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveOptions {
    /// Page size hint. `None` lets the server choose.
    #[serde(default)]
    pub max_objects: Option<u32>,
}

/// Value of a single retrieved property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    PerfCounterInfoList(Vec<CounterDescriptor>),
    Text(String),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicProperty {
    pub name: String,
    pub val: PropertyValue,
}

/// One object and the properties retrieved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectContent {
    pub obj: ManagedObjectRef,
    #[serde(default)]
    pub prop_set: Vec<DynamicProperty>,
}

/// One page of a bulk retrieve. A present, non-empty `token` means more pages follow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieveResult {
    #[serde(default)]
    pub objects: Vec<ObjectContent>,
    #[serde(default)]
    pub token: Option<String>,
}

impl RetrieveResult {
    /// Continuation token, treating an empty string the same as no token.
    pub fn continuation(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_end_of_pages() {
        let page = RetrieveResult {
            objects: Vec::new(),
            token: Some(String::new()),
        };
        assert_eq!(page.continuation(), None);

        let page = RetrieveResult {
            objects: Vec::new(),
            token: Some("1".to_string()),
        };
        assert_eq!(page.continuation(), Some("1"));
    }

    #[test]
    fn filter_for_object_uses_object_type() {
        let pm = ManagedObjectRef::new("PerformanceManager", "PerfMgr");
        let spec = PropertyFilterSpec::for_object(&pm, &["perfCounter"]);
        assert_eq!(spec.prop_set[0].type_name, "PerformanceManager");
        assert_eq!(spec.prop_set[0].path_set, vec!["perfCounter".to_string()]);
        assert!(!spec.prop_set[0].all);
        assert_eq!(spec.object_set[0].obj, pm);
    }

    #[test]
    fn property_value_json_shape() {
        let json = r#"{"name":"name","val":{"kind":"text","value":"vm-1"}}"#;
        let prop: DynamicProperty = serde_json::from_str(json).unwrap();
        assert_eq!(prop.val, PropertyValue::Text("vm-1".to_string()));
    }
}
