//! Recovered provider schema model.
//!
//! [`Provider`], [`Resource`] and [`Attribute`] describe the shape a
//! plugin declares: its named resources and data sources, their schema
//! fields, and the lifecycle functions bound to each. The model is built
//! once by schema recovery and read-only afterward. Lifecycle bindings
//! are non-owning [`FuncId`] handles into the program representation, so
//! the model never outlives anything it points at.

use crate::ssa::{FuncId, Pos};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a schema attribute.
///
/// `NotParsed` means recovery could not determine the type; it is
/// distinct from `Invalid`, which is the declared zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    #[default]
    Invalid,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Set,
    NotParsed,
}

impl AttrType {
    /// Container types may carry nested attributes; scalars never do.
    pub fn is_container(&self) -> bool {
        matches!(self, AttrType::List | AttrType::Map | AttrType::Set)
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttrType::Invalid => "invalid",
            AttrType::Bool => "bool",
            AttrType::Int => "int",
            AttrType::Float => "float",
            AttrType::String => "string",
            AttrType::List => "list",
            AttrType::Map => "map",
            AttrType::Set => "set",
            AttrType::NotParsed => "not parsed",
        };
        write!(f, "{}", s)
    }
}

/// Whether a [`Resource`] is a managed resource or a read-only data
/// source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Resource,
    DataSource,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Resource => write!(f, "resource"),
            ResourceKind::DataSource => write!(f, "data source"),
        }
    }
}

/// One schema field of a resource, recursively nestable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub description: String,
    pub optional: bool,
    pub required: bool,
    pub computed: bool,
    pub attr_type: AttrType,
    /// Nested attributes; non-empty only for container types.
    pub attributes: Vec<Attribute>,
    /// Recovery could not fully resolve this attribute's declaration.
    pub partial_parse: bool,
    pub pos: Pos,
}

impl Attribute {
    /// Look up a nested attribute by name; first match wins.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }
}

/// One resource or data-source type of the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
    /// Bound lifecycle functions, each a handle into the program
    /// representation or absent.
    pub create: Option<FuncId>,
    pub read: Option<FuncId>,
    pub update: Option<FuncId>,
    pub delete: Option<FuncId>,
    pub exists: Option<FuncId>,
    pub attributes: Vec<Attribute>,
    /// Recovery could not fully resolve this resource's schema; rules
    /// must not treat the attribute list or bindings as complete.
    pub partial_parse: bool,
    pub pos: Pos,
}

impl Resource {
    pub fn new(name: &str, kind: ResourceKind, pos: Pos) -> Self {
        Self {
            name: name.to_string(),
            kind,
            create: None,
            read: None,
            update: None,
            delete: None,
            exists: None,
            attributes: Vec::new(),
            partial_parse: false,
            pos,
        }
    }

    /// Look up an attribute by name; first match wins.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    /// The bound lifecycle functions, in create/read/update/delete/exists
    /// order, with absent bindings skipped.
    pub fn lifecycle_funcs(&self) -> impl Iterator<Item = FuncId> + '_ {
        [self.create, self.read, self.update, self.delete, self.exists]
            .into_iter()
            .flatten()
    }
}

/// Root entity for one analyzed plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub resources: Vec<Resource>,
    pub data_sources: Vec<Resource>,
    /// Provider-level configuration schema.
    pub attributes: Vec<Attribute>,
    pub pos: Pos,
}

impl Provider {
    /// Look up a resource by name; first match wins, duplicates shadow.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        find_resource(&self.resources, name)
    }

    /// Look up a data source by name; first match wins.
    pub fn data_source(&self, name: &str) -> Option<&Resource> {
        find_resource(&self.data_sources, name)
    }
}

fn find_resource<'a>(resources: &'a [Resource], name: &str) -> Option<&'a Resource> {
    resources.iter().find(|r| r.name == name)
}

fn find_attribute<'a>(atts: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    atts.iter().find(|a| a.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_resource(name: &str) -> Resource {
        Resource::new(name, ResourceKind::Resource, Pos::none())
    }

    #[test]
    fn test_resource_lookup_first_match() {
        let mut provider = Provider::default();
        provider.resources.push(named_resource("widget"));
        let mut shadowed = named_resource("widget");
        shadowed.partial_parse = true;
        provider.resources.push(shadowed);

        let found = provider.resource("widget").unwrap();
        assert!(!found.partial_parse, "first match must win");
        assert!(provider.resource("gadget").is_none());
    }

    #[test]
    fn test_lookup_on_empty_provider() {
        let provider = Provider::default();
        assert!(provider.resource("anything").is_none());
        assert!(provider.data_source("anything").is_none());
    }

    #[test]
    fn test_data_sources_are_separate_from_resources() {
        let mut provider = Provider::default();
        provider.resources.push(named_resource("widget"));

        assert!(provider.resource("widget").is_some());
        assert!(provider.data_source("widget").is_none());
    }

    #[test]
    fn test_attribute_lookup_and_nesting() {
        let mut res = named_resource("widget");
        res.attributes.push(Attribute {
            name: "tags".to_string(),
            attr_type: AttrType::Map,
            attributes: vec![Attribute {
                name: "key".to_string(),
                attr_type: AttrType::String,
                ..Attribute::default()
            }],
            ..Attribute::default()
        });

        let tags = res.attribute("tags").unwrap();
        assert!(tags.attr_type.is_container());
        assert!(tags.attribute("key").is_some());
        assert!(tags.attribute("missing").is_none());
        assert!(res.attribute("missing").is_none());
    }

    #[test]
    fn test_scalar_types_are_not_containers() {
        for t in [
            AttrType::Invalid,
            AttrType::Bool,
            AttrType::Int,
            AttrType::Float,
            AttrType::String,
            AttrType::NotParsed,
        ] {
            assert!(!t.is_container(), "{} must not be a container", t);
        }
        for t in [AttrType::List, AttrType::Map, AttrType::Set] {
            assert!(t.is_container());
        }
    }

    #[test]
    fn test_lifecycle_funcs_skips_unbound() {
        let mut res = named_resource("widget");
        res.create = Some(FuncId(1));
        res.read = Some(FuncId(2));
        let funcs: Vec<_> = res.lifecycle_funcs().collect();
        assert_eq!(funcs, vec![FuncId(1), FuncId(2)]);
    }
}
