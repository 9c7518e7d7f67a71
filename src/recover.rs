//! Schema recovery: reconstructs the provider schema from the lowered
//! program representation.
//!
//! The pass locates the `schema.Provider` construction in the plugin's
//! entry package, then decodes the resource and data-source registrations
//! found inside it: attribute schemas from lowered composite literals,
//! lifecycle bindings from bound function values. Anything that cannot be
//! resolved to a literal or a function reference marks the owning entity
//! `partial_parse` and recovery continues with best-effort data. Only a
//! missing provider construction aborts the pass.

use crate::schema::{AttrType, Attribute, Provider, Resource, ResourceKind};
use crate::ssa::{FuncId, Instr, InstrKind, Pos, Program, TypeId, TypeKind, ValueDef, ValueId};
use log::{debug, warn};
use std::collections::HashSet;
use thiserror::Error;

/// Struct type of the provider construction literal.
pub const PROVIDER_STRUCT: &str = "schema.Provider";
/// Struct type of a resource registration literal.
pub const RESOURCE_STRUCT: &str = "schema.Resource";
/// Struct type of an attribute schema literal.
pub const SCHEMA_STRUCT: &str = "schema.Schema";

const FIELD_RESOURCES: &str = "ResourcesMap";
const FIELD_DATA_SOURCES: &str = "DataSourcesMap";
const FIELD_SCHEMA: &str = "Schema";
const FIELD_ELEM: &str = "Elem";

const LIFECYCLE_FIELDS: [&str; 5] = ["Create", "Read", "Update", "Delete", "Exists"];

/// Error from schema recovery.
#[derive(Debug, Error)]
pub enum RecoverError {
    #[error("no provider construction found in package {package:?}")]
    ProviderNotFound { package: String },
}

/// Recover the provider schema declared by the given entry package.
pub fn recover(program: &Program, package: &str) -> Result<Provider, RecoverError> {
    let ctor = find_provider_ctor(program, package).ok_or_else(|| {
        RecoverError::ProviderNotFound {
            package: package.to_string(),
        }
    })?;

    let mut provider = Provider {
        name: package.to_string(),
        pos: ctor.pos.clone(),
        ..Provider::default()
    };

    let InstrKind::StructLit { fields } = &ctor.kind else {
        unreachable!("provider ctor is always a struct literal");
    };

    for (field, value) in fields {
        match field.as_str() {
            FIELD_RESOURCES => {
                decode_resource_map(
                    program,
                    *value,
                    ResourceKind::Resource,
                    &mut provider.resources,
                );
            }
            FIELD_DATA_SOURCES => {
                decode_resource_map(
                    program,
                    *value,
                    ResourceKind::DataSource,
                    &mut provider.data_sources,
                );
            }
            FIELD_SCHEMA => {
                let (attrs, partial) = decode_attr_map(program, *value);
                if partial {
                    warn!(
                        "provider {}: configuration schema only partially recovered",
                        provider.name
                    );
                }
                provider.attributes = attrs;
            }
            other => debug!("provider {}: ignoring field {}", provider.name, other),
        }
    }

    Ok(provider)
}

/// Locate the provider-construction literal in the entry package.
fn find_provider_ctor<'a>(program: &'a Program, package: &'a str) -> Option<&'a Instr> {
    for func in program.functions_in(package) {
        for instr in program.instrs_of(func) {
            if let InstrKind::StructLit { .. } = instr.kind {
                if struct_name(program, instr.ty) == Some(PROVIDER_STRUCT) {
                    return Some(instr);
                }
            }
        }
    }
    None
}

/// Named struct type behind any number of pointers.
fn struct_name(program: &Program, ty: TypeId) -> Option<&str> {
    let mut cur = ty;
    loop {
        match program.type_kind(cur) {
            TypeKind::Pointer(inner) => cur = *inner,
            TypeKind::Struct(name) => return Some(name),
            _ => return None,
        }
    }
}

/// Resolve a value to its defining non-conversion instruction, if any.
fn resolve_instr(program: &Program, value: ValueId) -> Option<&Instr> {
    let mut seen: HashSet<ValueId> = HashSet::new();
    let mut cur = value;
    loop {
        if !seen.insert(cur) {
            return None;
        }
        let instr = program.instr(program.defining_instr(cur)?);
        match &instr.kind {
            InstrKind::Convert { operand } => cur = *operand,
            _ => return Some(instr),
        }
    }
}

/// Resolve a value to a function reference, looking through conversions.
fn as_func_ref(program: &Program, value: ValueId) -> Option<FuncId> {
    let mut seen: HashSet<ValueId> = HashSet::new();
    let mut cur = value;
    loop {
        if !seen.insert(cur) {
            return None;
        }
        match &program.value(cur).def {
            ValueDef::FuncRef(f) => return Some(*f),
            ValueDef::Instr(id) => match &program.instr(*id).kind {
                InstrKind::Convert { operand } => cur = *operand,
                _ => return None,
            },
            _ => return None,
        }
    }
}

fn decode_resource_map(
    program: &Program,
    value: ValueId,
    kind: ResourceKind,
    out: &mut Vec<Resource>,
) {
    let Some(instr) = resolve_instr(program, value) else {
        warn!("{} map is not a literal; skipping", kind);
        return;
    };
    let InstrKind::MapLit { entries } = &instr.kind else {
        warn!("{} map is not a map literal; skipping", kind);
        return;
    };

    for (key, val) in entries {
        let Some(name) = program.const_str(*key) else {
            warn!("{} registration with non-constant name; skipping entry", kind);
            continue;
        };
        out.push(decode_resource(program, name, *val, kind));
    }
}

fn decode_resource(program: &Program, name: &str, value: ValueId, kind: ResourceKind) -> Resource {
    let lit = resolve_instr(program, value).filter(|i| {
        matches!(i.kind, InstrKind::StructLit { .. })
            && struct_name(program, i.ty) == Some(RESOURCE_STRUCT)
    });

    let Some(lit) = lit else {
        debug!("{} {}: registration is not a resource literal", kind, name);
        let mut res = Resource::new(name, kind, Pos::none());
        res.partial_parse = true;
        return res;
    };

    let mut res = Resource::new(name, kind, lit.pos.clone());
    let InstrKind::StructLit { fields } = &lit.kind else {
        unreachable!("filtered to struct literals above");
    };

    for (field, field_value) in fields {
        if field == FIELD_SCHEMA {
            let (attrs, partial) = decode_attr_map(program, *field_value);
            res.attributes = attrs;
            if partial {
                res.partial_parse = true;
            }
            continue;
        }

        if LIFECYCLE_FIELDS.contains(&field.as_str()) {
            let bound = as_func_ref(program, *field_value);
            if bound.is_none() {
                debug!("{} {}: {} is not a function reference", kind, name, field);
                res.partial_parse = true;
            }
            match field.as_str() {
                "Create" => res.create = bound,
                "Read" => res.read = bound,
                "Update" => res.update = bound,
                "Delete" => res.delete = bound,
                "Exists" => res.exists = bound,
                _ => unreachable!(),
            }
            continue;
        }

        debug!("{} {}: ignoring field {}", kind, name, field);
    }

    res
}

/// Decode a `map[string]*schema.Schema` literal into attributes. The
/// second return signals that something in the map could not be resolved.
fn decode_attr_map(program: &Program, value: ValueId) -> (Vec<Attribute>, bool) {
    let Some(instr) = resolve_instr(program, value) else {
        return (Vec::new(), true);
    };
    let InstrKind::MapLit { entries } = &instr.kind else {
        return (Vec::new(), true);
    };

    let mut attrs = Vec::new();
    let mut partial = false;
    for (key, val) in entries {
        let Some(name) = program.const_str(*key) else {
            partial = true;
            continue;
        };
        attrs.push(decode_attribute(program, name, *val));
    }
    (attrs, partial)
}

fn decode_attribute(program: &Program, name: &str, value: ValueId) -> Attribute {
    let lit = resolve_instr(program, value).filter(|i| {
        matches!(i.kind, InstrKind::StructLit { .. })
            && struct_name(program, i.ty) == Some(SCHEMA_STRUCT)
    });

    let Some(lit) = lit else {
        return Attribute {
            name: name.to_string(),
            attr_type: AttrType::NotParsed,
            partial_parse: true,
            ..Attribute::default()
        };
    };

    let mut attr = Attribute {
        name: name.to_string(),
        pos: lit.pos.clone(),
        ..Attribute::default()
    };
    let InstrKind::StructLit { fields } = &lit.kind else {
        unreachable!("filtered to struct literals above");
    };

    let mut elem = None;
    for (field, field_value) in fields {
        match field.as_str() {
            "Type" => match program.const_int(*field_value).map(attr_type_from_value_type) {
                Some(Some(t)) => attr.attr_type = t,
                _ => {
                    attr.attr_type = AttrType::NotParsed;
                    attr.partial_parse = true;
                }
            },
            "Optional" => match program.const_bool(*field_value) {
                Some(b) => attr.optional = b,
                None => attr.partial_parse = true,
            },
            "Required" => match program.const_bool(*field_value) {
                Some(b) => attr.required = b,
                None => attr.partial_parse = true,
            },
            "Computed" => match program.const_bool(*field_value) {
                Some(b) => attr.computed = b,
                None => attr.partial_parse = true,
            },
            "Description" => match program.const_str(*field_value) {
                Some(s) => attr.description = s.to_string(),
                None => attr.partial_parse = true,
            },
            FIELD_ELEM => elem = Some(*field_value),
            other => debug!("attribute {}: ignoring field {}", name, other),
        }
    }

    if let Some(elem) = elem {
        decode_elem(program, elem, &mut attr);
    }

    attr
}

fn attr_type_from_value_type(v: i64) -> Option<AttrType> {
    // schema.ValueType constant ordering.
    Some(match v {
        0 => AttrType::Invalid,
        1 => AttrType::Bool,
        2 => AttrType::Int,
        3 => AttrType::Float,
        4 => AttrType::String,
        5 => AttrType::List,
        6 => AttrType::Map,
        7 => AttrType::Set,
        _ => return None,
    })
}

/// Decode an `Elem` field: a nested `schema.Resource` contributes child
/// attributes, a nested `schema.Schema` just describes the element's
/// scalar type, anything else is unresolvable.
fn decode_elem(program: &Program, value: ValueId, attr: &mut Attribute) {
    let Some(lit) = resolve_instr(program, value) else {
        attr.partial_parse = true;
        return;
    };

    match struct_name(program, lit.ty) {
        Some(RESOURCE_STRUCT) => {
            let InstrKind::StructLit { fields } = &lit.kind else {
                attr.partial_parse = true;
                return;
            };
            let schema = fields.iter().find(|(f, _)| f == FIELD_SCHEMA);
            let Some((_, schema_value)) = schema else {
                return;
            };
            let (children, partial) = decode_attr_map(program, *schema_value);
            if partial {
                attr.partial_parse = true;
            }
            if attr.attr_type.is_container() {
                attr.attributes = children;
            } else if !children.is_empty() {
                warn!(
                    "attribute {}: nested schema on non-container type {}; dropping",
                    attr.name, attr.attr_type
                );
            }
        }
        Some(SCHEMA_STRUCT) => {
            // Scalar element type; nothing to attach.
        }
        _ => attr.partial_parse = true,
    }
}
