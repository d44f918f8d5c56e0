//! This module contains the mappings that reduce user-defined Solidity types
//! to their ABI-primitive forms: custom value types, enums, interface and
//! contract references, and struct-to-tuple conversion.

use std::collections::HashMap;

use log::{debug, warn};

use crate::{
    data::DiscoveryMap,
    error::resolution::{self, Error},
    parse::unit::SourceUnit,
    utility::is_ident_char,
};

/// A mapping from symbol name to its ABI-primitive substitute.
///
/// The mapping is the union of custom-value-type declarations
/// (`type T is Base;` contributes `T -> Base`), every interface and contract
/// name (`-> address`), and every enum name (`-> uint8`).
///
/// A `TypeMapping` is built fresh per resolution from one [`SourceUnit`] and
/// never mutated once built; when the facet scope changes, the mapping is
/// rebuilt from the facet's own unit rather than patched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeMapping {
    map: HashMap<String, String>,
}

impl TypeMapping {
    /// Builds the type mapping for the provided `unit`.
    #[must_use]
    pub fn for_unit(unit: &SourceUnit) -> Self {
        let mut map = HashMap::new();

        for (name, declaration) in unit.custom_types().iter() {
            if let Some(base) = base_of_custom_type(declaration) {
                debug!("Custom type mapping: {name} -> {base}");
                map.insert(name.to_string(), base);
            }
        }

        for name in unit.type_names() {
            map.entry(name.clone()).or_insert_with(|| "address".to_string());
        }

        for name in unit.enums().keys() {
            map.insert(name.to_string(), "uint8".to_string());
        }

        Self { map }
    }

    /// Gets the ABI-primitive substitute for `name`, if one is known.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Gets the number of symbols in the mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Checks if the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Extracts the ABI-primitive base of a custom-value-type `declaration` of the
/// form `type T is Base;`, returning `Base` (for example `uint256`).
///
/// Returns [`None`] when the declaration is not a well-formed
/// `type ... is ...;` statement.
fn base_of_custom_type(declaration: &str) -> Option<String> {
    let mut tokens = declaration.split_whitespace();
    while tokens.next()? != "is" {}
    let base = tokens.next()?.trim_end_matches(';').trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// A mapping from struct name to its canonical tuple-type string, such as
/// `(address,uint256)`.
///
/// Structs whose definitions participate in a reference cycle are absent
/// from the mapping; selector matches involving them simply fail to match,
/// which is the accepted degraded behaviour.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StructTupleMapping {
    map: HashMap<String, String>,
}

impl StructTupleMapping {
    /// Builds the struct-to-tuple mapping for the provided `unit`, resolving
    /// field types through `types` and recursively through other structs.
    #[must_use]
    pub fn for_unit(unit: &SourceUnit, types: &TypeMapping) -> Self {
        let mut map = HashMap::new();

        for (name, definition) in unit.structs().iter() {
            let mut stack = Vec::new();
            match struct_to_tuple(name, definition, types, unit.structs(), &mut stack) {
                Ok(tuple) => {
                    debug!("Struct mapping: {name} -> {tuple}");
                    map.insert(name.to_string(), tuple);
                }
                Err(error) => {
                    warn!("Skipping struct `{name}`: {error}");
                }
            }
        }

        Self { map }
    }

    /// Gets the tuple representation of the struct `name`, if it resolved.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Gets the number of structs in the mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Checks if the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Converts the struct `definition` into its canonical tuple-type string,
/// resolving fields through `types` and recursively through `all_structs`.
///
/// Field order in the tuple follows declared field order. Array suffixes are
/// preserved on the resolved base type, and qualified field types such as
/// `IStargate.SendParam` are retried with the unqualified name when the
/// qualified one is absent.
///
/// # Errors
///
/// Returns [`Err`] if the struct's fields cannot be extracted, or if the
/// definition participates in a reference cycle (detected via the resolution
/// `stack`).
pub fn struct_to_tuple(
    name: &str,
    definition: &str,
    types: &TypeMapping,
    all_structs: &DiscoveryMap<String>,
    stack: &mut Vec<String>,
) -> resolution::Result<String> {
    if stack.iter().any(|seen| seen == name) {
        return Err(Error::CyclicStructReference { name: name.to_string() });
    }
    stack.push(name.to_string());

    let result = struct_fields(definition)
        .ok_or_else(|| Error::MalformedStruct { name: name.to_string() })
        .and_then(|fields| {
            let mut resolved = Vec::with_capacity(fields.len());
            for field_type in fields {
                resolved.push(resolve_field_type(&field_type, types, all_structs, stack)?);
            }
            Ok(format!("({})", resolved.join(",")))
        });

    stack.pop();
    result
}

/// Resolves one struct field's declared type to its ABI-primitive form.
fn resolve_field_type(
    field_type: &str,
    types: &TypeMapping,
    all_structs: &DiscoveryMap<String>,
    stack: &mut Vec<String>,
) -> resolution::Result<String> {
    let (base, suffix) = split_array_suffix(field_type);

    let resolved = if let Some(primitive) = types.resolve(base) {
        primitive.to_string()
    } else if let Some(nested) = all_structs.get(base) {
        struct_to_tuple(base, nested, types, all_structs, stack)?
    } else if let Some(unqualified) = base.rsplit('.').next().filter(|_| base.contains('.')) {
        if let Some(primitive) = types.resolve(unqualified) {
            primitive.to_string()
        } else if let Some(nested) = all_structs.get(unqualified) {
            struct_to_tuple(unqualified, nested, types, all_structs, stack)?
        } else {
            normalize_type_alias(base)
        }
    } else {
        normalize_type_alias(base)
    };

    Ok(format!("{resolved}{suffix}"))
}

/// Extracts the declared type of each field from a struct `definition`, in
/// declaration order.
///
/// Returns [`None`] when the definition has no braced body.
fn struct_fields(definition: &str) -> Option<Vec<String>> {
    let open = definition.find('{')?;
    let close = definition.rfind('}')?;
    if close <= open {
        return None;
    }

    let body = &definition[open + 1..close];
    let mut fields = Vec::new();

    for declaration in body.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        if let Some(field_type) = declaration.split_whitespace().next() {
            fields.push(field_type.to_string());
        }
    }

    Some(fields)
}

/// Splits a type into its base name and any trailing array suffix, so
/// `uint256[][3]` becomes `("uint256", "[][3]")`.
#[must_use]
pub fn split_array_suffix(declared: &str) -> (&str, &str) {
    match declared.find('[') {
        Some(position) => (&declared[..position], &declared[position..]),
        None => (declared, ""),
    }
}

/// Normalizes the Solidity shorthand type aliases to their canonical ABI
/// forms: `uint -> uint256`, `int -> int256`, `fixed -> fixed128x18`, and
/// `ufixed -> ufixed128x18`.
///
/// Array suffixes are preserved.
#[must_use]
pub fn normalize_type_alias(declared: &str) -> String {
    let (base, suffix) = split_array_suffix(declared);

    let normalized = match base {
        "uint" => "uint256",
        "int" => "int256",
        "fixed" => "fixed128x18",
        "ufixed" => "ufixed128x18",
        other => other,
    };

    format!("{normalized}{suffix}")
}

/// Checks whether `name` is a primitive Solidity ABI type (or a data-location
/// keyword), and hence can never be a struct, enum, or custom type.
#[must_use]
pub fn is_primitive_type(name: &str) -> bool {
    let (base, _) = split_array_suffix(name);

    match base {
        "address" | "bool" | "string" | "bytes" | "uint" | "int" | "fixed" | "ufixed"
        | "payable" | "memory" | "calldata" | "storage" => true,
        _ => {
            if let Some(width) = base.strip_prefix("uint").or_else(|| base.strip_prefix("int")) {
                return matches!(width.parse::<u32>(), Ok(bits) if bits > 0 && bits <= 256 && bits % 8 == 0);
            }
            if let Some(length) = base.strip_prefix("bytes") {
                return matches!(length.parse::<u32>(), Ok(len) if len > 0 && len <= 32);
            }
            false
        }
    }
}

/// Checks whether `name` looks like a user-defined type reference: an
/// identifier starting with an upper-case letter (optionally qualified, as in
/// `IStargate.SendParam`) that is not a primitive type.
#[must_use]
pub fn is_candidate_type_name(name: &str) -> bool {
    if name.is_empty() || is_primitive_type(name) {
        return false;
    }

    let mut segments = name.split('.');
    let leading_upper = segments
        .clone()
        .next()
        .and_then(|segment| segment.chars().next())
        .is_some_and(char::is_uppercase);

    leading_upper
        && segments.all(|segment| {
            !segment.is_empty() && segment.chars().all(is_ident_char)
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::unit::SourceUnit;

    fn unit(source: &str) -> SourceUnit {
        SourceUnit::parse(source)
    }

    #[test]
    fn maps_enums_interfaces_and_custom_types() {
        let unit = unit(
            "interface IERC20 { }\n\
             contract Vault { }\n\
             enum Side { Buy, Sell }\n\
             type TakerTraits is uint256;",
        );
        let types = TypeMapping::for_unit(&unit);

        assert_eq!(types.resolve("IERC20"), Some("address"));
        assert_eq!(types.resolve("Vault"), Some("address"));
        assert_eq!(types.resolve("Side"), Some("uint8"));
        assert_eq!(types.resolve("TakerTraits"), Some("uint256"));
        assert_eq!(types.resolve("Unknown"), None);
    }

    #[test]
    fn converts_structs_to_tuples_in_declared_field_order() {
        let unit = unit(
            "interface IERC20 { }\n\
             struct SwapDescription {\n\
                 IERC20 srcToken;\n\
                 address dstToken;\n\
                 uint256 amount;\n\
             }",
        );
        let types = TypeMapping::for_unit(&unit);
        let structs = StructTupleMapping::for_unit(&unit, &types);

        assert_eq!(
            structs.resolve("SwapDescription"),
            Some("(address,address,uint256)")
        );
    }

    #[test]
    fn resolves_nested_structs_recursively() {
        let unit = unit(
            "struct Inner { uint256 a; uint b; }\n\
             struct Outer { Inner inner; address owner; Inner[] history; }",
        );
        let types = TypeMapping::for_unit(&unit);
        let structs = StructTupleMapping::for_unit(&unit, &types);

        assert_eq!(structs.resolve("Inner"), Some("(uint256,uint256)"));
        assert_eq!(
            structs.resolve("Outer"),
            Some("((uint256,uint256),address,(uint256,uint256)[])")
        );
    }

    #[test]
    fn cyclic_structs_are_unresolvable_but_do_not_hang() {
        let unit = unit(
            "struct X { Y other; }\n\
             struct Y { X other; }",
        );
        let types = TypeMapping::for_unit(&unit);
        let structs = StructTupleMapping::for_unit(&unit, &types);

        assert_eq!(structs.resolve("X"), None);
        assert_eq!(structs.resolve("Y"), None);
    }

    #[test]
    fn normalizes_shorthand_aliases() {
        assert_eq!(normalize_type_alias("uint"), "uint256");
        assert_eq!(normalize_type_alias("int[]"), "int256[]");
        assert_eq!(normalize_type_alias("fixed"), "fixed128x18");
        assert_eq!(normalize_type_alias("uint8"), "uint8");
    }

    #[test]
    fn recognises_primitive_types() {
        assert!(is_primitive_type("uint256"));
        assert!(is_primitive_type("bytes32"));
        assert!(is_primitive_type("address"));
        assert!(is_primitive_type("uint128[]"));
        assert!(!is_primitive_type("uint257"));
        assert!(!is_primitive_type("bytes33"));
        assert!(!is_primitive_type("Order"));
    }

    #[test]
    fn recognises_candidate_type_names() {
        assert!(is_candidate_type_name("Order"));
        assert!(is_candidate_type_name("IStargate.SendParam"));
        assert!(!is_candidate_type_name("uint256"));
        assert!(!is_candidate_type_name("lowercase"));
        assert!(!is_candidate_type_name(""));
    }
}
