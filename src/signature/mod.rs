//! This module contains signature canonicalization: the reduction of a
//! human-written or source-extracted function signature to the types-only
//! form that selectors are computed from.

pub mod selector;
pub mod types;

pub use selector::Selector;

use crate::signature::types::{
    is_candidate_type_name, normalize_type_alias, split_array_suffix, StructTupleMapping,
    TypeMapping,
};

/// Canonicalizes a function `signature` to its types-only form.
///
/// Parameter names and data-location keywords are stripped, custom types and
/// enums are resolved through `types`, struct types are replaced by their
/// tuple representations through `structs` (qualified names such as
/// `IStargate.SendParam` are retried unqualified), literal tuple-type
/// parameters are canonicalized recursively, and the shorthand aliases
/// (`uint`, `int`, `fixed`, `ufixed`) are normalized.
///
/// ```
/// use dependency_closure_extractor::signature::{
///     canonicalize_signature,
///     types::{StructTupleMapping, TypeMapping},
/// };
///
/// let types = TypeMapping::default();
/// let structs = StructTupleMapping::default();
/// let canonical =
///     canonicalize_signature("transfer(address to, uint256 amount)", &types, &structs);
/// assert_eq!(canonical, "transfer(address,uint256)");
/// ```
///
/// Canonicalization is idempotent: applying it to an already-canonical
/// signature returns the signature unchanged.
#[must_use]
pub fn canonicalize_signature(
    signature: &str,
    types: &TypeMapping,
    structs: &StructTupleMapping,
) -> String {
    let Some(open) = signature.find('(') else {
        return signature.to_string();
    };
    let Some(close) = signature.rfind(')') else {
        return signature.to_string();
    };
    if close < open {
        return signature.to_string();
    }

    let name = &signature[..open];
    let params = &signature[open + 1..close];

    if params.trim().is_empty() {
        return format!("{name}()");
    }

    let canonical: Vec<String> = split_parameters(params)
        .iter()
        .filter_map(|parameter| canonicalize_parameter(parameter, types, structs))
        .collect();

    format!("{name}({})", canonical.join(","))
}

/// Splits a parameter list on top-level commas, respecting nested
/// parentheses from literal tuple types.
#[must_use]
pub fn split_parameters(params: &str) -> Vec<String> {
    let mut parameters = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for character in params.chars() {
        match character {
            '(' => {
                depth += 1;
                current.push(character);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(character);
            }
            ',' if depth == 0 => {
                parameters.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(character),
        }
    }

    let last = current.trim();
    if !last.is_empty() {
        parameters.push(last.to_string());
    }

    parameters
}

/// Extracts the struct-like type names referenced by a function signature's
/// parameters: capitalized, non-primitive type names, with qualified names
/// reduced to their final segment.
///
/// The returned names preserve parameter order and are deduplicated.
#[must_use]
pub fn struct_types_in_signature(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let Some(close) = signature.rfind(')') else {
        return Vec::new();
    };
    if close < open {
        return Vec::new();
    }

    let mut found = Vec::new();
    for parameter in split_parameters(&signature[open + 1..close]) {
        let Some(first_token) = parameter.split_whitespace().next() else {
            continue;
        };
        let (base, _) = split_array_suffix(first_token);
        if !is_candidate_type_name(base) {
            continue;
        }

        let unqualified = base.rsplit('.').next().unwrap_or(base).to_string();
        if !found.contains(&unqualified) {
            found.push(unqualified);
        }
    }

    found
}

/// Canonicalizes a single parameter to its type, or [`None`] for parameters
/// with no type token.
fn canonicalize_parameter(
    parameter: &str,
    types: &TypeMapping,
    structs: &StructTupleMapping,
) -> Option<String> {
    let parameter = parameter.trim();
    if parameter.is_empty() {
        return None;
    }

    // Literal tuple types are canonicalized recursively, keeping any array
    // suffix that follows the closing parenthesis.
    if let Some(rest) = parameter.strip_prefix('(') {
        let mut depth = 1usize;
        let mut inner_end = rest.len();
        for (position, character) in rest.char_indices() {
            match character {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        inner_end = position;
                        break;
                    }
                }
                _ => (),
            }
        }

        let inner: Vec<String> = split_parameters(&rest[..inner_end])
            .iter()
            .filter_map(|element| canonicalize_parameter(element, types, structs))
            .collect();

        let mut suffix = String::new();
        let mut remaining = rest[inner_end..].strip_prefix(')').unwrap_or("").trim_start();
        while remaining.starts_with('[') {
            let bracket_end = match remaining.find(']') {
                Some(position) => position + 1,
                None => break,
            };
            suffix.push_str(&remaining[..bracket_end]);
            remaining = remaining[bracket_end..].trim_start();
        }

        return Some(format!("({}){suffix}", inner.join(",")));
    }

    let mut tokens = parameter.split_whitespace();
    let mut declared = tokens.next()?.to_string();

    // Tolerate a detached array suffix, as in `uint256 [] amounts`.
    if let Some(next) = tokens.next() {
        if next.starts_with('[') {
            declared.push_str(next);
        }
    }

    let (base, suffix) = split_array_suffix(&declared);

    let resolved = if let Some(primitive) = types.resolve(base) {
        primitive.to_string()
    } else if let Some(tuple) = structs.resolve(base) {
        tuple.to_string()
    } else if base.contains('.') {
        let unqualified = base.rsplit('.').next().unwrap_or(base);
        if let Some(primitive) = types.resolve(unqualified) {
            primitive.to_string()
        } else if let Some(tuple) = structs.resolve(unqualified) {
            tuple.to_string()
        } else {
            base.to_string()
        }
    } else {
        base.to_string()
    };

    Some(normalize_type_alias(&format!("{resolved}{suffix}")))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::unit::SourceUnit;

    fn mappings(source: &str) -> (TypeMapping, StructTupleMapping) {
        let unit = SourceUnit::parse(source);
        let types = TypeMapping::for_unit(&unit);
        let structs = StructTupleMapping::for_unit(&unit, &types);
        (types, structs)
    }

    #[test]
    fn strips_names_and_data_locations() {
        let (types, structs) = mappings("");
        assert_eq!(
            canonicalize_signature("transfer(address memory to, uint256 amount)", &types, &structs),
            "transfer(address,uint256)"
        );
    }

    #[test]
    fn resolves_custom_types_structs_and_enums() {
        let (types, structs) = mappings(
            "interface IERC20 { }\n\
             enum Side { Buy, Sell }\n\
             type TakerTraits is uint256;\n\
             struct SwapDescription { IERC20 srcToken; address dstToken; uint256 amount; }",
        );

        assert_eq!(
            canonicalize_signature(
                "swap(SwapDescription calldata desc, TakerTraits traits, Side side)",
                &types,
                &structs
            ),
            "swap((address,address,uint256),uint256,uint8)"
        );
    }

    #[test]
    fn keeps_array_suffixes_on_resolved_types() {
        let (types, structs) = mappings("struct Order { address maker; uint256 amount; }");
        assert_eq!(
            canonicalize_signature("fill(Order[] calldata orders, uint count)", &types, &structs),
            "fill((address,uint256)[],uint256)"
        );
    }

    #[test]
    fn canonicalizes_literal_tuple_parameters() {
        let (types, structs) = mappings("");
        assert_eq!(
            canonicalize_signature("route((uint,address)[] hops, bytes data)", &types, &structs),
            "route((uint256,address)[],bytes)"
        );
    }

    #[test]
    fn retries_qualified_names_unqualified() {
        let (types, structs) = mappings("struct SendParam { uint32 dstEid; bytes32 to; }");
        assert_eq!(
            canonicalize_signature("send(IStargate.SendParam calldata param)", &types, &structs),
            "send((uint32,bytes32))"
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let (types, structs) = mappings(
            "struct Order { address maker; uint256 amount; }\n\
             enum Side { Buy, Sell }",
        );

        let inputs = [
            "transfer(address to, uint256 amount)",
            "fill(Order[] calldata orders, Side side)",
            "route((uint,address)[] hops)",
            "noParams()",
        ];

        for input in inputs {
            let once = canonicalize_signature(input, &types, &structs);
            let twice = canonicalize_signature(&once, &types, &structs);
            assert_eq!(once, twice, "canonicalization of `{input}` is not idempotent");
        }
    }

    #[test]
    fn signatures_without_parentheses_pass_through() {
        let (types, structs) = mappings("");
        assert_eq!(canonicalize_signature("fallback", &types, &structs), "fallback");
    }

    #[test]
    fn finds_struct_types_in_signatures() {
        let found = struct_types_in_signature(
            "initialise(RewardClaimWithProof[] calldata proofs, uint256 id, IVault.Config memory c)",
        );
        assert_eq!(found, vec!["RewardClaimWithProof", "Config"]);
    }
}
