//! This module contains the symbol table produced by parsing one contract's
//! source text.

use std::{collections::HashMap, sync::OnceLock};

use derivative::Derivative;

use crate::{
    data::DiscoveryMap,
    error::{container::Errors, parse},
    inheritance::InheritanceMap,
    parse::scan,
    signature::{
        canonicalize_signature,
        types::{StructTupleMapping, TypeMapping},
    },
};

/// The declared visibility of a function.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

impl Visibility {
    /// Checks whether a function with this visibility can be the entry point
    /// of an external call, and hence the owner of a selector.
    #[must_use]
    pub fn is_externally_callable(self) -> bool {
        matches!(self, Self::Public | Self::External)
    }

    /// Checks whether a function with this visibility is only reachable from
    /// inside its contract (or, for `internal`, its heirs).
    #[must_use]
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Internal | Self::Private)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Public => "public",
            Self::External => "external",
            Self::Internal => "internal",
            Self::Private => "private",
        };
        write!(f, "{text}")
    }
}

/// An inclusive, 1-based span of source lines.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LineSpan {
    /// The first line of the span.
    pub start: u32,

    /// The last line of the span.
    ///
    /// # Invariants
    ///
    /// `start <= end` always holds; the parser never produces an empty span.
    pub end: u32,
}

impl LineSpan {
    /// Constructs a new span covering `start` through `end`.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Gets the number of lines the span covers.
    #[must_use]
    pub fn line_count(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

/// One function definition extracted from the source text.
///
/// # Invariants
///
/// The body runs from the `function` keyword through the brace that closes
/// the function, and is brace-balanced by construction; the parser skips any
/// declaration whose body it cannot balance. For declaration-only functions
/// (interface members and similar), the body is the declaration text through
/// the terminating semicolon instead.
#[derive(Clone, Debug, Derivative)]
#[derivative(PartialEq)]
pub struct FunctionDef {
    /// The function's name.
    pub name: String,

    /// The declared visibility, defaulting to `internal` when no visibility
    /// keyword is present.
    pub visibility: Visibility,

    /// The raw parameter list, with comments removed and whitespace
    /// collapsed.
    pub params: String,

    /// The full text of the definition.
    pub body: String,

    /// The NatSpec comment immediately preceding the definition, if any.
    pub doc: Option<String>,

    /// The name of the innermost `contract` block containing the definition,
    /// or [`None`] for interface members, library functions, and free
    /// functions.
    pub contract: Option<String>,

    /// Whether the function is declared `virtual`.
    pub is_virtual: bool,

    /// Whether the function is declared `override`.
    pub is_override: bool,

    /// Whether the definition has no body (it is terminated by `;`).
    pub is_declaration_only: bool,

    /// The names of the modifiers invoked in the function header.
    pub modifiers: Vec<String>,

    /// The lines of the source text the definition covers.
    pub span: LineSpan,

    /// The lazily-computed canonical signature.
    ///
    /// The value depends only on the symbol table of the unit that owns this
    /// function, so computing it once per definition is sound.
    #[derivative(PartialEq = "ignore")]
    canonical: OnceLock<String>,
}

impl FunctionDef {
    /// Constructs a new function definition from its parsed parts.
    #[allow(clippy::too_many_arguments)] // It is a plain record of parsed fields
    #[must_use]
    pub fn new(
        name: String,
        visibility: Visibility,
        params: String,
        body: String,
        doc: Option<String>,
        contract: Option<String>,
        is_virtual: bool,
        is_override: bool,
        is_declaration_only: bool,
        modifiers: Vec<String>,
        span: LineSpan,
    ) -> Self {
        let canonical = OnceLock::new();
        Self {
            name,
            visibility,
            params,
            body,
            doc,
            contract,
            is_virtual,
            is_override,
            is_declaration_only,
            modifiers,
            span,
            canonical,
        }
    }

    /// Gets the function's signature as written, including parameter names
    /// and data locations.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params)
    }

    /// Gets the function's canonical, types-only signature, resolving custom
    /// types and structs through the provided mappings.
    ///
    /// The result is computed once and cached on the definition.
    pub fn canonical_signature(
        &self,
        types: &TypeMapping,
        structs: &StructTupleMapping,
    ) -> &str {
        self.canonical
            .get_or_init(|| canonicalize_signature(&self.signature(), types, structs))
    }

    /// Gets the number of source lines the definition covers.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.span.line_count()
    }

    /// Checks whether this definition is an interface-only declaration: one
    /// with no body and no owning contract.
    #[must_use]
    pub fn is_interface_only(&self) -> bool {
        self.is_declaration_only && self.contract.is_none()
    }
}

/// One contract's raw text plus its parsed symbol table.
///
/// A `SourceUnit` is created once per fetched contract or facet and is
/// immutable after parsing, which makes it safe to share by reference across
/// any number of concurrent resolutions.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct SourceUnit {
    /// The raw source text, as fetched.
    #[derivative(Debug = "ignore")]
    pub(crate) source: String,

    /// The scan copy of the source, with comments and string literals blanked
    /// out. Offsets are identical to `source`.
    #[derivative(Debug = "ignore")]
    pub(crate) scrubbed: String,

    /// The names of interfaces and contracts declared in the source, in
    /// declaration order. All of these act as `address`-typed symbols in the
    /// ABI.
    pub(crate) type_names: Vec<String>,

    /// The names of `contract` declarations, in declaration order.
    pub(crate) contract_names: Vec<String>,

    /// Struct name to full definition text.
    pub(crate) structs: DiscoveryMap<String>,

    /// Enum name to full definition text.
    pub(crate) enums: DiscoveryMap<String>,

    /// Constant name to normalized declaration text.
    pub(crate) constants: DiscoveryMap<String>,

    /// Custom value type name to declaration text.
    pub(crate) custom_types: DiscoveryMap<String>,

    /// The `using L for T;` statements, in declaration order.
    pub(crate) using_statements: Vec<String>,

    /// Library name to full definition text.
    pub(crate) libraries: DiscoveryMap<String>,

    /// Modifier name to full definition text.
    pub(crate) modifiers: DiscoveryMap<String>,

    /// Every function definition found in the source, in declaration order.
    pub(crate) functions: Vec<FunctionDef>,

    /// An index from function name to positions in `functions`.
    pub(crate) functions_by_name: HashMap<String, Vec<usize>>,

    /// The direct-parent relationships between contracts in the source.
    pub(crate) inheritance: InheritanceMap,

    /// The detected main contract, if one could be determined.
    pub(crate) contract_name: Option<String>,

    /// The non-fatal problems encountered while parsing, located by source
    /// line.
    pub(crate) diagnostics: Errors<parse::LocatedError>,
}

impl SourceUnit {
    /// Gets the raw source text of the unit.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Gets the struct symbol table.
    #[must_use]
    pub fn structs(&self) -> &DiscoveryMap<String> {
        &self.structs
    }

    /// Gets the enum symbol table.
    #[must_use]
    pub fn enums(&self) -> &DiscoveryMap<String> {
        &self.enums
    }

    /// Gets the constant symbol table.
    #[must_use]
    pub fn constants(&self) -> &DiscoveryMap<String> {
        &self.constants
    }

    /// Gets the custom value type symbol table.
    #[must_use]
    pub fn custom_types(&self) -> &DiscoveryMap<String> {
        &self.custom_types
    }

    /// Gets the `using` statements, in declaration order.
    #[must_use]
    pub fn using_statements(&self) -> &[String] {
        &self.using_statements
    }

    /// Gets the library symbol table.
    #[must_use]
    pub fn libraries(&self) -> &DiscoveryMap<String> {
        &self.libraries
    }

    /// Gets the modifier symbol table.
    #[must_use]
    pub fn modifiers(&self) -> &DiscoveryMap<String> {
        &self.modifiers
    }

    /// Gets every function definition in the unit, in declaration order.
    #[must_use]
    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// Gets the functions named `name`, in declaration order.
    pub fn functions_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a FunctionDef> {
        self.functions_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|position| &self.functions[*position])
    }

    /// Gets the names of the interfaces and contracts declared in the unit.
    #[must_use]
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    /// Gets the inheritance relationships between the contracts in the unit.
    #[must_use]
    pub fn inheritance(&self) -> &InheritanceMap {
        &self.inheritance
    }

    /// Gets the detected main contract of the unit, if any.
    ///
    /// This is the least-derived leaf of the inheritance relationships when
    /// one exists, and otherwise the first contract declared in the source.
    #[must_use]
    pub fn main_contract(&self) -> Option<&str> {
        self.contract_name.as_deref()
    }

    /// Gets the non-fatal problems encountered while parsing this unit.
    #[must_use]
    pub fn diagnostics(&self) -> &Errors<parse::LocatedError> {
        &self.diagnostics
    }

    /// Searches the entire source text for the definition of the struct named
    /// `name`, including inside interfaces and contracts that did not win the
    /// first-definition race in the symbol table.
    #[must_use]
    pub fn find_struct_anywhere(&self, name: &str) -> Option<String> {
        self.find_braced_definition("struct", name, &self.scrubbed)
    }

    /// Searches the entire source text for the definition of the enum named
    /// `name`.
    #[must_use]
    pub fn find_enum_anywhere(&self, name: &str) -> Option<String> {
        self.find_braced_definition("enum", name, &self.scrubbed)
    }

    /// Searches for a struct named `name` declared inside the interface (or
    /// contract) named `interface`.
    #[must_use]
    pub fn find_struct_in_interface(&self, interface: &str, name: &str) -> Option<String> {
        for keyword in ["interface", "contract", "library"] {
            for occurrence in scan::keyword_occurrences(&self.scrubbed, keyword) {
                let Some((found_name, after_name)) =
                    scan::read_identifier(&self.scrubbed, occurrence + keyword.len())
                else {
                    continue;
                };
                if found_name != interface {
                    continue;
                }

                let Some(open) = self.scrubbed[after_name..].find('{') else {
                    continue;
                };
                let open = after_name + open;
                let Some(close) = scan::matching_brace(&self.scrubbed, open) else {
                    continue;
                };

                let body = &self.scrubbed[open..=close];
                if let Some(definition) = self.find_braced_definition_in("struct", name, body, open)
                {
                    return Some(definition);
                }
            }
        }

        None
    }

    /// Finds a braced `keyword name { ... }` definition in `haystack`,
    /// slicing the definition text out of the original source.
    fn find_braced_definition(
        &self,
        keyword: &str,
        name: &str,
        haystack: &str,
    ) -> Option<String> {
        self.find_braced_definition_in(keyword, name, haystack, 0)
    }

    /// As [`Self::find_braced_definition`], with `haystack` starting at byte
    /// `base` of the original source.
    fn find_braced_definition_in(
        &self,
        keyword: &str,
        name: &str,
        haystack: &str,
        base: usize,
    ) -> Option<String> {
        for occurrence in scan::keyword_occurrences(haystack, keyword) {
            let Some((found_name, after_name)) =
                scan::read_identifier(haystack, occurrence + keyword.len())
            else {
                continue;
            };
            if found_name != name {
                continue;
            }

            let open = scan::skip_whitespace(haystack, after_name);
            if haystack.as_bytes().get(open) != Some(&b'{') {
                continue;
            }
            let close = scan::matching_brace(haystack, open)?;

            return Some(self.source[base + occurrence..=base + close].trim().to_string());
        }

        None
    }
}
