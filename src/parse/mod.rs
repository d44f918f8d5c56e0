//! This module contains the structural parser that turns raw Solidity source
//! text into a [`SourceUnit`] symbol table.
//!
//! The parser is deliberately not a grammar: declarations are located by
//! keyword and their bodies recovered by explicit brace and parenthesis
//! balancing over a scan copy of the text with comments and string literals
//! blanked out. This is enough to extract named declarations from untrusted,
//! possibly-flattened source without a compiler toolchain, and the
//! [`SourceUnit`] interface isolates the rest of the library from the
//! technique so a real grammar-based parser could be substituted later.
//!
//! Malformed constructs (for example a declaration whose braces never close)
//! are skipped and recorded as line-located diagnostics on the resulting
//! unit; parsing itself never fails.

pub mod scan;
pub mod unit;

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::{
    data::DiscoveryMap,
    error::{
        container::Errors,
        parse::{Error, LocatedError},
    },
    inheritance::InheritanceMap,
    parse::unit::{FunctionDef, LineSpan, SourceUnit, Visibility},
    signature::split_parameters,
};

/// The visibility keywords that may precede or follow `constant` in a state
/// constant declaration.
const CONSTANT_VISIBILITY_KEYWORDS: &[&str] = &["internal", "private", "public"];

impl SourceUnit {
    /// Parses `source` into a symbol table.
    ///
    /// Parsing is total: malformed constructs are skipped and recorded as
    /// diagnostics rather than failing the parse.
    #[must_use]
    pub fn parse(source: impl Into<String>) -> Self {
        SourceParser::new(source.into()).run()
    }
}

/// The span of one `contract` declaration in the source text.
struct ContractSpan {
    /// The contract's name.
    name: String,

    /// The byte offset of the `contract` keyword.
    start: usize,

    /// The byte offset of the closing brace of the contract body.
    end: usize,
}

/// The parser for one source text.
///
/// The parser owns the original text and its scan copy; all keyword scanning
/// happens on the scan copy while definition bodies are sliced out of the
/// original at the same offsets.
struct SourceParser {
    /// The original source text.
    source: String,

    /// The scan copy, with comments and string literals blanked out.
    scrubbed: String,

    /// The spans of the `contract` declarations found so far.
    contract_spans: Vec<ContractSpan>,

    /// The non-fatal problems encountered while parsing.
    diagnostics: Errors<LocatedError>,
}

impl SourceParser {
    /// Creates a parser for the provided `source`.
    fn new(source: String) -> Self {
        let scrubbed = scan::scrub(&source);
        let contract_spans = Vec::new();
        let diagnostics = Errors::new();
        Self {
            source,
            scrubbed,
            contract_spans,
            diagnostics,
        }
    }

    /// Runs every extraction pass and assembles the symbol table.
    fn run(mut self) -> SourceUnit {
        let (contract_names, inheritance) = self.scan_contracts();
        let interface_names = self.scan_interfaces();

        let mut type_names = interface_names;
        type_names.extend(contract_names.iter().cloned());

        let structs = self.scan_braced_definitions("struct");
        let enums = self.scan_braced_definitions("enum");
        let libraries = self.scan_braced_definitions("library");
        let modifiers = self.scan_modifiers();
        let custom_types = self.scan_custom_types();
        let using_statements = self.scan_using_statements();
        let constants = self.scan_constants();
        let functions = self.scan_functions();

        let mut functions_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, function) in functions.iter().enumerate() {
            functions_by_name.entry(function.name.clone()).or_default().push(position);
        }

        let contract_name = detect_main_contract(&contract_names, &inheritance);

        debug!(
            "Parsed {} functions, {} structs, {} enums, {} constants, {} modifiers, {} libraries",
            functions.len(),
            structs.len(),
            enums.len(),
            constants.len(),
            modifiers.len(),
            libraries.len()
        );

        SourceUnit {
            source: self.source,
            scrubbed: self.scrubbed,
            type_names,
            contract_names,
            structs,
            enums,
            constants,
            custom_types,
            using_statements,
            libraries,
            modifiers,
            functions,
            functions_by_name,
            inheritance,
            contract_name,
            diagnostics: self.diagnostics,
        }
    }

    /// Scans for `contract` declarations, recording their spans, names, and
    /// inheritance clauses.
    fn scan_contracts(&mut self) -> (Vec<String>, InheritanceMap) {
        let mut names = Vec::new();
        let mut inheritance = InheritanceMap::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "contract") {
            let Some((name, after_name)) =
                scan::read_identifier(&self.scrubbed, occurrence + "contract".len())
            else {
                continue;
            };

            let Some(relative_open) = self.scrubbed[after_name..].find('{') else {
                self.diagnostics.add_located(
                    scan::line_number(&self.scrubbed, occurrence),
                    Error::MissingBody { construct: "contract", name },
                );
                continue;
            };
            let open = after_name + relative_open;

            let header = &self.scrubbed[after_name..open];
            let parents = parse_inheritance_clause(header);

            let Some(close) = scan::matching_brace(&self.scrubbed, open) else {
                self.diagnostics.add_located(
                    scan::line_number(&self.scrubbed, occurrence),
                    Error::UnbalancedBraces { construct: "contract", name },
                );
                continue;
            };

            if !names.contains(&name) {
                names.push(name.clone());
            }
            if !parents.is_empty() {
                inheritance.record(name.clone(), parents);
            }

            self.contract_spans.push(ContractSpan {
                name,
                start: occurrence,
                end: close,
            });
        }

        (names, inheritance)
    }

    /// Scans for `interface` declarations, returning their names in
    /// declaration order.
    fn scan_interfaces(&self) -> Vec<String> {
        let mut names = Vec::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "interface") {
            let Some((name, _)) =
                scan::read_identifier(&self.scrubbed, occurrence + "interface".len())
            else {
                continue;
            };
            if !names.contains(&name) {
                names.push(name);
            }
        }

        names
    }

    /// Scans for `keyword Name { ... }` definitions, keeping the first
    /// definition for any repeated name.
    fn scan_braced_definitions(&mut self, keyword: &'static str) -> DiscoveryMap<String> {
        let mut definitions = DiscoveryMap::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, keyword) {
            let Some((name, after_name)) =
                scan::read_identifier(&self.scrubbed, occurrence + keyword.len())
            else {
                continue;
            };

            let open = scan::skip_whitespace(&self.scrubbed, after_name);
            if self.scrubbed.as_bytes().get(open) != Some(&b'{') {
                continue;
            }

            let Some(close) = scan::matching_brace(&self.scrubbed, open) else {
                self.diagnostics.add_located(
                    scan::line_number(&self.scrubbed, occurrence),
                    Error::UnbalancedBraces { construct: keyword, name },
                );
                continue;
            };

            let definition = self.source[occurrence..=close].trim().to_string();
            if !definitions.insert_first(name.as_str(), definition) {
                debug!("Duplicate {keyword} `{name}`; keeping the first definition");
            }
        }

        definitions
    }

    /// Scans for modifier definitions. The parameter list is optional; a
    /// definition terminated by `;` (a virtual modifier with no body) is
    /// skipped.
    fn scan_modifiers(&mut self) -> DiscoveryMap<String> {
        let mut definitions = DiscoveryMap::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "modifier") {
            let Some((name, after_name)) =
                scan::read_identifier(&self.scrubbed, occurrence + "modifier".len())
            else {
                continue;
            };

            let mut position = scan::skip_whitespace(&self.scrubbed, after_name);
            if self.scrubbed.as_bytes().get(position) == Some(&b'(') {
                let Some(close) = scan::matching_paren(&self.scrubbed, position) else {
                    self.diagnostics.add_located(
                        scan::line_number(&self.scrubbed, occurrence),
                        Error::UnbalancedParameterList { name },
                    );
                    continue;
                };
                position = close + 1;
            }

            match self.find_body_start(position) {
                Some(BodyStart::Brace(open)) => {
                    let Some(close) = scan::matching_brace(&self.scrubbed, open) else {
                        self.diagnostics.add_located(
                            scan::line_number(&self.scrubbed, occurrence),
                            Error::UnbalancedBraces { construct: "modifier", name },
                        );
                        continue;
                    };
                    let definition = self.source[occurrence..=close].trim().to_string();
                    definitions.insert_first(name.as_str(), definition);
                }
                Some(BodyStart::Semicolon(_)) | None => continue,
            }
        }

        definitions
    }

    /// Scans for `type Name is Base;` custom value type declarations.
    fn scan_custom_types(&self) -> DiscoveryMap<String> {
        let mut declarations = DiscoveryMap::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "type") {
            let Some((name, after_name)) =
                scan::read_identifier(&self.scrubbed, occurrence + "type".len())
            else {
                continue;
            };

            let Some((keyword, after_is)) = scan::read_identifier(&self.scrubbed, after_name)
            else {
                continue;
            };
            if keyword != "is" {
                continue;
            }

            let Some(relative_semi) = self.scrubbed[after_is..].find(';') else {
                continue;
            };
            let semi = after_is + relative_semi;

            let declaration = self.source[occurrence..=semi].trim().to_string();
            declarations.insert_first(name.as_str(), declaration);
        }

        declarations
    }

    /// Scans for `using Library for Type;` statements, in declaration order.
    fn scan_using_statements(&self) -> Vec<String> {
        let mut statements = Vec::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "using") {
            let Some((_, after_library)) =
                scan::read_identifier(&self.scrubbed, occurrence + "using".len())
            else {
                continue;
            };

            let Some((keyword, after_for)) = scan::read_identifier(&self.scrubbed, after_library)
            else {
                continue;
            };
            if keyword != "for" {
                continue;
            }

            let Some(relative_semi) = self.scrubbed[after_for..].find(';') else {
                continue;
            };
            let semi = after_for + relative_semi;

            statements.push(self.source[occurrence..=semi].trim().to_string());
        }

        statements
    }

    /// Scans for state constant declarations, normalizing each to
    /// `type constant NAME = value;` regardless of how the visibility
    /// keyword was ordered in the source.
    fn scan_constants(&self) -> DiscoveryMap<String> {
        let mut declarations = DiscoveryMap::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "constant") {
            // The type (and optionally a visibility keyword) sits before the
            // `constant` keyword.
            let Some(before) = preceding_identifier(&self.scrubbed, occurrence) else {
                continue;
            };
            let type_name = if CONSTANT_VISIBILITY_KEYWORDS.contains(&before.0.as_str()) {
                match preceding_identifier(&self.scrubbed, before.1) {
                    Some((type_name, _)) => type_name,
                    None => continue,
                }
            } else {
                before.0
            };

            // The name (and optionally a visibility keyword) follows it.
            let Some((first, after_first)) =
                scan::read_identifier(&self.scrubbed, occurrence + "constant".len())
            else {
                continue;
            };
            let (name, after_name) = if CONSTANT_VISIBILITY_KEYWORDS.contains(&first.as_str()) {
                match scan::read_identifier(&self.scrubbed, after_first) {
                    Some(found) => found,
                    None => continue,
                }
            } else {
                (first, after_first)
            };

            let equals = scan::skip_whitespace(&self.scrubbed, after_name);
            if self.scrubbed.as_bytes().get(equals) != Some(&b'=') {
                continue;
            }

            let Some(relative_semi) = self.scrubbed[equals..].find(';') else {
                continue;
            };
            let semi = equals + relative_semi;

            let value = self.source[equals + 1..semi].trim();
            let declaration = format!("{type_name} constant {name} = {value};");
            declarations.insert_first(name.as_str(), declaration);
        }

        declarations
    }

    /// Scans for function definitions.
    ///
    /// A definition terminated by `;` before any body brace (an interface
    /// member or an unimplemented virtual function) is recorded as a
    /// declaration-only definition; its declaration text stands in for the
    /// body.
    fn scan_functions(&mut self) -> Vec<FunctionDef> {
        let mut functions = Vec::new();

        for occurrence in scan::keyword_occurrences(&self.scrubbed, "function") {
            let Some((name, after_name)) =
                scan::read_identifier(&self.scrubbed, occurrence + "function".len())
            else {
                continue;
            };

            let params_open = scan::skip_whitespace(&self.scrubbed, after_name);
            if self.scrubbed.as_bytes().get(params_open) != Some(&b'(') {
                continue;
            }

            let Some(params_close) = scan::matching_paren(&self.scrubbed, params_open) else {
                self.diagnostics.add_located(
                    scan::line_number(&self.scrubbed, occurrence),
                    Error::UnbalancedParameterList { name },
                );
                continue;
            };

            // Comments were blanked in the scan copy, so slicing it and
            // collapsing whitespace cleans the parameter list in one step.
            let params = self.scrubbed[params_open + 1..params_close].split_whitespace().join(" ");

            let (header_end, body_end, is_declaration_only) =
                match self.find_body_start(params_close + 1) {
                    Some(BodyStart::Brace(open)) => match scan::matching_brace(&self.scrubbed, open)
                    {
                        Some(close) => (open, close, false),
                        None => {
                            self.diagnostics.add_located(
                                scan::line_number(&self.scrubbed, occurrence),
                                Error::UnbalancedBraces { construct: "function", name },
                            );
                            continue;
                        }
                    },
                    Some(BodyStart::Semicolon(semi)) => (semi, semi, true),
                    None => {
                        self.diagnostics.add_located(
                            scan::line_number(&self.scrubbed, occurrence),
                            Error::MissingBody { construct: "function", name },
                        );
                        continue;
                    }
                };

            let header = &self.scrubbed[params_close + 1..header_end];
            let visibility = parse_visibility(header);
            let is_virtual = !scan::keyword_occurrences(header, "virtual").is_empty();
            let is_override = !scan::keyword_occurrences(header, "override").is_empty();
            let modifiers = scan::modifier_invocations(header);

            let body = self.source[occurrence..=body_end].to_string();
            let doc = scan::doc_comment_before(&self.source, occurrence);
            let contract = self.innermost_contract(occurrence);
            let span = LineSpan::new(
                scan::line_number(&self.source, occurrence),
                scan::line_number(&self.source, body_end),
            );

            functions.push(FunctionDef::new(
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
            ));
        }

        functions
    }

    /// Finds where a definition's body starts after `from`: the offset of the
    /// opening brace, or of the semicolon that ends a bodiless declaration.
    ///
    /// Parenthesised groups (such as `returns (...)`) are skipped over.
    fn find_body_start(&self, from: usize) -> Option<BodyStart> {
        let bytes = self.scrubbed.as_bytes();
        let mut depth = 0usize;

        for (position, byte) in bytes.iter().enumerate().skip(from) {
            match *byte {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b'{' if depth == 0 => return Some(BodyStart::Brace(position)),
                b';' if depth == 0 => return Some(BodyStart::Semicolon(position)),
                _ => (),
            }
        }

        None
    }

    /// Finds the name of the innermost `contract` block containing the byte
    /// `position`, if any.
    fn innermost_contract(&self, position: usize) -> Option<String> {
        self.contract_spans
            .iter()
            .filter(|span| span.start < position && position <= span.end)
            .max_by_key(|span| span.start)
            .map(|span| span.name.clone())
    }
}

/// Where a definition's body begins.
enum BodyStart {
    /// The offset of the `{` that opens a braced body.
    Brace(usize),

    /// The offset of the `;` that terminates a bodiless declaration.
    Semicolon(usize),
}

/// Parses the `is Parent1, Parent2(arg)` clause of a contract header into
/// the parent names, stripping constructor-call arguments.
fn parse_inheritance_clause(header: &str) -> Vec<String> {
    let occurrences = scan::keyword_occurrences(header, "is");
    let Some(clause_start) = occurrences.first() else {
        return Vec::new();
    };

    let clause = &header[clause_start + "is".len()..];
    split_parameters(clause)
        .iter()
        .filter_map(|parent| scan::read_identifier(parent, 0).map(|(name, _)| name))
        .collect()
}

/// Determines a function's visibility from its header block.
fn parse_visibility(header: &str) -> Visibility {
    if !scan::keyword_occurrences(header, "public").is_empty() {
        Visibility::Public
    } else if !scan::keyword_occurrences(header, "external").is_empty() {
        Visibility::External
    } else if !scan::keyword_occurrences(header, "private").is_empty() {
        Visibility::Private
    } else {
        Visibility::Internal
    }
}

/// Reads the identifier that ends immediately before `offset` (ignoring
/// trailing whitespace), returning it with the offset of its first byte.
fn preceding_identifier(text: &str, offset: usize) -> Option<(String, usize)> {
    let trimmed = text[..offset].trim_end();
    let end = trimmed.len();
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| crate::utility::is_ident_char(*c))
        .last()
        .map(|(position, _)| position)?;

    if start == end {
        return None;
    }

    Some((trimmed[start..end].to_string(), start))
}

/// Picks the main contract of a source unit: the first declared contract
/// that inherits from something without itself being inherited from, or
/// failing that the first declared contract.
fn detect_main_contract(
    contract_names: &[String],
    inheritance: &InheritanceMap,
) -> Option<String> {
    let parents = inheritance.all_parents();

    contract_names
        .iter()
        .find(|name| inheritance.has_parents(name) && !parents.contains(name.as_str()))
        .or_else(|| contract_names.first())
        .cloned()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::unit::{SourceUnit, Visibility};

    const SAMPLE: &str = r"
// File: contracts/Vault.sol
interface IERC20 {
    function transfer(address to, uint256 amount) external returns (bool);
}

library LibAsset {
    uint256 private constant MAX_UINT = type(uint256).max;

    function isNativeAsset(address asset) internal pure returns (bool) {
        return asset == NATIVE_ASSETID;
    }
}

contract Base {
    address internal constant NATIVE_ASSETID = address(0);

    modifier onlyOwner() {
        require(msg.sender == owner, 'not owner');
        _;
    }

    /**
     * @notice Withdraws the full balance.
     */
    function withdraw(uint256 amount) public virtual {
        amount;
    }
}

contract Vault is Base {
    struct Position { IERC20 token; uint256 amount; }
    enum Side { Long, Short }

    using LibAsset for address;

    function withdraw(uint256 amount) public override onlyOwner {
        super.withdraw(amount);
    }
}
";

    #[test]
    fn extracts_the_full_symbol_table() {
        let unit = SourceUnit::parse(SAMPLE);

        assert!(unit.structs().contains("Position"));
        assert!(unit.enums().contains("Side"));
        assert!(unit.constants().contains("NATIVE_ASSETID"));
        assert!(unit.constants().contains("MAX_UINT"));
        assert!(unit.modifiers().contains("onlyOwner"));
        assert!(unit.libraries().contains("LibAsset"));
        assert_eq!(unit.using_statements().len(), 1);
        assert!(unit.type_names().contains(&"IERC20".to_string()));
        assert!(unit.type_names().contains(&"Vault".to_string()));
    }

    #[test]
    fn records_function_ownership_and_flags() {
        let unit = SourceUnit::parse(SAMPLE);

        let withdraws: Vec<_> = unit.functions_named("withdraw").collect();
        assert_eq!(withdraws.len(), 2);

        let base = withdraws.iter().find(|f| f.contract.as_deref() == Some("Base")).unwrap();
        assert!(base.is_virtual);
        assert!(!base.is_override);
        assert_eq!(base.visibility, Visibility::Public);
        assert!(base.doc.as_deref().unwrap_or("").contains("Withdraws the full balance"));

        let vault = withdraws.iter().find(|f| f.contract.as_deref() == Some("Vault")).unwrap();
        assert!(vault.is_override);
        assert_eq!(vault.modifiers, vec!["onlyOwner"]);
    }

    #[test]
    fn interface_members_are_declaration_only() {
        let unit = SourceUnit::parse(SAMPLE);

        let transfer = unit.functions_named("transfer").next().unwrap();
        assert!(transfer.is_declaration_only);
        assert!(transfer.is_interface_only());
        assert!(transfer.contract.is_none());
    }

    #[test]
    fn library_functions_have_no_owning_contract() {
        let unit = SourceUnit::parse(SAMPLE);

        let lib_function = unit.functions_named("isNativeAsset").next().unwrap();
        assert!(lib_function.contract.is_none());
        assert_eq!(lib_function.visibility, Visibility::Internal);
    }

    #[test]
    fn records_inheritance_and_detects_the_main_contract() {
        let unit = SourceUnit::parse(SAMPLE);

        assert_eq!(unit.inheritance().parents("Vault"), ["Base".to_string()]);
        assert_eq!(unit.main_contract(), Some("Vault"));
    }

    #[test]
    fn normalizes_constant_declarations() {
        let unit = SourceUnit::parse(SAMPLE);

        assert_eq!(
            unit.constants().get("NATIVE_ASSETID").map(String::as_str),
            Some("address constant NATIVE_ASSETID = address(0);")
        );
    }

    #[test]
    fn keeps_the_first_of_duplicate_structs() {
        let source = "
            struct Order { address maker; }
            struct Order { uint256 different; }
        ";
        let unit = SourceUnit::parse(source);

        assert_eq!(unit.structs().len(), 1);
        assert!(unit.structs().get("Order").unwrap().contains("maker"));
    }

    #[test]
    fn unbalanced_definitions_are_skipped_with_diagnostics() {
        let source = "struct Broken { address maker; \n contract Fine { function ok() public { } }";
        let unit = SourceUnit::parse(source);

        assert!(!unit.structs().contains("Broken"));
        assert!(!unit.diagnostics().is_empty());
    }

    #[test]
    fn braces_inside_strings_do_not_break_balancing() {
        let source = "contract C { function f() public { emit Log(\"unbalanced {\"); } }";
        let unit = SourceUnit::parse(source);

        let function = unit.functions_named("f").next().unwrap();
        assert!(function.body.ends_with('}'));
        assert_eq!(function.contract.as_deref(), Some("C"));
    }

    #[test]
    fn functions_report_line_spans() {
        let unit = SourceUnit::parse(SAMPLE);
        let function = unit.functions_named("isNativeAsset").next().unwrap();

        assert!(function.span.start <= function.span.end);
        assert_eq!(function.line_count(), 3);
    }
}
