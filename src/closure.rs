//! This module contains the definitions for the dependency closure: the
//! resolver's output.
//!
//! A closure is the minimal set of declarations needed to read a target
//! function in isolation. Every list in the closure is ordered by discovery
//! sequence (first-referenced-first); downstream renderers rely on that
//! order being stable.

use serde::{Deserialize, Serialize};

/// A function body collected into the closure, together with its preceding
/// doc-comment when one was present.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CollectedFunction {
    /// The full text of the function definition.
    pub body: String,

    /// The NatSpec comment preceding the definition, if any.
    pub doc: Option<String>,
}

/// A parent-contract implementation reached through a `super.` call.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ParentFunction {
    /// The full text of the parent implementation.
    pub body: String,

    /// The contract the implementation was found in.
    pub parent_contract: String,

    /// The name of the function.
    pub function_name: String,
}

/// How the closure was truncated to fit the caller's line budget.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// Everything collected fit within the budget.
    None,

    /// The budget was exceeded and the recorded number of internal functions
    /// were dropped, in reverse discovery order, to meet it.
    InternalFunctionsDropped(usize),

    /// Even the target function plus its structs and enums exceeded the
    /// budget, so everything except the target function was dropped.
    FunctionOnly,
}

/// The dependency closure of one resolved function.
///
/// A closure is built once per `(function, selector)` request, returned by
/// value, and never mutated after being returned. The target function's body
/// is present in every closure regardless of budget; truncation only ever
/// removes supporting declarations.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DependencyClosure {
    /// The full text of the target function.
    pub(crate) function: String,

    /// The NatSpec comment preceding the target function, if any.
    pub(crate) doc: Option<String>,

    /// The custom value type declarations referenced by the function.
    pub(crate) custom_types: Vec<String>,

    /// The `using` statements relevant to the included types and libraries.
    pub(crate) using_statements: Vec<String>,

    /// The full definitions of the libraries the function calls into.
    pub(crate) libraries: Vec<String>,

    /// The struct definitions the function (transitively) references.
    pub(crate) structs: Vec<String>,

    /// The modifiers invoked by the function.
    pub(crate) modifiers: Vec<String>,

    /// The internal and library functions the target (transitively) calls.
    pub(crate) internal_functions: Vec<CollectedFunction>,

    /// Parent-contract implementations reached through `super.` calls.
    pub(crate) parent_functions: Vec<ParentFunction>,

    /// The enum definitions the function (transitively) references.
    pub(crate) enums: Vec<String>,

    /// The constants referenced by the collected code.
    pub(crate) constants: Vec<String>,

    /// The total number of source lines the closure occupies.
    pub(crate) total_lines: usize,

    /// How the closure was truncated, if at all.
    pub(crate) truncation: Truncation,
}

impl DependencyClosure {
    /// Gets the full text of the target function.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Gets the NatSpec comment preceding the target function, if any.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Gets the custom value type declarations, in discovery order.
    #[must_use]
    pub fn custom_types(&self) -> &[String] {
        &self.custom_types
    }

    /// Gets the relevant `using` statements, in discovery order.
    #[must_use]
    pub fn using_statements(&self) -> &[String] {
        &self.using_statements
    }

    /// Gets the full library definitions, in discovery order.
    #[must_use]
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    /// Gets the struct definitions, in discovery order.
    #[must_use]
    pub fn structs(&self) -> &[String] {
        &self.structs
    }

    /// Gets the modifier definitions, in discovery order.
    #[must_use]
    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    /// Gets the collected internal and library functions, in discovery
    /// order.
    #[must_use]
    pub fn internal_functions(&self) -> &[CollectedFunction] {
        &self.internal_functions
    }

    /// Gets the parent implementations reached through `super.` calls, in
    /// discovery order.
    #[must_use]
    pub fn parent_functions(&self) -> &[ParentFunction] {
        &self.parent_functions
    }

    /// Gets the enum definitions, in discovery order.
    #[must_use]
    pub fn enums(&self) -> &[String] {
        &self.enums
    }

    /// Gets the constant declarations, in discovery order.
    #[must_use]
    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    /// Gets the total number of source lines the closure occupies.
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Gets how the closure was truncated, if at all.
    #[must_use]
    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    /// Checks whether any part of the closure was dropped to meet the line
    /// budget.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        !matches!(self.truncation, Truncation::None)
    }
}

/// Additional utility functions to enable cleaner testing with the
/// dependency closure.
impl DependencyClosure {
    /// Checks if the closure contains a struct definition named `name`.
    #[must_use]
    pub fn has_struct(&self, name: &str) -> bool {
        let header = format!("struct {name}");
        self.structs.iter().any(|definition| definition.contains(&header))
    }

    /// Checks if the closure contains an enum definition named `name`.
    #[must_use]
    pub fn has_enum(&self, name: &str) -> bool {
        let header = format!("enum {name}");
        self.enums.iter().any(|definition| definition.contains(&header))
    }

    /// Checks if the closure contains an internal function named `name`.
    #[must_use]
    pub fn has_internal_function(&self, name: &str) -> bool {
        let header = format!("function {name}");
        self.internal_functions
            .iter()
            .any(|function| function.body.contains(&header))
    }

    /// Checks if the closure contains a parent implementation of `name` from
    /// the contract `parent`.
    #[must_use]
    pub fn has_parent_function(&self, parent: &str, name: &str) -> bool {
        self.parent_functions
            .iter()
            .any(|function| function.parent_contract == parent && function.function_name == name)
    }

    /// Checks if the closure contains a constant declaration for `name`.
    #[must_use]
    pub fn has_constant(&self, name: &str) -> bool {
        let header = format!("constant {name}");
        self.constants.iter().any(|declaration| declaration.contains(&header))
    }
}
