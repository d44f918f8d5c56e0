//! This module contains the working state of one dependency-closure
//! collection: the sections gathered so far, the work queues still to be
//! drained, and the running line count.

use std::collections::{HashSet, VecDeque};

use crate::{
    closure::{CollectedFunction, DependencyClosure, ParentFunction, Truncation},
    parse::{scan, unit::FunctionDef},
    utility::line_count,
};

/// The in-progress collection for one target function.
///
/// The dependency walk is modelled as three explicit work queues with
/// visited sets rather than language recursion, so deeply nested call graphs
/// cannot exhaust the stack and mutual recursion in the source cannot loop
/// the collector.
pub(crate) struct CollectorState {
    /// The target function's body.
    pub function: String,

    /// The target function's doc-comment.
    pub doc: Option<String>,

    /// Custom value type declarations, in discovery order.
    pub custom_types: Vec<String>,

    /// Names of the custom types included, for `using`-statement filtering.
    pub used_custom_types: Vec<String>,

    /// Relevant `using` statements, in discovery order.
    pub using_statements: Vec<String>,

    /// Full library definitions, in discovery order.
    pub libraries: Vec<String>,

    /// Struct definitions, in discovery order.
    pub structs: Vec<String>,

    /// The names (or qualified references) under which structs were added.
    pub struct_names: HashSet<String>,

    /// Modifier definitions, in discovery order.
    pub modifiers: Vec<String>,

    /// Collected internal and library function bodies, in discovery order.
    pub internal_functions: Vec<CollectedFunction>,

    /// The definitions already collected, identified by name and starting
    /// line. A call can be discovered both as a plain call site and as a
    /// qualified `Library.function` call; the definition is included once.
    pub included_functions: HashSet<(String, u32)>,

    /// Parent implementations reached through `super.`, in discovery order.
    pub parent_functions: Vec<ParentFunction>,

    /// Enum definitions, in discovery order.
    pub enums: Vec<String>,

    /// The names under which enums were added.
    pub enum_names: HashSet<String>,

    /// Constant declarations, in discovery order.
    pub constants: Vec<String>,

    /// The names of the constants included.
    pub constant_names: HashSet<String>,

    /// The running line count of every section plus the target function.
    pub total_lines: usize,

    /// Plain function calls still to be resolved.
    pub internal_queue: VecDeque<String>,

    /// Plain function calls already handled.
    pub processed_internal: HashSet<String>,

    /// Qualified `Library.function` calls still to be resolved.
    pub library_queue: VecDeque<(String, String)>,

    /// Qualified calls already handled.
    pub processed_library: HashSet<(String, String)>,

    /// `super.` calls still to be resolved.
    pub super_queue: VecDeque<String>,

    /// `super.` calls already handled.
    pub processed_super: HashSet<String>,

    /// Library names referenced by any processed qualified call or `using`
    /// statement, in discovery order.
    pub referenced_libraries: Vec<String>,

    /// The concatenation of the target, internal, and parent function
    /// bodies; constants are matched against this text.
    pub scanned_code: String,
}

impl CollectorState {
    /// Creates the state for collecting `target`, seeding the work queues
    /// from the target's body.
    pub(crate) fn seed(target: &FunctionDef) -> Self {
        let mut state = Self {
            function: target.body.clone(),
            doc: target.doc.clone(),
            custom_types: Vec::new(),
            used_custom_types: Vec::new(),
            using_statements: Vec::new(),
            libraries: Vec::new(),
            structs: Vec::new(),
            struct_names: HashSet::new(),
            modifiers: Vec::new(),
            internal_functions: Vec::new(),
            included_functions: HashSet::new(),
            parent_functions: Vec::new(),
            enums: Vec::new(),
            enum_names: HashSet::new(),
            constants: Vec::new(),
            constant_names: HashSet::new(),
            total_lines: target.line_count(),
            internal_queue: VecDeque::new(),
            processed_internal: HashSet::new(),
            library_queue: VecDeque::new(),
            processed_library: HashSet::new(),
            super_queue: VecDeque::new(),
            processed_super: HashSet::new(),
            referenced_libraries: Vec::new(),
            scanned_code: target.body.clone(),
        };

        state.enqueue_calls_from(&target.body);
        state
    }

    /// Checks whether every work queue has been drained.
    pub(crate) fn queues_are_empty(&self) -> bool {
        self.internal_queue.is_empty()
            && self.library_queue.is_empty()
            && self.super_queue.is_empty()
    }

    /// Scans `body` for plain, qualified, and `super.` call sites, and
    /// enqueues the ones not yet handled.
    pub(crate) fn enqueue_calls_from(&mut self, body: &str) {
        for name in scan::call_sites(body) {
            if !self.processed_internal.contains(&name) {
                self.internal_queue.push_back(name);
            }
        }
        for call in scan::library_call_sites(body) {
            if !self.processed_library.contains(&call) {
                self.library_queue.push_back(call);
            }
        }
        for name in scan::super_call_sites(body) {
            if !self.processed_super.contains(&name) {
                self.super_queue.push_back(name);
            }
        }
    }

    /// Adds a struct definition under the reference `name`, unless one was
    /// already added for it. Returns whether the definition was added.
    pub(crate) fn add_struct(&mut self, name: &str, definition: String) -> bool {
        if !self.struct_names.insert(name.to_string()) {
            return false;
        }

        self.total_lines += line_count(&definition);
        self.structs.push(definition);
        true
    }

    /// Adds an enum definition under `name`, unless one was already added.
    pub(crate) fn add_enum(&mut self, name: &str, definition: String) -> bool {
        if !self.enum_names.insert(name.to_string()) {
            return false;
        }

        self.total_lines += line_count(&definition);
        self.enums.push(definition);
        true
    }

    /// Adds a constant declaration under `name`, unless one was already
    /// added.
    pub(crate) fn add_constant(&mut self, name: &str, declaration: String) -> bool {
        if !self.constant_names.insert(name.to_string()) {
            return false;
        }

        self.total_lines += line_count(&declaration);
        self.constants.push(declaration);
        true
    }

    /// Adds a collected function body, making it part of the text scanned
    /// for constants. Returns whether the definition was newly added.
    pub(crate) fn add_internal_function(&mut self, function: &FunctionDef) -> bool {
        let key = (function.name.clone(), function.span.start);
        if !self.included_functions.insert(key) {
            return false;
        }

        self.total_lines += function.line_count();
        self.scanned_code.push('\n');
        self.scanned_code.push_str(&function.body);
        self.internal_functions.push(CollectedFunction {
            body: function.body.clone(),
            doc:  function.doc.clone(),
        });
        true
    }

    /// Adds a parent implementation reached through a `super.` call.
    pub(crate) fn add_parent_function(&mut self, function: &FunctionDef, parent: &str) {
        self.total_lines += function.line_count();
        self.scanned_code.push('\n');
        self.scanned_code.push_str(&function.body);
        self.parent_functions.push(ParentFunction {
            body: function.body.clone(),
            parent_contract: parent.to_string(),
            function_name: function.name.clone(),
        });
    }

    /// Records that the library `name` was referenced, preserving discovery
    /// order.
    pub(crate) fn note_library(&mut self, name: &str) {
        if !self.referenced_libraries.iter().any(|seen| seen == name) {
            self.referenced_libraries.push(name.to_string());
        }
    }

    /// Consumes the state into the final closure value.
    pub(crate) fn into_closure(self, truncation: Truncation) -> DependencyClosure {
        DependencyClosure {
            function: self.function,
            doc: self.doc,
            custom_types: self.custom_types,
            using_statements: self.using_statements,
            libraries: self.libraries,
            structs: self.structs,
            modifiers: self.modifiers,
            internal_functions: self.internal_functions,
            parent_functions: self.parent_functions,
            enums: self.enums,
            constants: self.constants,
            total_lines: self.total_lines,
            truncation,
        }
    }
}
