//! This module contains constants that are needed throughout the codebase.

/// The number of bytes in a function selector.
///
/// A selector is the first four bytes of the keccak256 hash of the function's
/// canonical signature.
pub const SELECTOR_WIDTH_BYTES: usize = 4;

/// The default number of output lines a dependency closure may occupy before
/// the collector starts dropping parts of it.
pub const DEFAULT_LINE_BUDGET: usize = 300;

/// The default maximum number of nested-type expansion rounds performed while
/// chasing struct fields that are themselves structs or enums.
///
/// This bounds pathological cross-referencing in adversarial source text; real
/// contracts converge in two or three rounds.
pub const DEFAULT_TYPE_EXPANSION_ITERATIONS: usize = 10;

/// The default number of work-queue iterations the collector will wait before
/// polling the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;

/// Identifiers that precede a parenthesis in Solidity without being calls to
/// user-defined functions.
///
/// Call-site scanning skips these so that control-flow keywords and built-ins
/// are never queued for function lookup.
pub const CALL_KEYWORD_BLOCKLIST: &[&str] = &[
    "if", "for", "while", "require", "assert", "revert", "return", "keccak256", "abi", "address",
    "uint", "bytes", "string", "super", "unchecked", "emit", "new",
];

/// Keywords that may appear between a function's parameter list and its body
/// without being modifier invocations.
pub const MODIFIER_KEYWORD_BLOCKLIST: &[&str] = &[
    "public", "private", "internal", "external", "pure", "view", "payable", "virtual", "override",
    "returns", "return",
];
