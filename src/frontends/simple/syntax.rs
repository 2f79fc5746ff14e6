pub mod keywords {
    pub const FN: &str = "fn";
    pub const LET: &str = "let";
    pub const IF: &str = "if";
    pub const ELSE: &str = "else";
    pub const WHILE: &str = "while";
    pub const SWITCH: &str = "switch";
    pub const CASE: &str = "case";
    pub const DEFAULT: &str = "default";
    pub const RETURN: &str = "return";
    pub const PRINT: &str = "print";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
}

/// Probe builtins. The parser treats these as ordinary calls; only the
/// evaluator gives them meaning, so uninstrumented programs never mention
/// them and instrumented programs stay parseable by the same grammar.
pub mod builtins {
    pub const HIT: &str = "__hit";
    pub const COND: &str = "__cond";
}
