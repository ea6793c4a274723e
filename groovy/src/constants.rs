// https://groovy-lang.org/differences.html
pub const GROOVY_IMPLICIT_IMPORTS: [&str; 7] = [
    "java.io.*",
    "java.lang.*",
    "java.math.BigDecimal",
    "java.math.BigInteger",
    "java.net.*",
    "java.util.*",
    "groovy.*",
];

/// Reserved words offered as completion candidates alongside symbol-index
/// hits (spec §4.8 `textDocument/completion`).
pub const GROOVY_KEYWORDS: &[&str] = &[
    "def", "class", "interface", "trait", "enum", "extends", "implements", "import", "package",
    "return", "if", "else", "for", "while", "do", "switch", "case", "default", "break",
    "continue", "try", "catch", "finally", "throw", "throws", "new", "null", "true", "false",
    "static", "final", "abstract", "public", "private", "protected", "void", "this", "super",
    "instanceof", "as", "in",
];
