//! Post-processing of enricher output.
//!
//! Models regularly wrap their whole answer in a ` ```markdown ... ``` `
//! block. Only that outer wrapper is removed; the page content itself is
//! left untouched.

/// Opening fences recognised as an outer wrapper, most specific first.
const OPENING_FENCES: [&str; 3] = ["```markdown\n", "```md\n", "```\n"];

/// Strip a leading fence marker and, if one was present, its matching
/// trailing fence.
///
/// ```rust
/// use markitdown::pipeline::postprocess::strip_fences;
///
/// assert_eq!(strip_fences("```markdown\nHello\n```"), "Hello");
/// assert_eq!(strip_fences("World"), "World");
/// ```
pub fn strip_fences(input: &str) -> &str {
    for fence in OPENING_FENCES {
        if let Some(body) = input.strip_prefix(fence) {
            return body
                .strip_suffix("\n```\n")
                .or_else(|| body.strip_suffix("\n```"))
                .unwrap_or(body);
        }
    }
    input
}
