//! Document assembly.

/// Separator placed between consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Join ordered per-page markdown into the final document.
///
/// No other transformation is applied; zero pages yield an empty string.
pub fn assemble_document<S: AsRef<str>>(pages: &[S]) -> String {
    let mut out = String::with_capacity(
        pages.iter().map(|p| p.as_ref().len()).sum::<usize>()
            + PAGE_SEPARATOR.len() * pages.len().saturating_sub(1),
    );
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str(PAGE_SEPARATOR);
        }
        out.push_str(page.as_ref());
    }
    out
}
