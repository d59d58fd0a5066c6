//! PDF page heuristic used by `CHECK_PDF`.

use url::Url;

/// Guess whether a page shows a PDF document.
///
/// True when the path ends in `.pdf`, a query value ends in `.pdf`
/// (viewer URLs such as `?file=report.pdf`), or the URL mentions
/// `application/pdf`. Case-insensitive.
pub fn is_pdf_url(url: &Url) -> bool {
    let ends_with_pdf = |s: &str| s.to_ascii_lowercase().ends_with(".pdf");

    if ends_with_pdf(url.path()) {
        return true;
    }
    if url.query_pairs().any(|(_, value)| ends_with_pdf(&value)) {
        return true;
    }
    url.as_str().to_ascii_lowercase().contains("application/pdf")
}
