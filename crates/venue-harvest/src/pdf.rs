//! Direct PDF link derivation from canonical landing-page URLs.
//!
//! Pure and deterministic: no I/O. Rules are tried in [`RULES`] order and the
//! first one that matches the URL's host decides the outcome.

use url::Url;

/// A host-specific rewrite from landing page to PDF.
#[derive(Debug, Clone, Copy)]
pub struct PdfRule {
    /// Rule name, used in logs.
    pub name: &'static str,
    /// Host test.
    pub matches_host: fn(&str) -> bool,
    /// Rewrite; `None` when the host matched but the path has an unknown shape.
    pub rewrite: fn(&Url) -> Option<String>,
}

/// Derivation rules, first match wins.
pub const RULES: &[PdfRule] = &[
    PdfRule { name: "arxiv", matches_host: is_arxiv_host, rewrite: arxiv_pdf },
    PdfRule { name: "isca-archive", matches_host: is_isca_host, rewrite: isca_pdf },
];

/// Derive a direct PDF link for `url`, or `None` when no rule applies.
///
/// Feeding a derived link back in returns it unchanged.
#[must_use]
pub fn derive(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    let rule = RULES.iter().find(|rule| (rule.matches_host)(&host))?;
    let pdf = (rule.rewrite)(&parsed);
    if pdf.is_none() {
        tracing::debug!(url, rule = rule.name, "host matched but path has no PDF form");
    }
    pdf
}

fn is_arxiv_host(host: &str) -> bool {
    host == "arxiv.org" || host.ends_with(".arxiv.org")
}

fn is_isca_host(host: &str) -> bool {
    host.contains("isca-archive")
}

/// `/abs/<id>` becomes `/pdf/<id>.pdf`; `/pdf/<id>[.pdf]` is normalised to the same.
fn arxiv_pdf(url: &Url) -> Option<String> {
    let path = url.path();
    let id = path.strip_prefix("/abs/").or_else(|| path.strip_prefix("/pdf/"))?;
    let id = id.trim_end_matches('/');
    if id.is_empty() {
        return None;
    }

    let mut pdf = url.clone();
    let file = if id.ends_with(".pdf") { id.to_string() } else { format!("{id}.pdf") };
    pdf.set_path(&format!("/pdf/{file}"));
    pdf.set_query(None);
    pdf.set_fragment(None);
    Some(pdf.to_string())
}

/// `…/<paper>.html` becomes `…/<paper>.pdf`; existing `.pdf` links pass through.
fn isca_pdf(url: &Url) -> Option<String> {
    let path = url.path();
    if path.ends_with(".pdf") {
        return Some(url.to_string());
    }
    let stem = path.strip_suffix(".html")?;

    let mut pdf = url.clone();
    pdf.set_path(&format!("{stem}.pdf"));
    pdf.set_query(None);
    pdf.set_fragment(None);
    Some(pdf.to_string())
}
