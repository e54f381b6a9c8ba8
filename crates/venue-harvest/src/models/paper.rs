//! Paper data model matching the Semantic Scholar bulk search schema.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A research paper as returned by the bulk search endpoint.
///
/// Only the fields named in the request are populated; everything else
/// deserializes to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Unique Semantic Scholar paper ID.
    #[serde(default)]
    pub paper_id: String,

    /// Paper title.
    #[serde(default)]
    pub title: Option<String>,

    /// Paper abstract.
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,

    /// Publication venue (journal or conference).
    #[serde(default)]
    pub venue: Option<String>,

    /// List of authors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<AuthorRef>,

    /// Semantic Scholar landing page.
    #[serde(default)]
    pub url: Option<String>,

    /// External identifiers (DOI, ArXiv, CorpusId).
    #[serde(default)]
    pub external_ids: Option<ExternalIds>,
}

impl Paper {
    /// External identifiers, or an empty set when the field was absent.
    #[must_use]
    pub fn ids(&self) -> ExternalIds {
        self.external_ids.clone().unwrap_or_default()
    }

    /// Get author names as a `; `-separated string.
    #[must_use]
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Minimal author reference embedded in a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    /// Author ID.
    #[serde(default)]
    pub author_id: Option<String>,

    /// Author name.
    #[serde(default)]
    pub name: Option<String>,
}

/// External identifiers for a paper.
///
/// Schemes other than the three used for deduplication are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    /// Digital Object Identifier.
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,

    /// ArXiv preprint ID.
    #[serde(rename = "ArXiv", alias = "ARXIV", alias = "arXiv", default)]
    pub arxiv: Option<String>,

    /// Semantic Scholar Corpus ID.
    #[serde(rename = "CorpusId", default)]
    pub corpus_id: Option<i64>,
}

/// One page of bulk search results with continuation token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkSearchResult {
    /// Estimated total number of matching papers.
    #[serde(default)]
    pub total: i64,

    /// Continuation token for next page (None = no more results).
    #[serde(default)]
    pub token: Option<String>,

    /// List of papers in this page.
    #[serde(default)]
    pub data: Vec<Paper>,
}
