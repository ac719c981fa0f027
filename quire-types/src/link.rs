//! Typed links carried by license and status documents.
//!
//! Links may be URI templates. Only the two template operators used by
//! status authorities are supported: simple string expansion (`{id}`) and
//! form-style query expansion (`{?id,name}` / `{&end}`).

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// A link to a remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URI or URI template.
    pub href: String,
    /// Link relations. Documents may carry a single string or an array.
    #[serde(default, deserialize_with = "one_or_many")]
    pub rel: Vec<String>,
    /// Media type of the target resource.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Whether `href` is a URI template.
    #[serde(default)]
    pub templated: bool,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    /// Creates a plain link with a single relation.
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: vec![rel.into()],
            media_type: None,
            templated: false,
            title: None,
        }
    }

    /// Marks the link as a URI template.
    #[must_use]
    pub fn templated(mut self) -> Self {
        self.templated = true;
        self
    }

    /// Sets the media type of the link target.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Returns true if the link carries the given relation.
    #[must_use]
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rel.iter().any(|r| r == rel)
    }

    /// Returns true if the target is a web page meant to be shown to a user.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.media_type.as_deref().is_some_and(|t| {
            let essence = t.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case("text/html")
                || essence.eq_ignore_ascii_case("application/xhtml+xml")
        })
    }

    /// Builds the target URL for the given parameters.
    ///
    /// Templated links are expanded; parameters missing from `params` expand
    /// to nothing. Non-templated links get every parameter appended as a
    /// query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if a template expression is not
    /// closed.
    pub fn url(&self, params: &[(&str, &str)]) -> Result<String> {
        if self.templated {
            expand_template(&self.href, params)
        } else {
            Ok(append_query(&self.href, params))
        }
    }
}

/// Returns the first link carrying `rel`.
pub fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a Link> {
    links.iter().find(|l| l.has_rel(rel))
}

/// Returns every link carrying `rel`.
pub fn find_links<'a>(links: &'a [Link], rel: &str) -> Vec<&'a Link> {
    links.iter().filter(|l| l.has_rel(rel)).collect()
}

fn append_query(href: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return href.to_string();
    }
    let separator = if href.contains('?') { '&' } else { '?' };
    format!("{href}{separator}{}", encode_pairs(params.iter().copied()))
}

fn encode_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn expand_template(template: &str, params: &[(&str, &str)]) -> Result<String> {
    let lookup = |name: &str| params.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::InvalidTemplate(template.to_string()))?;
        let expression = &after[..end];

        let (operator, names) = match expression.chars().next() {
            Some(op @ ('?' | '&')) => (Some(op), &expression[1..]),
            _ => (None, expression),
        };
        let names = names.split(',').map(str::trim).filter(|n| !n.is_empty());

        match operator {
            Some(op) => {
                let pairs: Vec<(&str, &str)> =
                    names.filter_map(|n| lookup(n).map(|v| (n, v))).collect();
                if !pairs.is_empty() {
                    out.push(op);
                    out.push_str(&encode_pairs(pairs.into_iter()));
                }
            }
            None => {
                let values: Vec<String> = names
                    .filter_map(lookup)
                    .map(|v| urlencoding::encode(v).into_owned())
                    .collect();
                out.push_str(&values.join(","));
            }
        }

        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(rel) => vec![rel],
        OneOrMany::Many(rels) => rels,
    })
}
