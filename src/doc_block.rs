//! Doc-comment parsing.
//!
//! A doc block is the text of the `///` comments (`#[doc = ".."]` attributes) of an
//! item. Lines starting with `@` are tags, `@name rest of line`. The first prose
//! paragraph is the summary and the remaining prose is the description.

use syn::{Attribute, Expr, Lit, Meta};

/// One `@name value` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    /// Tag name including the `@`
    pub name: String,
    pub value: String,
}

/// Parsed doc-comment of an item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    /// The comment text as written
    pub raw: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<DocTag>,
}

impl DocBlock {
    /// Parses the doc attributes of an item; `None` when it has no documentation.
    ///
    /// A `#[deprecated]` attribute is reported as a `@deprecated` tag.
    pub fn from_attrs(attrs: &[Attribute]) -> Option<Self> {
        let lines: Vec<String> = attrs.iter().filter_map(doc_line).collect();
        let deprecation = attrs
            .iter()
            .find(|attr| attr.path().is_ident("deprecated"))
            .map(deprecation_note);

        if lines.is_empty() && deprecation.is_none() {
            return None;
        }

        let mut block = Self::parse(&lines.join("\n"));
        if let Some(note) = deprecation {
            if block.tag("@deprecated").is_none() {
                block.tags.push(DocTag {
                    name: "@deprecated".to_string(),
                    value: note,
                });
            }
        }
        Some(block)
    }

    /// Parses doc-comment text
    pub fn parse(text: &str) -> Self {
        let mut tags = Vec::new();
        let mut paragraphs: Vec<Vec<&str>> = vec![Vec::new()];

        for line in text.lines().map(str::trim) {
            if let Some(tag) = line.strip_prefix('@') {
                let (name, value) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));
                tags.push(DocTag {
                    name: format!("@{}", name),
                    value: value.trim().to_string(),
                });
            } else if line.is_empty() {
                if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                    paragraphs.push(Vec::new());
                }
            } else if let Some(paragraph) = paragraphs.last_mut() {
                paragraph.push(line);
            }
        }

        let mut prose = paragraphs
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.join(" "));
        let summary = prose.next();
        let description: Vec<String> = prose.collect();

        Self {
            raw: text.to_string(),
            summary,
            description: (!description.is_empty()).then(|| description.join("\n\n")),
            tags,
        }
    }

    /// First tag with the given name (`@deprecated`)
    pub fn tag(&self, name: &str) -> Option<&DocTag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.raw.contains(needle)
    }

    /// Summary and description joined, for schema descriptions
    pub fn text(&self) -> Option<String> {
        match (&self.summary, &self.description) {
            (Some(s), Some(d)) => Some(format!("{}\n\n{}", s, d)),
            (Some(s), None) => Some(s.clone()),
            (None, Some(d)) => Some(d.clone()),
            (None, None) => None,
        }
    }
}

fn doc_line(attr: &Attribute) -> Option<String> {
    if !attr.path().is_ident("doc") {
        return None;
    }
    let Meta::NameValue(meta) = &attr.meta else {
        return None;
    };
    match &meta.value {
        Expr::Lit(expr) => match &expr.lit {
            Lit::Str(s) => Some(strip_gutter(&s.value())),
            _ => None,
        },
        _ => None,
    }
}

/// `///` lines lose their leading space; every line of a `/** */` block also
/// loses the ` * ` gutter.
fn strip_gutter(value: &str) -> String {
    if !value.contains('\n') {
        return value.strip_prefix(' ').unwrap_or(value).to_string();
    }

    value
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn deprecation_note(attr: &Attribute) -> String {
    let mut note = String::new();
    match &attr.meta {
        Meta::NameValue(meta) => {
            if let Expr::Lit(syn::ExprLit {
                lit: Lit::Str(s), ..
            }) = &meta.value
            {
                note = s.value();
            }
        }
        Meta::List(_) => {
            let _ = attr.parse_nested_meta(|nested| {
                if nested.path.is_ident("note") {
                    let value: syn::LitStr = nested.value()?.parse()?;
                    note = value.value();
                } else if nested.input.peek(syn::Token![=]) {
                    let _: Expr = nested.value()?.parse()?;
                }
                Ok(())
            });
        }
        Meta::Path(_) => {}
    }
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs_of(code: &str) -> Vec<Attribute> {
        let item: syn::ItemFn = syn::parse_str(code).unwrap();
        item.attrs
    }

    #[test]
    fn test_parse_summary_description_and_tags() {
        let block = DocBlock::parse(
            "List users.\n\nReturns every active user,\nnewest first.\n\n@deprecated use v2\n@only-docs",
        );

        assert_eq!(block.summary.as_deref(), Some("List users."));
        assert_eq!(
            block.description.as_deref(),
            Some("Returns every active user, newest first.")
        );
        assert_eq!(
            block.tags,
            vec![
                DocTag {
                    name: "@deprecated".to_string(),
                    value: "use v2".to_string()
                },
                DocTag {
                    name: "@only-docs".to_string(),
                    value: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_from_attrs_reads_doc_comments() {
        let attrs = attrs_of(
            r#"
            /// Show a user.
            ///
            /// @deprecated
            fn show() {}
            "#,
        );

        let block = DocBlock::from_attrs(&attrs).unwrap();
        assert_eq!(block.summary.as_deref(), Some("Show a user."));
        assert!(block.tag("@deprecated").is_some());
        assert!(block.contains("@deprecated"));
    }

    #[test]
    fn test_from_attrs_reads_block_comments() {
        let attrs = attrs_of("/**\n * Legacy listing.\n *\n * Kept for old clients.\n *\n * @deprecated use search\n */\nfn show() {}");

        let block = DocBlock::from_attrs(&attrs).unwrap();
        assert_eq!(block.summary.as_deref(), Some("Legacy listing."));
        assert_eq!(block.description.as_deref(), Some("Kept for old clients."));
        assert_eq!(block.tag("@deprecated").unwrap().value, "use search");

        let single = DocBlock::from_attrs(&attrs_of("/** @deprecated */ fn show() {}")).unwrap();
        assert!(single.tag("@deprecated").is_some());
    }

    #[test]
    fn test_from_attrs_without_docs() {
        let attrs = attrs_of("#[inline] fn show() {}");
        assert!(DocBlock::from_attrs(&attrs).is_none());
    }

    #[test]
    fn test_deprecated_attribute_becomes_tag() {
        let attrs = attrs_of(r#"#[deprecated(since = "1.2", note = "use show_v2")] fn show() {}"#);
        let block = DocBlock::from_attrs(&attrs).unwrap();

        let tag = block.tag("@deprecated").unwrap();
        assert_eq!(tag.value, "use show_v2");
        assert!(block.summary.is_none());
    }

    #[test]
    fn test_text_joins_summary_and_description() {
        let block = DocBlock::parse("The email.\n\nMust be unique.");
        assert_eq!(block.text().as_deref(), Some("The email.\n\nMust be unique."));
        assert_eq!(DocBlock::parse("@internal").text(), None);
    }
}
