use crate::error::Result;
use crate::transport::Document;
use select::document::Document as HtmlDocument;
use select::predicate::{Attr, Name, Predicate, Text};
use serde_json::{Map, Value, json};
use url::Url;

/// Turns a retrieved document into a structured payload.
///
/// Chosen when the engine is constructed; executors never swap it at runtime.
/// Returning `Err` turns an otherwise successful fetch into a failure outcome.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<Map<String, Value>>;
}

/// Generic page summary: title, description, headings, links, images and text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl DefaultExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for DefaultExtractor {
    fn extract(&self, document: &Document) -> Result<Map<String, Value>> {
        let html = HtmlDocument::from(document.body.as_str());
        let base = Url::parse(&document.final_url).ok();
        let resolve = |href: &str| -> String {
            base.as_ref()
                .and_then(|b| b.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| href.to_string())
        };

        let title = html
            .find(Name("title"))
            .next()
            .map(|n| clean_text(&n.text()))
            .unwrap_or_default();

        let meta_description = html
            .find(Name("meta").and(Attr("name", "description")))
            .next()
            .and_then(|n| n.attr("content").map(clean_text))
            .unwrap_or_default();

        let mut headings = Vec::new();
        for level in 1..=6 {
            let tag = format!("h{}", level);
            for node in html.find(Name(tag.as_str())) {
                headings.push(json!({ "level": level, "text": clean_text(&node.text()) }));
            }
        }

        let links: Vec<Value> = html
            .find(Name("a").and(Attr("href", ())))
            .filter_map(|n| {
                let href = n.attr("href")?;
                Some(json!({
                    "url": resolve(href),
                    "text": clean_text(&n.text()),
                    "title": n.attr("title").unwrap_or(""),
                }))
            })
            .collect();

        let images: Vec<Value> = html
            .find(Name("img").and(Attr("src", ())))
            .filter_map(|n| {
                let src = n.attr("src")?;
                Some(json!({
                    "url": resolve(src),
                    "alt": n.attr("alt").unwrap_or(""),
                    "title": n.attr("title").unwrap_or(""),
                }))
            })
            .collect();

        // Adjacent text nodes are joined as-is so inline markup does not split words.
        let raw_text: String = html
            .find(Text)
            .filter(|n| {
                !n.parent()
                    .is_some_and(|p| matches!(p.name(), Some("script") | Some("style")))
            })
            .filter_map(|n| n.as_text())
            .collect();
        let text_content = clean_text(&raw_text);
        let word_count = text_content.split_whitespace().count();

        let mut data = Map::new();
        data.insert("url".into(), json!(document.url));
        data.insert("title".into(), json!(title));
        data.insert("meta_description".into(), json!(meta_description));
        data.insert("headings".into(), Value::Array(headings));
        data.insert("links".into(), Value::Array(links));
        data.insert("images".into(), Value::Array(images));
        data.insert("text_content".into(), json!(text_content));
        data.insert("word_count".into(), json!(word_count));
        Ok(data)
    }
}

/// Collapses whitespace and strips control characters.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
