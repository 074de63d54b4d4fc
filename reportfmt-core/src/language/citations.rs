use super::checker::compile_all;
use crate::config::{CitationConfig, UrlSource};
use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s()\[\]<>"]+"#).unwrap());

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '’', '”'];

/// A URL standing in running text without a citation around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlMatch {
    pub start: usize,
    pub end: usize,
    pub url: String,
}

/// APA in-text citations and bare URLs.
#[derive(Debug)]
pub struct CitationChecker {
    apa: Vec<Regex>,
    sources: Vec<UrlSource>,
}

impl CitationChecker {
    pub fn new(config: &CitationConfig) -> Result<Self> {
        Ok(Self {
            apa: compile_all(&config.apa_patterns, "citation")?,
            sources: config.url_sources.clone(),
        })
    }

    /// Every APA-style citation in the text, in order of appearance.
    pub fn citations(&self, text: &str) -> Vec<String> {
        let mut found: Vec<(usize, String)> = self
            .apa
            .iter()
            .flat_map(|regex| regex.find_iter(text).map(|m| (m.start(), m.as_str().to_string())))
            .collect();
        found.sort();
        found.dedup();
        found.into_iter().map(|(_, citation)| citation).collect()
    }

    /// URLs not wrapped in parentheses or brackets. Sentence punctuation
    /// after a URL is not part of it.
    pub fn bare_urls(&self, text: &str) -> Vec<UrlMatch> {
        URL.find_iter(text)
            .filter_map(|m| {
                let url = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
                let start = m.start();
                let end = start + url.len();
                let opened = text[..start].ends_with(['(', '[']);
                let closed = text[m.end()..].starts_with([')', ']']);
                (!opened && !closed).then(|| UrlMatch {
                    start,
                    end,
                    url: url.to_string(),
                })
            })
            .collect()
    }

    /// Source name for a known site, matched on the URL's host.
    pub fn source_name(&self, url: &str) -> Option<&str> {
        let host = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(url)
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        self.sources
            .iter()
            .find(|source| {
                host == source.domain || host.ends_with(&format!(".{}", source.domain))
            })
            .map(|source| source.name.as_str())
    }

    pub fn citation_for(&self, url: &str) -> String {
        match self.source_name(url) {
            Some(name) => format!("({name}, retrieved from {url})"),
            None => format!("(Retrieved from {url})"),
        }
    }
}
