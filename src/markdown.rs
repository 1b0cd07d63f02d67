//! Markdown to HTML conversion.
//!
//! Built on `pulldown-cmark` with a fixed set of extensions that are always
//! on, plus one switch controlled by page metadata (`toc`).
//!
//! | Behaviour | How |
//! |-----------|-----|
//! | tables, footnotes, strikethrough | pulldown-cmark extensions |
//! | smart punctuation | pulldown-cmark extension |
//! | fenced code, raw HTML blocks | CommonMark core |
//! | no intra-word `_` emphasis | CommonMark core |
//! | heading IDs | slug of the heading text, `-1`, `-2`… on repeats; `{#id}` wins |
//! | autolinks | bare `http://` / `https://` URLs in text become links |
//! | table of contents | `<nav class="toc">` before the content when `toc` is set |

use maud::{Markup, html};
use pulldown_cmark::{
    CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
    html as md_html,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).expect("valid URL pattern"));

/// Switches derived from page metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownOptions {
    pub toc: bool,
}

/// One heading as listed in the table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub text: String,
}

fn extensions() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Convert Markdown to an HTML fragment.
pub fn render_markdown(input: &str, options: MarkdownOptions) -> String {
    let parser = TextMergeStream::new(Parser::new_ext(input, extensions()));
    let mut events = autolink(parser);
    let headings = assign_heading_ids(&mut events);

    let mut out = String::with_capacity(input.len() * 3 / 2);
    if options.toc {
        out.push_str(&render_toc(&headings).into_string());
        out.push('\n');
    }
    md_html::push_html(&mut out, events.into_iter());
    out
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Anchor slug for heading text: lowercase alphanumerics joined by single dashes.
pub fn heading_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Give every heading an `id` and return them in document order.
fn assign_heading_ids(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut entries = Vec::new();
    let mut open: Option<(usize, String)> = None;

    for i in 0..events.len() {
        match &events[i] {
            Event::Start(Tag::Heading { .. }) => {
                open = Some((i, String::new()));
                continue;
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, text)) = open.as_mut() {
                    text.push_str(t);
                }
                continue;
            }
            Event::End(TagEnd::Heading(_)) => {}
            _ => continue,
        }

        let Some((start, text)) = open.take() else {
            continue;
        };
        if let Event::Start(Tag::Heading { level, id, .. }) = &mut events[start] {
            let base = id
                .as_deref()
                .map(String::from)
                .unwrap_or_else(|| heading_slug(&text));
            let count = seen.entry(base.clone()).or_insert(0);
            let unique = if *count == 0 {
                base
            } else {
                format!("{base}-{count}")
            };
            *count += 1;

            *id = Some(CowStr::from(unique.clone()));
            entries.push(TocEntry {
                level: level_number(*level),
                id: unique,
                text: text.trim().to_string(),
            });
        }
    }
    entries
}

/// Turn bare URLs in plain text into links. Text inside links, images and
/// code blocks is left alone.
fn autolink<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut shielded = 0usize;

    for event in events {
        match event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                shielded += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                shielded = shielded.saturating_sub(1);
                out.push(event);
            }
            Event::Text(text) if shielded == 0 && BARE_URL.is_match(&text) => {
                split_urls(&text, &mut out);
            }
            other => out.push(other),
        }
    }
    out
}

fn split_urls<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    for m in BARE_URL.find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?']);
        let end = m.start() + url.len();
        if m.start() > last {
            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_string()),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = end;
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

/// Table of contents as a flat list; nesting is expressed by `toc-hN` classes.
pub fn render_toc(entries: &[TocEntry]) -> Markup {
    html! {
        nav.toc {
            ul {
                @for entry in entries {
                    li class=(format!("toc-h{}", entry.level)) {
                        a href=(format!("#{}", entry.id)) { (entry.text) }
                    }
                }
            }
        }
    }
}
