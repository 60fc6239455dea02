// ABOUTME: HTML generation module for the bildumilo application
// ABOUTME: Renders the document tree into positioned slide markup inside a template

use crate::document::{Document, Image, Node, Slide};
use crate::resources::ResourceFile;
use log::info;
use regex::{Captures, Regex};
use std::fmt::Write;
use std::sync::LazyLock;

static INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"``(.+?)``|\*\*(.+?)\*\*|\*([^*\s][^*]*?)\*|:math:`(.+?)`|`([^`<]+?)\s*<([^>`]+)>`_")
        .expect("valid regex")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));

/// Presentation behaviour switches that end up in the markup
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlSettings {
    pub skip_notes: bool,
    pub auto_console: bool,
    pub skip_help: bool,
    pub slide_numbers: bool,
    pub default_movement: i64,
    pub mathjax_url: String,
}

/// Render a document into the given template
pub fn render(
    document: &Document,
    template: &str,
    settings: &HtmlSettings,
    css: &[ResourceFile],
    js: &[ResourceFile],
) -> String {
    info!("Rendering {} slides to HTML", document.slides.len());

    let mut head = String::new();
    for resource in css {
        head.push_str(&resource.tag());
        head.push('\n');
    }
    if document.has_math() {
        let _ = writeln!(
            head,
            r#"<script type="text/javascript" src="{}"></script>"#,
            escape(&settings.mathjax_url)
        );
    }

    let mut scripts = String::new();
    for resource in js {
        scripts.push_str(&resource.tag());
        scripts.push('\n');
    }

    let title = escape(&document.title());
    let root = root_attributes(document, settings);
    let slides = render_slides(document, settings);
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "title" => title.clone(),
            "head" => head.trim_end().to_string(),
            "root_attributes" => root.clone(),
            "slides" => slides.clone(),
            "scripts" => scripts.trim_end().to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

fn root_attributes(document: &Document, settings: &HtmlSettings) -> String {
    let doc = &document.settings;
    let mut attrs = vec![(String::from("id"), String::from("impress"))];
    if settings.auto_console || doc.auto_console {
        attrs.push(("data-auto-console".into(), "true".into()));
    }
    if settings.skip_help || doc.skip_help {
        attrs.push(("data-skip-help".into(), "true".into()));
    }
    if settings.slide_numbers || doc.slide_numbers {
        attrs.push(("data-slide-numbers".into(), "true".into()));
    }
    for (name, value) in &doc.extra {
        if name.starts_with("data-") {
            attrs.push((name.clone(), value.clone()));
        }
    }
    format_attributes(&attrs)
}

fn format_attributes(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_slides(document: &Document, settings: &HtmlSettings) -> String {
    let show_numbers = settings.slide_numbers || document.settings.slide_numbers;
    let mut out = String::new();
    let mut x: Option<i64> = None;

    for (index, slide) in document.slides.iter().enumerate() {
        let position = match slide.attribute("data-x").and_then(|v| v.trim().parse::<i64>().ok()) {
            Some(explicit) => explicit,
            None => x.map_or(0, |prev| prev.saturating_add(settings.default_movement)),
        };
        x = Some(position);

        let _ = writeln!(out, "<div {}>", slide_attributes(slide, index, position));
        for node in &slide.nodes {
            render_node(&mut out, node, settings);
        }
        if show_numbers {
            let _ = writeln!(out, r#"<div class="slide-number">{}</div>"#, index + 1);
        }
        out.push_str("</div>\n");
    }
    out.trim_end().to_string()
}

fn slide_attributes(slide: &Slide, index: usize, position: i64) -> String {
    let mut classes = vec!["step".to_string()];
    let mut attrs = Vec::new();
    let mut has_id = false;

    for (name, value) in &slide.attributes {
        match name.as_str() {
            "class" => classes.extend(value.split_whitespace().map(str::to_string)),
            "data-x" => {}
            "id" => {
                has_id = true;
                attrs.push((name.clone(), value.clone()));
            }
            _ => attrs.push((name.clone(), value.clone())),
        }
    }
    if !has_id {
        attrs.insert(0, ("id".to_string(), format!("step-{}", index + 1)));
    }
    attrs.insert(0, ("class".to_string(), classes.join(" ")));
    attrs.push(("data-x".to_string(), position.to_string()));
    if slide.attribute("data-y").is_none() {
        attrs.push(("data-y".to_string(), "0".to_string()));
    }
    format_attributes(&attrs)
}

fn render_node(out: &mut String, node: &Node, settings: &HtmlSettings) {
    match node {
        Node::Title { level, text } => {
            let level = (*level).clamp(1, 6);
            let _ = writeln!(out, "<h{0}>{1}</h{0}>", level, inline(text));
        }
        Node::Paragraph(text) => {
            let _ = writeln!(out, "<p>{}</p>", inline(text));
        }
        Node::BulletList(items) => {
            out.push_str("<ul>\n");
            for item in items {
                let _ = writeln!(out, "<li>{}</li>", inline(item));
            }
            out.push_str("</ul>\n");
        }
        Node::LiteralBlock(text) => {
            let _ = writeln!(out, "<pre>{}</pre>", escape(text));
        }
        Node::Math(text) => {
            let _ = writeln!(out, r#"<div class="math">\[{}\]</div>"#, escape(text));
        }
        Node::Image(image) => {
            let _ = writeln!(out, "{}", image_tag(image));
        }
        Node::Notes(nodes) => {
            if settings.skip_notes {
                return;
            }
            out.push_str("<div class=\"notes\">\n");
            for child in nodes {
                render_node(out, child, settings);
            }
            out.push_str("</div>\n");
        }
        Node::Error(message) => {
            let _ = writeln!(
                out,
                r#"<div class="system-message error"><p>{}</p></div>"#,
                escape(message)
            );
        }
    }
}

/// Image markup. `scale` is a percentage applied to explicit dimensions.
fn image_tag(image: &Image) -> String {
    let factor = image.scale.map(|s| s / 100.0);
    let scaled = |v: u32| match factor {
        Some(f) => ((f64::from(v) * f).round() as u32).to_string(),
        None => v.to_string(),
    };

    let mut attrs = vec![("src".to_string(), image.uri.clone())];
    if let Some(alt) = &image.alt {
        attrs.push(("alt".to_string(), alt.clone()));
    }
    if let Some(width) = image.width {
        attrs.push(("width".to_string(), scaled(width)));
    }
    if let Some(height) = image.height {
        attrs.push(("height".to_string(), scaled(height)));
    }
    if let (Some(scale), None, None) = (image.scale, image.width, image.height) {
        attrs.push(("style".to_string(), format!("zoom: {}%", scale)));
    }
    let mut classes = image.classes.clone();
    if let Some(align) = &image.align {
        classes.push(format!("align-{}", align));
    }
    if !classes.is_empty() {
        attrs.push(("class".to_string(), classes.join(" ")));
    }
    format!("<img {}>", format_attributes(&attrs))
}

/// Inline markup: literals, strong, emphasis, math roles and named links
pub fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in INLINE.captures_iter(text) {
        let whole = caps.get(0).expect("match has a whole group");
        out.push_str(&escape(&text[last..whole.start()]));
        out.push_str(&inline_element(&caps));
        last = whole.end();
    }
    out.push_str(&escape(&text[last..]));
    out
}

fn inline_element(caps: &Captures) -> String {
    if let Some(m) = caps.get(1) {
        format!("<code>{}</code>", escape(m.as_str()))
    } else if let Some(m) = caps.get(2) {
        format!("<strong>{}</strong>", escape(m.as_str()))
    } else if let Some(m) = caps.get(3) {
        format!("<em>{}</em>", escape(m.as_str()))
    } else if let Some(m) = caps.get(4) {
        format!(r#"<span class="math">\({}\)</span>"#, escape(m.as_str()))
    } else {
        let label = caps.get(5).map_or("", |m| m.as_str());
        let href = caps.get(6).map_or("", |m| m.as_str());
        format!(r#"<a href="{}">{}</a>"#, escape(href), escape(label))
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentSettings;
    use crate::resources::ResourceKind;

    fn settings() -> HtmlSettings {
        HtmlSettings {
            skip_notes: false,
            auto_console: false,
            skip_help: false,
            slide_numbers: false,
            default_movement: 1600,
            mathjax_url: "https://example.com/MathJax.js".to_string(),
        }
    }

    fn slide(attributes: &[(&str, &str)], nodes: Vec<Node>) -> Slide {
        Slide {
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            nodes,
        }
    }

    const TEMPLATE: &str = "<title>{{title}}</title>{{head}}<div {{root_attributes}}>{{slides}}</div>{{scripts}}";

    #[test]
    fn test_inline_markup() {
        assert_eq!(
            inline("a **b** *c* ``d<e>`` `site <https://x.org>`_ & f"),
            r#"a <strong>b</strong> <em>c</em> <code>d&lt;e&gt;</code> <a href="https://x.org">site</a> &amp; f"#
        );
    }

    #[test]
    fn test_slides_are_positioned_by_movement() {
        let document = Document {
            slides: vec![
                slide(&[], vec![Node::Paragraph("one".into())]),
                slide(&[], vec![]),
                slide(&[("data-x", "10000"), ("id", "end")], vec![]),
                slide(&[], vec![]),
            ],
            ..Document::default()
        };
        let html = render(&document, TEMPLATE, &settings(), &[], &[]);
        assert!(html.contains(r#"<div class="step" id="step-1" data-x="0" data-y="0">"#));
        assert!(html.contains(r#"id="step-2" data-x="1600""#));
        assert!(html.contains(r#"<div class="step" id="end" data-x="10000" data-y="0">"#));
        assert!(html.contains(r#"id="step-4" data-x="11600""#));
        assert!(html.contains("<p>one</p>"));
        assert!(html.contains("<title>Presentation</title>"));
    }

    #[test]
    fn test_movement_saturates_at_extreme_positions() {
        let document = Document {
            slides: vec![
                slide(&[("data-x", &i64::MAX.to_string())], vec![]),
                slide(&[], vec![]),
            ],
            ..Document::default()
        };
        let html = render(&document, TEMPLATE, &settings(), &[], &[]);
        assert_eq!(html.matches(&format!(r#"data-x="{}""#, i64::MAX)).count(), 2);

        let mut backwards = settings();
        backwards.default_movement = i64::MIN;
        let document = Document {
            slides: vec![slide(&[("data-x", "-1")], vec![]), slide(&[], vec![])],
            ..Document::default()
        };
        let html = render(&document, TEMPLATE, &backwards, &[], &[]);
        assert!(html.contains(&format!(r#"data-x="{}""#, i64::MIN)));
    }

    #[test]
    fn test_placeholders_in_slide_text_are_left_alone() {
        let document = Document {
            slides: vec![slide(
                &[],
                vec![Node::LiteralBlock("{{scripts}} and {{title}}".into())],
            )],
            ..Document::default()
        };
        let js = [ResourceFile::new("https://cdn.example.com/app.js", ResourceKind::Js)];
        let html = render(&document, TEMPLATE, &settings(), &[], &js);
        assert!(html.contains("<pre>{{scripts}} and {{title}}</pre>"));
        assert_eq!(html.matches("<script").count(), 1);
        assert!(html.starts_with("<title>Presentation</title>"));
    }

    #[test]
    fn test_notes_can_be_skipped() {
        let document = Document {
            slides: vec![slide(
                &[],
                vec![Node::Notes(vec![Node::Paragraph("secret".into())])],
            )],
            ..Document::default()
        };
        let shown = render(&document, TEMPLATE, &settings(), &[], &[]);
        assert!(shown.contains(r#"<div class="notes">"#));

        let mut skip = settings();
        skip.skip_notes = true;
        let hidden = render(&document, TEMPLATE, &skip, &[], &[]);
        assert!(!hidden.contains("secret"));
    }

    #[test]
    fn test_flags_resources_and_mathjax() {
        let document = Document {
            settings: DocumentSettings {
                skip_help: true,
                ..DocumentSettings::default()
            },
            slides: vec![slide(&[], vec![Node::Math("x^2".into())])],
            ..Document::default()
        };
        let mut flags = settings();
        flags.auto_console = true;
        flags.slide_numbers = true;

        let css = [ResourceFile::new("/tmp/extra.css", ResourceKind::Css)];
        let js = [ResourceFile::new("https://cdn.example.com/app.js", ResourceKind::Js)];
        let html = render(&document, TEMPLATE, &flags, &css, &js);

        assert!(html.contains(
            r#"id="impress" data-auto-console="true" data-skip-help="true" data-slide-numbers="true""#
        ));
        assert!(html.contains(r#"<link rel="stylesheet" href="extra.css">"#));
        assert!(html.contains(r#"<script src="https://cdn.example.com/app.js"></script>"#));
        assert!(html.contains(r#"src="https://example.com/MathJax.js""#));
        assert!(html.contains(r#"<div class="slide-number">1</div>"#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_image_and_error_nodes() {
        let mut image = Image::new("deck/img/graph_1.png");
        image.alt = Some("graph".into());
        image.width = Some(400);
        image.scale = Some(50.0);
        image.align = Some("center".into());
        let document = Document {
            slides: vec![slide(
                &[],
                vec![Node::Image(image), Node::Error("Error generating Graphviz image: boom".into())],
            )],
            ..Document::default()
        };
        let html = render(&document, TEMPLATE, &settings(), &[], &[]);
        assert!(html.contains(
            r#"<img src="deck/img/graph_1.png" alt="graph" width="200" class="align-center">"#
        ));
        assert!(html.contains(r#"<div class="system-message error"><p>Error generating Graphviz image: boom</p></div>"#));
    }
}
