use std::fmt::Write as _;

use super::{FontMetrics, Renderer};
use crate::color::Rgb;
use crate::error::Result;
use crate::frame::RenderedFrame;
use crate::pipeline::Stage;

/// Minimal markup tree handed to the host for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

impl MarkupNode {
    fn element(tag: &'static str, attrs: Vec<(&'static str, String)>, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag,
            attrs,
            children,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            MarkupNode::Text(_) => &[],
        }
    }

    /// Serializes to HTML with text and attribute escaping
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => escape_into(text, out),
            MarkupNode::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                if *tag == "br" {
                    out.push('>');
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    /// Text content with `br` elements as newlines
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element { tag: "br", .. } => out.push('\n'),
            MarkupNode::Element { children, .. } => {
                for child in children {
                    child.write_text(out);
                }
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupOptions {
    pub font: FontMetrics,
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            font: FontMetrics::default(),
            foreground: Some(Rgb::BLACK),
            background: Some(Rgb::WHITE),
        }
    }
}

/// Renders a grid as a `<pre>` block, one line per row, one span per
/// colored cell
#[derive(Debug, Clone, Default)]
pub struct MarkupRenderer {
    options: MarkupOptions,
}

impl MarkupRenderer {
    pub fn new(options: MarkupOptions) -> Self {
        Self { options }
    }

    fn container_style(&self) -> String {
        let font = &self.options.font;
        let mut style = format!(
            "font-family: {}; font-size: {}px; line-height: {}px; margin: 0",
            font.family, font.size, font.line_height
        );
        if let Some(color) = self.options.foreground {
            let _ = write!(style, "; color: {color}");
        }
        if let Some(background) = self.options.background {
            let _ = write!(style, "; background: {background}");
        }
        style
    }
}

impl Renderer for MarkupRenderer {
    type Artifact = MarkupNode;

    fn render(&mut self, frame: RenderedFrame) -> Result<MarkupNode> {
        let mut children = Vec::new();

        for (row, cells) in frame.rows().enumerate() {
            if row > 0 {
                children.push(MarkupNode::element("br", Vec::new(), Vec::new()));
            }

            if frame.is_colored() {
                children.extend(cells.iter().map(|cell| {
                    let attrs = cell
                        .color
                        .map(|color| vec![("style", format!("color: {}", color.to_css()))])
                        .unwrap_or_default();
                    MarkupNode::element("span", attrs, vec![MarkupNode::Text(cell.glyph.to_string())])
                }));
            } else {
                children.push(MarkupNode::Text(cells.iter().map(|c| c.glyph).collect()));
            }
        }

        Ok(MarkupNode::element(
            "pre",
            vec![("style", self.container_style())],
            children,
        ))
    }
}

impl Stage for MarkupRenderer {
    type Input = RenderedFrame;
    type Output = MarkupNode;

    fn process(&mut self, input: RenderedFrame) -> Result<MarkupNode> {
        self.render(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;
    use crate::config::ConversionConfig;
    use crate::converter::convert;
    use crate::frame::Frame;

    fn grid(colored: bool) -> RenderedFrame {
        let mut raw = Vec::new();
        for _ in 0..2 {
            raw.extend_from_slice(&[0, 0, 0, 255, 255, 0, 0, 255]);
        }
        let frame = Frame::from_raw(2, 2, raw).unwrap();
        let config = ConversionConfig::new(2, 2)
            .colored(colored)
            .with_charset(Charset::from_str_ramp(" <&").unwrap());
        convert(&frame, &config).unwrap()
    }

    #[test]
    fn test_uncolored_rows_are_text() {
        let node = MarkupRenderer::default().render(grid(false)).unwrap();
        assert_eq!(node.children().len(), 3);
        assert_eq!(node.to_plain_text(), " <\n <");
    }

    #[test]
    fn test_html_is_escaped_and_deterministic() {
        let mut renderer = MarkupRenderer::default();
        let html = renderer.render(grid(false)).unwrap().to_html();
        assert_eq!(
            html,
            "<pre style=\"font-family: monospace; font-size: 7px; line-height: 7px; margin: 0; \
             color: #000000; background: #ffffff\"> &lt;<br> &lt;</pre>"
        );
        assert_eq!(renderer.render(grid(false)).unwrap().to_html(), html);
    }

    #[test]
    fn test_colored_cells_become_spans() {
        let node = MarkupRenderer::new(MarkupOptions {
            foreground: None,
            background: None,
            ..Default::default()
        })
        .render(grid(true))
        .unwrap();

        // 2 spans + br + 2 spans
        assert_eq!(node.children().len(), 5);
        assert_eq!(
            node.children()[1].to_html(),
            "<span style=\"color: rgb(255, 0, 0)\">&lt;</span>"
        );
        assert_eq!(node.to_plain_text(), " <\n <");
    }
}
