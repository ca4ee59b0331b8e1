//! WordprocessingML writer
//!
//! Each block is serialized into the document body as soon as it is pushed.
//! Hyperlink targets and image bytes are kept only until the package is
//! assembled by [`DocxWriter::finish`].

use crate::document::{
    Align, Block, BlockSink, CodeBlock, EmbeddedImage, Indent, Inline, ListMarker, MathContent,
    RunStyle, Table, TextRun,
};
use crate::package::{self, MediaPart, PackageError, Relationship};
use crate::theme::*;
use quick_xml::escape::escape;

/// Streaming document writer
#[derive(Debug, Default)]
pub struct DocxWriter {
    body: String,
    relationships: Vec<Relationship>,
    media: Vec<MediaPart>,
    last_was_table: bool,
    drawing_count: u32,
    block_count: usize,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized body content written so far
    pub fn body_xml(&self) -> &str {
        &self.body
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Close the body and assemble the `.docx` package
    pub fn finish(mut self) -> Result<Vec<u8>, PackageError> {
        if self.last_was_table {
            self.body.push_str("<w:p/>");
        }
        log::debug!(
            "packaging {} blocks, {} relationships, {} media parts",
            self.block_count,
            self.relationships.len(),
            self.media.len()
        );
        let document = package::document_xml(&self.body);
        package::write_package(&document, &self.relationships, &self.media)
    }

    fn relationship_id(&self) -> String {
        // rId1 is the styles part
        format!("rId{}", self.relationships.len() + 2)
    }

    fn add_hyperlink(&mut self, target: &str) -> String {
        let id = self.relationship_id();
        self.relationships.push(Relationship::Hyperlink {
            id: id.clone(),
            target: target.to_string(),
        });
        id
    }

    fn add_media(&mut self, image: &EmbeddedImage) -> String {
        let id = self.relationship_id();
        let name = format!(
            "image{}.{}",
            self.media.len() + 1,
            image.format.extension()
        );
        self.relationships.push(Relationship::Image {
            id: id.clone(),
            target: format!("media/{name}"),
        });
        self.media.push(MediaPart {
            name,
            data: image.data.clone(),
            format: image.format,
        });
        id
    }

    fn write_block(&mut self, block: &Block) {
        if self.last_was_table && matches!(block, Block::Table(_)) {
            // Adjacent tables would merge into one
            self.body.push_str("<w:p/>");
        }

        match block {
            Block::Heading {
                level,
                spans,
                indent,
            } => {
                let mut props = ParagraphProps {
                    style: Some(format!("Heading{}", (*level).clamp(1, 6))),
                    ..Default::default()
                };
                props.apply_indent(indent, 0);
                self.write_paragraph(&props, spans, None);
            }
            Block::Paragraph { spans, indent } => {
                let mut props = ParagraphProps::default();
                props.apply_indent(indent, LIST_INDENT * indent.list_level as u32);
                let muted = (indent.quote_depth > 0).then_some(COLOR_BLOCKQUOTE_TEXT);
                self.write_paragraph(&props, spans, muted);
            }
            Block::ListItem {
                marker,
                spans,
                indent,
            } => {
                let mut props = ParagraphProps {
                    spacing: Some((LIST_ITEM_SPACE, LIST_ITEM_SPACE)),
                    ..Default::default()
                };
                props.apply_indent(indent, LIST_INDENT * indent.list_level as u32);
                let mut all = Vec::with_capacity(spans.len() + 1);
                match marker {
                    Some(ListMarker::Ordered(n)) => {
                        all.push(Inline::styled(format!("{n}. "), RunStyle::bold()))
                    }
                    Some(ListMarker::Bullet(c)) => all.push(Inline::text(format!("{c}  "))),
                    None => {}
                }
                all.extend(spans.iter().cloned());
                let muted = (indent.quote_depth > 0).then_some(COLOR_BLOCKQUOTE_TEXT);
                self.write_paragraph(&props, &all, muted);
            }
            Block::Table(table) => self.write_table(table),
            Block::CodeBlock(code) => self.write_code_block(code),
            Block::Math { content, indent } => {
                let mut props = ParagraphProps {
                    spacing: Some((BLOCK_SPACE, BLOCK_SPACE)),
                    jc: Some("center"),
                    ..Default::default()
                };
                props.apply_indent(indent, LIST_INDENT * indent.list_level as u32);
                match content {
                    MathContent::Native(node) => {
                        self.body.push_str("<w:p>");
                        props.write(&mut self.body);
                        self.body.push_str(&node.to_omml_para());
                        self.body.push_str("</w:p>");
                    }
                    MathContent::Literal(latex) => {
                        let style = RunStyle {
                            italic: true,
                            monospace: true,
                            size: Some(SIZE_CODE_INLINE),
                            ..Default::default()
                        };
                        let span = Inline::styled(format!("[{latex}]"), style);
                        self.write_paragraph(&props, &[span], None);
                    }
                }
            }
            Block::Image(image) => {
                let props = ParagraphProps {
                    jc: Some("center"),
                    spacing: Some((BLOCK_SPACE, 0)),
                    ..Default::default()
                };
                self.write_paragraph(&props, &[Inline::Image(image.clone())], None);
            }
            Block::Caption(text) => {
                let props = ParagraphProps {
                    jc: Some("center"),
                    spacing: Some((0, BLOCK_SPACE)),
                    ..Default::default()
                };
                let style = RunStyle::italic()
                    .with_color(COLOR_CAPTION)
                    .with_size(SIZE_CAPTION);
                self.write_paragraph(&props, &[Inline::styled(text, style)], None);
            }
            Block::Notice(text) => {
                let style = RunStyle::italic().with_color(COLOR_ERROR);
                self.write_paragraph(
                    &ParagraphProps::default(),
                    &[Inline::styled(text, style)],
                    None,
                );
            }
            Block::HorizontalRule => {
                let props = ParagraphProps {
                    border_bottom: Some(COLOR_HR),
                    spacing: Some((HR_SPACE, HR_SPACE)),
                    ..Default::default()
                };
                self.write_paragraph(&props, &[], None);
            }
            Block::FootnoteHeader(label) => {
                let style = RunStyle::bold().with_size(SIZE_SMALL);
                let props = ParagraphProps {
                    spacing: Some((BLOCK_SPACE, PARA_SPACE_BEFORE)),
                    ..Default::default()
                };
                self.write_paragraph(&props, &[Inline::styled(label, style)], None);
            }
            Block::Footnote(spans) => {
                let props = ParagraphProps {
                    indent_left: Some(FOOTNOTE_INDENT),
                    spacing: Some((0, PARA_SPACE_BEFORE)),
                    ..Default::default()
                };
                let spans: Vec<Inline> = spans
                    .iter()
                    .map(|span| with_default_size(span, SIZE_FOOTNOTE))
                    .collect();
                self.write_paragraph(&props, &spans, None);
            }
        }

        self.last_was_table = matches!(block, Block::Table(_));
        self.block_count += 1;
    }

    fn write_paragraph(
        &mut self,
        props: &ParagraphProps,
        spans: &[Inline],
        default_color: Option<&'static str>,
    ) {
        self.body.push_str("<w:p>");
        props.write(&mut self.body);
        for span in spans {
            self.write_inline(span, default_color);
        }
        self.body.push_str("</w:p>");
    }

    fn write_inline(&mut self, span: &Inline, default_color: Option<&'static str>) {
        match span {
            Inline::Text(run) => write_run(&mut self.body, run, default_color),
            Inline::Link(link) => {
                let id = self.add_hyperlink(link.target());
                self.body
                    .push_str(&format!(r#"<w:hyperlink r:id="{id}" w:history="1">"#));
                write_run(&mut self.body, &link.run, None);
                self.body.push_str("</w:hyperlink>");
            }
            Inline::Math(node) => self.body.push_str(&node.to_omml()),
            Inline::Image(image) => self.write_drawing(image),
            Inline::Break => self.body.push_str("<w:r><w:br/></w:r>"),
        }
    }

    fn write_drawing(&mut self, image: &EmbeddedImage) {
        let rid = self.add_media(image);
        self.drawing_count += 1;
        let n = self.drawing_count;
        let (cx, cy) = (image.width_emu, image.height_emu);
        let descr = escape(&image.description);
        self.body.push_str(&format!(
            concat!(
                r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
                r#"<wp:docPr id="{n}" name="Picture {n}" descr="{descr}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{n}" name="Picture {n}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
                r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
            ),
            cx = cx,
            cy = cy,
            n = n,
            descr = descr,
            rid = rid,
        ));
    }

    fn write_table(&mut self, table: &Table) {
        let columns = table.columns.max(1);
        let col_width = (PAGE_WIDTH - 2 * PAGE_MARGIN) / columns as u32;

        self.body.push_str(r#"<w:tbl><w:tblPr><w:tblW w:w="5000" w:type="pct"/>"#);
        self.body.push_str("<w:tblBorders>");
        for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            self.body.push_str(&format!(
                r#"<w:{side} w:val="single" w:sz="4" w:space="0" w:color="{COLOR_TABLE_BORDER}"/>"#
            ));
        }
        self.body.push_str(r#"</w:tblBorders><w:tblLayout w:type="fixed"/>"#);
        self.body.push_str(
            r#"<w:tblCellMar><w:left w:w="80" w:type="dxa"/><w:right w:w="80" w:type="dxa"/></w:tblCellMar>"#,
        );
        self.body.push_str("</w:tblPr><w:tblGrid>");
        for _ in 0..columns {
            self.body
                .push_str(&format!(r#"<w:gridCol w:w="{col_width}"/>"#));
        }
        self.body.push_str("</w:tblGrid>");

        for (index, row) in table.rows.iter().enumerate() {
            self.body.push_str("<w:tr>");
            if index == 0 && !row.cells.is_empty() && row.cells.iter().all(|c| c.header) {
                self.body.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for cell in &row.cells {
                self.body.push_str("<w:tc><w:tcPr>");
                self.body
                    .push_str(&format!(r#"<w:tcW w:w="{col_width}" w:type="dxa"/>"#));
                if cell.header {
                    self.body.push_str(&format!(
                        r#"<w:shd w:val="clear" w:color="auto" w:fill="{COLOR_TABLE_HEADER_BG}"/>"#
                    ));
                }
                self.body.push_str("</w:tcPr>");

                let props = ParagraphProps {
                    spacing: Some((40, 40)),
                    jc: match cell.align {
                        Align::Left => None,
                        Align::Center => Some("center"),
                        Align::Right => Some("right"),
                    },
                    ..Default::default()
                };
                let spans: Vec<Inline> = if cell.header {
                    cell.spans.iter().map(emboldened).collect()
                } else {
                    cell.spans.clone()
                };
                self.write_paragraph(&props, &spans, None);
                self.body.push_str("</w:tc>");
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
    }

    fn write_code_block(&mut self, code: &CodeBlock) {
        let list_indent = LIST_INDENT * code.indent.list_level as u32;

        let label = code.language.as_deref().filter(|l| !l.is_empty());
        if let Some(language) = label {
            let mut props = ParagraphProps {
                spacing: Some((CODE_SPACE, 0)),
                keep_next: true,
                ..Default::default()
            };
            props.apply_indent(&code.indent, list_indent);
            let style = RunStyle {
                monospace: true,
                ..RunStyle::italic()
            }
            .with_color(COLOR_CODE_LABEL)
            .with_size(SIZE_LABEL);
            self.write_paragraph(&props, &[Inline::styled(format!("  {language}"), style)], None);
        }

        let mut props = ParagraphProps {
            border_box: Some(COLOR_CODE_BLOCK_BORDER),
            shading: Some(COLOR_CODE_BLOCK_BG),
            spacing: Some((if label.is_some() { 40 } else { CODE_SPACE }, CODE_SPACE)),
            single_line: true,
            indent_right: Some(CODE_BLOCK_INDENT),
            ..Default::default()
        };
        props.apply_indent(&code.indent, list_indent);
        props.indent_left = Some(props.indent_left.unwrap_or(0) + CODE_BLOCK_INDENT);

        self.body.push_str("<w:p>");
        props.write(&mut self.body);
        for (index, line) in code.lines.iter().enumerate() {
            if index > 0 {
                self.body.push_str("<w:r><w:br/></w:r>");
            }
            for fragment in line {
                let style = RunStyle {
                    monospace: true,
                    size: Some(SIZE_CODE_BLOCK),
                    color: fragment.color,
                    ..Default::default()
                };
                write_run(
                    &mut self.body,
                    &TextRun {
                        text: fragment.text.clone(),
                        style,
                    },
                    None,
                );
            }
        }
        self.body.push_str("</w:p>");
    }
}

impl BlockSink for DocxWriter {
    fn push_block(&mut self, block: Block) {
        self.write_block(&block);
    }
}

fn emboldened(span: &Inline) -> Inline {
    match span {
        Inline::Text(run) => {
            let mut run = run.clone();
            run.style.bold = true;
            Inline::Text(run)
        }
        other => other.clone(),
    }
}

fn with_default_size(span: &Inline, size: u32) -> Inline {
    match span {
        Inline::Text(run) if run.style.size.is_none() => {
            let mut run = run.clone();
            run.style.size = Some(size);
            Inline::Text(run)
        }
        other => other.clone(),
    }
}

/// Paragraph properties, written in schema order
#[derive(Debug, Default)]
struct ParagraphProps {
    style: Option<String>,
    keep_next: bool,
    border_left: Option<&'static str>,
    border_box: Option<&'static str>,
    border_bottom: Option<&'static str>,
    shading: Option<&'static str>,
    /// (before, after)
    spacing: Option<(u32, u32)>,
    single_line: bool,
    indent_left: Option<u32>,
    indent_right: Option<u32>,
    jc: Option<&'static str>,
}

impl ParagraphProps {
    /// Add list and blockquote indentation
    fn apply_indent(&mut self, indent: &Indent, list_indent: u32) {
        let quote_indent = BLOCKQUOTE_INDENT * indent.quote_depth as u32;
        let left = list_indent + quote_indent;
        if left > 0 {
            self.indent_left = Some(left);
        }
        if indent.quote_depth > 0 && self.border_box.is_none() {
            self.border_left = Some(COLOR_BLOCKQUOTE_BORDER);
        }
    }

    fn is_empty(&self) -> bool {
        self.style.is_none()
            && !self.keep_next
            && self.border_left.is_none()
            && self.border_box.is_none()
            && self.border_bottom.is_none()
            && self.shading.is_none()
            && self.spacing.is_none()
            && !self.single_line
            && self.indent_left.is_none()
            && self.indent_right.is_none()
            && self.jc.is_none()
    }

    fn write(&self, out: &mut String) {
        if self.is_empty() {
            return;
        }
        out.push_str("<w:pPr>");
        if let Some(style) = &self.style {
            out.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if self.keep_next {
            out.push_str("<w:keepNext/>");
        }
        if self.border_left.is_some() || self.border_box.is_some() || self.border_bottom.is_some()
        {
            out.push_str("<w:pBdr>");
            if let Some(color) = self.border_box {
                for side in ["top", "left", "bottom", "right"] {
                    out.push_str(&format!(
                        r#"<w:{side} w:val="single" w:sz="4" w:space="6" w:color="{color}"/>"#
                    ));
                }
            } else {
                if let Some(color) = self.border_left {
                    out.push_str(&format!(
                        r#"<w:left w:val="single" w:sz="18" w:space="8" w:color="{color}"/>"#
                    ));
                }
                if let Some(color) = self.border_bottom {
                    out.push_str(&format!(
                        r#"<w:bottom w:val="single" w:sz="12" w:space="1" w:color="{color}"/>"#
                    ));
                }
            }
            out.push_str("</w:pBdr>");
        }
        if let Some(fill) = self.shading {
            out.push_str(&format!(
                r#"<w:shd w:val="clear" w:color="auto" w:fill="{fill}"/>"#
            ));
        }
        if self.spacing.is_some() || self.single_line {
            out.push_str("<w:spacing");
            if let Some((before, after)) = self.spacing {
                out.push_str(&format!(r#" w:before="{before}" w:after="{after}""#));
            }
            if self.single_line {
                out.push_str(r#" w:line="240" w:lineRule="auto""#);
            }
            out.push_str("/>");
        }
        if self.indent_left.is_some() || self.indent_right.is_some() {
            out.push_str("<w:ind");
            if let Some(left) = self.indent_left {
                out.push_str(&format!(r#" w:left="{left}""#));
            }
            if let Some(right) = self.indent_right {
                out.push_str(&format!(r#" w:right="{right}""#));
            }
            out.push_str("/>");
        }
        if let Some(jc) = self.jc {
            out.push_str(&format!(r#"<w:jc w:val="{jc}"/>"#));
        }
        out.push_str("</w:pPr>");
    }
}

/// Write run properties in schema order
fn write_run_props(out: &mut String, style: &RunStyle, default_color: Option<&'static str>) {
    let mut props = String::new();
    if style.monospace {
        props.push_str(&format!(
            r#"<w:rFonts w:ascii="{FONT_CODE}" w:hAnsi="{FONT_CODE}" w:cs="{FONT_CODE}"/>"#
        ));
    }
    if style.bold {
        props.push_str("<w:b/>");
    }
    if style.italic {
        props.push_str("<w:i/>");
    }
    if style.strike {
        props.push_str("<w:strike/>");
    }
    if let Some(color) = style.color.or(default_color) {
        props.push_str(&format!(r#"<w:color w:val="{color}"/>"#));
    }
    if let Some(size) = style.size {
        props.push_str(&format!(r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/>"#));
    }
    if style.underline {
        props.push_str(r#"<w:u w:val="single"/>"#);
    }
    if let Some(fill) = style.shading {
        props.push_str(&format!(
            r#"<w:shd w:val="clear" w:color="auto" w:fill="{fill}"/>"#
        ));
    }
    if style.superscript {
        props.push_str(r#"<w:vertAlign w:val="superscript"/>"#);
    }
    if !props.is_empty() {
        out.push_str("<w:rPr>");
        out.push_str(&props);
        out.push_str("</w:rPr>");
    }
}

/// Write a text run; embedded newlines become line breaks
fn write_run(out: &mut String, run: &TextRun, default_color: Option<&'static str>) {
    out.push_str("<w:r>");
    write_run_props(out, &run.style, default_color);
    for (index, line) in run.text.split('\n').enumerate() {
        if index > 0 {
            out.push_str("<w:br/>");
        }
        if !line.is_empty() {
            out.push_str(r#"<w:t xml:space="preserve">"#);
            out.push_str(&escape(line));
            out.push_str("</w:t>");
        }
    }
    out.push_str("</w:r>");
}
