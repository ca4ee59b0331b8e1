//! OPC package assembly
//!
//! A `.docx` file is a zip archive of XML parts tied together by
//! relationship files and a content type map.

use crate::document::ImageFormat;
use crate::theme::*;
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const NS_WORD: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_MATH: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_PACKAGE_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A relationship from the main document part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    Hyperlink { id: String, target: String },
    Image { id: String, target: String },
}

/// An image stored under `word/media/`
#[derive(Debug, Clone)]
pub struct MediaPart {
    pub name: String,
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// Wrap body content in the `w:document` root and section properties
pub fn document_xml(body: &str) -> String {
    format!(
        concat!(
            "{decl}\n",
            r#"<w:document xmlns:w="{w}" xmlns:r="{r}" xmlns:m="{m}" xmlns:wp="{wp}" xmlns:a="{a}" xmlns:pic="{pic}">"#,
            "<w:body>{body}",
            r#"<w:sectPr><w:pgSz w:w="{pw}" w:h="{ph}"/>"#,
            r#"<w:pgMar w:top="{mg}" w:right="{mg}" w:bottom="{mg}" w:left="{mg}" w:header="708" w:footer="708" w:gutter="0"/>"#,
            "</w:sectPr></w:body></w:document>"
        ),
        decl = XML_DECLARATION,
        w = NS_WORD,
        r = NS_REL,
        m = NS_MATH,
        wp = NS_WP,
        a = NS_DRAWING,
        pic = NS_PICTURE,
        body = body,
        pw = PAGE_WIDTH,
        ph = PAGE_HEIGHT,
        mg = PAGE_MARGIN,
    )
}

/// Style definitions: document defaults and the six heading styles
pub fn styles_xml() -> String {
    let mut xml = format!(
        concat!(
            "{decl}\n",
            r#"<w:styles xmlns:w="{w}">"#,
            "<w:docDefaults><w:rPrDefault><w:rPr>",
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}" w:eastAsia="{font}"/>"#,
            r#"<w:color w:val="{color}"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/>"#,
            "</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>",
            r#"<w:spacing w:before="{before}" w:after="{after}" w:line="{line}" w:lineRule="auto"/>"#,
            "</w:pPr></w:pPrDefault></w:docDefaults>",
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
        ),
        decl = XML_DECLARATION,
        w = NS_WORD,
        font = FONT_BODY,
        color = COLOR_BODY_TEXT,
        size = SIZE_BODY,
        before = PARA_SPACE_BEFORE,
        after = PARA_SPACE_AFTER,
        line = LINE_SPACING,
    );

    for (index, (size, color)) in HEADING_SIZES.iter().zip(HEADING_COLORS).enumerate() {
        let level = index + 1;
        xml.push_str(&format!(
            concat!(
                r#"<w:style w:type="paragraph" w:styleId="Heading{level}">"#,
                r#"<w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
                r#"<w:pPr><w:keepNext/><w:spacing w:before="{before}" w:after="{after}"/><w:outlineLvl w:val="{outline}"/></w:pPr>"#,
                r#"<w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/><w:b/><w:color w:val="{color}"/>"#,
                r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#,
            ),
            level = level,
            outline = index,
            before = HEADING_SPACE_BEFORE,
            after = HEADING_SPACE_AFTER,
            font = FONT_HEADING,
            color = color,
            size = size,
        ));
    }
    xml.push_str("</w:styles>");
    xml
}

fn content_types_xml(media: &[MediaPart]) -> String {
    let mut xml = format!(
        concat!(
            "{decl}\n",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        ),
        decl = XML_DECLARATION
    );

    let mut formats: Vec<ImageFormat> = Vec::new();
    for part in media {
        if !formats.contains(&part.format) {
            formats.push(part.format);
        }
    }
    for format in formats {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            format.extension(),
            format.content_type()
        ));
    }

    xml.push_str(concat!(
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
        "</Types>"
    ));
    xml
}

fn package_rels_xml() -> String {
    format!(
        r#"{XML_DECLARATION}
<Relationships xmlns="{NS_PACKAGE_REL}"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="word/document.xml"/></Relationships>"#
    )
}

fn document_rels_xml(relationships: &[Relationship]) -> String {
    let mut xml = format!(
        r#"{XML_DECLARATION}
<Relationships xmlns="{NS_PACKAGE_REL}"><Relationship Id="rId1" Type="{REL_STYLES}" Target="styles.xml"/>"#
    );
    for relationship in relationships {
        match relationship {
            Relationship::Hyperlink { id, target } => xml.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{REL_HYPERLINK}" Target="{}" TargetMode="External"/>"#,
                escape(target)
            )),
            Relationship::Image { id, target } => xml.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{REL_IMAGE}" Target="{}"/>"#,
                escape(target)
            )),
        }
    }
    xml.push_str("</Relationships>");
    xml
}

/// Zip the document and its parts into `.docx` bytes
pub fn write_package(
    document: &str,
    relationships: &[Relationship],
    media: &[MediaPart],
) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let parts = [
        ("[Content_Types].xml", content_types_xml(media)),
        ("_rels/.rels", package_rels_xml()),
        ("word/document.xml", document.to_string()),
        ("word/styles.xml", styles_xml()),
        ("word/_rels/document.xml.rels", document_rels_xml(relationships)),
    ];
    for (name, content) in parts {
        zip.start_file(name, deflated)?;
        zip.write_all(content.as_bytes())?;
    }

    // Raster images are already compressed
    for part in media {
        zip.start_file(format!("word/media/{}", part.name), stored)?;
        zip.write_all(&part.data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_parts() {
        let media = vec![MediaPart {
            name: "image1.png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
            format: ImageFormat::Png,
        }];
        let relationships = vec![
            Relationship::Hyperlink {
                id: "rId2".to_string(),
                target: "https://example.com/?a=1&b=2".to_string(),
            },
            Relationship::Image {
                id: "rId3".to_string(),
                target: "media/image1.png".to_string(),
            },
        ];
        let bytes = write_package(&document_xml("<w:p/>"), &relationships, &media).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/media/image1.png",
                "word/styles.xml",
            ]
        );

        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));

        let rels = read_part(&bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains("a=1&amp;b=2"));
        assert!(rels.contains(r#"TargetMode="External""#));
    }

    #[test]
    fn test_styles_define_headings() {
        let styles = styles_xml();
        for level in 1..=6 {
            assert!(styles.contains(&format!(r#"w:styleId="Heading{level}""#)));
        }
        assert!(styles.contains(r#"<w:sz w:val="44"/>"#));
        assert!(styles.contains(r#"w:line="276""#));
    }

    #[test]
    fn test_document_section() {
        let xml = document_xml("");
        assert!(xml.contains(r#"<w:pgSz w:w="11906" w:h="16838"/>"#));
        assert!(xml.contains(r#"w:left="1440""#));
    }
}
