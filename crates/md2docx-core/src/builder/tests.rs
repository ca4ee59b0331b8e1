use super::*;
use md_tokens::parse;
use md2docx_math::{IdentStyle, MathNode};

fn build(markdown: &str) -> Vec<Block> {
    build_document(&parse(markdown), &ConverterOptions::default())
}

fn cell(kind: TokenKind, text: &str) -> Vec<Token> {
    let close = kind.closing().unwrap();
    vec![
        Token::new(kind, 3),
        Token::new(TokenKind::Inline, 4).with_children(vec![Token::text(text)]),
        Token::new(close, 3),
    ]
}

fn row(cells: &[&str]) -> Vec<Token> {
    let mut tokens = vec![Token::new(TokenKind::TrOpen, 2)];
    for text in cells {
        tokens.extend(cell(TokenKind::TdOpen, text));
    }
    tokens.push(Token::new(TokenKind::TrClose, 2));
    tokens
}

/// (marker, text, list level) of every list item
fn list_items(blocks: &[Block]) -> Vec<(Option<ListMarker>, String, usize)> {
    blocks
        .iter()
        .filter_map(|block| match block {
            Block::ListItem {
                marker, indent, ..
            } => Some((*marker, block.plain_text(), indent.list_level)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_heading_and_paragraph_with_math() {
    let blocks = build("# Title\n\nSome **bold** and $x^2$ text.");
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[0],
        Block::heading(1, vec![Inline::text("Title")])
    );
    assert_eq!(
        blocks[1],
        Block::paragraph(vec![
            Inline::text("Some "),
            Inline::styled("bold", RunStyle::bold()),
            Inline::text(" and "),
            Inline::Math(MathNode::Sup {
                base: vec![MathNode::Identifier {
                    text: "x".to_string(),
                    style: IdentStyle::Italic,
                }],
                sup: vec![MathNode::Number("2".to_string())],
            }),
            Inline::text(" text."),
        ])
    );
}

#[test]
fn test_heading_level_is_clamped() {
    let tokens = vec![
        Token::new(TokenKind::HeadingOpen, 0).with_tag("h9"),
        Token::new(TokenKind::Inline, 1).with_children(vec![Token::text("Deep")]),
        Token::new(TokenKind::HeadingClose, 0),
    ];
    let blocks = build_document(&tokens, &ConverterOptions::default());
    assert!(matches!(blocks[0], Block::Heading { level: 6, .. }));
}

#[test]
fn test_matrix_fence_is_image_python_is_code() {
    let blocks = build("```matrix\n1 2\n3 4\n```");
    assert_eq!(blocks.len(), 1);
    let Block::Image(image) = &blocks[0] else {
        panic!("expected an image, got {:?}", blocks[0]);
    };
    assert_eq!(image.format, ImageFormat::Png);
    assert_eq!(image.width_emu, IMAGE_MAX_WIDTH_EMU);

    let blocks = build("```python\n1 2\n3 4\n```");
    assert_eq!(blocks.len(), 1);
    let Block::CodeBlock(code) = &blocks[0] else {
        panic!("expected a code block, got {:?}", blocks[0]);
    };
    assert_eq!(code.language.as_deref(), Some("python"));
    assert_eq!(blocks[0].plain_text(), "1 2\n3 4");
}

#[test]
fn test_diagram_caption_follows_image() {
    let blocks = build("```matrix\nname: A\ncaption: Identity\n1 0\n0 1\n```");
    assert!(matches!(blocks[0], Block::Image(_)));
    assert_eq!(blocks[1], Block::Caption("Identity".to_string()));
}

#[test]
fn test_diagram_failures_become_notices() {
    let blocks = build("```graph\nnothing to draw\n```\n\n```chart\n{\"type\": 5}\n```");
    assert_eq!(
        blocks[0],
        Block::Notice("[Failed to render graph diagram]".to_string())
    );
    let Block::Notice(message) = &blocks[1] else {
        panic!("expected a notice, got {:?}", blocks[1]);
    };
    assert!(message.starts_with("[Error rendering chart diagram: "));
}

#[test]
fn test_diagrams_disabled_keeps_code() {
    let options = ConverterOptions {
        render_diagrams: false,
        highlight_code: false,
        ..Default::default()
    };
    let blocks = build_document(&parse("```workflow\n[Start]\n```"), &options);
    let Block::CodeBlock(code) = &blocks[0] else {
        panic!("expected a code block, got {:?}", blocks[0]);
    };
    assert!(code.lines.iter().flatten().all(|f| f.color.is_none()));
}

#[test]
fn test_empty_code_block_emits_nothing() {
    assert!(build("```rust\n```").is_empty());
}

#[test]
fn test_nested_ordered_counters() {
    let blocks = build("1. A\n2. B\n   1. B1");
    assert_eq!(
        list_items(&blocks),
        vec![
            (Some(ListMarker::Ordered(1)), "A".to_string(), 1),
            (Some(ListMarker::Ordered(2)), "B".to_string(), 1),
            (Some(ListMarker::Ordered(1)), "B1".to_string(), 2),
        ]
    );
}

#[test]
fn test_sibling_list_counter_resets() {
    let blocks = build("- x\n  1. a\n  2. b\n- y\n  1. c");
    let items = list_items(&blocks);
    assert_eq!(items[0].0, Some(ListMarker::Bullet('•')));
    assert_eq!(items[3].0, Some(ListMarker::Bullet('•')));
    assert_eq!(items[4], (Some(ListMarker::Ordered(1)), "c".to_string(), 2));
}

#[test]
fn test_ordered_start_is_honored() {
    let items = list_items(&build("3. c\n4. d"));
    assert_eq!(items[0].0, Some(ListMarker::Ordered(3)));
    assert_eq!(items[1].0, Some(ListMarker::Ordered(4)));
}

#[test]
fn test_bullets_cycle_by_depth() {
    let items = list_items(&build("- a\n  - b\n    - c\n      - d\n        - e"));
    let markers: Vec<_> = items.iter().map(|(marker, _, _)| *marker).collect();
    assert_eq!(
        markers,
        vec![
            Some(ListMarker::Bullet('•')),
            Some(ListMarker::Bullet('◦')),
            Some(ListMarker::Bullet('▪')),
            Some(ListMarker::Bullet('▹')),
            Some(ListMarker::Bullet('•')),
        ]
    );
}

#[test]
fn test_item_continuation_paragraph() {
    let items = list_items(&build("1. first\n\n   second"));
    assert_eq!(
        items,
        vec![
            (Some(ListMarker::Ordered(1)), "first".to_string(), 1),
            (None, "second".to_string(), 1),
        ]
    );
}

#[test]
fn test_code_inside_list_keeps_indent() {
    let blocks = build("- item\n\n  ```text\n  code\n  ```");
    let Block::CodeBlock(code) = &blocks[1] else {
        panic!("expected a code block, got {:?}", blocks[1]);
    };
    assert_eq!(code.indent.list_level, 1);
}

#[test]
fn test_blockquote_depth_restored() {
    let blocks = build("> a\n>\n> > b\n>\n> c\n\nd");
    let depths: Vec<(String, usize)> = blocks
        .iter()
        .filter_map(|block| match block {
            Block::Paragraph { indent, .. } => Some((block.plain_text(), indent.quote_depth)),
            _ => None,
        })
        .collect();
    assert_eq!(
        depths,
        vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("c".to_string(), 1),
            ("d".to_string(), 0),
        ]
    );
}

#[test]
fn test_ragged_table() {
    let mut tokens = vec![
        Token::new(TokenKind::TableOpen, 0),
        Token::new(TokenKind::TbodyOpen, 1),
    ];
    tokens.extend(row(&["a", "b", "c"]));
    tokens.extend(row(&["d", "e"]));
    tokens.extend(row(&["f", "g", "h"]));
    tokens.push(Token::new(TokenKind::TbodyClose, 1));
    tokens.push(Token::new(TokenKind::TableClose, 0));

    let blocks = build_document(&tokens, &ConverterOptions::default());
    let [Block::Table(table)] = blocks.as_slice() else {
        panic!("expected one table, got {blocks:?}");
    };
    assert_eq!(table.columns, 3);
    assert!(table.rows.iter().all(|r| r.cells.len() == 3));
    assert!(table.rows[1].cells[2].spans.is_empty());
}

#[test]
fn test_table_header_and_alignment() {
    let blocks = build("| A | B | C |\n|:-:|--:|---|\n| 1 | 2 | 3 |");
    let Block::Table(table) = &blocks[0] else {
        panic!("expected a table, got {:?}", blocks[0]);
    };
    assert!(table.rows[0].cells.iter().all(|c| c.header));
    assert!(table.rows[1].cells.iter().all(|c| !c.header));
    let aligns: Vec<Align> = table.rows[1].cells.iter().map(|c| c.align).collect();
    assert_eq!(aligns, vec![Align::Center, Align::Right, Align::Left]);
}

#[test]
fn test_cell_level_header_flag() {
    let mut tokens = vec![Token::new(TokenKind::TableOpen, 0), Token::new(TokenKind::TrOpen, 1)];
    tokens.extend(cell(TokenKind::ThOpen, "key"));
    tokens.extend(cell(TokenKind::TdOpen, "value"));
    tokens.push(Token::new(TokenKind::TrClose, 1));
    tokens.push(Token::new(TokenKind::TableClose, 0));

    let blocks = build_document(&tokens, &ConverterOptions::default());
    let Block::Table(table) = &blocks[0] else {
        panic!("expected a table, got {:?}", blocks[0]);
    };
    assert!(table.rows[0].cells[0].header);
    assert!(!table.rows[0].cells[1].header);
}

#[test]
fn test_cell_align() {
    assert_eq!(cell_align(Some("text-align:center")), Align::Center);
    assert_eq!(cell_align(Some("color: red; Text-Align: RIGHT")), Align::Right);
    assert_eq!(cell_align(Some("text-align:justify")), Align::Left);
    assert_eq!(cell_align(None), Align::Left);
}

#[test]
fn test_footnote_block() {
    let blocks = build("Claim[^a].\n\n[^a]: Source one.");
    assert_eq!(blocks[1], Block::HorizontalRule);
    assert_eq!(blocks[2], Block::FootnoteHeader("Notes".to_string()));
    assert_eq!(blocks[3].plain_text(), "[1] Source one.");
    assert_eq!(blocks.len(), 4);
}

#[test]
fn test_notes_label_option() {
    let options = ConverterOptions {
        notes_label: "Anmerkungen".to_string(),
        ..Default::default()
    };
    let blocks = build_document(&parse("x[^n]\n\n[^n]: y"), &options);
    assert!(blocks.contains(&Block::FootnoteHeader("Anmerkungen".to_string())));
}

#[test]
fn test_math_block_and_fallback() {
    let tokens = vec![
        Token::new(TokenKind::MathBlock, 0).with_content(r"\frac{1}{2}"),
        Token::new(TokenKind::MathBlock, 0).with_content(r"\frac{a}{b"),
        Token::new(TokenKind::MathBlock, 0).with_content("  "),
    ];
    let blocks = build_document(&tokens, &ConverterOptions::default());
    assert_eq!(blocks.len(), 2);
    assert!(matches!(
        blocks[0],
        Block::Math {
            content: MathContent::Native(_),
            ..
        }
    ));
    assert_eq!(
        blocks[1],
        Block::Math {
            content: MathContent::Literal(r"\frac{a}{b".to_string()),
            indent: Indent::default(),
        }
    );
}

#[test]
fn test_ignored_blocks() {
    let blocks = build("---\ntitle: x\n---\n\n<div>raw</div>\n\ntext");
    assert_eq!(blocks, vec![Block::paragraph(vec![Inline::text("text")])]);
}

#[test]
fn test_unbalanced_tokens_terminate() {
    let tokens = vec![
        Token::new(TokenKind::BlockquoteOpen, 0),
        Token::new(TokenKind::BulletListOpen, 1),
        Token::new(TokenKind::ListItemOpen, 2),
        Token::new(TokenKind::ParagraphOpen, 3),
        Token::new(TokenKind::Inline, 4).with_children(vec![Token::text("dangling")]),
        Token::new(TokenKind::TrClose, 0),
        Token::new(TokenKind::ParagraphClose, 0),
        Token::new(TokenKind::TableOpen, 0),
    ];
    let blocks = build_document(&tokens, &ConverterOptions::default());
    assert_eq!(list_items(&blocks)[0].1, "dangling");
}

#[test]
fn test_find_close_skips_nested_pairs() {
    let tokens = parse("> a\n> > b\n\nc");
    let close = find_close(&tokens, 0, tokens.len());
    assert_eq!(tokens[close].kind, TokenKind::BlockquoteClose);
    assert_eq!(tokens[close].level, 0);
    assert_eq!(tokens[close + 1].kind, TokenKind::ParagraphOpen);
}
