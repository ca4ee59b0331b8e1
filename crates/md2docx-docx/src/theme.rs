//! Fonts, sizes, colours and spacing of generated documents
//!
//! Sizes are in half-points (`w:sz`), lengths in twentieths of a point
//! (twips) unless the name says otherwise.

pub const FONT_BODY: &str = "Times New Roman";
pub const FONT_HEADING: &str = "Arial";
pub const FONT_CODE: &str = "Consolas";

pub const SIZE_BODY: u32 = 24;
pub const SIZE_CODE_INLINE: u32 = 19;
pub const SIZE_CODE_BLOCK: u32 = 18;
pub const SIZE_SMALL: u32 = 20;
pub const SIZE_FOOTNOTE: u32 = 18;
pub const SIZE_CAPTION: u32 = 18;
pub const SIZE_LABEL: u32 = 16;
pub const SIZE_SUPERSCRIPT: u32 = 16;

/// Heading sizes for levels 1 to 6
pub const HEADING_SIZES: [u32; 6] = [44, 36, 30, 26, 24, 22];
pub const HEADING_COLORS: [&str; 6] = ["1A237E", "283E9A", "37474F", "455560", "54646E", "60707A"];

pub const COLOR_BODY_TEXT: &str = "212121";
pub const COLOR_LINK: &str = "0563C1";
pub const COLOR_INLINE_CODE_BG: &str = "E8E8E8";
pub const COLOR_CODE_BLOCK_BG: &str = "F8F8F8";
pub const COLOR_CODE_BLOCK_BORDER: &str = "DDDDDD";
pub const COLOR_CODE_LABEL: &str = "888888";
pub const COLOR_BLOCKQUOTE_BORDER: &str = "BBBBBB";
pub const COLOR_BLOCKQUOTE_TEXT: &str = "555555";
pub const COLOR_TABLE_HEADER_BG: &str = "E3F2FD";
pub const COLOR_TABLE_BORDER: &str = "BBBBBB";
pub const COLOR_HR: &str = "CCCCCC";
pub const COLOR_CAPTION: &str = "666666";
pub const COLOR_ERROR: &str = "CC0000";

/// 1.15 line spacing in 240ths of a line
pub const LINE_SPACING: u32 = 276;
pub const PARA_SPACE_BEFORE: u32 = 60;
pub const PARA_SPACE_AFTER: u32 = 120;
pub const HEADING_SPACE_BEFORE: u32 = 360;
pub const HEADING_SPACE_AFTER: u32 = 160;
pub const LIST_ITEM_SPACE: u32 = 20;
pub const BLOCK_SPACE: u32 = 120;
pub const HR_SPACE: u32 = 160;
pub const CODE_SPACE: u32 = 160;

/// 0.35in per list level
pub const LIST_INDENT: u32 = 504;
/// 0.4in per blockquote level
pub const BLOCKQUOTE_INDENT: u32 = 576;
pub const FOOTNOTE_INDENT: u32 = 432;
pub const CODE_BLOCK_INDENT: u32 = 200;

/// A4 page with 2.54cm margins
pub const PAGE_WIDTH: u32 = 11906;
pub const PAGE_HEIGHT: u32 = 16838;
pub const PAGE_MARGIN: u32 = 1440;

pub const EMU_PER_INCH: u64 = 914_400;
/// Widest image: 5.5in
pub const IMAGE_MAX_WIDTH_EMU: u64 = 5_029_200;
