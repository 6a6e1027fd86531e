//! Parsed configuration files with line spans.
//!
//! A file is parsed with [hcl_edit::parser::parse_body], which keeps byte
//! spans for every structure. Those are turned into 1-based inclusive line
//! numbers, and every attribute expression is converted into an
//! [hcl::Expression] for evaluation.
use hcl_edit::structure::{Attribute, Block, Body, Structure};
use hcl_edit::Span;
use std::ops::Range;

use crate::error::ParseError;

/// Where a block was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Basename of the file the block was declared in.
    pub filename: String,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone)]
pub struct SourceAttribute {
    pub key: String,
    pub expr: hcl::Expression,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct SourceBlock {
    pub ident: String,
    pub labels: Vec<String>,
    pub attributes: Vec<SourceAttribute>,
    pub blocks: Vec<SourceBlock>,
    pub span: SourceSpan,
}

impl SourceBlock {
    pub fn attribute(&self, key: &str) -> Option<&SourceAttribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// `file:line` of the block, for diagnostics.
    pub fn location(&self) -> String {
        format!("{}:{}", self.span.filename, self.span.line_start)
    }
}

/// One configuration file: its top-level attributes and blocks.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub name: String,
    pub attributes: Vec<SourceAttribute>,
    pub blocks: Vec<SourceBlock>,
}

pub fn parse_source(filename: &str, content: &str) -> Result<SourceFile, ParseError> {
    let body = hcl_edit::parser::parse_body(content).map_err(|e| ParseError::Syntax {
        file: filename.to_string(),
        message: e.to_string(),
    })?;
    let lines = LineIndex::new(content);
    let (attributes, blocks) = convert_body(body, filename, &lines);
    Ok(SourceFile {
        name: filename.to_string(),
        attributes,
        blocks,
    })
}

fn convert_body(
    body: Body,
    filename: &str,
    lines: &LineIndex,
) -> (Vec<SourceAttribute>, Vec<SourceBlock>) {
    let mut attributes = Vec::new();
    let mut blocks = Vec::new();
    for structure in body.into_iter() {
        match structure {
            Structure::Attribute(attr) => attributes.push(convert_attribute(attr, lines)),
            Structure::Block(block) => blocks.push(convert_block(block, filename, lines)),
        }
    }
    (attributes, blocks)
}

fn convert_attribute(attr: Attribute, lines: &LineIndex) -> SourceAttribute {
    let line = lines.span_lines(attr.span()).0;
    SourceAttribute {
        key: attr.key.value().to_string(),
        expr: attr.value.into(),
        line,
    }
}

fn convert_block(block: Block, filename: &str, lines: &LineIndex) -> SourceBlock {
    let (line_start, line_end) = lines.span_lines(block.span());
    let ident = block.ident.value().to_string();
    let labels = block
        .labels
        .iter()
        .map(|label| label.as_str().to_string())
        .collect();
    let (attributes, blocks) = convert_body(block.body, filename, lines);
    SourceBlock {
        ident,
        labels,
        attributes,
        blocks,
        span: SourceSpan {
            filename: filename.to_string(),
            line_start,
            line_end,
        },
    }
}

/// Byte offset to line number lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|start| *start <= offset)
    }

    fn span_lines(&self, span: Option<Range<usize>>) -> (usize, usize) {
        match span {
            Some(range) => {
                let start = self.line_of(range.start);
                let end = self.line_of(range.end.saturating_sub(1).max(range.start));
                (start, end)
            }
            None => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_is_one_based() {
        let idx = LineIndex::new("a\nbc\n\nd");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(3), 2);
        assert_eq!(idx.line_of(5), 3);
        assert_eq!(idx.line_of(6), 4);
    }

    #[test]
    fn block_spans_cover_whole_block() {
        let src = r#"# leading comment
resource "aws_vpc" "main" {
  cidr_block = "10.0.0.0/16"

  tags {
    Name = "main"
  }
}
"#;
        let file = parse_source("main.tf", src).unwrap();
        assert_eq!(file.blocks.len(), 1);
        let block = &file.blocks[0];
        assert_eq!(block.ident, "resource");
        assert_eq!(block.labels, vec!["aws_vpc", "main"]);
        assert_eq!(block.span.filename, "main.tf");
        assert_eq!((block.span.line_start, block.span.line_end), (2, 8));
        assert_eq!(block.attribute("cidr_block").unwrap().line, 3);

        let tags = &block.blocks[0];
        assert_eq!(tags.ident, "tags");
        assert_eq!((tags.span.line_start, tags.span.line_end), (5, 7));
    }

    #[test]
    fn top_level_attributes_are_kept() {
        let file = parse_source("terraform.tfvars", "region = \"eu-west-1\"\nazs = 3\n").unwrap();
        assert_eq!(file.attributes.len(), 2);
        assert_eq!(file.attributes[1].key, "azs");
        assert!(file.blocks.is_empty());
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let err = parse_source("broken.tf", "resource \"x\" {").unwrap_err();
        assert!(err.to_string().starts_with("broken.tf:"));
    }
}
