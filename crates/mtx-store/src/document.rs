use indexmap::IndexMap;
use mtx_types::ContentNode;
use serde_yaml::{Mapping, Value};

use crate::error::{StoreError, StoreResult};

const DELIMITER: &str = "---";
const END_MARKER: &str = "...";
const BOM: char = '\u{feff}';

/// A content document: an optional YAML header block and an opaque body.
///
/// ```text
/// ---
/// title: Home
/// content:
///   hero:
///     heading: Welcome
/// ---
/// <body, preserved byte for byte>
/// ```
///
/// The content tree lives under one key of the header. Setting the content
/// rewrites only that key's entry in the header text; every other header
/// line, comments included, and the body render exactly as they were read.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentDocument {
    bom: bool,
    newline: &'static str,
    header: Option<Header>,
    body: String,
}

#[derive(Clone, Debug, PartialEq)]
struct Header {
    /// Header text between the delimiter lines, as read.
    source: String,
    fields: Mapping,
    closing: &'static str,
}

impl ContentDocument {
    /// Parse document text.
    ///
    /// A document that does not open with a `---` line has no header and is
    /// all body. An opened header must be closed by a `---` (or `...`) line.
    pub fn parse(text: &str) -> StoreResult<Self> {
        let bom = text.starts_with(BOM);
        let text = text.trim_start_matches(BOM);

        let (newline, rest) = if let Some(rest) = text.strip_prefix("---\r\n") {
            ("\r\n", rest)
        } else if let Some(rest) = text.strip_prefix("---\n") {
            ("\n", rest)
        } else {
            return Ok(Self {
                bom,
                newline: "\n",
                header: None,
                body: text.to_string(),
            });
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            let trimmed = line.trim_end_matches(['\r', '\n']);
            let closing = match trimmed {
                DELIMITER => DELIMITER,
                END_MARKER => END_MARKER,
                _ => {
                    offset += line.len();
                    continue;
                }
            };
            let source = &rest[..offset];
            return Ok(Self {
                bom,
                newline,
                header: Some(Header {
                    source: source.to_string(),
                    fields: parse_header(source)?,
                    closing,
                }),
                body: rest[offset + line.len()..].to_string(),
            });
        }

        Err(StoreError::Serialization(
            "header block is not terminated by a '---' line".into(),
        ))
    }

    /// Build a document from a content tree and body.
    pub fn new(
        content_key: &str,
        content: &ContentNode,
        body: impl Into<String>,
    ) -> StoreResult<Self> {
        let mut doc = Self {
            bom: false,
            newline: "\n",
            header: None,
            body: body.into(),
        };
        doc.set_content(content_key, content)?;
        Ok(doc)
    }

    /// The header mapping, if the document has a header block.
    pub fn header(&self) -> Option<&Mapping> {
        self.header.as_ref().map(|h| &h.fields)
    }

    /// The opaque body following the header.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The content tree stored under `key`.
    ///
    /// A missing header, missing key, or null value is an empty tree.
    /// Non-string scalars become leaves holding their YAML text.
    pub fn content(&self, key: &str) -> StoreResult<ContentNode> {
        let Some(value) = self.header().and_then(|h| h.get(key)) else {
            return Ok(ContentNode::object());
        };
        match value {
            Value::Null => Ok(ContentNode::object()),
            Value::Mapping(_) => node_from_yaml(value, key),
            other => Err(StoreError::Serialization(format!(
                "'{key}' must be a mapping, found {}",
                yaml_kind(other)
            ))),
        }
    }

    /// Replace the content tree under `key`.
    ///
    /// The key's entry is rewritten in place, or appended to the header if
    /// absent. Leaves whose text did not change keep their original YAML
    /// scalar, so an untouched `count: 3` stays a number.
    pub fn set_content(&mut self, key: &str, content: &ContentNode) -> StoreResult<()> {
        let header = self.header.get_or_insert_with(|| Header {
            source: String::new(),
            fields: Mapping::new(),
            closing: DELIMITER,
        });
        let value = node_to_yaml(content, header.fields.get(key));

        let mut entry = Mapping::new();
        entry.insert(Value::String(key.to_string()), value.clone());
        let mut block =
            serde_yaml::to_string(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if self.newline != "\n" {
            block = block.replace('\n', self.newline);
        }

        match entry_span(&header.source, key) {
            Some((start, end)) => header.source.replace_range(start..end, &block),
            None => {
                if !header.source.is_empty() && !header.source.ends_with('\n') {
                    header.source.push_str(self.newline);
                }
                header.source.push_str(&block);
            }
        }
        header.fields.insert(Value::String(key.to_string()), value);
        Ok(())
    }

    /// Render the document back to text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        if let Some(header) = &self.header {
            out.push_str(DELIMITER);
            out.push_str(self.newline);
            out.push_str(&header.source);
            out.push_str(header.closing);
            out.push_str(self.newline);
        }
        out.push_str(&self.body);
        out
    }
}

/// Byte range of the top-level `key:` entry in header text, covering the
/// indented lines under it. Blank and comment lines trailing the entry are
/// not part of it.
fn entry_span(source: &str, key: &str) -> Option<(usize, usize)> {
    let mut start = None;
    let mut end = 0;
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        let line_end = offset + line.len();
        let text = line.trim_end_matches(['\r', '\n']);
        let top_level = !text.is_empty() && !text.starts_with([' ', '\t', '#']);
        if start.is_none() {
            if top_level && top_level_key(text) == Some(key) {
                start = Some(offset);
                end = line_end;
            }
        } else if top_level {
            break;
        } else {
            let trimmed = text.trim_start();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                end = line_end;
            }
        }
        offset = line_end;
    }
    start.map(|start| (start, end))
}

fn top_level_key(line: &str) -> Option<&str> {
    let (key, _) = line.split_once(':')?;
    let key = key.trim_end();
    let unquoted = key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')));
    Some(unquoted.unwrap_or(key))
}

fn parse_header(source: &str) -> StoreResult<Mapping> {
    if source.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let value: Value =
        serde_yaml::from_str(source).map_err(|e| StoreError::Serialization(e.to_string()))?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(StoreError::Serialization(format!(
            "header must be a mapping, found {}",
            yaml_kind(&other)
        ))),
    }
}

fn node_from_yaml(value: &Value, at: &str) -> StoreResult<ContentNode> {
    Ok(match value {
        Value::Null => ContentNode::leaf(""),
        Value::Bool(b) => ContentNode::leaf(b.to_string()),
        Value::Number(n) => ContentNode::leaf(n.to_string()),
        Value::String(s) => ContentNode::leaf(s.as_str()),
        Value::Sequence(items) => ContentNode::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| node_from_yaml(item, &format!("{at}.{i}")))
                .collect::<StoreResult<_>>()?,
        ),
        Value::Mapping(map) => {
            let mut fields = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                let key = scalar_key(key).ok_or_else(|| {
                    StoreError::Serialization(format!("non-scalar key under {at}"))
                })?;
                let child = node_from_yaml(item, &format!("{at}.{key}"))?;
                fields.insert(key, child);
            }
            ContentNode::Object(fields)
        }
        Value::Tagged(tagged) => node_from_yaml(&tagged.value, at)?,
    })
}

fn node_to_yaml(node: &ContentNode, previous: Option<&Value>) -> Value {
    match node {
        ContentNode::Leaf(text) => match previous {
            Some(prev) if scalar_text(prev).as_deref() == Some(text.as_str()) => prev.clone(),
            _ => Value::String(text.clone()),
        },
        ContentNode::Array(items) => {
            let prev = previous.and_then(Value::as_sequence);
            Value::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| node_to_yaml(item, prev.and_then(|p| p.get(i))))
                    .collect(),
            )
        }
        ContentNode::Object(fields) => {
            let prev = previous.and_then(Value::as_mapping);
            Value::Mapping(
                fields
                    .iter()
                    .map(|(k, v)| {
                        let before = prev.and_then(|p| p.get(k.as_str()));
                        (Value::String(k.clone()), node_to_yaml(v, before))
                    })
                    .collect(),
            )
        }
    }
}

/// Leaf text of a scalar, as read by `node_from_yaml`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_types::{resolve_leaf, FieldPath};

    const HOME: &str = "---\ntitle: Home\ncontent:\n  hero:\n    heading: Welcome\n  features:\n  - name: Fast\n  - name: Small\nlayout: wide\n---\n\n# Body\n\n---\nnot a header\n";

    fn leaf<'a>(tree: &'a ContentNode, path: &str) -> Option<&'a str> {
        resolve_leaf(tree, &FieldPath::parse(path).unwrap())
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parses_content_tree() {
        let doc = ContentDocument::parse(HOME).unwrap();
        let tree = doc.content("content").unwrap();
        assert_eq!(leaf(&tree, "hero.heading"), Some("Welcome"));
        assert_eq!(leaf(&tree, "features.1.name"), Some("Small"));
    }

    #[test]
    fn body_starts_after_closing_delimiter() {
        let doc = ContentDocument::parse(HOME).unwrap();
        assert_eq!(doc.body(), "\n# Body\n\n---\nnot a header\n");
    }

    #[test]
    fn document_without_header_is_all_body() {
        let doc = ContentDocument::parse("# Just markdown\n").unwrap();
        assert!(doc.header().is_none());
        assert_eq!(doc.body(), "# Just markdown\n");
        assert_eq!(doc.content("content").unwrap(), ContentNode::object());
    }

    #[test]
    fn empty_header_is_empty_mapping() {
        let doc = ContentDocument::parse("---\n---\nbody").unwrap();
        assert!(doc.header().unwrap().is_empty());
        assert_eq!(doc.body(), "body");
    }

    #[test]
    fn unterminated_header_is_rejected() {
        let err = ContentDocument::parse("---\ntitle: x\n").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn non_mapping_header_is_rejected() {
        let err = ContentDocument::parse("---\n- a\n- b\n---\n").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn non_mapping_content_is_rejected() {
        let doc = ContentDocument::parse("---\ncontent: hello\n---\n").unwrap();
        assert!(doc.content("content").is_err());
    }

    #[test]
    fn scalars_become_text_leaves() {
        let doc =
            ContentDocument::parse("---\ncontent:\n  count: 3\n  on: true\n  none: ~\n---\n")
                .unwrap();
        let tree = doc.content("content").unwrap();
        assert_eq!(leaf(&tree, "count"), Some("3"));
        assert_eq!(leaf(&tree, "on"), Some("true"));
        assert_eq!(leaf(&tree, "none"), Some(""));
    }

    #[test]
    fn custom_content_key() {
        let doc = ContentDocument::parse("---\nblocks:\n  a: b\n---\n").unwrap();
        assert_eq!(leaf(&doc.content("blocks").unwrap(), "a"), Some("b"));
        assert_eq!(doc.content("content").unwrap(), ContentNode::object());
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    #[test]
    fn render_preserves_body_and_other_fields() {
        let mut doc = ContentDocument::parse(HOME).unwrap();
        let mut tree = doc.content("content").unwrap();
        mtx_types::unflatten_into(&mut tree, &FieldPath::parse("hero.heading").unwrap(), "Hi")
            .unwrap();
        doc.set_content("content", &tree).unwrap();

        let text = doc.render();
        assert!(text.starts_with("---\ntitle: Home\ncontent:\n"));
        assert!(text.ends_with("layout: wide\n---\n\n# Body\n\n---\nnot a header\n"));

        let reparsed = ContentDocument::parse(&text).unwrap();
        assert_eq!(reparsed.body(), doc.body());
        let keys: Vec<&str> = reparsed
            .header()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["title", "content", "layout"]);
        assert_eq!(
            leaf(&reparsed.content("content").unwrap(), "hero.heading"),
            Some("Hi")
        );
        assert_eq!(
            reparsed.header().unwrap().get("layout"),
            Some(&Value::String("wide".into()))
        );
    }

    #[test]
    fn render_keeps_crlf_and_bom() {
        let text = "\u{feff}---\r\ncontent:\r\n  a: b\r\n---\r\nbody\r\n";
        let doc = ContentDocument::parse(text).unwrap();
        let out = doc.render();
        assert!(out.starts_with("\u{feff}---\r\n"));
        assert!(out.ends_with("---\r\nbody\r\n"));
        assert_eq!(ContentDocument::parse(&out).unwrap(), doc);
    }

    #[test]
    fn set_content_on_headerless_document_adds_header() {
        let mut doc = ContentDocument::parse("body only").unwrap();
        let tree: ContentNode = serde_json::from_str(r#"{"a": "b"}"#).unwrap();
        doc.set_content("content", &tree).unwrap();
        let out = doc.render();
        assert!(out.starts_with("---\n"));
        assert!(out.ends_with("---\nbody only"));
    }

    #[test]
    fn new_builds_renderable_document() {
        let tree: ContentNode = serde_json::from_str(r#"{"hero": {"heading": "Hi"}}"#).unwrap();
        let doc = ContentDocument::new("content", &tree, "text\n").unwrap();
        let parsed = ContentDocument::parse(&doc.render()).unwrap();
        assert_eq!(parsed.content("content").unwrap(), tree);
        assert_eq!(parsed.body(), "text\n");
    }

    fn edit(text: &str, path: &str, value: &str) -> String {
        let mut doc = ContentDocument::parse(text).unwrap();
        let mut tree = doc.content("content").unwrap();
        mtx_types::unflatten_into(&mut tree, &FieldPath::parse(path).unwrap(), value).unwrap();
        doc.set_content("content", &tree).unwrap();
        doc.render()
    }

    #[test]
    fn other_header_fields_are_kept_verbatim() {
        let text = "---\n# page settings\ntitle: \"Home\"\ncontent:\n  hero:\n    headline: Old\n\n# taxonomy\ntags: [a, b]\n---\nbody\n";
        let out = edit(text, "hero.headline", "New");
        assert_eq!(
            out,
            "---\n# page settings\ntitle: \"Home\"\ncontent:\n  hero:\n    headline: New\n\n# taxonomy\ntags: [a, b]\n---\nbody\n"
        );
    }

    #[test]
    fn untouched_scalars_keep_their_type() {
        let text = "---\ncontent:\n  hero:\n    headline: Old\n  stats:\n    count: 3\n    live: true\n---\n";
        let out = edit(text, "hero.headline", "New");
        assert!(out.contains("count: 3\n"));
        assert!(out.contains("live: true\n"));

        let reparsed = ContentDocument::parse(&out).unwrap();
        let content = reparsed.header().unwrap().get("content").unwrap();
        assert_eq!(content["stats"]["count"], Value::Number(3u64.into()));
        assert_eq!(content["hero"]["headline"], Value::String("New".into()));
    }

    #[test]
    fn missing_content_key_is_appended() {
        let text = "---\ntitle: Home # keep\n---\nbody";
        let out = edit(text, "hero.headline", "Hi");
        assert!(out.starts_with("---\ntitle: Home # keep\ncontent:\n"));
        assert!(out.ends_with("---\nbody"));
    }

    #[test]
    fn entry_span_stops_at_next_top_level_key() {
        let source = "a: 1\ncontent:\n  x: y\n  # inner\n  z: w\n\n# trailing\nb: 2\n";
        let (start, end) = entry_span(source, "content").unwrap();
        assert_eq!(&source[start..end], "content:\n  x: y\n  # inner\n  z: w\n");
        assert_eq!(entry_span("\"content\": {}\n", "content"), Some((0, 14)));
        assert!(entry_span("contents: 1\n", "content").is_none());
    }
}
