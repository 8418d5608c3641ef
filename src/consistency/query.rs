//! consistency::query
//!
//! Projection scanner for query text.
//!
//! The query language is not evaluated, only scanned: the scanner finds which
//! names each `{ ... }` block projects and which nested blocks hang off them.
//!
//! # Grammar (as scanned)
//!
//! ```text
//! block  := '{' item (',' item)* ','? '}'
//! item   := '...'
//!         | STRING ':' value                  alias
//!         | IDENT value                       bare name, value optional
//!         | ... '=>' block                    conditional; first STRING is the type
//! value  := any tokens up to ',' or '}', with the last nested block attached
//! ```
//!
//! # Example
//!
//! ```
//! use annotrace::consistency::query::parse_projection;
//!
//! let block = parse_projection(r#"{
//!     heading,
//!     items[] { "_id": coalesce(_id, _key), name },
//!     _type == "flashSaleSection" => { endsIn }
//! }"#).unwrap();
//!
//! assert!(block.covers("heading"));
//! assert!(block.nested("items").unwrap().covers("_id"));
//! assert!(block.branch("flashSaleSection").unwrap().covers("endsIn"));
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors from scanning projection text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected '{found}' at offset {offset}")]
    Unbalanced { offset: usize, found: char },

    #[error("unclosed '{open}' opened at offset {offset}")]
    Unclosed { offset: usize, open: char },

    #[error("no projection block found")]
    NoProjection,

    #[error("unknown fragment '${{{name}}}'")]
    UnknownFragment { name: String },

    #[error("fragment expansion nested deeper than {0} levels")]
    FragmentDepth(usize),
}

/// Fragment expansion depth limit.
pub const MAX_FRAGMENT_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Spread,
    Arrow,
    Deref,
    Eq,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn tokenize(text: &str) -> Result<Vec<Spanned>, QueryError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '"' || c == '\'' {
            let mut value = String::new();
            i += 1;
            loop {
                let Some(&(_, ch)) = chars.get(i) else {
                    return Err(QueryError::UnterminatedString { offset });
                };
                i += 1;
                if ch == '\\' {
                    if let Some(&(_, escaped)) = chars.get(i) {
                        value.push(escaped);
                        i += 1;
                    }
                } else if ch == c {
                    break;
                } else {
                    value.push(ch);
                }
            }
            tokens.push(Spanned {
                token: Token::Str(value),
                offset,
            });
            continue;
        }

        if c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '@' | '^') {
            let start = i;
            while i < chars.len()
                && (chars[i].1.is_ascii_alphanumeric() || matches!(chars[i].1, '_' | '$' | '@' | '^'))
            {
                i += 1;
            }
            let ident: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            tokens.push(Spanned {
                token: Token::Ident(ident),
                offset,
            });
            continue;
        }

        let (token, width) = match (c, next) {
            ('.', Some('.')) if chars.get(i + 2).map(|(_, c)| *c) == Some('.') => (Token::Spread, 3),
            ('=', Some('>')) => (Token::Arrow, 2),
            ('-', Some('>')) => (Token::Deref, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            _ => (Token::Punct(c), 1),
        };
        tokens.push(Spanned { token, offset });
        i += width;
    }

    check_balance(&tokens)?;
    Ok(tokens)
}

fn check_balance(tokens: &[Spanned]) -> Result<(), QueryError> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for t in tokens {
        if let Token::Punct(c) = t.token {
            match c {
                '{' | '[' | '(' => stack.push((c, t.offset)),
                '}' | ']' | ')' => {
                    let expected = match c {
                        '}' => '{',
                        ']' => '[',
                        _ => '(',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(QueryError::Unbalanced {
                                offset: t.offset,
                                found: c,
                            })
                        }
                    }
                }
                _ => {}
            }
        }
    }
    match stack.pop() {
        Some((open, offset)) => Err(QueryError::Unclosed { offset, open }),
        None => Ok(()),
    }
}

/// The names one projection block selects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Projected names with their nested block, if any.
    pub names: BTreeMap<String, Option<Block>>,
    /// A `...` spread selects every name at this level.
    pub spread: bool,
    /// Conditional sub-blocks keyed by `_type` literal.
    pub branches: BTreeMap<String, Block>,
}

impl Block {
    /// Check whether `name` is selected, explicitly or by a spread.
    pub fn covers(&self, name: &str) -> bool {
        self.spread || self.names.contains_key(name)
    }

    /// Check whether `name` is selected by name.
    pub fn names_explicitly(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// The nested block projected under `name`.
    pub fn nested(&self, name: &str) -> Option<&Block> {
        self.names.get(name).and_then(Option::as_ref)
    }

    pub fn branch(&self, type_name: &str) -> Option<&Block> {
        self.branches.get(type_name)
    }

    /// Merge `other` into this block.
    pub fn merge(&mut self, other: &Block) {
        self.spread |= other.spread;
        for (name, nested) in &other.names {
            let slot = self.names.entry(name.clone()).or_default();
            if let Some(theirs) = nested {
                match slot {
                    Some(mine) => mine.merge(theirs),
                    None => *slot = Some(theirs.clone()),
                }
            }
        }
        for (type_name, branch) in &other.branches {
            self.branches
                .entry(type_name.clone())
                .or_default()
                .merge(branch);
        }
    }

    /// This block with the branch for `type_name` folded in.
    pub fn for_type(&self, type_name: &str) -> Block {
        let mut merged = Block {
            names: self.names.clone(),
            spread: self.spread,
            branches: BTreeMap::new(),
        };
        if let Some(branch) = self.branches.get(type_name) {
            merged.merge(branch);
        }
        merged
    }
}

/// Substitute `${NAME}` references with fragment text.
pub fn expand_fragments(
    text: &str,
    fragments: &BTreeMap<String, String>,
) -> Result<String, QueryError> {
    expand_at(text, fragments, 0)
}

fn expand_at(
    text: &str,
    fragments: &BTreeMap<String, String>,
    depth: usize,
) -> Result<String, QueryError> {
    if !text.contains("${") {
        return Ok(text.to_string());
    }
    if depth >= MAX_FRAGMENT_DEPTH {
        return Err(QueryError::FragmentDepth(MAX_FRAGMENT_DEPTH));
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = after[..end].trim();
        let body = fragments
            .get(name)
            .ok_or_else(|| QueryError::UnknownFragment {
                name: name.to_string(),
            })?;
        out.push_str(&expand_at(body, fragments, depth + 1)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Scan projection text and return its outermost block.
///
/// Scanning starts at the first `{` not enclosed in `(` or `[`, so a filter
/// prefix such as `*[_type == "page"][0]` is skipped.
pub fn parse_projection(text: &str) -> Result<Block, QueryError> {
    let tokens = tokenize(text)?;
    let mut depth = 0usize;
    let start = tokens
        .iter()
        .position(|t| match t.token {
            Token::Punct('(') | Token::Punct('[') => {
                depth += 1;
                false
            }
            Token::Punct(')') | Token::Punct(']') => {
                depth = depth.saturating_sub(1);
                false
            }
            Token::Punct('{') => depth == 0,
            _ => false,
        })
        .ok_or(QueryError::NoProjection)?;

    let mut parser = Parser {
        tokens: &tokens,
        pos: start,
    };
    Ok(parser.block())
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn at_item_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Punct(',')) | Some(Token::Punct('}')))
    }

    /// Parse a block; `pos` is on its `{`. Balance was checked up front.
    fn block(&mut self) -> Block {
        let mut block = Block::default();
        self.pos += 1;

        loop {
            match self.peek() {
                None => break,
                Some(Token::Punct('}')) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Punct(',')) => {
                    self.pos += 1;
                }
                Some(_) => self.item(&mut block),
            }
        }
        block
    }

    fn item(&mut self, block: &mut Block) {
        if let Some(type_name) = self.conditional_type() {
            let branch = self.value().unwrap_or_default();
            block
                .branches
                .entry(type_name)
                .or_default()
                .merge(&branch);
            return;
        }

        let aliased = matches!(self.peek_at(1), Some(Token::Punct(':')));
        match (self.peek().cloned(), aliased) {
            (Some(Token::Spread), _) => {
                block.spread = true;
                self.pos += 1;
                // `...` may carry its own nested block; its names join this level.
                if let Some(inner) = self.value() {
                    block.merge(&inner);
                }
            }
            (Some(Token::Str(alias)), true) => {
                self.pos += 2;
                let nested = self.value();
                insert(block, alias, nested);
            }
            (Some(Token::Ident(name)), _) => {
                self.pos += 1;
                let nested = self.value();
                insert(block, name, nested);
            }
            _ => {
                self.value();
            }
        }
    }

    /// If the item at `pos` is `cond => { ... }`, consume up to the arrow and
    /// return the first string literal of the condition.
    fn conditional_type(&mut self) -> Option<String> {
        let mut depth = 0usize;
        let mut literal = None;
        let mut i = self.pos;

        while let Some(t) = self.tokens.get(i) {
            match &t.token {
                Token::Punct('(') | Token::Punct('[') | Token::Punct('{') => depth += 1,
                Token::Punct(')') | Token::Punct(']') => depth = depth.saturating_sub(1),
                Token::Punct('}') if depth == 0 => return None,
                Token::Punct('}') => depth -= 1,
                Token::Punct(',') if depth == 0 => return None,
                Token::Str(s) if literal.is_none() => literal = Some(s.clone()),
                Token::Arrow if depth == 0 => {
                    self.pos = i + 1;
                    return Some(literal.unwrap_or_default());
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Consume an item value and return the last nested block found in it.
    fn value(&mut self) -> Option<Block> {
        let mut nested = None;
        while !self.at_item_end() {
            match self.peek() {
                Some(Token::Punct('{')) => nested = Some(self.block()),
                Some(Token::Punct('(')) | Some(Token::Punct('[')) => self.skip_group(),
                _ => self.pos += 1,
            }
        }
        nested
    }

    fn skip_group(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            match t {
                Token::Punct('(') | Token::Punct('[') | Token::Punct('{') => depth += 1,
                Token::Punct(')') | Token::Punct(']') | Token::Punct('}') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
    }
}

fn insert(block: &mut Block, name: String, nested: Option<Block>) {
    let slot = block.names.entry(name).or_default();
    if let Some(new) = nested {
        match slot {
            Some(existing) => existing.merge(&new),
            None => *slot = Some(new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments() -> BTreeMap<String, String> {
        let mut f = BTreeMap::new();
        f.insert(
            "IMAGE".to_string(),
            r#"{ "_id": image.asset->_id, "src": image.asset->url, "alt": alt }"#.to_string(),
        );
        f.insert(
            "BASE".to_string(),
            r#"_type, _key, "_id": coalesce(_id, _key), theme"#.to_string(),
        );
        f.insert("LOOP".to_string(), "${LOOP}".to_string());
        f
    }

    mod tokens {
        use super::*;

        #[test]
        fn multi_char_operators() {
            let tokens: Vec<Token> = tokenize("... => -> == .")
                .unwrap()
                .into_iter()
                .map(|t| t.token)
                .collect();
            assert_eq!(
                tokens,
                vec![Token::Spread, Token::Arrow, Token::Deref, Token::Eq, Token::Punct('.')]
            );
        }

        #[test]
        fn strings_with_escapes() {
            let tokens = tokenize(r#""a\"b" 'c'"#).unwrap();
            assert_eq!(tokens[0].token, Token::Str("a\"b".into()));
            assert_eq!(tokens[1].token, Token::Str("c".into()));
        }

        #[test]
        fn unterminated_string() {
            assert_eq!(
                tokenize(r#"{ "abc }"#).unwrap_err(),
                QueryError::UnterminatedString { offset: 2 }
            );
        }

        #[test]
        fn unbalanced_braces() {
            assert!(matches!(
                tokenize("{ a ]").unwrap_err(),
                QueryError::Unbalanced { found: ']', .. }
            ));
            assert!(matches!(
                tokenize("{ a { b }").unwrap_err(),
                QueryError::Unclosed { open: '{', offset: 0 }
            ));
        }

        #[test]
        fn line_comments_skipped() {
            let tokens = tokenize("{ a // b, c\n }").unwrap();
            assert_eq!(tokens.len(), 3);
        }
    }

    mod fragments {
        use super::*;

        #[test]
        fn expands_nested_references() {
            let text = expand_fragments("{ ${BASE}, cover ${IMAGE} }", &fragments()).unwrap();
            assert!(text.contains("coalesce(_id, _key)"));
            assert!(text.contains("image.asset->url"));
            assert!(!text.contains("${"));
        }

        #[test]
        fn unknown_fragment() {
            assert_eq!(
                expand_fragments("{ ${NOPE} }", &fragments()).unwrap_err(),
                QueryError::UnknownFragment {
                    name: "NOPE".into()
                }
            );
        }

        #[test]
        fn self_reference_hits_depth_limit() {
            assert_eq!(
                expand_fragments("${LOOP}", &fragments()).unwrap_err(),
                QueryError::FragmentDepth(MAX_FRAGMENT_DEPTH)
            );
        }
    }

    mod projection {
        use super::*;

        #[test]
        fn bare_and_aliased_names() {
            let block = parse_projection(r#"{ heading, "title": coalesce(title, name), body }"#).unwrap();
            assert!(block.covers("heading"));
            assert!(block.covers("title"));
            assert!(block.covers("body"));
            assert!(!block.covers("name"));
        }

        #[test]
        fn nested_blocks_attach_to_names() {
            let block = parse_projection(
                r#"{ items[] { _key, name, image { "_id": image.asset->_id } }, cta->{ label } }"#,
            )
            .unwrap();
            let items = block.nested("items").unwrap();
            assert!(items.covers("name"));
            assert!(items.nested("image").unwrap().names_explicitly("_id"));
            assert!(block.nested("cta").unwrap().covers("label"));
        }

        #[test]
        fn spread_covers_everything_at_its_level() {
            let block = parse_projection(r#"{ ..., items[] { name } }"#).unwrap();
            assert!(block.covers("anything"));
            assert!(!block.names_explicitly("anything"));
            assert!(!block.nested("items").unwrap().covers("price"));
        }

        #[test]
        fn filter_prefix_skipped() {
            let block =
                parse_projection(r#"*[_type == "page" && slug.current == $slug][0] { title }"#).unwrap();
            assert!(block.covers("title"));
            assert!(!block.covers("_type"));
        }

        #[test]
        fn conditional_branches() {
            let block = parse_projection(
                r#"{
                    _type,
                    _type == "heroCarouselSection" => { banners[] { title } },
                    _type == "supportSection" => { heading }
                }"#,
            )
            .unwrap();
            assert!(block.covers("_type"));
            assert!(!block.covers("banners"));
            assert!(block.branch("heroCarouselSection").unwrap().covers("banners"));

            let support = block.for_type("supportSection");
            assert!(support.covers("_type"));
            assert!(support.covers("heading"));
            assert!(support.branches.is_empty());
        }

        #[test]
        fn repeated_names_merge_blocks() {
            let block = parse_projection(r#"{ image { src }, image { "_id": _id } }"#).unwrap();
            let image = block.nested("image").unwrap();
            assert!(image.covers("src"));
            assert!(image.covers("_id"));
        }

        #[test]
        fn no_block_is_an_error() {
            assert_eq!(
                parse_projection(r#"*[_type == "page"]"#).unwrap_err(),
                QueryError::NoProjection
            );
        }
    }
}
