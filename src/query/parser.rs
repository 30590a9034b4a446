/// Parsed query representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub root: QueryNode,
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// Bare word, matched as a substring
    Term(String),
    /// Quoted text, matched as a substring including its spaces
    Phrase(String),
    /// Boolean AND (all must match)
    And(Vec<QueryNode>),
    /// Boolean OR (any can match)
    Or(Vec<QueryNode>),
    /// Boolean NOT (exclude matches)
    Not(Box<QueryNode>),
    /// Empty query
    Empty,
}

/// Parse a query string into a Query structure
///
/// Syntax: `apple pie` (both), `"apple pie"` (phrase), `apple | pear`,
/// `-apple` (exclude), `(apple | pear) -pie` (grouping). A `-` directly
/// before a digit is part of the term, so `-5` searches for the number.
pub fn parse_query(input: &str) -> Query {
    let mut parser = QueryParser::new(input);
    Query {
        root: parser.parse_or(),
    }
}

struct QueryParser<'a> {
    input: &'a str,
    pos: usize,
    /// Open parentheses around the current position
    depth: usize,
}

impl<'a> QueryParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_or(&mut self) -> QueryNode {
        let mut nodes = vec![self.parse_and()];

        self.skip_whitespace();
        while self.consume_char('|') {
            self.skip_whitespace();
            nodes.push(self.parse_and());
            self.skip_whitespace();
        }

        nodes.retain(|n| *n != QueryNode::Empty);
        match nodes.len() {
            0 => QueryNode::Empty,
            1 => nodes.remove(0),
            _ => QueryNode::Or(nodes),
        }
    }

    fn parse_and(&mut self) -> QueryNode {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();

            match self.peek_char() {
                None | Some('|') => break,
                Some(')') if self.depth > 0 => break,
                Some(')') => {
                    // Unmatched close paren
                    self.advance();
                    continue;
                }
                _ => {}
            }

            let node = self.parse_unary();
            if node != QueryNode::Empty {
                nodes.push(node);
            }
        }

        match nodes.len() {
            0 => QueryNode::Empty,
            1 => nodes.remove(0),
            _ => QueryNode::And(nodes),
        }
    }

    fn parse_unary(&mut self) -> QueryNode {
        self.skip_whitespace();

        // `-5` and `-0.5` are numbers, not exclusions
        if self.peek_char() == Some('-') && !self.peek_second().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            return match self.parse_primary() {
                QueryNode::Empty => QueryNode::Empty,
                inner => QueryNode::Not(Box::new(inner)),
            };
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> QueryNode {
        self.skip_whitespace();

        if self.consume_char('(') {
            self.depth += 1;
            let node = self.parse_or();
            self.depth -= 1;
            self.skip_whitespace();
            self.consume_char(')');
            return node;
        }

        if self.peek_char() == Some('"') {
            return self.parse_phrase();
        }

        self.parse_term()
    }

    fn parse_phrase(&mut self) -> QueryNode {
        self.consume_char('"');
        let start = self.pos;

        while !self.is_eof() && self.peek_char() != Some('"') {
            self.advance();
        }

        let phrase = self.input[start..self.pos].to_string();
        self.consume_char('"');

        if phrase.is_empty() {
            QueryNode::Empty
        } else {
            QueryNode::Phrase(phrase)
        }
    }

    fn parse_term(&mut self) -> QueryNode {
        let start = self.pos;

        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() || ch == '|' || ch == ')' || ch == '(' || ch == '"' {
                break;
            }
            self.advance();
        }

        let word = &self.input[start..self.pos];
        if word.is_empty() {
            return QueryNode::Empty;
        }
        QueryNode::Term(word.to_string())
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }
}

impl Query {
    pub fn is_empty(&self) -> bool {
        matches!(self.root, QueryNode::Empty)
    }

    /// Non-excluded terms and phrases, for highlighting matches
    pub fn positive_terms(&self) -> Vec<&str> {
        let mut terms = Vec::new();
        collect_terms(&self.root, &mut terms);
        terms
    }
}

fn collect_terms<'q>(node: &'q QueryNode, terms: &mut Vec<&'q str>) {
    match node {
        QueryNode::Term(s) | QueryNode::Phrase(s) => terms.push(s),
        QueryNode::And(nodes) | QueryNode::Or(nodes) => {
            for n in nodes {
                collect_terms(n, terms);
            }
        }
        QueryNode::Not(_) | QueryNode::Empty => {}
    }
}
