// SQL tokenizer, minifier and clause-per-line pretty-printer.
//
// Comments are dropped. Quoted strings and identifiers pass through as single
// tokens, so nothing inside them is reformatted.

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CREATE", "CROSS",
    "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "FALSE",
    "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTERSECT",
    "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TRUE",
    "UNION", "UPDATE", "VALUES", "WHEN", "WHERE", "WITH",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Word(String),
    Quoted(String),
    Punct(char),
    Operator(String),
}

impl Token {
    fn keyword(&self) -> Option<String> {
        match self {
            Token::Word(word) => {
                let upper = word.to_ascii_uppercase();
                KEYWORDS.contains(&upper.as_str()).then_some(upper)
            }
            _ => None,
        }
    }

    fn text(&self) -> String {
        match self {
            Token::Word(word) => self.keyword().unwrap_or_else(|| word.clone()),
            Token::Quoted(text) | Token::Operator(text) => text.clone(),
            Token::Punct(ch) => ch.to_string(),
        }
    }

    fn raw(&self) -> String {
        match self {
            Token::Word(text) | Token::Quoted(text) | Token::Operator(text) => text.clone(),
            Token::Punct(ch) => ch.to_string(),
        }
    }
}

pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        let next = chars.get(idx + 1).copied();
        if ch.is_whitespace() {
            idx += 1;
        } else if ch == '-' && next == Some('-') {
            while idx < chars.len() && chars[idx] != '\n' {
                idx += 1;
            }
        } else if ch == '/' && next == Some('*') {
            idx += 2;
            while idx < chars.len() && !(chars[idx - 1] == '*' && chars[idx] == '/') {
                idx += 1;
            }
            idx += 1;
        } else if matches!(ch, '\'' | '"' | '`') {
            let start = idx;
            idx += 1;
            while idx < chars.len() {
                if chars[idx] == ch {
                    // a doubled quote is an escaped quote
                    if chars.get(idx + 1) == Some(&ch) {
                        idx += 2;
                        continue;
                    }
                    break;
                }
                idx += 1;
            }
            idx = (idx + 1).min(chars.len());
            tokens.push(Token::Quoted(chars[start..idx].iter().collect()));
        } else if matches!(ch, ',' | '(' | ')' | ';') {
            tokens.push(Token::Punct(ch));
            idx += 1;
        } else if is_word_char(ch) {
            let start = idx;
            while idx < chars.len() && is_word_char(chars[idx]) {
                idx += 1;
            }
            tokens.push(Token::Word(chars[start..idx].iter().collect()));
        } else if is_operator_char(ch) {
            let start = idx;
            while idx < chars.len()
                && is_operator_char(chars[idx])
                && !(chars[idx] == '-' && chars.get(idx + 1) == Some(&'-'))
                && !(chars[idx] == '/' && chars.get(idx + 1) == Some(&'*'))
            {
                idx += 1;
            }
            tokens.push(Token::Operator(chars[start..idx].iter().collect()));
        } else {
            tokens.push(Token::Operator(ch.to_string()));
            idx += 1;
        }
    }
    tokens
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$' | '@' | '#' | '.' | ':' | '?')
}

fn is_operator_char(ch: char) -> bool {
    matches!(ch, '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' | '|' | '&' | '^' | '~')
}

fn needs_space(prev: Option<&Token>, token: &Token) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    if matches!(token, Token::Punct(',' | ')' | ';')) || matches!(prev, Token::Punct('(')) {
        return false;
    }
    if let Token::Word(word) = prev {
        // function call or qualified name
        if matches!(token, Token::Punct('(')) && prev.keyword().is_none() {
            return false;
        }
        if word.ends_with('.') {
            return false;
        }
    }
    true
}

pub(crate) fn minify(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev = None;
    for token in tokens {
        if needs_space(prev, token) {
            out.push(' ');
        }
        out.push_str(&token.raw());
        prev = Some(token);
    }
    out
}

fn is_clause_start(tokens: &[Token], idx: usize) -> bool {
    let Some(keyword) = tokens[idx].keyword() else {
        return false;
    };
    let next = tokens.get(idx + 1).and_then(Token::keyword);
    let after = tokens.get(idx + 2).and_then(Token::keyword);
    match keyword.as_str() {
        "SELECT" | "FROM" | "WHERE" | "HAVING" | "LIMIT" | "OFFSET" | "UNION" | "INTERSECT"
        | "EXCEPT" | "VALUES" | "SET" | "UPDATE" | "INSERT" | "DELETE" | "JOIN" | "WITH" => true,
        "GROUP" | "ORDER" => next.as_deref() == Some("BY"),
        "LEFT" | "RIGHT" | "FULL" => {
            next.as_deref() == Some("JOIN")
                || (next.as_deref() == Some("OUTER") && after.as_deref() == Some("JOIN"))
        }
        "INNER" | "CROSS" => next.as_deref() == Some("JOIN"),
        _ => false,
    }
}

// Keywords that stay on the clause header line, keyed by the word before them.
fn continues_header(last: &str, keyword: &str) -> bool {
    matches!(
        (last, keyword),
        ("GROUP" | "ORDER", "BY")
            | ("SELECT" | "UNION", "DISTINCT" | "ALL")
            | ("LEFT" | "RIGHT" | "FULL" | "INNER" | "CROSS" | "OUTER", "JOIN")
            | ("LEFT" | "RIGHT" | "FULL", "OUTER")
            | ("INSERT", "INTO")
            | ("DELETE", "FROM")
    )
}

struct Lines {
    indent: usize,
    lines: Vec<String>,
    current: String,
    level: usize,
    prev: Option<Token>,
}

impl Lines {
    fn push_token(&mut self, token: &Token) {
        if needs_space(self.prev.as_ref(), token) {
            self.current.push(' ');
        }
        self.current.push_str(&token.text());
        self.prev = Some(token.clone());
    }

    fn break_line(&mut self, level: usize) {
        if !self.current.is_empty() {
            let pad = " ".repeat(self.level * self.indent);
            self.lines.push(format!("{pad}{}", self.current));
            self.current.clear();
        }
        self.level = level;
        self.prev = None;
    }
}

/// Puts each top-level clause keyword on its own line with its operands
/// indented below it. Top-level commas and `AND`/`OR` start new lines.
pub(crate) fn pretty(tokens: &[Token], indent: usize) -> String {
    let mut out = Lines {
        indent,
        lines: Vec::new(),
        current: String::new(),
        level: 0,
        prev: None,
    };
    let mut depth = 0usize;
    let mut header: Option<String> = None;
    let mut in_clause = false;
    for (idx, token) in tokens.iter().enumerate() {
        let keyword = token.keyword();
        if let (Some(last), Some(word)) = (header.as_deref(), keyword.as_deref()) {
            if continues_header(last, word) {
                out.push_token(token);
                header = Some(word.to_string());
                continue;
            }
        }
        if depth == 0 && is_clause_start(tokens, idx) {
            out.break_line(0);
            out.push_token(token);
            header = keyword;
            in_clause = true;
            continue;
        }
        if header.take().is_some() {
            out.break_line(1);
        }
        match token {
            Token::Punct('(') => {
                depth += 1;
                out.push_token(token);
            }
            Token::Punct(')') => {
                depth = depth.saturating_sub(1);
                out.push_token(token);
            }
            Token::Punct(',') if depth == 0 && in_clause => {
                out.push_token(token);
                out.break_line(1);
            }
            Token::Punct(';') => {
                out.push_token(token);
                out.break_line(0);
                if idx + 1 < tokens.len() {
                    out.lines.push(String::new());
                }
                in_clause = false;
                depth = 0;
            }
            _ if depth == 0 && in_clause && matches!(keyword.as_deref(), Some("AND" | "OR")) => {
                out.break_line(1);
                out.push_token(token);
            }
            _ => out.push_token(token),
        }
    }
    out.break_line(0);
    out.lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(sql: &str) -> String {
        pretty(&tokenize(sql), 2)
    }

    #[test]
    fn clauses_go_on_their_own_lines() {
        assert_eq!(
            format("select id, count(*) as n from users u left join orders o on o.user_id = u.id where u.active = 1 and o.total > 10 group by id order by n desc limit 5"),
            "SELECT\n  id,\n  count(*) AS n\nFROM\n  users u\nLEFT JOIN\n  orders o ON o.user_id = u.id\nWHERE\n  u.active = 1\n  AND o.total > 10\nGROUP BY\n  id\nORDER BY\n  n DESC\nLIMIT\n  5"
        );
    }

    #[test]
    fn strings_and_comments() {
        let sql = "SELECT 'it''s, where' -- trailing note\nFROM t /* block */ WHERE name = \"Select\"";
        assert_eq!(
            format(sql),
            "SELECT\n  'it''s, where'\nFROM\n  t\nWHERE\n  name = \"Select\""
        );
        assert_eq!(
            minify(&tokenize(sql)),
            "SELECT 'it''s, where' FROM t WHERE name = \"Select\""
        );
    }

    #[test]
    fn statements_are_separated_by_a_blank_line() {
        assert_eq!(
            format("insert into t (a, b) values (1, 2); delete from t where a=1;"),
            "INSERT INTO\n  t(a, b)\nVALUES\n  (1, 2);\n\nDELETE FROM\n  t\nWHERE\n  a = 1;"
        );
    }

    #[test]
    fn subqueries_stay_inline() {
        assert_eq!(
            format("select * from (select a from b) x where a in (1,2)"),
            "SELECT\n  *\nFROM\n  (SELECT a FROM b) x\nWHERE\n  a IN (1, 2)"
        );
    }

    #[test]
    fn format_and_minify_are_idempotent() {
        let sql = "select a.b, t.* from t join u on t.id=u.id where x between 1 and -2 or y <> 'z';";
        let once = format(sql);
        assert_eq!(format(&once), once);
        let small = minify(&tokenize(sql));
        assert_eq!(minify(&tokenize(&small)), small);
    }
}
