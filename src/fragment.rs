//! SQL fragments: text with `?` placeholders paired, in order, with their
//! bound parameters.
//!
//! Fragments are only ever put together through operations that carry the
//! parameters along with the text (`+`, [`Fragment::join`],
//! [`FragmentBuilder`]), so placeholders and params cannot drift apart.
//!
//! ```
//! use winnow_sql::fragment::{Fragment, FragmentBuilder};
//!
//! let servings = FragmentBuilder::new().push("num_servings >= ").push_bind(12).build();
//! let time = FragmentBuilder::new().push("cook_time <= ").push_bind(100).build();
//! let both = Fragment::join(" AND ", [servings, time]);
//!
//! assert_eq!(both.text(), "num_servings >= ? AND cook_time <= ?");
//! assert_eq!(both.to_numbered(), "num_servings >= $1 AND cook_time <= $2");
//! assert_eq!(both.params().len(), 2);
//! ```
//!
//! A fragment records where each placeholder sits, so a `?` pushed as raw
//! SQL (the jsonb `?`, `?|` and `?&` operators) stays literal. Templates
//! given to [`Fragment::new`] spell a literal `?` as `??`.

use chrono::NaiveDateTime;
use serde_json::Value as Json;

use crate::error::{WinnowError, WinnowResult};
use crate::parser::parse_identifier;

/// Placeholder marker used in fragment text.
pub const PLACEHOLDER: char = '?';

/// A value bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// NULL with no declared type; the database infers it from context.
    Null,
    /// NULL with an explicit PostgreSQL type, e.g. `int`
    TypedNull(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    /// Bound as `jsonb`
    Json(Json),
    /// A whole list bound as one array parameter, e.g. for `= ANY(?)`.
    /// Elements must share one scalar type.
    Array(Vec<Param>),
}

impl Param {
    /// The cast appended to this param's placeholder, chosen by its type.
    pub fn cast(&self) -> Option<&str> {
        match self {
            Param::Timestamp(_) => Some("timestamp"),
            Param::Json(_) => Some("jsonb"),
            Param::TypedNull(pg_type) => Some(pg_type),
            _ => None,
        }
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::Null => write!(f, "NULL"),
            Param::TypedNull(pg_type) => write!(f, "NULL::{}", pg_type),
            Param::Bool(b) => write!(f, "{}", b),
            Param::Int(n) => write!(f, "{}", n),
            Param::Float(n) => write!(f, "{}", n),
            Param::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Param::Timestamp(ts) => write!(f, "'{}'", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
            Param::Json(v) => write!(f, "'{}'", v),
            Param::Array(items) => {
                let items: Vec<String> = items.iter().map(|p| p.to_string()).collect();
                write!(f, "ARRAY[{}]", items.join(", "))
            }
        }
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v as i64)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<NaiveDateTime> for Param {
    fn from(v: NaiveDateTime) -> Self {
        Param::Timestamp(v)
    }
}

impl From<Json> for Param {
    fn from(v: Json) -> Self {
        Param::Json(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map_or(Param::Null, Into::into)
    }
}

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(v: Vec<T>) -> Self {
        Param::Array(v.into_iter().map(Into::into).collect())
    }
}

/// SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    text: String,
    params: Vec<Param>,
    /// Byte offset of each placeholder in `text`, one per param.
    placeholders: Vec<usize>,
}

impl Fragment {
    /// Pair a template with `params`, checking that they line up.
    ///
    /// `?` outside quoted literals and identifiers is a placeholder; `??`
    /// is a literal `?`.
    pub fn new(template: impl AsRef<str>, params: Vec<Param>) -> WinnowResult<Self> {
        let (text, placeholders) = parse_template(template.as_ref());
        if placeholders.len() != params.len() {
            return Err(WinnowError::ParamMismatch {
                placeholders: placeholders.len(),
                params: params.len(),
            });
        }
        Ok(Self {
            text,
            params,
            placeholders,
        })
    }

    /// Trusted SQL with no parameters.
    pub fn raw(template: impl AsRef<str>) -> WinnowResult<Self> {
        Self::new(template, Vec::new())
    }

    /// The SQL text. Placeholders and literal question marks both read `?`
    /// here; [`Fragment::to_numbered`] tells them apart.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Param>) {
        (self.text, self.params)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.params.is_empty()
    }

    /// Append another fragment.
    pub fn concat(mut self, other: Fragment) -> Self {
        self.append(other);
        self
    }

    fn append(&mut self, other: Fragment) {
        let shift = self.text.len();
        self.text.push_str(&other.text);
        self.params.extend(other.params);
        self.placeholders
            .extend(other.placeholders.into_iter().map(|offset| offset + shift));
    }

    /// Interleave fragments with `separator`; params follow fragment order.
    pub fn join(separator: &str, fragments: impl IntoIterator<Item = Fragment>) -> Self {
        let mut joined = Fragment::default();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                joined.text.push_str(separator);
            }
            joined.append(fragment);
        }
        joined
    }

    /// Surround the text with trusted SQL, leaving params alone.
    pub fn wrap(mut self, prefix: &str, suffix: &str) -> Self {
        self.text.insert_str(0, prefix);
        self.text.push_str(suffix);
        for offset in &mut self.placeholders {
            *offset += prefix.len();
        }
        self
    }

    pub fn parenthesize(self) -> Self {
        self.wrap("(", ")")
    }

    /// The text with PostgreSQL style `$1, $2, ...` placeholders.
    pub fn to_numbered(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + self.params.len() * 2);
        let mut last = 0;
        for (i, &offset) in self.placeholders.iter().enumerate() {
            out.push_str(&self.text[last..offset]);
            out.push('$');
            out.push_str(&(i + 1).to_string());
            last = offset + PLACEHOLDER.len_utf8();
        }
        out.push_str(&self.text[last..]);
        out
    }
}

impl std::ops::Add for Fragment {
    type Output = Fragment;

    fn add(self, other: Fragment) -> Fragment {
        self.concat(other)
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, " -- [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Number of placeholders in a template, ignoring quoted literals,
/// identifiers and `??` escapes.
pub fn count_placeholders(template: &str) -> usize {
    parse_template(template).1.len()
}

/// Unescape a template, returning its text and placeholder offsets.
fn parse_template(template: &str) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(template.len());
    let mut placeholders = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == PLACEHOLDER => {
                if chars.next_if_eq(&PLACEHOLDER).is_none() {
                    placeholders.push(text.len());
                }
            }
            None => {}
        }
        text.push(c);
    }
    (text, placeholders)
}

/// Builds a fragment piece by piece. Raw SQL goes in with [`push`], values
/// only ever go in as parameters.
///
/// [`push`]: FragmentBuilder::push
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    fragment: Fragment,
}

impl FragmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append trusted SQL. Question marks in it are literal.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.fragment.text.push_str(sql);
        self
    }

    /// Bind a value, emitting its placeholder with any type cast.
    pub fn push_bind(&mut self, param: impl Into<Param>) -> &mut Self {
        let param = param.into();
        self.fragment.placeholders.push(self.fragment.text.len());
        self.fragment.text.push(PLACEHOLDER);
        if let Some(cast) = param.cast() {
            self.fragment.text.push_str("::");
            self.fragment.text.push_str(cast);
        }
        self.fragment.params.push(param);
        self
    }

    fn push_bind_separated<P: Into<Param>>(
        &mut self,
        params: impl IntoIterator<Item = P>,
        separator: &str,
        open: &str,
        close: &str,
    ) -> usize {
        let mut count = 0;
        for param in params {
            if count > 0 {
                self.push(separator);
            }
            self.push(open).push_bind(param).push(close);
            count += 1;
        }
        count
    }

    /// Bind every value of a list as `(?,?,...)`.
    pub fn push_bind_list<P: Into<Param>>(&mut self, params: impl IntoIterator<Item = P>) -> &mut Self {
        self.push("(");
        self.push_bind_separated(params, ",", "", "");
        self.push(")")
    }

    /// Bind a list as the rows of a `VALUES` list, `(?), (?)`, for
    /// `col = ANY(VALUES ...)`. An empty list is `(NULL)`.
    pub fn push_bind_any_values<P: Into<Param>>(&mut self, params: impl IntoIterator<Item = P>) -> &mut Self {
        if self.push_bind_separated(params, ", ", "(", ")") == 0 {
            self.push("(NULL)");
        }
        self
    }

    /// Bind a list as a PostgreSQL array constructor, `array[?, ?]`, one
    /// param per element.
    pub fn push_bind_array<P: Into<Param>>(&mut self, params: impl IntoIterator<Item = P>) -> &mut Self {
        self.push("array[");
        self.push_bind_separated(params, ", ", "", "");
        self.push("]")
    }

    /// Splice in a child fragment; its params keep their order and follow
    /// every param pushed so far.
    pub fn push_fragment(&mut self, fragment: Fragment) -> &mut Self {
        self.fragment.append(fragment);
        self
    }

    /// Append a validated table identifier.
    pub fn push_identifier(&mut self, name: &str) -> WinnowResult<&mut Self> {
        let ident = parse_identifier(name)?;
        self.fragment.text.push_str(ident);
        Ok(self)
    }

    pub fn build(&mut self) -> Fragment {
        std::mem::take(&mut self.fragment)
    }
}
