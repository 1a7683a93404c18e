use std::sync::Arc;

use crate::SQLParam;

/// How a dialect expects bound parameters to appear in the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `$1`, `$2`, ...
    Dollar,
    /// `?` for every parameter
    Question,
    /// `:1`, `:2`, ...
    Colon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSyntax {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    FetchFirst,
}

/// The lexical conventions of one SQL engine. Owned by the dialect; consulted
/// by every expression while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlStyle {
    pub placeholder: Placeholder,
    pub identifier_quote: char,
    /// Engines (Oracle) that cannot SELECT without a FROM clause.
    pub from_dual: bool,
    pub supports_returning: bool,
    pub limit_syntax: LimitSyntax,
}

impl SqlStyle {
    pub const fn ansi() -> Self {
        Self {
            placeholder: Placeholder::Dollar,
            identifier_quote: '"',
            from_dual: false,
            supports_returning: true,
            limit_syntax: LimitSyntax::LimitOffset,
        }
    }
}

pub struct SQLBuilder {
    sql: String,
    params: Vec<Arc<dyn SQLParam>>,
    style: SqlStyle,
}

impl SQLBuilder {
    pub fn new(style: SqlStyle) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            style,
        }
    }

    pub fn style(&self) -> &SqlStyle {
        &self.style
    }

    /// Push a string
    pub fn push_str<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a character
    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Push an identifier surrounded by the dialect's quote character.
    pub fn push_identifier<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push(self.style.identifier_quote);
        self.sql.push_str(s.as_ref());
        self.sql.push(self.style.identifier_quote);
    }

    /// Push a qualified `"table"."column"` reference.
    pub fn push_column<T: AsRef<str>, C: AsRef<str>>(&mut self, table: T, column: C) {
        self.push_identifier(table);
        self.push('.');
        self.push_identifier(column);
    }

    /// Push a parameter, which will be replaced with a placeholder in the SQL
    /// string, and add the parameter to the list of parameters.
    pub fn push_param(&mut self, param: Arc<dyn SQLParam>) {
        self.params.push(param);
        match self.style.placeholder {
            Placeholder::Dollar => {
                self.push('$');
                self.push_str(self.params.len().to_string());
            }
            Placeholder::Question => {
                self.push('?');
            }
            Placeholder::Colon => {
                self.push(':');
                self.push_str(self.params.len().to_string());
            }
        }
    }

    /// Append parameters without emitting placeholders. Used by raw statements
    /// whose text already carries its placeholders.
    pub fn append_params(&mut self, params: impl IntoIterator<Item = Arc<dyn SQLParam>>) {
        self.params.extend(params);
    }

    /// Push elements of an iterator, separated by `sep`. The `mapping` function
    /// provides the flexibility to map the elements (compared to
    /// [`SQLBuilder::push_elems`], which assumes that the elements implement
    /// [`ExpressionBuilder`](super::ExpressionBuilder)).
    pub fn push_iter<T>(
        &mut self,
        iter: impl ExactSizeIterator<Item = T>,
        sep: &str,
        mapping: impl Fn(&mut Self, T),
    ) {
        let len = iter.len();
        for (i, item) in iter.enumerate() {
            mapping(self, item);
            if i < len - 1 {
                self.sql.push_str(sep);
            }
        }
    }

    /// Push elements of a slice, separated by `sep`. The elements must
    /// themselves implement `ExpressionBuilder`.
    pub fn push_elems<T: super::ExpressionBuilder>(&mut self, elems: &[T], sep: &str) {
        self.push_iter(elems.iter(), sep, |builder, elem| {
            elem.build(builder);
        });
    }

    /// Get the SQL string and the list of parameters. Calling this method
    /// should be the final step in building an SQL expression, and thus this
    /// builder consumes `self`.
    pub fn into_sql(self) -> (String, Vec<Arc<dyn SQLParam>>) {
        (self.sql, self.params)
    }
}
