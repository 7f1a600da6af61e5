//! Comment directives read by the GraphQL schema generator.
//!
//! Every published object carries a comment whose lines are directives such as
//! `@name dashboardStat` or `@omit all`. The generator only sees the comment, so
//! the text produced here is the whole contract.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single schema-introspection directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Hide the object entirely
    Omit,
    /// Hide collection endpoints, keep the single-row lookup
    OmitAll,
    /// Rename the object in the generated schema
    Name(String),
    /// Declare a unique key the catalog does not know about
    Unique(Vec<String>),
    /// Declare a relation the catalog does not know about
    ForeignKey(ForeignKey),
}

/// Synthetic foreign key with forward and reverse traversal names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub target_table: String,
    pub target_columns: Vec<String>,
    pub foreign_field_name: String,
    pub field_name: String,
}

impl Annotation {
    pub fn name(name: &str) -> Self {
        Annotation::Name(name.to_string())
    }

    pub fn unique(columns: &[&str]) -> Self {
        Annotation::Unique(columns.iter().map(|c| c.to_string()).collect())
    }

    /// `@foreignKey (columns) references target (target_columns)|@foreignFieldName ..|@fieldName ..`
    pub fn foreign_key(
        columns: &[&str],
        target_table: &str,
        target_columns: &[&str],
        foreign_field_name: &str,
        field_name: &str,
    ) -> Self {
        Annotation::ForeignKey(ForeignKey {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            target_table: target_table.to_string(),
            target_columns: target_columns.iter().map(|c| c.to_string()).collect(),
            foreign_field_name: foreign_field_name.to_string(),
            field_name: field_name.to_string(),
        })
    }

    /// Shorthand for the relation every per-account statistic has to `account`
    pub fn account_relation(column: &str, foreign_field_name: &str) -> Self {
        Self::foreign_key(&[column], "account", &[column], foreign_field_name, "account")
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Omit => write!(f, "@omit"),
            Annotation::OmitAll => write!(f, "@omit all"),
            Annotation::Name(name) => write!(f, "@name {}", name),
            Annotation::Unique(columns) => write!(f, "@unique {}", columns.join(",")),
            Annotation::ForeignKey(fk) => write!(
                f,
                "@foreignKey ({}) references {} ({})|@foreignFieldName {}|@fieldName {}",
                fk.columns.join(", "),
                fk.target_table,
                fk.target_columns.join(", "),
                fk.foreign_field_name,
                fk.field_name
            ),
        }
    }
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Joins directives into the newline-separated comment payload
pub fn render(annotations: &[Annotation]) -> String {
    annotations
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Quotes arbitrary text as a standard SQL string literal
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `COMMENT ON <object_type> <target> IS '<directives>'`
pub fn comment_statement(object_type: &str, target: &str, annotations: &[Annotation]) -> String {
    format!(
        "COMMENT ON {} {} IS {}",
        object_type,
        target,
        quote_literal(&render(annotations))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_each_directive() {
        assert_eq!(Annotation::Omit.to_string(), "@omit");
        assert_eq!(Annotation::OmitAll.to_string(), "@omit all");
        assert_eq!(Annotation::name("dashboardStat").to_string(), "@name dashboardStat");
        assert_eq!(
            Annotation::unique(&["public_key", "username"]).to_string(),
            "@unique public_key,username"
        );
    }

    #[test]
    fn renders_foreign_key_with_traversal_names() {
        let fk = Annotation::account_relation("public_key", "transactionStats");
        assert_eq!(
            fk.to_string(),
            "@foreignKey (public_key) references account (public_key)|@foreignFieldName transactionStats|@fieldName account"
        );
    }

    #[test]
    fn directives_are_newline_separated() {
        let text = render(&[
            Annotation::name("profileEarningsStat"),
            Annotation::unique(&["public_key"]),
            Annotation::OmitAll,
        ]);
        assert_eq!(text, "@name profileEarningsStat\n@unique public_key\n@omit all");
    }

    #[test]
    fn comment_statement_escapes_quotes() {
        let sql = comment_statement("VIEW", "x", &[Annotation::name("o'brien")]);
        assert_eq!(sql, "COMMENT ON VIEW x IS '@name o''brien'");
    }
}
