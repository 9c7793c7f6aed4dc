use crate::BatchError;

/// A SQL statement written with named placeholders (`:id`, `:name`, ...).
///
/// Parsing rewrites each placeholder to a positional `?` and records the
/// names in order, so values can be looked up by property name and bound
/// positionally.
///
/// - Placeholders inside single-quoted literals are left untouched.
/// - `::` is kept as is (it is a cast, not a placeholder).
///
/// ```
/// use product_batch::item::rdbc::named_sql::NamedSql;
///
/// let sql = NamedSql::parse(
///     "insert into Product (id,name,description,price) values (:id,:name,:description,:price)",
/// )
/// .unwrap();
///
/// assert_eq!(
///     sql.statement(),
///     "insert into Product (id,name,description,price) values (?,?,?,?)"
/// );
/// assert_eq!(sql.parameters(), ["id", "name", "description", "price"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSql {
    template: String,
    statement: String,
    parameters: Vec<String>,
}

impl NamedSql {
    pub fn parse(template: &str) -> Result<Self, BatchError> {
        let mut statement = String::with_capacity(template.len());
        let mut parameters = Vec::new();
        let mut in_literal = false;
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    in_literal = !in_literal;
                    statement.push(c);
                }
                ':' if !in_literal => match chars.peek() {
                    Some(':') => {
                        chars.next();
                        statement.push_str("::");
                    }
                    Some(next) if next.is_ascii_alphabetic() || *next == '_' => {
                        let mut name = String::new();
                        while let Some(&next) = chars.peek() {
                            if !(next.is_ascii_alphanumeric() || next == '_') {
                                break;
                            }
                            name.push(next);
                            chars.next();
                        }
                        parameters.push(name);
                        statement.push('?');
                    }
                    _ => statement.push(c),
                },
                _ => statement.push(c),
            }
        }

        if in_literal {
            return Err(BatchError::Configuration(format!(
                "unterminated string literal in statement: {}",
                template
            )));
        }

        if parameters.is_empty() {
            return Err(BatchError::Configuration(format!(
                "statement has no named parameters: {}",
                template
            )));
        }

        Ok(Self {
            template: template.to_string(),
            statement,
            parameters,
        })
    }

    /// Builds `INSERT INTO table (c1,c2) VALUES (:c1,:c2)`.
    pub fn insert(table: &str, columns: &[&str]) -> Result<Self, BatchError> {
        if columns.is_empty() {
            return Err(BatchError::Configuration(
                "One or more columns are required".to_string(),
            ));
        }

        let placeholders: Vec<String> = columns.iter().map(|column| format!(":{}", column)).collect();
        Self::parse(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(","),
            placeholders.join(",")
        ))
    }

    /// The statement as configured, with named placeholders.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The statement to execute, with positional placeholders.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Parameter names in placeholder order. A name may appear more than once.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}
