use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::BatchError;

pub const DEFAULT_INSERT_SQL: &str =
    "insert into Product (id,name,description,price) values (:id,:name,:description,:price)";

/// Parameters of the product import job.
///
/// Every key is optional in the TOML file; missing keys take the defaults
/// below.
///
/// ```
/// use product_batch::config::JobConfig;
///
/// let config = JobConfig::from_toml_str("chunk_size = 100\nhas_headers = true").unwrap();
///
/// assert_eq!(config.chunk_size, 100);
/// assert!(config.has_headers);
/// assert_eq!(config.discount_percent, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    pub job_name: String,
    pub step_name: String,
    /// Items per chunk, which is also the transaction size.
    pub chunk_size: usize,
    pub input_path: PathBuf,
    /// Insert statement with `:name` placeholders.
    pub insert_sql: String,
    pub database_url: String,
    pub delimiter: char,
    /// Skip the first line of the input file.
    pub has_headers: bool,
    /// Lines starting with this character are skipped; empty disables comments.
    pub comment: String,
    pub discount_percent: i64,
    /// Persist progress per chunk and resume after the last committed chunk.
    pub restartable: bool,
    /// Create the `Product` table when it does not exist.
    pub init_schema: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: "job-1".to_string(),
            step_name: "step-1".to_string(),
            chunk_size: 2,
            input_path: PathBuf::from("Products.csv"),
            insert_sql: DEFAULT_INSERT_SQL.to_string(),
            database_url: "sqlite://products.db".to_string(),
            delimiter: ',',
            has_headers: false,
            comment: "#".to_string(),
            discount_percent: 10,
            restartable: false,
            init_schema: false,
        }
    }
}

impl JobConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, BatchError> {
        toml::from_str(content)
            .map_err(|e| BatchError::Configuration(format!("bad config: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self, BatchError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| BatchError::Configuration(format!("bad config {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if !(0..=100).contains(&self.discount_percent) {
            return Err(BatchError::Configuration(format!(
                "discount_percent must be between 0 and 100, got {}",
                self.discount_percent
            )));
        }
        self.delimiter_byte()?;
        self.comment_byte()?;
        Ok(())
    }

    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, BatchError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                BatchError::Configuration(format!(
                    "delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                ))
            })
    }

    /// The comment character as a byte, `None` when comments are disabled.
    pub fn comment_byte(&self) -> Result<Option<u8>, BatchError> {
        let mut chars = self.comment.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(None),
            (Some(c), None) if c.is_ascii() => Ok(Some(c as u8)),
            _ => Err(BatchError::Configuration(format!(
                "comment must be empty or a single ASCII character, got {:?}",
                self.comment
            ))),
        }
    }
}

/// Command line of the `product-import` binary.
///
/// Flags and their environment variables override the values of the
/// configuration file.
#[derive(Parser, Debug, Default)]
#[command(version, about = "Import products from a delimited file into a SQL table", long_about = None)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(short, long, env = "PRODUCT_BATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input file
    #[arg(short, long, env = "PRODUCT_BATCH_INPUT")]
    pub input: Option<PathBuf>,

    /// Database URL, e.g. sqlite://products.db
    #[arg(long, env = "PRODUCT_BATCH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Items per chunk (one transaction per chunk)
    #[arg(long, env = "PRODUCT_BATCH_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Treat the first line as a header
    #[arg(long)]
    pub has_headers: bool,

    /// Comment character; an empty value disables comments
    #[arg(long, env = "PRODUCT_BATCH_COMMENT")]
    pub comment: Option<String>,

    /// Resume after the last committed chunk of a failed run
    #[arg(long)]
    pub restartable: bool,

    /// Create the Product table if it does not exist
    #[arg(long)]
    pub init_schema: bool,
}

impl CliArgs {
    /// Loads the configuration file, if any, then applies the overrides and validates.
    pub fn load(&self) -> Result<JobConfig, BatchError> {
        let config = match &self.config {
            Some(path) => JobConfig::from_file(path)?,
            None => JobConfig::default(),
        };
        let config = self.apply(config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, mut config: JobConfig) -> JobConfig {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(database_url) = &self.database_url {
            config.database_url = database_url.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(comment) = &self.comment {
            config.comment = comment.clone();
        }
        config.has_headers |= self.has_headers;
        config.restartable |= self.restartable;
        config.init_schema |= self.init_schema;
        config
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::PathBuf};

    use clap::Parser;
    use tempfile::NamedTempFile;

    use crate::BatchError;

    use super::{CliArgs, DEFAULT_INSERT_SQL, JobConfig};

    #[test]
    fn defaults_describe_the_product_import() {
        let config = JobConfig::default();

        assert_eq!(config.chunk_size, 2);
        assert_eq!(config.input_path, PathBuf::from("Products.csv"));
        assert_eq!(config.insert_sql, DEFAULT_INSERT_SQL);
        assert_eq!(config.delimiter_byte().unwrap(), b',');
        assert_eq!(config.comment_byte().unwrap(), Some(b'#'));
        assert!(!config.has_headers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_gives_the_defaults() {
        assert_eq!(JobConfig::from_toml_str("").unwrap(), JobConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = JobConfig::from_toml_str("chunk = 3");

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let zero_chunk = JobConfig {
            chunk_size: 0,
            ..JobConfig::default()
        };
        assert!(zero_chunk.validate().is_err());

        let wide_delimiter = JobConfig {
            delimiter: '→',
            ..JobConfig::default()
        };
        assert!(wide_delimiter.validate().is_err());

        let long_comment = JobConfig {
            comment: "//".to_string(),
            ..JobConfig::default()
        };
        assert!(long_comment.validate().is_err());

        let over_discount = JobConfig {
            discount_percent: 120,
            ..JobConfig::default()
        };
        assert!(over_discount.validate().is_err());
    }

    #[test]
    fn command_line_overrides_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size = 50\ndelimiter = ';'\ninput_path = \"in.csv\"").unwrap();

        let cli = CliArgs::try_parse_from([
            "product-import",
            "--config",
            file.path().to_str().unwrap(),
            "--chunk-size",
            "5",
            "--has-headers",
        ])
        .unwrap();
        let config = cli.load().unwrap();

        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.input_path, PathBuf::from("in.csv"));
        assert!(config.has_headers);
        assert!(!config.restartable);
    }

    #[test]
    fn comments_can_be_disabled_from_the_file_or_the_command_line() {
        let from_file = JobConfig::from_toml_str("comment = \"\"").unwrap();
        assert_eq!(from_file.comment_byte().unwrap(), None);

        let cli = CliArgs::try_parse_from(["product-import", "--comment", ";"]).unwrap();
        let config = cli.apply(JobConfig::default());
        assert_eq!(config.comment_byte().unwrap(), Some(b';'));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let cli = CliArgs {
            config: Some(PathBuf::from("does/not/exist.toml")),
            ..CliArgs::default()
        };

        assert!(matches!(cli.load(), Err(BatchError::Io(_))));
    }
}
