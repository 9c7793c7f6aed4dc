use csv::{ReaderBuilder, StringRecord, Terminator, Trim};
use log::debug;
use serde::de::DeserializeOwned;
use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{BufRead, BufReader, Lines, Read},
    path::Path,
};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
};

/// Capacity of the buffer the per-line parser reads through.
const LINE_BUFFER_CAPACITY: usize = 256;

/// A CSV item reader that implements the `ItemReader` trait.
///
/// Each physical line of the source becomes one item. The line is split on
/// the configured delimiter, and when column names are configured the fields
/// are assigned to the target type by name. Lines end with `\n` or `\r\n`.
///
/// An empty line is not skipped: it is a line with no fields, and therefore
/// a read error when column names are configured. Lines starting with the
/// comment character, if one is set, are skipped.
///
/// The sequence is lazy, finite and not restartable: once the end of input or
/// an error has been returned, the underlying source is dropped and every
/// later call returns `Ok(None)`.
///
/// # Examples
///
/// ```
/// use product_batch::item::csv::csv_reader::CsvItemReaderBuilder;
/// use product_batch::core::item::ItemReader;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Record {
///     name: String,
///     value: i32,
/// }
///
/// let reader = CsvItemReaderBuilder::new()
///     .names(&["name", "value"])
///     .from_reader("foo,123\nbar,456".as_bytes());
///
/// let record: Record = reader.read().unwrap().unwrap();
/// assert_eq!(record.name, "foo");
/// assert_eq!(record.value, 123);
///
/// let record: Record = reader.read().unwrap().unwrap();
/// assert_eq!(record.name, "bar");
///
/// assert!(ItemReader::<Record>::read(&reader).unwrap().is_none());
/// ```
pub struct CsvItemReader<R> {
    /// `None` once the source is exhausted or failed.
    lines: RefCell<Option<Lines<BufReader<R>>>>,
    /// Splits one line into fields.
    parser: ReaderBuilder,
    /// Column names used to map fields onto the target type.
    names: Option<StringRecord>,
    comment: Option<u8>,
    /// The first line is still to be skipped as a header.
    header_pending: Cell<bool>,
    /// Number of the last line taken from the source.
    line: Cell<u64>,
}

impl<R: Read> CsvItemReader<R> {
    fn close(&self) {
        if self.lines.borrow_mut().take().is_some() {
            debug!("CSV source closed after line {}", self.line.get());
        }
    }

    /// Next line holding data, with its line number.
    fn next_line(&self) -> Result<Option<(u64, String)>, BatchError> {
        let mut lines = self.lines.borrow_mut();
        let Some(source) = lines.as_mut() else {
            return Ok(None);
        };

        loop {
            let text = match source.next() {
                Some(Ok(text)) => text,
                Some(Err(error)) => {
                    return Err(BatchError::ItemReader(format!(
                        "line {}: {}",
                        self.line.get() + 1,
                        error
                    )));
                }
                None => return Ok(None),
            };
            self.line.set(self.line.get() + 1);

            if self.header_pending.replace(false) {
                debug!("Header skipped: {}", text);
                continue;
            }
            if self.comment.is_some() && text.as_bytes().first() == self.comment.as_ref() {
                continue;
            }
            return Ok(Some((self.line.get(), text)));
        }
    }

    fn to_item<T: DeserializeOwned>(&self, line: u64, text: &str) -> Result<T, BatchError> {
        let mut record = StringRecord::new();
        self.parser
            .from_reader(text.as_bytes())
            .read_record(&mut record)
            .map_err(|error| BatchError::ItemReader(format!("line {}: {}", line, error)))?;

        if let Some(names) = &self.names {
            if record.len() != names.len() {
                return Err(BatchError::ItemReader(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    names.len(),
                    record.len()
                )));
            }
        }

        // The position is relative to this one line; the line number is added below.
        record.set_position(None);
        record
            .deserialize(self.names.as_ref())
            .map_err(|error| BatchError::ItemReader(format!("line {}: {}", line, error)))
    }
}

impl<R: Read, T: DeserializeOwned> ItemReader<T> for CsvItemReader<R> {
    /// Reads the next item from the CSV source.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a record is successfully read
    /// - `Ok(None)` if there are no more records to read
    /// - `Err(BatchError::ItemReader(error))` if the line is empty, malformed,
    ///   has the wrong number of fields, or a field cannot be converted
    fn read(&self) -> ItemReaderResult<T> {
        let result = match self.next_line() {
            Ok(Some((line, text))) => self.to_item(line, &text).map(Some),
            Ok(None) => Ok(None),
            Err(error) => Err(error),
        };

        if !matches!(result, Ok(Some(_))) {
            self.close();
        }

        result
    }
}

/// A builder for configuring CSV item reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Headers: disabled, the first line is data
/// - Comments: none, every line is data
/// - Trimming: All fields trimmed
/// - Names: none, fields are mapped by position
pub struct CsvItemReaderBuilder {
    delimiter: u8,
    has_headers: bool,
    comment: Option<u8>,
    names: Option<Vec<String>>,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
            comment: None,
            names: None,
        }
    }

    /// Sets the delimiter character for the CSV parsing.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the first line is a header to skip.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Sets the character that starts a comment line. Comment lines are skipped.
    pub fn comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    /// Sets the column names, in file order.
    ///
    /// Every line must then contain exactly `names.len()` fields, and fields
    /// are matched to the target type's fields by these names.
    pub fn names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    /// Creates a `CsvItemReader` from any source implementing `Read`.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvItemReader<R> {
        let mut parser = ReaderBuilder::new();
        parser
            .trim(Trim::All)
            .delimiter(self.delimiter)
            // Lines are already split; a lone `\r` stays inside its field.
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .buffer_capacity(LINE_BUFFER_CAPACITY);

        CsvItemReader {
            lines: RefCell::new(Some(BufReader::new(rdr).lines())),
            parser,
            names: self.names.map(StringRecord::from),
            comment: self.comment,
            header_pending: Cell::new(self.has_headers),
            line: Cell::new(0),
        }
    }

    /// Creates a `CsvItemReader` from a file path.
    ///
    /// # Errors
    /// `BatchError::Io` if the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader<File>, BatchError> {
        let file = File::open(path.as_ref())?;
        debug!("CSV source opened: {}", path.as_ref().display());
        Ok(self.from_reader(file))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::{
        core::item::ItemReader,
        model::{PRODUCT_FIELDS, Product},
        BatchError,
    };

    use super::CsvItemReaderBuilder;

    fn read_all(reader: &dyn ItemReader<Product>) -> Result<Vec<Product>, BatchError> {
        let mut products = Vec::new();
        while let Some(product) = reader.read()? {
            products.push(product);
        }
        Ok(products)
    }

    fn read_error(reader: &dyn ItemReader<Product>) -> String {
        match read_all(reader) {
            Err(BatchError::ItemReader(message)) => message,
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn lines_map_to_products_by_name() {
        let data = "1,Widget,A small widget,100\n2,Gadget,A gadget,200";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());

        let products = read_all(&reader).unwrap();

        assert_eq!(
            products,
            vec![
                Product {
                    id: 1,
                    name: "Widget".to_string(),
                    description: "A small widget".to_string(),
                    price: 100,
                },
                Product {
                    id: 2,
                    name: "Gadget".to_string(),
                    description: "A gadget".to_string(),
                    price: 200,
                },
            ]
        );
    }

    #[test]
    fn crlf_line_endings_and_trailing_newline() {
        let data = "1,Widget,A small widget,100\r\n2,Gadget,A gadget,200\r\n";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());

        let products = read_all(&reader).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[1].price, 200);
    }

    #[test]
    fn first_line_is_data_unless_headers_are_enabled() {
        let data = "id,name,description,price\n1,Widget,A small widget,100";

        let without_headers = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());
        assert!(read_error(&without_headers).starts_with("line 1:"));

        let with_headers = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .has_headers(true)
            .from_reader(data.as_bytes());
        let products = read_all(&with_headers).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Widget");
    }

    #[test]
    fn wrong_field_count_names_the_line() {
        let data = "1,Widget,A small widget,100\n2,Gadget,200";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());

        let first: Option<Product> = reader.read().unwrap();
        assert!(first.is_some());

        match ItemReader::<Product>::read(&reader) {
            Err(BatchError::ItemReader(message)) => {
                assert_eq!(message, "line 2: expected 4 fields, found 3")
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn empty_line_is_a_record_without_fields() {
        let data = "1,Widget,A small widget,100\n\n2,Gadget,A gadget,200";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());

        let first: Option<Product> = reader.read().unwrap();
        assert_eq!(first.unwrap().id, 1);

        match ItemReader::<Product>::read(&reader) {
            Err(BatchError::ItemReader(message)) => {
                assert_eq!(message, "line 2: expected 4 fields, found 0")
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert!(ItemReader::<Product>::read(&reader).unwrap().is_none());
    }

    #[test]
    fn empty_crlf_line_after_the_header_is_rejected() {
        let data = "id,name,description,price\r\n\r\n1,Widget,A small widget,100\r\n";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .has_headers(true)
            .from_reader(data.as_bytes());

        assert_eq!(read_error(&reader), "line 2: expected 4 fields, found 0");
    }

    #[test]
    fn comment_lines_are_skipped_and_keep_line_numbers() {
        let data = "# exported 2024-01-01\n1,Widget,A small widget,100\n# end of batch one\n2,Gadget,A gadget,cheap";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .comment(Some(b'#'))
            .from_reader(data.as_bytes());

        let first: Product = reader.read().unwrap().unwrap();
        assert_eq!(first.id, 1);

        match ItemReader::<Product>::read(&reader) {
            Err(BatchError::ItemReader(message)) => assert!(message.starts_with("line 4:")),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn comment_character_is_data_when_comments_are_disabled() {
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader("# not a comment\n1,Widget,A small widget,100".as_bytes());

        assert_eq!(read_error(&reader), "line 1: expected 4 fields, found 1");
    }

    #[test]
    fn non_numeric_price_is_a_parse_error() {
        let data = "1,Widget,A small widget,cheap";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());

        assert!(read_error(&reader).starts_with("line 1:"));
    }

    #[test]
    fn sequence_ends_after_an_error() {
        let data = "x,Widget,A small widget,100\n2,Gadget,A gadget,200";
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader(data.as_bytes());

        assert!(ItemReader::<Product>::read(&reader).is_err());
        assert!(ItemReader::<Product>::read(&reader).unwrap().is_none());
        assert!(reader.lines.borrow().is_none());
    }

    #[test]
    fn sequence_is_not_restartable_after_exhaustion() {
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader("1,Widget,A small widget,100".as_bytes());

        assert_eq!(read_all(&reader).unwrap().len(), 1);
        assert!(reader.lines.borrow().is_none());
        assert!(ItemReader::<Product>::read(&reader).unwrap().is_none());
    }

    #[test]
    fn custom_delimiter_and_trimmed_fields() {
        let reader = CsvItemReaderBuilder::new()
            .delimiter(b';')
            .names(&PRODUCT_FIELDS)
            .from_reader(" 7 ; Gizmo ; Tiny gizmo ; 50 ".as_bytes());

        let product: Product = reader.read().unwrap().unwrap();

        assert_eq!(product.id, 7);
        assert_eq!(product.name, "Gizmo");
        assert_eq!(product.price, 50);
    }

    #[test]
    fn quoted_fields_may_contain_the_delimiter() {
        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_reader("5,\"Bolt, M6\",\"Steel, zinc plated\",12".as_bytes());

        let product: Product = reader.read().unwrap().unwrap();

        assert_eq!(product.name, "Bolt, M6");
        assert_eq!(product.description, "Steel, zinc plated");
    }

    #[test]
    fn from_path_reads_a_file_and_reports_missing_ones() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "3,Gizmo,Tiny gizmo,50").unwrap();

        let reader = CsvItemReaderBuilder::new()
            .names(&PRODUCT_FIELDS)
            .from_path(file.path())
            .unwrap();
        assert_eq!(read_all(&reader).unwrap().len(), 1);

        let missing = CsvItemReaderBuilder::new().from_path("does/not/exist.csv");
        assert!(matches!(missing, Err(BatchError::Io(_))));
    }
}
