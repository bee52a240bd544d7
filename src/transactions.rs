//! The `TransactionSource` contract plus the one concrete adapter
//! besides the out-of-scope Wikidata dump parser:
//! restartable line-delimited files (`transactions/createTransactions.go`'s
//! `SimpleFileTransactionSource`/`SimpleReaderTransactionSource`).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// One entity's bag of property names (and, if typed, `t#`-prefixed type
/// tokens), treated as an unordered set by the builder.
pub type Transaction = Vec<String>;

/// A restartable, lazy producer of transactions. `open` must be callable
/// more than once and each call must yield an independent stream over the
/// same logical content — the two-pass builder relies on this.
pub trait TransactionSource: Send + Sync {
    fn open(&self) -> Box<dyn Iterator<Item = Transaction> + '_>;
}

/// Reads one transaction per line, properties separated by whitespace,
/// blank lines skipped. Re-opens the file on every `open()` call, so it is
/// restartable by construction.
pub struct LineDelimitedFileSource {
    path: PathBuf,
}

impl LineDelimitedFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LineDelimitedFileSource { path: path.into() }
    }
}

impl TransactionSource for LineDelimitedFileSource {
    fn open(&self) -> Box<dyn Iterator<Item = Transaction> + '_> {
        let file = File::open(&self.path)
            .unwrap_or_else(|e| panic!("transaction source {:?} could not be opened: {e}", self.path));
        Box::new(LineDelimitedReader::new(BufReader::new(file)))
    }
}

/// Generalizes [`LineDelimitedFileSource`] over any restartable reader
/// factory, mirroring `SimpleReaderTransactionSource`'s separation of "how
/// to get a fresh reader" from "how to parse one".
pub struct LineDelimitedReaderSource<F> {
    open_reader: F,
}

impl<F> LineDelimitedReaderSource<F>
where
    F: Fn() -> Box<dyn BufRead> + Send + Sync,
{
    pub fn new(open_reader: F) -> Self {
        LineDelimitedReaderSource { open_reader }
    }
}

impl<F> TransactionSource for LineDelimitedReaderSource<F>
where
    F: Fn() -> Box<dyn BufRead> + Send + Sync,
{
    fn open(&self) -> Box<dyn Iterator<Item = Transaction> + '_> {
        Box::new(LineDelimitedReader::new((self.open_reader)()))
    }
}

struct LineDelimitedReader<R> {
    reader: R,
}

impl<R: BufRead> LineDelimitedReader<R> {
    fn new(reader: R) -> Self {
        LineDelimitedReader { reader }
    }
}

impl<R: BufRead> Iterator for LineDelimitedReader<R> {
    type Item = Transaction;

    fn next(&mut self) -> Option<Transaction> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = self
                .reader
                .read_line(&mut line)
                .expect("transaction source read error");
            if bytes == 0 {
                return None;
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.split_whitespace().map(str::to_owned).collect());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reader_source_is_restartable() {
        let source = LineDelimitedReaderSource::new(|| {
            let data: Box<dyn BufRead> = Box::new(Cursor::new(b"a b\n\nc d e\n".to_vec()));
            data
        });
        let first: Vec<Transaction> = source.open().collect();
        let second: Vec<Transaction> = source.open().collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![vec!["a".into(), "b".into()], vec!["c".into(), "d".into(), "e".into()]]);
    }
}
