use std::io::BufRead;

use crate::error::{Error, Result};

use super::SequenceRecord;

pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
        }
    }

    /// 读取一条 4 行记录（不支持折行序列）
    pub fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        if self.done {
            return Ok(None);
        }

        // header line starting with '@'
        self.buf.clear();
        let mut n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }
        if !self.buf.starts_with('@') {
            return Err(Error::Parse(
                "FASTQ header not starting with '@'".to_string(),
            ));
        }
        let header = self.buf[1..].trim_end().to_string();
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // sequence line
        self.buf.clear();
        n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            return Err(Error::Parse("unexpected EOF after header".to_string()));
        }
        let seq = self.buf.trim_end().as_bytes().to_vec();

        // plus line
        self.buf.clear();
        n = self.reader.read_line(&mut self.buf)?;
        if n == 0 || !self.buf.starts_with('+') {
            return Err(Error::Parse("missing '+' line".to_string()));
        }

        // quality line
        self.buf.clear();
        n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            return Err(Error::Parse("missing quality line".to_string()));
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();
        if qual.len() != seq.len() {
            return Err(Error::Parse(format!(
                "record '{}': seq/qual length mismatch ({} vs {})",
                id,
                seq.len(),
                qual.len()
            )));
        }

        Ok(Some(SequenceRecord {
            id,
            desc,
            seq,
            qual: Some(qual),
        }))
    }

    /// 读尽全部记录
    pub fn records(mut self) -> Result<Vec<SequenceRecord>> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push(rec);
        }
        Ok(out)
    }
}
