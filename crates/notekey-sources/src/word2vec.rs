//! Static word2vec model with cosine nearest-neighbor lookup.
//!
//! Reads the two interchange formats word2vec tooling writes:
//!
//! - **text**: a `"<vocab> <dim>"` header, then one `word v1 .. vdim` line
//!   per word.
//! - **binary**: the same header line, then for each word its UTF-8 bytes, a
//!   space, and `dim` little-endian `f32` values, optionally followed by a
//!   newline.
//!
//! Vectors are L2-normalized at load so similarity is a plain dot product.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use notekey_core::{Error, Result};

/// Rows reserved up front, whatever the header claims.
const PREALLOC_ROWS: usize = 1 << 16;

/// Largest vector dimension accepted from a header.
pub const MAX_DIMENSION: usize = 1 << 16;

/// On-disk layout of a word2vec artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Text,
    Binary,
}

impl ModelFormat {
    /// Guess the format from the file extension. `.bin` is binary, anything
    /// else is text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => ModelFormat::Binary,
            _ => ModelFormat::Text,
        }
    }
}

impl FromStr for ModelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ModelFormat::Text),
            "binary" | "bin" => Ok(ModelFormat::Binary),
            other => Err(Error::Config(format!("unknown word2vec format: {}", other))),
        }
    }
}

/// Immutable word vectors keyed by vocabulary entry.
#[derive(Debug, Clone)]
pub struct KeyedVectors {
    words: Vec<String>,
    index: HashMap<String, usize>,
    dimension: usize,
    /// Row-major, one unit vector per word.
    vectors: Vec<f32>,
}

impl KeyedVectors {
    /// Build from in-memory rows. Every row must have the same length.
    /// A repeated word keeps its first vector.
    pub fn from_entries(dimension: usize, entries: Vec<(String, Vec<f32>)>) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::ModelLoad("vector dimension must be positive".into()));
        }

        let mut words = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let capacity = entries.len().checked_mul(dimension).ok_or_else(|| {
            Error::ModelLoad(format!(
                "{} rows of dimension {} overflow the vector store",
                entries.len(),
                dimension
            ))
        })?;
        let mut vectors = Vec::with_capacity(capacity);

        for (word, mut vector) in entries {
            if vector.len() != dimension {
                return Err(Error::ModelLoad(format!(
                    "vector for '{}' has {} values, expected {}",
                    word,
                    vector.len(),
                    dimension
                )));
            }
            if index.contains_key(&word) {
                warn!(word = %word, "Duplicate vocabulary entry ignored");
                continue;
            }
            normalize(&mut vector);
            index.insert(word.clone(), words.len());
            words.push(word);
            vectors.extend_from_slice(&vector);
        }

        Ok(Self {
            words,
            index,
            dimension,
            vectors,
        })
    }

    /// Load a model file in the given format.
    pub fn load(path: &Path, format: ModelFormat) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::ModelLoad(format!("cannot open {}: {}", path.display(), e))
        })?;
        let reader = BufReader::new(file);
        match format {
            ModelFormat::Text => Self::read_text(reader),
            ModelFormat::Binary => Self::read_binary(reader),
        }
    }

    /// Parse the text format.
    pub fn read_text<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::ModelLoad("empty model file".into()))?
            .map_err(|e| Error::ModelLoad(format!("unreadable header: {}", e)))?;
        let (vocab_size, dimension) = parse_header(&header)?;

        let mut entries = Vec::with_capacity(vocab_size.min(PREALLOC_ROWS));
        for (line_no, line) in lines.enumerate() {
            let line =
                line.map_err(|e| Error::ModelLoad(format!("line {}: {}", line_no + 2, e)))?;
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let word = parts
                .next()
                .ok_or_else(|| Error::ModelLoad(format!("line {}: missing word", line_no + 2)))?;
            let vector = parts
                .map(|v| {
                    v.parse::<f32>().map_err(|e| {
                        Error::ModelLoad(format!("line {}: bad value '{}': {}", line_no + 2, v, e))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            entries.push((word.to_string(), vector));
        }

        if entries.len() != vocab_size {
            return Err(Error::ModelLoad(format!(
                "header declares {} words, found {}",
                vocab_size,
                entries.len()
            )));
        }
        Self::from_entries(dimension, entries)
    }

    /// Parse the binary format.
    pub fn read_binary<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut header = String::new();
        let read = reader
            .read_line(&mut header)
            .map_err(|e| Error::ModelLoad(format!("unreadable header: {}", e)))?;
        if read == 0 {
            return Err(Error::ModelLoad("empty model file".into()));
        }
        let (vocab_size, dimension) = parse_header(&header)?;

        let row_bytes = dimension
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| Error::ModelLoad(format!("dimension {} is too large", dimension)))?;
        let mut entries = Vec::with_capacity(vocab_size.min(PREALLOC_ROWS));
        let mut raw = vec![0u8; row_bytes];
        for i in 0..vocab_size {
            let mut word_bytes = Vec::new();
            reader
                .read_until(b' ', &mut word_bytes)
                .map_err(|e| Error::ModelLoad(format!("word {}: {}", i + 1, e)))?;
            if word_bytes.last() != Some(&b' ') {
                return Err(Error::ModelLoad(format!(
                    "unexpected end of file at word {} of {}",
                    i + 1,
                    vocab_size
                )));
            }
            word_bytes.pop();
            // Writers differ on whether a newline follows each vector.
            let start = word_bytes.iter().take_while(|b| **b == b'\n').count();
            let word = String::from_utf8(word_bytes[start..].to_vec())
                .map_err(|e| Error::ModelLoad(format!("word {} is not UTF-8: {}", i + 1, e)))?;

            reader.read_exact(&mut raw).map_err(|e| {
                Error::ModelLoad(format!("truncated vector for '{}': {}", word, e))
            })?;
            let vector = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            entries.push((word, vector));
        }

        Self::from_entries(dimension, entries)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Unit vector for a word.
    pub fn vector(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&i| self.row(i))
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    /// The `top_n` words closest to `word` by cosine similarity, most
    /// similar first. The query word itself is never returned.
    ///
    /// Fails with [`Error::ModelLookup`] when the word is not in the
    /// vocabulary.
    pub fn most_similar(&self, word: &str, top_n: usize) -> Result<Vec<(String, f32)>> {
        let query_idx = *self
            .index
            .get(word)
            .ok_or_else(|| Error::ModelLookup(word.to_string()))?;
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let query = self.row(query_idx);
        let mut scored: Vec<(usize, f32)> = (0..self.words.len())
            .filter(|&i| i != query_idx)
            .map(|i| (i, dot(query, self.row(i))))
            .collect();

        let by_score_desc = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1);
        if scored.len() > top_n {
            scored.select_nth_unstable_by(top_n - 1, by_score_desc);
            scored.truncate(top_n);
        }
        scored.sort_by(by_score_desc);

        debug!(
            keyword = word,
            top_n,
            result_count = scored.len(),
            "Nearest neighbors computed"
        );

        Ok(scored
            .into_iter()
            .map(|(i, sim)| (self.words[i].clone(), sim))
            .collect())
    }
}

fn parse_header(header: &str) -> Result<(usize, usize)> {
    let mut parts = header.split_whitespace().map(str::parse::<usize>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(_)), Some(Ok(dim)), None) if dim > MAX_DIMENSION => Err(Error::ModelLoad(
            format!("header dimension {} exceeds {}", dim, MAX_DIMENSION),
        )),
        (Some(Ok(vocab)), Some(Ok(dim)), None) => Ok((vocab, dim)),
        _ => Err(Error::ModelLoad(format!(
            "invalid header '{}', expected '<vocab> <dim>'",
            header.trim()
        ))),
    }
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
