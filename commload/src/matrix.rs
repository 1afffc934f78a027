//! Accumulated byte-transfer matrix and its sparse triplet serialization.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::{Error, Result};

/// Dense logical `n x n` matrix of byte counters, stored in one flat
/// arena indexed `row * n + col`. Cell `[i][i]` stays zero: generators
/// never record self-traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommMatrix {
    size: usize,
    cells: Vec<u64>,
}

impl CommMatrix {
    pub fn new(size: usize) -> CommMatrix {
        CommMatrix {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> u64 {
        self.cells[from * self.size + to]
    }

    /// Accumulate `bytes` into cell `[from][to]`.
    pub fn add(&mut self, from: usize, to: usize, bytes: u64) {
        self.cells[from * self.size + to] += bytes;
    }

    /// Nonzero cells as `(row, col, value)`, in row-major order.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(move |(i, &v)| (i / self.size, i % self.size, v))
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| (0..self.size).all(|q| self.get(i, q) == self.get(q, i)))
    }

    /// Serialize as `<rows> <cols> <nonzeroCount>` followed by one
    /// `<row> <col> <value>` line per nonzero cell.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let count = self.nonzero().count();
        writeln!(w, "{} {} {}", self.size, self.size, count)?;
        for (row, col, value) in self.nonzero() {
            writeln!(w, "{} {} {}", row, col, value)?;
        }
        Ok(())
    }

    /// Parse the triplet format written by [`CommMatrix::write_to`].
    pub fn read_from<R: BufRead>(r: R) -> Result<CommMatrix> {
        let mut lines = r.lines();
        let first = lines
            .next()
            .ok_or_else(|| Error::Format("matrix file is empty".to_string()))??;
        let mut dims = first.split_whitespace();
        let mut next_dim = |name: &str| -> Result<usize> {
            dims.next()
                .ok_or_else(|| {
                    Error::Format(format!("matrix dimension line missing {:?}: {:?}", name, first))
                })?
                .parse()
                .map_err(|_| {
                    Error::Format(format!("malformed matrix dimension {:?}: {:?}", name, first))
                })
        };
        let rows = next_dim("rows")?;
        let cols = next_dim("cols")?;
        let count = next_dim("count")?;
        if rows != cols {
            return Err(Error::Format(format!(
                "matrix must be square, got {}x{}",
                rows, cols
            )));
        }

        let mut matrix = CommMatrix::new(rows);
        let mut seen = 0;
        for line in lines {
            let line = line?;
            let mut fields = line.split_whitespace();
            let mut numeric = |name: &str| -> Result<u64> {
                fields
                    .next()
                    .ok_or_else(|| {
                        Error::Format(format!("matrix line missing field {:?}: {:?}", name, line))
                    })?
                    .parse()
                    .map_err(|_| {
                        Error::Format(format!("malformed matrix field {:?}: {:?}", name, line))
                    })
            };
            let row = numeric("row")? as usize;
            let col = numeric("col")? as usize;
            let value = numeric("value")?;
            if row >= rows || col >= cols {
                return Err(Error::Format(format!(
                    "matrix cell ({}, {}) outside {}x{}",
                    row, col, rows, cols
                )));
            }
            matrix.cells[row * cols + col] = value;
            seen += 1;
        }
        if seen != count {
            return Err(Error::Format(format!(
                "matrix header declares {} nonzero cells, found {}",
                count, seen
            )));
        }
        Ok(matrix)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }
}
