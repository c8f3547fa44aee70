//! Dense two-dimensional matrices of `f64`.
//!
//! Operations come in two flavours and the split matters to callers doing
//! gradient bookkeeping:
//!
//! * In place, returning `&mut Self` for chaining: [`Matrix::fill`],
//!   [`Matrix::initialize`], [`Matrix::activate_in_place`], [`Matrix::add`],
//!   [`Matrix::sub`], [`Matrix::mult`], [`Matrix::div`] and the scalar forms
//!   [`Matrix::addn`], [`Matrix::subn`], [`Matrix::multn`], [`Matrix::divn`].
//! * Pure, returning a freshly allocated matrix: [`Matrix::product`],
//!   [`Matrix::t`], [`Matrix::activate`], [`Matrix::softmax`],
//!   [`Matrix::non_zero`], [`Matrix::argmax`], [`Matrix::batch`] and every
//!   row or column reduction.

use crate::error::{Error, Result};
use crate::initializer::Initializer;

use itertools::izip;
use rand::Rng;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>, // row-major array
}

impl Matrix {
    /// Creates a `rows` x `cols` matrix of zeros.
    ///
    /// Fails if either dimension is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidShape { rows, cols });
        }
        Ok(Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        })
    }

    /// Builds a matrix from a literal set of rows.
    ///
    /// Every row must have the same length as the first one.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut out = Matrix::new(rows.len(), cols)?;
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::RaggedRows {
                    row: i,
                    expected: cols,
                    found: row.len(),
                });
            }
            out.row_mut(i).copy_from_slice(row);
        }
        Ok(out)
    }

    /// Wraps a row-major buffer of exactly `rows * cols` values.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidShape { rows, cols });
        }
        if data.len() != rows * cols {
            return Err(Error::ShapeMismatch {
                op: "reshape",
                left: (rows, cols),
                right: (data.len(), 1),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Returns a zeroed matrix with the same shape as `other`.
    pub fn new_like(other: &Matrix) -> Self {
        Matrix {
            rows: other.rows,
            cols: other.cols,
            data: vec![0.0; other.data.len()],
        }
    }

    /// Returns the `n` x `n` identity matrix.
    pub fn identity(n: usize) -> Result<Self> {
        let mut out = Matrix::new(n, n)?;
        for i in 0..n {
            out.set(i, i, 1.0);
        }
        Ok(out)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrows the `i`th row.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Borrows every value in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Sets every value to `value`.
    pub fn fill(&mut self, value: f64) -> &mut Self {
        for x in &mut self.data {
            *x = value;
        }
        self
    }

    /// Overwrites every value with an independent draw from `initializer`.
    ///
    /// `fan_in` and `fan_out` are the input and output widths of the layer
    /// owning this matrix.
    pub fn initialize<R>(
        &mut self,
        initializer: &Initializer,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> &mut Self
    where
        R: Rng + ?Sized,
    {
        for x in &mut self.data {
            *x = initializer.sample(fan_in, fan_out, rng);
        }
        self
    }

    /// Applies `f` to every value, returning the result as a new matrix.
    pub fn activate<F>(&self, f: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Applies `f` to every value in place.
    pub fn activate_in_place<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(f64) -> f64,
    {
        for x in &mut self.data {
            *x = f(*x);
        }
        self
    }

    /// Fails unless `self` and `other` have identical shapes.
    fn check(&self, other: &Matrix, op: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::ShapeMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    fn zip_in_place<F>(
        &mut self,
        other: &Matrix,
        op: &'static str,
        f: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut f64, f64),
    {
        self.check(other, op)?;
        for (l, &r) in izip!(&mut self.data, &other.data) {
            f(l, r);
        }
        Ok(self)
    }

    /// Adds `other` into this matrix.
    ///
    /// A `1 x cols` operand is broadcast across every row (bias add);
    /// otherwise the shapes must match exactly.
    pub fn add(&mut self, other: &Matrix) -> Result<&mut Self> {
        if other.rows == 1 && other.cols == self.cols {
            for row in self.data.chunks_mut(self.cols) {
                for (l, &r) in izip!(row, &other.data) {
                    *l += r;
                }
            }
            return Ok(self);
        }
        self.zip_in_place(other, "add", |l, r| *l += r)
    }

    pub fn sub(&mut self, other: &Matrix) -> Result<&mut Self> {
        self.zip_in_place(other, "subtract", |l, r| *l -= r)
    }

    /// Elementwise (Hadamard) product.
    pub fn mult(&mut self, other: &Matrix) -> Result<&mut Self> {
        self.zip_in_place(other, "multiply", |l, r| *l *= r)
    }

    pub fn div(&mut self, other: &Matrix) -> Result<&mut Self> {
        self.zip_in_place(other, "divide", |l, r| *l /= r)
    }

    pub fn addn(&mut self, value: f64) -> &mut Self {
        self.activate_in_place(|x| x + value)
    }

    pub fn subn(&mut self, value: f64) -> &mut Self {
        self.activate_in_place(|x| x - value)
    }

    pub fn multn(&mut self, value: f64) -> &mut Self {
        self.activate_in_place(|x| x * value)
    }

    pub fn divn(&mut self, value: f64) -> &mut Self {
        self.activate_in_place(|x| x / value)
    }

    /// Computes the matrix product `self * other`.
    ///
    /// For `self` of shape `(n, m)` and `other` of shape `(m, p)` the result
    /// has shape `(n, p)`. Each cell is accumulated over `k` in increasing
    /// order so results are reproducible.
    pub fn product(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::ShapeMismatch {
                op: "multiply (product)",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let mut out = Matrix::new(self.rows, other.cols)?;
        for i in 0..self.rows {
            let lhs = self.row(i);
            for j in 0..other.cols {
                let mut sum = 0.0;
                for (k, &a) in lhs.iter().enumerate() {
                    sum += a * other.get(k, j);
                }
                out.set(i, j, sum);
            }
        }
        Ok(out)
    }

    /// Returns the transpose.
    pub fn t(&self) -> Matrix {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.get(i, j));
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Row-wise softmax.
    ///
    /// The row maximum is subtracted before exponentiating, so large inputs
    /// never overflow and adding a constant to a row leaves its output
    /// unchanged.
    pub fn softmax(&self) -> Matrix {
        let mut out = self.clone();
        for row in out.data.chunks_mut(self.cols) {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for x in row.iter_mut() {
                *x = (*x - max).exp();
                sum += *x;
            }
            for x in row.iter_mut() {
                *x /= sum;
            }
        }
        out
    }

    /// Returns a `rows x 1` matrix holding the column index of each row's
    /// maximum. Ties go to the lowest index.
    pub fn argmax(&self) -> Matrix {
        let data = self
            .data
            .chunks(self.cols)
            .map(|row| {
                let mut best = 0;
                for (j, &x) in row.iter().enumerate() {
                    if x > row[best] {
                        best = j;
                    }
                }
                best as f64
            })
            .collect();
        Matrix {
            rows: self.rows,
            cols: 1,
            data,
        }
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Arithmetic mean of every value.
    pub fn mean(&self) -> f64 {
        self.sum() / self.data.len() as f64
    }

    pub fn min(&self) -> f64 {
        self.data.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sums each column over all rows, returning a `1 x cols` matrix.
    pub fn sum_cols(&self) -> Matrix {
        let mut data = vec![0.0; self.cols];
        for row in self.data.chunks(self.cols) {
            for (acc, &x) in izip!(&mut data, row) {
                *acc += x;
            }
        }
        Matrix {
            rows: 1,
            cols: self.cols,
            data,
        }
    }

    /// Averages each column over all rows, returning a `1 x cols` matrix.
    pub fn mean_cols(&self) -> Matrix {
        let mut out = self.sum_cols();
        out.divn(self.rows as f64);
        out
    }

    /// Sums each row over all columns, returning a `1 x rows` matrix.
    pub fn sum_rows(&self) -> Matrix {
        Matrix {
            rows: 1,
            cols: self.rows,
            data: self.data.chunks(self.cols).map(|row| row.iter().sum()).collect(),
        }
    }

    /// Averages each row over all columns, returning a `1 x rows` matrix.
    pub fn mean_rows(&self) -> Matrix {
        let mut out = self.sum_rows();
        out.divn(self.cols as f64);
        out
    }

    /// Returns a mask holding `1.0` where the two matrices agree exactly and
    /// `0.0` elsewhere.
    pub fn equals(&self, other: &Matrix) -> Result<Matrix> {
        self.check(other, "compare")?;
        let data = izip!(&self.data, &other.data)
            .map(|(&l, &r)| if l == r { 1.0 } else { 0.0 })
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// True if every value is `1.0`.
    pub fn all(&self) -> bool {
        self.data.iter().all(|&x| x == 1.0)
    }

    /// True if any value is `1.0`.
    pub fn some(&self) -> bool {
        self.data.iter().any(|&x| x == 1.0)
    }

    /// Copies out rows `[size * index, size * index + size)`.
    pub fn batch(&self, size: usize, index: usize) -> Result<Matrix> {
        let out_of_range = Error::BatchOutOfRange {
            size,
            index,
            rows: self.rows,
        };
        let start = size.checked_mul(index).ok_or_else(|| out_of_range.clone())?;
        let end = start.checked_add(size).ok_or_else(|| out_of_range.clone())?;
        if size == 0 || end > self.rows {
            return Err(out_of_range);
        }
        Ok(Matrix {
            rows: size,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        })
    }

    /// Returns `1.0` where a value is strictly positive and `0.0` elsewhere.
    pub fn non_zero(&self) -> Matrix {
        self.activate(|x| if x > 0.0 { 1.0 } else { 0.0 })
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Matrix with rows={} cols={}", self.rows, self.cols)?;
        write!(f, "[")?;
        for row in self.data.chunks(self.cols) {
            write!(f, "[ ")?;
            for x in row {
                write!(f, "{:.2}, ", x)?;
            }
            writeln!(f, "],")?;
        }
        write!(f, "]")
    }
}
