//! Scalar parameter fields over the xy-plane.
//!
//! Ground heights and crown ratios may either be one constant for the whole
//! scene or vary per cell of a rectangular grid (e.g. resampled from a
//! digital terrain model). Both variants answer the same three questions:
//! is there a value at this location, what is it, and what does a copy with
//! swapped-out values look like.

use thiserror::Error;

/// Errors raised by the checked raster accessors.
///
/// These indicate contract violations by the caller, not data conditions:
/// NaN values *inside* a grid are legal and handled by the mode-finding
/// driver, but looking up a NaN location or rebuilding a grid with the
/// wrong number of values is a defect.
#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("tried to access a raster value with NaN xy-coordinates")]
    NanCoordinate,

    #[error("tried to access a raster value outside of the raster extent")]
    OutOfExtent,

    #[error("tried to copy-create a raster with {got} values, expected {expected}")]
    ValueCountMismatch { expected: usize, got: usize },
}

// ---------------------------------------------------------------------------
// Grid raster
// ---------------------------------------------------------------------------

/// A rectangular, non-rotated grid of scalar values.
///
/// Values are stored row-major from the top-left to the bottom-right cell,
/// i.e. row 0 is the row touching `y_max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    values: Vec<f64>,
    num_rows: usize,
    num_cols: usize,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    row_height: f64,
    col_width: f64,
}

impl Raster {
    /// Create a grid from row-major `values` and a geographic extent.
    ///
    /// # Panics
    /// Panics if `values.len() != num_rows * num_cols` or if the extent is
    /// empty. Both are construction-time defects, not data conditions.
    pub fn new(
        values: Vec<f64>,
        num_rows: usize,
        num_cols: usize,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    ) -> Self {
        assert_eq!(values.len(), num_rows * num_cols, "value count must match grid size");
        assert!(x_min < x_max && y_min < y_max, "raster extent must be non-empty");
        Self {
            values,
            num_rows,
            num_cols,
            x_min,
            x_max,
            y_min,
            y_max,
            row_height: (y_max - y_min) / num_rows as f64,
            col_width: (x_max - x_min) / num_cols as f64,
        }
    }

    /// The backing values, row-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Extent test, boundary inclusive on all four edges.
    pub fn has_value_at(&self, x: f64, y: f64) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }

    /// Value of the cell containing `(x, y)`.
    ///
    /// Fails with [`RasterError::NanCoordinate`] if either coordinate is NaN
    /// and with [`RasterError::OutOfExtent`] outside the extent.
    pub fn value_at(&self, x: f64, y: f64) -> Result<f64, RasterError> {
        if x.is_nan() || y.is_nan() {
            return Err(RasterError::NanCoordinate);
        }
        if !self.has_value_at(x, y) {
            return Err(RasterError::OutOfExtent);
        }
        Ok(self.value_at_unchecked(x, y))
    }

    /// Same as [`value_at`](Self::value_at) without any validation.
    ///
    /// Callers must have established that `(x, y)` is finite and inside the
    /// extent; for other inputs the returned value is meaningless and the
    /// call may panic. Intended for the hot path where the bounds check has
    /// already happened upstream.
    pub fn value_at_unchecked(&self, x: f64, y: f64) -> f64 {
        let mut row = ((self.y_max - y) / self.row_height) as usize;
        // A query exactly on y_min lands one row past the end.
        if row == self.num_rows {
            row -= 1;
        }

        let mut col = ((x - self.x_min) / self.col_width) as usize;
        // Same for a query exactly on x_max.
        if col == self.num_cols {
            col -= 1;
        }

        self.values[self.num_cols * row + col]
    }

    /// A copy of this grid with the same extent but new values.
    pub fn with_values(&self, new_values: Vec<f64>) -> Result<Raster, RasterError> {
        if new_values.len() != self.values.len() {
            return Err(RasterError::ValueCountMismatch {
                expected: self.values.len(),
                got: new_values.len(),
            });
        }
        Ok(Raster {
            values: new_values,
            ..self.clone()
        })
    }
}

// ---------------------------------------------------------------------------
// ScalarField — constant or grid
// ---------------------------------------------------------------------------

/// A scalar value that may vary over the xy-plane.
///
/// Exactly two variants exist: one fixed value for every location, or a
/// [`Raster`] grid with nearest-cell lookup. Fields are immutable snapshots;
/// the mean-shift core only ever reads them.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarField {
    /// The same value at every location.
    Constant(f64),
    /// Per-cell values over a rectangular extent.
    Grid(Raster),
}

impl ScalarField {
    /// Convenience constructor for a grid-backed field.
    pub fn grid(
        values: Vec<f64>,
        num_rows: usize,
        num_cols: usize,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    ) -> Self {
        Self::Grid(Raster::new(values, num_rows, num_cols, x_min, x_max, y_min, y_max))
    }

    /// Whether the field has a value at `(x, y)`.
    pub fn has_value_at(&self, x: f64, y: f64) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::Grid(raster) => raster.has_value_at(x, y),
        }
    }

    /// Checked lookup, see [`Raster::value_at`].
    pub fn value_at(&self, x: f64, y: f64) -> Result<f64, RasterError> {
        match self {
            Self::Constant(value) => {
                if x.is_nan() || y.is_nan() {
                    return Err(RasterError::NanCoordinate);
                }
                Ok(*value)
            }
            Self::Grid(raster) => raster.value_at(x, y),
        }
    }

    /// Unchecked lookup, see [`Raster::value_at_unchecked`].
    pub fn value_at_unchecked(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Grid(raster) => raster.value_at_unchecked(x, y),
        }
    }

    /// A copy of this field with new values.
    ///
    /// For a constant field exactly one value is expected, for a grid the
    /// grid's cell count.
    pub fn with_values(&self, new_values: Vec<f64>) -> Result<ScalarField, RasterError> {
        match self {
            Self::Constant(_) => {
                if new_values.len() != 1 {
                    return Err(RasterError::ValueCountMismatch {
                        expected: 1,
                        got: new_values.len(),
                    });
                }
                Ok(Self::Constant(new_values[0]))
            }
            Self::Grid(raster) => Ok(Self::Grid(raster.with_values(new_values)?)),
        }
    }

    /// The backing values (length 1 for a constant field).
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Constant(value) => std::slice::from_ref(value),
            Self::Grid(raster) => raster.values(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×2 grid over [0, 10] × [0, 10]:
    ///   row 0 (top):    1 2
    ///   row 1 (bottom): 3 4
    fn quad() -> Raster {
        Raster::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2, 0.0, 10.0, 0.0, 10.0)
    }

    #[test]
    fn test_lookup_hits_the_containing_cell() {
        let r = quad();
        assert_eq!(r.value_at(2.0, 8.0).unwrap(), 1.0);
        assert_eq!(r.value_at(8.0, 8.0).unwrap(), 2.0);
        assert_eq!(r.value_at(2.0, 2.0).unwrap(), 3.0);
        assert_eq!(r.value_at(8.0, 2.0).unwrap(), 4.0);
    }

    #[test]
    fn test_lookup_at_cell_lower_left_corner() {
        let r = quad();
        // The lower-left corner of the top-right cell belongs to that cell.
        assert_eq!(r.value_at(5.0, 5.0).unwrap(), 2.0);
    }

    #[test]
    fn test_lookup_at_extent_edges_is_inclusive() {
        let r = quad();
        // Exactly on x_max / y_min: the index clamp resolves to the last
        // column / row instead of running out of range.
        assert_eq!(r.value_at(10.0, 10.0).unwrap(), 2.0);
        assert_eq!(r.value_at(10.0, 0.0).unwrap(), 4.0);
        assert_eq!(r.value_at(0.0, 0.0).unwrap(), 3.0);
        assert_eq!(r.value_at(0.0, 10.0).unwrap(), 1.0);
    }

    #[test]
    fn test_lookup_outside_extent_fails() {
        let r = quad();
        assert_eq!(r.value_at(10.001, 5.0), Err(RasterError::OutOfExtent));
        assert_eq!(r.value_at(5.0, -0.001), Err(RasterError::OutOfExtent));
        assert!(!r.has_value_at(-1.0, 5.0));
    }

    #[test]
    fn test_lookup_with_nan_coordinate_fails() {
        let r = quad();
        assert_eq!(r.value_at(f64::NAN, 5.0), Err(RasterError::NanCoordinate));
        assert_eq!(r.value_at(5.0, f64::NAN), Err(RasterError::NanCoordinate));
        assert_eq!(
            ScalarField::Constant(7.0).value_at(f64::NAN, 0.0),
            Err(RasterError::NanCoordinate)
        );
    }

    #[test]
    fn test_with_values_checks_length() {
        let r = quad();
        let swapped = r.with_values(vec![9.0, 9.0, 9.0, 9.0]).unwrap();
        assert_eq!(swapped.value_at(2.0, 2.0).unwrap(), 9.0);

        assert_eq!(
            r.with_values(vec![1.0]),
            Err(RasterError::ValueCountMismatch { expected: 4, got: 1 })
        );
        assert_eq!(
            ScalarField::Constant(1.0).with_values(vec![1.0, 2.0]),
            Err(RasterError::ValueCountMismatch { expected: 1, got: 2 })
        );
    }

    #[test]
    fn test_constant_field_answers_everywhere() {
        let f = ScalarField::Constant(0.35);
        assert!(f.has_value_at(-1e9, 1e9));
        assert_eq!(f.value_at(123.0, -456.0).unwrap(), 0.35);
        assert_eq!(f.value_at_unchecked(0.0, 0.0), 0.35);
        assert_eq!(f.values(), &[0.35]);
    }

    #[test]
    fn test_nan_cell_values_are_returned_not_rejected() {
        // NaN inside a grid is a data condition for the caller, not an error.
        let r = Raster::new(vec![f64::NAN, 2.0, 3.0, 4.0], 2, 2, 0.0, 10.0, 0.0, 10.0);
        assert!(r.value_at(2.0, 8.0).unwrap().is_nan());
    }
}
