use ndarray::{Array4, ArrayView3};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SubdivideError {
    #[error("image must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("divider {divider} must be a factor of the image size {size}")]
    NotAFactor { size: usize, divider: usize },
}

/// Splits a square `(size, size, channels)` image into `(size / divider)^2`
/// non-overlapping `divider`-sized tiles.
///
/// Tiles are ordered row by row, so tile `i` covers grid row `i / n` and grid
/// column `i % n` where `n = size / divider`. The result has shape
/// `(n * n, divider, divider, channels)`.
///
/// # Example
/// ```rust
/// # use ndarray::Array3;
/// # use static_map_spiral::subsection;
/// let image = Array3::<f64>::zeros((100, 100, 3));
/// let tiles = subsection(image.view(), 25).unwrap();
/// assert_eq!(tiles.dim(), (16, 25, 25, 3));
/// ```
pub fn subsection<T: Clone>(
    image: ArrayView3<T>,
    divider: usize,
) -> Result<Array4<T>, SubdivideError> {
    let (rows, cols, channels) = image.dim();
    if rows != cols {
        return Err(SubdivideError::NotSquare { rows, cols });
    }
    if divider == 0 || rows % divider != 0 {
        return Err(SubdivideError::NotAFactor {
            size: rows,
            divider,
        });
    }

    let sections = rows / divider;
    let tiles = Array4::from_shape_fn(
        (sections * sections, divider, divider, channels),
        |(tile, y, x, c)| {
            let row = (tile / sections) * divider + y;
            let col = (tile % sections) * divider + x;
            image[[row, col, c]].clone()
        },
    );
    debug!(shape = ?tiles.dim(), "subdivided image");

    Ok(tiles)
}

/// All positive divisors of `size`, in ascending order.
pub fn factors(size: usize) -> Vec<usize> {
    (1..=size).filter(|x| size % x == 0).collect()
}
