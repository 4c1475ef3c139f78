use geo::Point;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A continuous surface held as a row-major grid, first row northmost.
/// `None` cells are nodata; they are a local data gap, never an error.
#[derive(Debug, Clone)]
pub struct Raster {
    ncols: usize,
    nrows: usize,
    xll: f64,
    yll: f64,
    cell_size: f64,
    cells: Vec<Option<f64>>,
}

/// Discrete classified counterpart of [`Raster`], same extent and
/// resolution.
#[derive(Debug, Clone)]
pub struct ClassRaster {
    ncols: usize,
    nrows: usize,
    xll: f64,
    yll: f64,
    cell_size: f64,
    cells: Vec<Option<i32>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to read raster: {0}")]
    Io(#[from] std::io::Error),
    #[error("raster header is missing '{0}'")]
    MissingHeader(&'static str),
    #[error("cannot parse raster header line '{0}'")]
    InvalidHeader(String),
    #[error("cannot parse raster value '{0}'")]
    InvalidValue(String),
    #[error("raster declares {expected} cells but provides {found}")]
    CellCountMismatch { expected: usize, found: usize },
}

impl Raster {
    pub fn new(
        ncols: usize,
        nrows: usize,
        xll: f64,
        yll: f64,
        cell_size: f64,
        cells: Vec<Option<f64>>,
    ) -> Result<Self, RasterError> {
        let expected = ncols * nrows;
        if cells.len() != expected {
            return Err(RasterError::CellCountMismatch {
                expected,
                found: cells.len(),
            });
        }
        Ok(Self {
            ncols,
            nrows,
            xll,
            yll,
            cell_size,
            cells,
        })
    }

    /// Reads an ESRI ASCII grid: six header lines (`ncols`, `nrows`,
    /// `xllcorner`, `yllcorner`, `cellsize`, `nodata_value`) followed by
    /// row-major values, north row first.
    pub fn from_ascii_reader<R: BufRead>(reader: R) -> Result<Self, RasterError> {
        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut cell_size = None;
        let mut nodata = None;
        let mut cells: Vec<Option<f64>> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut tokens = trimmed.split_whitespace();
            let first = tokens.next().unwrap_or_default();
            if first.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                let value = tokens
                    .next()
                    .ok_or_else(|| RasterError::InvalidHeader(trimmed.to_string()))?;
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| RasterError::InvalidHeader(trimmed.to_string()))?;
                match first.to_ascii_lowercase().as_str() {
                    "ncols" => ncols = Some(parsed as usize),
                    "nrows" => nrows = Some(parsed as usize),
                    "xllcorner" => xll = Some(parsed),
                    "yllcorner" => yll = Some(parsed),
                    "cellsize" => cell_size = Some(parsed),
                    "nodata_value" => nodata = Some(parsed),
                    _ => return Err(RasterError::InvalidHeader(trimmed.to_string())),
                }
            } else {
                for token in trimmed.split_whitespace() {
                    let value: f64 = token
                        .parse()
                        .map_err(|_| RasterError::InvalidValue(token.to_string()))?;
                    let cell = match nodata {
                        Some(nodata_value) if value == nodata_value => None,
                        _ => Some(value),
                    };
                    cells.push(cell);
                }
            }
        }

        let ncols = ncols.ok_or(RasterError::MissingHeader("ncols"))?;
        let nrows = nrows.ok_or(RasterError::MissingHeader("nrows"))?;
        let xll = xll.ok_or(RasterError::MissingHeader("xllcorner"))?;
        let yll = yll.ok_or(RasterError::MissingHeader("yllcorner"))?;
        let cell_size = cell_size.ok_or(RasterError::MissingHeader("cellsize"))?;

        Self::new(ncols, nrows, xll, yll, cell_size, cells)
    }

    pub fn from_ascii_path<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let file = File::open(path)?;
        Self::from_ascii_reader(BufReader::new(file))
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.cells[row * self.ncols + col]
    }

    pub fn cells(&self) -> &[Option<f64>] {
        &self.cells
    }

    /// Center point of a cell in map coordinates.
    pub fn cell_center(&self, row: usize, col: usize) -> Point<f64> {
        let x = self.xll + (col as f64 + 0.5) * self.cell_size;
        let y = self.yll + ((self.nrows - 1 - row) as f64 + 0.5) * self.cell_size;
        Point::new(x, y)
    }

    /// Iterates every cell as (center, value) in row-major order.
    pub fn cells_with_centers(&self) -> impl Iterator<Item = (Point<f64>, Option<f64>)> + '_ {
        (0..self.nrows).flat_map(move |row| {
            (0..self.ncols).map(move |col| (self.cell_center(row, col), self.value(row, col)))
        })
    }

    /// Builds the classified counterpart with identical extent/resolution.
    pub fn with_classes(&self, cells: Vec<Option<i32>>) -> Result<ClassRaster, RasterError> {
        let expected = self.ncols * self.nrows;
        if cells.len() != expected {
            return Err(RasterError::CellCountMismatch {
                expected,
                found: cells.len(),
            });
        }
        Ok(ClassRaster {
            ncols: self.ncols,
            nrows: self.nrows,
            xll: self.xll,
            yll: self.yll,
            cell_size: self.cell_size,
            cells,
        })
    }
}

impl ClassRaster {
    /// A surface of one class everywhere, matching the template's grid.
    pub fn uniform(template: &Raster, class: i32) -> Self {
        ClassRaster {
            ncols: template.ncols,
            nrows: template.nrows,
            xll: template.xll,
            yll: template.yll,
            cell_size: template.cell_size,
            cells: vec![Some(class); template.ncols * template.nrows],
        }
    }

    pub fn value(&self, row: usize, col: usize) -> Option<i32> {
        self.cells[row * self.ncols + col]
    }

    pub fn cells(&self) -> &[Option<i32>] {
        &self.cells
    }

    pub fn cell_center(&self, row: usize, col: usize) -> Point<f64> {
        let x = self.xll + (col as f64 + 0.5) * self.cell_size;
        let y = self.yll + ((self.nrows - 1 - row) as f64 + 0.5) * self.cell_size;
        Point::new(x, y)
    }

    pub fn cells_with_centers(&self) -> impl Iterator<Item = (Point<f64>, Option<i32>)> + '_ {
        (0..self.nrows).flat_map(move |row| {
            (0..self.ncols).map(move |col| (self.cell_center(row, col), self.value(row, col)))
        })
    }
}
