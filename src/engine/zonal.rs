use crate::layers::raster::{ClassRaster, Raster};
use geo::{Contains, MultiPolygon, Point};
use std::collections::BTreeMap;
use tracing::debug;

/// How cell values within a zone are reduced to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Max,
}

/// Reduces the continuous surface over a zone. Cells are assigned by
/// center containment; nodata cells are skipped. A zone covering no data
/// cells yields `None` so the caller can substitute a published default.
pub fn summarize_continuous(
    surface: &Raster,
    zone: &MultiPolygon<f64>,
    statistic: Statistic,
) -> Option<f64> {
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    let mut count = 0usize;
    for (center, value) in surface.cells_with_centers() {
        let Some(value) = value else { continue };
        if !contains_point(zone, center) {
            continue;
        }
        sum += value;
        if value > max {
            max = value;
        }
        count += 1;
    }
    if count == 0 {
        debug!("zone covers no data cells; no continuous statistic");
        return None;
    }
    match statistic {
        Statistic::Mean => Some(sum / count as f64),
        Statistic::Max => Some(max),
    }
}

/// Reduces the discrete class surface over a zone to its majority class.
/// A tied count resolves to the lower class so a boundary zone never
/// scores worse than its dominant condition warrants.
pub fn summarize_classes(surface: &ClassRaster, zone: &MultiPolygon<f64>) -> Option<i32> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for (center, class) in surface.cells_with_centers() {
        let Some(class) = class else { continue };
        if !contains_point(zone, center) {
            continue;
        }
        *counts.entry(class).or_insert(0) += 1;
    }
    if counts.is_empty() {
        debug!("zone covers no classified cells; no class statistic");
        return None;
    }
    // BTreeMap iterates classes ascending, so on a tie the lower class
    // is kept.
    let mut best_class = 0;
    let mut best_count = 0usize;
    for (class, count) in counts {
        if count > best_count {
            best_class = class;
            best_count = count;
        }
    }
    Some(best_class)
}

fn contains_point(zone: &MultiPolygon<f64>, point: Point<f64>) -> bool {
    zone.0.iter().any(|polygon| polygon.contains(&point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::vector::rectangle;

    fn surface(ncols: usize, nrows: usize, cells: Vec<Option<f64>>) -> Raster {
        Raster::new(ncols, nrows, 0.0, 0.0, 10.0, cells).expect("raster is valid")
    }

    #[test]
    fn mean_covers_only_cells_with_centers_inside_the_zone() {
        // 4x1 grid, centers at x = 5, 15, 25, 35
        let surface = surface(4, 1, vec![Some(0.2), Some(0.4), Some(0.6), Some(0.8)]);
        let zone = rectangle(0.0, 0.0, 20.0, 10.0);
        let mean = summarize_continuous(&surface, &zone, Statistic::Mean)
            .expect("zone covers two cells");
        assert!((mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn max_picks_the_largest_covered_value() {
        let surface = surface(4, 1, vec![Some(0.2), Some(0.9), Some(0.6), Some(0.8)]);
        let zone = rectangle(0.0, 0.0, 30.0, 10.0);
        let max =
            summarize_continuous(&surface, &zone, Statistic::Max).expect("zone covers cells");
        assert_eq!(max, 0.9);
    }

    #[test]
    fn nodata_cells_are_skipped() {
        let surface = surface(3, 1, vec![Some(0.2), None, Some(0.4)]);
        let zone = rectangle(0.0, 0.0, 30.0, 10.0);
        let mean = summarize_continuous(&surface, &zone, Statistic::Mean)
            .expect("two data cells remain");
        assert!((mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn zone_outside_the_surface_has_no_statistic() {
        let surface = surface(2, 1, vec![Some(0.2), Some(0.4)]);
        let zone = rectangle(100.0, 100.0, 110.0, 110.0);
        assert_eq!(summarize_continuous(&surface, &zone, Statistic::Mean), None);
        let classes = surface
            .with_classes(vec![Some(1), Some(2)])
            .expect("counts match");
        assert_eq!(summarize_classes(&classes, &zone), None);
    }

    #[test]
    fn majority_class_wins() {
        let surface = surface(3, 1, vec![Some(0.0); 3]);
        let classes = surface
            .with_classes(vec![Some(2), Some(2), Some(3)])
            .expect("counts match");
        let zone = rectangle(0.0, 0.0, 30.0, 10.0);
        assert_eq!(summarize_classes(&classes, &zone), Some(2));
    }

    #[test]
    fn tied_class_counts_resolve_to_the_lower_class() {
        let surface = surface(4, 1, vec![Some(0.0); 4]);
        let classes = surface
            .with_classes(vec![Some(3), Some(1), Some(3), Some(1)])
            .expect("counts match");
        let zone = rectangle(0.0, 0.0, 40.0, 10.0);
        assert_eq!(summarize_classes(&classes, &zone), Some(1));
    }
}
