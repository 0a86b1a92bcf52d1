use super::config::CollectionConfig;
use super::error::CollectionError;
use crate::core::models::cell::GridCell;
use crate::core::models::ids::NucleonId;
use itertools::iproduct;
use nalgebra::Point3;

/// A uniform grid of `(2U)^3` cubic bins tiling the periodic region `[-L, L)^3`.
///
/// Bins are stored in a single flat allocation addressed by `(i * 2U + j) * 2U + k`. Each
/// bin keeps the ids of its occupants in insertion order.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    units: usize,
    length: f64,
    cube_length: f64,
    bins: Vec<Vec<NucleonId>>,
}

impl SpatialGrid {
    pub fn new(config: &CollectionConfig) -> Self {
        let per_axis = 2 * config.units;
        Self {
            units: config.units,
            length: config.length,
            cube_length: config.cube_length(),
            bins: vec![Vec::new(); per_axis * per_axis * per_axis],
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn cube_length(&self) -> f64 {
        self.cube_length
    }

    pub fn bins_per_axis(&self) -> usize {
        2 * self.units
    }

    /// Maps a coordinate triple to the bin that contains it.
    ///
    /// Each coordinate is folded into `[-L, L)` first, then the axis index is
    /// `floor(coord / cube_length) + U` taken modulo `2U`. Any finite input lands in a valid
    /// bin, however far outside the region it lies.
    pub fn find_cube(&self, position: &Point3<f64>) -> GridCell {
        GridCell::new(
            self.axis_index(position.x),
            self.axis_index(position.y),
            self.axis_index(position.z),
        )
    }

    /// Folds a position into the half-open region `[-L, L)` on every axis.
    ///
    /// Coordinates already inside the region are returned unchanged; a coordinate equal
    /// to `L` folds to `-L`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NonFiniteCoordinate`] if any coordinate is NaN or infinite.
    pub fn bring_inside_region(
        &self,
        position: Point3<f64>,
    ) -> Result<Point3<f64>, CollectionError> {
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return Err(CollectionError::NonFiniteCoordinate {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }
        Ok(Point3::new(
            wrap_coordinate(position.x, self.length),
            wrap_coordinate(position.y, self.length),
            wrap_coordinate(position.z, self.length),
        ))
    }

    pub fn bin(&self, cell: GridCell) -> &[NucleonId] {
        &self.bins[self.flat_index(cell)]
    }

    pub(crate) fn bin_mut(&mut self, cell: GridCell) -> &mut Vec<NucleonId> {
        let index = self.flat_index(cell);
        &mut self.bins[index]
    }

    /// Iterates over every bin coordinate of the grid.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + use<> {
        let n = self.bins_per_axis();
        iproduct!(0..n, 0..n, 0..n).map(|(i, j, k)| GridCell::new(i, j, k))
    }

    /// Lists the bins within `reach` bins of `center` on every axis, with wrap-around.
    ///
    /// Each distinct bin is listed at most once. When the window `2 * reach + 1` would
    /// exceed the `2U` bins of an axis, that axis instead covers every bin once.
    pub fn neighbor_bins(&self, center: GridCell, reach: usize) -> Vec<GridCell> {
        let xs = self.axis_window(center.i, reach);
        let ys = self.axis_window(center.j, reach);
        let zs = self.axis_window(center.k, reach);

        iproduct!(xs, ys, zs)
            .map(|(i, j, k)| GridCell::new(i, j, k))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.bins.iter_mut().for_each(Vec::clear);
    }

    fn flat_index(&self, cell: GridCell) -> usize {
        let n = self.bins_per_axis();
        (cell.i * n + cell.j) * n + cell.k
    }

    fn axis_index(&self, coordinate: f64) -> usize {
        let n = self.bins_per_axis() as i64;
        let folded = wrap_coordinate(coordinate, self.length);
        let raw = (folded / self.cube_length).floor() as i64;
        (raw + self.units as i64).rem_euclid(n) as usize
    }

    /// Wrapped bin indices along one axis.
    fn axis_window(&self, center: usize, reach: usize) -> Vec<usize> {
        let n = self.bins_per_axis() as isize;
        let (low, high) = if reach.saturating_mul(2).saturating_add(1) > self.bins_per_axis() {
            (-(self.units as isize), self.units as isize - 1)
        } else {
            (-(reach as isize), reach as isize)
        };

        let center = center as isize;
        (low..=high)
            .map(|offset| (center + offset).rem_euclid(n) as usize)
            .collect()
    }
}

fn wrap_coordinate(value: f64, length: f64) -> f64 {
    if (-length..length).contains(&value) {
        return value;
    }
    let period = 2.0 * length;
    let wrapped = (value + length).rem_euclid(period) - length;
    // rem_euclid may round up to the period itself.
    if wrapped >= length {
        wrapped - period
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid(units: usize, length: f64) -> SpatialGrid {
        SpatialGrid::new(&CollectionConfig::new(0.0, units, length).unwrap())
    }

    #[test]
    fn new_grid_has_expected_dimensions() {
        let grid = grid(3, 6.0);
        assert_eq!(grid.bins_per_axis(), 6);
        assert_eq!(grid.cube_length(), 2.0);
        assert_eq!(grid.cells().count(), 216);
        assert!(grid.cells().all(|cell| grid.bin(cell).is_empty()));
    }

    #[test]
    fn find_cube_offsets_indices_by_units() {
        let grid = grid(1, 1.0);
        assert_eq!(grid.find_cube(&Point3::new(0.0, 0.0, 0.0)), GridCell::new(1, 1, 1));
        assert_eq!(grid.find_cube(&Point3::new(-0.9, 0.3, 0.99)), GridCell::new(0, 1, 1));
        assert_eq!(grid.find_cube(&Point3::new(-1.0, -0.5, 0.5)), GridCell::new(0, 0, 1));
    }

    #[test]
    fn find_cube_wraps_points_outside_the_region() {
        let grid = grid(2, 2.0);
        let inside = grid.find_cube(&Point3::new(0.5, -1.5, 1.2));
        let outside = grid.find_cube(&Point3::new(4.5, -5.5, -2.8));
        assert_eq!(inside, outside);
    }

    #[test]
    fn bring_inside_region_leaves_inside_points_untouched() {
        let grid = grid(4, 2.0);
        let point = Point3::new(0.3, -2.0, 1.999);
        assert_eq!(grid.bring_inside_region(point).unwrap(), point);
    }

    #[test]
    fn bring_inside_region_folds_upper_bound_to_lower_bound() {
        let grid = grid(1, 1.0);
        let folded = grid.bring_inside_region(Point3::new(1.0, 3.0, -3.0)).unwrap();
        assert_eq!(folded, Point3::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn bring_inside_region_wraps_far_away_points() {
        let grid = grid(1, 1.0);
        let folded = grid
            .bring_inside_region(Point3::new(10.25, -7.5, 2.5))
            .unwrap();
        assert_eq!(folded, Point3::new(0.25, 0.5, 0.5));
    }

    #[test]
    fn bring_inside_region_rejects_non_finite_coordinates() {
        let grid = grid(1, 1.0);
        let result = grid.bring_inside_region(Point3::new(f64::NAN, 0.0, 0.0));
        assert!(matches!(
            result,
            Err(CollectionError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn neighbor_bins_cover_the_window_once() {
        let grid = grid(4, 4.0);
        let bins = grid.neighbor_bins(GridCell::new(0, 4, 7), 1);
        assert_eq!(bins.len(), 27);

        let distinct: HashSet<_> = bins.iter().copied().collect();
        assert_eq!(distinct.len(), 27);
        assert!(distinct.contains(&GridCell::new(7, 4, 0)));
        assert!(distinct.contains(&GridCell::new(1, 5, 6)));
        assert!(!distinct.contains(&GridCell::new(2, 4, 7)));
    }

    #[test]
    fn neighbor_bins_visit_every_bin_once_when_reach_exceeds_grid() {
        let grid = grid(1, 1.0);
        let bins = grid.neighbor_bins(GridCell::new(1, 1, 0), 1);
        assert_eq!(bins.len(), 8);

        let distinct: HashSet<_> = bins.iter().copied().collect();
        assert_eq!(distinct.len(), 8);
    }

    #[test]
    fn neighbor_bins_with_huge_reach_do_not_overflow() {
        let grid = grid(2, 1.0);
        assert_eq!(grid.neighbor_bins(GridCell::new(0, 0, 0), usize::MAX).len(), 64);
    }

    #[test]
    fn find_cube_handles_huge_finite_coordinates() {
        let grid = grid(30, 15.0);
        let cell = grid.find_cube(&Point3::new(1e300, -1e300, f64::MAX));
        assert!(cell.as_array().iter().all(|&index| index < grid.bins_per_axis()));
    }

    #[test]
    fn bins_track_membership() {
        let mut grid = grid(1, 1.0);
        let cell = GridCell::new(1, 0, 1);
        let id = NucleonId::default();
        grid.bin_mut(cell).push(id);
        assert_eq!(grid.bin(cell), &[id]);

        grid.clear();
        assert!(grid.bin(cell).is_empty());
    }
}
