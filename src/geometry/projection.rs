use crate::{
    geometry::{Error, Route},
    shared::Coordinate,
};

impl Route {
    /// Resolves station coordinates to offsets along the route.
    ///
    /// Each station is projected onto the nearest segment at or after the segment the
    /// previous station landed on, so stations keep their order even where the line
    /// doubles back on itself (loop lines list their first station again at the end).
    pub fn project_stations(self, id: &str, stations: &[Coordinate]) -> Result<Self, Error> {
        let table = self.table();
        let mut offsets = Vec::with_capacity(stations.len());
        let mut from_segment = 0;
        let mut last_offset = f64::NEG_INFINITY;

        for station in stations {
            let mut best: Option<(f64, usize, f64)> = None;
            for segment in from_segment..table.len() - 1 {
                let (a, b) = (&table[segment], &table[segment + 1]);
                let (bx, by) = b.coordinate.to_plane(&a.coordinate);
                let (px, py) = station.to_plane(&a.coordinate);
                let span = bx * bx + by * by;
                let t = if span > 0.0 {
                    ((px * bx + py * by) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (dx, dy) = (px - bx * t, py - by * t);
                let gap = dx * dx + dy * dy;
                let offset = a.distance + (b.distance - a.distance) * t;
                if offset <= last_offset {
                    continue;
                }
                if best.is_none_or(|(best_gap, _, _)| gap < best_gap) {
                    best = Some((gap, segment, offset));
                }
            }

            let Some((_, segment, offset)) = best else {
                return Err(Error::UnorderedStations(id.to_string()));
            };
            offsets.push(offset);
            from_segment = segment;
            last_offset = offset;
        }

        self.with_station_offsets(id, offsets)
    }
}

#[test]
fn project_stations_in_order() {
    use crate::geometry::Vertex;
    let vertices: Vec<Vertex> = [(35.68, 139.76), (35.70, 139.76), (35.70, 139.78)]
        .into_iter()
        .map(|point| Coordinate::from(point).into())
        .collect();
    let route = Route::new("line", &vertices).unwrap();
    let stations = [
        Coordinate::new(35.68, 139.76),
        Coordinate::new(35.6901, 139.7601),
        Coordinate::new(35.70, 139.78),
    ];
    let route = route.project_stations("line", &stations).unwrap();
    let offsets = route.station_offsets();
    assert_eq!(offsets.len(), 3);
    assert_eq!(offsets[0], 0.0);
    assert!((offsets[1] - route.table()[1].distance / 2.0).abs() < 20.0);
    assert!((offsets[2] - route.length().as_meters()).abs() < 1e-6);
}
