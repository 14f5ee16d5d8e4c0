//! Routes bundled for trying the tool without a route file.

use bus_alarm_core::transit::prelude::*;

fn stop(id: &str, sequence_index: u32, name: &str, latitude: f64, longitude: f64) -> Stop {
    Stop {
        id: StopIdentifier::new(id),
        sequence_index,
        name: name.into(),
        coordinates: Coordinate::new(latitude, longitude),
    }
}

fn route(id: &str, name: &str, stops: Vec<Stop>) -> Route {
    Route {
        id: RouteIdentifier::new(id),
        name: name.into(),
        polyline: stops.iter().map(|s| s.coordinates).collect(),
        stops,
    }
}

pub fn routes() -> Vec<Route> {
    vec![
        route(
            "BUS001",
            "Kukatpally to Campus",
            vec![
                stop("kukatpally-depot", 0, "Kukatpally Bus Depot", 17.3850, 78.4867),
                stop("miyapur-metro", 1, "Miyapur Metro Station", 17.4401, 78.3489),
                stop("hitech-city", 2, "Hitech City Junction", 17.4500, 78.3800),
                stop("madhapur-ps", 3, "Madhapur Police Station", 17.4600, 78.4000),
                stop("gachibowli", 4, "Gachibowli Circle", 17.4700, 78.4200),
                stop("university-gate", 5, "University Main Gate", 17.4832, 78.4567),
            ],
        ),
        route(
            "BUS002",
            "Ameerpet to Campus",
            vec![
                stop("ameerpet-metro", 0, "Ameerpet Metro", 17.4375, 78.4484),
                stop("sr-nagar", 1, "SR Nagar", 17.4401, 78.3489),
                stop("hitech-city", 2, "Hitech City", 17.4500, 78.3800),
                stop("university-gate", 3, "University Gate", 17.4832, 78.4567),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_routes_are_valid() {
        let provider = StaticRouteProvider::from_routes(routes()).unwrap();
        assert_eq!(provider.all_routes().len(), 2);

        let bus = provider.require_route(&RouteIdentifier::new("BUS001")).unwrap();
        assert_eq!(bus.stops.len(), 6);
    }
}
