//! Travel-time resolution over the world map.
//!
//! Cities form an undirected weighted graph. Towns, hamlets and notable
//! locations hang off that graph as fixed offsets to a base city, so every
//! lookup reduces to `offset(origin) + shortest_path + offset(destination)`.

use council_core::WorldMap;
use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TravelError {
    #[error("unknown location: {0}")]
    UnknownLocation(String),
    #[error("no known route between {from} and {to}")]
    Unreachable { from: String, to: String },
}

/// Where a named location attaches to the city graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationOffset {
    pub base_city: String,
    pub days: f64,
}

pub struct TravelResolver {
    world: WorldMap,
    graph: UnGraph<String, f64>,
    nodes: HashMap<String, NodeIndex>,
}

impl TravelResolver {
    pub fn new(world: WorldMap) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut nodes = HashMap::new();
        for city in &world.cities {
            nodes
                .entry(city.name.clone())
                .or_insert_with(|| graph.add_node(city.name.clone()));
        }
        for route in &world.routes {
            // Routes naming cities outside the roster are dropped.
            let (Some(&a), Some(&b)) = (nodes.get(&route.from), nodes.get(&route.to)) else {
                continue;
            };
            graph.add_edge(a, b, route.days);
        }
        Self {
            world,
            graph,
            nodes,
        }
    }

    /// Resolve a name to its base city and offset. Tries cities, towns,
    /// hamlets, then notable locations. A chain that ends at a city missing
    /// from the route graph does not resolve.
    pub fn resolve_offset(&self, name: &str) -> Option<LocationOffset> {
        self.lookup_offset(name)
            .filter(|offset| self.nodes.contains_key(&offset.base_city))
    }

    fn lookup_offset(&self, name: &str) -> Option<LocationOffset> {
        if self.world.cities.iter().any(|c| c.name == name) {
            return Some(LocationOffset {
                base_city: name.to_string(),
                days: 0.0,
            });
        }
        if let Some(town) = self.world.towns.iter().find(|t| t.name == name) {
            return Some(LocationOffset {
                base_city: town.nearest_city.clone(),
                days: town.days_to_city,
            });
        }
        if let Some(hamlet) = self.world.hamlets.iter().find(|h| h.name == name) {
            let town = self.town_offset(&hamlet.nearest_town)?;
            return Some(LocationOffset {
                base_city: town.base_city,
                days: hamlet.days_to_town + town.days,
            });
        }
        let notable = self.world.notable_locations.iter().find(|n| n.name == name)?;
        if let Some(city) = &notable.nearest_city {
            return Some(LocationOffset {
                base_city: city.clone(),
                days: notable.days_to_city.unwrap_or(0.0),
            });
        }
        let town = self.town_offset(notable.nearest_town.as_deref()?)?;
        Some(LocationOffset {
            base_city: town.base_city,
            days: notable.days_to_town.unwrap_or(0.0) + town.days,
        })
    }

    fn town_offset(&self, town: &str) -> Option<LocationOffset> {
        self.world
            .towns
            .iter()
            .find(|t| t.name == town)
            .map(|t| LocationOffset {
                base_city: t.nearest_city.clone(),
                days: t.days_to_city,
            })
    }

    /// Minimum travel days between two cities on the route graph.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<f64, TravelError> {
        let start = *self
            .nodes
            .get(from)
            .ok_or_else(|| TravelError::UnknownLocation(from.to_string()))?;
        let goal = *self
            .nodes
            .get(to)
            .ok_or_else(|| TravelError::UnknownLocation(to.to_string()))?;
        if start == goal {
            return Ok(0.0);
        }
        let distances = dijkstra(&self.graph, start, Some(goal), |edge| *edge.weight());
        distances
            .get(&goal)
            .copied()
            .ok_or_else(|| TravelError::Unreachable {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    pub fn travel_time(&self, origin: &str, destination: &str) -> Result<f64, TravelError> {
        let from = self
            .resolve_offset(origin)
            .ok_or_else(|| TravelError::UnknownLocation(origin.to_string()))?;
        let to = self
            .resolve_offset(destination)
            .ok_or_else(|| TravelError::UnknownLocation(destination.to_string()))?;
        let route = self.shortest_path(&from.base_city, &to.base_city)?;
        Ok(from.days + route + to.days)
    }
}
