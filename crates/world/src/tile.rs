use serde::{Deserialize, Serialize};

/// Ground type of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Plains,
    Desert,
    Water,
    Mountain,
    Forest,
}

impl Terrain {
    /// Sprite key for the ground quad baked into the base layer.
    pub fn ground_sprite(self) -> &'static str {
        match self {
            Terrain::Water => "terrain.water",
            Terrain::Desert => "terrain.desert",
            _ => "terrain.land",
        }
    }

    /// Sprite key for an additional baked overlay quad, if any. Forest has
    /// none here: its trees are scattered per frame by the forest pass.
    pub fn overlay_sprite(self) -> Option<&'static str> {
        match self {
            Terrain::Mountain => Some("terrain.mountain"),
            _ => None,
        }
    }
}

/// A constructed improvement occupying a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Improvement {
    Road,
    Rail,
    City,
    Depot,
    Port,
    Mine,
    Farm,
    LumberMill,
    Ranch,
    Plantation,
    OilWell,
    Watchtower,
}

impl Improvement {
    /// Whether this improvement connects into the road/rail network.
    /// Connected improvements get ribbon geometry toward connected
    /// neighbors in the infra layer.
    pub fn joins_transport_network(self) -> bool {
        !matches!(self, Improvement::Watchtower)
    }

    /// Sprite key for the overlay icon drawn above the tile, if any. Roads
    /// and rails are pure ribbon geometry with no standing icon.
    pub fn icon_sprite(self) -> Option<&'static str> {
        match self {
            Improvement::Road | Improvement::Rail => None,
            Improvement::City => Some("building.city"),
            Improvement::Depot => Some("building.depot"),
            Improvement::Port => Some("building.port"),
            Improvement::Mine => Some("building.mine"),
            Improvement::Farm => Some("building.farm"),
            Improvement::LumberMill => Some("building.lumber_mill"),
            Improvement::Ranch => Some("building.ranch"),
            Improvement::Plantation => Some("building.plantation"),
            Improvement::OilWell => Some("building.oil_well"),
            Improvement::Watchtower => Some("building.watchtower"),
        }
    }
}

/// A natural resource present on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Wheat,
    Timber,
    Iron,
    Oil,
    Cattle,
    Deer,
    Fish,
}

impl Resource {
    /// Animal resources are drawn by the animal pass (animated, wandering);
    /// the rest get static clumped icons from the overlay pass.
    pub fn is_animal(self) -> bool {
        matches!(self, Resource::Cattle | Resource::Deer)
    }

    pub fn icon_sprite(self) -> &'static str {
        match self {
            Resource::Wheat => "resource.wheat",
            Resource::Timber => "resource.timber",
            Resource::Iron => "resource.iron",
            Resource::Oil => "resource.oil",
            Resource::Cattle => "animal.cattle",
            Resource::Deer => "animal.deer",
            Resource::Fish => "resource.fish",
        }
    }
}

/// Per-tile state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: Terrain,
    pub improvement: Option<Improvement>,
    /// Upgrade level of the improvement; level 2+ road segments render as rail.
    pub level: u8,
    pub resource: Option<Resource>,
    pub visible: bool,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            terrain: Terrain::Plains,
            improvement: None,
            level: 0,
            resource: None,
            visible: true,
        }
    }
}

impl Tile {
    /// Whether the tile contributes ribbon geometry to the infra layer.
    pub fn joins_transport_network(&self) -> bool {
        self.improvement
            .is_some_and(Improvement::joins_transport_network)
    }
}
