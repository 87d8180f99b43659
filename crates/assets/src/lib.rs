//! Sprite catalog: the consuming interface to the atlas subsystem.
//!
//! Atlas packing happens elsewhere; this crate models what the renderer
//! needs from it: UV rects by sprite key, per-sprite visual configuration,
//! atlas metadata, and a change log that drives selective cache
//! invalidation. The catalog can be persisted to disk as JSON for
//! inspection and editing.

use hexfield_common::{AtlasId, UvRect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown sprite: {0}")]
    UnknownSprite(String),
}

/// Which cached rendering state a sprite's configuration feeds.
///
/// Terrain and infra sprites are baked into chunk textures, so editing them
/// invalidates those caches; content sprites are re-gathered every frame and
/// need no invalidation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteGroup {
    Terrain,
    Infra,
    Content,
}

/// Drop-shadow parameters for a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowConfig {
    pub enabled: bool,
    /// Shadow ellipse width relative to the sprite width.
    pub scale: f32,
    pub opacity: f32,
    /// Pixel offset of the ellipse center from the sprite anchor.
    pub offset: [f32; 2],
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scale: 0.8,
            opacity: 0.35,
            offset: [0.0, 2.0],
        }
    }
}

/// Clumped-placement parameters for sprites drawn several-per-tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClumpConfig {
    pub min: u32,
    pub max: u32,
    /// Scatter radius in pixels around the tile center.
    pub spread: f32,
}

impl Default for ClumpConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 3,
            spread: 14.0,
        }
    }
}

/// Per-sprite visual configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteVisual {
    /// Draw scale relative to the native sprite pixel size.
    pub scale: f32,
    /// Pixel shift of the sprite from its tile anchor.
    pub shift: [f32; 2],
    pub shadow: ShadowConfig,
    pub clump: ClumpConfig,
}

impl Default for SpriteVisual {
    fn default() -> Self {
        Self {
            scale: 1.0,
            shift: [0.0, 0.0],
            shadow: ShadowConfig::default(),
            clump: ClumpConfig::default(),
        }
    }
}

/// A sprite entry: where it lives in which atlas, and how to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteDef {
    pub atlas: AtlasId,
    pub uv: UvRect,
    /// Native pixel size of the sprite in its atlas.
    pub size: [f32; 2],
    pub group: SpriteGroup,
    pub visual: SpriteVisual,
}

/// Atlas texture metadata (the texture itself is owned by the GPU backend).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtlasInfo {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
}

/// Configuration-change notification drained once per frame by the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A sprite in the given group changed visually; caches derived from
    /// that group must be rebuilt.
    GroupChanged(SpriteGroup),
}

/// Global render quality settings, constructed once at application scope and
/// passed by reference to every pass that consults them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub shadows: bool,
    /// Hard cap on per-tile clump instances; 0 means uncapped. When set,
    /// this wins over any larger per-sprite configured maximum.
    pub max_clump: u32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            shadows: true,
            max_clump: 0,
        }
    }
}

/// Sprite catalog, keyed by sprite name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteCatalog {
    sprites: BTreeMap<String, SpriteDef>,
    atlases: BTreeMap<AtlasId, AtlasInfo>,
    #[serde(skip)]
    events: Vec<CatalogEvent>,
}

impl SpriteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a sprite definition.
    pub fn register_sprite(&mut self, key: impl Into<String>, def: SpriteDef) {
        self.sprites.insert(key.into(), def);
    }

    pub fn register_atlas(&mut self, id: AtlasId, info: AtlasInfo) {
        self.atlases.insert(id, info);
    }

    pub fn get(&self, key: &str) -> Option<&SpriteDef> {
        self.sprites.get(key)
    }

    pub fn atlas(&self, id: AtlasId) -> Option<&AtlasInfo> {
        self.atlases.get(&id)
    }

    pub fn atlases(&self) -> impl Iterator<Item = (&AtlasId, &AtlasInfo)> {
        self.atlases.iter()
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Update a sprite's visual configuration and record the change for the
    /// renderer to act on.
    pub fn set_visual(&mut self, key: &str, visual: SpriteVisual) -> Result<(), CatalogError> {
        let def = self
            .sprites
            .get_mut(key)
            .ok_or_else(|| CatalogError::UnknownSprite(key.into()))?;
        if def.visual != visual {
            def.visual = visual;
            self.events.push(CatalogEvent::GroupChanged(def.group));
            tracing::debug!(key, "sprite visual updated");
        }
        Ok(())
    }

    /// Drain and return pending configuration changes.
    pub fn drain_events(&mut self) -> Vec<CatalogEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[CatalogEvent] {
        &self.events
    }

    /// Save the catalog to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        let catalog: Self = serde_json::from_reader(file)?;
        Ok(catalog)
    }

    /// Built-in catalog laying out the standard sprite set across two
    /// atlases: atlas 0 is a 4×4 grid of baked terrain/infra cells, atlas 1
    /// an 8×8 grid of per-frame content cells.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let terrain = AtlasId(0);
        let content = AtlasId(1);
        catalog.register_atlas(
            terrain,
            AtlasInfo {
                width: 256,
                height: 256,
                mip_levels: 1,
            },
        );
        catalog.register_atlas(
            content,
            AtlasInfo {
                width: 512,
                height: 512,
                mip_levels: 1,
            },
        );

        let cell = |col: u32, row: u32, s: f32| {
            UvRect::new(
                col as f32 * s,
                row as f32 * s,
                (col + 1) as f32 * s,
                (row + 1) as f32 * s,
            )
        };
        let def = |atlas, uv, group| SpriteDef {
            atlas,
            uv,
            size: [64.0, 64.0],
            group,
            visual: SpriteVisual::default(),
        };

        // Baked layers.
        catalog.register_sprite(
            "terrain.land",
            def(terrain, cell(0, 0, 0.25), SpriteGroup::Terrain),
        );
        catalog.register_sprite(
            "terrain.water",
            def(terrain, cell(1, 0, 0.25), SpriteGroup::Terrain),
        );
        catalog.register_sprite(
            "terrain.desert",
            def(terrain, cell(2, 0, 0.25), SpriteGroup::Terrain),
        );
        catalog.register_sprite(
            "terrain.mountain",
            def(terrain, cell(3, 0, 0.25), SpriteGroup::Terrain),
        );
        catalog.register_sprite("infra.road", def(terrain, cell(0, 1, 0.25), SpriteGroup::Infra));
        catalog.register_sprite("infra.rail", def(terrain, cell(1, 1, 0.25), SpriteGroup::Infra));

        // Per-frame content: two 8-cell rows of icons.
        for (i, key) in [
            "resource.wheat",
            "resource.timber",
            "resource.iron",
            "resource.oil",
            "resource.fish",
            "building.city",
            "building.depot",
            "building.port",
            "building.mine",
            "building.farm",
            "building.lumber_mill",
            "building.ranch",
            "building.plantation",
            "building.oil_well",
            "building.watchtower",
        ]
        .iter()
        .enumerate()
        {
            let i = i as u32;
            catalog.register_sprite(
                *key,
                def(content, cell(i % 8, i / 8, 0.125), SpriteGroup::Content),
            );
        }

        let mut tree = def(content, cell(0, 2, 0.125), SpriteGroup::Content);
        tree.visual.clump = ClumpConfig {
            min: 2,
            max: 5,
            spread: 20.0,
        };
        catalog.register_sprite("tree.pine", tree);

        let mut animal = |key: &str, col: u32, row: u32| {
            let mut d = def(content, cell(col, row, 0.125), SpriteGroup::Content);
            d.size = [32.0, 32.0];
            d.visual.clump = ClumpConfig {
                min: 1,
                max: 3,
                spread: 24.0,
            };
            catalog.register_sprite(key, d);
        };
        animal("animal.deer", 1, 2);
        animal("animal.cattle", 2, 2);

        catalog
    }
}

pub fn crate_info() -> &'static str {
    "hexfield-assets v0.1.0"
}
