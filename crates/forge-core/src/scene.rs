//! Procedural scene built from model parameters.
//!
//! The scene owns its meshes and the two shared materials. Every owned
//! resource holds a [`Ticket`] from a [`ResourceTracker`], so the live count
//! drops back to zero exactly when the scene (and any late texture) is gone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};

use crate::constants::FALLBACK_COLOR;
use crate::geometry::MeshData;
use crate::invention::{ModelParams, Rgb, Shape};
use crate::quaternion::Quaternion;

pub const PRIMARY_ROUGHNESS: f32 = 0.5;
pub const PRIMARY_METALNESS: f32 = 0.7;
pub const SECONDARY_ROUGHNESS: f32 = 0.6;
pub const SECONDARY_METALNESS: f32 = 0.3;

// ---------------------------------------------------------------------------
// Resource accounting
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

#[derive(Debug, Default)]
struct Counts {
    geometries: AtomicUsize,
    materials: AtomicUsize,
    textures: AtomicUsize,
}

impl Counts {
    fn slot(&self, kind: ResourceKind) -> &AtomicUsize {
        match kind {
            ResourceKind::Geometry => &self.geometries,
            ResourceKind::Material => &self.materials,
            ResourceKind::Texture => &self.textures,
        }
    }
}

/// Shared live-resource counter. Cloning shares the same counts.
#[derive(Clone, Debug, Default)]
pub struct ResourceTracker {
    counts: Arc<Counts>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, kind: ResourceKind) -> Ticket {
        self.counts.slot(kind).fetch_add(1, Ordering::SeqCst);
        Ticket {
            counts: Arc::clone(&self.counts),
            kind,
        }
    }

    pub fn live(&self, kind: ResourceKind) -> usize {
        self.counts.slot(kind).load(Ordering::SeqCst)
    }

    pub fn total_live(&self) -> usize {
        self.live(ResourceKind::Geometry)
            + self.live(ResourceKind::Material)
            + self.live(ResourceKind::Texture)
    }
}

/// Proof of one live resource; releases it on drop.
#[derive(Debug)]
pub struct Ticket {
    counts: Arc<Counts>,
    kind: ResourceKind,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.counts.slot(self.kind).fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Materials and textures
// ---------------------------------------------------------------------------

/// Decoded image ready to wrap a material. `bytes` keep the encoded form
/// (PNG/JPEG/WebP) for embedding in exports.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct Material {
    pub name: &'static str,
    pub base_color: Rgb,
    pub roughness: f32,
    pub metalness: f32,
    pub texture: Option<Arc<Texture>>,
    _ticket: Ticket,
    texture_ticket: Option<Ticket>,
}

/// Materials are shared between every node that uses them.
pub type MaterialRef = Arc<RwLock<Material>>;

impl Material {
    fn new(
        name: &'static str,
        base_color: Rgb,
        roughness: f32,
        metalness: f32,
        tracker: &ResourceTracker,
    ) -> MaterialRef {
        Arc::new(RwLock::new(Self {
            name,
            base_color,
            roughness,
            metalness,
            texture: None,
            _ticket: tracker.acquire(ResourceKind::Material),
            texture_ticket: None,
        }))
    }

    fn set_texture(&mut self, texture: Texture, ticket: Ticket) {
        self.texture = Some(Arc::new(texture));
        self.texture_ticket = Some(ticket);
    }
}

pub(crate) fn read(material: &MaterialRef) -> RwLockReadGuard<'_, Material> {
    material.read().unwrap_or_else(PoisonError::into_inner)
}

/// Weak handle to the primary material, for textures that arrive after the
/// scene was built.
#[derive(Clone, Debug)]
pub struct TextureSlot {
    material: Weak<RwLock<Material>>,
    tracker: ResourceTracker,
}

impl TextureSlot {
    /// Returns false when the scene was already disposed; the texture is
    /// dropped.
    pub fn apply(&self, texture: Texture) -> bool {
        let Some(material) = self.material.upgrade() else {
            return false;
        };
        let ticket = self.tracker.acquire(ResourceKind::Texture);
        material
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_texture(texture, ticket);
        true
    }
}

// ---------------------------------------------------------------------------
// Lighting and camera
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.8,
            directional_intensity: 1.5,
            directional_position: [8.0, 10.0, 5.0],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub fov_deg: f32,
    pub position: [f32; 3],
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_deg: 50.0,
            position: [5.0, 5.0, 10.0],
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    /// Non-positive sizes keep the previous aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate_speed: f32,
    pub damping: bool,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            min_distance: 3.0,
            max_distance: 50.0,
            auto_rotate_speed: 0.5,
            damping: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Scene graph
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SceneNode {
    pub shape: Shape,
    pub mesh: Arc<MeshData>,
    pub material: MaterialRef,
    pub translation: [f32; 3],
    pub rotation: Quaternion,
    pub scale: [f32; 3],
}

/// One group of component nodes sharing two materials.
#[derive(Debug)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub primary: MaterialRef,
    pub secondary: MaterialRef,
    pub lighting: Lighting,
    pub camera: Camera,
    pub orbit: Orbit,
    /// Colors that failed to parse and were replaced by the fallback grey.
    pub fallback_colors: Vec<String>,
    geometry_tickets: Vec<Ticket>,
    tracker: ResourceTracker,
}

fn parse_color(raw: &str, fallbacks: &mut Vec<String>) -> Rgb {
    Rgb::parse_hex(raw).unwrap_or_else(|| {
        fallbacks.push(raw.to_string());
        Rgb::parse_hex(FALLBACK_COLOR).unwrap_or(Rgb {
            r: 0x88,
            g: 0x88,
            b: 0x88,
        })
    })
}

fn to_f32(v: [f64; 3]) -> [f32; 3] {
    v.map(|x| if x.is_finite() { x as f32 } else { 0.0 })
}

impl SceneGraph {
    pub fn build(params: &ModelParams, tracker: &ResourceTracker) -> Self {
        let mut fallback_colors = Vec::new();
        let primary_color = parse_color(&params.primary_color, &mut fallback_colors);
        let secondary_color = parse_color(&params.secondary_color, &mut fallback_colors);

        let primary = Material::new(
            "primary",
            primary_color,
            PRIMARY_ROUGHNESS,
            PRIMARY_METALNESS,
            tracker,
        );
        let secondary = Material::new(
            "secondary",
            secondary_color,
            SECONDARY_ROUGHNESS,
            SECONDARY_METALNESS,
            tracker,
        );

        let mut meshes: HashMap<Shape, Arc<MeshData>> = HashMap::new();
        let mut geometry_tickets = Vec::new();
        let nodes = params
            .components
            .iter()
            .enumerate()
            .map(|(i, comp)| {
                let mesh = meshes
                    .entry(comp.shape)
                    .or_insert_with(|| {
                        geometry_tickets.push(tracker.acquire(ResourceKind::Geometry));
                        Arc::new(MeshData::for_shape(comp.shape))
                    })
                    .clone();
                let material = if i == 0 { &primary } else { &secondary };
                SceneNode {
                    shape: comp.shape,
                    mesh,
                    material: Arc::clone(material),
                    translation: to_f32(comp.position),
                    rotation: Quaternion::from_euler_xyz(
                        comp.rotation.map(|r| if r.is_finite() { r } else { 0.0 }),
                    ),
                    scale: to_f32(comp.scale),
                }
            })
            .collect();

        Self {
            nodes,
            primary,
            secondary,
            lighting: Lighting::default(),
            camera: Camera::default(),
            orbit: Orbit::default(),
            fallback_colors,
            geometry_tickets,
            tracker: tracker.clone(),
        }
    }

    pub fn texture_slot(&self) -> TextureSlot {
        TextureSlot {
            material: Arc::downgrade(&self.primary),
            tracker: self.tracker.clone(),
        }
    }

    pub fn apply_texture(&self, texture: Texture) {
        self.texture_slot().apply(texture);
    }

    pub fn primary_texture(&self) -> Option<Arc<Texture>> {
        read(&self.primary).texture.clone()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometry_tickets.len()
    }

    /// Releases every geometry, material and texture this scene owns.
    pub fn dispose(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invention::Component;

    fn params(shapes: &[&str]) -> ModelParams {
        ModelParams {
            components: shapes
                .iter()
                .enumerate()
                .map(|(i, s)| Component {
                    shape: Shape::from_tag(s),
                    scale: [1.0, 2.0, 1.0],
                    position: [i as f64, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                })
                .collect(),
            primary_color: "#C0C0C0".into(),
            secondary_color: "#4A90E2".into(),
        }
    }

    fn texture() -> Texture {
        Texture {
            mime_type: "image/png".into(),
            bytes: vec![1, 2, 3],
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn test_first_component_gets_primary() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&["sphere", "cylinder", "cone"]), &tracker);
        assert!(Arc::ptr_eq(&scene.nodes[0].material, &scene.primary));
        assert!(Arc::ptr_eq(&scene.nodes[1].material, &scene.secondary));
        assert!(Arc::ptr_eq(&scene.nodes[2].material, &scene.secondary));

        let primary = read(&scene.primary);
        assert_eq!(primary.roughness, 0.5);
        assert_eq!(primary.metalness, 0.7);
        assert_eq!(primary.base_color.to_hex(), "#c0c0c0");
        let secondary = read(&scene.secondary);
        assert_eq!(secondary.roughness, 0.6);
        assert_eq!(secondary.metalness, 0.3);
    }

    #[test]
    fn test_unknown_shape_builds_box() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&["torus"]), &tracker);
        assert_eq!(scene.nodes[0].shape, Shape::Box);
        assert_eq!(scene.nodes[0].mesh.vertex_count(), 24);
    }

    #[test]
    fn test_bad_color_falls_back_to_grey() {
        let tracker = ResourceTracker::new();
        let mut p = params(&["box"]);
        p.primary_color = "chartreuse-ish".into();
        let scene = SceneGraph::build(&p, &tracker);
        assert_eq!(read(&scene.primary).base_color.to_hex(), "#888888");
        assert_eq!(scene.fallback_colors, vec!["chartreuse-ish".to_string()]);
    }

    #[test]
    fn test_transforms_carried_onto_nodes() {
        let tracker = ResourceTracker::new();
        let mut p = params(&["box"]);
        p.components[0].rotation = [0.0, std::f64::consts::FRAC_PI_2, 0.0];
        p.components[0].position = [1.0, -2.0, 3.5];
        let scene = SceneGraph::build(&p, &tracker);
        let node = &scene.nodes[0];
        assert_eq!(node.translation, [1.0, -2.0, 3.5]);
        assert_eq!(node.scale, [1.0, 2.0, 1.0]);
        assert_eq!(
            node.rotation,
            Quaternion::from_axis_angle([0.0, 1.0, 0.0], std::f64::consts::FRAC_PI_2)
        );
    }

    #[test]
    fn test_meshes_shared_per_shape() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&["box", "box", "sphere"]), &tracker);
        assert!(Arc::ptr_eq(&scene.nodes[0].mesh, &scene.nodes[1].mesh));
        assert_eq!(scene.geometry_count(), 2);
        assert_eq!(tracker.live(ResourceKind::Geometry), 2);
        assert_eq!(tracker.live(ResourceKind::Material), 2);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&["box", "cone"]), &tracker);
        scene.apply_texture(texture());
        assert_eq!(tracker.live(ResourceKind::Texture), 1);
        assert!(tracker.total_live() > 0);
        scene.dispose();
        assert_eq!(tracker.total_live(), 0);
    }

    #[test]
    fn test_texture_mutates_shared_primary() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&["box", "box"]), &tracker);
        let slot = scene.texture_slot();
        assert!(slot.apply(texture()));
        let from_node = read(&scene.nodes[0].material).texture.clone();
        assert_eq!(from_node.as_deref(), Some(&texture()));
        assert!(read(&scene.secondary).texture.is_none());
    }

    #[test]
    fn test_late_texture_dropped_after_dispose() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&["box"]), &tracker);
        let slot = scene.texture_slot();
        scene.dispose();
        assert!(!slot.apply(texture()));
        assert_eq!(tracker.total_live(), 0);
    }

    #[test]
    fn test_empty_components_still_builds() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&[]), &tracker);
        assert!(scene.nodes.is_empty());
        assert_eq!(tracker.live(ResourceKind::Geometry), 0);
    }

    #[test]
    fn test_camera_resize_ignores_zero() {
        let mut cam = Camera::default();
        cam.resize(800, 400);
        assert_eq!(cam.aspect, 2.0);
        cam.resize(0, 400);
        assert_eq!(cam.aspect, 2.0);
    }
}
