//! Binary glTF 2.0 export of a [`SceneGraph`].
//!
//! Layout: 12-byte header, a JSON chunk padded with spaces, then a BIN chunk
//! padded with zeros. Meshes are written once per (geometry, material) pair
//! and every component becomes a child node of a single root group.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::geometry::MeshData;
use crate::scene::{self, MaterialRef, SceneGraph};

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const TRIANGLES: u32 = 4;
const REPEAT: u32 = 10497;
const LINEAR: u32 = 9729;
const LINEAR_MIPMAP_LINEAR: u32 = 9987;

pub const ROOT_NODE_NAME: &str = "Stellar Forge Invention";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Gltf {
    asset: Asset,
    scene: usize,
    scenes: Vec<GltfScene>,
    nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meshes: Vec<Mesh>,
    materials: Vec<GltfMaterial>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<Accessor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffers: Vec<Buffer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    textures: Vec<GltfTexture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<Image>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samplers: Vec<Sampler>,
}

#[derive(Serialize)]
struct Asset {
    version: &'static str,
    generator: &'static str,
}

#[derive(Serialize)]
struct GltfScene {
    nodes: Vec<usize>,
}

#[derive(Serialize, Default)]
struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mesh: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<[f32; 3]>,
}

#[derive(Serialize)]
struct Mesh {
    primitives: Vec<Primitive>,
}

#[derive(Serialize)]
struct Primitive {
    attributes: Attributes,
    indices: usize,
    material: usize,
    mode: u32,
}

#[derive(Serialize, Clone, Copy)]
struct Attributes {
    #[serde(rename = "POSITION")]
    position: usize,
    #[serde(rename = "NORMAL")]
    normal: usize,
    #[serde(rename = "TEXCOORD_0")]
    texcoord: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GltfMaterial {
    name: &'static str,
    pbr_metallic_roughness: Pbr,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pbr {
    base_color_factor: [f32; 4],
    metallic_factor: f32,
    roughness_factor: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_color_texture: Option<TextureInfo>,
}

#[derive(Serialize)]
struct TextureInfo {
    index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<[f32; 3]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    buffer: usize,
    byte_offset: usize,
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Buffer {
    byte_length: usize,
}

#[derive(Serialize)]
struct GltfTexture {
    sampler: usize,
    source: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    buffer_view: usize,
    mime_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sampler {
    mag_filter: u32,
    min_filter: u32,
    wrap_s: u32,
    wrap_t: u32,
}

/// Accumulates the BIN chunk and the views/accessors that index into it.
#[derive(Default)]
struct BinWriter {
    bytes: Vec<u8>,
    views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl BinWriter {
    fn view(&mut self, data: &[u8], target: Option<u32>) -> usize {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
        self.views.push(BufferView {
            buffer: 0,
            byte_offset: self.bytes.len(),
            byte_length: data.len(),
            target,
        });
        self.bytes.extend_from_slice(data);
        self.views.len() - 1
    }

    fn vec3(&mut self, data: &[[f32; 3]], bounds: Option<([f32; 3], [f32; 3])>) -> usize {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.view(&bytes, Some(ARRAY_BUFFER));
        let (min, max) = bounds.unzip();
        self.accessor(view, FLOAT, data.len(), "VEC3", min, max)
    }

    fn vec2(&mut self, data: &[[f32; 2]]) -> usize {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.view(&bytes, Some(ARRAY_BUFFER));
        self.accessor(view, FLOAT, data.len(), "VEC2", None, None)
    }

    fn indices(&mut self, data: &[u32]) -> usize {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.view(&bytes, Some(ELEMENT_ARRAY_BUFFER));
        self.accessor(view, UNSIGNED_INT, data.len(), "SCALAR", None, None)
    }

    fn accessor(
        &mut self,
        buffer_view: usize,
        component_type: u32,
        count: usize,
        kind: &'static str,
        min: Option<[f32; 3]>,
        max: Option<[f32; 3]>,
    ) -> usize {
        self.accessors.push(Accessor {
            buffer_view,
            component_type,
            count,
            kind,
            min,
            max,
        });
        self.accessors.len() - 1
    }
}

fn material_entry(material: &MaterialRef, texture: Option<usize>) -> GltfMaterial {
    let m = scene::read(material);
    let [r, g, b] = m.base_color.to_linear();
    GltfMaterial {
        name: m.name,
        pbr_metallic_roughness: Pbr {
            base_color_factor: [r, g, b, 1.0],
            metallic_factor: m.metalness,
            roughness_factor: m.roughness,
            base_color_texture: texture.map(|index| TextureInfo { index }),
        },
    }
}

/// Serialize the scene group to a `.glb` byte buffer.
pub fn export_glb(scene: &SceneGraph) -> Result<Vec<u8>, serde_json::Error> {
    let mut bin = BinWriter::default();
    let mut textures = Vec::new();
    let mut images = Vec::new();
    let mut samplers = Vec::new();

    let texture = scene.primary_texture();
    let texture_index = texture.as_ref().map(|tex| {
        let view = bin.view(&tex.bytes, None);
        images.push(Image {
            buffer_view: view,
            mime_type: tex.mime_type.clone(),
        });
        samplers.push(Sampler {
            mag_filter: LINEAR,
            min_filter: LINEAR_MIPMAP_LINEAR,
            wrap_s: REPEAT,
            wrap_t: REPEAT,
        });
        textures.push(GltfTexture {
            sampler: 0,
            source: 0,
        });
        0
    });
    let materials = vec![
        material_entry(&scene.primary, texture_index),
        material_entry(&scene.secondary, None),
    ];

    let mut attributes: HashMap<*const MeshData, (Attributes, usize)> = HashMap::new();
    let mut mesh_ids: HashMap<(*const MeshData, usize), usize> = HashMap::new();
    let mut meshes = Vec::new();
    let mut nodes = vec![Node {
        name: Some(ROOT_NODE_NAME.to_string()),
        ..Node::default()
    }];

    for (i, node) in scene.nodes.iter().enumerate() {
        let key = Arc::as_ptr(&node.mesh);
        let (attrs, indices) = *attributes.entry(key).or_insert_with(|| {
            let attrs = Attributes {
                position: bin.vec3(&node.mesh.positions, Some(node.mesh.bounds())),
                normal: bin.vec3(&node.mesh.normals, None),
                texcoord: bin.vec2(&node.mesh.uvs),
            };
            (attrs, bin.indices(&node.mesh.indices))
        });
        let material = if Arc::ptr_eq(&node.material, &scene.primary) {
            0
        } else {
            1
        };
        let mesh = *mesh_ids.entry((key, material)).or_insert_with(|| {
            meshes.push(Mesh {
                primitives: vec![Primitive {
                    attributes: attrs,
                    indices,
                    material,
                    mode: TRIANGLES,
                }],
            });
            meshes.len() - 1
        });

        nodes.push(Node {
            name: Some(format!("{}_{i}", node.shape.as_str())),
            mesh: Some(mesh),
            translation: Some(node.translation),
            rotation: Some(node.rotation.to_xyzw()),
            scale: Some(node.scale),
            ..Node::default()
        });
    }
    nodes[0].children = (1..nodes.len()).collect();

    while bin.bytes.len() % 4 != 0 {
        bin.bytes.push(0);
    }
    let buffers = if bin.bytes.is_empty() {
        Vec::new()
    } else {
        vec![Buffer {
            byte_length: bin.bytes.len(),
        }]
    };

    let gltf = Gltf {
        asset: Asset {
            version: "2.0",
            generator: "stellar-forge",
        },
        scene: 0,
        scenes: vec![GltfScene { nodes: vec![0] }],
        nodes,
        meshes,
        materials,
        accessors: bin.accessors,
        buffer_views: bin.views,
        buffers,
        textures,
        images,
        samplers,
    };

    let mut json = serde_json::to_vec(&gltf)?;
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let has_bin = !bin.bytes.is_empty();
    let total = 12 + 8 + json.len() + if has_bin { 8 + bin.bytes.len() } else { 0 };
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    if has_bin {
        out.extend_from_slice(&(bin.bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin.bytes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invention::{Component, ModelParams, Shape};
    use crate::scene::{ResourceTracker, Texture};
    use serde_json::Value;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    /// Returns the JSON document and the BIN chunk.
    fn split(glb: &[u8]) -> (Value, &[u8]) {
        assert_eq!(u32_at(glb, 0), GLB_MAGIC);
        assert_eq!(u32_at(glb, 4), 2);
        assert_eq!(u32_at(glb, 8) as usize, glb.len());
        let json_len = u32_at(glb, 12) as usize;
        assert_eq!(u32_at(glb, 16), CHUNK_JSON);
        assert_eq!(json_len % 4, 0);
        let json: Value = serde_json::from_slice(&glb[20..20 + json_len]).unwrap();
        let rest = &glb[20 + json_len..];
        if rest.is_empty() {
            return (json, rest);
        }
        let bin_len = u32_at(rest, 0) as usize;
        assert_eq!(u32_at(rest, 4), CHUNK_BIN);
        assert_eq!(bin_len % 4, 0);
        (json, &rest[8..8 + bin_len])
    }

    fn params(shapes: &[Shape]) -> ModelParams {
        ModelParams {
            components: shapes
                .iter()
                .map(|&shape| Component {
                    shape,
                    scale: [1.0, 1.0, 1.0],
                    position: [0.0, 1.0, 0.0],
                    rotation: [0.0, 0.0, 0.0],
                })
                .collect(),
            primary_color: "#ffffff".into(),
            secondary_color: "#000000".into(),
        }
    }

    #[test]
    fn test_header_and_chunks() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&[Shape::Box, Shape::Sphere]), &tracker);
        let glb = export_glb(&scene).unwrap();
        let (json, bin) = split(&glb);
        assert_eq!(json["asset"]["version"], "2.0");
        assert_eq!(json["buffers"][0]["byteLength"].as_u64().unwrap() as usize, bin.len());
    }

    #[test]
    fn test_nodes_hang_off_one_root() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(
            &params(&[Shape::Cylinder, Shape::Cone, Shape::Cone]),
            &tracker,
        );
        let glb = export_glb(&scene).unwrap();
        let (json, _) = split(&glb);
        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0]["name"], ROOT_NODE_NAME);
        assert_eq!(nodes[0]["children"], serde_json::json!([1, 2, 3]));
        assert_eq!(nodes[1]["translation"], serde_json::json!([0.0, 1.0, 0.0]));
        assert_eq!(nodes[1]["rotation"], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
        // Two cones on the secondary material share one mesh.
        assert_eq!(nodes[2]["mesh"], nodes[3]["mesh"]);
        assert_ne!(nodes[1]["mesh"], nodes[2]["mesh"]);
        assert_eq!(json["meshes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_materials_carry_pbr_factors() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&[Shape::Box]), &tracker);
        let glb = export_glb(&scene).unwrap();
        let (json, _) = split(&glb);
        let primary = &json["materials"][0]["pbrMetallicRoughness"];
        assert_eq!(primary["baseColorFactor"], serde_json::json!([1.0, 1.0, 1.0, 1.0]));
        assert!((primary["metallicFactor"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((primary["roughnessFactor"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!(primary.get("baseColorTexture").is_none());
        let secondary = &json["materials"][1]["pbrMetallicRoughness"];
        assert!((secondary["metallicFactor"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_position_accessor_has_bounds() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&[Shape::Box]), &tracker);
        let glb = export_glb(&scene).unwrap();
        let (json, bin) = split(&glb);
        let prim = &json["meshes"][0]["primitives"][0];
        let pos = &json["accessors"][prim["attributes"]["POSITION"].as_u64().unwrap() as usize];
        assert_eq!(pos["count"], 24);
        assert_eq!(pos["componentType"], FLOAT);
        assert_eq!(pos["min"], serde_json::json!([-0.5, -0.5, -0.5]));
        let idx = &json["accessors"][prim["indices"].as_u64().unwrap() as usize];
        assert_eq!(idx["componentType"], UNSIGNED_INT);
        assert_eq!(idx["count"], 36);

        let view = &json["bufferViews"][idx["bufferView"].as_u64().unwrap() as usize];
        let offset = view["byteOffset"].as_u64().unwrap() as usize;
        let first: Vec<u32> = (0..3).map(|k| u32_at(bin, offset + k * 4)).collect();
        assert_eq!(first, vec![0, 1, 2]);
    }

    #[test]
    fn test_texture_embedded_when_present() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&[Shape::Box, Shape::Box]), &tracker);
        scene.apply_texture(Texture {
            mime_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G', 1],
            width: 1,
            height: 1,
        });
        let glb = export_glb(&scene).unwrap();
        let (json, bin) = split(&glb);
        assert_eq!(json["images"][0]["mimeType"], "image/png");
        assert_eq!(json["samplers"][0]["wrapS"], REPEAT);
        assert_eq!(
            json["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"]["index"],
            0
        );
        let view = &json["bufferViews"][json["images"][0]["bufferView"].as_u64().unwrap() as usize];
        let offset = view["byteOffset"].as_u64().unwrap() as usize;
        assert_eq!(&bin[offset..offset + 4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_empty_scene_has_no_bin_chunk() {
        let tracker = ResourceTracker::new();
        let scene = SceneGraph::build(&params(&[]), &tracker);
        let glb = export_glb(&scene).unwrap();
        let (json, bin) = split(&glb);
        assert!(bin.is_empty());
        assert!(json.get("buffers").is_none());
        assert_eq!(json["nodes"].as_array().unwrap().len(), 1);
    }
}
