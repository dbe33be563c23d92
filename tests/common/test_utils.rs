#![allow(dead_code)]

use anyhow::bail;
use reflect_ngin::{
    camera::PerspectiveCamera,
    config::Tuning,
    data_structures::scene_graph::Layers,
    reflection::CubeCamera,
    render::{collect_draw_items, SceneRenderer},
    scene::{EnvironmentSlot, Scene},
};

/// One call the scene made into the renderer.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Capture {
        /// Environment published before this capture ran.
        environment: EnvironmentSlot,
        layers: Layers,
        drawn: Vec<String>,
        donut_rotation: Option<cgmath::Quaternion<f32>>,
    },
    Draw {
        environment: EnvironmentSlot,
        drawn: Vec<String>,
        background: Option<String>,
        env_map_intensity: f32,
    },
}

/// Records what a GPU renderer would have drawn, without a GPU.
#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub calls: Vec<Call>,
    /// Number of upcoming captures that fail.
    pub failing_captures: u32,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_captures(count: u32) -> Self {
        Self {
            failing_captures: count,
            ..Self::default()
        }
    }

    pub fn captures(&self) -> impl Iterator<Item = &Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Capture { .. }))
    }

    pub fn draws(&self) -> impl Iterator<Item = &Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Draw { .. }))
    }
}

fn drawn(scene: &Scene, layers: Layers) -> Vec<String> {
    collect_draw_items(&scene.graph, layers)
        .iter()
        .filter_map(|item| scene.graph.get(item.node))
        .map(|node| node.name.clone())
        .collect()
}

impl SceneRenderer for RecordingRenderer {
    fn render_cube(
        &mut self,
        scene: &Scene,
        rig: &CubeCamera,
        _: &Tuning,
    ) -> anyhow::Result<()> {
        if self.failing_captures > 0 {
            self.failing_captures -= 1;
            bail!("capture failed");
        }
        let donut_rotation = scene
            .graph
            .find_by_name("holy donut")
            .and_then(|id| scene.graph.get(id))
            .map(|node| node.transform.rotation);
        self.calls.push(Call::Capture {
            environment: scene.environment,
            layers: rig.layers,
            drawn: drawn(scene, rig.layers),
            donut_rotation,
        });
        Ok(())
    }

    fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
        _: &Tuning,
    ) -> anyhow::Result<()> {
        let env_map_intensity = collect_draw_items(&scene.graph, camera.layers)
            .iter()
            .find(|item| item.mesh.material.is_physically_lit())
            .map(|item| item.mesh.material.env_map_intensity)
            .unwrap_or(f32::NAN);
        self.calls.push(Call::Draw {
            environment: scene.environment,
            drawn: drawn(scene, camera.layers),
            background: scene.background.as_ref().map(|texture| texture.label.clone()),
            env_map_intensity,
        });
        Ok(())
    }
}

pub(crate) struct GlbOptions {
    pub with_normals: bool,
    pub draco: bool,
}

impl Default for GlbOptions {
    fn default() -> Self {
        Self {
            with_normals: true,
            draco: false,
        }
    }
}

/// A GLB holding one node named "triangle" with a single lit triangle.
pub(crate) fn triangle_glb(options: GlbOptions) -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let normals: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bin = Vec::new();
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&normals));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    let byte_length = bin.len();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let attributes = if options.with_normals {
        r#"{"POSITION":0,"NORMAL":1}"#
    } else {
        r#"{"POSITION":0}"#
    };
    let extensions = if options.draco {
        r#""extensionsUsed":["KHR_draco_mesh_compression"],"extensionsRequired":["KHR_draco_mesh_compression"],"#
    } else {
        ""
    };
    let json = format!(
        r#"{{"asset":{{"version":"2.0"}},{extensions}"scene":0,"scenes":[{{"nodes":[0]}}],"nodes":[{{"name":"triangle","mesh":0}}],"meshes":[{{"name":"tri","primitives":[{{"attributes":{attributes},"indices":2,"material":0}}]}}],"materials":[{{"name":"floor","pbrMetallicRoughness":{{"baseColorFactor":[1.0,0.5,0.25,1.0],"metallicFactor":0.25,"roughnessFactor":0.75}}}}],"buffers":[{{"byteLength":{byte_length}}}],"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":36}},{{"buffer":0,"byteOffset":72,"byteLength":6}}],"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}},{{"bufferView":1,"componentType":5126,"count":3,"type":"VEC3"}},{{"bufferView":2,"componentType":5123,"count":3,"type":"SCALAR"}}]}}"#
    );
    let mut json = json.into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}
