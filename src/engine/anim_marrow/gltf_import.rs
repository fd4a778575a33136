use std::collections::BTreeMap;
use std::path::Path;
use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::Interpolation;
use nab_marrow::timing::FTicks;
use crate::{Keyframe, LoadError, SceneAsset, SourceBone, SourceChannel, SourceClip, SourceMesh, SourceNode, SourceVertexWeight};

/// Name given to the node that parents all of a glTF scene's root nodes
pub const GLTF_SCENE_ROOT: &str = "__scene_root";

fn import_error(err: gltf::Error) -> LoadError { LoadError::Import(Box::new(err)) }

fn node_name(node: &gltf::Node) -> String
{
    node.name().map(|n| n.to_string()).unwrap_or_else(|| format!("node_{}", node.index()))
}

fn read_node(node: gltf::Node) -> SourceNode
{
    let mut source = SourceNode::new(node_name(&node), Mat4::from_cols_array_2d(&node.transform().matrix()));
    source.children = node.children().map(read_node).collect();
    source
}

// cubic spline outputs are (in tangent, value, out tangent) triples
fn spline_values<T>(values: impl Iterator<Item = T>, interpolation: Interpolation) -> Vec<T>
{
    match interpolation
    {
        Interpolation::CubicSpline => values.skip(1).step_by(3).collect(),
        Interpolation::Linear | Interpolation::Step => values.collect(),
    }
}

impl SceneAsset
{
    pub fn from_gltf_path(path: impl AsRef<Path>) -> Result<Self, LoadError>
    {
        let path = path.as_ref();
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(import_error)?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob).map_err(import_error)?;
        let scene = Self::from_gltf_document(&document, &buffers);
        log::debug!("Imported {:?}: {} bones, {} meshes, {} clips", path, scene.bones.len(), scene.meshes.len(), scene.clips.len());
        Ok(scene)
    }

    /// Parse a .gltf (JSON with embedded or data URI buffers) or .glb file from memory
    pub fn from_gltf_slice(bytes: &[u8]) -> Result<Self, LoadError>
    {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(import_error)?;
        let buffers = gltf::import_buffers(&document, None, blob).map_err(import_error)?;
        Ok(Self::from_gltf_document(&document, &buffers))
    }

    pub fn from_gltf_document(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Self
    {
        let get_buffer = |b: gltf::Buffer| buffers.get(b.index()).map(|d| d.0.as_slice());

        let mut root = SourceNode::new(GLTF_SCENE_ROOT, Mat4::IDENTITY);
        if let Some(scene) = document.default_scene().or_else(|| document.scenes().next())
        {
            root.children = scene.nodes().map(read_node).collect();
        }

        let mut bones = Vec::new();
        for skin in document.skins()
        {
            let reader = skin.reader(get_buffer);
            let mut inverse_binds = reader.read_inverse_bind_matrices();
            for joint in skin.joints()
            {
                // no matrices means identity
                let inverse_offset = inverse_binds.as_mut()
                    .and_then(|ibms| ibms.next())
                    .map_or(Mat4::IDENTITY, |ibm| Mat4::from_cols_array_2d(&ibm));
                bones.push(SourceBone { name: node_name(&joint), inverse_offset });
            }
        }

        let mut meshes = Vec::new();
        for node in document.nodes()
        {
            let Some(mesh) = node.mesh() else { continue; };
            let joint_names: Vec<String> = node.skin().map(|s| s.joints().map(|j| node_name(&j)).collect()).unwrap_or_default();

            for primitive in mesh.primitives()
            {
                let vertex_count = primitive.get(&gltf::Semantic::Positions).map_or(0, |a| a.count() as u32);
                let reader = primitive.reader(get_buffer);

                let mut weights = Vec::new();
                if let (Some(joints), Some(joint_weights)) = (reader.read_joints(0), reader.read_weights(0))
                {
                    for (vertex_id, (joints, joint_weights)) in joints.into_u16().zip(joint_weights.into_f32()).enumerate()
                    {
                        for (joint, weight) in joints.into_iter().zip(joint_weights)
                        {
                            if weight == 0.0 { continue; }
                            let Some(bone_name) = joint_names.get(joint as usize)
                            else
                            {
                                log::warn!("Vertex {vertex_id} of mesh '{}' references joint {joint}, which is not in its skin", mesh.name().unwrap_or_default());
                                continue;
                            };
                            weights.push(SourceVertexWeight { vertex_id: vertex_id as u32, bone_name: bone_name.clone(), weight });
                        }
                    }
                }

                meshes.push(SourceMesh { vertex_count, weights });
            }
        }

        let clips = document.animations().map(|anim| read_animation(anim, get_buffer)).collect();

        Self { root: Some(root), bones, meshes, clips }
    }
}

fn read_animation<'a, 's, F>(anim: gltf::Animation<'a>, get_buffer: F) -> SourceClip
    where F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>
{
    let name = anim.name().map(|n| n.to_string()).unwrap_or_else(|| format!("animation_{}", anim.index()));

    struct NodeTracks<'n>
    {
        node: gltf::Node<'n>,
        rotations: Vec<Keyframe<Quat>>,
        translations: Vec<Keyframe<Vec3>>,
    }
    let mut by_node = BTreeMap::new();

    for channel in anim.channels()
    {
        let node = channel.target().node();
        let interpolation = channel.sampler().interpolation();
        let reader = channel.reader(get_buffer.clone());
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else { continue; };
        let tracks = by_node.entry(node.index())
            .or_insert_with(|| NodeTracks { node: node.clone(), rotations: Vec::new(), translations: Vec::new() });

        // glTF times are in seconds, so one tick per second
        match outputs
        {
            ReadOutputs::Translations(translations) =>
            {
                tracks.translations = inputs.zip(spline_values(translations, interpolation))
                    .map(|(time, t)| Keyframe::new(FTicks(time), Vec3::from_array(t)))
                    .collect();
            }
            ReadOutputs::Rotations(rotations) =>
            {
                tracks.rotations = inputs.zip(spline_values(rotations.into_f32(), interpolation))
                    .map(|(time, r)| Keyframe::new(FTicks(time), Quat::from_array(r).normalize()))
                    .collect();
            }
            ReadOutputs::Scales(_) => {} // unsupported
            ReadOutputs::MorphTargetWeights(_) => {} // unsupported
        }
    }

    let channels = by_node.into_values()
        .filter(|tracks| !tracks.rotations.is_empty() || !tracks.translations.is_empty())
        .map(|mut tracks|
        {
            // an untouched property holds the node's rest value
            let (translation, rotation, _scale) = tracks.node.transform().decomposed();
            if tracks.rotations.is_empty()
            {
                tracks.rotations.push(Keyframe::new(FTicks(0.0), Quat::from_array(rotation)));
            }
            if tracks.translations.is_empty()
            {
                tracks.translations.push(Keyframe::new(FTicks(0.0), Vec3::from_array(translation)));
            }

            SourceChannel
            {
                bone_name: node_name(&tracks.node),
                rotation_keys: tracks.rotations,
                translation_keys: tracks.translations,
                ticks_per_second: 1.0,
            }
        })
        .collect();

    SourceClip { name, channels }
}

#[cfg(test)]
mod tests
{
    use std::f32::consts::FRAC_1_SQRT_2;
    use approx::assert_abs_diff_eq;
    use nab_marrow::timing::FSeconds;
    use crate::{AnimationConfig, SceneAssetProvider, SkinnedRig};
    use super::*;

    const JSON: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 2] }],
        "nodes": [
            { "name": "hips", "translation": [0, 1, 0], "children": [1] },
            { "name": "spine", "translation": [0, 1, 0] },
            { "name": "body", "mesh": 0, "skin": 0 }
        ],
        "skins": [{ "joints": [0, 1], "inverseBindMatrices": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 1, "JOINTS_0": 2, "WEIGHTS_0": 3 } }] }],
        "animations": [{
            "name": "nod",
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "rotation" } }],
            "samplers": [{ "input": 4, "output": 5 }]
        }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 2, "type": "MAT4" },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3", "min": [0, 0, 0], "max": [0, 2, 0] },
            { "bufferView": 2, "componentType": 5121, "count": 2, "type": "VEC4" },
            { "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC4" },
            { "bufferView": 4, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0], "max": [1] },
            { "bufferView": 5, "componentType": 5126, "count": 2, "type": "VEC4" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 128 },
            { "buffer": 0, "byteOffset": 128, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 152, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 160, "byteLength": 32 },
            { "buffer": 0, "byteOffset": 192, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 200, "byteLength": 32 }
        ],
        "buffers": [{ "byteLength": 232 }]
    }"#;

    fn binary_chunk() -> Vec<u8>
    {
        let mut floats = Vec::new();
        floats.extend(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)).to_cols_array());
        floats.extend(Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0)).to_cols_array());
        floats.extend([0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);

        let mut bytes: Vec<u8> = floats.iter().flat_map(|f| f.to_le_bytes()).collect();
        bytes.extend([0u8, 1, 0, 0, 1, 0, 0, 0]);
        let rest = [
            0.5, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, // weights
            0.0, 1.0, // times
            0.0, 0.0, 0.0, 1.0, FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2, // rotations
        ];
        bytes.extend(rest.iter().flat_map(|f: &f32| f.to_le_bytes()));
        assert_eq!(bytes.len(), 232);
        bytes
    }

    fn glb() -> Vec<u8>
    {
        let mut json = JSON.as_bytes().to_vec();
        while json.len() % 4 != 0 { json.push(b' '); }
        let bin = binary_chunk();

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend(b"glTF");
        glb.extend(2u32.to_le_bytes());
        glb.extend((total as u32).to_le_bytes());
        glb.extend((json.len() as u32).to_le_bytes());
        glb.extend(b"JSON");
        glb.extend(&json);
        glb.extend((bin.len() as u32).to_le_bytes());
        glb.extend(b"BIN\0");
        glb.extend(&bin);
        glb
    }

    #[test]
    fn import_scene()
    {
        let scene = SceneAsset::from_gltf_slice(&glb()).unwrap();

        let root = scene.root_node().unwrap();
        assert_eq!(root.name, GLTF_SCENE_ROOT);
        assert_eq!(root.children.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["hips", "body"]);
        assert_eq!(root.children[0].children[0].name, "spine");
        assert_abs_diff_eq!(root.children[0].transform, Mat4::from_translation(Vec3::Y));

        let bones = scene.bones();
        assert_eq!(bones.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(), vec!["hips", "spine"]);
        assert_eq!(bones[1].inverse_offset, Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0)));

        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.mesh_vertex_count(0), 2);
        let weights: Vec<_> = scene.vertex_bone_weights(0).into_iter().map(|w| (w.vertex_id, w.bone_name, w.weight)).collect();
        assert_eq!(weights, vec![(0, "hips".to_string(), 0.5), (0, "spine".to_string(), 0.5), (1, "spine".to_string(), 1.0)]);

        assert_eq!(scene.clip_names(), vec!["nod".to_string()]);
        let channels = scene.animation_channels("nod");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].bone_name, "spine");
        assert_eq!(channels[0].rotation_keys.len(), 2);
        assert_eq!(channels[0].translation_keys, vec![Keyframe::new(FTicks(0.0), Vec3::Y)]);
        assert_eq!(channels[0].ticks_per_second, 1.0);
    }

    #[test]
    fn imported_rig_poses()
    {
        let scene = SceneAsset::from_gltf_slice(&glb()).unwrap();
        let rig = SkinnedRig::load(&scene, &AnimationConfig::default()).unwrap();
        let mut poser = rig.poser();

        let pose = poser.evaluate("nod", FSeconds(0.0)).unwrap();
        assert_abs_diff_eq!(pose[0].matrix, Mat4::IDENTITY, epsilon = 1e-6);
        assert_abs_diff_eq!(pose[1].matrix, Mat4::IDENTITY, epsilon = 1e-6);

        let pose = poser.evaluate_clip_at(rig.clips().clip_index("nod").unwrap(), FTicks(1.0));
        let spine = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))
            * Mat4::from_quat(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2))
            * Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0));
        assert_abs_diff_eq!(pose[rig.registry().lookup("spine").unwrap().index()].matrix, spine, epsilon = 1e-5);
    }

    #[test]
    fn bad_input()
    {
        assert!(matches!(SceneAsset::from_gltf_slice(b"not a model"), Err(LoadError::Import(_))));
    }
}
