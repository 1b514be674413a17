// SPDX-License-Identifier: CEPL-1.0
//! OBJ models and their textures, turned into engine-ready buffers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::Vec3;
use prism_render::{MeshData, PixelBuffer, Vertex};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| wanted.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => return Vec::new(),
    };
    entries.sort();
    entries
}

/// First `.obj` under `root`, depth first in name order.
pub fn find_model(root: &Path) -> Option<PathBuf> {
    let entries = sorted_entries(root);
    if let Some(obj) = entries
        .iter()
        .find(|p| p.is_file() && has_extension(p, &["obj"]))
    {
        return Some(obj.clone());
    }
    entries
        .iter()
        .filter(|p| p.is_dir())
        .find_map(|dir| find_model(dir))
}

/// First image file sitting next to the model.
pub fn sibling_image(model: &Path) -> Option<PathBuf> {
    let dir = model.parent()?;
    sorted_entries(dir)
        .into_iter()
        .find(|p| p.is_file() && has_extension(p, &IMAGE_EXTENSIONS))
}

/// Loads a model as one mesh per material. Faces with no material share a group.
pub fn load_model(path: &Path) -> Result<Vec<MeshData>> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, materials) =
        tobj::load_obj(path, &options).with_context(|| format!("load_obj {}", path.display()))?;
    let materials = materials.unwrap_or_else(|e| {
        warn!("materials for {} unavailable: {e}", path.display());
        Vec::new()
    });
    let base = path.parent().unwrap_or(Path::new(""));
    let meshes = group_by_material(&models, &materials, base);
    info!(
        "{}: {} objects, {} materials, {} mesh groups",
        path.display(),
        models.len(),
        materials.len(),
        meshes.len()
    );
    Ok(meshes)
}

fn group_by_material(
    models: &[tobj::Model],
    materials: &[tobj::Material],
    base: &Path,
) -> Vec<MeshData> {
    let mut groups: BTreeMap<Option<usize>, MeshData> = BTreeMap::new();

    for model in models {
        let mesh = &model.mesh;
        // tobj splits on `usemtl`, so every face of this mesh carries this id.
        let material = mesh.material_id.filter(|&id| id < materials.len());
        let group = groups.entry(material).or_default();
        let first = group.vertices.len() as u32;

        let vertex_count = mesh.positions.len() / 3;
        group.vertices.extend((0..vertex_count).map(|i| Vertex {
            position: [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ],
            normal: if mesh.normals.len() >= 3 * (i + 1) {
                [
                    mesh.normals[3 * i],
                    mesh.normals[3 * i + 1],
                    mesh.normals[3 * i + 2],
                ]
            } else {
                [0.0; 3]
            },
            uv: if mesh.texcoords.len() >= 2 * (i + 1) {
                // OBJ puts v = 0 at the bottom of the image
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            } else {
                [0.0; 2]
            },
        }));
        if mesh.normals.is_empty() {
            smooth_normals(&mut group.vertices[first as usize..], &mesh.indices);
        }
        group
            .indices
            .extend(mesh.indices.iter().map(|&i| first + i));
    }

    groups
        .into_iter()
        .filter(|(_, g)| !g.indices.is_empty())
        .map(|(material, mut group)| {
            group.texture_path = material
                .and_then(|id| materials[id].diffuse_texture.as_deref())
                .filter(|name| !name.is_empty())
                .map(|name| base.join(name));
            debug!(
                "group material={material:?}: {} vertices, {} indices, texture {:?}",
                group.vertices.len(),
                group.indices.len(),
                group.texture_path
            );
            group
        })
        .collect()
}

/// Area-weighted vertex normals for models that ship without any.
fn smooth_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let pa = Vec3::from_array(vertices[a].position);
        let pb = Vec3::from_array(vertices[b].position);
        let pc = Vec3::from_array(vertices[c].position);
        let n = (pb - pa).cross(pc - pa);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }
    for (v, n) in vertices.iter_mut().zip(acc) {
        v.normal = n.normalize_or(Vec3::Y).to_array();
    }
}

/// Decodes any supported image into tightly packed RGBA8.
pub fn load_texture(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)
        .with_context(|| format!("decode {}", path.display()))?
        .into_rgba8();
    let (width, height) = img.dimensions();
    let pixels = PixelBuffer::new(width, height, img.into_raw())?;
    info!("texture {} ({width}x{height})", path.display());
    Ok(pixels)
}

/// Picks the texture to bind: an explicit override, else the last material
/// texture that decodes, else the first image beside the model.
pub fn resolve_texture(
    explicit: Option<&Path>,
    meshes: &[MeshData],
    model: Option<&Path>,
) -> Option<PixelBuffer> {
    let candidates = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(meshes.iter().rev().filter_map(|m| m.texture_path.clone()));
    for path in candidates {
        match load_texture(&path) {
            Ok(pixels) => return Some(pixels),
            Err(e) => warn!("skipping texture: {e:#}"),
        }
    }
    let sibling = model.and_then(sibling_image)?;
    match load_texture(&sibling) {
        Ok(pixels) => Some(pixels),
        Err(e) => {
            warn!("skipping texture: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scratch(PathBuf);

    impl Scratch {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("prism-{name}-{}", std::process::id()));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn write(&self, name: &str, body: &str) -> PathBuf {
            let path = self.0.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, body).unwrap();
            path
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    const TWO_MATERIALS: &str = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl red
f 1/1/1 2/2/1 3/3/1
usemtl blue
f 1/1/1 3/3/1 4/4/1
usemtl red
f 2/2/1 3/3/1 4/4/1
";

    const MTL: &str = "\
newmtl red
Kd 1 0 0
map_Kd textures/red.png
newmtl blue
Kd 0 0 1
";

    #[test]
    fn faces_are_grouped_by_their_material() {
        let dir = Scratch::new("groups");
        dir.write("scene.mtl", MTL);
        let obj = dir.write("scene.obj", TWO_MATERIALS);

        let meshes = load_model(&obj).unwrap();
        assert_eq!(meshes.len(), 2);
        let red = meshes
            .iter()
            .find(|m| m.texture_path.is_some())
            .unwrap();
        let blue = meshes.iter().find(|m| m.texture_path.is_none()).unwrap();
        assert_eq!(red.indices.len(), 6);
        assert_eq!(blue.indices.len(), 3);
        assert_eq!(
            red.texture_path.as_deref(),
            Some(dir.0.join("textures/red.png").as_path())
        );
        for mesh in &meshes {
            mesh.validate().unwrap();
        }
    }

    #[test]
    fn v_coordinate_is_flipped() {
        let dir = Scratch::new("flip");
        let obj = dir.write(
            "tri.obj",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0.25\nvt 1 0.25\nvt 0 1\nf 1/1 2/2 3/3\n",
        );
        let meshes = load_model(&obj).unwrap();
        assert_eq!(meshes.len(), 1);
        let uvs: Vec<[f32; 2]> = meshes[0].vertices.iter().map(|v| v.uv).collect();
        assert!(uvs.contains(&[0.0, 0.75]));
        assert!(uvs.contains(&[0.0, 0.0]));
    }

    #[test]
    fn quads_are_triangulated_and_missing_normals_derived() {
        let dir = Scratch::new("quad");
        let obj = dir.write("quad.obj", "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        let meshes = load_model(&obj).unwrap();
        assert_eq!(meshes[0].indices.len(), 6);
        for v in &meshes[0].vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn missing_model_is_an_error() {
        assert!(load_model(Path::new("no/such/model.obj")).is_err());
    }

    #[test]
    fn first_obj_is_found_depth_first() {
        let dir = Scratch::new("find");
        dir.write("b/z.obj", "");
        dir.write("a/readme.txt", "");
        dir.write("a/m.obj", "");
        assert_eq!(find_model(&dir.0), Some(dir.0.join("a/m.obj")));
        assert_eq!(find_model(&dir.0.join("missing")), None);
    }

    #[test]
    fn texture_falls_back_to_sibling_image() {
        let dir = Scratch::new("sibling");
        let obj = dir.write("m.obj", "");
        dir.write("broken.png", "not a png");
        image::RgbaImage::from_pixel(2, 3, image::Rgba([9, 8, 7, 255]))
            .save(dir.0.join("good.png"))
            .unwrap();

        let meshes = vec![MeshData {
            texture_path: Some(dir.0.join("missing.png")),
            ..Default::default()
        }];
        // broken.png sorts first and is the sibling picked; it fails, so nothing binds
        assert!(resolve_texture(None, &meshes, Some(&obj)).is_none());

        fs::remove_file(dir.0.join("broken.png")).unwrap();
        let pixels = resolve_texture(None, &meshes, Some(&obj)).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (2, 3));
        assert_eq!(&pixels.bytes()[..4], &[9, 8, 7, 255]);
    }

    #[test]
    fn last_decodable_material_texture_wins() {
        let dir = Scratch::new("last");
        for (name, shade) in [("first.png", 10), ("second.png", 20)] {
            image::RgbaImage::from_pixel(1, 1, image::Rgba([shade, shade, shade, 255]))
                .save(dir.0.join(name))
                .unwrap();
        }
        let textured = |name: &str| MeshData {
            texture_path: Some(dir.0.join(name)),
            ..Default::default()
        };
        let meshes = vec![
            textured("first.png"),
            textured("second.png"),
            MeshData::default(),
            textured("missing.png"),
        ];
        let pixels = resolve_texture(None, &meshes, None).unwrap();
        assert_eq!(&pixels.bytes()[..4], &[20, 20, 20, 255]);
    }

    #[test]
    fn explicit_texture_wins() {
        let dir = Scratch::new("explicit");
        let chosen = dir.0.join("chosen.jpg");
        image::RgbImage::from_pixel(4, 4, image::Rgb([200, 200, 200]))
            .save(&chosen)
            .unwrap();
        image::RgbaImage::new(1, 1)
            .save(dir.0.join("material.png"))
            .unwrap();
        let meshes = vec![MeshData {
            texture_path: Some(dir.0.join("material.png")),
            ..Default::default()
        }];
        let pixels = resolve_texture(Some(&chosen), &meshes, None).unwrap();
        assert_eq!(pixels.width(), 4);
        assert_eq!(pixels.bytes().len(), 4 * 4 * 4);
    }
}
