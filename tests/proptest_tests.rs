//! Property-based tests for collada-loader
//!
//! These tests generate documents with proptest and check that loading
//! them holds up across layouts the hand-written tests do not cover.

mod common;

use common::{document, float_source, load, triangle_geometry};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

/// Whitespace XML allows between list values
fn separator_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![" ", "  ", "\n", "\t", "\r\n", " \n\t "])
}

/// Coordinates with their separators
fn coordinates_strategy() -> impl Strategy<Value = Vec<(f64, &'static str)>> {
    (1usize..40).prop_flat_map(|vertices| {
        prop::collection::vec((-1.0e6f64..1.0e6, separator_strategy()), vertices * 3)
    })
}

/// Face sizes of a polylist
fn face_sizes_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(3u32..8, 1..30)
}

fn geometry_with_positions(coordinates: &[(f64, &str)]) -> String {
    let mut text = String::new();
    for (value, separator) in coordinates {
        text.push_str(separator);
        text.push_str(&value.to_string());
    }
    text.push_str(coordinates.last().map_or(" ", |(_, s)| *s));
    let vertices = coordinates.len() / 3;
    document(&format!(
        r##"<library_geometries>
  <geometry id="cloud">
    <mesh>
      <source id="cloud-pos">
        <float_array id="cloud-pos-array" count="{count}">{text}</float_array>
        <technique_common>
          <accessor source="#cloud-pos-array" count="{vertices}" stride="3">
            <param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/>
          </accessor>
        </technique_common>
      </source>
      <vertices id="cloud-verts"><input semantic="POSITION" source="#cloud-pos"/></vertices>
    </mesh>
  </geometry>
</library_geometries>"##,
        count = coordinates.len(),
        text = text,
        vertices = vertices,
    ))
}

fn polylist_geometry(sizes: &[u32]) -> String {
    let corners: u32 = sizes.iter().sum();
    let indices: Vec<String> = (0..corners).map(|i| (i % 4).to_string()).collect();
    let vcount: Vec<String> = sizes.iter().map(u32::to_string).collect();
    document(&format!(
        r##"<library_geometries>
  <geometry id="poly">
    <mesh>
      {positions}
      <vertices id="poly-verts"><input semantic="POSITION" source="#poly-pos"/></vertices>
      <polylist count="{faces}">
        <input semantic="VERTEX" source="#poly-verts" offset="0"/>
        <vcount>{vcount}</vcount>
        <p>{p}</p>
      </polylist>
    </mesh>
  </geometry>
</library_geometries>"##,
        positions = float_source("poly-pos", &[0.0; 12], 3),
        faces = sizes.len(),
        vcount = vcount.join(" "),
        p = indices.join(" "),
    ))
}

/// The libraries of a small scene, to be shuffled
fn scene_libraries() -> Vec<String> {
    vec![
        format!(
            "<library_geometries>{}</library_geometries>",
            triangle_geometry("tri", "skin")
        ),
        r##"<library_effects>
  <effect id="fx">
    <profile_COMMON>
      <technique sid="common"><constant/></technique>
    </profile_COMMON>
  </effect>
</library_effects>"##
            .to_string(),
        r##"<library_materials>
  <material id="mat"><instance_effect url="#fx"/></material>
</library_materials>"##
            .to_string(),
        r##"<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n">
      <instance_geometry url="#tri">
        <bind_material>
          <technique_common><instance_material symbol="skin" target="#mat"/></technique_common>
        </bind_material>
      </instance_geometry>
    </node>
  </visual_scene>
</library_visual_scenes>"##
            .to_string(),
    ]
}

// ============================================================================
// Property-based tests
// ============================================================================

proptest! {
    /// Float lists parse the same whatever whitespace separates the values
    #[test]
    fn test_float_array_whitespace(coordinates in coordinates_strategy()) {
        let loaded = load(&geometry_with_positions(&coordinates));
        prop_assert!(loaded.ok);
        prop_assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

        let mesh = loaded.document.geometries[0].mesh.as_ref().unwrap();
        let expected: Vec<f64> = coordinates.iter().map(|(v, _)| *v).collect();
        prop_assert_eq!(&mesh.positions.values, &expected);
        prop_assert_eq!(mesh.positions.len(), coordinates.len() / 3);
    }

    /// Polylist face sizes come through unchanged, and a second load of the
    /// same document hands out the same ids
    #[test]
    fn test_polylist_reload(sizes in face_sizes_strategy()) {
        let xml = polylist_geometry(&sizes);
        let first = load(&xml);
        let second = load(&xml);
        prop_assert!(first.ok && second.ok);
        prop_assert!(first.errors.errors().is_empty(), "{:?}", first.errors.errors());

        let mesh = first.document.geometries[0].mesh.as_ref().unwrap();
        prop_assert_eq!(&mesh.primitives[0].face_vertex_counts, &sizes);
        prop_assert_eq!(mesh.face_count(), sizes.len());
        let corners: u32 = sizes.iter().sum();
        prop_assert_eq!(mesh.primitives[0].position_indices.len(), corners as usize);

        prop_assert_eq!(&first.document.geometries, &second.document.geometries);
    }

    /// Library order does not change what gets bound
    #[test]
    fn test_library_order_independent(
        order in Just((0..4usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let libraries = scene_libraries();
        let body: Vec<&str> = order.iter().map(|&i| libraries[i].as_str()).collect();
        let loaded = load(&document(&body.join("\n")));
        prop_assert!(loaded.ok);
        prop_assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

        let document = &loaded.document;
        prop_assert_eq!(document.geometries.len(), 1);
        prop_assert_eq!(document.materials.len(), 1);
        prop_assert_eq!(document.materials[0].instantiated_effect, document.effects[0].unique_id);

        let instance = &document.visual_scenes[0].root_nodes[0].instance_geometries[0];
        prop_assert_eq!(instance.geometry, document.geometries[0].unique_id);
        let primitive = &document.geometries[0].mesh.as_ref().unwrap().primitives[0];
        prop_assert_eq!(instance.material_bindings[0].material_id, Some(primitive.material_id));
    }
}
