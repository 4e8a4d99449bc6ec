//! Shared helpers for the integration tests
//!
//! Builders for small COLLADA documents and a wrapper that loads a document
//! from memory into a [`DocumentCollector`].

#![allow(dead_code)]

use collada_loader::{DocumentCollector, ErrorCollector, Loader, LoaderConfig};
use url::Url;

/// Base URI of documents loaded from memory
pub const BASE_URI: &str = "file:///test/doc.dae";

/// Outcome of one load
pub struct Loaded {
    pub document: DocumentCollector,
    pub errors: ErrorCollector,
    pub ok: bool,
}

/// Load a document with the default configuration
pub fn load(xml: &str) -> Loaded {
    load_with(xml, LoaderConfig::new())
}

/// Load a document with a custom configuration
pub fn load_with(xml: &str, config: LoaderConfig) -> Loaded {
    let mut loader = Loader::new(config);
    let mut document = DocumentCollector::new();
    let mut errors = ErrorCollector::new();
    let base = Url::parse(BASE_URI).unwrap();
    let ok = loader.load_from_reader(
        std::io::Cursor::new(xml.as_bytes().to_vec()),
        &base,
        &mut document,
        &mut errors,
    );
    Loaded {
        document,
        errors,
        ok,
    }
}

/// Wrap library content in a `<COLLADA>` document
pub fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset><up_axis>Y_UP</up_axis></asset>
{}
</COLLADA>"#,
        body
    )
}

/// A float `<source>` with an accessor of the given stride
pub fn float_source(id: &str, values: &[f64], stride: usize) -> String {
    let text: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!(
        r##"<source id="{id}">
  <float_array id="{id}-array" count="{len}">{text}</float_array>
  <technique_common>
    <accessor source="#{id}-array" count="{count}" stride="{stride}">
      <param name="X" type="float"/>
    </accessor>
  </technique_common>
</source>"##,
        id = id,
        len = values.len(),
        text = text.join(" "),
        count = values.len() / stride.max(1),
        stride = stride,
    )
}

/// A `<Name_array>` source
pub fn name_source(id: &str, names: &[&str]) -> String {
    format!(
        r##"<source id="{id}">
  <Name_array id="{id}-array" count="{len}">{text}</Name_array>
  <technique_common>
    <accessor source="#{id}-array" count="{len}" stride="1">
      <param name="JOINT" type="name"/>
    </accessor>
  </technique_common>
</source>"##,
        id = id,
        len = names.len(),
        text = names.join(" "),
    )
}

/// A single triangle geometry whose primitive uses `material`
pub fn triangle_geometry(id: &str, material: &str) -> String {
    format!(
        r##"<geometry id="{id}">
  <mesh>
    {positions}
    <vertices id="{id}-verts"><input semantic="POSITION" source="#{id}-pos"/></vertices>
    <triangles count="1" material="{material}">
      <input semantic="VERTEX" source="#{id}-verts" offset="0"/>
      <p>0 1 2</p>
    </triangles>
  </mesh>
</geometry>"##,
        id = id,
        material = material,
        positions = float_source(
            &format!("{}-pos", id),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            3
        ),
    )
}

/// A skin over `geometry` with joints `hip` and `knee`
pub fn skin_controller(id: &str, geometry: &str) -> String {
    let mut bind = Vec::new();
    for _ in 0..2 {
        bind.extend_from_slice(&[
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ]);
    }
    format!(
        r##"<controller id="{id}">
  <skin source="#{geometry}">
    <bind_shape_matrix>1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1</bind_shape_matrix>
    {joints}
    {bind}
    {weights}
    <joints>
      <input semantic="JOINT" source="#{id}-joints"/>
      <input semantic="INV_BIND_MATRIX" source="#{id}-bind"/>
    </joints>
    <vertex_weights count="3">
      <input semantic="JOINT" source="#{id}-joints" offset="0"/>
      <input semantic="WEIGHT" source="#{id}-weights" offset="1"/>
      <vcount>1 1 1</vcount>
      <v>0 0 1 0 1 0</v>
    </vertex_weights>
  </skin>
</controller>"##,
        id = id,
        geometry = geometry,
        joints = name_source(&format!("{}-joints", id), &["hip", "knee"]),
        bind = float_source(&format!("{}-bind", id), &bind, 16),
        weights = float_source(&format!("{}-weights", id), &[1.0], 1),
    )
}

/// A skin like [`skin_controller`] whose joints are named by node id
pub fn id_skin_controller(id: &str, geometry: &str, joints: [&str; 2]) -> String {
    skin_controller(id, geometry).replace(
        &format!(r#"<Name_array id="{}-joints-array" count="2">hip knee</Name_array>"#, id),
        &format!(
            r#"<IDREF_array id="{}-joints-array" count="2">{} {}</IDREF_array>"#,
            id, joints[0], joints[1]
        ),
    )
}
