//! Integration tests for references across documents

mod common;

use collada_loader::{
    DocumentCollector, ErrorCode, ErrorCollector, Loader, LoaderConfig, Severity,
};
use collada_loader::model::Controller;
use common::{document, id_skin_controller, triangle_geometry};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn main_document(target: &str) -> String {
    document(&format!(
        r##"<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n"><instance_geometry url="{}"/></node>
  </visual_scene>
</library_visual_scenes>
<scene><instance_visual_scene url="#scene"/></scene>"##,
        target
    ))
}

fn load_file(path: &Path, config: LoaderConfig) -> (DocumentCollector, ErrorCollector, bool) {
    let mut loader = Loader::new(config);
    let mut document = DocumentCollector::new();
    let mut errors = ErrorCollector::new();
    let ok = loader.load_document(path, &mut document, &mut errors);
    (document, errors, ok)
}

#[test]
fn test_external_geometry_is_loaded() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(&main, main_document("parts.dae#tri")).unwrap();
    fs::write(
        dir.path().join("parts.dae"),
        document(&format!(
            "<library_geometries>{}</library_geometries>",
            triangle_geometry("tri", "mat")
        )),
    )
    .unwrap();

    let (document, errors, ok) = load_file(&main, LoaderConfig::new());
    assert!(ok);
    assert!(errors.errors().is_empty(), "{:?}", errors.errors());
    assert_eq!(document.geometries.len(), 1);

    let geometry = &document.geometries[0];
    let instance = &document.visual_scenes[0].root_nodes[0].instance_geometries[0];
    assert_eq!(instance.geometry, geometry.unique_id);
    // Objects carry the document they were defined in
    assert_ne!(geometry.unique_id.file_id, document.visual_scenes[0].unique_id.file_id);

    let scene = document.scene.as_ref().unwrap();
    assert_eq!(
        scene.instance_visual_scene,
        Some(document.visual_scenes[0].unique_id)
    );
}

#[test]
fn test_external_references_disabled() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(&main, main_document("parts.dae#tri")).unwrap();
    fs::write(
        dir.path().join("parts.dae"),
        document(&format!(
            "<library_geometries>{}</library_geometries>",
            triangle_geometry("tri", "mat")
        )),
    )
    .unwrap();

    let config = LoaderConfig::new().with_external_references(false);
    let (document, errors, ok) = load_file(&main, config);
    assert!(ok);
    assert!(errors.errors().is_empty(), "{:?}", errors.errors());
    assert!(document.geometries.is_empty());
    assert_eq!(document.visual_scenes.len(), 1);
}

#[test]
fn test_missing_external_document() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(&main, main_document("absent.dae#tri")).unwrap();

    let (document, errors, ok) = load_file(&main, LoaderConfig::new());
    assert!(ok);
    let reported = errors.errors();
    assert_eq!(reported.len(), 1, "{:?}", reported);
    assert_eq!(reported[0].code, ErrorCode::CouldNotOpenFile);
    assert_eq!(reported[0].severity, Severity::Error);
    assert!(reported[0].message.contains("absent.dae"));
    assert_eq!(document.visual_scenes.len(), 1);
    assert!(document.finished);
}

#[test]
fn test_missing_external_document_can_stop_load() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(&main, main_document("absent.dae#tri")).unwrap();

    let mut loader = Loader::default();
    let mut document = DocumentCollector::new();
    let mut handler = |error: &collada_loader::ParserError| error.severity == Severity::Warning;
    assert!(!loader.load_document(&main, &mut document, &mut handler));
    assert!(document.cancelled.is_some());
    assert!(document.visual_scenes.is_empty());
}

#[test]
fn test_document_referenced_twice_is_read_once() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(
        &main,
        document(
            r##"<library_visual_scenes>
  <visual_scene id="scene">
    <node id="a"><instance_geometry url="parts.dae#tri"/></node>
    <node id="b"><instance_geometry url="./parts.dae#quad"/></node>
  </visual_scene>
</library_visual_scenes>"##,
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("parts.dae"),
        document(&format!(
            "<library_geometries>{}{}</library_geometries>",
            triangle_geometry("tri", "mat"),
            triangle_geometry("quad", "mat")
        )),
    )
    .unwrap();

    let (document, errors, ok) = load_file(&main, LoaderConfig::new());
    assert!(ok);
    assert!(errors.errors().is_empty(), "{:?}", errors.errors());
    assert_eq!(document.geometries.len(), 2);
}

#[test]
fn test_reference_back_into_root_document() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(
        &main,
        document(&format!(
            r##"<library_geometries>{}</library_geometries>
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n"><instance_node url="nodes.dae#holder"/></node>
  </visual_scene>
</library_visual_scenes>"##,
            triangle_geometry("tri", "mat")
        )),
    )
    .unwrap();
    fs::write(
        dir.path().join("nodes.dae"),
        document(
            r##"<library_nodes>
  <node id="holder"><instance_geometry url="main.dae#tri"/></node>
</library_nodes>"##,
        ),
    )
    .unwrap();

    let (document, errors, ok) = load_file(&main, LoaderConfig::new());
    assert!(ok);
    assert!(errors.errors().is_empty(), "{:?}", errors.errors());
    assert_eq!(document.geometries.len(), 1);
    assert_eq!(document.library_nodes.len(), 1);

    let holder = &document.library_nodes[0].nodes[0];
    assert_eq!(holder.instance_geometries[0].geometry, document.geometries[0].unique_id);
    let instance = &document.visual_scenes[0].root_nodes[0].instance_nodes[0];
    assert_eq!(instance.target, holder.unique_id);
}

#[test]
fn test_id_joints_found_in_controller_document() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.dae");
    fs::write(
        &main,
        document(
            r##"<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n"><instance_controller url="rig.dae#skin"/></node>
  </visual_scene>
</library_visual_scenes>"##,
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("rig.dae"),
        document(&format!(
            r##"<library_geometries>{}</library_geometries>
<library_controllers>{}</library_controllers>
<library_nodes>
  <node id="hip-n" sid="hip" type="JOINT">
    <node id="knee-n" sid="knee" type="JOINT"/>
  </node>
</library_nodes>"##,
            triangle_geometry("tri", "mat"),
            id_skin_controller("skin", "tri", ["hip-n", "knee-n"])
        )),
    )
    .unwrap();

    let (document, errors, ok) = load_file(&main, LoaderConfig::new());
    assert!(ok);
    assert!(errors.errors().is_empty(), "{:?}", errors.errors());
    assert_eq!(document.controllers.len(), 1);
    let Controller::Skin(skin) = &document.controllers[0] else {
        panic!("expected a skin controller");
    };
    let hip = &document.library_nodes[0].nodes[0];
    assert_eq!(skin.joints, vec![hip.unique_id, hip.children[0].unique_id]);
    assert_eq!(
        document.visual_scenes[0].root_nodes[0].instance_controllers[0].controller,
        skin.unique_id
    );
}
