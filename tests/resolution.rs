//! Integration tests for deferred resolution
//!
//! Forward references, skin binding, animation lists and material symbols
//! are only complete after the post-pass; these tests check what the writer
//! sees once a load finished.

mod common;

use collada_loader::model::{AnimationClass, Controller};
use collada_loader::{ErrorCode, Severity};
use common::{
    document, float_source, id_skin_controller, load, skin_controller, triangle_geometry,
};

const RED_EFFECT: &str = r##"<library_effects>
  <effect id="red-fx">
    <profile_COMMON>
      <technique sid="common">
        <lambert><diffuse><color>1 0 0 1</color></diffuse></lambert>
      </technique>
    </profile_COMMON>
  </effect>
</library_effects>
<library_materials>
  <material id="red"><instance_effect url="#red-fx"/></material>
</library_materials>"##;

#[test]
fn test_forward_reference_to_geometry() {
    let xml = document(&format!(
        r##"<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n"><instance_geometry url="#tri"/></node>
  </visual_scene>
</library_visual_scenes>
<library_geometries>{}</library_geometries>"##,
        triangle_geometry("tri", "mat")
    ));
    let loaded = load(&xml);
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

    let geometry = &loaded.document.geometries[0];
    let node = &loaded.document.visual_scenes[0].root_nodes[0];
    assert_eq!(node.instance_geometries[0].geometry, geometry.unique_id);
}

#[test]
fn test_dangling_instance_reported_once() {
    let xml = document(
        r##"<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n"><instance_geometry url="#missing"/></node>
  </visual_scene>
</library_visual_scenes>"##,
    );
    let loaded = load(&xml);
    assert!(loaded.ok);

    let errors = loaded.errors.errors();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].code, ErrorCode::DanglingReference);
    assert_eq!(errors[0].severity, Severity::Error);
    assert!(errors[0].message.contains("missing"));
    // The report points at the instance, not the end of the document
    assert_eq!(errors[0].line(), 6);

    // The scene is still written
    assert_eq!(loaded.document.visual_scenes.len(), 1);
    assert!(loaded.document.finished);
}

#[test]
fn test_dropped_geometry_leaves_dangling_instance() {
    let geometry = triangle_geometry("tri", "mat").replace("<mesh>", "<mesh><bogus/>");
    let xml = document(&format!(
        r##"<library_geometries>{}</library_geometries>
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n"><instance_geometry url="#tri"/></node>
  </visual_scene>
</library_visual_scenes>"##,
        geometry
    ));
    let loaded = load(&xml);
    assert!(loaded.ok);
    assert!(loaded.document.geometries.is_empty());
    assert_eq!(loaded.errors.with_code(ErrorCode::UnexpectedElement).count(), 1);
    assert_eq!(loaded.errors.with_code(ErrorCode::DanglingReference).count(), 1);
}

#[test]
fn test_material_symbol_binding() {
    let xml = document(&format!(
        r##"<library_geometries>{geometry}</library_geometries>
{effects}
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n">
      <instance_geometry url="#tri">
        <bind_material>
          <technique_common>
            <instance_material symbol="skin" target="#red"/>
          </technique_common>
        </bind_material>
      </instance_geometry>
    </node>
  </visual_scene>
</library_visual_scenes>"##,
        geometry = triangle_geometry("tri", "skin"),
        effects = RED_EFFECT,
    ));
    let loaded = load(&xml);
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

    let primitive = &loaded.document.geometries[0].mesh.as_ref().unwrap().primitives[0];
    let instance = &loaded.document.visual_scenes[0].root_nodes[0].instance_geometries[0];
    assert_eq!(instance.material_bindings.len(), 1);

    let binding = &instance.material_bindings[0];
    assert_eq!(binding.symbol, "skin");
    assert_eq!(binding.material_id, Some(primitive.material_id));
    assert_eq!(binding.material, loaded.document.materials[0].unique_id);
}

#[test]
fn test_unused_material_symbol_stays_unbound() {
    let xml = document(&format!(
        r##"<library_geometries>{geometry}</library_geometries>
{effects}
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="n">
      <instance_geometry url="#tri">
        <bind_material>
          <technique_common>
            <instance_material symbol="other" target="#red"/>
          </technique_common>
        </bind_material>
      </instance_geometry>
    </node>
  </visual_scene>
</library_visual_scenes>"##,
        geometry = triangle_geometry("tri", "skin"),
        effects = RED_EFFECT,
    ));
    let loaded = load(&xml);
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());
    let instance = &loaded.document.visual_scenes[0].root_nodes[0].instance_geometries[0];
    assert_eq!(instance.material_bindings[0].material_id, None);
}

fn skinned_scene() -> String {
    document(&format!(
        r##"<library_geometries>{geometry}</library_geometries>
<library_controllers>{skin_a}{skin_b}</library_controllers>
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="hip" sid="hip" type="JOINT">
      <node id="knee" sid="knee" type="JOINT"/>
    </node>
    <node id="first">
      <instance_controller url="#skinA"><skeleton>#hip</skeleton></instance_controller>
    </node>
    <node id="second">
      <instance_controller url="#skinB"><skeleton>#hip</skeleton></instance_controller>
    </node>
  </visual_scene>
</library_visual_scenes>"##,
        geometry = triangle_geometry("tri", "mat"),
        skin_a = skin_controller("skinA", "tri"),
        skin_b = skin_controller("skinB", "tri"),
    ))
}

#[test]
fn test_identical_skins_share_one_controller() {
    let loaded = load(&skinned_scene());
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

    let document = &loaded.document;
    assert_eq!(document.skin_controller_data.len(), 2);
    assert_eq!(document.controllers.len(), 1);
    let Controller::Skin(skin) = &document.controllers[0] else {
        panic!("expected a skin controller");
    };
    assert_eq!(skin.source, document.geometries[0].unique_id);

    let nodes = &document.visual_scenes[0].root_nodes;
    let hip = &nodes[0];
    let knee = &hip.children[0];
    assert_eq!(skin.joints, vec![hip.unique_id, knee.unique_id]);

    let first = &nodes[1].instance_controllers[0];
    let second = &nodes[2].instance_controllers[0];
    assert_eq!(first.controller, skin.unique_id);
    assert_eq!(second.controller, skin.unique_id);
    assert_eq!(first.skeleton_roots, vec!["#hip".to_string()]);
}

#[test]
fn test_skin_data_fields() {
    let loaded = load(&skinned_scene());
    let data = &loaded.document.skin_controller_data[0];
    assert_eq!(data.original_id.as_deref(), Some("skinA"));
    assert_eq!(data.joint_names, vec!["hip".to_string(), "knee".to_string()]);
    assert_eq!(data.inverse_bind_matrices.len(), 2);
    assert_eq!(data.joints_per_vertex, vec![1, 1, 1]);
    assert_eq!(data.vertex_count(), 3);
}

#[test]
fn test_unknown_joint_is_dangling() {
    let xml = skinned_scene().replace(
        r#"<node id="knee" sid="knee" type="JOINT"/>"#,
        r#"<node id="shin" sid="shin" type="JOINT"/>"#,
    );
    let loaded = load(&xml);
    assert!(loaded.ok);
    assert!(loaded.document.controllers.is_empty());
    let dangling: Vec<_> = loaded.errors.with_code(ErrorCode::DanglingReference).collect();
    assert_eq!(dangling.len(), 2, "{:?}", dangling);
    assert!(dangling.iter().all(|e| e.message.contains("knee")));
}

/// One skin naming joints by sid, one by node id
fn mixed_joint_scene(skin_b: &str) -> String {
    document(&format!(
        r##"<library_geometries>{geometry}</library_geometries>
<library_controllers>{skin_a}{skin_b}</library_controllers>
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="hip-n" sid="hip" type="JOINT">
      <node id="knee-n" sid="knee" type="JOINT"/>
    </node>
    <node id="first">
      <instance_controller url="#skinA"><skeleton>#hip-n</skeleton></instance_controller>
    </node>
    <node id="second">
      <instance_controller url="#skinB"/>
    </node>
  </visual_scene>
</library_visual_scenes>"##,
        geometry = triangle_geometry("tri", "mat"),
        skin_a = skin_controller("skinA", "tri"),
        skin_b = skin_b,
    ))
}

#[test]
fn test_sid_and_id_joints_share_one_controller() {
    let loaded = load(&mixed_joint_scene(&id_skin_controller(
        "skinB",
        "tri",
        ["hip-n", "knee-n"],
    )));
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

    let document = &loaded.document;
    assert_eq!(document.skin_controller_data.len(), 2);
    assert_eq!(
        document.skin_controller_data[1].joint_names,
        vec!["hip-n".to_string(), "knee-n".to_string()]
    );
    assert_eq!(document.controllers.len(), 1);
    let Controller::Skin(skin) = &document.controllers[0] else {
        panic!("expected a skin controller");
    };
    let nodes = &document.visual_scenes[0].root_nodes;
    assert_eq!(skin.joints, vec![nodes[0].unique_id, nodes[0].children[0].unique_id]);
    assert_eq!(nodes[1].instance_controllers[0].controller, skin.unique_id);
    assert_eq!(nodes[2].instance_controllers[0].controller, skin.unique_id);
}

#[test]
fn test_different_influences_get_own_controller() {
    let skin_b = id_skin_controller("skinB", "tri", ["hip-n", "knee-n"])
        .replace("<v>0 0 1 0 1 0</v>", "<v>0 0 1 0 0 0</v>");
    let loaded = load(&mixed_joint_scene(&skin_b));
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());
    assert_eq!(loaded.document.controllers.len(), 2);

    let nodes = &loaded.document.visual_scenes[0].root_nodes;
    assert_ne!(
        nodes[1].instance_controllers[0].controller,
        nodes[2].instance_controllers[0].controller
    );
}

#[test]
fn test_unknown_id_joint_is_dangling() {
    let loaded = load(&mixed_joint_scene(&id_skin_controller(
        "skinB",
        "tri",
        ["hip-n", "ankle-n"],
    )));
    assert!(loaded.ok);
    assert_eq!(loaded.document.controllers.len(), 1);
    let dangling: Vec<_> = loaded.errors.with_code(ErrorCode::DanglingReference).collect();
    assert_eq!(dangling.len(), 1, "{:?}", dangling);
    assert!(dangling[0].message.contains("ankle-n"));
}

fn animated_scene(target: &str) -> String {
    document(&format!(
        r##"<library_animations>
  <animation id="move">
    {input}
    {output}
    <sampler id="move-sampler">
      <input semantic="INPUT" source="#move-in"/>
      <input semantic="OUTPUT" source="#move-out"/>
    </sampler>
    <channel source="#move-sampler" target="{target}"/>
  </animation>
</library_animations>
<library_visual_scenes>
  <visual_scene id="scene">
    <node id="box">
      <translate sid="location">0 0 0</translate>
      <rotate sid="spin">0 0 1 0</rotate>
    </node>
  </visual_scene>
</library_visual_scenes>"##,
        input = float_source("move-in", &[0.0, 1.0], 1),
        output = float_source("move-out", &[0.0, 5.0], 1),
        target = target,
    ))
}

#[test]
fn test_channel_binds_animation_list() {
    let loaded = load(&animated_scene("box/location.X"));
    assert!(loaded.ok);
    assert!(loaded.errors.errors().is_empty(), "{:?}", loaded.errors.errors());

    let document = &loaded.document;
    assert_eq!(document.animations.len(), 1);
    assert_eq!(document.animations[0].key_count(), 2);
    assert_eq!(document.animation_lists.len(), 1);

    let list = &document.animation_lists[0];
    assert_eq!(list.bindings.len(), 1);
    assert_eq!(list.bindings[0].class, AnimationClass::X);
    assert_eq!(list.bindings[0].animation, document.animations[0].unique_id);

    let node = &document.visual_scenes[0].root_nodes[0];
    assert_eq!(node.transformations[0].animation_list, Some(list.unique_id));
    assert_eq!(node.transformations[1].animation_list, None);
}

#[test]
fn test_channel_angle_member() {
    let loaded = load(&animated_scene("box/spin.ANGLE"));
    assert!(loaded.ok);
    let list = &loaded.document.animation_lists[0];
    assert_eq!(list.bindings[0].class, AnimationClass::Angle);
    let node = &loaded.document.visual_scenes[0].root_nodes[0];
    assert_eq!(node.transformations[1].animation_list, Some(list.unique_id));
}

#[test]
fn test_channel_with_unknown_target() {
    let loaded = load(&animated_scene("box/nowhere.X"));
    assert!(loaded.ok);
    assert!(loaded.document.animation_lists.is_empty());
    assert_eq!(loaded.document.animations.len(), 1);
    let dangling: Vec<_> = loaded.errors.with_code(ErrorCode::DanglingReference).collect();
    assert_eq!(dangling.len(), 1);
    assert!(dangling[0].message.contains("box/nowhere.X"));
}
